//! Graphics Context: coordinate-translated, clipped view over a cell buffer.
//!
//! Responsibilities:
//! - Let every component paint in its own local coordinates
//! - Compose translation and clipping for nested components
//! - Drop writes that fall outside the effective clip rectangle

use unicode_width::UnicodeWidthChar;

use crate::types::{Buffer, Cell, Color, Rect};

/// A drawing surface bound to a target [`Buffer`].
///
/// The origin and clip are kept in absolute buffer coordinates; all public
/// methods take local coordinates relative to `origin`.
pub struct GraphicsContext<'a> {
    buffer: &'a mut Buffer,
    origin_x: i32,
    origin_y: i32,
    clip: Rect,
}

impl<'a> GraphicsContext<'a> {
    /// Root context: origin at `(0, 0)`, clipped to the buffer bounds.
    pub fn new(buffer: &'a mut Buffer) -> Self {
        let clip = buffer.bounds();
        Self {
            buffer,
            origin_x: 0,
            origin_y: 0,
            clip,
        }
    }

    /// Root context whose writes are confined to `clip` (buffer coordinates).
    pub fn with_clip(buffer: &'a mut Buffer, clip: Rect) -> Self {
        let clip = buffer.bounds().intersect(clip);
        Self {
            buffer,
            origin_x: 0,
            origin_y: 0,
            clip,
        }
    }

    /// Absolute position of the local origin.
    pub fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    /// Effective clip rectangle in local coordinates.
    pub fn clip_rect(&self) -> Rect {
        self.clip.translate(-self.origin_x, -self.origin_y)
    }

    /// Derive a context for a child occupying `frame` (in this context's
    /// local coordinates). The child's origin is the frame's origin; its clip
    /// is narrowed to the frame only when `masks_to_bounds` is set.
    pub fn child_context(&mut self, frame: Rect, masks_to_bounds: bool) -> GraphicsContext<'_> {
        let absolute = frame.translate(self.origin_x, self.origin_y);
        let clip = if masks_to_bounds {
            self.clip.intersect(absolute)
        } else {
            self.clip
        };
        GraphicsContext {
            buffer: &mut *self.buffer,
            origin_x: absolute.x,
            origin_y: absolute.y,
            clip,
        }
    }

    pub fn set_point(&mut self, x: i32, y: i32, fg: Option<Color>, bg: Option<Color>, ch: char) {
        self.set_cell(x, y, Cell::new(ch, fg, bg));
    }

    /// Write a cell at local `(x, y)`. Writes outside the clip are no-ops.
    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell) {
        self.store(x, y, Some(cell));
    }

    /// Reset the cell at local `(x, y)` to empty.
    pub fn erase(&mut self, x: i32, y: i32) {
        self.store(x, y, None);
    }

    pub fn fill_rect(&mut self, rect: Rect, cell: Cell) {
        let r = self.visible_part(rect);
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                self.set_cell(x, y, cell);
            }
        }
    }

    pub fn clear_rect(&mut self, rect: Rect) {
        let r = self.visible_part(rect);
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                self.erase(x, y);
            }
        }
    }

    /// Draw `text` starting at local `(x, y)`, advancing by display width.
    /// `'\n'` starts a new row at column `x`. Zero-width characters are
    /// skipped. Returns the widest row in columns.
    pub fn draw_str(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        fg: Option<Color>,
        bg: Option<Color>,
    ) -> i32 {
        let mut col = 0i32;
        let mut row = 0i32;
        let mut widest = 0i32;

        for ch in text.chars() {
            if ch == '\n' {
                row += 1;
                col = 0;
                continue;
            }
            let char_width = UnicodeWidthChar::width(ch).unwrap_or(0) as i32;
            if char_width == 0 {
                continue;
            }
            self.set_point(x + col, y + row, fg, bg, ch);
            col += char_width;
            widest = widest.max(col);
        }

        widest
    }

    fn visible_part(&self, rect: Rect) -> Rect {
        rect.intersect(self.clip_rect())
    }

    fn store(&mut self, x: i32, y: i32, cell: Option<Cell>) {
        let sx = self.origin_x + x;
        let sy = self.origin_y + y;
        if self.clip.contains(sx, sy) && sx >= 0 && sy >= 0 {
            self.buffer.set(sx as u16, sy as u16, cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch_at(buf: &Buffer, x: u16, y: u16) -> Option<char> {
        buf.get(x, y).map(Cell::ch)
    }

    #[test]
    fn test_set_point_root_context() {
        let mut buf = Buffer::new(5, 5);
        let mut gc = GraphicsContext::new(&mut buf);
        gc.set_point(2, 3, None, None, 'A');
        gc.set_point(-1, 0, None, None, 'B');
        gc.set_point(5, 0, None, None, 'C');
        drop(gc);

        assert_eq!(ch_at(&buf, 2, 3), Some('A'));
        assert_eq!(buf.filled(), 1);
    }

    #[test]
    fn test_child_context_translates_origin() {
        let mut buf = Buffer::new(10, 10);
        let mut gc = GraphicsContext::new(&mut buf);
        {
            let mut child = gc.child_context(Rect::new(3, 4, 2, 2), false);
            assert_eq!(child.origin(), (3, 4));
            child.set_point(0, 0, None, None, 'X');
        }
        drop(gc);
        assert_eq!(ch_at(&buf, 3, 4), Some('X'));
    }

    #[test]
    fn test_masking_child_clips_to_frame() {
        let mut buf = Buffer::new(10, 10);
        let mut gc = GraphicsContext::new(&mut buf);
        {
            let mut child = gc.child_context(Rect::new(2, 2, 3, 3), true);
            child.set_point(0, 0, None, None, 'a');
            child.set_point(3, 0, None, None, 'b'); // just outside
            child.set_point(-1, 0, None, None, 'c'); // left of frame
            assert_eq!(child.clip_rect(), Rect::new(0, 0, 3, 3));
        }
        drop(gc);
        assert_eq!(ch_at(&buf, 2, 2), Some('a'));
        assert_eq!(buf.filled(), 1);
    }

    #[test]
    fn test_non_masking_child_inherits_clip() {
        let mut buf = Buffer::new(10, 10);
        let mut gc = GraphicsContext::new(&mut buf);
        {
            let mut child = gc.child_context(Rect::new(2, 2, 3, 3), false);
            child.set_point(5, 5, None, None, 'z');
            child.set_point(-2, -2, None, None, 'o');
        }
        drop(gc);
        assert_eq!(ch_at(&buf, 7, 7), Some('z'));
        assert_eq!(ch_at(&buf, 0, 0), Some('o'));
    }

    #[test]
    fn test_nested_masking_intersects() {
        let mut buf = Buffer::new(20, 20);
        let mut gc = GraphicsContext::new(&mut buf);
        {
            let mut outer = gc.child_context(Rect::new(5, 5, 4, 4), true);
            // Inner frame pokes out past the outer frame on the right/bottom
            let mut inner = outer.child_context(Rect::new(2, 2, 6, 6), true);
            assert_eq!(inner.origin(), (7, 7));
            assert_eq!(inner.clip_rect(), Rect::new(0, 0, 2, 2));
            inner.fill_rect(Rect::new(0, 0, 6, 6), Cell::new('#', None, None));
        }
        drop(gc);
        assert_eq!(buf.filled(), 4);
        assert_eq!(ch_at(&buf, 8, 8), Some('#'));
        assert_eq!(ch_at(&buf, 9, 9), None);
    }

    #[test]
    fn test_with_clip_confines_children() {
        let mut buf = Buffer::new(8, 2);
        let mut gc = GraphicsContext::with_clip(&mut buf, Rect::new(0, 0, 2, 1));
        gc.draw_str(0, 0, "abcdef", None, None);
        {
            let mut child = gc.child_context(Rect::new(1, 0, 6, 2), false);
            assert_eq!(child.clip_rect(), Rect::new(-1, 0, 2, 1));
            child.fill_rect(Rect::new(0, 0, 6, 2), Cell::new('#', None, None));
        }
        drop(gc);
        assert_eq!(buf.filled(), 2);
        assert_eq!(ch_at(&buf, 0, 0), Some('a'));
        assert_eq!(ch_at(&buf, 1, 0), Some('#'));
    }

    #[test]
    fn test_clear_rect_erases() {
        let mut buf = Buffer::new(4, 1);
        let mut gc = GraphicsContext::new(&mut buf);
        gc.fill_rect(Rect::new(0, 0, 4, 1), Cell::new('x', None, None));
        gc.clear_rect(Rect::new(1, 0, 2, 1));
        drop(gc);
        assert_eq!(buf.filled(), 2);
        assert_eq!(ch_at(&buf, 1, 0), None);
    }

    #[test]
    fn test_draw_str_wide_chars_and_newlines() {
        let mut buf = Buffer::new(10, 3);
        let mut gc = GraphicsContext::new(&mut buf);
        let widest = gc.draw_str(0, 0, "a日b\ncd", None, None);
        drop(gc);

        // '日' occupies two columns, so 'b' lands at column 3
        assert_eq!(widest, 4);
        assert_eq!(ch_at(&buf, 1, 0), Some('日'));
        assert_eq!(ch_at(&buf, 3, 0), Some('b'));
        assert_eq!(ch_at(&buf, 0, 1), Some('c'));
        assert_eq!(ch_at(&buf, 1, 1), Some('d'));
    }
}
