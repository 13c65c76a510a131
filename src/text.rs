//! Text Module: ready-made painters for labels and solid fills.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::context::GraphicsContext;
use crate::tree::Paint;
use crate::types::{Cell, Color, Rect};

/// Display width of a string in cells.
/// Accounts for CJK (2 cells), emoji (2 cells), combining chars (0 cells).
pub fn measure_text(text: &str) -> i32 {
    UnicodeWidthStr::width(text) as i32
}

/// Plain text, optionally wrapped at the component's width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    text: String,
    fg: Option<Color>,
    bg: Option<Color>,
    wrap: bool,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fg: None,
            bg: None,
            wrap: false,
        }
    }

    pub fn with_colors(mut self, fg: Option<Color>, bg: Option<Color>) -> Self {
        self.fg = fg;
        self.bg = bg;
        self
    }

    /// Wrap at the component width and stop at its height.
    pub fn wrapped(mut self, wrap: bool) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Unwrapped size: widest line by line count.
    pub fn preferred_size(&self) -> (i32, i32) {
        let width = self.text.lines().map(measure_text).max().unwrap_or(0);
        let height = self.text.lines().count() as i32;
        (width, height)
    }

    fn paint_wrapped(&self, gc: &mut GraphicsContext<'_>, max_w: i32, max_h: i32) {
        let mut col = 0i32;
        let mut row = 0i32;

        for ch in self.text.chars() {
            if row >= max_h {
                break;
            }
            if ch == '\n' {
                row += 1;
                col = 0;
                continue;
            }
            let char_width = UnicodeWidthChar::width(ch).unwrap_or(0) as i32;
            if char_width == 0 {
                continue;
            }
            if col + char_width > max_w {
                row += 1;
                col = 0;
                if row >= max_h {
                    break;
                }
            }
            if col + char_width <= max_w {
                gc.set_point(col, row, self.fg, self.bg, ch);
            }
            col += char_width;
        }
    }
}

impl Paint for Label {
    fn paint(&self, gc: &mut GraphicsContext<'_>, bounds: Rect, _dirty: Rect) {
        if self.wrap {
            self.paint_wrapped(gc, bounds.width, bounds.height);
        } else {
            gc.draw_str(0, 0, &self.text, self.fg, self.bg);
        }
    }
}

/// Fills the whole component with one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    cell: Cell,
}

impl Fill {
    pub fn new(cell: Cell) -> Self {
        Self { cell }
    }

    pub fn solid(ch: char, fg: Option<Color>, bg: Option<Color>) -> Self {
        Self::new(Cell::new(ch, fg, bg))
    }
}

impl Paint for Fill {
    fn paint(&self, gc: &mut GraphicsContext<'_>, bounds: Rect, dirty: Rect) {
        gc.fill_rect(bounds.intersect(dirty), self.cell);
    }
}
