//! Shared types, enums, and constants.
//!
//! All value types that cross module boundaries live here: handles, colors,
//! cells, the cell grid, and integer geometry.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Component Handles
// ============================================================================

/// Handle of a component inside a [`Scene`](crate::tree::Scene).
///
/// Handles are allocated sequentially and never recycled. `#0` is the
/// permanently invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    pub const INVALID: ComponentId = ComponentId(0);

    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Color
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Rgb { r: u8, g: u8, b: u8 },
    Indexed(u8),
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Interpolate toward `end` at progress `alpha`.
    ///
    /// Two RGB colors are blended per channel. Any other pair snaps to `end`
    /// once `alpha >= 1.0` and stays at `self` before that.
    pub fn interpolate(self, end: Color, alpha: f64) -> Color {
        match (self, end) {
            (Color::Rgb { r: sr, g: sg, b: sb }, Color::Rgb { r: er, g: eg, b: eb }) => {
                let channel = |s: u8, e: u8| -> u8 {
                    let v = s as f64 + (e as f64 - s as f64) * alpha;
                    v.round().clamp(0.0, 255.0) as u8
                };
                Color::Rgb {
                    r: channel(sr, er),
                    g: channel(sg, eg),
                    b: channel(sb, eb),
                }
            }
            _ => {
                if alpha >= 1.0 {
                    end
                } else {
                    self
                }
            }
        }
    }
}

// ============================================================================
// Cell
// ============================================================================

/// One grid position's rendered content. Immutable once constructed.
///
/// Equality compares the character and both optional colors, so an absent
/// color only equals another absent color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    ch: char,
    fg: Option<Color>,
    bg: Option<Color>,
}

impl Cell {
    pub const fn new(ch: char, fg: Option<Color>, bg: Option<Color>) -> Self {
        Self { ch, fg, bg }
    }

    /// A space with the given background, used when a cell is erased.
    pub const fn blank(bg: Option<Color>) -> Self {
        Self { ch: ' ', fg: None, bg }
    }

    pub const fn ch(&self) -> char {
        self.ch
    }

    pub const fn fg(&self) -> Option<Color> {
        self.fg
    }

    pub const fn bg(&self) -> Option<Color> {
        self.bg
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Integer rectangle. A rectangle with a non-positive width or height is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect::new(0, 0, 0, 0);

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin with the given size.
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub const fn right(self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(self) -> i32 {
        self.y + self.height
    }

    /// The same size, positioned at the origin.
    pub const fn bounds(self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    pub fn area(self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    pub fn same_size(self, other: Rect) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Intersect with another rect, producing the tighter bound.
    /// Disjoint rects produce an empty rect.
    pub fn intersect(self, other: Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        Rect {
            x: x1,
            y: y1,
            width: (x2 - x1).max(0),
            height: (y2 - y1).max(0),
        }
    }

    /// Bounding rectangle of both. An empty rect is the identity.
    pub fn union(self, other: Rect) -> Rect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub const fn translate(self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Inner padding of a component, applied by layout strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Insets {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Insets {
    pub const ZERO: Insets = Insets::new(0, 0, 0, 0);

    pub const fn new(top: i32, left: i32, bottom: i32, right: i32) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub const fn uniform(value: i32) -> Self {
        Self::new(value, value, value, value)
    }

    pub const fn horizontal(self) -> i32 {
        self.left + self.right
    }

    pub const fn vertical(self) -> i32 {
        self.top + self.bottom
    }
}

// ============================================================================
// Cell Buffer
// ============================================================================

/// Row-major grid of optional cells. `None` is an empty (never painted) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    width: u16,
    height: u16,
    cells: Vec<Option<Cell>>,
}

impl Buffer {
    pub fn new(width: u16, height: u16) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![None; size],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width as i32, self.height as i32)
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Empty every cell inside `rect`. Parts outside the grid are ignored.
    pub fn clear_rect(&mut self, rect: Rect) {
        let r = rect.intersect(self.bounds());
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                let idx = self.index(x as u16, y as u16);
                self.cells[idx] = None;
            }
        }
    }

    /// Cell at `(x, y)`. `None` when the cell is empty or out of range.
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if x < self.width && y < self.height {
            self.cells[self.index(x, y)].as_ref()
        } else {
            None
        }
    }

    /// Store `cell` at `(x, y)`. Out-of-range writes are dropped.
    pub fn set(&mut self, x: u16, y: u16, cell: Option<Cell>) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.cells[idx] = cell;
        }
    }

    /// Number of non-empty cells.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    fn index(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

// ============================================================================
// Cell Update (for OutputSink trait)
// ============================================================================

/// A single physical-output write: set `(x, y)` to `cell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellUpdate {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}
