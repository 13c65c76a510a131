//! Layout Module: pluggable strategies that position a component's children.
//!
//! Responsibilities:
//! - `LayoutStrategy` trait, invoked on resize and child-set mutation
//! - Full-size fill (children cover the container minus insets)
//! - Horizontal/vertical flow, resolved through a Taffy flexbox pass

use taffy::geometry::Size;
use taffy::style::{AlignItems, AvailableSpace, FlexDirection, FlexWrap, JustifyContent, Style};
use taffy::style_helpers::length;
use taffy::TaffyTree;

use crate::error::{Error, Result};
use crate::types::{Insets, Rect};

/// Positions the children of a container.
///
/// `bounds` is the container's local bounds (origin at zero). `children`
/// holds the current frames in child order; the returned frames are applied
/// in the same order.
pub trait LayoutStrategy: Send {
    fn layout(&self, bounds: Rect, insets: Insets, children: &[Rect]) -> Result<Vec<Rect>>;
}

// ============================================================================
// Full-size Fill
// ============================================================================

/// Every child is stretched over the container's inset area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullSizeFill;

impl LayoutStrategy for FullSizeFill {
    fn layout(&self, bounds: Rect, insets: Insets, children: &[Rect]) -> Result<Vec<Rect>> {
        let frame = Rect::new(
            insets.left,
            insets.top,
            (bounds.width - insets.horizontal()).max(0),
            (bounds.height - insets.vertical()).max(0),
        );
        Ok(vec![frame; children.len()])
    }
}

// ============================================================================
// Flow
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Packs children along one axis in child order with fixed spacing.
///
/// Children keep their current sizes. `alignment` places the packed block
/// along the packing axis; `cross_alignment` places each child on the other
/// axis (top/middle/bottom for a horizontal flow).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowLayout {
    pub axis: Axis,
    /// Cells between neighbours. Negative spacing fails the layout pass.
    pub spacing: i32,
    pub alignment: Alignment,
    pub cross_alignment: Alignment,
}

impl FlowLayout {
    pub fn horizontal(spacing: i32) -> Self {
        Self {
            axis: Axis::Horizontal,
            spacing,
            alignment: Alignment::Start,
            cross_alignment: Alignment::Start,
        }
    }

    pub fn vertical(spacing: i32) -> Self {
        Self {
            axis: Axis::Vertical,
            ..Self::horizontal(spacing)
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_cross_alignment(mut self, alignment: Alignment) -> Self {
        self.cross_alignment = alignment;
        self
    }

    fn container_style(&self, bounds: Rect, insets: Insets) -> Style {
        let mut style = Style::DEFAULT;
        style.flex_direction = match self.axis {
            Axis::Horizontal => FlexDirection::Row,
            Axis::Vertical => FlexDirection::Column,
        };
        style.flex_wrap = FlexWrap::NoWrap;
        style.size = Size {
            width: length(bounds.width.max(0) as f32),
            height: length(bounds.height.max(0) as f32),
        };
        style.padding = taffy::geometry::Rect {
            top: length(insets.top as f32),
            right: length(insets.right as f32),
            bottom: length(insets.bottom as f32),
            left: length(insets.left as f32),
        };
        let spacing = self.spacing as f32;
        style.gap = Size {
            width: length(spacing),
            height: length(spacing),
        };
        style.justify_content = Some(match self.alignment {
            Alignment::Start => JustifyContent::Start,
            Alignment::Center => JustifyContent::Center,
            Alignment::End => JustifyContent::End,
        });
        style.align_items = Some(match self.cross_alignment {
            Alignment::Start => AlignItems::Start,
            Alignment::Center => AlignItems::Center,
            Alignment::End => AlignItems::End,
        });
        style
    }
}

fn solver_error(e: impl std::fmt::Debug) -> Error {
    Error::Layout(format!("{e:?}"))
}

impl LayoutStrategy for FlowLayout {
    fn layout(&self, bounds: Rect, insets: Insets, children: &[Rect]) -> Result<Vec<Rect>> {
        if self.spacing < 0 {
            return Err(Error::NegativeSpacing(self.spacing));
        }
        if children.is_empty() {
            return Ok(Vec::new());
        }

        let mut tree: TaffyTree<()> = TaffyTree::new();

        // Fixed-size leaves that never shrink, so packing keeps child sizes.
        let mut leaves = Vec::with_capacity(children.len());
        for child in children {
            let mut style = Style::DEFAULT;
            style.size = Size {
                width: length(child.width.max(0) as f32),
                height: length(child.height.max(0) as f32),
            };
            style.flex_shrink = 0.0;
            leaves.push(tree.new_leaf(style).map_err(solver_error)?);
        }

        let root = tree
            .new_with_children(self.container_style(bounds, insets), &leaves)
            .map_err(solver_error)?;

        tree.compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(bounds.width.max(0) as f32),
                height: AvailableSpace::Definite(bounds.height.max(0) as f32),
            },
        )
        .map_err(solver_error)?;

        leaves
            .iter()
            .zip(children)
            .map(|(&leaf, child)| {
                let computed = tree.layout(leaf).map_err(solver_error)?;
                Ok(Rect::new(
                    computed.location.x.round() as i32,
                    computed.location.y.round() as i32,
                    child.width,
                    child.height,
                ))
            })
            .collect()
    }
}
