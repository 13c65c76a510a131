//! Tree Module: component arena and scene-graph operations.
//!
//! Responsibilities:
//! - Handle allocation (sequential u32, never recycled)
//! - Component creation/destruction
//! - Parent-child relationships (parent links are non-owning handles)
//! - Dirty-region accumulation and propagation to ancestors
//! - Layout strategy invocation on resize and child-set mutation

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::context::GraphicsContext;
use crate::error::{Error, Result};
use crate::layout::LayoutStrategy;
use crate::types::{Color, ComponentId, Insets, Rect};

/// Paints a component's own content. Children are painted by the compositor.
pub trait Paint: Send {
    /// `bounds` is the component's local bounds; `dirty` is the part of it
    /// being repainted. The context drops writes outside `dirty`, so a
    /// painter may skip it and redraw everything.
    fn paint(&self, gc: &mut GraphicsContext<'_>, bounds: Rect, dirty: Rect);
}

/// Per-frame hook. Returning `true` marks the component fully dirty.
pub trait FrameCallback: Send {
    fn on_frame(&mut self, time: f64, delta: f64) -> bool;
}

impl<F> FrameCallback for F
where
    F: FnMut(f64, f64) -> bool + Send,
{
    fn on_frame(&mut self, time: f64, delta: f64) -> bool {
        self(time, delta)
    }
}

// ============================================================================
// Component
// ============================================================================

/// A node in the scene graph.
pub struct Component {
    frame: Rect,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    visible: bool,
    masks_to_bounds: bool,
    needs_display: Option<Rect>,
    insets: Insets,
    background: Option<Color>,
    layout: Option<Box<dyn LayoutStrategy>>,
    painter: Option<Box<dyn Paint>>,
    frame_callback: Option<Box<dyn FrameCallback>>,
}

impl Component {
    fn new(frame: Rect) -> Self {
        Self {
            frame,
            parent: None,
            children: Vec::new(),
            visible: true,
            masks_to_bounds: false,
            // New components start fully dirty
            needs_display: Some(frame.bounds()).filter(|r| !r.is_empty()),
            insets: Insets::ZERO,
            background: None,
            layout: None,
            painter: None,
            frame_callback: None,
        }
    }

    /// Position relative to the parent, size in cells.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    /// Local bounds: the frame's size at the origin.
    pub fn bounds(&self) -> Rect {
        self.frame.bounds()
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    pub fn children(&self) -> &[ComponentId] {
        &self.children
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn masks_to_bounds(&self) -> bool {
        self.masks_to_bounds
    }

    /// Accumulated dirty region in local coordinates.
    pub fn needs_display(&self) -> Option<Rect> {
        self.needs_display
    }

    pub fn insets(&self) -> Insets {
        self.insets
    }

    pub fn background(&self) -> Option<Color> {
        self.background
    }

    pub fn has_layout(&self) -> bool {
        self.layout.is_some()
    }

    pub(crate) fn painter(&self) -> Option<&dyn Paint> {
        self.painter.as_deref()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("frame", &self.frame)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("visible", &self.visible)
            .field("masks_to_bounds", &self.masks_to_bounds)
            .field("needs_display", &self.needs_display)
            .field("insets", &self.insets)
            .field("background", &self.background)
            .field("has_layout", &self.layout.is_some())
            .field("has_painter", &self.painter.is_some())
            .finish()
    }
}

// ============================================================================
// Scene
// ============================================================================

/// Owns every component. Parent links and child lists hold handles only.
#[derive(Debug)]
pub struct Scene {
    nodes: HashMap<ComponentId, Component>,
    next_handle: u32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_handle: 1, // Handle(0) is permanently invalid
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: ComponentId) -> Option<&Component> {
        self.nodes.get(&id)
    }

    pub fn component(&self, id: ComponentId) -> Result<&Component> {
        self.nodes.get(&id).ok_or(Error::InvalidHandle(id))
    }

    fn component_mut(&mut self, id: ComponentId) -> Result<&mut Component> {
        self.nodes.get_mut(&id).ok_or(Error::InvalidHandle(id))
    }

    /// Allocate a new handle and create a detached component.
    pub fn create_component(&mut self, frame: Rect) -> ComponentId {
        let id = ComponentId::from_raw(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(id, Component::new(frame));
        debug!(%id, ?frame, "create_component");
        id
    }

    /// Destroy a component and its whole subtree. Detaches it from its parent.
    pub fn destroy_component(&mut self, id: ComponentId) -> Result<()> {
        let parent = self.component(id)?.parent;
        if let Some(parent) = parent {
            self.remove_child(parent, id)?;
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }

        debug!(%id, "destroy_component");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------------

    /// Append `child` to `parent`. A child attached elsewhere is detached first.
    pub fn add_child(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        let index = self.component(parent)?.children.len();
        self.insert_child(parent, child, index)
    }

    /// Insert `child` at `index` (clamped) in `parent`'s child list.
    pub fn insert_child(
        &mut self,
        parent: ComponentId,
        child: ComponentId,
        index: usize,
    ) -> Result<()> {
        self.component(parent)?;
        let old_parent = self.component(child)?.parent;
        self.ensure_not_ancestor(child, parent)?;

        if let Some(old_parent) = old_parent {
            self.detach(old_parent, child)?;
        }

        let p = self.component_mut(parent)?;
        let index = index.min(p.children.len());
        p.children.insert(index, child);
        self.component_mut(child)?.parent = Some(parent);

        self.layout(parent)?;
        self.mark_dirty(parent, None)?;
        debug!(%parent, %child, index, "insert_child");
        Ok(())
    }

    /// Remove `child` from `parent`, clearing its parent link.
    pub fn remove_child(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        self.component(parent)?;
        if self.component(child)?.parent != Some(parent) {
            return Err(Error::NotAChild { parent, child });
        }

        self.detach(parent, child)?;
        debug!(%parent, %child, "remove_child");
        Ok(())
    }

    fn detach(&mut self, parent: ComponentId, child: ComponentId) -> Result<()> {
        self.component_mut(parent)?.children.retain(|&c| c != child);
        self.component_mut(child)?.parent = None;
        self.layout(parent)?;
        self.mark_dirty(parent, None)
    }

    /// Fails when `candidate` is `node` itself or one of its ancestors.
    fn ensure_not_ancestor(&self, candidate: ComponentId, node: ComponentId) -> Result<()> {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == candidate {
                return Err(Error::CycleDetected {
                    parent: node,
                    child: candidate,
                });
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    /// Move and/or resize a component.
    ///
    /// The union of the old and new frame is marked dirty in the parent. A
    /// size change re-runs the layout strategy and marks the component fully
    /// dirty.
    pub fn set_frame(&mut self, id: ComponentId, frame: Rect) -> Result<()> {
        let node = self.component_mut(id)?;
        let old = node.frame;
        if old == frame {
            return Ok(());
        }
        node.frame = frame;
        let parent = node.parent;

        if let Some(parent) = parent {
            self.mark_dirty(parent, Some(old.union(frame)))?;
        }
        if !old.same_size(frame) {
            self.layout(id)?;
            self.mark_dirty(id, None)?;
        }
        Ok(())
    }

    pub fn set_insets(&mut self, id: ComponentId, insets: Insets) -> Result<()> {
        self.component_mut(id)?.insets = insets;
        self.layout(id)
    }

    /// Install (or remove) a layout strategy and apply it immediately.
    pub fn set_layout(
        &mut self,
        id: ComponentId,
        layout: Option<Box<dyn LayoutStrategy>>,
    ) -> Result<()> {
        self.component_mut(id)?.layout = layout;
        self.layout(id)
    }

    /// Run the component's layout strategy, if any, over its children.
    pub fn layout(&mut self, id: ComponentId) -> Result<()> {
        let node = self.component(id)?;
        if node.children.is_empty() {
            return Ok(());
        }
        let Some(strategy) = node.layout.as_ref() else {
            return Ok(());
        };

        let children = node.children.clone();
        let current: Vec<Rect> = children
            .iter()
            .filter_map(|c| self.nodes.get(c).map(|n| n.frame))
            .collect();
        let frames = strategy.layout(node.bounds(), node.insets, &current)?;

        for (child, frame) in children.into_iter().zip(frames) {
            self.set_frame(child, frame)?;
        }
        Ok(())
    }

    /// Frame of `id` in the coordinate space of its top-most ancestor.
    pub fn absolute_frame(&self, id: ComponentId) -> Result<Rect> {
        let node = self.component(id)?;
        let Some(mut parent) = node.parent else {
            return Ok(node.bounds());
        };
        let mut rect = node.frame;
        loop {
            let p = self.component(parent)?;
            match p.parent {
                Some(grandparent) => {
                    rect = rect.translate(p.frame.x, p.frame.y);
                    parent = grandparent;
                }
                None => return Ok(rect),
            }
        }
    }

    /// Deepest visible component under `(x, y)`, given in `root`'s local
    /// coordinates. Later children are on top.
    pub fn hit_test(&self, root: ComponentId, x: i32, y: i32) -> Option<ComponentId> {
        let node = self.nodes.get(&root)?;
        self.hit_test_recursive(root, x + node.frame.x, y + node.frame.y, 0, 0)
    }

    fn hit_test_recursive(
        &self,
        id: ComponentId,
        x: i32,
        y: i32,
        offset_x: i32,
        offset_y: i32,
    ) -> Option<ComponentId> {
        let node = self.nodes.get(&id)?;
        if !node.visible {
            return None;
        }

        let absolute = node.frame.translate(offset_x, offset_y);
        if !absolute.contains(x, y) {
            return None;
        }

        for &child in node.children.iter().rev() {
            if let Some(hit) = self.hit_test_recursive(child, x, y, absolute.x, absolute.y) {
                return Some(hit);
            }
        }

        Some(id)
    }

    // ------------------------------------------------------------------------
    // Appearance
    // ------------------------------------------------------------------------

    pub fn set_visible(&mut self, id: ComponentId, visible: bool) -> Result<()> {
        let node = self.component_mut(id)?;
        if node.visible == visible {
            return Ok(());
        }
        node.visible = visible;
        let (frame, parent) = (node.frame, node.parent);

        match parent {
            Some(parent) => self.mark_dirty(parent, Some(frame)),
            None => {
                let node = self.component_mut(id)?;
                node.needs_display = Some(frame.bounds()).filter(|r| !r.is_empty());
                Ok(())
            }
        }
    }

    pub fn set_masks_to_bounds(&mut self, id: ComponentId, masks: bool) -> Result<()> {
        let node = self.component_mut(id)?;
        if node.masks_to_bounds == masks {
            return Ok(());
        }
        node.masks_to_bounds = masks;
        let parent = node.parent;
        // Descendants may have drawn outside the frame; repaint the area
        // they could reach through the parent.
        match parent {
            Some(parent) => self.mark_dirty(parent, None),
            None => self.mark_dirty(id, None),
        }
    }

    pub fn set_background(&mut self, id: ComponentId, background: Option<Color>) -> Result<()> {
        self.component_mut(id)?.background = background;
        self.mark_dirty(id, None)
    }

    pub fn set_painter(&mut self, id: ComponentId, painter: Option<Box<dyn Paint>>) -> Result<()> {
        self.component_mut(id)?.painter = painter;
        self.mark_dirty(id, None)
    }

    pub fn set_frame_callback(
        &mut self,
        id: ComponentId,
        callback: Option<Box<dyn FrameCallback>>,
    ) -> Result<()> {
        self.component_mut(id)?.frame_callback = callback;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Dirty Tracking
    // ------------------------------------------------------------------------

    /// Union `rect` (local coordinates; `None` = whole bounds) into the dirty
    /// region and propagate it to every ancestor.
    ///
    /// A masking component clips the region to its own bounds, both for
    /// itself and for what it passes upward. Hidden components ignore the
    /// request.
    pub fn mark_dirty(&mut self, id: ComponentId, rect: Option<Rect>) -> Result<()> {
        let node = self.component_mut(id)?;
        if !node.visible {
            return Ok(());
        }

        let bounds = node.frame.bounds();
        let mut region = rect.unwrap_or(bounds);
        if node.masks_to_bounds {
            region = region.intersect(bounds);
        }
        if region.is_empty() {
            return Ok(());
        }
        node.needs_display = Some(node.needs_display.unwrap_or(Rect::EMPTY).union(region));

        let mut region = region.translate(node.frame.x, node.frame.y);
        let mut current = node.parent;
        while let Some(parent_id) = current {
            let Some(parent) = self.nodes.get_mut(&parent_id) else {
                break;
            };
            if parent.masks_to_bounds {
                region = region.intersect(parent.frame.bounds());
                if region.is_empty() {
                    break;
                }
            }
            parent.needs_display =
                Some(parent.needs_display.unwrap_or(Rect::EMPTY).union(region));
            region = region.translate(parent.frame.x, parent.frame.y);
            current = parent.parent;
        }
        Ok(())
    }

    /// Clear the dirty region of every component.
    pub(crate) fn clear_dirty_flags(&mut self) {
        for node in self.nodes.values_mut() {
            node.needs_display = None;
        }
    }

    /// Number of components with a pending dirty region.
    pub fn dirty_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.needs_display.is_some())
            .count()
    }

    // ------------------------------------------------------------------------
    // Per-frame Callbacks
    // ------------------------------------------------------------------------

    /// Invoke the per-frame callback of every visible component under `root`,
    /// parents before children. Returns how many callbacks ran.
    pub fn run_frame_callbacks(&mut self, root: ComponentId, time: f64, delta: f64) -> usize {
        let mut invoked = 0;
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            stack.extend(node.children.iter().rev().copied());

            let Some(mut callback) = node.frame_callback.take() else {
                continue;
            };
            let changed = callback.on_frame(time, delta);
            invoked += 1;

            // The callback slot may have been replaced meanwhile; keep the newer one.
            if let Some(node) = self.nodes.get_mut(&id) {
                node.frame_callback.get_or_insert(callback);
            }
            if changed {
                let _ = self.mark_dirty(id, None);
            }
        }

        invoked
    }
}
