//! Render Module: double-buffered compositor with dirty-region diffing.
//!
//! Responsibilities:
//! - Keep back/front grids sized to the root component
//! - Repaint only the root's dirty region into the back buffer
//! - Diff back vs front to produce the minimal CellUpdate list
//! - Send the diff to the OutputSink, then clear dirty regions

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::CompositorConfig;
use crate::context::GraphicsContext;
use crate::error::Result;
use crate::game_loop::TimedAction;
use crate::terminal::OutputSink;
use crate::tree::Scene;
use crate::types::{Buffer, Cell, CellUpdate, Color, ComponentId, Rect};

/// A deferred scene mutation, applied on the compositor's thread.
pub type SceneCommand = Box<dyn FnOnce(&mut Scene) -> Result<()> + Send>;

/// Sends scene mutations to a [`Compositor`] from any thread.
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<SceneCommand>,
}

impl CommandSender {
    /// Queue `command` for the next tick. Returns `false` once the
    /// compositor has been dropped.
    pub fn send<F>(&self, command: F) -> bool
    where
        F: FnOnce(&mut Scene) -> Result<()> + Send + 'static,
    {
        self.tx.send(Box::new(command)).is_ok()
    }
}

/// What one repaint did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepaintStats {
    /// Cells sent to the sink.
    pub cells_written: usize,
    /// Region repainted, in root coordinates.
    pub dirty_area: Rect,
    /// Whether every cell was rewritten.
    pub full_redraw: bool,
    pub elapsed: Duration,
}

// ============================================================================
// Compositor
// ============================================================================

/// Owns the scene, the root component and both cell grids.
pub struct Compositor {
    scene: Scene,
    root: ComponentId,
    back_buffer: Buffer,
    front_buffer: Buffer,
    sink: Box<dyn OutputSink>,
    config: CompositorConfig,
    force_full_redraw: bool,
    commands: Receiver<SceneCommand>,
    command_tx: Sender<SceneCommand>,
}

impl Compositor {
    pub fn new(width: u16, height: u16, sink: Box<dyn OutputSink>) -> Self {
        Self::with_config(width, height, sink, CompositorConfig::default())
    }

    pub fn with_config(
        width: u16,
        height: u16,
        sink: Box<dyn OutputSink>,
        config: CompositorConfig,
    ) -> Self {
        let mut scene = Scene::new();
        let root = scene.create_component(Rect::from_size(width as i32, height as i32));
        // A fresh root is valid, so this cannot fail
        let _ = scene.set_background(root, config.background);
        let (command_tx, commands) = mpsc::channel();

        Self {
            scene,
            root,
            back_buffer: Buffer::new(width, height),
            front_buffer: Buffer::new(width, height),
            sink,
            config,
            force_full_redraw: false,
            commands,
            command_tx,
        }
    }

    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Most recently painted content.
    pub fn back_buffer(&self) -> &Buffer {
        &self.back_buffer
    }

    /// What the sink currently shows.
    pub fn front_buffer(&self) -> &Buffer {
        &self.front_buffer
    }

    /// Resize the root. Buffers follow on the next repaint.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<()> {
        let frame = self.scene.component(self.root)?.frame();
        self.scene.set_frame(
            self.root,
            Rect::new(frame.x, frame.y, width as i32, height as i32),
        )
    }

    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            tx: self.command_tx.clone(),
        }
    }

    /// Apply every queued command in arrival order. Failed commands are
    /// logged and skipped. Returns how many commands ran.
    pub fn apply_pending_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(command) = self.commands.try_recv() {
            if let Err(e) = command(&mut self.scene) {
                warn!(error = %e, "scene command failed");
            }
            applied += 1;
        }
        applied
    }

    /// Mark `rect` (root coordinates; `None` = everything) dirty and repaint.
    pub fn repaint_region(&mut self, rect: Option<Rect>) -> Result<RepaintStats> {
        self.scene.mark_dirty(self.root, rect)?;
        self.repaint()
    }

    /// Repaint the root's dirty region and write the changed cells.
    pub fn repaint(&mut self) -> Result<RepaintStats> {
        let start = Instant::now();
        let (width, height) = self.validate_buffers()?;
        let bounds = Rect::from_size(width as i32, height as i32);

        let root = self.scene.component(self.root)?;
        let background = root.background();
        let dirty = root
            .needs_display()
            .map(|r| r.intersect(bounds))
            .unwrap_or(Rect::EMPTY);
        let full_redraw = self.force_full_redraw;

        if !dirty.is_empty() {
            self.back_buffer.clear_rect(dirty);
            let mut gc = GraphicsContext::with_clip(&mut self.back_buffer, dirty);
            paint_component(&self.scene, self.root, &mut gc, dirty);
        }

        let diff = diff_buffers(
            &self.back_buffer,
            &self.front_buffer,
            background,
            full_redraw,
        );

        // Front only advances once the sink has taken every write
        self.write_to_sink(&diff, full_redraw)?;
        self.front_buffer.clone_from(&self.back_buffer);

        self.force_full_redraw = false;
        self.scene.clear_dirty_flags();

        let stats = RepaintStats {
            cells_written: diff.len(),
            dirty_area: dirty,
            full_redraw,
            elapsed: start.elapsed(),
        };
        debug!(
            cells = stats.cells_written,
            dirty = ?stats.dirty_area,
            full = stats.full_redraw,
            elapsed_us = stats.elapsed.as_micros() as u64,
            "repaint"
        );
        Ok(stats)
    }

    fn write_to_sink(&mut self, diff: &[CellUpdate], full_redraw: bool) -> Result<()> {
        if full_redraw {
            self.sink.clear()?;
        }
        if !diff.is_empty() {
            self.sink.write_diff(diff)?;
        }
        self.sink.flush()
    }

    /// Reallocate both grids when the root size changed. Returns the size.
    fn validate_buffers(&mut self) -> Result<(u16, u16)> {
        let frame = self.scene.component(self.root)?.frame();
        let width = frame.width.clamp(0, u16::MAX as i32) as u16;
        let height = frame.height.clamp(0, u16::MAX as i32) as u16;

        if self.back_buffer.size() != (width, height) || self.front_buffer.size() != (width, height)
        {
            debug!(
                from = ?self.front_buffer.size(),
                to = ?(width, height),
                "compositor buffers resized"
            );
            self.back_buffer = Buffer::new(width, height);
            self.front_buffer = Buffer::new(width, height);
            self.force_full_redraw = self.config.full_redraw_on_resize;
            self.scene.mark_dirty(self.root, None)?;
        }
        Ok((width, height))
    }
}

impl TimedAction for Compositor {
    fn update(&mut self, time: f64, delta: f64) {
        self.apply_pending_commands();
        self.scene.run_frame_callbacks(self.root, time, delta);
        if let Err(e) = self.repaint() {
            warn!(error = %e, "repaint failed");
        }
    }
}

/// Paint `id` and its descendants. `dirty` is in `id`'s local coordinates
/// and already lies within its bounds.
fn paint_component(scene: &Scene, id: ComponentId, gc: &mut GraphicsContext<'_>, dirty: Rect) {
    let Some(node) = scene.get(id) else {
        return;
    };
    if !node.is_visible() {
        return;
    }

    if let Some(bg) = node.background() {
        gc.fill_rect(dirty, Cell::blank(Some(bg)));
    }
    if let Some(painter) = node.painter() {
        painter.paint(gc, node.bounds(), dirty);
    }

    for &child_id in node.children() {
        let Some(child) = scene.get(child_id) else {
            continue;
        };
        if !child.is_visible() {
            continue;
        }
        let frame = child.frame();
        let region = dirty.intersect(frame);
        if region.is_empty() {
            continue;
        }
        let mut child_gc = gc.child_context(frame, child.masks_to_bounds());
        paint_component(
            scene,
            child_id,
            &mut child_gc,
            region.translate(-frame.x, -frame.y),
        );
    }
}

/// Compare the grids cell by cell and return the writes needed to make the
/// sink match `back`. Cells emptied since the last frame are written as
/// blanks in `background`.
fn diff_buffers(
    back: &Buffer,
    front: &Buffer,
    background: Option<Color>,
    full_redraw: bool,
) -> Vec<CellUpdate> {
    let mut updates = Vec::new();
    let blank = Cell::blank(background);

    for y in 0..back.height() {
        for x in 0..back.width() {
            match (back.get(x, y).copied(), front.get(x, y).copied()) {
                (Some(cell), shown) => {
                    if full_redraw || shown != Some(cell) {
                        updates.push(CellUpdate { x, y, cell });
                    }
                }
                (None, Some(_)) => {
                    updates.push(CellUpdate { x, y, cell: blank });
                }
                (None, None) => {
                    if full_redraw {
                        updates.push(CellUpdate { x, y, cell: blank });
                    }
                }
            }
        }
    }

    updates
}
