//! glyphgrid: text-cell UI compositor and fixed-tick animation loop.
//!
//! A [`Scene`] holds a tree of rectangular components addressed by
//! [`ComponentId`] handles. A [`Compositor`] owns the scene and repaints
//! only what was marked dirty, diffing a back buffer against a front buffer
//! so the [`OutputSink`] receives just the cells that changed.
//!
//! Time is driven by a [`GameLoop`]: one background thread calling every
//! registered [`TimedAction`] about 30 times per second. Animations, step
//! controllers and the compositor itself are timed actions.
//!
//! The library logs through `tracing` and installs no subscriber.

pub mod animation;
pub mod config;
pub mod context;
pub mod error;
pub mod game_loop;
pub mod layout;
pub mod render;
pub mod step;
pub mod terminal;
pub mod text;
pub mod tree;
pub mod types;

pub use animation::{Animation, AnimationObserver, AnimationTarget, Animator, Curve};
pub use config::{CompositorConfig, LoopConfig};
pub use context::GraphicsContext;
pub use error::{Error, Result};
pub use game_loop::{ActionId, ActionRegistry, GameLoop, SharedAction, TickClock, TimedAction};
pub use layout::{Alignment, Axis, FlowLayout, FullSizeFill, LayoutStrategy};
pub use render::{CommandSender, Compositor, RepaintStats, SceneCommand};
pub use step::StepController;
pub use terminal::{HeadlessSink, OutputSink, RecordingSink, SinkOp};
pub use text::{measure_text, Fill, Label};
pub use tree::{Component, FrameCallback, Paint, Scene};
pub use types::{Buffer, Cell, CellUpdate, Color, ComponentId, Insets, Rect};
