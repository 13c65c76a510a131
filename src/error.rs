//! Error types shared by every module.

use thiserror::Error;

use crate::types::ComponentId;

/// Errors reported by the compositor, layout, and timing modules.
#[derive(Error, Debug)]
pub enum Error {
    /// The handle does not refer to a live component.
    #[error("invalid handle: {0}")]
    InvalidHandle(ComponentId),

    /// `remove_child` was called with a component that is not a child of `parent`.
    #[error("{child} is not a child of {parent}")]
    NotAChild {
        parent: ComponentId,
        child: ComponentId,
    },

    /// Attaching the child would make a component its own ancestor.
    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected {
        parent: ComponentId,
        child: ComponentId,
    },

    /// Step frequency may only change while the controller is stopped.
    #[error("cannot change frequency while the step controller is active")]
    FrequencyWhileActive,

    #[error("step frequency must be non-negative, got {0}")]
    NegativeFrequency(f64),

    #[error("animation not found: {0}")]
    AnimationNotFound(u32),

    /// Self-chains, chains behind a looping animation and chain cycles.
    #[error("animation {next} cannot be chained after {after}")]
    InvalidChain { after: u32, next: u32 },

    #[error("flow spacing must be non-negative, got {0}")]
    NegativeSpacing(i32),

    /// The flexbox solver rejected the layout request.
    #[error("layout failed: {0}")]
    Layout(String),

    #[error("{0} lock poisoned after panic")]
    LockPoisoned(&'static str),

    /// The game loop thread could not be spawned.
    #[error("failed to spawn loop thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The output sink rejected a write.
    #[error("output sink error: {0}")]
    Sink(String),
}

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
