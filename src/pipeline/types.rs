//! Engine state types.
//!
//! Defines the state machine for the pipeline lifecycle.
//!
//! # State Transitions
//!
//! ```text
//!                  start()
//! Created ───────────────────→ Resolving
//!    │                              │
//!    │ (never started)              │ (offsets resolved, workers spawned)
//!    ↓                              ↓
//! Stopped ←──────────────────── Running
//!    ↑        shutdown() /          │
//!    │        replay complete       ↓
//!    └─────────────────────── ShuttingDown
//!
//! Resolving ──(setup error)──→ Failed
//! ```
//!
//! There is no cycle back to `Running`: once `ShuttingDown` is entered
//! the pipeline only moves forward to `Stopped`.

/// State of the firehose pipeline.
///
/// See module docs for the state transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Pipeline created but not started.
    ///
    /// Call [`start()`](super::Firehose::start) to resolve offsets and
    /// spawn the worker pools.
    Created,

    /// Resolving offset windows against the source broker.
    ///
    /// Transitions to `Running` once workers are spawned, or `Failed`
    /// if resolution fails.
    Resolving,

    /// Workers are replicating.
    Running,

    /// Shutdown signal fired; workers are draining in-flight work.
    ///
    /// Transitions to `Stopped` when every worker task has returned.
    ShuttingDown,

    /// All tasks have returned. Safe to drop.
    Stopped,

    /// A fatal setup error occurred before workers started.
    ///
    /// Check logs for details. The pipeline cannot recover from this
    /// state.
    Failed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Created => write!(f, "Created"),
            EngineState::Resolving => write!(f, "Resolving"),
            EngineState::Running => write!(f, "Running"),
            EngineState::ShuttingDown => write!(f, "ShuttingDown"),
            EngineState::Stopped => write!(f, "Stopped"),
            EngineState::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_state_display() {
        assert_eq!(EngineState::Created.to_string(), "Created");
        assert_eq!(EngineState::Resolving.to_string(), "Resolving");
        assert_eq!(EngineState::Running.to_string(), "Running");
        assert_eq!(EngineState::ShuttingDown.to_string(), "ShuttingDown");
        assert_eq!(EngineState::Stopped.to_string(), "Stopped");
        assert_eq!(EngineState::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_engine_state_equality() {
        assert_eq!(EngineState::Created, EngineState::Created);
        assert_ne!(EngineState::Created, EngineState::Running);
    }

    #[test]
    fn test_engine_state_copy() {
        let state = EngineState::ShuttingDown;
        let copied: EngineState = state;
        assert_eq!(state, copied);
    }
}
