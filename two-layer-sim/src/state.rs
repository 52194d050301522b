//! Application-process finite-state machine (FSM) types.
//!
//! A process is either still exchanging payloads or has sent its close
//! message.  Transitions happen in [`crate::application::Process::step`];
//! this module only defines the states.
//!
//! ```text
//!  Active{0} ──step──▶ Active{1} ──step──▶ … ──step──▶ Active{n}
//!      │                   │                               │
//!      └─── corrupt input / close-triggering payload ──────┴──▶ Closed
//! ```

/// State of one application process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Exchanging payloads; `exchanges` counts the messages sent so far.
    ///
    /// For an initiator this is the request counter that indexes its table.
    Active { exchanges: usize },
    /// The close message has been emitted.  Terminal.
    Closed,
}

impl ProcessState {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::Active { exchanges: 0 }
    }
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active { exchanges } => write!(f, "active ({exchanges} sent)"),
            Self::Closed => f.write_str("closed"),
        }
    }
}
