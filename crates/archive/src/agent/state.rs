//! Per-request lifecycle.

use std::fmt;

/// Where a request is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Classified,
    Filtering,
    Retrieving,
    Synthesizing,
    Completed,
    Errored,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored)
    }

    /// Whether `next` may follow `self`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use RequestState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Errored {
            return true;
        }

        matches!(
            (self, next),
            (Received, Classified)
                | (Classified, Filtering)
                | (Classified, Retrieving)
                | (Retrieving, Synthesizing)
                | (Retrieving, Completed)
                | (Filtering, Completed)
                | (Synthesizing, Completed)
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Classified => "classified",
            Self::Filtering => "filtering",
            Self::Retrieving => "retrieving",
            Self::Synthesizing => "synthesizing",
            Self::Completed => "completed",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Tracks and logs the state of one request.
#[derive(Debug)]
pub struct RequestTracker {
    state: RequestState,
}

impl RequestTracker {
    pub fn new() -> Self {
        tracing::debug!(state = %RequestState::Received, "Request state");
        Self {
            state: RequestState::Received,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Move to `next`. Illegal moves are logged and ignored.
    pub fn advance(&mut self, next: RequestState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "Ignoring illegal request state transition");
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "Request state");
        self.state = next;
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}
