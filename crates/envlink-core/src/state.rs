//! Environment and session states.

use std::fmt;

/// State reported by a world in every step response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvironmentState {
    /// The sequence is in progress.
    Running,
    /// The sequence ended naturally.
    Terminated,
    /// The sequence was cut short, e.g. by a world reset.
    Interrupted,
}

impl EnvironmentState {
    /// Whether the next step begins a new sequence.
    pub fn ends_sequence(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "RUNNING",
            Self::Terminated => "TERMINATED",
            Self::Interrupted => "INTERRUPTED",
        })
    }
}

/// Per-connection session state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Initial state, and the state after LeaveWorld or world destruction.
    NotJoined,
    /// Joined and mid-sequence.
    Running,
    /// Joined; the last sequence terminated.
    Terminated,
    /// Joined; the last sequence was interrupted.
    Interrupted,
}

impl SessionState {
    /// Whether the session is bound to a world.
    pub fn is_joined(self) -> bool {
        !matches!(self, Self::NotJoined)
    }
}

impl From<EnvironmentState> for SessionState {
    fn from(state: EnvironmentState) -> Self {
        match state {
            EnvironmentState::Running => Self::Running,
            EnvironmentState::Terminated => Self::Terminated,
            EnvironmentState::Interrupted => Self::Interrupted,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotJoined => "NOT_JOINED",
            Self::Running => "RUNNING",
            Self::Terminated => "TERMINATED",
            Self::Interrupted => "INTERRUPTED",
        })
    }
}
