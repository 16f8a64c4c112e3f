use std::fmt;

/// Lifecycle of a practice session.
///
/// `Idle -> Loaded -> Answering -> Submitting -> Reviewing`, and back to
/// `Answering` on restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// A set is loaded but has no questions to answer.
    Loaded,
    Answering,
    Submitting,
    Reviewing,
}

impl SessionState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loaded => "loaded",
            SessionState::Answering => "answering",
            SessionState::Submitting => "submitting",
            SessionState::Reviewing => "reviewing",
        }
    }

    /// Only `Answering` accepts answer mutations.
    #[must_use]
    pub fn accepts_answers(self) -> bool {
        matches!(self, SessionState::Answering)
    }

    /// `submit()` may start from a loaded set, empty or not.
    #[must_use]
    pub fn can_submit(self) -> bool {
        matches!(self, SessionState::Loaded | SessionState::Answering)
    }

    /// A set is present and can be navigated.
    #[must_use]
    pub fn has_set(self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
