#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use practice_core::Clock;
pub use sessions as session;

pub use error::{LoadError, SessionError, SubmissionError};

pub use sessions::{
    LocalScoring, NavStatus, PracticeLoopService, PracticeSession, QuestionStatus, SessionProgress,
    SessionState, SubmissionTransport, SubmitOutcome,
};
