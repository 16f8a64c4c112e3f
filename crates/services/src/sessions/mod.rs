mod progress;
mod service;
mod state;
mod transport;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::{NavStatus, QuestionStatus, SessionProgress};
pub use service::PracticeSession;
pub use state::SessionState;
pub use transport::{LocalScoring, SubmissionTransport};
pub use workflow::{PracticeLoopService, SubmitOutcome};
