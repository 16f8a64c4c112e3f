mod answer;
mod answer_store;
mod attempt;
mod ids;
pub mod question;
mod question_set;
mod result;

pub use answer::{AnswerValue, MatchMap, NativeAnswer, TransportValue};
pub use answer_store::{AnswerStore, TransportSnapshot};
pub use attempt::{AttemptError, AttemptSummary};
pub use ids::{CourseId, ParseIdError, QuestionId, QuestionSetId};
pub use question::{
    ChoiceOption, Citation, Difficulty, MatchPair, Question, QuestionBody, QuestionError,
    QuestionKind,
};
pub use question_set::{QuestionSet, QuestionSetError};
pub use result::{
    AnswerDiagnostic, QuestionResult, ScoredSubmission, SubmissionResult, Verdict, percentage,
};
