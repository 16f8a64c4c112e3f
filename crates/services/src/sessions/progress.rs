use practice_core::model::{QuestionId, Verdict, percentage};

use super::service::PracticeSession;
use super::state::SessionState;

/// Navigation strip status of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStatus {
    Answered,
    Unanswered,
    Correct,
    Incorrect,
    NeedsReview,
}

impl From<Verdict> for NavStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Correct => NavStatus::Correct,
            Verdict::Incorrect => NavStatus::Incorrect,
            Verdict::NeedsReview => NavStatus::NeedsReview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionStatus {
    pub question_id: QuestionId,
    pub status: NavStatus,
}

/// Aggregated view of session progress, recomputed from the session on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub state: SessionState,
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub percent_answered: u32,
    pub current_index: usize,
    pub statuses: Vec<QuestionStatus>,
    /// Score of the reviewed submission.
    pub score_percentage: Option<u32>,
}

impl SessionProgress {
    #[must_use]
    pub fn from_session(session: &PracticeSession) -> Self {
        let state = session.state();
        let Some(set) = session.question_set() else {
            return Self {
                state,
                total: 0,
                answered: 0,
                remaining: 0,
                percent_answered: 0,
                current_index: 0,
                statuses: Vec::new(),
                score_percentage: None,
            };
        };

        let result = session.result().filter(|_| state == SessionState::Reviewing);
        let statuses: Vec<QuestionStatus> = set
            .questions
            .iter()
            .map(|q| {
                let reviewed = result
                    .and_then(|r| r.result_for(&q.id))
                    .map(|r| NavStatus::from(r.verdict()));
                let status = reviewed.unwrap_or_else(|| {
                    if session.answers().has_answer(&q.id) {
                        NavStatus::Answered
                    } else {
                        NavStatus::Unanswered
                    }
                });
                QuestionStatus {
                    question_id: q.id.clone(),
                    status,
                }
            })
            .collect();

        let total = set.len();
        let answered = set
            .questions
            .iter()
            .filter(|q| session.answers().has_answer(&q.id))
            .count();
        let to_u32 = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);

        Self {
            state,
            total,
            answered,
            remaining: total.saturating_sub(answered),
            percent_answered: percentage(to_u32(answered), to_u32(total)),
            current_index: session.current_index(),
            statuses,
            score_percentage: result.map(|r| r.score_percentage),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Reviewing
    }

    #[must_use]
    pub fn status_of(&self, question_id: &QuestionId) -> Option<NavStatus> {
        self.statuses
            .iter()
            .find(|s| &s.question_id == question_id)
            .map(|s| s.status)
    }
}
