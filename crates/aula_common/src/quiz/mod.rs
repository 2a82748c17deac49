//! Quiz sessions
//!
//! `session` is the pure state machine; `arena` ties a session to a level and commits
//! its result.

pub mod arena;
pub mod session;

pub use arena::QuizArena;
pub use session::{
    AnswerFeedback, QuestionInstance, QuizOutcome, QuizSession, SessionState,
    DEFAULT_QUESTION_COUNT,
};
