//! Quiz session state machine
//!
//! `Ready -> InProgress -> AnswerLocked -> ... -> Finished`
//!
//! A session is built from an exercise pool, cycling through it until the requested number of
//! questions is reached. Each answer locks the current question; `advance` (called once the
//! reveal pause is over) moves on or finishes. The outcome can be taken exactly once.

use crate::catalog::Exercise;
use crate::error::QuizError;
use crate::progress::compute_stars;
use serde::Serialize;

/// Default number of questions per session
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// One question in a run, cloned from the pool with a run-scoped id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionInstance {
    pub instance_id: String,
    pub exercise: Exercise,
}

impl QuestionInstance {
    pub fn prompt(&self) -> &str {
        &self.exercise.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.exercise.options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    InProgress,
    AnswerLocked,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFeedback {
    Correct,
    Incorrect { correct_option: usize },
    /// Question already answered (or session over); nothing changed
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizOutcome {
    pub correct: usize,
    pub total: usize,
    pub percentage: u32,
    pub stars: u8,
}

impl QuizOutcome {
    pub fn from_score(correct: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            ((correct as f64 * 100.0) / total as f64).round() as u32
        };
        Self {
            correct,
            total,
            percentage,
            stars: compute_stars(percentage),
        }
    }
}

/// `count` instances cycling through `pool`, ids suffixed with the run index
fn build_questions(pool: &[Exercise], count: usize) -> Vec<QuestionInstance> {
    (0..count)
        .map(|i| {
            let exercise = pool[i % pool.len()].clone();
            QuestionInstance {
                instance_id: format!("{}-{}", exercise.id, i),
                exercise,
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    pool: Vec<Exercise>,
    questions: Vec<QuestionInstance>,
    index: usize,
    score: usize,
    locked: bool,
    started: bool,
    finished: bool,
    outcome_taken: bool,
}

impl QuizSession {
    pub fn start(pool: Vec<Exercise>, count: usize) -> Result<Self, QuizError> {
        if pool.is_empty() {
            return Err(QuizError::EmptyPool);
        }
        if count == 0 {
            return Err(QuizError::NoQuestions);
        }

        Ok(Self {
            questions: build_questions(&pool, count),
            pool,
            index: 0,
            score: 0,
            locked: false,
            started: false,
            finished: false,
            outcome_taken: false,
        })
    }

    /// Throw this run away and start a fresh one from the same pool
    pub fn restart(&mut self) {
        let count = self.questions.len();
        self.questions = build_questions(&self.pool, count);
        self.index = 0;
        self.score = 0;
        self.locked = false;
        self.started = false;
        self.finished = false;
        self.outcome_taken = false;
    }

    pub fn state(&self) -> SessionState {
        if self.finished {
            SessionState::Finished
        } else if self.locked {
            SessionState::AnswerLocked
        } else if self.started {
            SessionState::InProgress
        } else {
            SessionState::Ready
        }
    }

    /// Current question, `None` once finished
    pub fn current(&self) -> Option<&QuestionInstance> {
        if self.finished {
            return None;
        }
        self.questions.get(self.index)
    }

    pub fn questions(&self) -> &[QuestionInstance] {
        &self.questions
    }

    /// Zero-based position of the current question
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn submit_answer(&mut self, option: usize) -> AnswerFeedback {
        if self.locked || self.finished {
            return AnswerFeedback::Ignored;
        }
        let Some(question) = self.questions.get(self.index) else {
            return AnswerFeedback::Ignored;
        };

        let correct_option = question.exercise.correct_option;
        self.started = true;
        self.locked = true;

        if option == correct_option {
            self.score += 1;
            AnswerFeedback::Correct
        } else {
            AnswerFeedback::Incorrect { correct_option }
        }
    }

    /// Leave the reveal pause: next question, or finish after the last one.
    /// Returns the new state; no-op unless an answer is locked.
    pub fn advance(&mut self) -> SessionState {
        if !self.locked || self.finished {
            return self.state();
        }
        if self.index + 1 >= self.questions.len() {
            self.finished = true;
        } else {
            self.index += 1;
        }
        self.locked = false;
        self.state()
    }

    /// Final result, handed out once after the session finishes
    pub fn take_outcome(&mut self) -> Option<QuizOutcome> {
        if !self.finished || self.outcome_taken {
            return None;
        }
        self.outcome_taken = true;
        Some(QuizOutcome::from_score(self.score, self.questions.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn exercise(id: &str, correct: usize) -> Exercise {
        Exercise {
            id: id.to_string(),
            subject_id: "math".to_string(),
            level: 1,
            prompt: format!("prompt {}", id),
            options: vec!["0".into(), "1".into(), "2".into(), "3".into()],
            correct_option: correct,
        }
    }

    fn pool() -> Vec<Exercise> {
        vec![exercise("e1", 0), exercise("e2", 1), exercise("e3", 2)]
    }

    /// Answer every question, `correct_answers` of them right
    fn play(session: &mut QuizSession, correct_answers: usize) {
        let mut answered = 0;
        while let Some(question) = session.current().cloned() {
            let right = question.exercise.correct_option;
            let pick = if answered < correct_answers { right } else { (right + 1) % 4 };
            session.submit_answer(pick);
            session.advance();
            answered += 1;
        }
    }

    #[test]
    fn test_cycles_pool_with_distinct_ids() {
        let session = QuizSession::start(pool(), 10).unwrap();
        assert_eq!(session.total(), 10);

        let ids: HashSet<_> = session.questions().iter().map(|q| &q.instance_id).collect();
        assert_eq!(ids.len(), 10);

        let source = pool();
        for (i, question) in session.questions().iter().enumerate() {
            assert_eq!(question.exercise, source[i % 3]);
        }
    }

    #[test]
    fn test_rejects_empty_pool_and_zero_count() {
        assert_eq!(QuizSession::start(vec![], 10).unwrap_err(), QuizError::EmptyPool);
        assert_eq!(QuizSession::start(pool(), 0).unwrap_err(), QuizError::NoQuestions);
    }

    #[test]
    fn test_state_transitions() {
        let mut session = QuizSession::start(pool(), 2).unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        assert_eq!(session.submit_answer(0), AnswerFeedback::Correct);
        assert_eq!(session.state(), SessionState::AnswerLocked);

        assert_eq!(session.advance(), SessionState::InProgress);
        assert_eq!(session.index(), 1);

        assert_eq!(
            session.submit_answer(0),
            AnswerFeedback::Incorrect { correct_option: 1 }
        );
        assert_eq!(session.advance(), SessionState::Finished);
        assert!(session.current().is_none());
    }

    #[test]
    fn test_second_answer_before_advance_is_ignored() {
        let mut session = QuizSession::start(pool(), 3).unwrap();
        assert_eq!(session.submit_answer(0), AnswerFeedback::Correct);
        assert_eq!(session.submit_answer(0), AnswerFeedback::Ignored);
        assert_eq!(session.submit_answer(3), AnswerFeedback::Ignored);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn test_advance_without_answer_is_noop() {
        let mut session = QuizSession::start(pool(), 3).unwrap();
        assert_eq!(session.advance(), SessionState::Ready);
        assert_eq!(session.index(), 0);
    }

    #[test]
    fn test_six_of_ten() {
        let mut session = QuizSession::start(pool(), 10).unwrap();
        play(&mut session, 6);

        let outcome = session.take_outcome().unwrap();
        assert_eq!(outcome.correct, 6);
        assert_eq!(outcome.percentage, 60);
        assert_eq!(outcome.stars, 1);
    }

    #[test]
    fn test_outcome_taken_once() {
        let mut session = QuizSession::start(pool(), 1).unwrap();
        assert!(session.take_outcome().is_none());

        session.submit_answer(0);
        session.advance();
        assert!(session.take_outcome().is_some());
        assert!(session.take_outcome().is_none());
        assert_eq!(session.advance(), SessionState::Finished);
        assert!(session.take_outcome().is_none());
    }

    #[test]
    fn test_answers_after_finish_are_ignored() {
        let mut session = QuizSession::start(pool(), 1).unwrap();
        session.submit_answer(0);
        session.advance();
        assert_eq!(session.submit_answer(0), AnswerFeedback::Ignored);
        assert_eq!(session.score(), 1);
    }

    #[test]
    fn test_restart_resets_everything() {
        let mut session = QuizSession::start(pool(), 4).unwrap();
        play(&mut session, 4);
        assert!(session.take_outcome().is_some());

        session.restart();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.total(), 4);
        assert_eq!(session.score(), 0);
        assert!(session.take_outcome().is_none());

        play(&mut session, 1);
        assert_eq!(session.take_outcome().unwrap().percentage, 25);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(QuizOutcome::from_score(2, 3).percentage, 67);
        assert_eq!(QuizOutcome::from_score(1, 3).percentage, 33);
        assert_eq!(QuizOutcome::from_score(9, 10).stars, 3);
        assert_eq!(QuizOutcome::from_score(0, 0).percentage, 0);
    }
}
