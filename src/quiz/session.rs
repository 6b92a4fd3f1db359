use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use rand::Rng;

use crate::metadata::MetadataRecord;
use crate::quiz::{builder::build_questions, Question, Quiz, QuizError};

pub const DEFAULT_QUESTIONS: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct UserState {
    pub last_record: Option<MetadataRecord>,
    pub quiz: Option<Quiz>,
}

/// A question ready to be shown, with its 1-based position in the quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub quiz_id: u64,
    pub number: usize,
    pub total: usize,
    pub question: Question,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Correct,
    Incorrect { correct_answer: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Expert,
    VeryGood,
    NotBad,
    NeedsPractice,
}

impl Tier {
    pub fn from_score(score: usize, total: usize) -> Self {
        if total == 0 || score >= total {
            Tier::Expert
        } else if score * 4 >= total * 3 {
            Tier::VeryGood
        } else if score * 2 >= total {
            Tier::NotBad
        } else {
            Tier::NeedsPractice
        }
    }

    pub fn comment(&self) -> &'static str {
        match self {
            Tier::Expert => "Бездоганно! Ти справжній експерт з медіафайлів 🏆",
            Tier::VeryGood => "Дуже добре! Ще трохи, і буде ідеально 👏",
            Tier::NotBad => "Непогано! Але є куди рости 🙂",
            Tier::NeedsPractice => "Варто ще потренуватися 📚",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub score: usize,
    pub total: usize,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Next(QuestionView),
    Finished(Summary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub verdict: Verdict,
    pub progress: Progress,
}

/// Per-user quiz state, owned by the dispatcher and shared between handlers.
///
/// Every operation locks the whole map for a short, I/O-free critical
/// section, so users never observe each other's sessions. Answers given
/// through `answer_option` name the quiz and question they were shown for and
/// are rejected once those are gone. `submit_answer` always answers whatever
/// question is current.
#[derive(Debug)]
pub struct SessionStore {
    users: Mutex<HashMap<u64, UserState>>,
    questions_per_quiz: usize,
    next_quiz_id: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTIONS)
    }
}

impl SessionStore {
    pub fn new(questions_per_quiz: usize) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            questions_per_quiz: questions_per_quiz.max(1),
            next_quiz_id: AtomicU64::new(1),
        }
    }

    fn users(&self) -> MutexGuard<'_, HashMap<u64, UserState>> {
        // A panic in another handler doesn't invalidate the map itself
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remembers the latest analyzed file of a user. Any running quiz is kept.
    pub fn set_record(&self, user_id: u64, record: MetadataRecord) {
        self.users().entry(user_id).or_default().last_record = Some(record);
    }

    /// Starts a fresh quiz from the user's last analyzed file, replacing any
    /// quiz already in progress.
    pub fn start<R: Rng>(&self, user_id: u64, rng: &mut R) -> Result<QuestionView, QuizError> {
        let mut users = self.users();
        let state = users.get_mut(&user_id).ok_or(QuizError::InsufficientData)?;
        let record = state
            .last_record
            .as_ref()
            .ok_or(QuizError::InsufficientData)?;

        let questions = build_questions(record, self.questions_per_quiz, rng)?;
        let quiz_id = self.next_quiz_id.fetch_add(1, Ordering::Relaxed);
        let quiz = Quiz::new(quiz_id, questions);
        let view = view_of(&quiz).ok_or(QuizError::InsufficientData)?;
        state.quiz = Some(quiz);

        Ok(view)
    }

    pub fn current_question(&self, user_id: u64) -> Result<QuestionView, QuizError> {
        self.users()
            .get(&user_id)
            .and_then(|s| s.quiz.as_ref())
            .and_then(view_of)
            .ok_or(QuizError::NoActiveSession)
    }

    pub fn submit_answer(&self, user_id: u64, chosen: &str) -> Result<AnswerResult, QuizError> {
        let mut users = self.users();
        let state = users.get_mut(&user_id).ok_or(QuizError::NoActiveSession)?;
        answer_current(state, chosen)
    }

    /// Answers with the option at `option` of question `number` of quiz
    /// `quiz_id`. The check and the answer happen under one lock, so an
    /// option shown for another quiz or an already answered question is
    /// rejected with `StaleQuestion` instead of landing on the current one.
    pub fn answer_option(
        &self,
        user_id: u64,
        quiz_id: u64,
        number: usize,
        option: usize,
    ) -> Result<AnswerResult, QuizError> {
        let mut users = self.users();
        let state = users.get_mut(&user_id).ok_or(QuizError::NoActiveSession)?;
        let quiz = state.quiz.as_ref().ok_or(QuizError::NoActiveSession)?;
        if quiz.id != quiz_id || quiz.current_question + 1 != number {
            return Err(QuizError::StaleQuestion);
        }
        let chosen = quiz
            .questions
            .get(quiz.current_question)
            .and_then(|q| q.answers.get(option))
            .map(|a| a.text.clone())
            .ok_or(QuizError::StaleQuestion)?;

        answer_current(state, &chosen)
    }
}

fn answer_current(state: &mut UserState, chosen: &str) -> Result<AnswerResult, QuizError> {
    let quiz = state.quiz.as_mut().ok_or(QuizError::NoActiveSession)?;
    let question = quiz
        .questions
        .get(quiz.current_question)
        .ok_or(QuizError::NoActiveSession)?;

    let verdict = if chosen == question.correct() {
        quiz.score += 1;
        Verdict::Correct
    } else {
        Verdict::Incorrect {
            correct_answer: question.correct().to_string(),
        }
    };
    quiz.current_question += 1;

    let progress = match view_of(quiz) {
        Some(next) => Progress::Next(next),
        None => {
            let summary = Summary {
                score: quiz.score,
                total: quiz.questions.len(),
                tier: Tier::from_score(quiz.score, quiz.questions.len()),
            };
            state.quiz = None;
            Progress::Finished(summary)
        }
    };

    Ok(AnswerResult { verdict, progress })
}

fn view_of(quiz: &Quiz) -> Option<QuestionView> {
    quiz.questions
        .get(quiz.current_question)
        .map(|question| QuestionView {
            quiz_id: quiz.id,
            number: quiz.current_question + 1,
            total: quiz.questions.len(),
            question: question.clone(),
        })
}
