pub mod builder;
pub mod distractors;
pub mod session;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuizError {
    #[error("no analyzed file to build a quiz from")]
    InsufficientData,
    #[error("no quiz in progress")]
    NoActiveSession,
    #[error("the question is no longer active")]
    StaleQuestion,
}

/// An ordered run of questions together with the player's progress.
#[derive(Debug, Clone, Default)]
pub struct Quiz {
    /// Unique per started quiz, so answers to a replaced quiz can be told apart
    pub id: u64,
    pub questions: Vec<Question>,
    pub current_question: usize,
    pub score: usize,
}

impl Quiz {
    pub fn new(id: u64, questions: Vec<Question>) -> Self {
        Self {
            id,
            questions,
            current_question: 0,
            score: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Question {
    pub text: String,
    /// Name of the metadata field the question is about
    pub field: String,
    pub answers: Vec<Answer>,
}

impl Question {
    pub fn new(text: String, field: String, answers: Vec<Answer>) -> Self {
        Self {
            text,
            field,
            answers,
        }
    }

    pub fn correct(&self) -> &str {
        self.answers
            .iter()
            .find(|a| a.is_correct)
            .map(|a| a.text.as_str())
            .unwrap_or_default()
    }

    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.answers.iter().map(|a| a.text.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answer {
    pub text: String,
    pub is_correct: bool,
}

impl Answer {
    pub fn new(text: String, is_correct: bool) -> Self {
        Self { text, is_correct }
    }
}
