use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::metadata::{FieldValue, MetadataRecord};
use crate::quiz::{self, distractors::generate_distractors, QuizError};

pub const DISTRACTORS_PER_QUESTION: usize = 3;

/// Picks up to `amount` random fields of the record and asks about each one.
/// The questions come in the order the fields were drawn.
pub fn build_questions<R: Rng>(
    record: &MetadataRecord,
    amount: usize,
    rng: &mut R,
) -> Result<Vec<quiz::Question>, QuizError> {
    if record.is_empty() {
        return Err(QuizError::InsufficientData);
    }
    let amount = amount.min(record.len());

    let questions = index::sample(rng, record.len(), amount)
        .into_iter()
        .filter_map(|idx| record.field_at(idx))
        .map(|(field, value)| generate_question(field, value, rng))
        .collect();

    Ok(questions)
}

fn generate_question<R: Rng>(field: &str, value: &FieldValue, rng: &mut R) -> quiz::Question {
    let correct_answer = value.to_string();
    let wrong_answers = generate_distractors(value, DISTRACTORS_PER_QUESTION, rng);

    // We shuffle the answers so the correct one isn't always the first one
    let answers = {
        let mut shuffled_answers = vec![quiz::Answer::new(correct_answer, true)];
        shuffled_answers.extend(
            wrong_answers
                .into_iter()
                .map(|text| quiz::Answer::new(text, false)),
        );
        shuffled_answers.shuffle(rng);
        shuffled_answers
    };

    let question_text = format!("Яке значення поля «{}» у цього файлу?", field);
    quiz::Question::new(question_text, field.to_string(), answers)
}
