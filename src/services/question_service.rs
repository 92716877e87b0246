use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::question::NewQuestion;
use crate::store::ExamStore;

#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn ExamStore>,
}

impl QuestionService {
    pub fn new(store: Arc<dyn ExamStore>) -> Self {
        Self { store }
    }

    /// Imports questions into the bank after validating each one: options
    /// must be a non-empty JSON object and the answer must name one of its
    /// labels. All-or-nothing: validation failures abort the import and the
    /// insert is a single transaction, so a failed import persists nothing.
    pub async fn import_questions(&self, questions: Vec<NewQuestion>) -> Result<usize> {
        for (index, question) in questions.iter().enumerate() {
            validate_question(question)
                .map_err(|msg| Error::BadRequest(format!("Question {}: {}", index + 1, msg)))?;
        }

        let imported = self.store.insert_questions(questions).await?.len();
        tracing::info!(imported, "questions imported");
        Ok(imported)
    }
}

fn validate_question(question: &NewQuestion) -> std::result::Result<(), String> {
    if question.question.trim().is_empty() {
        return Err("question text is empty".to_string());
    }
    let Some(options) = question.options.as_object() else {
        return Err("options must be a JSON object of labeled choices".to_string());
    };
    if options.is_empty() {
        return Err("options must not be empty".to_string());
    }
    if !options.contains_key(&question.answer) {
        return Err(format!(
            "answer '{}' is not one of the option labels",
            question.answer
        ));
    }
    Ok(())
}
