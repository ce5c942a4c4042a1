use crate::error::QuizError;
use crate::models::{Question, StoredQuestion, TypeRegistry, ValidationIssue};
use crate::present::{
    present_question, present_quiz, summarize, QuestionView, QuizSummary, QuizView, ViewMode,
};
use crate::store::{MemoryStore, QuizStore};
use crate::validate::{
    quiz_field_issues, read_submission, validate_new_quiz, validate_question, validate_questions,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QuizStore>,
    pub registry: Arc<TypeRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn QuizStore>) -> Self {
        Self {
            store,
            registry: Arc::new(TypeRegistry::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Validates the quiz and every question, then stores them together.
    /// Nothing is written unless the whole submission is valid.
    pub async fn create_quiz(&self, raw: &Value) -> Result<QuizView, QuizError> {
        let submission = read_submission(raw)
            .map_err(QuizError::Validation)
            .inspect_err(|err| log_rejection("create", None, err))?;
        let (quiz, questions) = combine(
            validate_new_quiz(&submission.fields),
            validate_questions(submission.questions.as_deref(), &self.registry),
        )
        .inspect_err(|err| log_rejection("create", None, err))?;

        let stored = to_stored(&questions);
        let record = self.store.insert_quiz(quiz, stored.clone()).await?;
        info!(quiz_id = record.id, questions = stored.len(), "quiz created");
        present_quiz(&record, &stored, ViewMode::Review, &mut rand::thread_rng())
    }

    /// Overwrites the submitted scalar fields and replaces the question set
    /// as one unit. On any failure the previous questions stay in place.
    pub async fn update_quiz(
        &self,
        id: i64,
        raw: &Value,
    ) -> Result<QuizView, QuizError> {
        let submission = read_submission(raw)
            .map_err(QuizError::Validation)
            .inspect_err(|err| log_rejection("update", Some(id), err))?;
        let field_issues = quiz_field_issues(&submission.fields, false);
        let fields = if field_issues.is_empty() { Ok(()) } else { Err(field_issues) };
        let ((), questions) = combine(
            fields,
            validate_questions(submission.questions.as_deref(), &self.registry),
        )
        .inspect_err(|err| log_rejection("update", Some(id), err))?;

        let stored = to_stored(&questions);
        let record = self
            .store
            .replace_quiz(id, submission.fields, stored.clone())
            .await?;
        info!(quiz_id = id, questions = stored.len(), "quiz questions replaced");
        present_quiz(&record, &stored, ViewMode::Review, &mut rand::thread_rng())
    }

    pub async fn read_quiz(&self, id: i64, mode: ViewMode) -> Result<QuizView, QuizError> {
        let stored = self
            .store
            .fetch_quiz(id)
            .await?
            .ok_or(QuizError::QuizNotFound(id))?;
        present_quiz(&stored.record, &stored.questions, mode, &mut rand::thread_rng())
    }

    pub async fn list_quizzes(&self, category: Option<&str>) -> Result<Vec<QuizSummary>, QuizError> {
        let quizzes = self.store.list_quizzes(category).await?;
        Ok(quizzes
            .iter()
            .map(|(record, count)| summarize(record, *count))
            .collect())
    }

    pub async fn delete_quiz(&self, id: i64) -> Result<(), QuizError> {
        if !self.store.delete_quiz(id).await? {
            return Err(QuizError::QuizNotFound(id));
        }
        info!(quiz_id = id, "quiz deleted");
        Ok(())
    }

    /// Authoring preview: the normalized review view of one question, nothing stored.
    pub fn preview_question(&self, raw: &Value) -> Result<QuestionView, QuizError> {
        let question = validate_question(raw, &self.registry).map_err(QuizError::Validation)?;
        present_question(&question.to_stored(), ViewMode::Review, false)
    }
}

fn combine<A, B>(
    a: Result<A, Vec<ValidationIssue>>,
    b: Result<B, Vec<ValidationIssue>>,
) -> Result<(A, B), QuizError> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (a, b) => {
            let mut issues = a.err().unwrap_or_default();
            issues.extend(b.err().unwrap_or_default());
            Err(QuizError::Validation(issues))
        }
    }
}

fn to_stored(questions: &[Question]) -> Vec<StoredQuestion> {
    let mut stored: Vec<StoredQuestion> = questions.iter().map(Question::to_stored).collect();
    stored.sort_by_key(|q| q.index);
    stored
}

fn log_rejection(action: &str, quiz_id: Option<i64>, err: &QuizError) {
    if let QuizError::Validation(issues) = err {
        warn!(action, ?quiz_id, issues = issues.len(), "quiz submission rejected");
    }
}
