mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::QuizError;
use crate::models::{NewQuiz, QuizFields, QuizRecord, StoredQuestion};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct StoredQuiz {
    pub record: QuizRecord,
    /// Ordered by question index, then insertion order.
    pub questions: Vec<StoredQuestion>,
}

/// Persistence for quizzes and their questions.
///
/// Every mutating call is all-or-nothing: either all of its writes land or
/// the stored state is left as it was.
#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn insert_quiz(
        &self,
        quiz: NewQuiz,
        questions: Vec<StoredQuestion>,
    ) -> Result<QuizRecord, QuizError>;

    /// Merges the present scalar fields, then replaces the whole question set.
    async fn replace_quiz(
        &self,
        id: i64,
        fields: QuizFields,
        questions: Vec<StoredQuestion>,
    ) -> Result<QuizRecord, QuizError>;

    async fn fetch_quiz(&self, id: i64) -> Result<Option<StoredQuiz>, QuizError>;

    /// Quizzes with their question counts, oldest first.
    async fn list_quizzes(&self, category: Option<&str>) -> Result<Vec<(QuizRecord, usize)>, QuizError>;

    /// Returns false when no such quiz existed.
    async fn delete_quiz(&self, id: i64) -> Result<bool, QuizError>;
}

fn sort_questions(questions: &mut [StoredQuestion]) {
    questions.sort_by_key(|q| q.index);
}
