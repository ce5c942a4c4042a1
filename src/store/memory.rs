use super::{sort_questions, QuizStore, StoredQuiz};
use crate::error::QuizError;
use crate::models::{NewQuiz, QuizFields, QuizRecord, StoredQuestion};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Process-local store. Each mutation holds the write lock for its whole
/// duration, which makes it atomic with respect to every reader.
pub struct MemoryStore {
    quizzes: RwLock<BTreeMap<i64, StoredQuiz>>,
    next_quiz_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            quizzes: RwLock::new(BTreeMap::new()),
            next_quiz_id: AtomicI64::new(1),
        }
    }

    fn next_quiz_id(&self) -> i64 {
        self.next_quiz_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn insert_quiz(
        &self,
        quiz: NewQuiz,
        mut questions: Vec<StoredQuestion>,
    ) -> Result<QuizRecord, QuizError> {
        let now = Utc::now();
        let record = QuizRecord {
            id: self.next_quiz_id(),
            title: quiz.title,
            brief: quiz.brief,
            category: quiz.category,
            shuffle: quiz.shuffle,
            created_at: now,
            updated_at: now,
        };
        sort_questions(&mut questions);
        self.quizzes.write().await.insert(
            record.id,
            StoredQuiz {
                record: record.clone(),
                questions,
            },
        );
        Ok(record)
    }

    async fn replace_quiz(
        &self,
        id: i64,
        fields: QuizFields,
        mut questions: Vec<StoredQuestion>,
    ) -> Result<QuizRecord, QuizError> {
        let mut quizzes = self.quizzes.write().await;
        let stored = quizzes.get_mut(&id).ok_or(QuizError::QuizNotFound(id))?;
        fields.apply_to(&mut stored.record);
        stored.record.updated_at = Utc::now();
        sort_questions(&mut questions);
        stored.questions = questions;
        Ok(stored.record.clone())
    }

    async fn fetch_quiz(&self, id: i64) -> Result<Option<StoredQuiz>, QuizError> {
        Ok(self.quizzes.read().await.get(&id).cloned())
    }

    async fn list_quizzes(&self, category: Option<&str>) -> Result<Vec<(QuizRecord, usize)>, QuizError> {
        let quizzes = self.quizzes.read().await;
        Ok(quizzes
            .values()
            .filter(|q| category.map_or(true, |c| q.record.category == c))
            .map(|q| (q.record.clone(), q.questions.len()))
            .collect())
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, QuizError> {
        Ok(self.quizzes.write().await.remove(&id).is_some())
    }
}
