use super::{QuizStore, StoredQuiz};
use crate::error::QuizError;
use crate::models::{NewQuiz, QuizFields, QuizRecord, StoredQuestion};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use tracing::debug;

const SELECT_QUIZ: &str =
    "SELECT id, title, brief, category, shuffle, created_at, updated_at FROM quizzes WHERE id = ?";

#[derive(sqlx::FromRow)]
struct QuizListRow {
    #[sqlx(flatten)]
    record: QuizRecord,
    question_count: i64,
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, QuizError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = if is_memory_url(url) {
            // every connection to an in-memory url opens its own empty database
            debug!(requested = max_connections, "in-memory sqlite pinned to one connection");
            Self::single_connection().connect_with(options).await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options)
                .await?
        };
        Self::from_pool(pool).await
    }

    fn single_connection() -> SqlitePoolOptions {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    }

    /// Private database that lives as long as the store. Used by tests.
    pub async fn in_memory() -> Result<Self, QuizError> {
        let pool = Self::single_connection().connect("sqlite::memory:").await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, QuizError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(Self { pool })
    }

    async fn fetch_record(
        tx: &mut Transaction<'_, Sqlite>,
        id: i64,
    ) -> Result<Option<QuizRecord>, sqlx::Error> {
        sqlx::query_as::<_, QuizRecord>(SELECT_QUIZ)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    async fn insert_questions(
        tx: &mut Transaction<'_, Sqlite>,
        quiz_id: i64,
        questions: &[StoredQuestion],
    ) -> Result<(), sqlx::Error> {
        for q in questions {
            sqlx::query(
                r#"
                INSERT INTO questions (quiz_id, idx, question_type, content, options, answer, matchings)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(quiz_id)
            .bind(q.index)
            .bind(&q.question_type)
            .bind(&q.content)
            .bind(&q.options)
            .bind(&q.answer)
            .bind(&q.matchings)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl QuizStore for SqliteStore {
    async fn insert_quiz(
        &self,
        quiz: NewQuiz,
        questions: Vec<StoredQuestion>,
    ) -> Result<QuizRecord, QuizError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO quizzes (title, brief, category, shuffle, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&quiz.title)
        .bind(&quiz.brief)
        .bind(&quiz.category)
        .bind(quiz.shuffle)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        Self::insert_questions(&mut tx, id, &questions).await?;
        tx.commit().await?;

        debug!(quiz_id = id, questions = questions.len(), "quiz rows inserted");
        Ok(QuizRecord {
            id,
            title: quiz.title,
            brief: quiz.brief,
            category: quiz.category,
            shuffle: quiz.shuffle,
            created_at: now,
            updated_at: now,
        })
    }

    async fn replace_quiz(
        &self,
        id: i64,
        fields: QuizFields,
        questions: Vec<StoredQuestion>,
    ) -> Result<QuizRecord, QuizError> {
        // an early return drops `tx`, which rolls back
        let mut tx = self.pool.begin().await?;
        let mut record = Self::fetch_record(&mut tx, id)
            .await?
            .ok_or(QuizError::QuizNotFound(id))?;
        fields.apply_to(&mut record);
        record.updated_at = Utc::now();

        sqlx::query(
            "UPDATE quizzes SET title = ?, brief = ?, category = ?, shuffle = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&record.title)
        .bind(&record.brief)
        .bind(&record.category)
        .bind(record.shuffle)
        .bind(record.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM questions WHERE quiz_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::insert_questions(&mut tx, id, &questions).await?;
        tx.commit().await?;

        debug!(quiz_id = id, questions = questions.len(), "quiz rows replaced");
        Ok(record)
    }

    async fn fetch_quiz(&self, id: i64) -> Result<Option<StoredQuiz>, QuizError> {
        let mut tx = self.pool.begin().await?;
        let Some(record) = Self::fetch_record(&mut tx, id).await? else {
            return Ok(None);
        };
        let questions = sqlx::query_as::<_, StoredQuestion>(
            r#"
            SELECT idx, question_type, content, options, answer, matchings
            FROM questions
            WHERE quiz_id = ?
            ORDER BY idx, id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(StoredQuiz { record, questions }))
    }

    async fn list_quizzes(&self, category: Option<&str>) -> Result<Vec<(QuizRecord, usize)>, QuizError> {
        let rows = sqlx::query_as::<_, QuizListRow>(
            r#"
            SELECT q.id, q.title, q.brief, q.category, q.shuffle, q.created_at, q.updated_at,
                   (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS question_count
            FROM quizzes q
            WHERE ?1 IS NULL OR q.category = ?1
            ORDER BY q.id
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.record, usize::try_from(row.question_count).unwrap_or(0)))
            .collect())
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, QuizError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM questions WHERE quiz_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM quizzes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_quiz() -> NewQuiz {
        NewQuiz {
            title: "Arithmetic".into(),
            brief: "sums".into(),
            category: "math".into(),
            shuffle: true,
        }
    }

    fn question(index: i64, answer: &str) -> StoredQuestion {
        StoredQuestion {
            index,
            question_type: "si".into(),
            content: format!("q{index}"),
            options: r#"["3","4","5"]"#.into(),
            answer: format!(r#"["{answer}"]"#),
            matchings: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_round_trip() {
        let store = SqliteStore::in_memory().await.unwrap();
        let record = store
            .insert_quiz(new_quiz(), vec![question(2, "4"), question(1, "3")])
            .await
            .unwrap();
        let stored = store.fetch_quiz(record.id).await.unwrap().unwrap();
        assert_eq!(stored.record.title, "Arithmetic");
        assert!(stored.record.shuffle);
        assert_eq!(stored.questions, vec![question(1, "3"), question(2, "4")]);
    }

    #[tokio::test]
    async fn replace_merges_fields_and_swaps_questions() {
        let store = SqliteStore::in_memory().await.unwrap();
        let record = store
            .insert_quiz(new_quiz(), vec![question(1, "3"), question(2, "4")])
            .await
            .unwrap();
        let updated = store
            .replace_quiz(
                record.id,
                QuizFields {
                    title: Some("Sums".into()),
                    ..QuizFields::default()
                },
                vec![question(5, "5")],
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Sums");
        assert_eq!(updated.category, "math");

        let stored = store.fetch_quiz(record.id).await.unwrap().unwrap();
        assert_eq!(stored.record.brief, "sums");
        assert_eq!(stored.questions, vec![question(5, "5")]);
    }

    #[tokio::test]
    async fn replace_unknown_quiz_leaves_nothing_behind() {
        let store = SqliteStore::in_memory().await.unwrap();
        let err = store
            .replace_quiz(99, QuizFields::default(), vec![question(1, "3")])
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::QuizNotFound(99)));
        assert!(store.list_quizzes(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_counts_questions_and_filters() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .insert_quiz(new_quiz(), vec![question(1, "3"), question(2, "4")])
            .await
            .unwrap();
        let mut other = new_quiz();
        other.category = "geo".into();
        store.insert_quiz(other, vec![]).await.unwrap();

        let all = store.list_quizzes(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1, 2);
        let geo = store.list_quizzes(Some("geo")).await.unwrap();
        assert_eq!(geo.len(), 1);
        assert_eq!(geo[0].1, 0);
    }

    #[tokio::test]
    async fn delete_removes_quiz_and_questions() {
        let store = SqliteStore::in_memory().await.unwrap();
        let record = store.insert_quiz(new_quiz(), vec![question(1, "3")]).await.unwrap();
        assert!(store.delete_quiz(record.id).await.unwrap());
        assert!(store.fetch_quiz(record.id).await.unwrap().is_none());
        assert!(!store.delete_quiz(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn memory_url_keeps_one_database_across_requests() {
        let store = SqliteStore::connect("sqlite::memory:", 5).await.unwrap();
        assert_eq!(store.pool.options().get_max_connections(), 1);
        assert!(store.pool.options().get_idle_timeout().is_none());
        assert!(store.pool.options().get_max_lifetime().is_none());

        let record = store
            .insert_quiz(new_quiz(), vec![question(1, "3")])
            .await
            .unwrap();
        let (first, second) = tokio::join!(store.fetch_quiz(record.id), store.list_quizzes(None));
        assert!(first.unwrap().is_some());
        assert_eq!(second.unwrap().len(), 1);
    }

    #[test]
    fn memory_urls_are_recognized() {
        assert!(is_memory_url("sqlite::memory:"));
        assert!(is_memory_url("sqlite://file:quiz?mode=memory&cache=shared"));
        assert!(!is_memory_url("sqlite://quizdeck.db"));
    }
}
