use crate::error::QuizError;
use crate::models::{QuestionType, QuizRecord, StoredQuestion};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// No answers; options shuffled per read when the quiz asks for it.
    #[default]
    Taking,
    /// Answers included, stored order.
    Review,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub index: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matchings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    pub id: i64,
    pub title: String,
    pub brief: String,
    pub category: String,
    pub shuffle: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub questions: Vec<QuestionView>,
}

/// Listing entry. The shuffle flag stays internal to the full views.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub brief: String,
    pub category: String,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

pub fn present_question(
    stored: &StoredQuestion,
    mode: ViewMode,
    shuffle: bool,
) -> Result<QuestionView, QuizError> {
    present_question_with(stored, mode, shuffle, &mut rand::thread_rng())
}

pub fn present_question_with<R: Rng + ?Sized>(
    stored: &StoredQuestion,
    mode: ViewMode,
    shuffle: bool,
    rng: &mut R,
) -> Result<QuestionView, QuizError> {
    let question = stored.decode()?;
    let mut options = question.body.options().to_vec();
    let mut matchings = question.body.matchings().map(<[String]>::to_vec);

    let answer = match mode {
        ViewMode::Review => Some(question.body.answer()),
        ViewMode::Taking => {
            if shuffle {
                let mut order: Vec<usize> = (0..options.len()).collect();
                order.shuffle(rng);
                options = order.iter().map(|&i| options[i].clone()).collect();
                // matchings move in lockstep with their options
                if let Some(m) = matchings.as_mut() {
                    *m = order.iter().filter_map(|&i| m.get(i).cloned()).collect();
                }
            }
            None
        }
    };

    Ok(QuestionView {
        index: question.index,
        question_type: question.body.question_type(),
        content: question.content,
        options,
        matchings,
        answer,
    })
}

pub fn present_quiz<R: Rng + ?Sized>(
    quiz: &QuizRecord,
    questions: &[StoredQuestion],
    mode: ViewMode,
    rng: &mut R,
) -> Result<QuizView, QuizError> {
    let mut views = questions
        .iter()
        .map(|q| present_question_with(q, mode, quiz.shuffle, rng))
        .collect::<Result<Vec<_>, _>>()?;
    if mode == ViewMode::Taking && quiz.shuffle {
        views.shuffle(rng);
    }

    Ok(QuizView {
        id: quiz.id,
        title: quiz.title.clone(),
        brief: quiz.brief.clone(),
        category: quiz.category.clone(),
        shuffle: quiz.shuffle,
        created_at: quiz.created_at,
        updated_at: quiz.updated_at,
        questions: views,
    })
}

pub fn summarize(quiz: &QuizRecord, question_count: usize) -> QuizSummary {
    QuizSummary {
        id: quiz.id,
        title: quiz.title.clone(),
        brief: quiz.brief.clone(),
        category: quiz.category.clone(),
        question_count,
        created_at: quiz.created_at,
    }
}
