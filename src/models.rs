use crate::error::QuizError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuestionType {
    #[serde(rename = "si")]
    SingleChoice,
    #[serde(rename = "mu")]
    MultipleChoice,
    #[serde(rename = "ma")]
    Matching,
    #[serde(rename = "fi")]
    FillBlank,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::SingleChoice,
        QuestionType::MultipleChoice,
        QuestionType::Matching,
        QuestionType::FillBlank,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "si",
            QuestionType::MultipleChoice => "mu",
            QuestionType::Matching => "ma",
            QuestionType::FillBlank => "fi",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, QuizError> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or_else(|| QuizError::UnknownType(tag.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeConstraints {
    pub question_type: QuestionType,
    pub min_options: usize,
    pub max_options: usize,
    pub display_name: &'static str,
}

/// Static table of per-type option-count bounds and display names.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    entries: [TypeConstraints; 4],
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self {
            entries: [
                TypeConstraints {
                    question_type: QuestionType::SingleChoice,
                    min_options: 2,
                    max_options: 7,
                    display_name: "Single choice",
                },
                TypeConstraints {
                    question_type: QuestionType::MultipleChoice,
                    min_options: 3,
                    max_options: 20,
                    display_name: "Multiple choice",
                },
                TypeConstraints {
                    question_type: QuestionType::Matching,
                    min_options: 2,
                    max_options: 20,
                    display_name: "Matching",
                },
                TypeConstraints {
                    question_type: QuestionType::FillBlank,
                    min_options: 0,
                    max_options: 0,
                    display_name: "Filling in the blank",
                },
            ],
        }
    }
}

impl TypeRegistry {
    pub fn constraints(&self, tag: &str) -> Result<&TypeConstraints, QuizError> {
        let question_type = QuestionType::from_tag(tag)?;
        Ok(self.for_type(question_type))
    }

    pub fn for_type(&self, question_type: QuestionType) -> &TypeConstraints {
        let slot = match question_type {
            QuestionType::SingleChoice => 0,
            QuestionType::MultipleChoice => 1,
            QuestionType::Matching => 2,
            QuestionType::FillBlank => 3,
        };
        &self.entries[slot]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    MissingField,
    WrongShape,
    UnknownType,
    OptionCount,
    CrossFieldConsistency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_index: Option<String>,
    pub code: IssueCode,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        question_index: Option<String>,
        code: IssueCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            question_index,
            code,
            message: message.into(),
        }
    }

    /// Legacy display key, e.g. `answer|question index: 3`.
    pub fn key(&self) -> String {
        match &self.question_index {
            Some(index) => format!("{}|question index: {}", self.field, index),
            None => self.field.clone(),
        }
    }
}

/// Validated, type-specific shape of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionBody {
    SingleChoice {
        options: Vec<String>,
        answer: String,
    },
    MultipleChoice {
        options: Vec<String>,
        answer: Vec<String>,
    },
    Matching {
        options: Vec<String>,
        matchings: Vec<String>,
        answer: Vec<String>,
    },
    FillBlank {
        answer: Vec<String>,
    },
}

impl QuestionBody {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionBody::SingleChoice { .. } => QuestionType::SingleChoice,
            QuestionBody::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionBody::Matching { .. } => QuestionType::Matching,
            QuestionBody::FillBlank { .. } => QuestionType::FillBlank,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            QuestionBody::SingleChoice { options, .. }
            | QuestionBody::MultipleChoice { options, .. }
            | QuestionBody::Matching { options, .. } => options,
            QuestionBody::FillBlank { .. } => &[],
        }
    }

    pub fn answer(&self) -> Vec<String> {
        match self {
            QuestionBody::SingleChoice { answer, .. } => vec![answer.clone()],
            QuestionBody::MultipleChoice { answer, .. }
            | QuestionBody::Matching { answer, .. }
            | QuestionBody::FillBlank { answer } => answer.clone(),
        }
    }

    pub fn matchings(&self) -> Option<&[String]> {
        match self {
            QuestionBody::Matching { matchings, .. } => Some(matchings),
            _ => None,
        }
    }
}

/// A normalized question: the only form that may be written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub index: i64,
    pub content: String,
    pub body: QuestionBody,
}

impl Question {
    pub fn to_stored(&self) -> StoredQuestion {
        StoredQuestion {
            index: self.index,
            question_type: self.body.question_type().tag().to_string(),
            content: self.content.clone(),
            options: encode_list(self.body.options()),
            answer: encode_list(&self.body.answer()),
            matchings: self.body.matchings().map(encode_list),
        }
    }
}

/// Storage row. List-valued fields hold canonical JSON arrays of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredQuestion {
    #[sqlx(rename = "idx")]
    pub index: i64,
    pub question_type: String,
    pub content: String,
    pub options: String,
    pub answer: String,
    pub matchings: Option<String>,
}

impl StoredQuestion {
    /// Rebuilds the typed question. Anything the validator would not have
    /// produced is reported as a corrupt record.
    pub fn decode(&self) -> Result<Question, QuizError> {
        let question_type = QuestionType::from_tag(&self.question_type).map_err(|_| {
            QuizError::corrupt(format!(
                "question {} has unknown type `{}`",
                self.index, self.question_type
            ))
        })?;
        let options = decode_list(&self.options, "options", self.index)?;
        let answer = decode_list(&self.answer, "answer", self.index)?;
        let matchings = match (&self.matchings, question_type) {
            (Some(raw), QuestionType::Matching) => Some(decode_list(raw, "matchings", self.index)?),
            (None, QuestionType::Matching) => {
                return Err(QuizError::corrupt(format!(
                    "matching question {} has no matchings",
                    self.index
                )))
            }
            _ => None,
        };

        let registry = TypeRegistry::default();
        let label = self.index.to_string();
        let issues = crate::validate::consistency_issues(
            registry.for_type(question_type),
            &label,
            &options,
            &answer,
            matchings.as_deref(),
        );
        if let Some(first) = issues.first() {
            return Err(QuizError::corrupt(format!(
                "question {}: {} ({})",
                self.index,
                first.message,
                first.field
            )));
        }

        let body = match question_type {
            QuestionType::SingleChoice => QuestionBody::SingleChoice {
                options,
                answer: answer.into_iter().next().unwrap_or_default(),
            },
            QuestionType::MultipleChoice => QuestionBody::MultipleChoice { options, answer },
            QuestionType::Matching => QuestionBody::Matching {
                options,
                matchings: matchings.unwrap_or_default(),
                answer,
            },
            QuestionType::FillBlank => QuestionBody::FillBlank { answer },
        };
        Ok(Question {
            index: self.index,
            content: self.content.clone(),
            body,
        })
    }
}

pub fn encode_list(items: &[String]) -> String {
    Value::from(items.to_vec()).to_string()
}

pub fn decode_list(raw: &str, field: &str, index: i64) -> Result<Vec<String>, QuizError> {
    serde_json::from_str::<Vec<String>>(raw).map_err(|err| {
        QuizError::corrupt(format!("question {index}: {field} is not a list of strings: {err}"))
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizRecord {
    pub id: i64,
    pub title: String,
    pub brief: String,
    pub category: String,
    pub shuffle: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scalar fields of a validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuiz {
    pub title: String,
    pub brief: String,
    pub category: String,
    pub shuffle: bool,
}

/// Scalar fields as submitted. On update, `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizFields {
    pub title: Option<String>,
    pub brief: Option<String>,
    pub category: Option<String>,
    pub shuffle: Option<bool>,
}

impl QuizFields {
    pub fn apply_to(&self, record: &mut QuizRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(brief) = &self.brief {
            record.brief = brief.clone();
        }
        if let Some(category) = &self.category {
            record.category = category.clone();
        }
        if let Some(shuffle) = self.shuffle {
            record.shuffle = shuffle;
        }
    }
}

/// Body of a create or update request. Questions stay untyped until validated.
#[derive(Debug, Clone, Default)]
pub struct QuizSubmission {
    pub fields: QuizFields,
    pub questions: Option<Vec<Value>>,
}
