//! Boundary between untyped submissions and the typed question model.
//!
//! Every check here accumulates issues instead of stopping at the first one,
//! except an unknown question type: nothing past it can be checked.

use crate::models::{
    IssueCode, NewQuiz, Question, QuestionBody, QuestionType, QuizFields, QuizSubmission,
    TypeConstraints, TypeRegistry, ValidationIssue,
};
use serde_json::{Map, Value};
use tracing::debug;

const REQUIRED: &str = "This field is required.";
const MUST_BE_LIST: &str = "This field must be a list.";
const MUST_BE_STRING_LIST: &str = "This field must be a list of strings.";
const ANSWER_NOT_IN_OPTIONS: &str = "answer does not match options";

const TITLE_MAX: usize = 200;
const BRIEF_MAX: usize = 2000;
const CATEGORY_MAX: usize = 64;

struct Issues {
    label: Option<String>,
    items: Vec<ValidationIssue>,
}

impl Issues {
    fn push(&mut self, field: &str, code: IssueCode, message: impl Into<String>) {
        self.items
            .push(ValidationIssue::new(field, self.label.clone(), code, message));
    }
}

/// Validates one raw question record and produces its normalized form.
pub fn validate_question(
    raw: &Value,
    registry: &TypeRegistry,
) -> Result<Question, Vec<ValidationIssue>> {
    let Some(record) = raw.as_object() else {
        return Err(vec![ValidationIssue::new(
            "question",
            None,
            IssueCode::WrongShape,
            "Each question must be an object.",
        )]);
    };

    let (label, index) = read_index(record.get("index"));
    let mut issues = Issues { label, items: Vec::new() };
    let index = match index {
        Ok(index) => Some(index),
        Err((code, message)) => {
            issues.push("index", code, message);
            None
        }
    };

    let tag = read_text(record, "type", &mut issues);
    let content = read_text(record, "content", &mut issues);
    let answer = read_list(record, "answer", REQUIRED, &mut issues);
    let options = read_list(record, "options", REQUIRED, &mut issues);
    let matchings = if tag.as_deref() == Some(QuestionType::Matching.tag()) {
        read_list(
            record,
            "matchings",
            "This field is required in matching question.",
            &mut issues,
        )
    } else {
        None
    };

    let Some(tag) = tag else {
        return Err(issues.items);
    };
    let constraints = match registry.constraints(&tag) {
        Ok(constraints) => constraints,
        Err(err) => {
            issues.push("type", IssueCode::UnknownType, err.to_string());
            return Err(issues.items);
        }
    };

    if let Some(options) = &options {
        issues
            .items
            .extend(option_count_issues(constraints, issues.label.as_deref(), options));
        if let Some(answer) = &answer {
            issues.items.extend(cross_field_issues(
                constraints.question_type,
                issues.label.as_deref(),
                options,
                answer,
                matchings.as_deref(),
            ));
        }
    }

    match (index, content, options, answer) {
        (Some(index), Some(content), Some(options), Some(answer)) if issues.items.is_empty() => {
            let body = match constraints.question_type {
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
            Ok(Question { index, content, body })
        }
        _ => Err(issues.items),
    }
}

/// Validates a whole question list, returning the union of every record's issues.
pub fn validate_questions(
    raw: Option<&[Value]>,
    registry: &TypeRegistry,
) -> Result<Vec<Question>, Vec<ValidationIssue>> {
    let Some(raw) = raw else {
        return Err(vec![ValidationIssue::new(
            "questions",
            None,
            IssueCode::MissingField,
            REQUIRED,
        )]);
    };

    let mut questions = Vec::with_capacity(raw.len());
    let mut issues = Vec::new();
    for record in raw {
        match validate_question(record, registry) {
            Ok(question) => questions.push(question),
            Err(found) => issues.extend(found),
        }
    }

    if issues.is_empty() {
        Ok(questions)
    } else {
        debug!(issues = issues.len(), questions = raw.len(), "question batch rejected");
        Err(issues)
    }
}

/// Option-count bounds and type-specific cross-field checks over already
/// decoded lists. Also used to re-check records read back from storage.
pub fn consistency_issues(
    constraints: &TypeConstraints,
    label: &str,
    options: &[String],
    answer: &[String],
    matchings: Option<&[String]>,
) -> Vec<ValidationIssue> {
    let mut issues = option_count_issues(constraints, Some(label), options);
    issues.extend(cross_field_issues(
        constraints.question_type,
        Some(label),
        options,
        answer,
        matchings,
    ));
    issues
}

fn option_count_issues(
    constraints: &TypeConstraints,
    label: Option<&str>,
    options: &[String],
) -> Vec<ValidationIssue> {
    let issue = |message: String| {
        ValidationIssue::new("options", label.map(str::to_string), IssueCode::OptionCount, message)
    };
    let mut issues = Vec::new();
    if options.len() < constraints.min_options {
        issues.push(issue(format!(
            "{} question needs at least {} options",
            constraints.display_name, constraints.min_options
        )));
    }
    if options.len() > constraints.max_options {
        issues.push(issue(format!(
            "{} question limits to {} options",
            constraints.display_name, constraints.max_options
        )));
    }
    issues
}

fn cross_field_issues(
    question_type: QuestionType,
    label: Option<&str>,
    options: &[String],
    answer: &[String],
    matchings: Option<&[String]>,
) -> Vec<ValidationIssue> {
    let issue = |field: &str, message: String| {
        ValidationIssue::new(
            field,
            label.map(str::to_string),
            IssueCode::CrossFieldConsistency,
            message,
        )
    };
    let unmatched = |issues: &mut Vec<ValidationIssue>, answer: &[String]| {
        for item in answer.iter().filter(|a| !options.contains(*a)) {
            issues.push(issue("answer", format!("{ANSWER_NOT_IN_OPTIONS}: `{item}`")));
        }
    };

    let mut issues = Vec::new();
    match question_type {
        QuestionType::Matching => {
            let matchings = matchings.unwrap_or_default();
            if options.len() != matchings.len() || matchings.len() != answer.len() {
                issues.push(issue(
                    "options, matchings, answer",
                    format!(
                        "These fields must have the same length in matching question ({}, {}, {})",
                        options.len(),
                        matchings.len(),
                        answer.len()
                    ),
                ));
            }
            unmatched(&mut issues, answer);
        }
        QuestionType::SingleChoice => {
            if answer.len() != 1 {
                issues.push(issue(
                    "answer",
                    "This field must have one item in single choice question".to_string(),
                ));
            } else {
                unmatched(&mut issues, answer);
            }
        }
        QuestionType::MultipleChoice => {
            if answer.len() > options.len() {
                issues.push(issue(
                    "answer, options",
                    "answer's length must be equal or smaller than options' in multiple choice question"
                        .to_string(),
                ));
            }
            unmatched(&mut issues, answer);
        }
        QuestionType::FillBlank => {}
    }
    issues
}

/// Integer index plus the label used to key this question's issues.
fn read_index(raw: Option<&Value>) -> (Option<String>, Result<i64, (IssueCode, &'static str)>) {
    let wrong_shape = (IssueCode::WrongShape, "A valid integer is required.");
    match raw {
        None | Some(Value::Null) => (None, Err((IssueCode::MissingField, REQUIRED))),
        Some(Value::Number(n)) => (Some(n.to_string()), n.as_i64().ok_or(wrong_shape)),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                (None, Err((IssueCode::MissingField, REQUIRED)))
            } else {
                (Some(s.to_string()), s.parse::<i64>().map_err(|_| wrong_shape))
            }
        }
        Some(other) => (Some(other.to_string()), Err(wrong_shape)),
    }
}

fn read_text(record: &Map<String, Value>, field: &str, issues: &mut Issues) -> Option<String> {
    match record.get(field) {
        None | Some(Value::Null) => {
            issues.push(field, IssueCode::MissingField, REQUIRED);
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            issues.push(field, IssueCode::MissingField, REQUIRED);
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            issues.push(field, IssueCode::WrongShape, "This field must be a string.");
            None
        }
    }
}

fn read_list(
    record: &Map<String, Value>,
    field: &str,
    missing_message: &str,
    issues: &mut Issues,
) -> Option<Vec<String>> {
    match record.get(field) {
        None | Some(Value::Null) => {
            issues.push(field, IssueCode::MissingField, missing_message);
            None
        }
        Some(Value::Array(items)) => {
            let strings: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
            if strings.is_none() {
                issues.push(field, IssueCode::WrongShape, MUST_BE_STRING_LIST);
            }
            strings
        }
        Some(_) => {
            issues.push(field, IssueCode::WrongShape, MUST_BE_LIST);
            None
        }
    }
}

/// Reads the shape of a create or update body. Every mistyped field is
/// reported; content rules are checked afterwards.
pub fn read_submission(raw: &Value) -> Result<QuizSubmission, Vec<ValidationIssue>> {
    let Some(body) = raw.as_object() else {
        return Err(vec![ValidationIssue::new(
            "body",
            None,
            IssueCode::WrongShape,
            "Expected a JSON object.",
        )]);
    };

    let mut issues = Issues { label: None, items: Vec::new() };
    let fields = QuizFields {
        title: optional_text(body, "title", &mut issues),
        brief: optional_text(body, "brief", &mut issues),
        category: optional_text(body, "category", &mut issues),
        shuffle: match body.get("shuffle") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(flag)) => Some(*flag),
            Some(_) => {
                issues.push("shuffle", IssueCode::WrongShape, "Must be a valid boolean.");
                None
            }
        },
    };
    let questions = match body.get("questions") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items.clone()),
        Some(_) => {
            issues.push("questions", IssueCode::WrongShape, MUST_BE_LIST);
            None
        }
    };

    if issues.items.is_empty() {
        Ok(QuizSubmission { fields, questions })
    } else {
        debug!(issues = issues.items.len(), "quiz body has mistyped fields");
        Err(issues.items)
    }
}

fn optional_text(record: &Map<String, Value>, field: &str, issues: &mut Issues) -> Option<String> {
    match record.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            issues.push(field, IssueCode::WrongShape, "This field must be a string.");
            None
        }
    }
}

/// Scalar quiz fields. With `creating` set, title and category are required.
pub fn quiz_field_issues(fields: &QuizFields, creating: bool) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut text = |field: &str, value: Option<&String>, required: bool, max: usize| match value {
        None if required => issues.push(ValidationIssue::new(
            field,
            None,
            IssueCode::MissingField,
            REQUIRED,
        )),
        None => {}
        Some(v) if required && v.trim().is_empty() => issues.push(ValidationIssue::new(
            field,
            None,
            IssueCode::MissingField,
            "This field may not be blank.",
        )),
        Some(v) if v.chars().count() > max => issues.push(ValidationIssue::new(
            field,
            None,
            IssueCode::WrongShape,
            format!("Ensure this field has no more than {max} characters."),
        )),
        Some(_) => {}
    };

    // on update a present title/category still may not be blank
    text("title", fields.title.as_ref(), creating || fields.title.is_some(), TITLE_MAX);
    text("brief", fields.brief.as_ref(), false, BRIEF_MAX);
    text(
        "category",
        fields.category.as_ref(),
        creating || fields.category.is_some(),
        CATEGORY_MAX,
    );
    issues
}

pub fn validate_new_quiz(fields: &QuizFields) -> Result<NewQuiz, Vec<ValidationIssue>> {
    let issues = quiz_field_issues(fields, true);
    if !issues.is_empty() {
        return Err(issues);
    }
    Ok(NewQuiz {
        title: fields.title.clone().unwrap_or_default(),
        brief: fields.brief.clone().unwrap_or_default(),
        category: fields.category.clone().unwrap_or_default(),
        shuffle: fields.shuffle.unwrap_or(false),
    })
}
