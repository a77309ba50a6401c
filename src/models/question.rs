// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{config::OPTION_COUNT, error::AppError};

/// A single multiple-choice question.
///
/// Deserialization goes through [`Question::new`], so stored data with an
/// out-of-range answer is rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredQuestion")]
pub struct Question {
    /// The text content of the question.
    pub text: String,

    /// Exactly four answer options, in display order.
    pub options: [String; OPTION_COUNT],

    /// Index of the correct option, 0-based.
    /// External formats use 1-based numbering and convert at the boundary.
    pub correct: usize,

    pub category: String,
}

impl Question {
    pub fn new(
        text: impl Into<String>,
        options: [String; OPTION_COUNT],
        correct: usize,
        category: impl Into<String>,
    ) -> Result<Self, AppError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::BadRequest("Question text cannot be empty".to_string()));
        }
        if correct >= OPTION_COUNT {
            return Err(AppError::BadRequest(format!(
                "Correct option index {} is out of range 0..={}",
                correct,
                OPTION_COUNT - 1
            )));
        }

        Ok(Self {
            text,
            options,
            correct,
            category: category.into(),
        })
    }

    pub fn correct_text(&self) -> Option<&str> {
        self.options.get(self.correct).map(String::as_str)
    }
}

#[derive(Deserialize)]
struct StoredQuestion {
    text: String,
    options: [String; OPTION_COUNT],
    correct: usize,
    category: String,
}

impl TryFrom<StoredQuestion> for Question {
    type Error = String;

    fn try_from(raw: StoredQuestion) -> Result<Self, Self::Error> {
        Question::new(raw.text, raw.options, raw.correct, raw.category)
            .map_err(|e| e.message().to_string())
    }
}

/// A named, ordered collection of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSet {
    pub name: String,
    pub questions: Vec<Question>,
}

impl QuizSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            questions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Built-in set used when nothing has been configured yet.
    pub fn builtin() -> Self {
        let category = "Technical";
        let q = |text: &str, options: [&str; OPTION_COUNT], correct: usize| Question {
            text: text.to_string(),
            options: options.map(str::to_string),
            correct,
            category: category.to_string(),
        };

        Self {
            name: category.to_string(),
            questions: vec![
                q(
                    "What does HTML stand for?",
                    [
                        "Hyper Text Markup Language",
                        "High Tech Modern Language",
                        "Hyper Transfer Markup Language",
                        "Home Tool Markup Language",
                    ],
                    0,
                ),
                q(
                    "Which programming language is known as the 'language of the web'?",
                    ["Python", "Java", "JavaScript", "C++"],
                    2,
                ),
                q(
                    "What is the purpose of CSS?",
                    [
                        "To structure web content",
                        "To add interactivity to websites",
                        "To style and layout web pages",
                        "To manage databases",
                    ],
                    2,
                ),
            ],
        }
    }
}

/// DTO for sending a question to a quiz taker (excludes the answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    /// 1-based position in the quiz.
    pub number: usize,
    pub text: String,
    pub options: [String; OPTION_COUNT],
}

impl PublicQuestion {
    pub fn from_question(index: usize, question: &Question) -> Self {
        Self {
            number: index + 1,
            text: question.text.clone(),
            options: question.options.clone(),
        }
    }
}

/// Catalog overview row.
#[derive(Debug, Serialize)]
pub struct QuizSetSummary {
    pub name: String,
    pub question_count: usize,
    pub active: bool,
}

/// DTO for creating or replacing a question.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    /// 0-based.
    #[validate(range(max = 3))]
    pub correct_index: usize,
}

impl QuestionRequest {
    pub fn into_question(self, category: &str) -> Result<Question, AppError> {
        if let Err(validation_errors) = self.validate() {
            return Err(AppError::BadRequest(validation_errors.to_string()));
        }

        let options: [String; OPTION_COUNT] = self
            .options
            .try_into()
            .map_err(|_| AppError::BadRequest(format!("Exactly {} options are required", OPTION_COUNT)))?;

        Question::new(self.text, options, self.correct_index, category)
    }
}

/// DTO for creating a new quiz set.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizSetRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub questions: Vec<QuestionRequest>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTION_COUNT {
        return Err(validator::ValidationError::new("options_must_have_four_entries"));
    }
    if options[0].trim().is_empty() {
        return Err(validator::ValidationError::new("first_option_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
