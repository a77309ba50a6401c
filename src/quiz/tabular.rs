// src/quiz/tabular.rs

//! CSV codec for question sets and result exports.
//!
//! Import schema: `question, option1, option2, option3, option4,
//! correct_answer, category`, with `correct_answer` numbered from 1.

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::{
    config::{DEFAULT_CATEGORY, OPTION_COUNT},
    error::AppError,
    models::{
        question::{Question, QuizSet},
        result::QuizResult,
    },
};

pub const COLUMNS: [&str; 7] = [
    "question",
    "option1",
    "option2",
    "option3",
    "option4",
    "correct_answer",
    "category",
];

const CATEGORY_COLUMN: usize = 6;

/// How strictly header names are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMode {
    /// Case-insensitive, tolerant of spaces and of extra words around the
    /// column name. `category` may be missing.
    #[default]
    Lenient,
    /// Header set must be exactly [`COLUMNS`].
    Strict,
}

/// One data row, mapped by header but not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct RawRow {
    /// 1-based line in the source file.
    pub line: u64,
    #[validate(length(min = 1, message = "question is required"))]
    pub question: String,
    #[validate(length(min = 1, message = "option1 is required"))]
    pub option1: String,
    pub option2: String,
    pub option3: String,
    pub option4: String,
    #[validate(custom(function = validate_correct_answer))]
    pub correct_answer: String,
    pub category: String,
}

fn validate_correct_answer(raw: &str) -> Result<(), ValidationError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if (1..=OPTION_COUNT).contains(&n) => Ok(()),
        Ok(_) => Err(ValidationError::new("correct_answer_out_of_range")
            .with_message(format!("correct_answer must be between 1 and {}", OPTION_COUNT).into())),
        Err(_) => Err(ValidationError::new("correct_answer_not_a_number")
            .with_message("correct_answer must be a number".into())),
    }
}

impl RawRow {
    /// Category the row belongs to, defaulting blank values.
    pub fn category_name(&self) -> &str {
        let trimmed = self.category.trim();
        if trimmed.is_empty() { DEFAULT_CATEGORY } else { trimmed }
    }

    /// Validates the row and converts it into a question with a 0-based answer.
    pub fn into_question(self, category: &str) -> Result<Question, String> {
        self.validate().map_err(|e| e.to_string())?;

        let correct = self
            .correct_answer
            .trim()
            .parse::<usize>()
            .map_err(|e| e.to_string())?
            - 1;

        Question::new(
            self.question,
            [self.option1, self.option2, self.option3, self.option4],
            correct,
            category,
        )
        .map_err(|e| e.message().to_string())
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Maps each schema column to its position in the header record.
fn resolve_header(headers: &csv::StringRecord, mode: HeaderMode) -> Result<[Option<usize>; 7], AppError> {
    let names: Vec<String> = headers.iter().map(normalize_header).collect();
    let mut positions = [None; 7];

    match mode {
        HeaderMode::Strict => {
            if names.len() != COLUMNS.len() {
                return Err(AppError::BadRequest(format!(
                    "Header must contain exactly the columns: {}",
                    COLUMNS.join(", ")
                )));
            }
            for (slot, column) in positions.iter_mut().zip(COLUMNS) {
                *slot = names.iter().position(|n| n == column);
                if slot.is_none() {
                    return Err(AppError::BadRequest(format!("Missing column '{}'", column)));
                }
            }
        }
        HeaderMode::Lenient => {
            for (slot, column) in positions.iter_mut().zip(COLUMNS) {
                *slot = names
                    .iter()
                    .position(|n| n == column)
                    .or_else(|| names.iter().position(|n| n.contains(column)));
            }
            let missing: Vec<&str> = COLUMNS
                .iter()
                .zip(positions.iter())
                .enumerate()
                .filter(|(i, (_, p))| *i != CATEGORY_COLUMN && p.is_none())
                .map(|(_, (c, _))| *c)
                .collect();
            if !missing.is_empty() {
                return Err(AppError::BadRequest(format!(
                    "Missing required columns: {}",
                    missing.join(", ")
                )));
            }
        }
    }

    Ok(positions)
}

/// Reads CSV text into header-mapped rows.
///
/// Fails only when the header itself is unusable; row contents are checked
/// later, one row at a time.
pub fn parse_questions_csv(data: &str, mode: HeaderMode) -> Result<Vec<RawRow>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let positions = resolve_header(reader.headers()?, mode)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let field = |column: usize| {
            positions[column]
                .and_then(|p| record.get(p))
                .unwrap_or_default()
                .to_string()
        };

        rows.push(RawRow {
            line: record.position().map(|p| p.line()).unwrap_or_default(),
            question: field(0),
            option1: field(1),
            option2: field(2),
            option3: field(3),
            option4: field(4),
            correct_answer: field(5),
            category: field(6),
        });
    }

    Ok(rows)
}

fn write_failed(err: csv::Error) -> AppError {
    AppError::InternalServerError(format!("CSV export failed: {}", err))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, AppError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Writes a quiz set in the import schema, every field quoted.
pub fn write_quiz_set_csv(set: &QuizSet) -> Result<String, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer.write_record(COLUMNS).map_err(write_failed)?;
    for question in &set.questions {
        let correct = (question.correct + 1).to_string();
        writer.write_record([
            question.text.as_str(),
            question.options[0].as_str(),
            question.options[1].as_str(),
            question.options[2].as_str(),
            question.options[3].as_str(),
            correct.as_str(),
            question.category.as_str(),
        ])
        .map_err(write_failed)?;
    }

    finish(writer)
}

/// Writes the results ledger for download, every field quoted.
pub fn write_results_csv<'a>(results: impl IntoIterator<Item = &'a QuizResult>) -> Result<String, AppError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    writer
        .write_record(["Employee ID", "Name", "Score", "Percentage", "Status", "Date"])
        .map_err(write_failed)?;
    for result in results {
        writer.write_record([
            result.taker_id.clone(),
            result.taker_name.clone(),
            format!("{}/{}", result.score, result.total),
            format!("{}%", result.percentage),
            result.status_label().to_string(),
            result.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ])
        .map_err(write_failed)?;
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "question,option1,option2,option3,option4,correct_answer,category\n\
        \"Fire exit?\",Left,Right,Up,Down,2,Safety\n\
        \"PPE means?\",\"Personal Protective Equipment\",x,y,z,1,Safety\n";

    #[test]
    fn lenient_header_accepts_spacing_and_case() {
        let data = "Question Text,Option1,Option2,Option3,Option4,Correct Answer,Category\n\
            Q,a,b,c,d,4,General\n";
        let rows = parse_questions_csv(data, HeaderMode::Lenient).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].question, "Q");
        assert_eq!(rows[0].correct_answer, "4");
        assert_eq!(rows[0].category, "General");
    }

    #[test]
    fn lenient_header_defaults_missing_category() {
        let data = "question,option1,option2,option3,option4,correct_answer\nQ,a,b,c,d,1\n";
        let rows = parse_questions_csv(data, HeaderMode::Lenient).unwrap();
        assert_eq!(rows[0].category_name(), DEFAULT_CATEGORY);
    }

    #[test]
    fn strict_header_rejects_extra_columns() {
        let data = "question,option1,option2,option3,option4,correct_answer,category,notes\n";
        assert!(matches!(
            parse_questions_csv(data, HeaderMode::Strict),
            Err(AppError::BadRequest(_))
        ));
        assert!(parse_questions_csv(SAMPLE, HeaderMode::Strict).is_ok());
    }

    #[test]
    fn missing_required_column_rejects_upload() {
        let data = "question,option1,option2,option3,option4,category\nQ,a,b,c,d,Safety\n";
        let err = parse_questions_csv(data, HeaderMode::Lenient).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("correct_answer")));
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let data = "question,option1,option2,option3,option4,correct_answer,category\n\
            \"Pick one, please\",\"a, b\",c,d,e,1,X\n";
        let rows = parse_questions_csv(data, HeaderMode::Strict).unwrap();
        assert_eq!(rows[0].question, "Pick one, please");
        assert_eq!(rows[0].option1, "a, b");
        assert_eq!(rows[0].line, 2);
    }

    #[test]
    fn row_conversion_shifts_answer_to_zero_based() {
        let rows = parse_questions_csv(SAMPLE, HeaderMode::Strict).unwrap();
        let question = rows[0].clone().into_question("Safety").unwrap();
        assert_eq!(question.correct, 1);
        assert_eq!(question.correct_text(), Some("Right"));
    }

    #[test]
    fn row_conversion_rejects_bad_answers_and_blanks() {
        let base = parse_questions_csv(SAMPLE, HeaderMode::Strict).unwrap().remove(0);

        let mut out_of_range = base.clone();
        out_of_range.correct_answer = "5".to_string();
        assert!(out_of_range.into_question("Safety").is_err());

        let mut zero = base.clone();
        zero.correct_answer = "0".to_string();
        assert!(zero.into_question("Safety").is_err());

        let mut not_a_number = base.clone();
        not_a_number.correct_answer = "B".to_string();
        assert!(not_a_number.into_question("Safety").is_err());

        let mut no_option = base.clone();
        no_option.option1.clear();
        assert!(no_option.into_question("Safety").is_err());

        let mut no_text = base;
        no_text.question.clear();
        assert!(no_text.into_question("Safety").is_err());
    }

    #[test]
    fn skip_reason_is_the_plain_message() {
        let mut row = parse_questions_csv(SAMPLE, HeaderMode::Strict).unwrap().remove(0);
        row.question = "   ".to_string();
        assert_eq!(
            row.into_question("Safety").unwrap_err(),
            "Question text cannot be empty"
        );
    }

    #[test]
    fn exported_set_parses_back_to_the_same_questions() {
        let rows = parse_questions_csv(SAMPLE, HeaderMode::Strict).unwrap();
        let set = QuizSet {
            name: "Safety".to_string(),
            questions: rows
                .into_iter()
                .map(|r| r.into_question("Safety").unwrap())
                .collect(),
        };

        let csv = write_quiz_set_csv(&set).unwrap();
        assert!(csv.starts_with("\"question\",\"option1\""));

        let again: Vec<Question> = parse_questions_csv(&csv, HeaderMode::Strict)
            .unwrap()
            .into_iter()
            .map(|r| r.into_question("Safety").unwrap())
            .collect();
        assert_eq!(again, set.questions);
    }
}
