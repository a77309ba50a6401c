// src/quiz/catalog.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::question::{Question, QuizSet, QuizSetSummary},
    quiz::{intent::DeleteIntent, tabular::{self, RawRow}},
    store::{Store, StoreKey},
};

/// Trailing " (n)" added when an import is renamed to avoid a collision.
static COPY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<base>.*?) \((?P<n>\d+)\)$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Append to the existing set of the same name.
    #[default]
    Merge,
    /// Never touch existing sets; colliding names get a numeric suffix.
    AsNew,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
    /// Names the rows were stored under, in first-seen order.
    pub categories: Vec<String>,
}

/// Every quiz set plus the pointer to the one being served.
///
/// Mutations only touch memory; call [`Catalog::save`] to persist. Saving
/// also rewrites `currentQuiz`, the materialized copy of the active set,
/// so that view is never written from anywhere else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    sets: Vec<QuizSet>,
    active: Option<String>,
}

impl Catalog {
    pub async fn load(store: &Store) -> Result<Self, AppError> {
        let sets: Vec<QuizSet> = store.load(StoreKey::AllQuizzes).await?.unwrap_or_default();
        let active: Option<String> = store.load(StoreKey::ActiveQuiz).await?;

        let mut catalog = Self { sets, active };
        if let Some(name) = catalog.active.clone() {
            if catalog.get(&name).is_none() {
                let fallback = catalog.sets.first().map(|s| s.name.clone());
                tracing::warn!(
                    "Active quiz '{}' no longer exists, falling back to {:?}",
                    name,
                    fallback
                );
                catalog.active = fallback;
            }
        }

        Ok(catalog)
    }

    pub async fn save(&self, store: &Store) -> Result<(), AppError> {
        store.save(StoreKey::AllQuizzes, &self.sets).await?;

        match self.active_set() {
            Some(set) => {
                store.save(StoreKey::ActiveQuiz, &set.name).await?;
                store.save(StoreKey::CurrentQuiz, set).await?;
            }
            None => {
                store.remove(StoreKey::ActiveQuiz).await?;
                store.remove(StoreKey::CurrentQuiz).await?;
            }
        }

        Ok(())
    }

    /// Reads the published copy of the active set without loading the catalog.
    pub async fn load_current(store: &Store) -> Result<Option<QuizSet>, AppError> {
        store.load(StoreKey::CurrentQuiz).await
    }

    pub fn sets(&self) -> &[QuizSet] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&QuizSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut QuizSet, AppError> {
        self.sets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", name)))
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_set(&self) -> Option<&QuizSet> {
        self.active.as_deref().and_then(|name| self.get(name))
    }

    /// The quiz a new session is served.
    pub fn current_quiz(&self) -> Option<QuizSet> {
        self.active_set().cloned()
    }

    pub fn summaries(&self) -> Vec<QuizSetSummary> {
        self.sets
            .iter()
            .map(|s| QuizSetSummary {
                name: s.name.clone(),
                question_count: s.len(),
                active: self.active.as_deref() == Some(s.name.as_str()),
            })
            .collect()
    }

    fn activate_if_unset(&mut self) {
        if self.active.is_none() {
            self.active = self.sets.iter().find(|s| !s.is_empty()).map(|s| s.name.clone());
        }
    }

    pub fn create_category(&mut self, name: &str, questions: Vec<Question>) -> Result<(), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Quiz name cannot be empty".to_string()));
        }
        if self.get(name).is_some() {
            return Err(AppError::Conflict(format!("Quiz '{}' already exists", name)));
        }

        self.sets.push(QuizSet {
            name: name.to_string(),
            questions,
        });
        self.activate_if_unset();
        Ok(())
    }

    /// Points the catalog at `name`.
    ///
    /// Returns `false` and changes nothing when the set is missing or empty.
    pub fn set_active(&mut self, name: &str) -> bool {
        match self.get(name) {
            Some(set) if !set.is_empty() => {
                self.active = Some(set.name.clone());
                true
            }
            _ => false,
        }
    }

    fn unique_name(&self, wanted: &str, taken: &[String]) -> String {
        let free = |candidate: &str| self.get(candidate).is_none() && !taken.iter().any(|t| t == candidate);
        if free(wanted) {
            return wanted.to_string();
        }

        let base = COPY_SUFFIX
            .captures(wanted)
            .and_then(|c| c.name("base"))
            .map(|m| m.as_str())
            .unwrap_or(wanted);

        (2..)
            .map(|n| format!("{} ({})", base, n))
            .find(|candidate| free(candidate))
            .unwrap_or_else(|| wanted.to_string())
    }

    /// Adds validated rows to the catalog, grouped by category.
    ///
    /// Bad rows are skipped and reported; they never abort the batch.
    pub fn import_questions(&mut self, rows: Vec<RawRow>, mode: ImportMode) -> ImportReport {
        let mut report = ImportReport::default();
        // source category -> name used in this batch
        let mut renames: Vec<(String, String)> = Vec::new();

        for row in rows {
            let line = row.line;
            let source = row.category_name().to_string();

            let target = match renames.iter().find(|(from, _)| *from == source) {
                Some((_, to)) => to.clone(),
                None => {
                    let taken: Vec<String> = renames.iter().map(|(_, to)| to.clone()).collect();
                    let to = match mode {
                        ImportMode::Merge => source.clone(),
                        ImportMode::AsNew => self.unique_name(&source, &taken),
                    };
                    renames.push((source, to.clone()));
                    to
                }
            };

            let question = match row.into_question(&target) {
                Ok(q) => q,
                Err(reason) => {
                    tracing::warn!("Skipping import row {}: {}", line, reason);
                    report.skipped.push(SkippedRow { line, reason });
                    continue;
                }
            };

            match self.sets.iter_mut().find(|s| s.name == target) {
                Some(set) => set.questions.push(question),
                None => self.sets.push(QuizSet {
                    name: target.clone(),
                    questions: vec![question],
                }),
            }
            if !report.categories.contains(&target) {
                report.categories.push(target);
            }
            report.imported += 1;
        }

        self.activate_if_unset();
        tracing::info!(
            "Imported {} questions into {:?}, skipped {}",
            report.imported,
            report.categories,
            report.skipped.len()
        );
        report
    }

    fn check_deletable(&self, name: &str) -> Result<(), AppError> {
        if self.get(name).is_none() {
            return Err(AppError::NotFound(format!("Quiz '{}' not found", name)));
        }
        if self.sets.len() <= 1 {
            return Err(AppError::BadRequest(
                "Cannot delete the only remaining quiz".to_string(),
            ));
        }
        let has_fallback = self.sets.iter().any(|s| s.name != name && !s.is_empty());
        if self.active_name() == Some(name) && !has_fallback {
            return Err(AppError::BadRequest(format!(
                "Cannot delete the active quiz '{}' without another non-empty quiz to fall back to",
                name
            )));
        }
        Ok(())
    }

    /// First step of deleting a category. Changes nothing.
    pub fn request_delete_category(&self, name: &str) -> Result<DeleteIntent, AppError> {
        self.check_deletable(name)?;
        Ok(DeleteIntent::Category {
            name: name.to_string(),
        })
    }

    /// Applies a confirmed category deletion.
    ///
    /// Returns the active quiz name afterwards. Deleting the active quiz
    /// promotes the first remaining non-empty one.
    pub fn confirm_delete_category(&mut self, intent: &DeleteIntent) -> Result<Option<String>, AppError> {
        let DeleteIntent::Category { name } = intent else {
            return Err(AppError::BadRequest("Not a quiz deletion request".to_string()));
        };
        self.check_deletable(name)?;

        self.sets.retain(|s| &s.name != name);
        if self.active.as_deref() == Some(name.as_str()) {
            self.active = self.sets.iter().find(|s| !s.is_empty()).map(|s| s.name.clone());
            tracing::info!("Deleted active quiz '{}', now serving {:?}", name, self.active);
        }

        Ok(self.active.clone())
    }

    pub fn export_category(&self, name: &str) -> Result<String, AppError> {
        let set = self
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", name)))?;
        tabular::write_quiz_set_csv(set)
    }

    pub fn add_question(&mut self, name: &str, question: Question) -> Result<usize, AppError> {
        let set = self.get_mut(name)?;
        set.questions.push(question);
        let index = set.questions.len() - 1;
        self.activate_if_unset();
        Ok(index)
    }

    pub fn update_question(&mut self, name: &str, index: usize, question: Question) -> Result<(), AppError> {
        let slot = self
            .get_mut(name)?
            .questions
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", index)))?;
        *slot = question;
        Ok(())
    }

    pub fn remove_question(&mut self, name: &str, index: usize) -> Result<Question, AppError> {
        let is_active = self.active.as_deref() == Some(name);
        let set = self.get_mut(name)?;
        if index >= set.len() {
            return Err(AppError::NotFound(format!("Question {} not found", index)));
        }
        if is_active && set.len() == 1 {
            return Err(AppError::BadRequest(
                "Cannot remove the last question of the active quiz".to_string(),
            ));
        }
        Ok(set.questions.remove(index))
    }
}
