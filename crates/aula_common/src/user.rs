//! Student profile and its document mapping
//!
//! A user document lives in the `users` collection under the registration number. Every
//! optimistic write sends one or more whole fields (see [`UserField`]), never a delta.

use crate::error::{AulaError, StoreError, ValidationError};
use crate::progress::ProgressMap;
use crate::store::{collections, decode_all, from_document, to_document, Document, DocumentStore, Filter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Document field names
pub mod fields {
    pub const REGISTRATION_NUMBER: &str = "registrationNumber";
    pub const NAME: &str = "name";
    pub const COMPLETED_LESSONS: &str = "completedLessons";
    pub const COLOR: &str = "color";
    pub const TOTAL_XP: &str = "totalXp";
    pub const SHOW_IN_RANKING: &str = "showInRanking";
    pub const EXERCISE_PROGRESS: &str = "exerciseProgress";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub registration_number: String,
    pub name: String,
    #[serde(default)]
    pub completed_lessons: BTreeSet<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_xp: Option<u64>,
    /// Absent means visible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_in_ranking: Option<bool>,
    #[serde(default)]
    pub exercise_progress: ProgressMap,
}

impl User {
    pub fn new(registration_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            registration_number: registration_number.into(),
            name: name.into(),
            completed_lessons: BTreeSet::new(),
            color: String::new(),
            total_xp: None,
            show_in_ranking: None,
            exercise_progress: ProgressMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.registration_number.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: fields::REGISTRATION_NUMBER,
            });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }

    pub fn xp(&self) -> u64 {
        self.total_xp.unwrap_or(0)
    }

    pub fn is_visible_in_ranking(&self) -> bool {
        self.show_in_ranking.unwrap_or(true)
    }

    pub fn has_completed(&self, lesson_id: &str) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    /// Partial document carrying the full current value of `field`
    pub fn field_document(&self, field: UserField) -> Result<Document, StoreError> {
        let mut doc = Document::new();
        match field {
            UserField::Name => {
                doc.insert(fields::NAME.into(), Value::String(self.name.clone()));
            }
            UserField::Color => {
                doc.insert(fields::COLOR.into(), Value::String(self.color.clone()));
            }
            UserField::CompletedLessons => {
                doc.insert(
                    fields::COMPLETED_LESSONS.into(),
                    serde_json::to_value(&self.completed_lessons)?,
                );
            }
            UserField::ShowInRanking => {
                doc.insert(
                    fields::SHOW_IN_RANKING.into(),
                    Value::Bool(self.is_visible_in_ranking()),
                );
            }
            UserField::Progress => {
                doc.insert(
                    fields::EXERCISE_PROGRESS.into(),
                    serde_json::to_value(&self.exercise_progress)?,
                );
                doc.insert(fields::TOTAL_XP.into(), Value::from(self.xp()));
            }
        }
        Ok(doc)
    }
}

/// The groups of fields an optimistic write can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Name,
    Color,
    CompletedLessons,
    ShowInRanking,
    /// `exerciseProgress` together with `totalXp`
    Progress,
}

impl UserField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::Name => fields::NAME,
            UserField::Color => fields::COLOR,
            UserField::CompletedLessons => fields::COMPLETED_LESSONS,
            UserField::ShowInRanking => fields::SHOW_IN_RANKING,
            UserField::Progress => fields::EXERCISE_PROGRESS,
        }
    }
}

impl std::fmt::Display for UserField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lookups and registration against the `users` collection
pub struct UserDirectory {
    store: Arc<dyn DocumentStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Find a user by registration number; a miss is `Ok(None)`
    pub async fn find(&self, registration_number: &str) -> Result<Option<User>, StoreError> {
        let registration_number = registration_number.trim();
        if registration_number.is_empty() {
            return Ok(None);
        }
        let found = self
            .store
            .get(
                collections::USERS,
                &Filter::eq(fields::REGISTRATION_NUMBER, registration_number),
            )
            .await?;
        debug!(
            "user lookup {}: {}",
            registration_number,
            if found.is_some() { "hit" } else { "miss" }
        );
        found.map(from_document).transpose()
    }

    /// Plaintext lookup login
    pub async fn login(&self, registration_number: &str) -> Result<Option<User>, StoreError> {
        let user = self.find(registration_number).await?;
        if let Some(user) = &user {
            info!("{} logged in", user.registration_number);
        }
        Ok(user)
    }

    /// Create or replace a user document
    pub async fn register(&self, user: &User) -> Result<(), AulaError> {
        user.validate()?;
        self.store
            .set(collections::USERS, &user.registration_number, to_document(user)?)
            .await?;
        info!("registered user {}", user.registration_number);
        Ok(())
    }

    pub async fn all(&self) -> Result<Vec<User>, StoreError> {
        let docs = self.store.get_all(collections::USERS, None).await?;
        Ok(decode_all(collections::USERS, docs))
    }

    pub async fn remove(&self, registration_number: &str) -> Result<(), StoreError> {
        self.store.delete(collections::USERS, registration_number).await
    }
}
