//! Catalog: subjects, lessons, library books and exercise pools
//!
//! Read-only for students. Admin content entry goes through [`Catalog::put`] and
//! [`Catalog::remove`], which validate before touching the store.

use crate::error::{AulaError, StoreError, ValidationError};
use crate::store::{
    collections, decode_all, from_document, to_document, DocumentStore, Filter, OrderBy,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

/// A catalog type stored in its own collection
pub trait CatalogEntry: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn validate(&self) -> Result<(), ValidationError>;
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Number of levels in the exercise track, 0 when derived from the exercises
    #[serde(default)]
    pub level_count: u32,
}

impl CatalogEntry for Subject {
    const COLLECTION: &'static str = collections::SUBJECTS;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.id, "id")?;
        require(&self.name, "name")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub subject_id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Blob path of the lesson material, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_path: Option<String>,
}

impl Lesson {
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.summary.to_lowercase().contains(needle)
    }
}

impl CatalogEntry for Lesson {
    const COLLECTION: &'static str = collections::LESSONS;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.id, "id")?;
        require(&self.subject_id, "subjectId")?;
        require(&self.title, "title")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    /// Blob path of the book file
    pub file_path: String,
}

impl CatalogEntry for Book {
    const COLLECTION: &'static str = collections::BOOKS;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.id, "id")?;
        require(&self.title, "title")?;
        require(&self.file_path, "filePath")
    }
}

/// A multiple-choice question belonging to one level of a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub subject_id: String,
    pub level: u32,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

impl CatalogEntry for Exercise {
    const COLLECTION: &'static str = collections::EXERCISES;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require(&self.id, "id")?;
        require(&self.subject_id, "subjectId")?;
        require(&self.prompt, "prompt")?;
        if self.level == 0 {
            return Err(ValidationError::InvalidLevel);
        }
        if self.options.len() < 2 {
            return Err(ValidationError::TooFewOptions(self.options.len()));
        }
        if self.correct_option >= self.options.len() {
            return Err(ValidationError::CorrectOptionOutOfRange {
                index: self.correct_option,
                count: self.options.len(),
            });
        }
        Ok(())
    }
}

/// Bulk content for `admin seed`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub subjects: Vec<Subject>,
    pub lessons: Vec<Lesson>,
    pub books: Vec<Book>,
    pub exercises: Vec<Exercise>,
}

impl CatalogSeed {
    /// Validate every entry; nothing is written if any entry is invalid
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.subjects.iter().try_for_each(|s| s.validate())?;
        self.lessons.iter().try_for_each(|l| l.validate())?;
        self.books.iter().try_for_each(|b| b.validate())?;
        self.exercises.iter().try_for_each(|e| e.validate())
    }

    /// Give every entry without an id a fresh one. Returns how many were assigned.
    pub fn assign_missing_ids(&mut self) -> usize {
        let ids = self
            .subjects
            .iter_mut()
            .map(|s| &mut s.id)
            .chain(self.lessons.iter_mut().map(|l| &mut l.id))
            .chain(self.books.iter_mut().map(|b| &mut b.id))
            .chain(self.exercises.iter_mut().map(|e| &mut e.id));

        let mut assigned = 0;
        for id in ids.filter(|id| id.trim().is_empty()) {
            *id = new_id();
            assigned += 1;
        }
        assigned
    }

    pub fn len(&self) -> usize {
        self.subjects.len() + self.lessons.len() + self.books.len() + self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generate an id for admin-entered content that has none
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub struct Catalog {
    store: Arc<dyn DocumentStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn all<T: CatalogEntry>(&self, order: &str) -> Result<Vec<T>, StoreError> {
        let docs = self
            .store
            .get_all(T::COLLECTION, Some(&OrderBy::asc(order)))
            .await?;
        Ok(decode_all(T::COLLECTION, docs))
    }

    pub async fn subjects(&self) -> Result<Vec<Subject>, StoreError> {
        self.all("name").await
    }

    pub async fn subject(&self, id: &str) -> Result<Option<Subject>, StoreError> {
        self.store
            .get_by_id(collections::SUBJECTS, id)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Lessons, optionally restricted to one subject, ordered by title
    pub async fn lessons(&self, subject_id: Option<&str>) -> Result<Vec<Lesson>, StoreError> {
        let lessons: Vec<Lesson> = self.all("title").await?;
        Ok(match subject_id {
            Some(subject) => lessons
                .into_iter()
                .filter(|l| l.subject_id == subject)
                .collect(),
            None => lessons,
        })
    }

    /// Case-insensitive search over lesson titles and summaries
    pub async fn search_lessons(&self, query: &str) -> Result<Vec<Lesson>, StoreError> {
        let needle = query.trim().to_lowercase();
        let lessons = self.lessons(None).await?;
        if needle.is_empty() {
            return Ok(lessons);
        }
        Ok(lessons.into_iter().filter(|l| l.matches(&needle)).collect())
    }

    pub async fn lesson(&self, id: &str) -> Result<Option<Lesson>, StoreError> {
        self.store
            .get(collections::LESSONS, &Filter::eq("id", id))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn books(&self, subject_id: Option<&str>) -> Result<Vec<Book>, StoreError> {
        let books: Vec<Book> = self.all("title").await?;
        Ok(match subject_id {
            Some(subject) => books
                .into_iter()
                .filter(|b| b.subject_id.as_deref() == Some(subject))
                .collect(),
            None => books,
        })
    }

    /// Question pool for one level, in id order
    pub async fn exercises(&self, subject_id: &str, level: u32) -> Result<Vec<Exercise>, StoreError> {
        let exercises: Vec<Exercise> = self.all("id").await?;
        Ok(exercises
            .into_iter()
            .filter(|e| e.subject_id == subject_id && e.level == level)
            .collect())
    }

    /// Levels of a subject's track.
    ///
    /// `1..=level_count` when the subject declares a count, otherwise `1..=` the highest
    /// level that has an exercise. The track is always contiguous, as unlocking is.
    pub async fn levels(&self, subject_id: &str) -> Result<Vec<u32>, StoreError> {
        if let Some(subject) = self.subject(subject_id).await? {
            if subject.level_count > 0 {
                return Ok((1..=subject.level_count).collect());
            }
        }
        let exercises: Vec<Exercise> = self.all("id").await?;
        let highest = exercises
            .iter()
            .filter(|e| e.subject_id == subject_id)
            .map(|e| e.level)
            .max()
            .unwrap_or(0);
        Ok((1..=highest).collect())
    }

    /// Reject a seed that would leave a level without exercises below a level that has some.
    ///
    /// Looks at the exercises already stored together with the seed's, seed entries
    /// replacing stored ones with the same id.
    async fn check_tracks(&self, seed: &CatalogSeed) -> Result<(), AulaError> {
        if seed.exercises.is_empty() {
            return Ok(());
        }
        let replaced: BTreeSet<&str> = seed.exercises.iter().map(|e| e.id.as_str()).collect();
        let stored: Vec<Exercise> = self.all("id").await?;

        let mut tracks: BTreeMap<&str, BTreeSet<u32>> = BTreeMap::new();
        for exercise in stored
            .iter()
            .filter(|e| !replaced.contains(e.id.as_str()))
            .chain(seed.exercises.iter())
        {
            tracks
                .entry(exercise.subject_id.as_str())
                .or_default()
                .insert(exercise.level);
        }

        let touched: BTreeSet<&str> = seed
            .exercises
            .iter()
            .map(|e| e.subject_id.as_str())
            .collect();
        for subject_id in touched {
            let Some(levels) = tracks.get(subject_id) else {
                continue;
            };
            let highest = levels.last().copied().unwrap_or(0);
            if let Some(level) = (1..=highest).find(|l| !levels.contains(l)) {
                return Err(ValidationError::LevelGap {
                    subject_id: subject_id.to_string(),
                    level,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Highest level of a subject, if the track is known
    pub async fn max_level(&self, subject_id: &str) -> Result<Option<u32>, StoreError> {
        Ok(self.levels(subject_id).await?.last().copied())
    }

    /// Admin: insert or replace an entry after validating it
    pub async fn put<T: CatalogEntry>(&self, entry: &T) -> Result<(), AulaError> {
        entry.validate()?;
        self.store
            .set(T::COLLECTION, entry.id(), to_document(entry)?)
            .await?;
        info!("stored {}/{}", T::COLLECTION, entry.id());
        Ok(())
    }

    /// Admin: remove an entry; removing a missing id is not an error
    pub async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.store.delete(collection, id).await?;
        info!("removed {}/{}", collection, id);
        Ok(())
    }

    /// Admin: validate the whole seed, then write it. Nothing is written if any entry is
    /// invalid or an exercise track would have a gap.
    pub async fn import(&self, seed: &CatalogSeed) -> Result<usize, AulaError> {
        seed.validate()?;
        self.check_tracks(seed).await?;
        for subject in &seed.subjects {
            self.put(subject).await?;
        }
        for lesson in &seed.lessons {
            self.put(lesson).await?;
        }
        for book in &seed.books {
            self.put(book).await?;
        }
        for exercise in &seed.exercises {
            self.put(exercise).await?;
        }
        info!("imported {} catalog entries", seed.len());
        Ok(seed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn exercise(id: &str, subject: &str, level: u32) -> Exercise {
        Exercise {
            id: id.to_string(),
            subject_id: subject.to_string(),
            level,
            prompt: format!("Question {}", id),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_option: 1,
        }
    }

    fn lesson(id: &str, subject: &str, title: &str) -> Lesson {
        Lesson {
            id: id.to_string(),
            subject_id: subject.to_string(),
            title: title.to_string(),
            summary: String::new(),
            material_path: None,
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_exercise_validation() {
        assert!(exercise("e1", "math", 1).validate().is_ok());

        let mut bad = exercise("e1", "math", 1);
        bad.correct_option = 3;
        assert_eq!(
            bad.validate(),
            Err(ValidationError::CorrectOptionOutOfRange { index: 3, count: 3 })
        );

        let mut bad = exercise("e1", "math", 1);
        bad.options.truncate(1);
        bad.correct_option = 0;
        assert_eq!(bad.validate(), Err(ValidationError::TooFewOptions(1)));

        let bad = exercise("e1", "math", 0);
        assert_eq!(bad.validate(), Err(ValidationError::InvalidLevel));
    }

    #[tokio::test]
    async fn test_put_rejects_invalid_without_writing() {
        let catalog = catalog();
        let bad = lesson("l1", "math", "  ");
        assert!(catalog.put(&bad).await.is_err());
        assert!(catalog.lessons(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exercise_pool_filters_subject_and_level() {
        let catalog = catalog();
        for e in [
            exercise("m1", "math", 1),
            exercise("m2", "math", 1),
            exercise("m3", "math", 2),
            exercise("h1", "history", 1),
        ] {
            catalog.put(&e).await.unwrap();
        }

        let pool = catalog.exercises("math", 1).await.unwrap();
        let ids: Vec<_> = pool.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(catalog.levels("math").await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_declared_level_count_wins() {
        let catalog = catalog();
        catalog
            .put(&Subject {
                id: "math".into(),
                name: "Mathematics".into(),
                description: String::new(),
                level_count: 4,
            })
            .await
            .unwrap();
        catalog.put(&exercise("m1", "math", 1)).await.unwrap();

        assert_eq!(catalog.levels("math").await.unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(catalog.max_level("math").await.unwrap(), Some(4));
        assert_eq!(catalog.max_level("art").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_lessons_case_insensitive() {
        let catalog = catalog();
        catalog.put(&lesson("l1", "math", "Fractions")).await.unwrap();
        catalog.put(&lesson("l2", "math", "Decimals")).await.unwrap();
        catalog.put(&lesson("l3", "history", "The Fractured Empire")).await.unwrap();

        let hits = catalog.search_lessons("FRACT").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(catalog.lessons(Some("math")).await.unwrap().len(), 2);
        assert_eq!(catalog.search_lessons("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let catalog = catalog();
        let mut seed = CatalogSeed::default();
        seed.lessons.push(lesson("l1", "math", "Fractions"));
        seed.exercises.push(exercise("bad", "math", 0));

        assert!(catalog.import(&seed).await.is_err());
        assert!(catalog.lessons(None).await.unwrap().is_empty());

        seed.exercises[0].level = 1;
        assert_eq!(catalog.import(&seed).await.unwrap(), 2);
        assert!(catalog.lesson("l1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_and_books_by_subject() {
        let catalog = catalog();
        catalog
            .put(&Book {
                id: "b1".into(),
                title: "Algebra I".into(),
                author: "R. Lima".into(),
                subject_id: Some("math".into()),
                file_path: "books/algebra.pdf".into(),
            })
            .await
            .unwrap();
        assert_eq!(catalog.books(Some("math")).await.unwrap().len(), 1);
        assert!(catalog.books(Some("history")).await.unwrap().is_empty());

        catalog.remove(collections::BOOKS, "b1").await.unwrap();
        assert!(catalog.books(None).await.unwrap().is_empty());
    }

    #[test]
    fn test_new_id_is_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[tokio::test]
    async fn test_derived_track_has_no_holes() {
        let catalog = catalog();
        catalog.put(&exercise("m1", "math", 1)).await.unwrap();
        catalog.put(&exercise("m3", "math", 3)).await.unwrap();

        assert_eq!(catalog.levels("math").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(catalog.max_level("math").await.unwrap(), Some(3));
        assert!(catalog.levels("art").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_rejects_level_gap() {
        let catalog = catalog();
        let mut seed = CatalogSeed::default();
        seed.exercises.push(exercise("m1", "math", 1));
        seed.exercises.push(exercise("m3", "math", 3));

        let err = catalog.import(&seed).await.unwrap_err();
        assert!(matches!(
            err,
            AulaError::Validation(ValidationError::LevelGap { level: 2, .. })
        ));
        assert!(catalog.exercises("math", 1).await.unwrap().is_empty());

        // A stored level 2 closes the gap
        catalog.put(&exercise("m2", "math", 2)).await.unwrap();
        assert_eq!(catalog.import(&seed).await.unwrap(), 2);

        // Moving the only level 2 exercise away opens it again
        let mut moved = CatalogSeed::default();
        moved.exercises.push(exercise("m2", "math", 4));
        assert!(catalog.import(&moved).await.is_err());
    }

    #[test]
    fn test_seed_fills_only_blank_ids() {
        let mut seed = CatalogSeed::default();
        seed.lessons.push(lesson("", "math", "Fractions"));
        seed.lessons.push(lesson("kept", "math", "Decimals"));
        seed.exercises.push(exercise(" ", "math", 1));

        assert_eq!(seed.assign_missing_ids(), 2);
        assert!(!seed.lessons[0].id.is_empty());
        assert_eq!(seed.lessons[1].id, "kept");
        assert!(seed.validate().is_ok());
        assert_eq!(seed.assign_missing_ids(), 0);
    }
}
