use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{self, Database},
    errors::{AppError, AppResult},
    models::domain::{Enrollment, EnrollmentStatus},
    repositories::is_duplicate_key,
};

/// Storage for enrollment records, keyed by `(learner_id, course_id)`.
///
/// Writes after creation go through [`EnrollmentRepository::replace`], which
/// only succeeds when the stored version still equals `expected_version`.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find(&self, learner_id: &str, course_id: &str) -> AppResult<Option<Enrollment>>;
    /// Fails with `Conflict` when a record for the pair already exists.
    async fn insert(&self, enrollment: Enrollment) -> AppResult<Enrollment>;
    /// Stores `enrollment` with its version bumped past `expected_version`.
    async fn replace(&self, enrollment: Enrollment, expected_version: i64)
        -> AppResult<Enrollment>;
    async fn delete(&self, learner_id: &str, course_id: &str) -> AppResult<bool>;
    async fn list_by_learner(&self, learner_id: &str) -> AppResult<Vec<Enrollment>>;
    async fn list_active_by_course(&self, course_id: &str) -> AppResult<Vec<Enrollment>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoEnrollmentRepository {
    collection: Collection<Enrollment>,
}

impl MongoEnrollmentRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(db::ENROLLMENTS);
        Self { collection }
    }
}

fn stale_write(learner_id: &str, course_id: &str) -> AppError {
    AppError::Conflict(format!(
        "Enrollment of '{}' in '{}' was modified concurrently",
        learner_id, course_id
    ))
}

#[async_trait]
impl EnrollmentRepository for MongoEnrollmentRepository {
    async fn find(&self, learner_id: &str, course_id: &str) -> AppResult<Option<Enrollment>> {
        let enrollment = self
            .collection
            .find_one(doc! { "learner_id": learner_id, "course_id": course_id })
            .await?;
        Ok(enrollment)
    }

    async fn insert(&self, enrollment: Enrollment) -> AppResult<Enrollment> {
        match self.collection.insert_one(&enrollment).await {
            Ok(_) => Ok(enrollment),
            Err(e) if is_duplicate_key(&e) => {
                Err(stale_write(&enrollment.learner_id, &enrollment.course_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(
        &self,
        mut enrollment: Enrollment,
        expected_version: i64,
    ) -> AppResult<Enrollment> {
        enrollment.version = expected_version + 1;

        let filter = doc! {
            "learner_id": &enrollment.learner_id,
            "course_id": &enrollment.course_id,
            "version": expected_version,
        };
        let result = self.collection.replace_one(filter, &enrollment).await?;

        if result.matched_count == 0 {
            return Err(stale_write(&enrollment.learner_id, &enrollment.course_id));
        }

        Ok(enrollment)
    }

    async fn delete(&self, learner_id: &str, course_id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "learner_id": learner_id, "course_id": course_id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_by_learner(&self, learner_id: &str) -> AppResult<Vec<Enrollment>> {
        let enrollments = self
            .collection
            .find(doc! { "learner_id": learner_id })
            .sort(doc! { "enrolled_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(enrollments)
    }

    async fn list_active_by_course(&self, course_id: &str) -> AppResult<Vec<Enrollment>> {
        let enrollments = self
            .collection
            .find(doc! {
                "course_id": course_id,
                "status": EnrollmentStatus::Active.as_str(),
            })
            .await?
            .try_collect()
            .await?;
        Ok(enrollments)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for {} collection", db::ENROLLMENTS);

        let pair_index = IndexModel::builder()
            .keys(doc! { "learner_id": 1, "course_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("learner_course_unique".to_string())
                    .build(),
            )
            .build();
        let course_index = IndexModel::builder()
            .keys(doc! { "course_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("course_status".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(pair_index).await?;
        self.collection.create_index(course_index).await?;
        Ok(())
    }
}
