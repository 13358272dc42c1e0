use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{self, Database},
    errors::{AppError, AppResult},
    models::domain::QuizAttempt,
    repositories::is_duplicate_key,
};

/// Append-only log of scored attempts. `(learner_id, quiz_id, ordinal)` is unique.
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Fails with `Conflict` when the ordinal is already taken.
    async fn append(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>>;
    async fn count(&self, learner_id: &str, quiz_id: &str) -> AppResult<u32>;
    /// Oldest first.
    async fn list(&self, learner_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoQuizAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(db::QUIZ_ATTEMPTS);
        Self { collection }
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn append(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        match self.collection.insert_one(&attempt).await {
            Ok(_) => Ok(attempt),
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(format!(
                "Attempt {} of quiz '{}' was already recorded",
                attempt.ordinal, attempt.quiz_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn count(&self, learner_id: &str, quiz_id: &str) -> AppResult<u32> {
        let count = self
            .collection
            .count_documents(doc! { "learner_id": learner_id, "quiz_id": quiz_id })
            .await?;
        Ok(count as u32)
    }

    async fn list(&self, learner_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "learner_id": learner_id, "quiz_id": quiz_id })
            .sort(doc! { "ordinal": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for {} collection", db::QUIZ_ATTEMPTS);

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();
        let ordinal_index = IndexModel::builder()
            .keys(doc! { "learner_id": 1, "quiz_id": 1, "ordinal": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("learner_quiz_ordinal_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(ordinal_index).await?;

        log::info!("Successfully created indexes for {} collection", db::QUIZ_ATTEMPTS);
        Ok(())
    }
}
