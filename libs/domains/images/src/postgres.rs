use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, SqlErr, Statement,
    TransactionTrait,
};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{ImageError, ImageResult};
use crate::models::{
    Embedding, NewSearchFeedback, NewSearchQuery, Rating, SearchQuery, StorageLocator,
    StoredFeedback, StoredImage, StoredSearch,
};
use crate::repository::ImageRepository;

/// PostgreSQL + pgvector implementation of ImageRepository
#[derive(Clone)]
pub struct PgImageRepository {
    db: DatabaseConnection,
}

impl PgImageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_error(e: DbErr) -> ImageError {
    ImageError::Internal(format!("Database error: {}", e))
}

/// pgvector text input format, bound as text and cast with `::vector`.
pub(crate) fn vector_literal(values: &[f32]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

#[derive(Debug, FromQueryResult)]
struct ImageRow {
    id: Uuid,
    storage_provider: String,
    storage_key: String,
    created_at: DateTime<Utc>,
}

impl From<ImageRow> for StoredImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            storage_provider: row.storage_provider,
            storage_key: row.storage_key,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct NearestRow {
    image_id: Uuid,
}

/// Search query LEFT JOINed with its matched image
#[derive(Debug, FromQueryResult)]
struct SearchRow {
    id: Uuid,
    model_name: String,
    query_text: String,
    result_image_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    image_id: Option<Uuid>,
    image_storage_provider: Option<String>,
    image_storage_key: Option<String>,
    image_created_at: Option<DateTime<Utc>>,
}

impl From<SearchRow> for StoredSearch {
    fn from(row: SearchRow) -> Self {
        let image = match (
            row.image_id,
            row.image_storage_provider,
            row.image_storage_key,
            row.image_created_at,
        ) {
            (Some(id), Some(storage_provider), Some(storage_key), Some(created_at)) => {
                Some(StoredImage {
                    id,
                    storage_provider,
                    storage_key,
                    created_at,
                })
            }
            _ => None,
        };

        Self {
            query: SearchQuery {
                id: row.id,
                model_name: row.model_name,
                query_text: row.query_text,
                result_image_id: row.result_image_id,
                created_at: row.created_at,
            },
            image,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct FeedbackRow {
    id: Uuid,
    search_query_id: Uuid,
    rating: String,
    created_at: DateTime<Utc>,
    query_model_name: String,
    query_text: String,
    query_result_image_id: Option<Uuid>,
    query_created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for StoredFeedback {
    type Error = ImageError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let rating = Rating::from_str(&row.rating).map_err(|_| {
            ImageError::Internal(format!("Unknown rating '{}' in search_feedbacks", row.rating))
        })?;

        Ok(Self {
            id: row.id,
            search_query_id: row.search_query_id,
            rating,
            created_at: row.created_at,
            query: SearchQuery {
                id: row.search_query_id,
                model_name: row.query_model_name,
                query_text: row.query_text,
                result_image_id: row.query_result_image_id,
                created_at: row.query_created_at,
            },
        })
    }
}

const SEARCH_COLUMNS: &str = r#"
    q.id, q.model_name, q.query_text, q.result_image_id, q.created_at,
    i.id AS image_id,
    i.storage_provider AS image_storage_provider,
    i.storage_key AS image_storage_key,
    i.created_at AS image_created_at
"#;

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn create_image_with_embedding(
        &self,
        locator: StorageLocator,
        embedding: Embedding,
    ) -> ImageResult<StoredImage> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let image_sql = r#"
            INSERT INTO images (id, storage_provider, storage_key)
            VALUES ($1, $2, $3)
            RETURNING id, storage_provider, storage_key, created_at
        "#;
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            image_sql,
            [
                Uuid::now_v7().into(),
                locator.provider.into(),
                locator.key.into(),
            ],
        );
        let image: StoredImage = ImageRow::find_by_statement(stmt)
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| ImageError::Internal("Failed to create image".to_string()))?
            .into();

        let embedding_sql = r#"
            INSERT INTO image_embeddings (id, image_id, model_name, embedding)
            VALUES ($1, $2, $3, $4::vector)
        "#;
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            embedding_sql,
            [
                Uuid::now_v7().into(),
                image.id.into(),
                embedding.model_name.into(),
                vector_literal(&embedding.values).into(),
            ],
        );
        txn.execute_raw(stmt).await.map_err(db_error)?;

        // dropping an uncommitted transaction rolls it back
        txn.commit().await.map_err(db_error)?;

        tracing::info!(image_id = %image.id, "Created image");
        Ok(image)
    }

    async fn get_image(&self, id: Uuid) -> ImageResult<Option<StoredImage>> {
        let sql = "SELECT id, storage_provider, storage_key, created_at FROM images WHERE id = $1";
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let row = ImageRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn nearest_image_for_model(
        &self,
        model_name: &str,
        vector: &[f32],
    ) -> ImageResult<Option<Uuid>> {
        let sql = r#"
            SELECT image_id
            FROM image_embeddings
            WHERE model_name = $1
            ORDER BY embedding <=> $2::vector ASC, created_at DESC, id DESC
            LIMIT 1
        "#;
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [model_name.into(), vector_literal(vector).into()],
        );

        let row = NearestRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(row.map(|r| r.image_id))
    }

    async fn create_search_query(&self, input: NewSearchQuery) -> ImageResult<StoredSearch> {
        let sql = format!(
            r#"
            WITH q AS (
                INSERT INTO search_queries (id, model_name, query_text, query_embedding, result_image_id)
                VALUES ($1, $2, $3, $4::vector, $5)
                RETURNING id, model_name, query_text, result_image_id, created_at
            )
            SELECT {SEARCH_COLUMNS}
            FROM q
            LEFT JOIN images i ON i.id = q.result_image_id
            "#
        );
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                Uuid::now_v7().into(),
                input.model_name.into(),
                input.query_text.into(),
                vector_literal(&input.embedding).into(),
                input.result_image_id.into(),
            ],
        );

        let search: StoredSearch = SearchRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?
            .ok_or_else(|| ImageError::Internal("Failed to create search query".to_string()))?
            .into();

        tracing::info!(search_query_id = %search.query.id, "Created search query");
        Ok(search)
    }

    async fn get_search_query(&self, id: Uuid) -> ImageResult<Option<StoredSearch>> {
        let sql = format!(
            r#"
            SELECT {SEARCH_COLUMNS}
            FROM search_queries q
            LEFT JOIN images i ON i.id = q.result_image_id
            WHERE q.id = $1
            "#
        );
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);

        let row = SearchRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn create_search_feedback(
        &self,
        input: NewSearchFeedback,
    ) -> ImageResult<StoredFeedback> {
        let sql = r#"
            WITH f AS (
                INSERT INTO search_feedbacks (id, search_query_id, rating)
                VALUES ($1, $2, $3)
                RETURNING id, search_query_id, rating, created_at
            )
            SELECT f.id, f.search_query_id, f.rating, f.created_at,
                   q.model_name AS query_model_name,
                   q.query_text AS query_text,
                   q.result_image_id AS query_result_image_id,
                   q.created_at AS query_created_at
            FROM f
            JOIN search_queries q ON q.id = f.search_query_id
        "#;
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                Uuid::now_v7().into(),
                input.search_query_id.into(),
                input.rating.to_string().into(),
            ],
        );

        let row = FeedbackRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    ImageError::FeedbackAlreadyExists(input.search_query_id)
                }
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                    ImageError::SearchQueryNotFound(input.search_query_id)
                }
                _ => db_error(e),
            })?
            .ok_or_else(|| ImageError::Internal("Failed to create search feedback".to_string()))?;

        let feedback = StoredFeedback::try_from(row)?;
        tracing::info!(
            search_query_id = %feedback.search_query_id,
            rating = %feedback.rating,
            "Recorded search feedback"
        );
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_literal() {
        assert_eq!(vector_literal(&[1.0, -0.5, 0.25]), "[1,-0.5,0.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }

    #[test]
    fn test_search_row_without_image() {
        let search: StoredSearch = SearchRow {
            id: Uuid::now_v7(),
            model_name: "clip".to_string(),
            query_text: "a cat".to_string(),
            result_image_id: None,
            created_at: Utc::now(),
            image_id: None,
            image_storage_provider: None,
            image_storage_key: None,
            image_created_at: None,
        }
        .into();

        assert!(search.image.is_none());
        assert_eq!(search.query.query_text, "a cat");
    }

    #[test]
    fn test_feedback_row_rejects_unknown_rating() {
        let row = FeedbackRow {
            id: Uuid::now_v7(),
            search_query_id: Uuid::now_v7(),
            rating: "MAYBE".to_string(),
            created_at: Utc::now(),
            query_model_name: "clip".to_string(),
            query_text: "a cat".to_string(),
            query_result_image_id: None,
            query_created_at: Utc::now(),
        };

        assert!(matches!(
            StoredFeedback::try_from(row),
            Err(ImageError::Internal(_))
        ));
    }
}
