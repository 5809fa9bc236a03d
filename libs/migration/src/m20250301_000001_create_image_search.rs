use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Images::Table)
                    .if_not_exists()
                    .col(pk_uuid(Images::Id))
                    .col(string(Images::StorageProvider))
                    .col(string(Images::StorageKey))
                    .col(
                        timestamp_with_time_zone(Images::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_images_storage_locator")
                    .table(Images::Table)
                    .col(Images::StorageProvider)
                    .col(Images::StorageKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Vector columns carry no fixed dimension so a model swap needs no migration.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE IF NOT EXISTS image_embeddings (
                    id UUID PRIMARY KEY,
                    image_id UUID NOT NULL REFERENCES images (id) ON DELETE CASCADE,
                    model_name VARCHAR NOT NULL,
                    embedding VECTOR NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_image_embeddings_model_name")
                    .table(ImageEmbeddings::Table)
                    .col(ImageEmbeddings::ModelName)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_image_embeddings_image_id")
                    .table(ImageEmbeddings::Table)
                    .col(ImageEmbeddings::ImageId)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE IF NOT EXISTS search_queries (
                    id UUID PRIMARY KEY,
                    model_name VARCHAR NOT NULL,
                    query_text TEXT NOT NULL,
                    query_embedding VECTOR NOT NULL,
                    result_image_id UUID REFERENCES images (id) ON DELETE SET NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            )
            .await?;

        // One feedback per search query, enforced by the unique constraint.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE IF NOT EXISTS search_feedbacks (
                    id UUID PRIMARY KEY,
                    search_query_id UUID NOT NULL UNIQUE
                        REFERENCES search_queries (id) ON DELETE CASCADE,
                    rating VARCHAR NOT NULL CHECK (rating IN ('POSITIVE', 'NEGATIVE')),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SearchFeedbacks::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(SearchQueries::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ImageEmbeddings::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Images::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Images {
    Table,
    Id,
    StorageProvider,
    StorageKey,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ImageEmbeddings {
    Table,
    ImageId,
    ModelName,
}

#[derive(DeriveIden)]
enum SearchQueries {
    Table,
}

#[derive(DeriveIden)]
enum SearchFeedbacks {
    Table,
}
