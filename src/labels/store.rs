use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::Label;

/// Errors surfaced by label storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// The (owner, lower(title)) uniqueness constraint was violated. The
    /// service translates this into the same duplicate-title validation
    /// error the pre-check produces, closing the check-then-act race
    /// between concurrent writes for the same owner.
    #[error("Duplicate title for owner")]
    UniqueViolation,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence boundary for labels.
///
/// Implementations must enforce per-owner case-insensitive title uniqueness
/// themselves and report violations as `StoreError::UniqueViolation`.
#[async_trait]
pub trait LabelStore: Send + Sync {
    /// All labels for one owner, ordered by title ascending
    /// (case-insensitive), optionally filtered by a free-text title match.
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Label>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Label>, StoreError>;

    async fn insert(&self, owner_id: Uuid, title: &str) -> Result<Label, StoreError>;

    /// Update the title of an existing label. Returns `None` if the label
    /// disappeared between load and write.
    async fn update_title(&self, id: Uuid, title: &str) -> Result<Option<Label>, StoreError>;

    /// Remove a label. Join rows referencing it are dropped by the schema's
    /// cascade, detaching it from notes without touching the notes.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Postgres-backed label store
pub struct PgLabelStore {
    pool: PgPool,
}

impl PgLabelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_write_err(e: sqlx::Error) -> StoreError {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation,
            _ => StoreError::Sqlx(e),
        }
    }
}

#[async_trait]
impl LabelStore for PgLabelStore {
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Label>, StoreError> {
        let labels = sqlx::query_as::<_, Label>(
            r#"
            SELECT id, owner_id, title, created_at
            FROM labels
            WHERE owner_id = $1
              AND ($2::text IS NULL OR title ILIKE '%' || $2 || '%')
            ORDER BY LOWER(title) ASC
            "#,
        )
        .bind(owner_id)
        .bind(search)
        .fetch_all(&self.pool)
        .await?;

        Ok(labels)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Label>, StoreError> {
        let label = sqlx::query_as::<_, Label>(
            "SELECT id, owner_id, title, created_at FROM labels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(label)
    }

    async fn insert(&self, owner_id: Uuid, title: &str) -> Result<Label, StoreError> {
        sqlx::query_as::<_, Label>(
            r#"
            INSERT INTO labels (id, owner_id, title)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, title, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_write_err)
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<Option<Label>, StoreError> {
        sqlx::query_as::<_, Label>(
            r#"
            UPDATE labels
            SET title = $2
            WHERE id = $1
            RETURNING id, owner_id, title, created_at
            "#,
        )
        .bind(id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_write_err)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM labels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory store for service tests. Enforces the same per-owner
/// case-insensitive uniqueness constraint as the Postgres schema.
#[cfg(test)]
pub mod memory {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryLabelStore {
        labels: Mutex<Vec<Label>>,
    }

    impl MemoryLabelStore {
        pub fn new() -> Self {
            Self::default()
        }

        fn has_conflict(labels: &[Label], owner_id: Uuid, title: &str, exclude: Option<Uuid>) -> bool {
            let lowered = title.to_lowercase();
            labels.iter().any(|l| {
                l.owner_id == owner_id
                    && exclude != Some(l.id)
                    && l.title.to_lowercase() == lowered
            })
        }
    }

    #[async_trait]
    impl LabelStore for MemoryLabelStore {
        async fn list_by_owner(
            &self,
            owner_id: Uuid,
            search: Option<&str>,
        ) -> Result<Vec<Label>, StoreError> {
            let labels = self.labels.lock().unwrap();
            let needle = search.map(str::to_lowercase);
            let mut matched: Vec<Label> = labels
                .iter()
                .filter(|l| l.owner_id == owner_id)
                .filter(|l| match &needle {
                    Some(needle) => l.title.to_lowercase().contains(needle),
                    None => true,
                })
                .cloned()
                .collect();
            matched.sort_by_key(|l| l.title.to_lowercase());
            Ok(matched)
        }

        async fn get(&self, id: Uuid) -> Result<Option<Label>, StoreError> {
            let labels = self.labels.lock().unwrap();
            Ok(labels.iter().find(|l| l.id == id).cloned())
        }

        async fn insert(&self, owner_id: Uuid, title: &str) -> Result<Label, StoreError> {
            let mut labels = self.labels.lock().unwrap();
            if Self::has_conflict(&labels, owner_id, title, None) {
                return Err(StoreError::UniqueViolation);
            }
            let label = Label {
                id: Uuid::new_v4(),
                owner_id,
                title: title.to_string(),
                created_at: Utc::now(),
            };
            labels.push(label.clone());
            Ok(label)
        }

        async fn update_title(&self, id: Uuid, title: &str) -> Result<Option<Label>, StoreError> {
            let mut labels = self.labels.lock().unwrap();
            let Some(index) = labels.iter().position(|l| l.id == id) else {
                return Ok(None);
            };
            if Self::has_conflict(&labels, labels[index].owner_id, title, Some(id)) {
                return Err(StoreError::UniqueViolation);
            }
            labels[index].title = title.to_string();
            Ok(Some(labels[index].clone()))
        }

        async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
            let mut labels = self.labels.lock().unwrap();
            let before = labels.len();
            labels.retain(|l| l.id != id);
            Ok(labels.len() < before)
        }
    }
}
