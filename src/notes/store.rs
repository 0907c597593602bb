use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::Note;

#[derive(Debug, Error)]
pub enum NoteStoreError {
    /// A label id in the attachment set does not exist
    #[error("Referenced label does not exist")]
    UnknownLabel,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence boundary for notes. Label attachments live in a join table;
/// deleting a label detaches it from notes via the schema's cascade.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Note>, NoteStoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Note>, NoteStoreError>;

    async fn insert(
        &self,
        author_id: Uuid,
        text: &str,
        label_ids: &[Uuid],
    ) -> Result<Note, NoteStoreError>;

    /// Update text and/or replace the label set. `None` leaves a field as-is.
    async fn update(
        &self,
        id: Uuid,
        text: Option<&str>,
        label_ids: Option<&[Uuid]>,
    ) -> Result<Option<Note>, NoteStoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, NoteStoreError>;
}

/// Postgres-backed note store
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_attach_err(e: sqlx::Error) -> NoteStoreError {
        match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                NoteStoreError::UnknownLabel
            }
            _ => NoteStoreError::Sqlx(e),
        }
    }

    async fn label_ids_for(&self, note_ids: &[Uuid]) -> Result<Vec<(Uuid, Uuid)>, sqlx::Error> {
        if note_ids.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT note_id, label_id FROM note_labels WHERE note_id = ANY($1)",
        )
        .bind(note_ids)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Note>, NoteStoreError> {
        let mut notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT id, author_id, text, created_at
            FROM notes
            WHERE author_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = notes.iter().map(|n| n.id).collect();
        for (note_id, label_id) in self.label_ids_for(&ids).await? {
            if let Some(note) = notes.iter_mut().find(|n| n.id == note_id) {
                note.label_ids.push(label_id);
            }
        }

        Ok(notes)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Note>, NoteStoreError> {
        let note = sqlx::query_as::<_, Note>(
            "SELECT id, author_id, text, created_at FROM notes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut note) = note else {
            return Ok(None);
        };
        note.label_ids = self
            .label_ids_for(&[note.id])
            .await?
            .into_iter()
            .map(|(_, label_id)| label_id)
            .collect();

        Ok(Some(note))
    }

    async fn insert(
        &self,
        author_id: Uuid,
        text: &str,
        label_ids: &[Uuid],
    ) -> Result<Note, NoteStoreError> {
        let mut tx = self.pool.begin().await?;

        let mut note = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, author_id, text, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(author_id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await?;

        for label_id in label_ids {
            sqlx::query(
                "INSERT INTO note_labels (note_id, label_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(note.id)
            .bind(label_id)
            .execute(&mut *tx)
            .await
            .map_err(Self::map_attach_err)?;
            note.label_ids.push(*label_id);
        }

        tx.commit().await?;
        Ok(note)
    }

    async fn update(
        &self,
        id: Uuid,
        text: Option<&str>,
        label_ids: Option<&[Uuid]>,
    ) -> Result<Option<Note>, NoteStoreError> {
        let mut tx = self.pool.begin().await?;

        let note = sqlx::query_as::<_, Note>(
            r#"
            UPDATE notes
            SET text = COALESCE($2, text)
            WHERE id = $1
            RETURNING id, author_id, text, created_at
            "#,
        )
        .bind(id)
        .bind(text)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(note) = note else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(label_ids) = label_ids {
            sqlx::query("DELETE FROM note_labels WHERE note_id = $1")
                .bind(note.id)
                .execute(&mut *tx)
                .await?;
            for label_id in label_ids {
                sqlx::query(
                    "INSERT INTO note_labels (note_id, label_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                )
                .bind(note.id)
                .bind(label_id)
                .execute(&mut *tx)
                .await
                .map_err(Self::map_attach_err)?;
            }
        }

        tx.commit().await?;
        self.get(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, NoteStoreError> {
        // Join rows go with the note via cascade
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
