use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Note;
use crate::middleware::auth::{AuthUser, Identity};
use crate::notes::store::{NoteStore, NoteStoreError, PgNoteStore};

/// Outbound note representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteView {
    pub id: Uuid,
    pub text: String,
    pub labels: Vec<Uuid>,
}

impl From<Note> for NoteView {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            text: note.text,
            labels: note.label_ids,
        }
    }
}

#[derive(Debug, Error)]
pub enum NoteError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Only the author of a note may access it")]
    Forbidden,

    #[error("Note not found")]
    NotFound,

    #[error("Text must not be empty")]
    EmptyText,

    #[error("Referenced label does not exist")]
    UnknownLabel,

    #[error("Storage error: {0}")]
    Storage(sqlx::Error),
}

impl From<NoteStoreError> for NoteError {
    fn from(e: NoteStoreError) -> Self {
        match e {
            NoteStoreError::UnknownLabel => NoteError::UnknownLabel,
            NoteStoreError::Sqlx(e) => NoteError::Storage(e),
        }
    }
}

/// Thin author-scoped CRUD over notes. Same guard ordering as labels:
/// authentication, then load, then ownership.
pub struct NoteService {
    store: Arc<dyn NoteStore>,
}

impl NoteService {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self { store }
    }

    /// Service wired to the application database
    pub fn from_manager() -> Result<Self, DatabaseError> {
        Ok(Self::new(Arc::new(PgNoteStore::new(DatabaseManager::pool()?))))
    }

    fn require_user<'a>(&self, identity: &'a Identity) -> Result<&'a AuthUser, NoteError> {
        identity.user().ok_or(NoteError::Unauthenticated)
    }

    async fn load_owned(&self, identity: &Identity, id: Uuid) -> Result<Note, NoteError> {
        let user = self.require_user(identity)?;
        let note = self.store.get(id).await?.ok_or(NoteError::NotFound)?;
        if note.author_id != user.user_id {
            return Err(NoteError::Forbidden);
        }
        Ok(note)
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<NoteView>, NoteError> {
        let user = self.require_user(identity)?;
        let notes = self.store.list_by_author(user.user_id).await?;
        Ok(notes.into_iter().map(NoteView::from).collect())
    }

    pub async fn create(
        &self,
        identity: &Identity,
        text: &str,
        label_ids: &[Uuid],
    ) -> Result<NoteView, NoteError> {
        let user = self.require_user(identity)?;
        if text.trim().is_empty() {
            return Err(NoteError::EmptyText);
        }
        let note = self.store.insert(user.user_id, text, label_ids).await?;
        Ok(note.into())
    }

    pub async fn retrieve(&self, identity: &Identity, id: Uuid) -> Result<NoteView, NoteError> {
        Ok(self.load_owned(identity, id).await?.into())
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        text: Option<&str>,
        label_ids: Option<&[Uuid]>,
    ) -> Result<NoteView, NoteError> {
        let note = self.load_owned(identity, id).await?;
        if let Some(text) = text {
            if text.trim().is_empty() {
                return Err(NoteError::EmptyText);
            }
        }
        let updated = self
            .store
            .update(note.id, text, label_ids)
            .await?
            .ok_or(NoteError::NotFound)?;
        Ok(updated.into())
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), NoteError> {
        let note = self.load_owned(identity, id).await?;
        if !self.store.delete(note.id).await? {
            return Err(NoteError::NotFound);
        }
        Ok(())
    }
}
