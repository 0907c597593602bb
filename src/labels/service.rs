use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::Label;
use crate::labels::policy::{can_access, LabelAction};
use crate::labels::store::{LabelStore, PgLabelStore, StoreError};
use crate::labels::validator::{validate_title, ValidationError};
use crate::middleware::auth::{AuthUser, Identity};

/// Outbound label representation. Owner and timestamps are never serialized
/// back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelView {
    pub id: Uuid,
    pub title: String,
}

impl From<Label> for LabelView {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            title: label.title,
        }
    }
}

#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Only the owner of a label may access it")]
    Forbidden,

    #[error("Label not found")]
    NotFound,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unexpected storage failure; logged and surfaced as an opaque fault
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for LabelError {
    fn from(e: StoreError) -> Self {
        match e {
            // A concurrent write lost the race against the uniqueness
            // constraint; report it exactly as the pre-check would have
            StoreError::UniqueViolation => LabelError::Validation(ValidationError::DuplicateTitle),
            other => LabelError::Storage(other),
        }
    }
}

/// Orchestrates label operations: authentication check, then load, then
/// policy, then validation, then storage.
pub struct LabelService {
    store: Arc<dyn LabelStore>,
    max_title_length: usize,
}

impl LabelService {
    pub fn new(store: Arc<dyn LabelStore>) -> Self {
        Self {
            store,
            max_title_length: config::config().labels.max_title_length,
        }
    }

    /// Service wired to the application database
    pub fn from_manager() -> Result<Self, DatabaseError> {
        Ok(Self::new(Arc::new(PgLabelStore::new(DatabaseManager::pool()?))))
    }

    fn require_user<'a>(&self, identity: &'a Identity) -> Result<&'a AuthUser, LabelError> {
        identity.user().ok_or(LabelError::Unauthenticated)
    }

    /// Load a label and authorize `action` against it. The authentication
    /// check runs before the load so anonymous callers learn nothing about
    /// which ids exist.
    async fn load_authorized(
        &self,
        identity: &Identity,
        id: Uuid,
        action: LabelAction,
    ) -> Result<Label, LabelError> {
        self.require_user(identity)?;

        let label = self.store.get(id).await?.ok_or(LabelError::NotFound)?;
        if !can_access(identity, &label, action) {
            return Err(LabelError::Forbidden);
        }
        Ok(label)
    }

    /// The caller's own labels, title-ordered. `search` filters by free-text
    /// title match within the caller's scope only.
    pub async fn list(
        &self,
        identity: &Identity,
        search: Option<&str>,
    ) -> Result<Vec<LabelView>, LabelError> {
        let user = self.require_user(identity)?;
        let labels = self.store.list_by_owner(user.user_id, search).await?;
        Ok(labels.into_iter().map(LabelView::from).collect())
    }

    pub async fn create(
        &self,
        identity: &Identity,
        raw_title: &str,
    ) -> Result<LabelView, LabelError> {
        let user = self.require_user(identity)?;

        let existing = self.store.list_by_owner(user.user_id, None).await?;
        let title = validate_title(raw_title, &existing, None, self.max_title_length)?;

        let label = self.store.insert(user.user_id, &title).await?;
        Ok(label.into())
    }

    pub async fn retrieve(&self, identity: &Identity, id: Uuid) -> Result<LabelView, LabelError> {
        let label = self.load_authorized(identity, id, LabelAction::Read).await?;
        Ok(label.into())
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        raw_title: &str,
    ) -> Result<LabelView, LabelError> {
        let label = self.load_authorized(identity, id, LabelAction::Update).await?;

        // Uniqueness is scoped to the original owner, never a claimed one,
        // and the edited label is excluded so it cannot conflict with itself
        let existing = self.store.list_by_owner(label.owner_id, None).await?;
        let title = validate_title(raw_title, &existing, Some(label.id), self.max_title_length)?;

        let updated = self
            .store
            .update_title(label.id, &title)
            .await?
            .ok_or(LabelError::NotFound)?;
        Ok(updated.into())
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<(), LabelError> {
        let label = self.load_authorized(identity, id, LabelAction::Delete).await?;

        if !self.store.delete(label.id).await? {
            return Err(LabelError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::store::memory::MemoryLabelStore;
    use async_trait::async_trait;

    fn user_identity() -> Identity {
        Identity::User(AuthUser {
            user_id: Uuid::new_v4(),
            username: "user".to_string(),
        })
    }

    fn service() -> (LabelService, Arc<MemoryLabelStore>) {
        let store = Arc::new(MemoryLabelStore::new());
        let service = LabelService {
            store: store.clone(),
            max_title_length: 64,
        };
        (service, store)
    }

    #[tokio::test]
    async fn create_returns_normalized_title() {
        let (service, _) = service();
        let user = user_identity();

        let view = service
            .create(&user, "  test    label  spaces   ")
            .await
            .unwrap();
        assert_eq!(view.title, "test label spaces");

        let listed = service.list(&user, None).await.unwrap();
        assert_eq!(listed, vec![view]);
    }

    #[tokio::test]
    async fn duplicate_title_is_per_owner_and_case_insensitive() {
        let (service, _) = service();
        let owner = user_identity();
        let other = user_identity();

        service.create(&owner, "test label").await.unwrap();

        // Same owner, different case: rejected
        let err = service.create(&owner, "TEST LABEL").await.unwrap_err();
        assert!(matches!(
            err,
            LabelError::Validation(ValidationError::DuplicateTitle)
        ));

        // Different owner: accepted
        service.create(&other, "TEST LABEL").await.unwrap();
    }

    #[tokio::test]
    async fn empty_title_is_never_persisted() {
        let (service, _) = service();
        let user = user_identity();

        for raw in [" ", "\t \n"] {
            let err = service.create(&user, raw).await.unwrap_err();
            assert!(matches!(
                err,
                LabelError::Validation(ValidationError::EmptyTitle)
            ));
        }
        assert!(service.list(&user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_to_own_title_recased_succeeds() {
        let (service, _) = service();
        let user = user_identity();

        let created = service.create(&user, "test label").await.unwrap();
        let updated = service
            .update(&user, created.id, "  TEST   LABEL ")
            .await
            .unwrap();
        assert_eq!(updated.title, "TEST LABEL");
        assert_eq!(updated.id, created.id);
    }

    #[tokio::test]
    async fn update_colliding_with_sibling_is_rejected() {
        let (service, _) = service();
        let user = user_identity();

        service.create(&user, "first").await.unwrap();
        let second = service.create(&user, "second").await.unwrap();

        let err = service.update(&user, second.id, "FIRST").await.unwrap_err();
        assert!(matches!(
            err,
            LabelError::Validation(ValidationError::DuplicateTitle)
        ));
    }

    #[tokio::test]
    async fn non_owner_is_forbidden_and_label_is_untouched() {
        let (service, _) = service();
        let owner = user_identity();
        let intruder = user_identity();

        let label = service.create(&owner, "label_1").await.unwrap();

        let err = service
            .update(&intruder, label.id, "label_update")
            .await
            .unwrap_err();
        assert!(matches!(err, LabelError::Forbidden));

        let err = service.delete(&intruder, label.id).await.unwrap_err();
        assert!(matches!(err, LabelError::Forbidden));

        let err = service.retrieve(&intruder, label.id).await.unwrap_err();
        assert!(matches!(err, LabelError::Forbidden));

        // Title unchanged, label still present for the owner
        let fetched = service.retrieve(&owner, label.id).await.unwrap();
        assert_eq!(fetched.title, "label_1");
    }

    #[tokio::test]
    async fn listing_never_leaks_other_owners_labels() {
        let (service, _) = service();
        let alice = user_identity();
        let bob = user_identity();

        service.create(&alice, "zebra").await.unwrap();
        service.create(&alice, "Apple").await.unwrap();
        service.create(&bob, "zebra").await.unwrap();

        let titles: Vec<String> = service
            .list(&alice, None)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.title)
            .collect();
        // Own labels only, ordered case-insensitively by title
        assert_eq!(titles, vec!["Apple", "zebra"]);

        // Search applies within the caller's own scope
        let hits = service.list(&alice, Some("zeb")).await.unwrap();
        assert_eq!(hits.len(), 1);
        let hits = service.list(&bob, Some("apple")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn anonymous_caller_is_denied_without_revealing_existence() {
        let (service, _) = service();
        let owner = user_identity();
        let label = service.create(&owner, "label_1").await.unwrap();

        let anon = Identity::Anonymous;
        let missing = Uuid::new_v4();

        assert!(matches!(
            service.list(&anon, None).await.unwrap_err(),
            LabelError::Unauthenticated
        ));
        assert!(matches!(
            service.create(&anon, "x").await.unwrap_err(),
            LabelError::Unauthenticated
        ));
        // Existing and missing ids answer identically
        for id in [label.id, missing] {
            assert!(matches!(
                service.retrieve(&anon, id).await.unwrap_err(),
                LabelError::Unauthenticated
            ));
            assert!(matches!(
                service.update(&anon, id, "t").await.unwrap_err(),
                LabelError::Unauthenticated
            ));
            assert!(matches!(
                service.delete(&anon, id).await.unwrap_err(),
                LabelError::Unauthenticated
            ));
        }
    }

    #[tokio::test]
    async fn missing_label_is_not_found() {
        let (service, _) = service();
        let user = user_identity();
        let missing = Uuid::new_v4();

        assert!(matches!(
            service.retrieve(&user, missing).await.unwrap_err(),
            LabelError::NotFound
        ));
        assert!(matches!(
            service.update(&user, missing, "t").await.unwrap_err(),
            LabelError::NotFound
        ));
        assert!(matches!(
            service.delete(&user, missing).await.unwrap_err(),
            LabelError::NotFound
        ));
    }

    #[tokio::test]
    async fn delete_removes_the_label() {
        let (service, _) = service();
        let user = user_identity();

        let label = service.create(&user, "label_1").await.unwrap();
        service.delete(&user, label.id).await.unwrap();

        assert!(matches!(
            service.retrieve(&user, label.id).await.unwrap_err(),
            LabelError::NotFound
        ));
        assert!(service.list(&user, None).await.unwrap().is_empty());
    }

    /// Store that passes the pre-check (empty owner set) but reports a
    /// uniqueness violation on insert, as a concurrent create would.
    struct RacingStore;

    #[async_trait]
    impl LabelStore for RacingStore {
        async fn list_by_owner(
            &self,
            _owner_id: Uuid,
            _search: Option<&str>,
        ) -> Result<Vec<Label>, StoreError> {
            Ok(vec![])
        }

        async fn get(&self, _id: Uuid) -> Result<Option<Label>, StoreError> {
            Ok(None)
        }

        async fn insert(&self, _owner_id: Uuid, _title: &str) -> Result<Label, StoreError> {
            Err(StoreError::UniqueViolation)
        }

        async fn update_title(
            &self,
            _id: Uuid,
            _title: &str,
        ) -> Result<Option<Label>, StoreError> {
            Err(StoreError::UniqueViolation)
        }

        async fn delete(&self, _id: Uuid) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn storage_conflict_surfaces_as_duplicate_title() {
        let service = LabelService {
            store: Arc::new(RacingStore),
            max_title_length: 64,
        };
        let user = user_identity();

        let err = service.create(&user, "raced").await.unwrap_err();
        assert!(matches!(
            err,
            LabelError::Validation(ValidationError::DuplicateTitle)
        ));
    }
}
