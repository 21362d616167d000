use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::users::repo::{StoreError, StoreResult, UniqueField, UserStore};
use crate::users::repo_types::{NewUser, User};

/// In-process `UserStore`. Keeps soft-deleted rows around like the database does.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    rows: Vec<User>,
}

impl Inner {
    fn active(&self) -> impl Iterator<Item = &User> {
        self.rows.iter().filter(|u| u.is_active())
    }

    fn collision(&self, email: &str, username: &str, except_id: Option<i64>) -> Option<UniqueField> {
        let others = || self.active().filter(move |u| Some(u.id) != except_id);
        if others().any(|u| u.email == email) {
            return Some(UniqueField::Email);
        }
        if others().any(|u| u.username == username) {
            return Some(UniqueField::Username);
        }
        None
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows ever inserted, deleted ones included.
    pub async fn row_count(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if let Some(field) = inner.collision(&user.email, &user.username, None) {
            return Err(StoreError::Duplicate(field));
        }
        inner.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: inner.last_id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<User> {
        let inner = self.inner.read().await;
        let found = inner.active().find(|u| u.id == id).cloned();
        found.ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<User> {
        let inner = self.inner.read().await;
        let found = inner.active().find(|u| u.email == email).cloned();
        found.ok_or(StoreError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<User> {
        let inner = self.inner.read().await;
        let found = inner.active().find(|u| u.username == username).cloned();
        found.ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: &User) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let idx = inner
            .rows
            .iter()
            .position(|u| u.id == user.id && u.is_active())
            .ok_or(StoreError::NotFound)?;
        if let Some(field) = inner.collision(&user.email, &user.username, Some(user.id)) {
            return Err(StoreError::Duplicate(field));
        }
        let row = &mut inner.rows[idx];
        row.email = user.email.clone();
        row.username = user.username.clone();
        row.password_hash = user.password_hash.clone();
        row.updated_at = OffsetDateTime::now_utc();
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let row = inner
            .rows
            .iter_mut()
            .find(|u| u.id == id && u.is_active())
            .ok_or(StoreError::NotFound)?;
        row.deleted_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.into(),
            username: username.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_order() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@x.com", "alice")).await.unwrap();
        let b = store.create(new_user("b@x.com", "bob")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.find_by_username("bob").await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn create_rejects_duplicates_among_active_rows() {
        let store = MemoryUserStore::new();
        store.create(new_user("a@x.com", "alice")).await.unwrap();

        let err = store.create(new_user("a@x.com", "other")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));
        let err = store.create(new_user("b@x.com", "alice")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Username)));
        assert_eq!(store.row_count().await, 1);
    }

    #[tokio::test]
    async fn lookups_are_case_sensitive() {
        let store = MemoryUserStore::new();
        store.create(new_user("A@x.com", "Alice")).await.unwrap();
        assert!(matches!(
            store.find_by_email("a@x.com").await,
            Err(StoreError::NotFound)
        ));
        assert!(store.find_by_email("A@x.com").await.is_ok());
        // Distinct by case, so not a collision.
        assert!(store.create(new_user("a@x.com", "alice")).await.is_ok());
    }

    #[tokio::test]
    async fn soft_delete_hides_row_and_frees_uniqueness() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@x.com", "alice")).await.unwrap();
        store.delete(a.id).await.unwrap();

        assert!(matches!(store.find_by_id(a.id).await, Err(StoreError::NotFound)));
        assert!(matches!(store.find_by_email("a@x.com").await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete(a.id).await, Err(StoreError::NotFound)));

        let again = store.create(new_user("a@x.com", "alice")).await.unwrap();
        assert_ne!(again.id, a.id);
        assert_eq!(store.row_count().await, 2);
    }

    #[tokio::test]
    async fn update_replaces_record_and_checks_collisions() {
        let store = MemoryUserStore::new();
        let mut a = store.create(new_user("a@x.com", "alice")).await.unwrap();
        store.create(new_user("b@x.com", "bob")).await.unwrap();

        a.username = "alicia".into();
        let updated = store.update(&a).await.unwrap();
        assert_eq!(updated.username, "alicia");
        assert!(updated.updated_at >= updated.created_at);

        a.username = "bob".into();
        assert!(matches!(
            store.update(&a).await,
            Err(StoreError::Duplicate(UniqueField::Username))
        ));

        a.id = 99;
        assert!(matches!(store.update(&a).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn update_of_deleted_row_is_not_found_even_when_it_would_collide() {
        let store = MemoryUserStore::new();
        let mut a = store.create(new_user("a@x.com", "alice")).await.unwrap();
        store.create(new_user("b@x.com", "bob")).await.unwrap();
        store.delete(a.id).await.unwrap();

        a.username = "bob".into();
        assert!(matches!(store.update(&a).await, Err(StoreError::NotFound)));
    }
}
