//! Profile store for the `usuarios` table.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use super::locked;
use crate::models::{normalize_email, ProfileChanges, UserProfile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Rejected(String),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert_profile(&self, profile: &UserProfile) -> Result<UserProfile, StoreError>;

    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError>;

    async fn find_profile_by_email(&self, email: &str)
        -> Result<Option<UserProfile>, StoreError>;

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError>;

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<UserProfile>, StoreError>;

    /// Returns `false` when no profile had that id.
    async fn delete_profile(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Moves a profile to a new id. Used to repair drift against the
    /// identity provider.
    async fn reassign_profile_id(&self, from: Uuid, to: Uuid) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// PostgreSQL-backed profile store.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn insert_profile(&self, profile: &UserProfile) -> Result<UserProfile, StoreError> {
        let row = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO usuarios (id, email, nombre, rol, sede, activo, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, nombre, rol, sede, activo, created_at
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.nombre)
        .bind(profile.rol.as_str())
        .bind(&profile.sede)
        .bind(profile.activo)
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, UserProfile>(
            "SELECT id, email, nombre, rol, sede, activo, created_at FROM usuarios WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, email, nombre, rol, sede, activo, created_at
            FROM usuarios WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        let rows = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, email, nombre, rol, sede, activo, created_at
            FROM usuarios ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE usuarios SET
                email = COALESCE($2, email),
                nombre = COALESCE($3, nombre),
                rol = COALESCE($4, rol),
                sede = CASE WHEN $5 THEN $6 ELSE sede END,
                activo = COALESCE($7, activo)
            WHERE id = $1
            RETURNING id, email, nombre, rol, sede, activo, created_at
            "#,
        )
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.nombre)
        .bind(changes.rol.map(|r| r.as_str()))
        .bind(changes.sede.is_some())
        .bind(changes.sede.clone().flatten())
        .bind(changes.activo)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_profile(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM usuarios WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reassign_profile_id(&self, from: Uuid, to: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE usuarios SET id = $2 WHERE id = $1")
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Rejected(format!("Profile {} not found", from)));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            StoreError::Database(e)
        })?;
        Ok(())
    }
}

/// In-memory profile store with call counters and fault injection.
#[derive(Default)]
pub struct MockProfileStore {
    profiles: Mutex<Vec<UserProfile>>,
    insert_calls: AtomicUsize,
    insert_failure: Mutex<Option<String>>,
    panic_on_insert: Mutex<bool>,
    reassign_failure: Mutex<Option<String>>,
    unhealthy: Mutex<Option<String>>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row without counting it as an insert call.
    pub fn seed(&self, profile: UserProfile) {
        locked(&self.profiles).push(profile);
    }

    /// The next `insert_profile` call fails with `message`.
    pub fn fail_next_insert(&self, message: &str) {
        *locked(&self.insert_failure) = Some(message.to_string());
    }

    /// The next `insert_profile` call panics.
    pub fn panic_next_insert(&self) {
        *locked(&self.panic_on_insert) = true;
    }

    pub fn fail_reassignments(&self, message: &str) {
        *locked(&self.reassign_failure) = Some(message.to_string());
    }

    pub fn set_unhealthy(&self, message: &str) {
        *locked(&self.unhealthy) = Some(message.to_string());
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn profile_count(&self) -> usize {
        locked(&self.profiles).len()
    }

    pub fn get(&self, id: Uuid) -> Option<UserProfile> {
        locked(&self.profiles).iter().find(|p| p.id == id).cloned()
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn insert_profile(&self, profile: &UserProfile) -> Result<UserProfile, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        if std::mem::take(&mut *locked(&self.panic_on_insert)) {
            panic!("profile store panicked while inserting {}", profile.id);
        }
        if let Some(message) = locked(&self.insert_failure).take() {
            return Err(StoreError::Rejected(message));
        }

        let mut profiles = locked(&self.profiles);
        if profiles.iter().any(|p| p.id == profile.id) {
            return Err(StoreError::Rejected(format!(
                "duplicate key value violates unique constraint \"usuarios_pkey\" ({})",
                profile.id
            )));
        }
        if profiles
            .iter()
            .any(|p| normalize_email(&p.email) == normalize_email(&profile.email))
        {
            return Err(StoreError::Rejected(
                "duplicate key value violates unique constraint \"usuarios_email_key\"".to_string(),
            ));
        }
        profiles.push(profile.clone());
        Ok(profile.clone())
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.get(id))
    }

    async fn find_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserProfile>, StoreError> {
        let wanted = normalize_email(email);
        Ok(locked(&self.profiles)
            .iter()
            .find(|p| normalize_email(&p.email) == wanted)
            .cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        let mut profiles = locked(&self.profiles).clone();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(profiles)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<UserProfile>, StoreError> {
        let mut profiles = locked(&self.profiles);
        Ok(profiles.iter_mut().find(|p| p.id == id).map(|p| {
            p.apply(changes);
            p.clone()
        }))
    }

    async fn delete_profile(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut profiles = locked(&self.profiles);
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        Ok(profiles.len() < before)
    }

    async fn reassign_profile_id(&self, from: Uuid, to: Uuid) -> Result<(), StoreError> {
        if let Some(message) = locked(&self.reassign_failure).clone() {
            return Err(StoreError::Rejected(message));
        }

        let mut profiles = locked(&self.profiles);
        if profiles.iter().any(|p| p.id == to) {
            return Err(StoreError::Rejected(format!(
                "duplicate key value violates unique constraint \"usuarios_pkey\" ({})",
                to
            )));
        }
        match profiles.iter_mut().find(|p| p.id == from) {
            Some(profile) => {
                profile.id = to;
                Ok(())
            }
            None => Err(StoreError::Rejected(format!("Profile {} not found", from))),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        match locked(&self.unhealthy).clone() {
            Some(message) => Err(StoreError::Rejected(message)),
            None => Ok(()),
        }
    }
}
