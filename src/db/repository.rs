//! Identity repository for Warden.
//!
//! SQLite implementation of [`IdentityStore`].

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};

use super::identity::{normalize_email, Identity, IdentityId, IdentityUpdate, NewIdentity};
use super::store::{IdentityStore, StoreError};
use super::DbPool;

const IDENTITY_COLUMNS: &str = "id, first_name, last_name, email, salt, hashed_password, role,
    last_login_at, last_login_ip, last_request_at, locked_at, locked_by,
    confirmation_key, confirmation_key_expires_at, confirmation_tries, created_at";

/// Repository for identity persistence.
///
/// Holds a pool handle, so it is cheap to clone and can be shared across
/// request tasks.
#[derive(Debug, Clone)]
pub struct IdentityRepository {
    pool: DbPool,
}

impl IdentityRepository {
    /// Create a new repository over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Count all identities.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM identities")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// List identities with an administrative role, most privileged first.
    pub async fn list_admins(&self) -> Result<Vec<Identity>, StoreError> {
        let sql = format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE role <= ? ORDER BY role, id"
        );
        let identities = sqlx::query_as::<_, Identity>(&sql)
            .bind(super::ADMIN_ROLE_THRESHOLD)
            .fetch_all(&self.pool)
            .await?;
        Ok(identities)
    }
}

#[async_trait]
impl IdentityStore for IdentityRepository {
    async fn create(&self, new_identity: &NewIdentity) -> Result<Identity, StoreError> {
        let email = normalize_email(&new_identity.email)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO identities (email, salt, hashed_password, first_name, last_name, role)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(email)
        .bind(&new_identity.credentials.salt)
        .bind(&new_identity.credentials.hashed_password)
        .bind(&new_identity.first_name)
        .bind(&new_identity.last_name)
        .bind(new_identity.role)
        .fetch_one(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::Database(format!("identity {id} vanished after insert")))
    }

    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = ?");
        let identity = sqlx::query_as::<_, Identity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(identity)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = ?");
        let identity = sqlx::query_as::<_, Identity>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(identity)
    }

    async fn update_by_id(
        &self,
        id: IdentityId,
        update: &IdentityUpdate,
    ) -> Result<bool, StoreError> {
        if update.is_empty() {
            return Ok(self.find_by_id(id).await?.is_some());
        }
        let email = update.email.as_deref().map(normalize_email).transpose()?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE identities SET ");
        let mut separated = query.separated(", ");

        if let Some(ref first) = update.first_name {
            separated.push("first_name = ");
            separated.push_bind_unseparated(first.clone());
        }
        if let Some(ref last) = update.last_name {
            separated.push("last_name = ");
            separated.push_bind_unseparated(last.clone());
        }
        if let Some(email) = email {
            separated.push("email = ");
            separated.push_bind_unseparated(email);
        }
        if let Some(ref credentials) = update.credentials {
            separated.push("salt = ");
            separated.push_bind_unseparated(credentials.salt.clone());
            separated.push("hashed_password = ");
            separated.push_bind_unseparated(credentials.hashed_password.clone());
        }
        if let Some(role) = update.role {
            separated.push("role = ");
            separated.push_bind_unseparated(role);
        }
        if let Some(at) = update.last_login_at {
            separated.push("last_login_at = ");
            separated.push_bind_unseparated(at);
        }
        if let Some(ref ip) = update.last_login_ip {
            separated.push("last_login_ip = ");
            separated.push_bind_unseparated(ip.clone());
        }
        if let Some(at) = update.last_request_at {
            separated.push("last_request_at = ");
            separated.push_bind_unseparated(at);
        }
        if let Some(at) = update.locked_at {
            separated.push("locked_at = ");
            separated.push_bind_unseparated(at);
        }
        if let Some(by) = update.locked_by {
            separated.push("locked_by = ");
            separated.push_bind_unseparated(by);
        }
        if let Some(ref key) = update.confirmation_key {
            separated.push("confirmation_key = ");
            separated.push_bind_unseparated(key.clone());
        }
        if let Some(expires_at) = update.confirmation_key_expires_at {
            separated.push("confirmation_key_expires_at = ");
            separated.push_bind_unseparated(expires_at);
        }
        if let Some(tries) = update.confirmation_tries {
            separated.push("confirmation_tries = ");
            separated.push_bind_unseparated(tries);
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
