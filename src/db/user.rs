use std::collections::BTreeSet;

use sqlx::sqlite::SqlitePool;

use crate::auth::Identity;

/// Role given to every account at sign-up.
pub const DEFAULT_ROLE: &str = "USER";

/// Role that grants administrator access.
pub const ADMIN_ROLE: &str = "ADMIN";

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            roles: user.roles,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
}

/// Public user summary for the admin listing. Never exposes password hashes.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: i64,
    pub username: String,
    pub roles: BTreeSet<String>,
    pub created_at: String,
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    id: i64,
    username: String,
    created_at: String,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user with the given roles. Returns the user ID.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[&str],
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        let id = result.last_insert_rowid();

        for role in roles {
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?, ?)")
                .bind(id)
                .bind(*role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Get a user by ID, with roles.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, password_hash FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        self.with_roles(row).await
    }

    /// Get a user by username (case-insensitive), with roles.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, username, password_hash FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        self.with_roles(row).await
    }

    async fn with_roles(&self, row: Option<UserRow>) -> Result<Option<User>, sqlx::Error> {
        let Some(row) = row else {
            return Ok(None);
        };
        let roles = self.roles(row.id).await?;
        Ok(Some(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            roles,
        }))
    }

    /// Get the identity (user without credential) for an ID.
    pub async fn find_identity(&self, id: i64) -> Result<Option<Identity>, sqlx::Error> {
        Ok(self.get_by_id(id).await?.map(Identity::from))
    }

    /// Current roles of a user.
    pub async fn roles(&self, id: i64) -> Result<BTreeSet<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT role FROM user_roles WHERE user_id = ?")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Grant a role. Returns false if the user already had it.
    pub async fn add_role(&self, id: i64, role: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?, ?)")
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke a role. Returns false if the user did not have it.
    pub async fn remove_role(&self, id: i64, role: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role = ?")
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if a username is available.
    pub async fn is_username_available(&self, username: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 == 0)
    }

    /// Delete a user and their roles.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all users (for the admin listing).
    pub async fn list(&self) -> Result<Vec<UserSummary>, sqlx::Error> {
        let rows: Vec<UserSummaryRow> =
            sqlx::query_as("SELECT id, username, created_at FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(UserSummary {
                roles: self.roles(row.id).await?,
                user_id: row.id,
                username: row.username,
                created_at: row.created_at,
            });
        }
        Ok(users)
    }
}
