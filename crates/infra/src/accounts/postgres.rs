//! Postgres-backed account repository.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError |
//! |------------|----------------------|-----------------|
//! | Database (unique violation) | `23505` | `Uniqueness` (field from constraint name) |
//! | Database (other) | Any other | `Backend` |
//! | Other | N/A | `Backend` |
//!
//! Email uniqueness is enforced by a unique index on `lower(email)`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::instrument;

use userdesk_auth::{Account, Profile, Role};
use userdesk_core::AccountId;

use super::{AccountRepository, RepositoryError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id            UUID PRIMARY KEY,
        email         TEXT NOT NULL,
        username      TEXT NOT NULL,
        first_name    TEXT NOT NULL DEFAULT '',
        last_name     TEXT NOT NULL DEFAULT '',
        city          TEXT NOT NULL DEFAULT '',
        password_hash TEXT NOT NULL,
        role          TEXT NOT NULL,
        is_active     BOOLEAN NOT NULL DEFAULT TRUE,
        date_joined   TIMESTAMPTZ NOT NULL,
        last_login    TIMESTAMPTZ,
        profile_image TEXT,
        session_epoch BIGINT NOT NULL DEFAULT 0
    )
    "#,
    "ALTER TABLE accounts ADD COLUMN IF NOT EXISTS session_epoch BIGINT NOT NULL DEFAULT 0",
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_email_key ON accounts (lower(email))",
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_username_key ON accounts (username)",
];

const COLUMNS: &str = "id, email, username, first_name, last_name, city, password_hash, \
                       role, is_active, date_joined, last_login, profile_image, session_epoch";

#[derive(Debug, Clone)]
pub struct PostgresAccountRepository {
    pool: Arc<PgPool>,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the `accounts` table exists.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&*self.pool).await?;
        }
        Ok(())
    }
}

fn row_to_account(row: &PgRow) -> Result<Account, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Backend(format!("failed to decode account row: {e}"));

    let role: String = row.try_get("role").map_err(decode)?;
    let role: Role = role
        .parse()
        .map_err(|_| RepositoryError::Backend(format!("unknown role '{role}' in accounts table")))?;

    Ok(Account {
        id: AccountId::from_uuid(row.try_get::<uuid::Uuid, _>("id").map_err(decode)?),
        email: row.try_get("email").map_err(decode)?,
        username: row.try_get("username").map_err(decode)?,
        first_name: row.try_get("first_name").map_err(decode)?,
        last_name: row.try_get("last_name").map_err(decode)?,
        city: row.try_get("city").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        role,
        is_active: row.try_get("is_active").map_err(decode)?,
        date_joined: row.try_get::<DateTime<Utc>, _>("date_joined").map_err(decode)?,
        last_login: row
            .try_get::<Option<DateTime<Utc>>, _>("last_login")
            .map_err(decode)?,
        session_epoch: row.try_get("session_epoch").map_err(decode)?,
        profile: Profile {
            image: row.try_get("profile_image").map_err(decode)?,
        },
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let field = match db_err.constraint() {
                    Some("accounts_email_key") => "email",
                    Some("accounts_username_key") => "username",
                    _ => "id",
                };
                return RepositoryError::Uniqueness { field };
            }
            RepositoryError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Backend(format!("connection pool closed in {operation}"))
        }
        other => RepositoryError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

#[async_trait::async_trait]
impl AccountRepository for PostgresAccountRepository {
    #[instrument(skip_all, err)]
    async fn find_by_email(&self, email: &str) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM accounts WHERE lower(email) = lower($1) ORDER BY date_joined"
        ))
        .bind(email)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_email", e))?;

        rows.iter().map(row_to_account).collect()
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.as_ref().map(row_to_account).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM accounts WHERE username = $1"))
            .bind(username)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_username", e))?;

        row.as_ref().map(row_to_account).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM accounts ORDER BY date_joined, id"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        rows.iter().map(row_to_account).collect()
    }

    #[instrument(skip(self), err)]
    async fn count_by_role(&self, role: Role) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_by_role", e))?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip_all, fields(account_id = %account.id), err)]
    async fn create(&self, account: Account) -> Result<Account, RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO accounts ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.city)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(account.date_joined)
        .bind(account.last_login)
        .bind(&account.profile.image)
        .bind(account.session_epoch)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create", e))?;

        Ok(account)
    }

    #[instrument(skip_all, fields(account_id = %account.id), err)]
    async fn update(&self, account: Account) -> Result<Account, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                email = $2,
                username = $3,
                first_name = $4,
                last_name = $5,
                city = $6,
                password_hash = $7,
                role = $8,
                is_active = $9,
                last_login = $10,
                profile_image = $11,
                session_epoch = $12
            WHERE id = $1
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.city)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(account.last_login)
        .bind(&account.profile.image)
        .bind(account.session_epoch)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
