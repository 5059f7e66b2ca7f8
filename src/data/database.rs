//! SQLite database operations
//!
//! All database access goes through this module.

use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::auth::password;
use crate::error::{AppError, Result};

/// Fixed primary key of the seed credential. Concurrent bootstraps from
/// several instances collide on it even though their salted hashes differ.
const SEED_CREDENTIAL_ID: i64 = 1;

/// Database connection pool wrapper.
pub struct Database {
    pub(super) pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the SQLite file at `path`, creating it if needed, and run
    /// migrations.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Return every stored credential, ordered by id.
    ///
    /// The table is an operator-curated allowlist, so there is no pagination.
    pub async fn list_credentials(&self) -> Result<Vec<Credential>> {
        let credentials = sqlx::query_as::<_, Credential>(
            "SELECT id, token_hash, description, isadmin FROM secret_tokens ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(credentials)
    }

    /// Seed the store with one admin credential if, and only if, it is empty.
    ///
    /// The emptiness check and the insert are a single statement, and the
    /// fixed seed id backs it with a primary-key constraint. A constraint
    /// violation rolls back and reports `AlreadyPopulated`.
    ///
    /// # Errors
    /// `AppError::Config` if `plaintext` or `description` is empty.
    pub async fn bootstrap_credential(
        &self,
        plaintext: &str,
        description: &str,
        rounds: u32,
    ) -> Result<BootstrapOutcome> {
        if plaintext.is_empty() {
            return Err(AppError::Config(
                "no shared secret configured for credential bootstrap".to_string(),
            ));
        }
        if description.trim().is_empty() {
            return Err(AppError::Config(
                "no description configured for the bootstrap credential".to_string(),
            ));
        }

        let token_hash = hash_blocking(plaintext, rounds).await?;

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            r#"
            INSERT INTO secret_tokens (id, token_hash, description, isadmin)
            SELECT ?, ?, ?, 1
            WHERE NOT EXISTS (SELECT 1 FROM secret_tokens)
            "#,
        )
        .bind(SEED_CREDENTIAL_ID)
        .bind(&token_hash)
        .bind(description)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(done) if done.rows_affected() == 1 => {
                tx.commit().await?;
                tracing::info!(
                    credential_id = SEED_CREDENTIAL_ID,
                    description,
                    "Seed credential created"
                );
                Ok(BootstrapOutcome::Seeded(SEED_CREDENTIAL_ID))
            }
            Ok(_) => {
                tx.rollback().await?;
                tracing::info!("Credential store already populated; bootstrap skipped");
                Ok(BootstrapOutcome::AlreadyPopulated)
            }
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                tx.rollback().await?;
                tracing::warn!(
                    %error,
                    "Seed credential insert hit a uniqueness constraint; treating store as bootstrapped"
                );
                Ok(BootstrapOutcome::AlreadyPopulated)
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Hash `plaintext` and store it as a new credential.
    ///
    /// Used by operator tooling; the login path never writes.
    pub async fn insert_credential(
        &self,
        plaintext: &str,
        description: &str,
        is_admin: bool,
        rounds: u32,
    ) -> Result<Credential> {
        if plaintext.is_empty() {
            return Err(AppError::Validation(
                "shared secret must not be empty".to_string(),
            ));
        }
        if description.trim().is_empty() {
            return Err(AppError::Validation(
                "credential description must not be empty".to_string(),
            ));
        }

        let token_hash = hash_blocking(plaintext, rounds).await?;

        let done = sqlx::query(
            "INSERT INTO secret_tokens (token_hash, description, isadmin) VALUES (?, ?, ?)",
        )
        .bind(&token_hash)
        .bind(description)
        .bind(is_admin)
        .execute(&self.pool)
        .await?;

        let id = done.last_insert_rowid();
        tracing::info!(credential_id = id, description, is_admin, "Credential stored");

        Ok(Credential {
            id,
            token_hash,
            description: description.to_string(),
            is_admin,
        })
    }

    /// Number of stored credentials.
    pub async fn count_credentials(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM secret_tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// PBKDF2 at production round counts takes long enough to stall the runtime,
/// so hashing runs on the blocking pool.
async fn hash_blocking(plaintext: &str, rounds: u32) -> Result<String> {
    let plaintext = plaintext.to_owned();
    tokio::task::spawn_blocking(move || password::hash_secret(&plaintext, rounds))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Encryption(e.to_string()))
}
