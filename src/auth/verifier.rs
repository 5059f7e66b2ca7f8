//! Credential verification
//!
//! Matches a presented shared secret against every stored hash. The scan is
//! linear in the number of credentials, which is only acceptable because the
//! table is a small operator-managed allowlist.
//!
//! There is no lockout or rate limiting on failed attempts.

use std::sync::Arc;

use super::password::{self, PasswordError};
use crate::data::{Credential, Database};
use crate::error::AppError;

/// Finds the stored credential whose hash matches a presented secret.
pub struct CredentialVerifier {
    /// Hash checked when the store is empty, so "no credentials" costs the
    /// same as "no match".
    decoy_hash: Arc<str>,
}

impl CredentialVerifier {
    /// Build a verifier whose decoy hash uses `rounds` iterations.
    pub fn new(rounds: u32) -> Result<Self, PasswordError> {
        let decoy_hash = password::hash_secret("decoy-credential", rounds)?;
        Ok(Self {
            decoy_hash: decoy_hash.into(),
        })
    }

    /// Return the first credential matching `presented`, or `None`.
    pub async fn verify(
        &self,
        db: &Database,
        presented: &str,
    ) -> Result<Option<Credential>, AppError> {
        let credentials = db.list_credentials().await?;
        tracing::debug!(credentials = credentials.len(), "Verifying presented secret");

        let presented = presented.to_owned();
        let decoy_hash = self.decoy_hash.clone();

        tokio::task::spawn_blocking(move || find_match(&presented, credentials, &decoy_hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))
    }
}

fn find_match(presented: &str, credentials: Vec<Credential>, decoy_hash: &str) -> Option<Credential> {
    if credentials.is_empty() {
        let _ = password::verify_secret(presented, decoy_hash);
        return None;
    }

    credentials.into_iter().find(|credential| {
        match password::verify_secret(presented, &credential.token_hash) {
            Ok(matched) => matched,
            Err(error) => {
                tracing::warn!(
                    credential_id = credential.id,
                    %error,
                    "Skipping credential with unreadable hash"
                );
                false
            }
        }
    })
}
