//! Data models
//!
//! Rust structs representing database entities.

/// A stored shared-secret credential
///
/// Rows are seeded once at bootstrap or managed out of band; the auth
/// layer only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Credential {
    pub id: i64,
    /// PHC-formatted PBKDF2 hash of the shared secret
    pub token_hash: String,
    /// Human-readable label (at most 120 characters)
    pub description: String,
    #[sqlx(rename = "isadmin")]
    pub is_admin: bool,
}

/// Result of seeding the credential store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The store was empty and the seed credential was inserted
    Seeded(i64),
    /// The store already held credentials, or a concurrent bootstrap won
    AlreadyPopulated,
}
