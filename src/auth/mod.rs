//! Shared-secret authentication
//!
//! Handles:
//! - Secret hashing and credential verification
//! - Session token issuance and validation
//! - Session extraction middleware
//! - Login / logout endpoints

mod middleware;
pub mod password;
mod routes;
pub mod session;
mod verifier;

pub use middleware::{
    MaybeIdentity, SESSION_COOKIE, SessionState, extract_session_token,
    require_admin, resolve_session,
};
pub use routes::auth_router;
pub use session::{SessionClaims, SessionCodec, SessionError};
pub use verifier::CredentialVerifier;
