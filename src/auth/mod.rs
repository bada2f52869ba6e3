//! Authentication: credential storage, password hashing, and the session
//! token lifecycle.
//!
//! The pieces compose in one direction: the [`CredentialStore`] owns the
//! `user` and `session` tables, the [`TokenAuthority`] owns token issuance
//! and validation on top of it, and password hashing is an opaque
//! hash+compare capability used only by the login/register handlers.
//!
//! ## Security model
//!
//! - Tokens carry 64 bytes of CSPRNG entropy; guessing is infeasible.
//! - At most one live token per username; a new login invalidates the old.
//! - Expiry is lazy: validation compares the stored issuance instant against
//!   the clock, nothing sweeps the table.
//! - Callers see a single generic unauthorized failure; the distinct reasons
//!   live only in logs.

mod credentials;
mod password;
mod tokens;

pub use credentials::CredentialStore;
pub use password::{hash_password, verify_password};
pub use tokens::{AuthError, Session, TOKEN_TTL_SECS, TokenAuthority, bearer_token};
