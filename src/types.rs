//! NewType wrappers for strong typing throughout the gateway.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., passing a session token where a username is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Unique account identifier chosen at registration.
    ///
    /// Case-sensitive, 3-32 characters after trimming. Usernames are the
    /// primary key for the `user` table and the foreign key linking sessions
    /// to their owner.
    Username
);

newtype_string!(
    /// Opaque bearer token issued on login.
    ///
    /// 64 bytes of CSPRNG entropy encoded as URL-safe base64 without padding.
    /// The token string is the primary key of the `session` table; at most
    /// one live token exists per username.
    SessionToken
);

newtype_string!(
    /// Identity a request is rate-limited under.
    ///
    /// Resolved from the first `X-Forwarded-For` value when present, the
    /// peer socket address otherwise, or the sentinel `"unknown"` when
    /// neither is available.
    ClientId
);
