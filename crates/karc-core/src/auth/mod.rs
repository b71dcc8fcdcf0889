//! Identity, credentials, and the client-side session.
//!
//! [`IdentityProvider`] is the credential backend (sign up, sign in, token
//! lookup). [`AuthSession`] sits on top of it and tracks who is signed in,
//! whether they are approved, and which role applies.

#![allow(clippy::missing_errors_doc)]

mod password;
mod provider;
mod session;
mod session_file;

pub use password::{hash_password, verify_password};
pub use provider::{
    AuthUser, IdentityProvider, IssuedSession, LiveSession, LocalIdentityProvider, SignUpRequest,
};
pub use session::{
    AuthEvent, AuthSession, ProfileFetch, ProfileSource, SessionSnapshot, SessionState,
    SessionStateKind, SubscriptionId,
};
pub use session_file::{SessionFile, StoredSession};
