//! Client-side session state machine.
//!
//! ```text
//! Unauthenticated -> Authenticating -> SessionRestoring -> PendingApproval
//!                                                      \-> Active
//! ```
//!
//! `logout` returns to `Unauthenticated` from anywhere. `restore` recovers
//! a stored token without user input and re-enters `SessionRestoring`.
//! Every transition is pushed to subscribers with a fresh snapshot.

use serde::Serialize;

use super::provider::{AuthUser, IdentityProvider, IssuedSession, LiveSession, SignUpRequest};
use super::session_file::StoredSession;
use crate::model::{Profile, Role};
use crate::services::AuthError;
use crate::store::PortalDb;

/// Where profiles come from once an identity is known.
pub trait ProfileSource {
    fn fetch_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>>;
}

impl ProfileSource for PortalDb {
    fn fetch_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        self.get_profile(user_id)
    }
}

impl<T: ProfileSource + ?Sized> ProfileSource for &T {
    fn fetch_profile(&self, user_id: &str) -> anyhow::Result<Option<Profile>> {
        (**self).fetch_profile(user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// Login or signup in flight.
    Authenticating,
    /// Identity known, profile being fetched.
    SessionRestoring { user: AuthUser },
    /// Signed in without approval. `profile` is `None` if it could not be loaded.
    PendingApproval {
        user: AuthUser,
        profile: Option<Profile>,
    },
    Active { user: AuthUser, profile: Profile },
}

impl SessionState {
    #[must_use]
    pub const fn kind(&self) -> SessionStateKind {
        match self {
            Self::Unauthenticated => SessionStateKind::Unauthenticated,
            Self::Authenticating => SessionStateKind::Authenticating,
            Self::SessionRestoring { .. } => SessionStateKind::SessionRestoring,
            Self::PendingApproval { .. } => SessionStateKind::PendingApproval,
            Self::Active { .. } => SessionStateKind::Active,
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Unauthenticated | Self::Authenticating => None,
            Self::SessionRestoring { user }
            | Self::PendingApproval { user, .. }
            | Self::Active { user, .. } => Some(user),
        }
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        match self {
            Self::PendingApproval {
                profile: Some(profile),
                ..
            }
            | Self::Active { profile, .. } => Some(profile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStateKind {
    Unauthenticated,
    Authenticating,
    SessionRestoring,
    PendingApproval,
    Active,
}

/// Read-only view of the session handed to the rest of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionStateKind,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// `public` whenever no profile is loaded.
    pub role: Role,
    pub approved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    Authenticating,
    SignedIn,
    SessionRestored,
    ProfileLoaded,
    SignedOut,
    AuthFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An outstanding profile fetch. Only the newest one may land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFetch {
    generation: u64,
    user_id: String,
}

impl ProfileFetch {
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

type Listener = Box<dyn Fn(&AuthEvent, &SessionSnapshot)>;

/// The session service: one per process, injected where needed.
pub struct AuthSession<P, S> {
    provider: P,
    profiles: S,
    state: SessionState,
    access_token: Option<String>,
    expires_at: Option<String>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    fetch_generation: u64,
    pending_redirect: bool,
}

impl<P: IdentityProvider, S: ProfileSource> AuthSession<P, S> {
    pub fn new(provider: P, profiles: S) -> Self {
        Self {
            provider,
            profiles,
            state: SessionState::Unauthenticated,
            access_token: None,
            expires_at: None,
            listeners: Vec::new(),
            next_subscription: 0,
            fetch_generation: 0,
            pending_redirect: false,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// What to persist for a later [`restore`](Self::restore). `None` while
    /// signed out.
    #[must_use]
    pub fn stored_session(&self) -> Option<StoredSession> {
        let user = self.state.user()?;
        Some(StoredSession {
            access_token: self.access_token.clone()?,
            user_id: user.id.clone(),
            email: user.email.clone(),
            expires_at: self.expires_at.clone()?,
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let user = self.state.user();
        let profile = self.state.profile();
        SessionSnapshot {
            state: self.state.kind(),
            user_id: user.map(|u| u.id.clone()),
            email: user.map(|u| u.email.clone()),
            display_name: profile.map(|p| p.display_name().to_string()),
            role: profile.map_or(Role::Public, |p| p.role),
            approved: profile.is_some_and(|p| p.approved),
        }
    }

    /// Register a listener for every transition.
    pub fn subscribe(&mut self, listener: impl Fn(&AuthEvent, &SessionSnapshot) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    /// One-shot: true once after an identity's first ever sign-in.
    pub fn take_pending_redirect(&mut self) -> bool {
        std::mem::take(&mut self.pending_redirect)
    }

    /// Recover a previously issued token. Returns whether a session was restored.
    ///
    /// Any failure leaves the session `Unauthenticated`.
    #[tracing::instrument(skip_all)]
    pub fn restore(&mut self, access_token: &str) -> Result<bool, AuthError> {
        match self.provider.get_session(access_token) {
            Ok(Some(live)) => {
                self.pending_redirect = false;
                self.access_token = Some(access_token.to_string());
                self.expires_at = Some(live.expires_at);
                self.transition(
                    SessionState::SessionRestoring { user: live.user },
                    AuthEvent::SessionRestored,
                );
                self.load_profile();
                Ok(true)
            }
            Ok(None) => {
                self.clear(AuthEvent::SignedOut);
                Ok(false)
            }
            Err(err) => {
                tracing::warn!(error = %err, "session restore failed");
                self.clear(AuthEvent::AuthFailed);
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self, password))]
    pub fn login(&mut self, email: &str, password: &str) -> Result<SessionSnapshot, AuthError> {
        self.invalidate_fetches();
        self.transition(SessionState::Authenticating, AuthEvent::Authenticating);
        let issued = self.provider.sign_in_with_password(email, password);
        self.finish_sign_in(issued)
    }

    /// Create an account and sign in. Lands in `PendingApproval`.
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub fn signup(&mut self, request: &SignUpRequest<'_>) -> Result<SessionSnapshot, AuthError> {
        self.invalidate_fetches();
        self.transition(SessionState::Authenticating, AuthEvent::Authenticating);
        let issued = self.provider.sign_up(request);
        self.finish_sign_in(issued)
    }

    /// Sign out and forget the identity. Safe to call repeatedly.
    pub fn logout(&mut self) {
        if let Some(token) = self.access_token.take() {
            if let Err(err) = self.provider.sign_out(&token) {
                tracing::warn!(error = %err, "failed to revoke access token");
            }
        }
        if self.state != SessionState::Unauthenticated {
            self.clear(AuthEvent::SignedOut);
        }
    }

    /// Re-read the current identity's profile from the store.
    pub fn refresh_profile(&mut self) -> Result<(), AuthError> {
        if self.state.user().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        self.load_profile();
        Ok(())
    }

    /// Start a profile fetch for the current identity.
    ///
    /// Any earlier outstanding fetch becomes stale.
    pub fn begin_profile_fetch(&mut self) -> Option<ProfileFetch> {
        let user_id = self.state.user()?.id.clone();
        self.fetch_generation += 1;
        Some(ProfileFetch {
            generation: self.fetch_generation,
            user_id,
        })
    }

    /// Apply a fetched profile. Stale results are dropped; returns whether
    /// this one was applied.
    pub fn complete_profile_fetch(
        &mut self,
        fetch: &ProfileFetch,
        result: anyhow::Result<Option<Profile>>,
    ) -> bool {
        let current_user = self.state.user().cloned();
        let is_current = fetch.generation == self.fetch_generation
            && current_user.as_ref().is_some_and(|u| u.id == fetch.user_id);
        let Some(user) = current_user.filter(|_| is_current) else {
            tracing::debug!(
                generation = fetch.generation,
                latest = self.fetch_generation,
                "discarding stale profile fetch"
            );
            return false;
        };

        let next = match result {
            Ok(Some(profile)) if profile.approved => SessionState::Active { user, profile },
            Ok(profile) => SessionState::PendingApproval { user, profile },
            Err(err) => {
                tracing::warn!(error = %err, "profile fetch failed");
                let previous = self.state.profile().cloned();
                match previous {
                    Some(profile) if profile.approved => SessionState::Active { user, profile },
                    profile => SessionState::PendingApproval { user, profile },
                }
            }
        };
        self.transition(next, AuthEvent::ProfileLoaded);
        true
    }

    fn load_profile(&mut self) {
        if let Some(fetch) = self.begin_profile_fetch() {
            let result = self.profiles.fetch_profile(fetch.user_id());
            self.complete_profile_fetch(&fetch, result);
        }
    }

    fn finish_sign_in(
        &mut self,
        issued: Result<IssuedSession, AuthError>,
    ) -> Result<SessionSnapshot, AuthError> {
        match issued {
            Ok(issued) => {
                self.access_token = Some(issued.access_token);
                self.expires_at = Some(issued.expires_at);
                self.pending_redirect = issued.first_sign_in;
                self.transition(
                    SessionState::SessionRestoring { user: issued.user },
                    AuthEvent::SignedIn,
                );
                self.load_profile();
                Ok(self.snapshot())
            }
            Err(err) => {
                self.clear(AuthEvent::AuthFailed);
                Err(err)
            }
        }
    }

    fn invalidate_fetches(&mut self) {
        self.fetch_generation += 1;
    }

    fn clear(&mut self, event: AuthEvent) {
        self.invalidate_fetches();
        self.access_token = None;
        self.expires_at = None;
        self.pending_redirect = false;
        self.transition(SessionState::Unauthenticated, event);
    }

    fn transition(&mut self, next: SessionState, event: AuthEvent) {
        tracing::debug!(from = ?self.state.kind(), to = ?next.kind(), ?event, "session transition");
        self.state = next;
        let snapshot = self.snapshot();
        for (_, listener) in &self.listeners {
            listener(&event, &snapshot);
        }
    }
}
