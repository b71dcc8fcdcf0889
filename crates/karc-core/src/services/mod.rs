//! Service layer for karc-core.
//!
//! Typed per-domain APIs over the portal store. Every mutating call takes
//! the acting user's id, re-reads that user's profile from the store, and
//! checks the access policy before writing, then appends one activity
//! entry.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use karc_core::config::PortalConfig;
//! use karc_core::query::ListParams;
//! use karc_core::model::Variant;
//! use karc_core::services::PortalContext;
//!
//! let ctx = PortalContext::new(PortalConfig::resolve(Some(Path::new("/srv/karc"))));
//! let services = ctx.services().unwrap();
//! let params = ListParams::for_listable::<Variant>();
//! let page = services.variants().list("usr-0k3f9x2a", &params).unwrap();
//! ```

pub mod activity;
pub mod comments;
pub mod content;
pub mod errors;
pub mod members;
pub mod profile;
pub mod stats;
pub mod variants;

pub use errors::{AuthError, CoreError, CoreResult, ValidationError};

use std::marker::PhantomData;

use anyhow::Context;
use serde::Serialize;

use crate::activity::ActivityLog;
use crate::auth::{AuthSession, LocalIdentityProvider, SignUpRequest};
use crate::config::PortalConfig;
use crate::model::{Profile, Role};
use crate::policy::{self, Action};
use crate::store::PortalDb;

/// Context for karc-core services: where the portal's files live.
#[derive(Debug, Clone)]
pub struct PortalContext {
    config: PortalConfig,
}

/// First administrator created by `init`.
#[derive(Debug, Clone, Copy)]
pub struct AdminSeed<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub data_dir: String,
    pub created: bool,
    pub admin_id: Option<String>,
}

impl PortalContext {
    #[must_use]
    pub const fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Create the data directory and schema, optionally seeding an
    /// approved admin. Safe to re-run.
    #[tracing::instrument(skip(self, admin))]
    pub fn init(&self, admin: Option<&AdminSeed<'_>>) -> CoreResult<InitReport> {
        let created = !self.config.is_initialized();
        let db = PortalDb::open(&self.config.db_path())?;
        db.init_schema()?;

        let admin_id = match admin {
            Some(seed) => {
                let provider = LocalIdentityProvider::new(&db);
                let user = provider.register(
                    &SignUpRequest {
                        email: seed.email,
                        password: seed.password,
                        full_name: seed.full_name,
                        institution: None,
                    },
                    Role::Admin,
                )?;
                db.set_approval(&user.id, true)?;
                tracing::info!(user_id = %user.id, "seeded admin");
                Some(user.id)
            }
            None => None,
        };

        Ok(InitReport {
            data_dir: self.config.data_dir().display().to_string(),
            created,
            admin_id,
        })
    }

    /// Open the store. The portal must have been initialized.
    pub fn open(&self) -> CoreResult<PortalDb> {
        if !self.config.is_initialized() {
            return Err(CoreError::NotInitialized {
                path: self.config.data_dir().display().to_string(),
            });
        }
        let db = PortalDb::open(&self.config.db_path())?;
        db.init_schema()?;
        Ok(db)
    }

    /// Create a `PortalServices` instance backed by this context.
    pub fn services(&self) -> CoreResult<PortalServices> {
        let db = self.open()?;
        Ok(PortalServices { db })
    }
}

/// Facade providing all portal service APIs.
pub struct PortalServices {
    db: PortalDb,
}

impl PortalServices {
    /// Services over an already open store.
    #[must_use]
    pub const fn from_db(db: PortalDb) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn variants(&self) -> variants::VariantService<'_> {
        variants::VariantService::new(&self.db)
    }

    #[must_use]
    pub fn comments(&self) -> comments::CommentService<'_> {
        comments::CommentService::new(&self.db)
    }

    #[must_use]
    pub fn members(&self) -> members::MemberService<'_> {
        members::MemberService::new(&self.db)
    }

    #[must_use]
    pub fn researchers(&self) -> members::ResearcherService<'_> {
        members::ResearcherService::new(&self.db)
    }

    #[must_use]
    pub fn profile(&self) -> profile::ProfileService<'_> {
        profile::ProfileService::new(&self.db)
    }

    #[must_use]
    pub fn activity(&self) -> activity::ActivityService<'_> {
        activity::ActivityService::new(&self.db)
    }

    #[must_use]
    pub fn reports(&self) -> content::ReportService<'_> {
        content::ReportService::new(&self.db)
    }

    #[must_use]
    pub fn announcements(&self) -> content::AnnouncementService<'_> {
        content::AnnouncementService::new(&self.db)
    }

    #[must_use]
    pub fn blog(&self) -> content::BlogService<'_> {
        content::BlogService::new(&self.db)
    }

    #[must_use]
    pub fn stats(&self) -> stats::StatsService<'_> {
        stats::StatsService::new(&self.db)
    }

    #[must_use]
    pub const fn identity(&self) -> LocalIdentityProvider<'_> {
        LocalIdentityProvider::new(&self.db)
    }

    /// A fresh session over this store.
    #[must_use]
    pub fn session(&self) -> AuthSession<LocalIdentityProvider<'_>, &PortalDb> {
        AuthSession::new(self.identity(), &self.db)
    }

    /// Get a reference to the underlying store.
    #[must_use]
    pub const fn db(&self) -> &PortalDb {
        &self.db
    }
}

/// Re-read the actor's profile and check `action` against it.
///
/// Unknown actors are denied; known but unapproved actors get
/// `PendingApproval` so callers can redirect instead of erroring.
pub(crate) fn authorize(db: &PortalDb, actor_id: &str, action: Action) -> CoreResult<Profile> {
    let profile = db
        .get_profile(actor_id)
        .context("Failed to load acting profile")?
        .ok_or(CoreError::PermissionDenied { action })?;
    if !profile.approved && action != Action::ViewPublic {
        return Err(CoreError::PendingApproval);
    }
    if !policy::can(profile.role, profile.approved, action) {
        tracing::debug!(actor = %actor_id, role = %profile.role, %action, "denied");
        return Err(CoreError::PermissionDenied { action });
    }
    Ok(profile)
}

pub(crate) fn activity_log(db: &PortalDb) -> ActivityLog<'_> {
    ActivityLog::new(db)
}

/// A destructive operation that has been checked but not yet run.
///
/// Obtained from a service's `prepare_*` call and handed back to carry it
/// out. The type parameter ties it to the record kind it was prepared for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingDelete<T> {
    id: String,
    summary: String,
    #[serde(skip)]
    kind: PhantomData<fn() -> T>,
}

impl<T> PendingDelete<T> {
    pub(crate) fn new(id: &str, summary: String) -> Self {
        Self {
            id: id.to_string(),
            summary,
            kind: PhantomData,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable description of what will be removed.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

pub(crate) fn required(value: &str, field: &'static str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field }.into());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::tests::{seed_member, test_db};

    /// Services over an in-memory store plus one approved member per role.
    pub(crate) struct Fixture {
        pub services: PortalServices,
        pub admin: String,
        pub coordinator: String,
        pub researcher: String,
        pub viewer: String,
        pub pending: String,
    }

    pub(crate) fn fixture() -> Fixture {
        let db = test_db();
        let admin = seed_member(&db, "admin@example.org", Role::Admin, true);
        let coordinator = seed_member(&db, "coord@example.org", Role::Coordinator, true);
        let researcher = seed_member(&db, "res@example.org", Role::Researcher, true);
        let viewer = seed_member(&db, "view@example.org", Role::Viewer, true);
        let pending = seed_member(&db, "new@example.org", Role::Admin, false);
        Fixture {
            services: PortalServices::from_db(db),
            admin,
            coordinator,
            researcher,
            viewer,
            pending,
        }
    }

    pub(crate) fn activity_count(services: &PortalServices) -> i64 {
        services
            .db()
            .conn()
            .query_row("SELECT COUNT(*) FROM activity_log", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_authorize_unapproved_is_pending_even_for_admin_role() {
        let f = fixture();
        let err = authorize(f.services.db(), &f.pending, Action::ViewDashboard).unwrap_err();
        assert!(matches!(err, CoreError::PendingApproval));
    }

    #[test]
    fn test_authorize_unknown_actor_denied() {
        let f = fixture();
        let err = authorize(f.services.db(), "usr-ghost", Action::ViewDashboard).unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { .. }));
    }

    #[test]
    fn test_authorize_reads_current_role() {
        let f = fixture();
        assert!(authorize(f.services.db(), &f.viewer, Action::CreateRecord).is_err());
        f.services.db().set_role(&f.viewer, Role::Researcher).unwrap();
        assert!(authorize(f.services.db(), &f.viewer, Action::CreateRecord).is_ok());
    }

    #[test]
    fn test_context_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = PortalContext::new(PortalConfig::resolve_with(Some(dir.path()), None));
        assert!(matches!(ctx.services(), Err(CoreError::NotInitialized { .. })));

        let report = ctx
            .init(Some(&AdminSeed {
                email: "root@example.org",
                password: "bootstrap",
                full_name: Some("Root"),
            }))
            .unwrap();
        assert!(report.created);
        let admin_id = report.admin_id.unwrap();

        let services = ctx.services().unwrap();
        let admin = services.db().get_profile(&admin_id).unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.approved);

        let again = ctx.init(None).unwrap();
        assert!(!again.created);
    }
}
