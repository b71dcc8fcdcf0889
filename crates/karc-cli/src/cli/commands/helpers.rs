//! Shared helpers for CLI commands.
//!
//! Every dashboard command restores the stored session first, then checks
//! the dashboard gate before touching any data.

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::{ConfirmArgs, ListArgs};
use crate::output::Formatter;
use karc_core::auth::{SessionFile, SessionSnapshot};
use karc_core::browse::RecordBrowser;
use karc_core::config::PortalConfig;
use karc_core::policy::{dashboard_gate, DashboardGate};
use karc_core::query::{ListParams, Listable, Page};
use karc_core::services::{AuthError, PortalContext, PortalServices};
use karc_core::{CoreError, CoreResult};

pub const PENDING_NOTICE: &str =
    "Your account is pending approval. An administrator will review it shortly.";

pub fn portal_context(data_dir: Option<&Path>) -> PortalContext {
    PortalContext::new(PortalConfig::resolve(data_dir))
}

/// Open the portal store. Fails if `karc init` has not been run.
pub fn open_services(data_dir: Option<&Path>) -> Result<PortalServices> {
    portal_context(data_dir).services().map_err(hinted)
}

pub fn session_file(data_dir: Option<&Path>) -> SessionFile {
    SessionFile::new(PortalConfig::resolve(data_dir).session_path())
}

pub fn not_signed_in_error() -> anyhow::Error {
    anyhow!("Not signed in.\n  To fix: karc auth login --email <email>")
}

/// Restore the stored session and return its snapshot.
///
/// An expired or revoked token clears the session file.
pub fn restore_session(services: &PortalServices, file: &SessionFile) -> Result<SessionSnapshot> {
    let stored = file.load()?.ok_or_else(not_signed_in_error)?;
    let mut session = services.session();
    if !session.restore(&stored.access_token).map_err(CoreError::from).map_err(hinted)? {
        file.clear()?;
        bail!(
            "Session for {} has expired.\n  To fix: karc auth login --email {}",
            stored.email,
            stored.email
        );
    }
    Ok(session.snapshot())
}

/// Gate a dashboard command.
///
/// Returns the acting user id, or `None` after printing the pending-approval
/// notice.
pub fn require_member(
    services: &PortalServices,
    data_dir: Option<&Path>,
    formatter: &Formatter,
) -> Result<Option<String>> {
    let snapshot = restore_session(services, &session_file(data_dir))?;
    match dashboard_gate(&snapshot) {
        DashboardGate::Allow => snapshot.user_id.map(Some).ok_or_else(not_signed_in_error),
        DashboardGate::RedirectToPending => {
            formatter.print_notice("pending_approval", PENDING_NOTICE)?;
            Ok(None)
        }
        DashboardGate::RedirectToLogin => Err(not_signed_in_error()),
    }
}

/// Attach a "To fix" hint to a service error.
pub fn hinted(err: CoreError) -> anyhow::Error {
    match &err {
        CoreError::PermissionDenied { action } => anyhow!(
            "{err}\n  To fix: ask an administrator for a role that allows {action} (see: karc auth whoami)"
        ),
        CoreError::PendingApproval => anyhow!("{PENDING_NOTICE}"),
        CoreError::NotFound { kind, .. } => anyhow!("{err}\n  To fix: {}", list_command(kind)),
        CoreError::NotAuthor { kind } => {
            anyhow!("{err}\n  To fix: ask its author to delete the {kind}")
        }
        CoreError::Auth(AuthError::NotSignedIn) => not_signed_in_error(),
        _ => anyhow::Error::from(err),
    }
}

fn list_command(kind: &str) -> &'static str {
    match kind {
        "variant" => "karc variants list",
        "comment" => "karc comments list <variant_id>",
        "member" | "profile" => "karc members list",
        "report" => "karc reports list",
        "announcement" => "karc announcements list",
        "blog post" => "karc blog list --all",
        _ => "karc --help",
    }
}

/// Errors that mean the caller may not see the list at all.
const fn is_access_error(err: &CoreError) -> bool {
    matches!(
        err,
        CoreError::PermissionDenied { .. } | CoreError::PendingApproval | CoreError::Auth(_)
    )
}

/// Build list parameters for `R` from command-line flags.
pub fn list_params<R: Listable>(args: &ListArgs) -> Result<ListParams> {
    let mut params = ListParams::for_listable::<R>().with_page_size(args.page_size);
    if let Some(search) = &args.search {
        params.set_search(search);
    }
    for filter in &args.filters {
        let (field, value) = filter.split_once('=').ok_or_else(|| {
            anyhow!("Invalid filter '{filter}': expected FIELD=VALUE (e.g. status=available)")
        })?;
        params.set_filter(field.trim(), Some(value.trim()));
    }
    if let Some(field) = &args.sort {
        let direction = args.direction.unwrap_or_else(|| {
            if params.sort().field == *field {
                params.sort().direction
            } else {
                karc_core::query::SortDirection::Asc
            }
        });
        params.set_sort(field, direction);
    } else if let Some(direction) = args.direction {
        let field = params.sort().field.clone();
        params.set_sort(&field, direction);
    }
    params.set_page(args.page.saturating_sub(1));
    Ok(params)
}

/// Fetch one page through a [`RecordBrowser`] and print it.
///
/// Access errors fail the command. Any other failure prints an empty page
/// with an error banner.
pub fn print_listing<R: Listable + Serialize>(
    formatter: &Formatter,
    args: &ListArgs,
    fetch: impl FnOnce(&ListParams) -> CoreResult<Page<R>>,
    empty_message: &str,
    collection_name: &str,
    advice: &[&str],
) -> Result<()> {
    let mut browser = RecordBrowser::<R>::with_params(list_params::<R>(args)?);
    let (ticket, params) = browser.begin_fetch();
    let result = match fetch(&params) {
        Err(err) if is_access_error(&err) => return Err(hinted(err)),
        other => other,
    };
    browser.complete_fetch(ticket, result);
    formatter.print_page(
        browser.page(),
        browser.error(),
        empty_message,
        collection_name,
        advice,
    )
}

/// Refuse a destructive command unless `--yes` was given.
pub fn require_confirmation(confirm: ConfirmArgs, what: &str, retry: &str) -> Result<()> {
    if !confirm.yes {
        bail!("This will permanently delete {what}.\n  To confirm: {retry} --yes");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use karc_core::auth::SignUpRequest;
    use karc_core::model::Variant;
    use karc_core::query::SortDirection;
    use karc_core::services::AdminSeed;
    use tempfile::{tempdir, TempDir};

    pub(crate) const ADMIN_EMAIL: &str = "admin@example.org";
    pub(crate) const PASSWORD: &str = "correct horse";

    /// Initialized portal with a seeded admin. Nobody is signed in.
    pub(crate) fn portal() -> TempDir {
        let dir = tempdir().unwrap();
        portal_context(Some(dir.path()))
            .init(Some(&AdminSeed {
                email: ADMIN_EMAIL,
                password: PASSWORD,
                full_name: Some("Ada Admin"),
            }))
            .unwrap();
        dir
    }

    /// Sign in and persist the session the way `karc auth login` does.
    pub(crate) fn sign_in(dir: &Path, email: &str) -> String {
        let services = open_services(Some(dir)).unwrap();
        let mut session = services.session();
        let snapshot = session.login(email, PASSWORD).unwrap();
        session_file(Some(dir))
            .save(&session.stored_session().unwrap())
            .unwrap();
        snapshot.user_id.unwrap()
    }

    pub(crate) fn sign_up(dir: &Path, email: &str) -> String {
        let services = open_services(Some(dir)).unwrap();
        let mut session = services.session();
        let snapshot = session
            .signup(&SignUpRequest {
                email,
                password: PASSWORD,
                full_name: None,
                institution: None,
            })
            .unwrap();
        session_file(Some(dir))
            .save(&session.stored_session().unwrap())
            .unwrap();
        snapshot.user_id.unwrap()
    }

    fn list_args() -> ListArgs {
        ListArgs {
            page: 1,
            page_size: 20,
            ..ListArgs::default()
        }
    }

    #[test]
    fn test_open_services_requires_init() {
        let dir = tempdir().unwrap();
        let err = open_services(Some(dir.path())).err().unwrap();
        assert!(err.to_string().contains("karc init"));
    }

    #[test]
    fn test_require_member_without_session() {
        let dir = portal();
        let services = open_services(Some(dir.path())).unwrap();
        let err = require_member(&services, Some(dir.path()), &Formatter::default()).unwrap_err();
        assert!(err.to_string().contains("karc auth login"));
    }

    #[test]
    fn test_require_member_signed_in_admin() {
        let dir = portal();
        let admin = sign_in(dir.path(), ADMIN_EMAIL);
        let services = open_services(Some(dir.path())).unwrap();
        let actor = require_member(&services, Some(dir.path()), &Formatter::default()).unwrap();
        assert_eq!(actor.as_deref(), Some(admin.as_str()));
    }

    #[test]
    fn test_require_member_pending_prints_notice() {
        let dir = portal();
        sign_up(dir.path(), "new@example.org");
        let services = open_services(Some(dir.path())).unwrap();
        let formatter = Formatter::new(OutputFormat::Json);
        assert!(require_member(&services, Some(dir.path()), &formatter)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_revoked_token_clears_session_file() {
        let dir = portal();
        sign_in(dir.path(), ADMIN_EMAIL);
        let file = session_file(Some(dir.path()));
        let stored = file.load().unwrap().unwrap();

        let services = open_services(Some(dir.path())).unwrap();
        let mut other = services.session();
        other.restore(&stored.access_token).unwrap();
        other.logout();

        let err = restore_session(&services, &file).unwrap_err();
        assert!(err.to_string().contains("expired"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_list_params_from_flags() {
        let args = ListArgs {
            search: Some(" shank ".to_string()),
            filters: vec!["status=available".to_string(), "gene = TP53".to_string()],
            sort: Some("gene".to_string()),
            page: 3,
            ..list_args()
        };
        let params = list_params::<Variant>(&args).unwrap();
        assert_eq!(params.search(), "shank");
        assert_eq!(params.filters().get("status").map(String::as_str), Some("available"));
        assert_eq!(params.filters().get("gene").map(String::as_str), Some("TP53"));
        assert_eq!(params.sort().field, "gene");
        assert_eq!(params.sort().direction, SortDirection::Asc);
        assert_eq!(params.page_index(), 2);
    }

    #[test]
    fn test_list_params_direction_alone_keeps_default_field() {
        let args = ListArgs {
            direction: Some(SortDirection::Asc),
            ..list_args()
        };
        let params = list_params::<Variant>(&args).unwrap();
        let default = ListParams::for_listable::<Variant>();
        assert_eq!(params.sort().field, default.sort().field);
        assert_eq!(params.sort().direction, SortDirection::Asc);
    }

    #[test]
    fn test_list_params_rejects_bare_filter() {
        let args = ListArgs {
            filters: vec!["available".to_string()],
            ..list_args()
        };
        let err = list_params::<Variant>(&args).unwrap_err();
        assert!(err.to_string().contains("FIELD=VALUE"));
    }

    #[test]
    fn test_unknown_filter_degrades_to_banner() {
        let dir = portal();
        let admin = sign_in(dir.path(), ADMIN_EMAIL);
        let services = open_services(Some(dir.path())).unwrap();
        let args = ListArgs {
            filters: vec!["colour=red".to_string()],
            ..list_args()
        };
        print_listing(
            &Formatter::new(OutputFormat::Json),
            &args,
            |p| services.variants().list(&admin, p),
            "No variants found.",
            "variants",
            &[],
        )
        .unwrap();
    }

    #[test]
    fn test_access_error_fails_listing() {
        let dir = portal();
        let viewer = sign_up(dir.path(), "view@example.org");
        let services = open_services(Some(dir.path())).unwrap();
        let admin = sign_in(dir.path(), ADMIN_EMAIL);
        services.members().approve(&admin, &viewer).unwrap();

        let err = print_listing(
            &Formatter::default(),
            &list_args(),
            |p| services.members().list(&viewer, p),
            "No members.",
            "members",
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("manage_members"));
        assert!(err.to_string().contains("To fix"));
    }

    #[test]
    fn test_confirmation_required() {
        let err = require_confirmation(
            ConfirmArgs { yes: false },
            "variant TP53",
            "karc variants delete var-1",
        )
        .unwrap_err();
        assert!(err.to_string().contains("--yes"));
        assert!(require_confirmation(ConfirmArgs { yes: true }, "x", "y").is_ok());
    }

    #[test]
    fn test_not_author_hint_points_at_author_only() {
        let msg = hinted(CoreError::NotAuthor { kind: "comment" }).to_string();
        assert!(msg.contains("Only the author"));
        assert!(msg.contains("ask its author to delete the comment"));
        assert!(!msg.contains("administrator"));
    }

    #[test]
    fn test_not_found_hint_names_list_command() {
        let err = hinted(CoreError::NotFound {
            kind: "variant",
            id: "var-0000".to_string(),
        });
        assert!(err.to_string().contains("karc variants list"));
    }
}
