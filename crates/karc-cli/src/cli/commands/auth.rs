//! Implementation of `karc auth` subcommands.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::{
    hinted, open_services, restore_session, session_file, PENDING_NOTICE,
};
use crate::output::{Formatter, OutputFormat};
use karc_core::auth::{
    AuthSession, IdentityProvider, ProfileSource, SessionSnapshot, SessionStateKind, SignUpRequest,
};
use karc_core::policy::allowed_actions;
use karc_core::CoreError;

/// Persist a fresh sign-in and print where the member stands.
fn finish<P: IdentityProvider, S: ProfileSource>(
    data_dir: Option<&Path>,
    session: &mut AuthSession<P, S>,
    snapshot: &SessionSnapshot,
    format: OutputFormat,
) -> Result<()> {
    if let Some(stored) = session.stored_session() {
        session_file(data_dir).save(&stored)?;
    }
    let first_sign_in = session.take_pending_redirect();
    let pending = snapshot.state == SessionStateKind::PendingApproval;

    let formatter = Formatter::new(format);
    if formatter.is_json() {
        return formatter.print(&serde_json::json!({
            "status": if pending { "pending_approval" } else { "signed_in" },
            "session": snapshot,
            "first_sign_in": first_sign_in,
        }));
    }

    println!(
        "Signed in as {} ({})",
        snapshot.display_name.as_deref().unwrap_or("unknown"),
        snapshot.email.as_deref().unwrap_or_default()
    );
    if pending {
        println!("{PENDING_NOTICE}");
    } else {
        println!("  Role: {}", snapshot.role);
    }
    if first_sign_in {
        println!("  Next: karc profile update --full-name <name> --institution <institution>");
    }
    Ok(())
}

/// Create an account and sign in. The account waits for approval.
#[tracing::instrument(skip(data_dir, password, format))]
pub fn run_signup(
    data_dir: Option<&Path>,
    email: &str,
    password: &str,
    full_name: Option<&str>,
    institution: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let mut session = services.session();
    let snapshot = session
        .signup(&SignUpRequest {
            email,
            password,
            full_name,
            institution,
        })
        .map_err(CoreError::from)
        .map_err(hinted)?;
    finish(data_dir, &mut session, &snapshot, format)
}

#[tracing::instrument(skip(data_dir, password, format))]
pub fn run_login(
    data_dir: Option<&Path>,
    email: &str,
    password: &str,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let mut session = services.session();
    let snapshot = session
        .login(email, password)
        .map_err(CoreError::from)
        .map_err(hinted)?;
    finish(data_dir, &mut session, &snapshot, format)
}

/// Revoke the stored token and forget it. Succeeds when already signed out.
pub fn run_logout(data_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
    let file = session_file(data_dir);
    if let Some(stored) = file.load()? {
        let services = open_services(data_dir)?;
        let mut session = services.session();
        match session.restore(&stored.access_token) {
            Ok(_) => session.logout(),
            Err(err) => tracing::warn!(error = %err, "could not revoke stored token"),
        }
    }
    file.clear()?;

    let formatter = Formatter::new(format);
    formatter.print_notice("signed_out", "Signed out.")
}

/// Show the signed-in identity and what it may do.
pub fn run_whoami(data_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
    let services = open_services(data_dir)?;
    let snapshot = restore_session(&services, &session_file(data_dir))?;
    let actions = allowed_actions(snapshot.role, snapshot.approved);

    let formatter = Formatter::new(format);
    formatter.print(&serde_json::json!({
        "user_id": snapshot.user_id,
        "email": snapshot.email,
        "name": snapshot.display_name,
        "role": snapshot.role,
        "approved": snapshot.approved,
        "state": snapshot.state,
        "actions": actions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::helpers::tests::{portal, ADMIN_EMAIL, PASSWORD};

    #[test]
    fn test_login_saves_session() {
        let dir = portal();
        run_login(Some(dir.path()), ADMIN_EMAIL, PASSWORD, OutputFormat::Json).unwrap();
        let stored = session_file(Some(dir.path())).load().unwrap().unwrap();
        assert_eq!(stored.email, ADMIN_EMAIL);
        run_whoami(Some(dir.path()), OutputFormat::Text).unwrap();
    }

    #[test]
    fn test_bad_password_saves_nothing() {
        let dir = portal();
        let err = run_login(Some(dir.path()), ADMIN_EMAIL, "wrong-password", OutputFormat::Text)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid email or password"));
        assert!(session_file(Some(dir.path())).load().unwrap().is_none());
    }

    #[test]
    fn test_signup_then_whoami_while_pending() {
        let dir = portal();
        run_signup(
            Some(dir.path()),
            "new@example.org",
            PASSWORD,
            Some("Nia New"),
            Some("Lab 7"),
            OutputFormat::Text,
        )
        .unwrap();
        run_whoami(Some(dir.path()), OutputFormat::Json).unwrap();
    }

    #[test]
    fn test_signup_duplicate_email() {
        let dir = portal();
        let err = run_signup(Some(dir.path()), ADMIN_EMAIL, PASSWORD, None, None, OutputFormat::Text)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_logout_revokes_and_is_idempotent() {
        let dir = portal();
        run_login(Some(dir.path()), ADMIN_EMAIL, PASSWORD, OutputFormat::Text).unwrap();
        let token = session_file(Some(dir.path()))
            .load()
            .unwrap()
            .unwrap()
            .access_token;

        run_logout(Some(dir.path()), OutputFormat::Text).unwrap();
        run_logout(Some(dir.path()), OutputFormat::Text).unwrap();

        assert!(session_file(Some(dir.path())).load().unwrap().is_none());
        let services = open_services(Some(dir.path())).unwrap();
        assert!(!services.session().restore(&token).unwrap());
    }

    #[test]
    fn test_whoami_requires_login() {
        let dir = portal();
        let err = run_whoami(Some(dir.path()), OutputFormat::Text).unwrap_err();
        assert!(err.to_string().contains("Not signed in"));
    }
}
