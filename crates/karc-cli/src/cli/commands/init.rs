//! Implementation of `karc init` command.

use anyhow::{bail, Result};
use std::path::Path;

use crate::cli::commands::helpers::{hinted, portal_context};
use crate::output::{Formatter, OutputFormat};
use karc_core::services::AdminSeed;

/// Run the init command.
///
/// Creates the data directory and schema. With `admin`, also creates an
/// approved administrator so the portal has someone to approve applicants.
#[tracing::instrument(skip(admin, format))]
pub fn run_init(
    data_dir: Option<&Path>,
    admin: Option<AdminSeed<'_>>,
    format: OutputFormat,
) -> Result<()> {
    let report = portal_context(data_dir).init(admin.as_ref()).map_err(hinted)?;

    let formatter = Formatter::new(format);
    if formatter.is_json() {
        return formatter.print(&report);
    }

    if report.created {
        println!("Initialized karc in {}", report.data_dir);
    } else {
        println!("Already initialized: {}", report.data_dir);
    }
    if let (Some(seed), Some(id)) = (admin, &report.admin_id) {
        println!("  Administrator: {} ({id})", seed.email);
        println!("  Next: karc auth login --email {}", seed.email);
    }
    Ok(())
}

/// Pair up the `--admin-*` flags.
pub fn admin_seed<'a>(
    email: Option<&'a str>,
    password: Option<&'a str>,
    full_name: Option<&'a str>,
) -> Result<Option<AdminSeed<'a>>> {
    match (email, password) {
        (Some(email), Some(password)) => Ok(Some(AdminSeed {
            email,
            password,
            full_name,
        })),
        (None, None) => {
            if full_name.is_some() {
                bail!("--admin-name needs --admin-email and --admin-password");
            }
            Ok(None)
        }
        (Some(_), None) => bail!("--admin-email needs --admin-password"),
        (None, Some(_)) => bail!("--admin-password needs --admin-email"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karc_core::config::PortalConfig;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_store() {
        let temp = TempDir::new().unwrap();
        run_init(Some(temp.path()), None, OutputFormat::Text).unwrap();
        assert!(PortalConfig::resolve(Some(temp.path())).is_initialized());
    }

    #[test]
    fn test_init_idempotent() {
        let temp = TempDir::new().unwrap();
        run_init(Some(temp.path()), None, OutputFormat::Text).unwrap();
        run_init(Some(temp.path()), None, OutputFormat::Json).unwrap();
        assert!(PortalConfig::resolve(Some(temp.path())).is_initialized());
    }

    #[test]
    fn test_init_seeds_admin_once() {
        let temp = TempDir::new().unwrap();
        let seed = admin_seed(Some("root@example.org"), Some("s3cret-pass"), None)
            .unwrap()
            .unwrap();
        run_init(Some(temp.path()), Some(seed), OutputFormat::Text).unwrap();

        let err = run_init(Some(temp.path()), Some(seed), OutputFormat::Text).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_admin_seed_pairs_flags() {
        assert!(admin_seed(None, None, None).unwrap().is_none());
        assert!(admin_seed(Some("a@b.c"), None, None).is_err());
        assert!(admin_seed(None, Some("pw"), None).is_err());
        assert!(admin_seed(None, None, Some("Ada")).is_err());
        let seed = admin_seed(Some("a@b.c"), Some("secret"), Some("Ada"))
            .unwrap()
            .unwrap();
        assert_eq!(seed.full_name, Some("Ada"));
    }
}
