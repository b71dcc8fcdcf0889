//! Implementation of `karc activity` and `karc stats`.

use anyhow::Result;
use std::path::Path;

use crate::cli::commands::helpers::{hinted, open_services, require_member};
use crate::output::{Formatter, OutputFormat};

/// Recent activity, newest first.
pub fn run_activity(data_dir: Option<&Path>, limit: usize, format: OutputFormat) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let items = services
        .activity()
        .recent(&actor, limit)
        .map_err(hinted)?;
    formatter.print_list(
        &items,
        "No activity yet.",
        "activity",
        &["karc activity --limit 50"],
    )
}

/// Dashboard headline numbers.
pub fn run_stats(data_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };

    let stats = services.stats().get(&actor).map_err(hinted)?;
    formatter.print(&stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::helpers::tests::{portal, sign_in, sign_up, ADMIN_EMAIL};
    use karc_core::activity::ActionTag;

    #[test]
    fn test_activity_after_approval() {
        let dir = portal();
        let applicant = sign_up(dir.path(), "new@example.org");
        let admin = sign_in(dir.path(), ADMIN_EMAIL);
        let services = open_services(Some(dir.path())).unwrap();
        services.members().approve(&admin, &applicant).unwrap();

        run_activity(Some(dir.path()), 5, OutputFormat::Text).unwrap();
        let feed = services.activity().recent(&admin, 5).unwrap();
        assert_eq!(feed[0].action, ActionTag::MemberApproved);
    }

    #[test]
    fn test_stats_and_pending_gate() {
        let dir = portal();
        sign_in(dir.path(), ADMIN_EMAIL);
        run_stats(Some(dir.path()), OutputFormat::Json).unwrap();

        sign_up(dir.path(), "new@example.org");
        run_stats(Some(dir.path()), OutputFormat::Text).unwrap();
        run_activity(Some(dir.path()), 10, OutputFormat::Json).unwrap();
    }
}
