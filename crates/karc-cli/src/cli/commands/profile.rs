//! Implementation of `karc profile` subcommands.
//!
//! Unlike dashboard commands these work while approval is pending, so an
//! applicant can fill in their details before review.

use anyhow::{bail, Result};
use std::path::Path;

use crate::cli::commands::helpers::{
    hinted, not_signed_in_error, open_services, restore_session, session_file,
};
use crate::output::{Formatter, OutputFormat};
use karc_core::services::PortalServices;
use karc_core::store::ProfileUpdate;

fn signed_in_user(data_dir: Option<&Path>, services: &PortalServices) -> Result<String> {
    restore_session(services, &session_file(data_dir))?
        .user_id
        .ok_or_else(not_signed_in_error)
}

pub fn run_profile_show(data_dir: Option<&Path>, format: OutputFormat) -> Result<()> {
    let services = open_services(data_dir)?;
    let user = signed_in_user(data_dir, &services)?;
    let profile = services.profile().get(&user).map_err(hinted)?;
    Formatter::new(format).print(&profile)
}

/// Change the given fields. An empty value clears a field.
#[tracing::instrument(skip(data_dir, format))]
pub fn run_profile_update(
    data_dir: Option<&Path>,
    full_name: Option<&str>,
    institution: Option<&str>,
    expertise: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    if full_name.is_none() && institution.is_none() && expertise.is_none() {
        bail!("Nothing to change.\n  To fix: karc profile update --full-name <name>");
    }

    let services = open_services(data_dir)?;
    let user = signed_in_user(data_dir, &services)?;
    let current = services.profile().get(&user).map_err(hinted)?;

    let pick = |given: Option<&str>, stored: Option<String>| given.map(str::to_string).or(stored);
    let update = ProfileUpdate {
        full_name: pick(full_name, current.full_name),
        institution: pick(institution, current.institution),
        expertise: pick(expertise, current.expertise),
    };
    let profile = services.profile().update(&user, &update).map_err(hinted)?;
    Formatter::new(format).print(&profile)
}
