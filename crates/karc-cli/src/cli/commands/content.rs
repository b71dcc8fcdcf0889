//! Implementation of `karc reports`, `karc announcements`, and `karc blog`.

use anyhow::{bail, Result};
use std::path::Path;

use crate::cli::commands::helpers::{
    hinted, open_services, print_listing, require_confirmation, require_member,
};
use crate::cli::{AnnouncementsCommands, BlogCommands, ReportsCommands};
use crate::output::{Formatter, OutputFormat};
use karc_core::model::{AnnouncementDraft, BlogPostDraft, ReportDraft};

fn merge(given: Option<String>, stored: Option<String>) -> Option<String> {
    given.or(stored)
}

fn print_deleted(formatter: &Formatter, kind: &str, id: &str, summary: &str) -> Result<()> {
    formatter.print(&serde_json::json!({
        "id": id,
        "kind": kind,
        "deleted": summary,
    }))
}

// ============================================================================
// Reports
// ============================================================================

#[tracing::instrument(skip(data_dir, command, format))]
pub fn run_reports(
    data_dir: Option<&Path>,
    command: ReportsCommands,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };
    let reports = services.reports();

    match command {
        ReportsCommands::List { list } => print_listing(
            &formatter,
            &list,
            |params| reports.list(&actor, params),
            "No reports yet.",
            "reports",
            &["karc reports list --filter status=published"],
        ),
        ReportsCommands::Add {
            title,
            report_type,
            status,
            summary,
            file_url,
            file_name,
        } => {
            let draft = ReportDraft {
                title,
                report_type,
                status,
                summary,
                file_url,
                file_name,
            };
            let report = reports.create(&actor, &draft).map_err(hinted)?;
            formatter.print(&report)
        }
        ReportsCommands::Edit {
            id,
            title,
            report_type,
            status,
            summary,
            file_url,
            file_name,
        } => {
            ensure_changes(
                &[
                    title.is_some(),
                    report_type.is_some(),
                    status.is_some(),
                    summary.is_some(),
                    file_url.is_some(),
                    file_name.is_some(),
                ],
                "karc reports edit <id> --status published",
            )?;
            let current = reports.get(&actor, &id).map_err(hinted)?;
            let draft = ReportDraft {
                title: title.unwrap_or(current.title),
                report_type: report_type.unwrap_or(current.report_type),
                status: status.unwrap_or(current.status),
                summary: merge(summary, current.summary),
                file_url: merge(file_url, current.file_url),
                file_name: merge(file_name, current.file_name),
            };
            let report = reports.update(&actor, &id, &draft).map_err(hinted)?;
            formatter.print(&report)
        }
        ReportsCommands::Delete { id, confirm } => {
            let pending = reports.prepare_delete(&actor, &id).map_err(hinted)?;
            require_confirmation(
                confirm,
                &format!("report \"{}\"", pending.summary()),
                &format!("karc reports delete {id}"),
            )?;
            let summary = pending.summary().to_string();
            reports.delete(&actor, pending).map_err(hinted)?;
            print_deleted(&formatter, "report", &id, &summary)
        }
    }
}

// ============================================================================
// Announcements
// ============================================================================

#[tracing::instrument(skip(data_dir, command, format))]
pub fn run_announcements(
    data_dir: Option<&Path>,
    command: AnnouncementsCommands,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);
    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };
    let announcements = services.announcements();

    match command {
        AnnouncementsCommands::List { list } => print_listing(
            &formatter,
            &list,
            |params| announcements.list(&actor, params),
            "No announcements.",
            "announcements",
            &["karc announcements add --title <title> --body <text>"],
        ),
        AnnouncementsCommands::Add {
            title,
            body,
            pinned,
        } => {
            let draft = AnnouncementDraft {
                title,
                body,
                pinned,
            };
            let item = announcements.create(&actor, &draft).map_err(hinted)?;
            formatter.print(&item)
        }
        AnnouncementsCommands::Edit {
            id,
            title,
            body,
            pinned,
        } => {
            ensure_changes(
                &[title.is_some(), body.is_some(), pinned.is_some()],
                "karc announcements edit <id> --pinned true",
            )?;
            let current = announcements.get(&actor, &id).map_err(hinted)?;
            let draft = AnnouncementDraft {
                title: title.unwrap_or(current.title),
                body: body.unwrap_or(current.body),
                pinned: pinned.unwrap_or(current.pinned),
            };
            let item = announcements.update(&actor, &id, &draft).map_err(hinted)?;
            formatter.print(&item)
        }
        AnnouncementsCommands::Delete { id, confirm } => {
            let pending = announcements.prepare_delete(&actor, &id).map_err(hinted)?;
            require_confirmation(
                confirm,
                &format!("announcement \"{}\"", pending.summary()),
                &format!("karc announcements delete {id}"),
            )?;
            let summary = pending.summary().to_string();
            announcements.delete(&actor, pending).map_err(hinted)?;
            print_deleted(&formatter, "announcement", &id, &summary)
        }
    }
}

// ============================================================================
// Blog
// ============================================================================

/// Published posts need no sign-in; everything else is for authors.
#[tracing::instrument(skip(data_dir, command, format))]
pub fn run_blog(data_dir: Option<&Path>, command: BlogCommands, format: OutputFormat) -> Result<()> {
    let services = open_services(data_dir)?;
    let formatter = Formatter::new(format);

    if let BlogCommands::List { all: false, list } = &command {
        return print_listing(
            &formatter,
            list,
            |params| services.blog().list_published(params),
            "No posts published yet.",
            "posts",
            &["karc blog list --all"],
        );
    }

    let Some(actor) = require_member(&services, data_dir, &formatter)? else {
        return Ok(());
    };
    let blog = services.blog();

    match command {
        BlogCommands::List { list, .. } => print_listing(
            &formatter,
            &list,
            |params| blog.list_all(&actor, params),
            "No posts yet.",
            "posts",
            &["karc blog add --title <title> --content <text>"],
        ),
        BlogCommands::Add {
            title,
            content,
            subtitle,
            excerpt,
            publish,
        } => {
            let draft = BlogPostDraft {
                title,
                subtitle,
                content,
                excerpt,
                published: publish,
            };
            let post = blog.create(&actor, &draft).map_err(hinted)?;
            formatter.print(&post)
        }
        BlogCommands::Edit {
            id,
            title,
            content,
            subtitle,
            excerpt,
            publish,
        } => {
            ensure_changes(
                &[
                    title.is_some(),
                    content.is_some(),
                    subtitle.is_some(),
                    excerpt.is_some(),
                    publish.is_some(),
                ],
                "karc blog edit <id> --publish true",
            )?;
            let current = blog.get(&actor, &id).map_err(hinted)?;
            let draft = BlogPostDraft {
                title: title.unwrap_or(current.title),
                subtitle: merge(subtitle, current.subtitle),
                content: content.unwrap_or(current.content),
                excerpt: merge(excerpt, current.excerpt),
                published: publish.unwrap_or(current.published),
            };
            let post = blog.update(&actor, &id, &draft).map_err(hinted)?;
            formatter.print(&post)
        }
        BlogCommands::Delete { id, confirm } => {
            let pending = blog.prepare_delete(&actor, &id).map_err(hinted)?;
            require_confirmation(
                confirm,
                &format!("blog post \"{}\"", pending.summary()),
                &format!("karc blog delete {id}"),
            )?;
            let summary = pending.summary().to_string();
            blog.delete(&actor, pending).map_err(hinted)?;
            print_deleted(&formatter, "blog post", &id, &summary)
        }
    }
}

/// Reject `edit` invocations that change nothing.
fn ensure_changes(given: &[bool], retry: &str) -> Result<()> {
    if !given.contains(&true) {
        bail!("Nothing to change.\n  To fix: {retry}");
    }
    Ok(())
}
