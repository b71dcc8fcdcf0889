//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use karc_core::config::DATA_DIR_ENV;
use karc_core::import::ImportSchema;
use karc_core::model::{Inheritance, ReportStatus, ReportType, Role, VariantStatus};
use karc_core::query::SortDirection;

use crate::telemetry::LogFormat;

pub mod commands;

/// Research consortium portal: variants, members, and discussion
#[derive(Parser, Debug)]
#[command(name = "karc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Portal data directory (default: ./.karc)
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Diagnostic log format on stderr
    #[arg(long, global = true, env = "KARC_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the portal data directory, optionally seeding an admin
    Init {
        /// Email for the first administrator
        #[arg(long, requires = "admin_password")]
        admin_email: Option<String>,

        /// Password for the first administrator
        #[arg(long, env = "KARC_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,

        /// Display name for the first administrator
        #[arg(long)]
        admin_name: Option<String>,
    },

    /// Sign up, sign in, and inspect the current session
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Manage genetic variant records
    #[command(subcommand)]
    Variants(VariantsCommands),

    /// Discuss a variant
    #[command(subcommand)]
    Comments(CommentsCommands),

    /// Approve, revoke, reject, and re-role members (admin)
    #[command(subcommand)]
    Members(MembersCommands),

    /// Browse the roster of approved researchers
    #[command(subcommand)]
    Researchers(ResearchersCommands),

    /// View or edit your own profile
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Show recent activity, newest first
    Activity {
        /// Number of entries to show
        #[arg(long, default_value_t = karc_core::config::RECENT_ACTIVITY_LIMIT)]
        limit: usize,
    },

    /// Manage analysis reports
    #[command(subcommand)]
    Reports(ReportsCommands),

    /// Manage announcements
    #[command(subcommand)]
    Announcements(AnnouncementsCommands),

    /// Manage blog posts
    #[command(subcommand)]
    Blog(BlogCommands),

    /// Show dashboard headline numbers
    Stats,
}

// ============================================================================
// Shared arguments
// ============================================================================

/// Search, filter, sort, and paging for list commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Case-insensitive search across the searchable fields
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Categorical filter as field=value (repeatable)
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Sort field
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort direction (defaults to the field's natural order)
    #[arg(long, value_enum)]
    pub direction: Option<SortDirection>,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page
    #[arg(long, default_value_t = karc_core::config::PAGE_SIZE)]
    pub page_size: usize,
}

/// Confirmation for destructive commands.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ConfirmArgs {
    /// Confirm the deletion
    #[arg(long, short = 'y')]
    pub yes: bool,
}

// ============================================================================
// Auth subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Create an account. New accounts wait for admin approval.
    Signup {
        #[arg(long)]
        email: String,

        #[arg(long, env = "KARC_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        institution: Option<String>,
    },

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "KARC_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in identity, its role, and allowed actions
    Whoami,
}

// ============================================================================
// Variants subcommands
// ============================================================================

/// Optional variant fields shared by add and edit.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantFields {
    #[arg(long)]
    pub sample_id: Option<String>,
    #[arg(long)]
    pub chromosome: Option<String>,
    #[arg(long)]
    pub position: Option<i64>,
    #[arg(long = "ref")]
    pub ref_allele: Option<String>,
    #[arg(long = "alt")]
    pub alt_allele: Option<String>,
    #[arg(long)]
    pub protein_change: Option<String>,
    #[arg(long)]
    pub consequence: Option<String>,
    #[arg(long)]
    pub transcript: Option<String>,
    #[arg(long)]
    pub rank: Option<String>,
    #[arg(long, value_enum)]
    pub inheritance: Option<Inheritance>,
    #[arg(long, value_enum)]
    pub status: Option<VariantStatus>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long = "type")]
    pub variant_type: Option<String>,
    #[arg(long)]
    pub significance: Option<String>,
    #[arg(long)]
    pub families: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub enum VariantsCommands {
    /// List variants
    List {
        #[command(flatten)]
        list: ListArgs,
    },

    /// Show one variant with its locus labels
    Show {
        id: String,
    },

    /// Add a variant
    Add {
        #[arg(long)]
        gene: String,

        #[arg(long)]
        variant: String,

        #[command(flatten)]
        fields: VariantFields,
    },

    /// Edit a variant. Only the given fields change.
    Edit {
        id: String,

        #[arg(long)]
        gene: Option<String>,

        #[arg(long)]
        variant: Option<String>,

        #[command(flatten)]
        fields: VariantFields,
    },

    /// Delete a variant and its comments
    Delete {
        id: String,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },

    /// Delete several variants at once
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },

    /// Import variants from a .csv, .tsv, or .txt file
    Import {
        file: PathBuf,

        /// Required-column set
        #[arg(long, value_enum, default_value_t = ImportSchema::Standard)]
        schema: ImportSchema,
    },
}

// ============================================================================
// Comments subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum CommentsCommands {
    /// List comments on a variant, oldest first
    List {
        variant_id: String,
    },

    /// Comment on a variant
    Add {
        variant_id: String,

        /// Comment text
        #[arg(long, short = 'm')]
        message: Option<String>,

        /// Comment text (positional alternative to --message)
        #[arg(conflicts_with = "message")]
        message_positional: Option<String>,
    },

    /// Delete one of your own comments
    Delete {
        comment_id: String,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}

// ============================================================================
// Members, researchers, profile
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum MembersCommands {
    /// List members, pending applicants first
    List {
        /// Only applicants awaiting approval
        #[arg(long)]
        pending: bool,

        #[command(flatten)]
        list: ListArgs,
    },

    /// Approve an applicant
    Approve {
        member_id: String,
    },

    /// Withdraw a member's approval
    Revoke {
        member_id: String,
    },

    /// Reject a pending applicant and remove their account
    Reject {
        member_id: String,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },

    /// Change a member's role
    Role {
        member_id: String,

        #[arg(value_enum)]
        role: Role,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResearchersCommands {
    /// List approved researchers
    List {
        #[command(flatten)]
        list: ListArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show your profile
    Show,

    /// Update your profile. Omitted fields keep their values.
    Update {
        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        institution: Option<String>,

        #[arg(long)]
        expertise: Option<String>,
    },
}

// ============================================================================
// Content subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ReportsCommands {
    List {
        #[command(flatten)]
        list: ListArgs,
    },

    Add {
        #[arg(long)]
        title: String,

        #[arg(long = "type", value_enum, default_value_t = ReportType::WgsAnalysis)]
        report_type: ReportType,

        #[arg(long, value_enum, default_value_t = ReportStatus::Draft)]
        status: ReportStatus,

        #[arg(long)]
        summary: Option<String>,

        /// Link to the attached file
        #[arg(long)]
        file_url: Option<String>,

        #[arg(long)]
        file_name: Option<String>,
    },

    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long = "type", value_enum)]
        report_type: Option<ReportType>,

        #[arg(long, value_enum)]
        status: Option<ReportStatus>,

        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        file_url: Option<String>,

        #[arg(long)]
        file_name: Option<String>,
    },

    Delete {
        id: String,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum AnnouncementsCommands {
    List {
        #[command(flatten)]
        list: ListArgs,
    },

    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        body: String,

        #[arg(long)]
        pinned: bool,
    },

    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        body: Option<String>,

        #[arg(long)]
        pinned: Option<bool>,
    },

    Delete {
        id: String,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum BlogCommands {
    /// List published posts (no sign-in needed), or all posts with --all
    List {
        /// Include drafts (authors only)
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        list: ListArgs,
    },

    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,

        #[arg(long)]
        subtitle: Option<String>,

        #[arg(long)]
        excerpt: Option<String>,

        /// Publish immediately
        #[arg(long)]
        publish: bool,
    },

    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        subtitle: Option<String>,

        #[arg(long)]
        excerpt: Option<String>,

        #[arg(long)]
        publish: Option<bool>,
    },

    Delete {
        id: String,

        #[command(flatten)]
        confirm: ConfirmArgs,
    },
}
