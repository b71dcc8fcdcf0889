//! Command implementations.

#![allow(clippy::missing_errors_doc)]

pub mod activity;
pub mod auth;
pub mod comments;
pub mod content;
pub mod helpers;
pub mod init;
pub mod members;
pub mod profile;
pub mod variants;

pub use activity::{run_activity, run_stats};
pub use auth::{run_login, run_logout, run_signup, run_whoami};
pub use comments::{run_comments_add, run_comments_delete, run_comments_list};
pub use content::{run_announcements, run_blog, run_reports};
pub use init::{admin_seed, run_init};
pub use members::{
    run_members_approve, run_members_list, run_members_reject, run_members_revoke,
    run_members_role, run_researchers_list,
};
pub use profile::{run_profile_show, run_profile_update};
pub use variants::{
    run_variants_add, run_variants_bulk_delete, run_variants_delete, run_variants_edit,
    run_variants_import, run_variants_list, run_variants_show,
};
