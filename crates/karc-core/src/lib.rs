//! Domain logic for the karc research consortium portal.
//!
//! This crate owns the record store, the session state machine, the access
//! policy, list queries with search and paging, row selection, comments,
//! the activity log, and bulk import. Front ends talk to it through
//! [`services::PortalServices`].

pub mod activity;
pub mod auth;
pub mod browse;
pub mod config;
pub mod import;
pub mod model;
pub mod policy;
pub mod query;
pub mod selection;
pub mod services;
pub mod store;

pub use services::{CoreError, CoreResult};
