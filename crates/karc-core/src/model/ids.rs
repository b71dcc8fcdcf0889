//! ID generation for portal records.
//!
//! Uses short, prefixed slugs: usr-xxxxxxxx, var-xxxxxxxx, cmt-xxxxxxxx

use anyhow::{Context, Result};

const USER_PREFIX: &str = "usr";
const VARIANT_PREFIX: &str = "var";
const COMMENT_PREFIX: &str = "cmt";
const REPORT_PREFIX: &str = "rpt";
const ANNOUNCEMENT_PREFIX: &str = "ann";
const BLOG_POST_PREFIX: &str = "post";

/// Length of the random suffix (in base36 chars)
const SUFFIX_LEN: usize = 8;

/// Raw bytes in an access token.
const TOKEN_BYTES: usize = 32;

fn base36_suffix(len: usize) -> Result<String> {
    const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes).context("Failed to read system randomness")?;
    let mut n = u64::from_le_bytes(bytes);

    let mut result = String::with_capacity(len);
    while result.len() < len {
        result.push(char::from(CHARS[usize::try_from(n % 36).unwrap_or(0)]));
        n /= 36;
    }
    Ok(result)
}

fn prefixed(prefix: &str) -> Result<String> {
    Ok(format!("{prefix}-{}", base36_suffix(SUFFIX_LEN)?))
}

/// Generate a new user ID (e.g., "usr-0k3f9x2a")
pub fn new_user_id() -> Result<String> {
    prefixed(USER_PREFIX)
}

pub fn new_variant_id() -> Result<String> {
    prefixed(VARIANT_PREFIX)
}

pub fn new_comment_id() -> Result<String> {
    prefixed(COMMENT_PREFIX)
}

pub fn new_report_id() -> Result<String> {
    prefixed(REPORT_PREFIX)
}

pub fn new_announcement_id() -> Result<String> {
    prefixed(ANNOUNCEMENT_PREFIX)
}

pub fn new_blog_post_id() -> Result<String> {
    prefixed(BLOG_POST_PREFIX)
}

/// Generate an opaque access token: 32 random bytes, lowercase hex.
pub fn new_session_token() -> Result<String> {
    use std::fmt::Write;

    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::fill(&mut bytes).context("Failed to read system randomness")?;
    let mut token = String::with_capacity(TOKEN_BYTES * 2);
    for b in bytes {
        let _ = write!(token, "{b:02x}");
    }
    Ok(token)
}
