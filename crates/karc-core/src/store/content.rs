//! Reports, announcements, and blog posts.
//!
//! Same shape family as variants: insert, overwrite-by-id, delete-by-id,
//! plus a [`Listable`] impl each.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_column, PortalDb};
use crate::model::{
    new_announcement_id, new_blog_post_id, new_report_id, now_timestamp, Announcement,
    AnnouncementDraft, BlogPost, BlogPostDraft, Report, ReportDraft,
};
use crate::query::{Listable, SortDirection};

const REPORT_COLUMNS: &str = "r.id, r.title, r.report_type, r.status, r.summary, r.file_url, \
     r.file_name, r.author_id, p.full_name, r.created_at, r.updated_at";
const REPORT_SOURCE: &str = "reports r LEFT JOIN profiles p ON p.id = r.author_id";

const ANNOUNCEMENT_COLUMNS: &str =
    "a.id, a.title, a.body, a.pinned, a.author_id, p.full_name, a.created_at, a.updated_at";
const ANNOUNCEMENT_SOURCE: &str = "announcements a LEFT JOIN profiles p ON p.id = a.author_id";

const BLOG_COLUMNS: &str = "b.id, b.title, b.subtitle, b.content, b.excerpt, b.published, \
     b.published_at, b.author_id, p.full_name, b.created_at, b.updated_at";
const BLOG_SOURCE: &str = "blog_posts b LEFT JOIN profiles p ON p.id = b.author_id";

impl PortalDb {
    // ------------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------------

    pub fn insert_report(&self, draft: &ReportDraft, author_id: &str) -> Result<String> {
        let id = new_report_id()?;
        self.conn
            .execute(
                "INSERT INTO reports (id, title, report_type, status, summary, file_url, file_name, author_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    draft.title,
                    draft.report_type.as_str(),
                    draft.status.as_str(),
                    draft.summary,
                    draft.file_url,
                    draft.file_name,
                    author_id,
                    now_timestamp(),
                ],
            )
            .context("Failed to insert report")?;
        Ok(id)
    }

    pub fn get_report(&self, id: &str) -> Result<Option<Report>> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM {REPORT_SOURCE} WHERE r.id = ?");
        self.conn
            .query_row(&sql, params![id], Report::from_row)
            .optional()
            .context("Failed to query report")
    }

    pub fn update_report(&self, id: &str, draft: &ReportDraft) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE reports SET title = ?, report_type = ?, status = ?, summary = ?,
                    file_url = ?, file_name = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    draft.title,
                    draft.report_type.as_str(),
                    draft.status.as_str(),
                    draft.summary,
                    draft.file_url,
                    draft.file_name,
                    now_timestamp(),
                    id,
                ],
            )
            .context("Failed to update report")
    }

    pub fn delete_report(&self, id: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM reports WHERE id = ?", params![id])
            .context("Failed to delete report")
    }

    // ------------------------------------------------------------------------
    // Announcements
    // ------------------------------------------------------------------------

    pub fn insert_announcement(&self, draft: &AnnouncementDraft, author_id: &str) -> Result<String> {
        let id = new_announcement_id()?;
        self.conn
            .execute(
                "INSERT INTO announcements (id, title, body, pinned, author_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![id, draft.title, draft.body, draft.pinned, author_id, now_timestamp()],
            )
            .context("Failed to insert announcement")?;
        Ok(id)
    }

    pub fn get_announcement(&self, id: &str) -> Result<Option<Announcement>> {
        let sql = format!("SELECT {ANNOUNCEMENT_COLUMNS} FROM {ANNOUNCEMENT_SOURCE} WHERE a.id = ?");
        self.conn
            .query_row(&sql, params![id], Announcement::from_row)
            .optional()
            .context("Failed to query announcement")
    }

    pub fn update_announcement(&self, id: &str, draft: &AnnouncementDraft) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE announcements SET title = ?, body = ?, pinned = ?, updated_at = ? WHERE id = ?",
                params![draft.title, draft.body, draft.pinned, now_timestamp(), id],
            )
            .context("Failed to update announcement")
    }

    pub fn delete_announcement(&self, id: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM announcements WHERE id = ?", params![id])
            .context("Failed to delete announcement")
    }

    // ------------------------------------------------------------------------
    // Blog posts
    // ------------------------------------------------------------------------

    /// Insert a post, stamping `published_at` if it starts out published.
    pub fn insert_blog_post(&self, draft: &BlogPostDraft, author_id: &str) -> Result<String> {
        let id = new_blog_post_id()?;
        let now = now_timestamp();
        let published_at = draft.published.then(|| now.clone());
        self.conn
            .execute(
                "INSERT INTO blog_posts (id, title, subtitle, content, excerpt, published, published_at, author_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    draft.title,
                    draft.subtitle,
                    draft.content,
                    draft.excerpt,
                    draft.published,
                    published_at,
                    author_id,
                    now,
                ],
            )
            .context("Failed to insert blog post")?;
        Ok(id)
    }

    pub fn get_blog_post(&self, id: &str) -> Result<Option<BlogPost>> {
        let sql = format!("SELECT {BLOG_COLUMNS} FROM {BLOG_SOURCE} WHERE b.id = ?");
        self.conn
            .query_row(&sql, params![id], BlogPost::from_row)
            .optional()
            .context("Failed to query blog post")
    }

    /// Overwrite a post. `published_at` is kept once set and only stamped
    /// on the first publish.
    pub fn update_blog_post(&self, id: &str, draft: &BlogPostDraft) -> Result<usize> {
        let now = now_timestamp();
        self.conn
            .execute(
                "UPDATE blog_posts SET title = ?1, subtitle = ?2, content = ?3, excerpt = ?4, published = ?5,
                    published_at = CASE WHEN ?5 AND published_at IS NULL THEN ?6 ELSE published_at END,
                    updated_at = ?6
                 WHERE id = ?7",
                params![
                    draft.title,
                    draft.subtitle,
                    draft.content,
                    draft.excerpt,
                    draft.published,
                    now,
                    id,
                ],
            )
            .context("Failed to update blog post")
    }

    pub fn delete_blog_post(&self, id: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM blog_posts WHERE id = ?", params![id])
            .context("Failed to delete blog post")
    }
}

impl Listable for Report {
    const KIND: &'static str = "report";
    const SOURCE: &'static str = REPORT_SOURCE;
    const COLUMNS: &'static str = REPORT_COLUMNS;
    const SEARCH_FIELDS: &'static [&'static str] = &["r.title", "r.summary", "p.full_name"];
    const FILTER_FIELDS: &'static [(&'static str, &'static str)] =
        &[("report_type", "r.report_type"), ("status", "r.status")];
    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("title", "r.title"),
        ("report_type", "r.report_type"),
        ("status", "r.status"),
        ("created_at", "r.created_at"),
    ];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("created_at", SortDirection::Desc);
    const TIEBREAK: &'static str = "r.id ASC";

    fn row_id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            report_type: parse_column(row, 2)?,
            status: parse_column(row, 3)?,
            summary: row.get(4)?,
            file_url: row.get(5)?,
            file_name: row.get(6)?,
            author_id: row.get(7)?,
            author_name: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

/// Pinned first, then newest.
impl Listable for Announcement {
    const KIND: &'static str = "announcement";
    const SOURCE: &'static str = ANNOUNCEMENT_SOURCE;
    const COLUMNS: &'static str = ANNOUNCEMENT_COLUMNS;
    const SEARCH_FIELDS: &'static [&'static str] = &["a.title", "a.body"];
    const FILTER_FIELDS: &'static [(&'static str, &'static str)] =
        &[("pinned", "CASE WHEN a.pinned THEN 'true' ELSE 'false' END")];
    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("pinned", "a.pinned"),
        ("title", "a.title"),
        ("created_at", "a.created_at"),
    ];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("pinned", SortDirection::Desc);
    const TIEBREAK: &'static str = "a.created_at DESC, a.id ASC";

    fn row_id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            pinned: row.get(3)?,
            author_id: row.get(4)?,
            author_name: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl Listable for BlogPost {
    const KIND: &'static str = "blog post";
    const SOURCE: &'static str = BLOG_SOURCE;
    const COLUMNS: &'static str = BLOG_COLUMNS;
    const SEARCH_FIELDS: &'static [&'static str] = &["b.title", "b.subtitle", "b.excerpt"];
    const FILTER_FIELDS: &'static [(&'static str, &'static str)] =
        &[("published", "CASE WHEN b.published THEN 'true' ELSE 'false' END")];
    const SORT_FIELDS: &'static [(&'static str, &'static str)] = &[
        ("title", "b.title"),
        ("published_at", "b.published_at"),
        ("created_at", "b.created_at"),
    ];
    const DEFAULT_SORT: (&'static str, SortDirection) = ("created_at", SortDirection::Desc);
    const TIEBREAK: &'static str = "b.id ASC";

    fn row_id(&self) -> &str {
        &self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            subtitle: row.get(2)?,
            content: row.get(3)?,
            excerpt: row.get(4)?,
            published: row.get(5)?,
            published_at: row.get(6)?,
            author_id: row.get(7)?,
            author_name: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}
