//! Audit trail of mutating actions.
//!
//! Appends are best-effort: a failed write is logged and swallowed so it
//! never undoes the mutation it describes. Tags form a closed set, but
//! rows written by other clients may carry tags this build does not know;
//! those keep their raw tag and render with a fallback label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::COMMENT_PREVIEW_CHARS;
use crate::model::ActivityEntry;
use crate::store::{NewActivity, PortalDb};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionTag {
    VariantAdded,
    VariantUpdated,
    VariantDeleted,
    VariantsBulkDeleted,
    VariantsCsvUploaded,
    VariantComment,
    CommentDeleted,
    ReportAdded,
    ReportUpdated,
    ReportDeleted,
    AnnouncementAdded,
    AnnouncementUpdated,
    AnnouncementDeleted,
    BlogAdded,
    BlogUpdated,
    BlogDeleted,
    MemberApproved,
    MemberRevoked,
    MemberRejected,
    MemberRoleChanged,
    ProfileUpdated,
    /// A tag this build does not recognize.
    Other(String),
}

const KNOWN: [ActionTag; 21] = [
    ActionTag::VariantAdded,
    ActionTag::VariantUpdated,
    ActionTag::VariantDeleted,
    ActionTag::VariantsBulkDeleted,
    ActionTag::VariantsCsvUploaded,
    ActionTag::VariantComment,
    ActionTag::CommentDeleted,
    ActionTag::ReportAdded,
    ActionTag::ReportUpdated,
    ActionTag::ReportDeleted,
    ActionTag::AnnouncementAdded,
    ActionTag::AnnouncementUpdated,
    ActionTag::AnnouncementDeleted,
    ActionTag::BlogAdded,
    ActionTag::BlogUpdated,
    ActionTag::BlogDeleted,
    ActionTag::MemberApproved,
    ActionTag::MemberRevoked,
    ActionTag::MemberRejected,
    ActionTag::MemberRoleChanged,
    ActionTag::ProfileUpdated,
];

impl ActionTag {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::VariantAdded => "variant_added",
            Self::VariantUpdated => "variant_updated",
            Self::VariantDeleted => "variant_deleted",
            Self::VariantsBulkDeleted => "variants_bulk_deleted",
            Self::VariantsCsvUploaded => "variants_csv_uploaded",
            Self::VariantComment => "variant_comment",
            Self::CommentDeleted => "comment_deleted",
            Self::ReportAdded => "report_added",
            Self::ReportUpdated => "report_updated",
            Self::ReportDeleted => "report_deleted",
            Self::AnnouncementAdded => "announcement_added",
            Self::AnnouncementUpdated => "announcement_updated",
            Self::AnnouncementDeleted => "announcement_deleted",
            Self::BlogAdded => "blog_added",
            Self::BlogUpdated => "blog_updated",
            Self::BlogDeleted => "blog_deleted",
            Self::MemberApproved => "member_approved",
            Self::MemberRevoked => "member_revoked",
            Self::MemberRejected => "member_rejected",
            Self::MemberRoleChanged => "member_role_changed",
            Self::ProfileUpdated => "profile_updated",
            Self::Other(raw) => raw,
        }
    }

    /// Feed label. Unknown tags fall back to their raw text, or a generic
    /// label when that is empty.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::VariantAdded => "New variant added",
            Self::VariantUpdated => "Variant updated",
            Self::VariantDeleted => "Variant deleted",
            Self::VariantsBulkDeleted => "Variants deleted",
            Self::VariantsCsvUploaded => "Variants imported",
            Self::VariantComment => "Comment on variant",
            Self::CommentDeleted => "Comment deleted",
            Self::ReportAdded => "New report added",
            Self::ReportUpdated => "Report updated",
            Self::ReportDeleted => "Report deleted",
            Self::AnnouncementAdded => "New announcement",
            Self::AnnouncementUpdated => "Announcement updated",
            Self::AnnouncementDeleted => "Announcement deleted",
            Self::BlogAdded => "New blog post",
            Self::BlogUpdated => "Blog post updated",
            Self::BlogDeleted => "Blog post deleted",
            Self::MemberApproved => "Member approved",
            Self::MemberRevoked => "Member access revoked",
            Self::MemberRejected => "Applicant rejected",
            Self::MemberRoleChanged => "Member role changed",
            Self::ProfileUpdated => "Profile updated",
            Self::Other(raw) if raw.trim().is_empty() => "Activity",
            Self::Other(raw) => raw,
        }
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for ActionTag {
    fn from(raw: &str) -> Self {
        KNOWN
            .iter()
            .find(|tag| tag.as_str() == raw)
            .cloned()
            .unwrap_or_else(|| Self::Other(raw.to_string()))
    }
}

impl From<String> for ActionTag {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<ActionTag> for String {
    fn from(tag: ActionTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First `COMMENT_PREVIEW_CHARS` characters, with `...` when cut.
#[must_use]
pub fn comment_preview(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(COMMENT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Feed row ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    pub id: i64,
    pub actor_id: String,
    pub actor_name: String,
    pub action: ActionTag,
    pub label: String,
    pub detail: String,
    pub created_at: String,
}

impl From<ActivityEntry> for ActivityItem {
    fn from(entry: ActivityEntry) -> Self {
        let action = ActionTag::from(entry.action);
        Self {
            id: entry.id,
            actor_name: entry
                .actor_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Unknown member".to_string()),
            actor_id: entry.actor_id,
            label: action.label().to_string(),
            action,
            detail: entry.detail,
            created_at: entry.created_at,
        }
    }
}

/// Writer for the activity log.
pub struct ActivityLog<'a> {
    db: &'a PortalDb,
}

impl<'a> ActivityLog<'a> {
    #[must_use]
    pub const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// Append an entry. Failures are logged, never returned.
    pub fn record(&self, actor_id: &str, action: &ActionTag, detail: &str) {
        let entry = NewActivity {
            actor_id,
            action: action.as_str(),
            detail,
        };
        if let Err(err) = self.db.insert_activity(&entry) {
            tracing::warn!(error = %format!("{err:#}"), %action, "failed to record activity");
        }
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> anyhow::Result<Vec<ActivityItem>> {
        Ok(self
            .db
            .recent_activity(limit)?
            .into_iter()
            .map(ActivityItem::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::store::tests::{seed_member, test_db};

    #[test]
    fn test_known_tags_roundtrip() {
        for tag in KNOWN {
            assert_eq!(ActionTag::from(tag.as_str()), tag);
            assert!(tag.is_known());
        }
    }

    #[test]
    fn test_unknown_tag_falls_back() {
        let tag = ActionTag::from("dataset_archived");
        assert_eq!(tag, ActionTag::Other("dataset_archived".to_string()));
        assert_eq!(tag.label(), "dataset_archived");
        assert_eq!(ActionTag::from("").label(), "Activity");
    }

    #[test]
    fn test_serde_uses_raw_tag() {
        let json = serde_json::to_string(&ActionTag::VariantsCsvUploaded).unwrap();
        assert_eq!(json, "\"variants_csv_uploaded\"");
        let back: ActionTag = serde_json::from_str("\"mystery\"").unwrap();
        assert_eq!(back, ActionTag::Other("mystery".to_string()));
    }

    #[test]
    fn test_comment_preview() {
        assert_eq!(comment_preview("short"), "short");
        let exact = "x".repeat(60);
        assert_eq!(comment_preview(&exact), exact);
        let long = "y".repeat(61);
        assert_eq!(comment_preview(&long), format!("{}...", "y".repeat(60)));
        // multibyte characters count as one
        let accents = "é".repeat(70);
        assert_eq!(comment_preview(&accents).chars().count(), 63);
    }

    #[test]
    fn test_record_and_recent() {
        let db = test_db();
        let actor = seed_member(&db, "ana@example.org", Role::Admin, true);
        let log = ActivityLog::new(&db);
        log.record(&actor, &ActionTag::VariantAdded, "SHANK3 c.1234A>G");
        log.record(&actor, &ActionTag::Other("legacy_tag".to_string()), "x");

        let items = log.recent(10).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, "legacy_tag");
        assert_eq!(items[1].label, "New variant added");
        assert_eq!(items[1].actor_name, "ana");
    }

    #[test]
    fn test_record_failure_is_swallowed() {
        let db = test_db();
        db.conn().execute_batch("DROP TABLE activity_log;").unwrap();
        ActivityLog::new(&db).record("usr-1", &ActionTag::ProfileUpdated, "x");
    }

    #[test]
    fn test_missing_actor_renders_placeholder() {
        let db = test_db();
        let log = ActivityLog::new(&db);
        log.record("usr-gone", &ActionTag::MemberRejected, "bob@example.org");
        assert_eq!(log.recent(1).unwrap()[0].actor_name, "Unknown member");
    }
}
