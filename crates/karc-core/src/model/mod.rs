//! Record types shared by the store, the services, and the CLI.
//!
//! Enumerations serialize with the exact `snake_case` names the portal's
//! tables use, so rows written by other clients stay readable.

pub mod ids;
pub mod variant;

pub use ids::{
    new_announcement_id, new_blog_post_id, new_comment_id, new_report_id, new_session_token,
    new_user_id, new_variant_id,
};
pub use variant::{genomic_position_label, variant_locus_id};

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current time as stored in every timestamp column.
///
/// Fixed microsecond precision with a `Z` suffix keeps lexical and
/// chronological order identical.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Error returned when a wire name does not match any variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

// ============================================================================
// Roles
// ============================================================================

/// Authorization level of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Public,
    Viewer,
    Researcher,
    Coordinator,
    Admin,
}

impl Role {
    pub const ALL: [Self; 5] = [
        Self::Public,
        Self::Viewer,
        Self::Researcher,
        Self::Coordinator,
        Self::Admin,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Viewer => "viewer",
            Self::Researcher => "researcher",
            Self::Coordinator => "coordinator",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "role",
                value: s.to_string(),
                expected: "admin, researcher, coordinator, viewer, public",
            })
    }
}

// ============================================================================
// Variant enumerations
// ============================================================================

/// Workflow status of a variant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum VariantStatus {
    #[default]
    Available,
    Requested,
    #[cfg_attr(feature = "clap", value(name = "in_progress"))]
    InProgress,
    Completed,
}

impl VariantStatus {
    pub const ALL: [Self; 4] = [
        Self::Available,
        Self::Requested,
        Self::InProgress,
        Self::Completed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Requested => "requested",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for VariantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "variant status",
                value: s.to_string(),
                expected: "available, requested, in_progress, completed",
            })
    }
}

/// Mode of inheritance for a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Inheritance {
    #[cfg_attr(feature = "clap", value(name = "de_novo"))]
    DeNovo,
    Inherited,
    Unknown,
}

impl Inheritance {
    pub const ALL: [Self; 3] = [Self::DeNovo, Self::Inherited, Self::Unknown];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeNovo => "de_novo",
            Self::Inherited => "inherited",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Inheritance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Inheritance {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|inheritance| inheritance.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "inheritance",
                value: s.to_string(),
                expected: "de_novo, inherited, unknown",
            })
    }
}

// ============================================================================
// Report enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    #[cfg_attr(feature = "clap", value(name = "wgs_analysis"))]
    WgsAnalysis,
    #[cfg_attr(feature = "clap", value(name = "wes_analysis"))]
    WesAnalysis,
    #[cfg_attr(feature = "clap", value(name = "clinical_summary"))]
    ClinicalSummary,
    Statistical,
    Functional,
}

impl ReportType {
    pub const ALL: [Self; 5] = [
        Self::WgsAnalysis,
        Self::WesAnalysis,
        Self::ClinicalSummary,
        Self::Statistical,
        Self::Functional,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WgsAnalysis => "wgs_analysis",
            Self::WesAnalysis => "wes_analysis",
            Self::ClinicalSummary => "clinical_summary",
            Self::Statistical => "statistical",
            Self::Functional => "functional",
        }
    }
}

impl FromStr for ReportType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "report type",
                value: s.to_string(),
                expected: "wgs_analysis, wes_analysis, clinical_summary, statistical, functional",
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Draft,
    #[cfg_attr(feature = "clap", value(name = "in_review"))]
    InReview,
    Published,
}

impl ReportStatus {
    pub const ALL: [Self; 3] = [Self::Draft, Self::InReview, Self::Published];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InReview => "in_review",
            Self::Published => "published",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "report status",
                value: s.to_string(),
                expected: "draft, in_review, published",
            })
    }
}

// ============================================================================
// Records
// ============================================================================

/// Profile row for an identity.
///
/// `role` and `approved` are independent: an unapproved profile gets no
/// role-derived permissions whatever `role` says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub institution: Option<String>,
    pub expertise: Option<String>,
    pub role: Role,
    pub approved: bool,
    pub approved_at: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Profile {
    /// Name to show next to activity and comments.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Genetic-variant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub gene: String,
    pub variant: String,
    pub sample_id: Option<String>,
    pub chromosome: Option<String>,
    pub position: Option<i64>,
    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    pub protein_change: Option<String>,
    pub consequence: Option<String>,
    pub transcript: Option<String>,
    pub rank: Option<String>,
    pub inheritance: Option<Inheritance>,
    pub status: VariantStatus,
    pub notes: Option<String>,
    /// Legacy import column.
    pub variant_type: Option<String>,
    /// Legacy import column.
    pub significance: Option<String>,
    pub families: Option<i64>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub comment_count: i64,
}

/// Writable fields of a variant, used for create, edit, and import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDraft {
    pub gene: String,
    pub variant: String,
    pub sample_id: Option<String>,
    pub chromosome: Option<String>,
    pub position: Option<i64>,
    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    pub protein_change: Option<String>,
    pub consequence: Option<String>,
    pub transcript: Option<String>,
    pub rank: Option<String>,
    pub inheritance: Option<Inheritance>,
    pub status: VariantStatus,
    pub notes: Option<String>,
    pub variant_type: Option<String>,
    pub significance: Option<String>,
    pub families: Option<i64>,
}

impl From<&Variant> for VariantDraft {
    fn from(v: &Variant) -> Self {
        Self {
            gene: v.gene.clone(),
            variant: v.variant.clone(),
            sample_id: v.sample_id.clone(),
            chromosome: v.chromosome.clone(),
            position: v.position,
            ref_allele: v.ref_allele.clone(),
            alt_allele: v.alt_allele.clone(),
            protein_change: v.protein_change.clone(),
            consequence: v.consequence.clone(),
            transcript: v.transcript.clone(),
            rank: v.rank.clone(),
            inheritance: v.inheritance,
            status: v.status,
            notes: v.notes.clone(),
            variant_type: v.variant_type.clone(),
            significance: v.significance.clone(),
            families: v.families,
        }
    }
}

/// A comment on a variant, joined with its author's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub variant_id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub body: String,
    pub created_at: String,
}

/// One activity log row, joined with the actor's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: i64,
    pub actor_id: String,
    pub actor_name: Option<String>,
    pub action: String,
    pub detail: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub summary: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub title: String,
    pub report_type: ReportType,
    pub status: ReportStatus,
    pub summary: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub body: String,
    pub pinned: bool,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementDraft {
    pub title: String,
    pub body: String,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub published: bool,
    pub published_at: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPostDraft {
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub published: bool,
}

/// Roster entry for an approved member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Researcher {
    pub id: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub institution: Option<String>,
    pub expertise: Option<String>,
}

/// Dashboard headline numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalStats {
    pub variants: i64,
    pub researchers: i64,
    pub reports: i64,
    pub families: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Coordinator).unwrap(), "\"coordinator\"");
    }

    #[test]
    fn test_variant_status_wire_names() {
        assert_eq!(VariantStatus::InProgress.as_str(), "in_progress");
        assert_eq!(
            serde_json::to_string(&VariantStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!("completed".parse::<VariantStatus>().unwrap(), VariantStatus::Completed);
        assert_eq!(VariantStatus::default(), VariantStatus::Available);
    }

    #[test]
    fn test_inheritance_wire_names() {
        assert_eq!(serde_json::to_string(&Inheritance::DeNovo).unwrap(), "\"de_novo\"");
        assert_eq!("inherited".parse::<Inheritance>().unwrap(), Inheritance::Inherited);
        let err = "maternal".parse::<Inheritance>().unwrap_err();
        assert!(err.to_string().contains("maternal"));
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let a = now_timestamp();
        let b = now_timestamp();
        assert!(a <= b);
        assert!(a.ends_with('Z'));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut profile = Profile {
            id: "usr-1".to_string(),
            email: "kim@example.org".to_string(),
            full_name: None,
            institution: None,
            expertise: None,
            role: Role::Viewer,
            approved: false,
            approved_at: None,
            created_at: now_timestamp(),
            updated_at: None,
        };
        assert_eq!(profile.display_name(), "kim@example.org");
        profile.full_name = Some("Kim Jiwoo".to_string());
        assert_eq!(profile.display_name(), "Kim Jiwoo");
    }
}
