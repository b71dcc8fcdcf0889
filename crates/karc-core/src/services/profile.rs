//! Self-service profile view and edit.

use crate::activity::ActionTag;
use crate::model::Profile;
use crate::store::{PortalDb, ProfileUpdate};

use super::{activity_log, CoreError, CoreResult};

pub struct ProfileService<'a> {
    db: &'a PortalDb,
}

impl<'a> ProfileService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// The actor's own profile. Available while approval is pending.
    pub fn get(&self, actor_id: &str) -> CoreResult<Profile> {
        self.db
            .get_profile(actor_id)?
            .ok_or_else(|| CoreError::not_found("profile", actor_id))
    }

    /// Overwrite the actor's editable fields. Blank values are stored as
    /// absent.
    #[tracing::instrument(skip(self, update))]
    pub fn update(&self, actor_id: &str, update: &ProfileUpdate) -> CoreResult<Profile> {
        let update = ProfileUpdate {
            full_name: non_blank(update.full_name.as_deref()),
            institution: non_blank(update.institution.as_deref()),
            expertise: non_blank(update.expertise.as_deref()),
        };
        if self.db.update_profile(actor_id, &update)? == 0 {
            return Err(CoreError::not_found("profile", actor_id));
        }
        let profile = self.get(actor_id)?;
        activity_log(self.db).record(
            actor_id,
            &ActionTag::ProfileUpdated,
            &format!("Updated profile: {}", profile.display_name()),
        );
        Ok(profile)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tests::fixture;

    #[test]
    fn test_pending_member_edits_own_profile() {
        let f = fixture();
        let updated = f
            .services
            .profile()
            .update(
                &f.pending,
                &ProfileUpdate {
                    full_name: Some("  Noor Haddad ".to_string()),
                    institution: Some("Lund University".to_string()),
                    expertise: Some("   ".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Noor Haddad"));
        assert_eq!(updated.expertise, None);
        assert!(!updated.approved);

        let entry = &f.services.db().recent_activity(1).unwrap()[0];
        assert_eq!(entry.action, "profile_updated");
        assert_eq!(entry.detail, "Updated profile: Noor Haddad");
    }

    #[test]
    fn test_cleared_name_falls_back_to_email() {
        let f = fixture();
        let updated = f
            .services
            .profile()
            .update(&f.viewer, &ProfileUpdate::default())
            .unwrap();
        assert_eq!(updated.display_name(), "view@example.org");
    }

    #[test]
    fn test_unknown_profile() {
        let f = fixture();
        assert!(matches!(
            f.services.profile().get("usr-ghost"),
            Err(CoreError::NotFound { kind: "profile", .. })
        ));
    }
}
