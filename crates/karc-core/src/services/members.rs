//! Member administration and the researchers roster.

use crate::activity::ActionTag;
use crate::model::{Profile, Researcher, Role};
use crate::policy::Action;
use crate::query::{self, ListParams, Page};
use crate::store::PortalDb;

use super::{activity_log, authorize, CoreError, CoreResult, PendingDelete, ValidationError};

/// Approve, revoke, reject, and re-role members.
pub struct MemberService<'a> {
    db: &'a PortalDb,
}

impl<'a> MemberService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// Every profile, pending applicants first by default.
    pub fn list(&self, actor_id: &str, params: &ListParams) -> CoreResult<Page<Profile>> {
        authorize(self.db, actor_id, Action::ManageMembers)?;
        query::query_page::<Profile>(self.db, params)
    }

    #[tracing::instrument(skip(self))]
    pub fn approve(&self, actor_id: &str, member_id: &str) -> CoreResult<Profile> {
        authorize(self.db, actor_id, Action::ManageMembers)?;
        let member = self.load(member_id)?;
        self.db.set_approval(member_id, true)?;
        activity_log(self.db).record(actor_id, &ActionTag::MemberApproved, member.display_name());
        self.load(member_id)
    }

    /// Withdraw approval. The account stays and can be approved again.
    #[tracing::instrument(skip(self))]
    pub fn revoke(&self, actor_id: &str, member_id: &str) -> CoreResult<Profile> {
        authorize(self.db, actor_id, Action::ManageMembers)?;
        not_self(actor_id, member_id, "revoke your own access")?;
        let member = self.load(member_id)?;
        self.db.set_approval(member_id, false)?;
        activity_log(self.db).record(actor_id, &ActionTag::MemberRevoked, member.display_name());
        self.load(member_id)
    }

    /// Check a rejection. Only applicants still awaiting approval can be
    /// rejected.
    pub fn prepare_reject(&self, actor_id: &str, member_id: &str) -> CoreResult<PendingDelete<Profile>> {
        authorize(self.db, actor_id, Action::ManageMembers)?;
        not_self(actor_id, member_id, "reject your own account")?;
        let member = self.load(member_id)?;
        if member.approved {
            return Err(ValidationError::Invalid {
                field: "member".to_string(),
                message: "only pending applicants can be rejected; revoke approved members instead"
                    .to_string(),
            }
            .into());
        }
        Ok(PendingDelete::new(
            &member.id,
            format!("{} <{}>", member.display_name(), member.email),
        ))
    }

    /// Remove a rejected applicant's identity and profile.
    #[tracing::instrument(skip(self, pending), fields(id = %pending.id()))]
    pub fn reject(&self, actor_id: &str, pending: PendingDelete<Profile>) -> CoreResult<()> {
        authorize(self.db, actor_id, Action::ManageMembers)?;
        if self.db.delete_identity(pending.id())? == 0 {
            return Err(CoreError::not_found("member", pending.id()));
        }
        activity_log(self.db).record(actor_id, &ActionTag::MemberRejected, pending.summary());
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn set_role(&self, actor_id: &str, member_id: &str, role: Role) -> CoreResult<Profile> {
        authorize(self.db, actor_id, Action::ChangeMemberRole)?;
        not_self(actor_id, member_id, "change your own role")?;
        let member = self.load(member_id)?;
        if member.role == role {
            return Ok(member);
        }
        self.db.set_role(member_id, role)?;
        activity_log(self.db).record(
            actor_id,
            &ActionTag::MemberRoleChanged,
            &format!("{}: {} -> {}", member.display_name(), member.role, role),
        );
        self.load(member_id)
    }

    fn load(&self, member_id: &str) -> CoreResult<Profile> {
        self.db
            .get_profile(member_id)?
            .ok_or_else(|| CoreError::not_found("member", member_id))
    }
}

fn not_self(actor_id: &str, member_id: &str, what: &str) -> CoreResult<()> {
    if actor_id == member_id {
        return Err(ValidationError::Invalid {
            field: "member".to_string(),
            message: format!("you cannot {what}"),
        }
        .into());
    }
    Ok(())
}

/// Read-only roster of approved members.
pub struct ResearcherService<'a> {
    db: &'a PortalDb,
}

impl<'a> ResearcherService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    pub fn list(&self, actor_id: &str, params: &ListParams) -> CoreResult<Page<Researcher>> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        query::query_page::<Researcher>(self.db, params)
    }
}
