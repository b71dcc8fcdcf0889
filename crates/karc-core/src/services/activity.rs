//! Recent-activity feed.

use crate::activity::{ActivityItem, ActivityLog};
use crate::policy::Action;
use crate::store::PortalDb;

use super::{authorize, CoreResult};

pub struct ActivityService<'a> {
    db: &'a PortalDb,
}

impl<'a> ActivityService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// Newest entries first.
    pub fn recent(&self, actor_id: &str, limit: usize) -> CoreResult<Vec<ActivityItem>> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        Ok(ActivityLog::new(self.db).recent(limit)?)
    }
}
