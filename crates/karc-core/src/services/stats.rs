//! Dashboard headline numbers.

use crate::model::PortalStats;
use crate::policy::Action;
use crate::store::PortalDb;

use super::{authorize, CoreResult};

pub struct StatsService<'a> {
    db: &'a PortalDb,
}

impl<'a> StatsService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    pub fn get(&self, actor_id: &str) -> CoreResult<PortalStats> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        Ok(self.db.portal_stats()?)
    }
}

#[cfg(test)]
mod tests {
    use crate::services::tests::fixture;
    use crate::store::tests::draft;

    #[test]
    fn test_counts_follow_writes() {
        let f = fixture();
        let before = f.services.stats().get(&f.viewer).unwrap();
        assert_eq!(before.variants, 0);
        assert_eq!(before.researchers, 4);

        f.services
            .variants()
            .create(&f.admin, &draft("SYNGAP1", "c.1741C>T"))
            .unwrap();
        assert_eq!(f.services.stats().get(&f.viewer).unwrap().variants, 1);
    }
}
