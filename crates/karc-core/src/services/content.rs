//! Reports, announcements, and blog posts.

use crate::activity::ActionTag;
use crate::model::{
    Announcement, AnnouncementDraft, BlogPost, BlogPostDraft, Report, ReportDraft,
};
use crate::policy::Action;
use crate::query::{self, ListParams, Page};
use crate::store::PortalDb;

use super::{activity_log, authorize, required, CoreError, CoreResult, PendingDelete};

// ============================================================================
// Reports
// ============================================================================

pub struct ReportService<'a> {
    db: &'a PortalDb,
}

impl<'a> ReportService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    pub fn list(&self, actor_id: &str, params: &ListParams) -> CoreResult<Page<Report>> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        query::query_page::<Report>(self.db, params)
    }

    pub fn get(&self, actor_id: &str, id: &str) -> CoreResult<Report> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        self.load(id)
    }

    #[tracing::instrument(skip(self, draft))]
    pub fn create(&self, actor_id: &str, draft: &ReportDraft) -> CoreResult<Report> {
        authorize(self.db, actor_id, Action::CreateRecord)?;
        required(&draft.title, "title")?;
        let id = self.db.insert_report(draft, actor_id)?;
        activity_log(self.db).record(actor_id, &ActionTag::ReportAdded, &draft.title);
        self.load(&id)
    }

    #[tracing::instrument(skip(self, draft))]
    pub fn update(&self, actor_id: &str, id: &str, draft: &ReportDraft) -> CoreResult<Report> {
        authorize(self.db, actor_id, Action::EditRecord)?;
        required(&draft.title, "title")?;
        if self.db.update_report(id, draft)? == 0 {
            return Err(CoreError::not_found("report", id));
        }
        activity_log(self.db).record(actor_id, &ActionTag::ReportUpdated, &draft.title);
        self.load(id)
    }

    pub fn prepare_delete(&self, actor_id: &str, id: &str) -> CoreResult<PendingDelete<Report>> {
        authorize(self.db, actor_id, Action::DeleteRecord)?;
        let report = self.load(id)?;
        Ok(PendingDelete::new(&report.id, report.title))
    }

    pub fn delete(&self, actor_id: &str, pending: PendingDelete<Report>) -> CoreResult<()> {
        authorize(self.db, actor_id, Action::DeleteRecord)?;
        if self.db.delete_report(pending.id())? == 0 {
            return Err(CoreError::not_found("report", pending.id()));
        }
        activity_log(self.db).record(actor_id, &ActionTag::ReportDeleted, pending.summary());
        Ok(())
    }

    fn load(&self, id: &str) -> CoreResult<Report> {
        self.db
            .get_report(id)?
            .ok_or_else(|| CoreError::not_found("report", id))
    }
}

// ============================================================================
// Announcements
// ============================================================================

pub struct AnnouncementService<'a> {
    db: &'a PortalDb,
}

impl<'a> AnnouncementService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// Pinned first, then newest.
    pub fn list(&self, actor_id: &str, params: &ListParams) -> CoreResult<Page<Announcement>> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        query::query_page::<Announcement>(self.db, params)
    }

    pub fn get(&self, actor_id: &str, id: &str) -> CoreResult<Announcement> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        self.load(id)
    }

    #[tracing::instrument(skip(self, draft))]
    pub fn create(&self, actor_id: &str, draft: &AnnouncementDraft) -> CoreResult<Announcement> {
        authorize(self.db, actor_id, Action::CreateRecord)?;
        validate_announcement(draft)?;
        let id = self.db.insert_announcement(draft, actor_id)?;
        activity_log(self.db).record(actor_id, &ActionTag::AnnouncementAdded, &draft.title);
        self.load(&id)
    }

    #[tracing::instrument(skip(self, draft))]
    pub fn update(
        &self,
        actor_id: &str,
        id: &str,
        draft: &AnnouncementDraft,
    ) -> CoreResult<Announcement> {
        authorize(self.db, actor_id, Action::EditRecord)?;
        validate_announcement(draft)?;
        if self.db.update_announcement(id, draft)? == 0 {
            return Err(CoreError::not_found("announcement", id));
        }
        activity_log(self.db).record(actor_id, &ActionTag::AnnouncementUpdated, &draft.title);
        self.load(id)
    }

    pub fn prepare_delete(
        &self,
        actor_id: &str,
        id: &str,
    ) -> CoreResult<PendingDelete<Announcement>> {
        authorize(self.db, actor_id, Action::DeleteRecord)?;
        let item = self.load(id)?;
        Ok(PendingDelete::new(&item.id, item.title))
    }

    pub fn delete(&self, actor_id: &str, pending: PendingDelete<Announcement>) -> CoreResult<()> {
        authorize(self.db, actor_id, Action::DeleteRecord)?;
        if self.db.delete_announcement(pending.id())? == 0 {
            return Err(CoreError::not_found("announcement", pending.id()));
        }
        activity_log(self.db).record(actor_id, &ActionTag::AnnouncementDeleted, pending.summary());
        Ok(())
    }

    fn load(&self, id: &str) -> CoreResult<Announcement> {
        self.db
            .get_announcement(id)?
            .ok_or_else(|| CoreError::not_found("announcement", id))
    }
}

fn validate_announcement(draft: &AnnouncementDraft) -> CoreResult<()> {
    required(&draft.title, "title")?;
    required(&draft.body, "body")
}

// ============================================================================
// Blog
// ============================================================================

pub struct BlogService<'a> {
    db: &'a PortalDb,
}

impl<'a> BlogService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// Published posts, for the public site. Needs no sign-in.
    pub fn list_published(&self, params: &ListParams) -> CoreResult<Page<BlogPost>> {
        let mut params = params.clone();
        params.set_filter("published", Some("true"));
        query::query_page::<BlogPost>(self.db, &params)
    }

    /// A published post by id. Drafts read as missing.
    pub fn get_published(&self, id: &str) -> CoreResult<BlogPost> {
        self.db
            .get_blog_post(id)?
            .filter(|post| post.published)
            .ok_or_else(|| CoreError::not_found("blog post", id))
    }

    /// Drafts and published posts, for authors.
    pub fn list_all(&self, actor_id: &str, params: &ListParams) -> CoreResult<Page<BlogPost>> {
        authorize(self.db, actor_id, Action::AuthorBlog)?;
        query::query_page::<BlogPost>(self.db, params)
    }

    /// Any post, drafts included, for authors.
    pub fn get(&self, actor_id: &str, id: &str) -> CoreResult<BlogPost> {
        authorize(self.db, actor_id, Action::AuthorBlog)?;
        self.load(id)
    }

    #[tracing::instrument(skip(self, draft))]
    pub fn create(&self, actor_id: &str, draft: &BlogPostDraft) -> CoreResult<BlogPost> {
        authorize(self.db, actor_id, Action::AuthorBlog)?;
        validate_post(draft)?;
        let id = self.db.insert_blog_post(draft, actor_id)?;
        activity_log(self.db).record(actor_id, &ActionTag::BlogAdded, &draft.title);
        self.load(&id)
    }

    #[tracing::instrument(skip(self, draft))]
    pub fn update(&self, actor_id: &str, id: &str, draft: &BlogPostDraft) -> CoreResult<BlogPost> {
        authorize(self.db, actor_id, Action::AuthorBlog)?;
        validate_post(draft)?;
        if self.db.update_blog_post(id, draft)? == 0 {
            return Err(CoreError::not_found("blog post", id));
        }
        activity_log(self.db).record(actor_id, &ActionTag::BlogUpdated, &draft.title);
        self.load(id)
    }

    pub fn prepare_delete(&self, actor_id: &str, id: &str) -> CoreResult<PendingDelete<BlogPost>> {
        authorize(self.db, actor_id, Action::DeleteRecord)?;
        let post = self.load(id)?;
        Ok(PendingDelete::new(&post.id, post.title))
    }

    pub fn delete(&self, actor_id: &str, pending: PendingDelete<BlogPost>) -> CoreResult<()> {
        authorize(self.db, actor_id, Action::DeleteRecord)?;
        if self.db.delete_blog_post(pending.id())? == 0 {
            return Err(CoreError::not_found("blog post", pending.id()));
        }
        activity_log(self.db).record(actor_id, &ActionTag::BlogDeleted, pending.summary());
        Ok(())
    }

    fn load(&self, id: &str) -> CoreResult<BlogPost> {
        self.db
            .get_blog_post(id)?
            .ok_or_else(|| CoreError::not_found("blog post", id))
    }
}

fn validate_post(draft: &BlogPostDraft) -> CoreResult<()> {
    required(&draft.title, "title")?;
    required(&draft.content, "content")
}
