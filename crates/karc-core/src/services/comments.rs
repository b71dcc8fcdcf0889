//! Comment service: per-variant discussion threads.

use crate::activity::{comment_preview, ActionTag};
use crate::model::{new_comment_id, Comment, Variant};
use crate::policy::Action;
use crate::store::PortalDb;

use super::{activity_log, authorize, CoreError, CoreResult, PendingDelete, ValidationError};

/// Service for comment operations.
pub struct CommentService<'a> {
    db: &'a PortalDb,
}

impl<'a> CommentService<'a> {
    pub(crate) const fn new(db: &'a PortalDb) -> Self {
        Self { db }
    }

    /// Comments on a variant, oldest first.
    pub fn list(&self, actor_id: &str, variant_id: &str) -> CoreResult<Vec<Comment>> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        self.variant(variant_id)?;
        Ok(self.db.list_comments(variant_id)?)
    }

    /// Post a comment. Whitespace-only bodies are rejected before any
    /// write.
    #[tracing::instrument(skip(self, body))]
    pub fn add(&self, actor_id: &str, variant_id: &str, body: &str) -> CoreResult<Comment> {
        authorize(self.db, actor_id, Action::AddComment)?;
        let body = body.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }
        let variant = self.variant(variant_id)?;

        let id = new_comment_id()?;
        self.db.insert_comment(&id, variant_id, actor_id, body)?;
        activity_log(self.db).record(
            actor_id,
            &ActionTag::VariantComment,
            &format!(
                "{} {}: \"{}\"",
                variant.gene,
                variant.variant,
                comment_preview(body)
            ),
        );

        self.db
            .get_comment(&id)?
            .ok_or_else(|| CoreError::not_found("comment", &id))
    }

    /// Check that the requester wrote the comment and describe it for
    /// confirmation.
    pub fn prepare_delete(&self, actor_id: &str, comment_id: &str) -> CoreResult<PendingDelete<Comment>> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        let comment = self.owned(actor_id, comment_id)?;
        Ok(PendingDelete::new(&comment.id, comment_preview(&comment.body)))
    }

    #[tracing::instrument(skip(self, pending), fields(id = %pending.id()))]
    pub fn delete(&self, actor_id: &str, pending: PendingDelete<Comment>) -> CoreResult<()> {
        authorize(self.db, actor_id, Action::ViewDashboard)?;
        let comment = self.owned(actor_id, pending.id())?;
        self.db.delete_comment(&comment.id)?;
        activity_log(self.db).record(actor_id, &ActionTag::CommentDeleted, pending.summary());
        Ok(())
    }

    fn owned(&self, actor_id: &str, comment_id: &str) -> CoreResult<Comment> {
        let comment = self
            .db
            .get_comment(comment_id)?
            .ok_or_else(|| CoreError::not_found("comment", comment_id))?;
        if comment.author_id != actor_id {
            return Err(CoreError::NotAuthor { kind: "comment" });
        }
        Ok(comment)
    }

    fn variant(&self, variant_id: &str) -> CoreResult<Variant> {
        self.db
            .get_variant(variant_id)?
            .ok_or_else(|| CoreError::not_found("variant", variant_id))
    }
}
