use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    Comment, CommentEdit, CommentId, Error, NewComment, SubjectId, VoteCounts, VoteDirection,
};

/// The hosted backend, as seen by a comment thread
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Parent-less comments of `subject`, newest first.
    ///
    /// Fails with `Error::NoDiscussion` when no discussion container exists for
    /// the subject yet.
    async fn fetch_top_level_comments(
        &self,
        subject: SubjectId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Comment>, Error>;

    /// Direct replies of `parent`, oldest first. `None` means no limit.
    async fn fetch_replies(
        &self,
        parent: CommentId,
        limit: Option<usize>,
    ) -> Result<Vec<Comment>, Error>;

    /// Resolves the discussion container and inserts in one remote call
    async fn create_comment(&self, c: NewComment) -> Result<Comment, Error>;

    async fn update_comment_text(&self, id: CommentId, text: String)
        -> Result<CommentEdit, Error>;

    async fn soft_delete_comment(&self, id: CommentId) -> Result<CommentEdit, Error>;

    /// Atomically bumps one counter and returns the counts after the increment
    async fn increment_vote(&self, id: CommentId, dir: VoteDirection)
        -> Result<VoteCounts, Error>;
}

#[async_trait]
impl<S: CommentStore + ?Sized> CommentStore for Arc<S> {
    async fn fetch_top_level_comments(
        &self,
        subject: SubjectId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Comment>, Error> {
        (**self).fetch_top_level_comments(subject, limit, offset).await
    }

    async fn fetch_replies(
        &self,
        parent: CommentId,
        limit: Option<usize>,
    ) -> Result<Vec<Comment>, Error> {
        (**self).fetch_replies(parent, limit).await
    }

    async fn create_comment(&self, c: NewComment) -> Result<Comment, Error> {
        (**self).create_comment(c).await
    }

    async fn update_comment_text(
        &self,
        id: CommentId,
        text: String,
    ) -> Result<CommentEdit, Error> {
        (**self).update_comment_text(id, text).await
    }

    async fn soft_delete_comment(&self, id: CommentId) -> Result<CommentEdit, Error> {
        (**self).soft_delete_comment(id).await
    }

    async fn increment_vote(
        &self,
        id: CommentId,
        dir: VoteDirection,
    ) -> Result<VoteCounts, Error> {
        (**self).increment_vote(id, dir).await
    }
}
