use crate::{api::CommentId, Comment};

/// Reply bookkeeping for one parent comment. Exists only once the replies were
/// asked for, or a reply was posted.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReplyState {
    pub expanded: bool,
    pub loading: bool,

    /// None until fetched, oldest first afterwards
    pub replies: Option<Vec<CommentId>>,

    /// False while `replies` only holds replies posted from here, before the
    /// full list was ever fetched
    pub complete: bool,
}

impl ReplyState {
    pub fn needs_fetch(&self) -> bool {
        !self.loading && (self.replies.is_none() || !self.complete)
    }

    /// Number of replies cached, None before any were
    pub fn cached_len(&self) -> Option<usize> {
        self.replies.as_ref().map(|r| r.len())
    }
}

/// Render-ready replies of one parent
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReplyView {
    pub expanded: bool,
    pub loading: bool,
    pub replies: Vec<Comment>,
}
