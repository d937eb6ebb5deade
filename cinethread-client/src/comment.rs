use crate::api::{self, CommentId, PostId, Profile, Time, VoteCounts, VoteDirection};

/// Local copy of a comment. Vote counts are split between what the store last
/// confirmed and the optimistic increments still waiting for an answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: Profile,
    pub parent_id: Option<CommentId>,
    pub text: String,
    pub date: Time,
    pub edited_at: Option<Time>,

    pub confirmed_votes: VoteCounts,
    pub pending_votes: VoteCounts,

    /// First few replies, fetched along with the page this comment came in
    pub reply_preview: Vec<CommentId>,
}

impl From<api::Comment> for Comment {
    fn from(c: api::Comment) -> Comment {
        Comment {
            id: c.id,
            post_id: c.post_id,
            author: c.author,
            parent_id: c.parent_id,
            text: c.text,
            date: c.date,
            edited_at: c.edited_at,
            confirmed_votes: c.votes,
            pending_votes: VoteCounts::default(),
            reply_preview: Vec::new(),
        }
    }
}

impl Comment {
    /// What the user gets to see
    pub fn votes(&self) -> VoteCounts {
        self.confirmed_votes + self.pending_votes
    }

    pub fn upvotes(&self) -> u64 {
        self.votes().upvotes
    }

    pub fn downvotes(&self) -> u64 {
        self.votes().downvotes
    }

    pub fn has_pending_votes(&self) -> bool {
        self.pending_votes != VoteCounts::default()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.text == api::DELETED_SENTINEL
    }

    pub fn order_key(&self) -> (Time, CommentId) {
        (self.date, self.id)
    }

    pub(crate) fn add_pending_vote(&mut self, dir: VoteDirection) {
        self.pending_votes.increment(dir);
    }

    pub(crate) fn settle_pending_vote(
        &mut self,
        dir: VoteDirection,
        confirmed: Option<VoteCounts>,
    ) {
        self.pending_votes.decrement(dir);
        if let Some(counts) = confirmed {
            self.confirmed_votes = self.confirmed_votes.merge(counts);
        }
    }

    /// Takes in a fresher copy of the same comment from the store. The parent is
    /// fixed at creation, so a differing parent is ignored.
    pub(crate) fn refresh_from(&mut self, fresh: api::Comment) {
        debug_assert_eq!(self.id, fresh.id);
        if fresh.parent_id != self.parent_id {
            tracing::warn!(
                comment_id = ?self.id,
                local_parent = ?self.parent_id,
                remote_parent = ?fresh.parent_id,
                "store reported a different parent for an already-known comment, keeping the local one"
            );
        }
        self.author = fresh.author;
        self.text = fresh.text;
        self.edited_at = fresh.edited_at.or(self.edited_at);
        self.confirmed_votes = self.confirmed_votes.merge(fresh.votes);
    }
}
