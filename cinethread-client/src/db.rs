use std::collections::{HashMap, HashSet};

use crate::{
    api::{self, CommentEdit, CommentId, CommentOrder},
    Comment, ReplyState,
};

/// Normalized local copy of one thread. Every comment lives exactly once in
/// `comments`; the top-level list and the reply lists only hold ids.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ThreadDb {
    comments: HashMap<CommentId, Comment>,
    top_level: Vec<CommentId>,
    replies: HashMap<CommentId, ReplyState>,
}

impl ThreadDb {
    pub fn new() -> ThreadDb {
        ThreadDb::default()
    }

    pub fn comment(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.get(id)
    }

    pub fn comment_mut(&mut self, id: &CommentId) -> Option<&mut Comment> {
        self.comments.get_mut(id)
    }

    pub fn top_level(&self) -> &[CommentId] {
        &self.top_level
    }

    pub fn reply_state(&self, parent: &CommentId) -> Option<&ReplyState> {
        self.replies.get(parent)
    }

    pub fn reply_state_mut(&mut self, parent: CommentId) -> &mut ReplyState {
        self.replies.entry(parent).or_default()
    }

    /// Forgets about every request still in flight: reply lists stop loading and
    /// optimistic votes are dropped. Returns how many pending votes were dropped.
    pub fn abandon_in_flight(&mut self) -> u64 {
        for state in self.replies.values_mut() {
            state.loading = false;
        }
        let mut dropped = 0;
        for c in self.comments.values_mut() {
            dropped += c.pending_votes.upvotes + c.pending_votes.downvotes;
            c.pending_votes = api::VoteCounts::default();
        }
        dropped
    }

    /// Inserts a comment coming from the store, or refreshes the local copy if it
    /// is already known
    pub fn upsert(&mut self, c: api::Comment) -> CommentId {
        let id = c.id;
        match self.comments.get_mut(&id) {
            Some(local) => local.refresh_from(c),
            None => {
                self.comments.insert(id, Comment::from(c));
            }
        }
        id
    }

    /// Replaces the whole top-level list, as done for the first page
    pub fn replace_top_level(&mut self, page: Vec<api::Comment>) -> usize {
        self.top_level.clear();
        self.append_top_level(page)
    }

    /// Appends a page, skipping comments already listed. Posting shifts the
    /// store's offsets, so the head of a page may repeat the previous page's tail.
    pub fn append_top_level(&mut self, page: Vec<api::Comment>) -> usize {
        let mut listed = self.top_level.iter().copied().collect::<HashSet<_>>();
        let mut appended = 0;
        for c in page {
            if !c.is_top_level() {
                tracing::warn!(
                    comment_id = ?c.id,
                    "store returned a reply among top-level comments"
                );
                continue;
            }
            let id = self.upsert(c);
            if listed.insert(id) {
                self.top_level.push(id);
                appended += 1;
            }
        }
        appended
    }

    /// Puts a freshly posted top-level comment at the head of the list
    pub fn prepend_top_level(&mut self, c: api::Comment) -> CommentId {
        let id = self.upsert(c);
        self.top_level.retain(|i| *i != id);
        self.top_level.insert(0, id);
        id
    }

    pub fn set_reply_preview(&mut self, parent: &CommentId, preview: Vec<api::Comment>) {
        let ids = preview
            .into_iter()
            .map(|r| self.upsert(r))
            .collect::<Vec<_>>();
        if let Some(p) = self.comments.get_mut(parent) {
            p.reply_preview = ids;
        }
    }

    /// Stores the full reply list of `parent`. Replies posted from here that the
    /// store did not return yet are kept.
    pub fn set_replies(&mut self, parent: CommentId, fetched: Vec<api::Comment>) {
        let mut ids = fetched
            .into_iter()
            .map(|r| self.upsert(r))
            .collect::<Vec<_>>();
        let state = self.replies.entry(parent).or_default();
        if let Some(local) = state.replies.take() {
            let known = ids.iter().copied().collect::<HashSet<_>>();
            ids.extend(local.into_iter().filter(|id| !known.contains(id)));
        }
        let comments = &self.comments;
        CommentOrder::OldestFirst.sort_by_key(&mut ids, |id| {
            comments
                .get(id)
                .map(|c| c.order_key())
                .unwrap_or((api::Time::MIN_UTC, *id))
        });
        state.replies = Some(ids);
        state.complete = true;
    }

    /// Appends a freshly posted reply to the end of its parent's replies and
    /// expands them
    pub fn append_reply(&mut self, parent: CommentId, c: api::Comment) -> CommentId {
        let id = self.upsert(c);
        let state = self.replies.entry(parent).or_default();
        state.expanded = true;
        match &mut state.replies {
            Some(replies) => {
                if !replies.contains(&id) {
                    replies.push(id);
                }
            }
            None => {
                state.replies = Some(vec![id]);
                state.complete = false;
            }
        }
        id
    }

    /// Returns false if the comment is not known locally
    pub fn apply_edit(&mut self, edit: CommentEdit) -> bool {
        match self.comments.get_mut(&edit.id) {
            Some(c) => {
                c.text = edit.text;
                c.edited_at = edit.edited_at.or(c.edited_at);
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, ids: &[CommentId]) -> Vec<Comment> {
        ids.iter()
            .filter_map(|id| self.comments.get(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::api::{PostId, Profile, UserId, Uuid, VoteCounts};

    fn comment(n: u128, parent: Option<u128>, secs: i64) -> api::Comment {
        api::Comment {
            id: CommentId(Uuid::from_u128(n)),
            post_id: PostId(Uuid::from_u128(1000)),
            author: Profile {
                id: UserId::stub(),
                name: String::from("ana"),
                avatar_url: None,
            },
            parent_id: parent.map(|p| CommentId(Uuid::from_u128(p))),
            text: format!("comment {n}"),
            date: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs),
            edited_at: None,
            votes: VoteCounts::default(),
        }
    }

    fn id(n: u128) -> CommentId {
        CommentId(Uuid::from_u128(n))
    }

    #[test]
    fn pages_are_deduplicated() {
        let mut db = ThreadDb::new();
        assert_eq!(db.replace_top_level(vec![comment(3, None, 3), comment(2, None, 2)]), 2);
        assert_eq!(db.append_top_level(vec![comment(2, None, 2), comment(1, None, 1)]), 1);
        assert_eq!(db.top_level(), &[id(3), id(2), id(1)]);
    }

    #[test]
    fn one_patch_is_seen_everywhere() {
        let mut db = ThreadDb::new();
        db.replace_top_level(vec![comment(1, None, 1)]);
        db.set_reply_preview(&id(1), vec![comment(2, Some(1), 2)]);
        db.set_replies(id(1), vec![comment(2, Some(1), 2), comment(3, Some(1), 3)]);

        assert!(db.apply_edit(CommentEdit {
            id: id(2),
            text: String::from(api::DELETED_SENTINEL),
            edited_at: None,
        }));
        let preview = db.resolve(&db.comment(&id(1)).unwrap().reply_preview);
        let replies = db.resolve(db.reply_state(&id(1)).unwrap().replies.as_ref().unwrap());
        assert!(preview[0].is_deleted());
        assert!(replies[0].is_deleted());
        assert_eq!(db.comments.len(), 3);
    }

    #[test]
    fn locally_posted_replies_survive_the_full_fetch() {
        let mut db = ThreadDb::new();
        db.replace_top_level(vec![comment(1, None, 1)]);
        db.append_reply(id(1), comment(9, Some(1), 9));
        let state = db.reply_state(&id(1)).unwrap();
        assert!(state.expanded);
        assert!(!state.complete);
        assert!(state.needs_fetch());

        db.set_replies(id(1), vec![comment(2, Some(1), 2), comment(3, Some(1), 3)]);
        let state = db.reply_state(&id(1)).unwrap();
        assert!(state.complete);
        assert_eq!(state.replies.as_deref(), Some(&[id(2), id(3), id(9)][..]));
    }

    #[test]
    fn abandoning_clears_loading_and_pending_votes() {
        let mut db = ThreadDb::new();
        db.replace_top_level(vec![comment(1, None, 1)]);
        db.reply_state_mut(id(1)).loading = true;
        db.comment_mut(&id(1))
            .unwrap()
            .add_pending_vote(api::VoteDirection::Up);

        assert_eq!(db.abandon_in_flight(), 1);
        let state = db.reply_state(&id(1)).unwrap();
        assert!(!state.loading);
        assert!(state.needs_fetch());
        assert!(!db.comment(&id(1)).unwrap().has_pending_votes());
    }

    #[test]
    fn parent_is_never_rewritten() {
        let mut db = ThreadDb::new();
        db.upsert(comment(5, Some(1), 5));
        db.upsert(comment(5, Some(2), 5));
        assert_eq!(db.comment(&id(5)).unwrap().parent_id, Some(id(1)));
    }
}
