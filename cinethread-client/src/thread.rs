use std::future::Future;

use futures::StreamExt;
use parking_lot::Mutex;

use crate::{
    api::{
        Actor, CommentEdit, CommentId, CommentStore, Error, NewComment, SubjectId, VoteCounts,
        VoteDirection,
    },
    Comment, Composer, ComposerMode, Notice, Operation, ReplyView, ThreadConfig, ThreadDb,
};

/// Result of a `load_next_page` call
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageLoad {
    Loaded {
        /// Comments actually added to the list, after deduplication
        added: usize,
        more_available: bool,
    },
    /// Every page was already loaded, nothing was fetched
    Exhausted,
    /// Another page load is still running, nothing was fetched
    InFlight,
    /// The thread was reset or closed while the page was loading, and the
    /// result was dropped
    Stale,
}

#[derive(Debug)]
struct ThreadState {
    subject: SubjectId,
    generation: u64,
    db: ThreadDb,
    page: usize,
    more_available: bool,
    loading_page: bool,
    composer: Composer,
    notices: Vec<Notice>,
}

impl ThreadState {
    fn new(subject: SubjectId, generation: u64) -> ThreadState {
        ThreadState {
            subject,
            generation,
            db: ThreadDb::new(),
            page: 0,
            more_available: true,
            loading_page: false,
            composer: Composer::default(),
            notices: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Loading {
    Page,
    Replies(CommentId),
}

/// Clears a loading flag when the operation that set it ends, including when its
/// future gets dropped halfway through
struct LoadingGuard<'a> {
    state: &'a Mutex<ThreadState>,
    generation: u64,
    what: Loading,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.generation != self.generation {
            return;
        }
        match self.what {
            Loading::Page => state.loading_page = false,
            Loading::Replies(parent) => state.db.reply_state_mut(parent).loading = false,
        }
    }
}

/// Client-side state of the comment thread of one subject.
///
/// All operations take `&self` and can run concurrently. The local state is
/// only locked between store calls, never across one.
pub struct CommentThread<S> {
    store: S,
    config: ThreadConfig,
    state: Mutex<ThreadState>,
}

impl<S: CommentStore> CommentThread<S> {
    pub fn new(store: S, subject: SubjectId) -> CommentThread<S> {
        CommentThread {
            store,
            config: ThreadConfig::default(),
            state: Mutex::new(ThreadState::new(subject, 0)),
        }
    }

    pub fn with_config(
        store: S,
        subject: SubjectId,
        config: ThreadConfig,
    ) -> anyhow::Result<CommentThread<S>> {
        config.validate()?;
        Ok(CommentThread {
            store,
            config,
            state: Mutex::new(ThreadState::new(subject, 0)),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ThreadConfig {
        &self.config
    }

    /// Starts over on `subject`. Results of anything still in flight get dropped.
    pub fn reset(&self, subject: SubjectId) {
        let mut state = self.state.lock();
        let generation = state.generation + 1;
        tracing::debug!(?subject, generation, "resetting comment thread");
        *state = ThreadState::new(subject, generation);
    }

    /// Drops the results of everything still in flight, leaving the rest of the
    /// local state as it is. Meant for when the view goes away. Loading flags are
    /// cleared and optimistic votes withdrawn, so nothing waits on a dropped
    /// result.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.loading_page = false;
        let dropped_votes = state.db.abandon_in_flight();
        tracing::debug!(subject = ?state.subject, dropped_votes, "closing comment thread");
    }

    async fn remote<T>(&self, call: impl Future<Output = Result<T, Error>>) -> Result<T, Error> {
        match self.config.request_timeout() {
            None => call.await,
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| Error::Timeout)?,
        }
    }

    /// Logs the failure and queues a notice for the user if it deserves one
    fn surface(&self, operation: Operation, err: Error) -> Error {
        if err.is_precondition() {
            tracing::debug!(?operation, %err, "comment thread operation rejected");
        } else {
            tracing::warn!(?operation, %err, "comment thread operation failed");
        }
        if err.is_user_visible() {
            self.state.lock().notices.push(Notice {
                operation,
                error: err.clone(),
            });
        }
        err
    }

    /// Fetches the next page of top-level comments, along with a preview of each
    /// one's first replies
    pub async fn load_next_page(&self) -> Result<PageLoad, Error> {
        let (subject, page, generation) = {
            let mut state = self.state.lock();
            if !state.more_available {
                return Ok(PageLoad::Exhausted);
            }
            if state.loading_page {
                tracing::debug!(page = state.page, "page load already in flight");
                return Ok(PageLoad::InFlight);
            }
            state.loading_page = true;
            (state.subject, state.page, state.generation)
        };
        let _guard = LoadingGuard {
            state: &self.state,
            generation,
            what: Loading::Page,
        };

        let page_size = self.config.page_size;
        let fetched = self
            .remote(
                self.store
                    .fetch_top_level_comments(subject, page_size, page * page_size),
            )
            .await;
        let comments = match fetched {
            Ok(comments) => comments,
            Err(Error::NoDiscussion(_)) => {
                tracing::debug!(?subject, "no discussion for subject, showing no comments");
                let mut state = self.state.lock();
                if state.generation != generation {
                    return Ok(PageLoad::Stale);
                }
                state.more_available = false;
                return Ok(PageLoad::Loaded {
                    added: 0,
                    more_available: false,
                });
            }
            Err(err) => return Err(self.surface(Operation::LoadPage, err)),
        };

        let previews = self.fetch_previews(&comments).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::debug!(?subject, page, "dropping page of a reset thread");
            return Ok(PageLoad::Stale);
        }
        let fetched_len = comments.len();
        let top_ids = comments.iter().map(|c| c.id).collect::<Vec<_>>();
        let added = match page {
            0 => state.db.replace_top_level(comments),
            _ => state.db.append_top_level(comments),
        };
        for (id, preview) in top_ids.iter().zip(previews) {
            state.db.set_reply_preview(id, preview);
        }
        if fetched_len > 0 {
            state.page += 1;
        }
        state.more_available = fetched_len >= page_size;
        tracing::debug!(
            ?subject,
            page,
            fetched = fetched_len,
            added,
            more_available = state.more_available,
            "loaded comment page"
        );
        Ok(PageLoad::Loaded {
            added,
            more_available: state.more_available,
        })
    }

    /// One preview per comment, in order. A failed preview only empties that
    /// comment's preview.
    async fn fetch_previews(
        &self,
        comments: &[crate::api::Comment],
    ) -> Vec<Vec<crate::api::Comment>> {
        let len = self.config.reply_preview_len;
        if len == 0 {
            return comments.iter().map(|_| Vec::new()).collect();
        }
        futures::stream::iter(comments.iter().map(|c| c.id))
            .map(|id| async move {
                match self.remote(self.store.fetch_replies(id, Some(len))).await {
                    Ok(replies) => replies,
                    Err(err) => {
                        tracing::warn!(
                            comment_id = ?id,
                            %err,
                            "failed fetching reply preview, showing none"
                        );
                        Vec::new()
                    }
                }
            })
            .buffered(self.config.preview_concurrency)
            .collect()
            .await
    }

    /// Flips whether the replies of `parent` are shown, fetching them on first
    /// expansion. Returns whether they are now expanded.
    pub async fn toggle_replies(&self, parent: CommentId) -> bool {
        let (expanded, fetch, generation) = {
            let mut state = self.state.lock();
            let generation = state.generation;
            let replies = state.db.reply_state_mut(parent);
            replies.expanded = !replies.expanded;
            let fetch = replies.expanded && replies.needs_fetch();
            if fetch {
                replies.loading = true;
            }
            (replies.expanded, fetch, generation)
        };
        if fetch {
            self.fetch_replies(parent, generation).await;
        }
        expanded
    }

    /// Shows the replies of `parent`, fetching them if needed
    pub async fn expand_replies(&self, parent: CommentId) {
        let (fetch, generation) = {
            let mut state = self.state.lock();
            let generation = state.generation;
            let replies = state.db.reply_state_mut(parent);
            replies.expanded = true;
            let fetch = replies.needs_fetch();
            if fetch {
                replies.loading = true;
            }
            (fetch, generation)
        };
        if fetch {
            self.fetch_replies(parent, generation).await;
        }
    }

    // Expects the loading flag of `parent` to be already set
    async fn fetch_replies(&self, parent: CommentId, generation: u64) {
        let _guard = LoadingGuard {
            state: &self.state,
            generation,
            what: Loading::Replies(parent),
        };
        let res = self.remote(self.store.fetch_replies(parent, None)).await;
        let res = match res {
            Ok(replies) => Ok(replies),
            Err(err) => Err(self.surface(Operation::LoadReplies, err)),
        };
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        match res {
            Ok(replies) => {
                tracing::debug!(parent_id = ?parent, num_replies = replies.len(), "loaded replies");
                state.db.set_replies(parent, replies);
            }
            // fail open: show what we have, and don't try again on every toggle
            Err(_) => state.db.set_replies(parent, Vec::new()),
        }
    }

    fn require_actor<'a>(
        &self,
        operation: Operation,
        actor: Option<&'a Actor>,
    ) -> Result<&'a Actor, Error> {
        actor.ok_or_else(|| self.surface(operation, Error::NotAuthenticated))
    }

    /// Posts a comment, or a reply if `parent_id` is set. The new comment shows up
    /// first in the top-level list, or last in its parent's replies.
    pub async fn post_comment(
        &self,
        actor: Option<&Actor>,
        text: &str,
        parent_id: Option<CommentId>,
    ) -> Result<CommentId, Error> {
        if text.trim().is_empty() {
            return Err(self.surface(Operation::Post, Error::EmptyText));
        }
        let actor = self.require_actor(Operation::Post, actor)?;
        let (subject, generation) = {
            let state = self.state.lock();
            (state.subject, state.generation)
        };
        let new = NewComment::new(subject, actor.id, text, parent_id);
        new.validate()
            .map_err(|err| self.surface(Operation::Post, err))?;

        let mut created = self
            .remote(self.store.create_comment(new))
            .await
            .map_err(|err| self.surface(Operation::Post, err))?;
        // show our own profile right away, without waiting for the store to echo it
        created.author = actor.profile();
        let id = created.id;
        tracing::debug!(comment_id = ?id, ?parent_id, "posted comment");

        let mut state = self.state.lock();
        if state.generation != generation {
            return Ok(id);
        }
        match parent_id {
            None => state.db.prepend_top_level(created),
            Some(parent) => state.db.append_reply(parent, created),
        };
        Ok(id)
    }

    /// Whether `actor` wrote comment `id`. Unknown comments are nobody's.
    pub fn is_mine(&self, id: CommentId, actor: Option<&Actor>) -> bool {
        match actor {
            None => false,
            Some(actor) => self
                .state
                .lock()
                .db
                .comment(&id)
                .map(|c| c.author.id == actor.id)
                .unwrap_or(false),
        }
    }

    fn check_owner(&self, operation: Operation, id: CommentId, actor: &Actor) -> Result<(), Error> {
        let owner = self.state.lock().db.comment(&id).map(|c| c.author.id);
        match owner {
            // not loaded here, so leave it to the store to refuse
            None => Ok(()),
            Some(owner) if owner == actor.id => Ok(()),
            Some(_) => Err(self.surface(operation, Error::NotCommentOwner(id))),
        }
    }

    fn apply_edit(&self, generation: u64, edit: CommentEdit) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        let id = edit.id;
        if !state.db.apply_edit(edit) {
            tracing::debug!(comment_id = ?id, "edited comment is not loaded locally");
        }
    }

    /// Changes the text of one of the actor's comments. The old text stays visible
    /// until the store confirms.
    pub async fn edit_comment(
        &self,
        actor: Option<&Actor>,
        id: CommentId,
        text: &str,
    ) -> Result<(), Error> {
        let actor = self.require_actor(Operation::Edit, actor)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(self.surface(Operation::Edit, Error::EmptyText));
        }
        crate::api::validate_string(text).map_err(|err| self.surface(Operation::Edit, err))?;
        self.check_owner(Operation::Edit, id, actor)?;
        let generation = self.state.lock().generation;

        let edit = self
            .remote(self.store.update_comment_text(id, String::from(text)))
            .await
            .map_err(|err| self.surface(Operation::Edit, err))?;
        self.apply_edit(generation, edit);
        Ok(())
    }

    /// Replaces the comment's text with the deleted marker. The comment itself
    /// stays where it is.
    pub async fn soft_delete_comment(
        &self,
        actor: Option<&Actor>,
        id: CommentId,
    ) -> Result<(), Error> {
        self.require_actor(Operation::Delete, actor)?;
        let generation = self.state.lock().generation;
        let edit = self
            .remote(self.store.soft_delete_comment(id))
            .await
            .map_err(|err| self.surface(Operation::Delete, err))?;
        self.apply_edit(generation, edit);
        Ok(())
    }

    /// Adds one vote. The local count goes up immediately, and comes back down if
    /// the store refuses the vote.
    pub async fn vote_comment(
        &self,
        actor: Option<&Actor>,
        id: CommentId,
        dir: VoteDirection,
    ) -> Result<VoteCounts, Error> {
        self.require_actor(Operation::Vote, actor)?;
        let generation = {
            let mut state = self.state.lock();
            if let Some(c) = state.db.comment_mut(&id) {
                c.add_pending_vote(dir);
            }
            state.generation
        };

        let res = self.remote(self.store.increment_vote(id, dir)).await;

        let local = {
            let mut state = self.state.lock();
            if state.generation != generation {
                None
            } else {
                state.db.comment_mut(&id).map(|c| {
                    c.settle_pending_vote(dir, res.as_ref().ok().copied());
                    c.votes()
                })
            }
        };
        match res {
            Ok(counts) => Ok(local.unwrap_or(counts)),
            Err(err) => {
                tracing::debug!(comment_id = ?id, ?dir, "rolled back optimistic vote");
                Err(self.surface(Operation::Vote, err))
            }
        }
    }

    /// Points the composer at a reply to `parent`, showing its replies too
    pub async fn start_reply(&self, parent: CommentId) {
        self.state.lock().composer.start_reply(parent);
        self.expand_replies(parent).await;
    }

    /// Points the composer at editing one of the actor's comments, prefilled with
    /// its current text
    pub fn start_edit(&self, actor: Option<&Actor>, id: CommentId) -> Result<(), Error> {
        let actor = self.require_actor(Operation::Edit, actor)?;
        let found = {
            let state = self.state.lock();
            state.db.comment(&id).map(|c| (c.author.id, c.text.clone()))
        };
        let text = match found {
            None => return Err(self.surface(Operation::Edit, Error::CommentNotFound(id))),
            Some((author, _)) if author != actor.id => {
                return Err(self.surface(Operation::Edit, Error::NotCommentOwner(id)))
            }
            Some((_, text)) => text,
        };
        self.state.lock().composer.start_edit(id, &text);
        Ok(())
    }

    pub fn cancel_composer(&self) {
        self.state.lock().composer.cancel();
    }

    pub fn set_draft(&self, draft: impl Into<String>) {
        self.state.lock().composer.draft = draft.into();
    }

    /// Sends the composer's draft the way its mode says. The composer goes back to
    /// a blank new comment on success, and keeps everything on failure.
    pub async fn submit(&self, actor: Option<&Actor>) -> Result<CommentId, Error> {
        let composer = self.state.lock().composer.clone();
        let id = match composer.mode {
            ComposerMode::NewComment => self.post_comment(actor, &composer.draft, None).await?,
            ComposerMode::Reply { parent } => {
                self.post_comment(actor, &composer.draft, Some(parent))
                    .await?
            }
            ComposerMode::Edit { comment } => {
                self.edit_comment(actor, comment, &composer.draft).await?;
                comment
            }
        };
        let mut state = self.state.lock();
        if state.composer == composer {
            state.composer.cancel();
        }
        Ok(id)
    }

    pub fn composer(&self) -> Composer {
        self.state.lock().composer.clone()
    }

    pub fn subject(&self) -> SubjectId {
        self.state.lock().subject
    }

    pub fn top_level_comments(&self) -> Vec<Comment> {
        let state = self.state.lock();
        state.db.resolve(state.db.top_level())
    }

    pub fn comment(&self, id: CommentId) -> Option<Comment> {
        self.state.lock().db.comment(&id).cloned()
    }

    /// The first few replies of `parent`, as fetched with its page
    pub fn reply_preview(&self, parent: CommentId) -> Vec<Comment> {
        let state = self.state.lock();
        match state.db.comment(&parent) {
            Some(c) => state.db.resolve(&c.reply_preview),
            None => Vec::new(),
        }
    }

    pub fn replies(&self, parent: CommentId) -> ReplyView {
        let state = self.state.lock();
        match state.db.reply_state(&parent) {
            None => ReplyView::default(),
            Some(r) => ReplyView {
                expanded: r.expanded,
                loading: r.loading,
                replies: r
                    .replies
                    .as_deref()
                    .map(|ids| state.db.resolve(ids))
                    .unwrap_or_default(),
            },
        }
    }

    /// Number of replies known locally: the full list once fetched, the preview
    /// otherwise
    pub fn reply_count(&self, parent: CommentId) -> usize {
        let state = self.state.lock();
        match state.db.reply_state(&parent).and_then(|r| r.cached_len()) {
            Some(len) => len,
            None => state
                .db
                .comment(&parent)
                .map(|c| c.reply_preview.len())
                .unwrap_or(0),
        }
    }

    pub fn more_available(&self) -> bool {
        self.state.lock().more_available
    }

    /// Number of pages loaded so far
    pub fn page(&self) -> usize {
        self.state.lock().page
    }

    pub fn is_loading_page(&self) -> bool {
        self.state.lock().loading_page
    }

    /// Failures waiting to be shown to the user, oldest first
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.lock().notices)
    }
}
