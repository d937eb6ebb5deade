use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use cinethread_api::{
    Comment, CommentEdit, CommentId, CommentOrder, CommentStore, Error, NewComment, PostId,
    Profile, SubjectId, Time, UserId, Uuid, VoteCounts, VoteDirection, DELETED_SENTINEL,
};
use parking_lot::Mutex;
use tokio::sync::watch;

/// One entry per `CommentStore` method, for call counting and failure injection
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StoreOp {
    FetchTopLevel,
    FetchReplies,
    CreateComment,
    UpdateText,
    SoftDelete,
    IncrementVote,
}

/// Serialized form of a store's contents, as produced by `generate-test-data`
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct Fixture {
    pub users: Vec<Profile>,
    pub discussions: Vec<(SubjectId, PostId)>,
    pub comments: Vec<Comment>,
}

/// In-memory `CommentStore`, with knobs for tests: call counting, injected
/// failures and a gate holding every call until it is opened again.
pub struct MockStore {
    db: Mutex<MockDb>,
    calls: Mutex<HashMap<StoreOp, usize>>,
    failures: Mutex<HashMap<StoreOp, VecDeque<Error>>>,
    failing_replies: Mutex<HashSet<CommentId>>,
    gate: watch::Sender<bool>,
}

#[derive(Debug)]
struct MockDb {
    users: HashMap<UserId, Profile>,
    posts: HashMap<SubjectId, PostId>,
    comments: BTreeMap<CommentId, Comment>,
    clock: Time,
}

impl MockDb {
    fn tick(&mut self) -> Time {
        self.clock = self.clock + Duration::seconds(1);
        self.clock
    }

    fn get_mut(&mut self, id: CommentId) -> Result<&mut Comment, Error> {
        self.comments.get_mut(&id).ok_or(Error::CommentNotFound(id))
    }
}

impl MockStore {
    pub fn new() -> MockStore {
        let (gate, _) = watch::channel(true);
        MockStore {
            db: Mutex::new(MockDb {
                users: HashMap::new(),
                posts: HashMap::new(),
                comments: BTreeMap::new(),
                clock: Utc
                    .timestamp_opt(1_700_000_000, 0)
                    .single()
                    .unwrap_or_else(Utc::now),
            }),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            failing_replies: Mutex::new(HashSet::new()),
            gate,
        }
    }

    pub fn from_fixture(f: Fixture) -> MockStore {
        let store = MockStore::new();
        {
            let mut db = store.db.lock();
            db.users.extend(f.users.into_iter().map(|u| (u.id, u)));
            db.posts.extend(f.discussions);
            for c in f.comments {
                if c.date > db.clock {
                    db.clock = c.date;
                }
                db.comments.insert(c.id, c);
            }
        }
        store
    }

    pub fn from_json(json: &str) -> serde_json::Result<MockStore> {
        Ok(MockStore::from_fixture(serde_json::from_str(json)?))
    }

    pub fn fixture(&self) -> Fixture {
        let db = self.db.lock();
        Fixture {
            users: db.users.values().cloned().collect(),
            discussions: db.posts.iter().map(|(s, p)| (*s, *p)).collect(),
            comments: db.comments.values().cloned().collect(),
        }
    }

    pub fn add_user(&self, name: &str) -> Profile {
        let p = Profile {
            id: UserId(Uuid::new_v4()),
            name: String::from(name),
            avatar_url: None,
        };
        self.db.lock().users.insert(p.id, p.clone());
        p
    }

    /// Opens the discussion container for `subject`, returning the existing one
    /// if there already is one
    pub fn add_discussion(&self, subject: SubjectId) -> PostId {
        *self
            .db
            .lock()
            .posts
            .entry(subject)
            .or_insert_with(|| PostId(Uuid::new_v4()))
    }

    /// Inserts a comment directly, bypassing call counting. Each seeded comment is
    /// one second younger than the previous one.
    pub fn seed_comment(
        &self,
        subject: SubjectId,
        author: &Profile,
        text: &str,
        parent_id: Option<CommentId>,
    ) -> CommentId {
        let date = self.db.lock().tick();
        self.seed_comment_at(subject, author, text, parent_id, date)
    }

    pub fn seed_comment_at(
        &self,
        subject: SubjectId,
        author: &Profile,
        text: &str,
        parent_id: Option<CommentId>,
        date: Time,
    ) -> CommentId {
        let post_id = self.add_discussion(subject);
        let id = CommentId(Uuid::new_v4());
        self.db.lock().comments.insert(
            id,
            Comment {
                id,
                post_id,
                author: author.clone(),
                parent_id,
                text: String::from(text),
                date,
                edited_at: None,
                votes: VoteCounts::default(),
            },
        );
        id
    }

    pub fn get(&self, id: CommentId) -> Option<Comment> {
        self.db.lock().comments.get(&id).cloned()
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Makes the next call to `op` fail with `err`. Queued failures are consumed
    /// in order.
    pub fn fail_next(&self, op: StoreOp, err: Error) {
        self.failures.lock().entry(op).or_default().push_back(err);
    }

    /// Every reply fetch for `parent` fails until cleared
    pub fn fail_replies_of(&self, parent: CommentId) {
        self.failing_replies.lock().insert(parent);
    }

    /// Holds every subsequent call until `resume` is called
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    async fn enter(&self, op: StoreOp) -> Result<(), Error> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        let mut gate = self.gate.subscribe();
        if gate.wait_for(|open| *open).await.is_err() {
            return Err(Error::Network(String::from("mock store shut down")));
        }
        match self.failures.lock().get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => {
                tracing::debug!(?op, %err, "injecting mock store failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

impl Default for MockStore {
    fn default() -> MockStore {
        MockStore::new()
    }
}

#[async_trait]
impl CommentStore for MockStore {
    async fn fetch_top_level_comments(
        &self,
        subject: SubjectId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Comment>, Error> {
        self.enter(StoreOp::FetchTopLevel).await?;
        let db = self.db.lock();
        let post = *db.posts.get(&subject).ok_or(Error::NoDiscussion(subject))?;
        let mut res = db
            .comments
            .values()
            .filter(|c| c.post_id == post && c.parent_id.is_none())
            .cloned()
            .collect::<Vec<_>>();
        CommentOrder::NewestFirst.sort(&mut res);
        Ok(res.into_iter().skip(offset).take(limit).collect())
    }

    async fn fetch_replies(
        &self,
        parent: CommentId,
        limit: Option<usize>,
    ) -> Result<Vec<Comment>, Error> {
        self.enter(StoreOp::FetchReplies).await?;
        if self.failing_replies.lock().contains(&parent) {
            return Err(Error::Network(format!("reply fetch for {parent:?} failed")));
        }
        let db = self.db.lock();
        let mut res = db
            .comments
            .values()
            .filter(|c| c.parent_id == Some(parent))
            .cloned()
            .collect::<Vec<_>>();
        CommentOrder::OldestFirst.sort(&mut res);
        if let Some(limit) = limit {
            res.truncate(limit);
        }
        Ok(res)
    }

    async fn create_comment(&self, c: NewComment) -> Result<Comment, Error> {
        self.enter(StoreOp::CreateComment).await?;
        c.validate()?;
        let mut db = self.db.lock();
        let post_id = *db.posts.get(&c.subject).ok_or(Error::NoDiscussion(c.subject))?;
        if let Some(parent) = c.parent_id {
            match db.comments.get(&parent) {
                Some(p) if p.post_id == post_id => (),
                _ => return Err(Error::CommentNotFound(parent)),
            }
        }
        let author = db.users.get(&c.author_id).cloned().unwrap_or(Profile {
            id: c.author_id,
            name: String::from("User"),
            avatar_url: None,
        });
        let comment = Comment {
            id: CommentId(Uuid::new_v4()),
            post_id,
            author,
            parent_id: c.parent_id,
            text: c.text,
            date: db.tick(),
            edited_at: None,
            votes: VoteCounts::default(),
        };
        db.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment_text(
        &self,
        id: CommentId,
        text: String,
    ) -> Result<CommentEdit, Error> {
        self.enter(StoreOp::UpdateText).await?;
        cinethread_api::validate_string(&text)?;
        let mut db = self.db.lock();
        let now = db.tick();
        let c = db.get_mut(id)?;
        c.text = text;
        c.edited_at = Some(now);
        Ok(CommentEdit {
            id,
            text: c.text.clone(),
            edited_at: c.edited_at,
        })
    }

    async fn soft_delete_comment(&self, id: CommentId) -> Result<CommentEdit, Error> {
        self.enter(StoreOp::SoftDelete).await?;
        let mut db = self.db.lock();
        let c = db.get_mut(id)?;
        c.text = String::from(DELETED_SENTINEL);
        Ok(CommentEdit {
            id,
            text: c.text.clone(),
            edited_at: None,
        })
    }

    async fn increment_vote(
        &self,
        id: CommentId,
        dir: VoteDirection,
    ) -> Result<VoteCounts, Error> {
        self.enter(StoreOp::IncrementVote).await?;
        let mut db = self.db.lock();
        let c = db.get_mut(id)?;
        c.votes.increment(dir);
        Ok(c.votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed initializing tokio runtime")
            .block_on(f)
    }

    #[test]
    fn top_level_pages_are_newest_first() {
        let store = MockStore::new();
        let ana = store.add_user("ana");
        let subject = SubjectId(550);
        let ids = (0..5)
            .map(|i| store.seed_comment(subject, &ana, &format!("comment {i}"), None))
            .collect::<Vec<_>>();
        store.seed_comment(subject, &ana, "a reply", Some(ids[0]));

        let first = block_on(store.fetch_top_level_comments(subject, 3, 0)).unwrap();
        let second = block_on(store.fetch_top_level_comments(subject, 3, 3)).unwrap();
        let got = first
            .iter()
            .chain(second.iter())
            .map(|c| c.id)
            .collect::<Vec<_>>();
        assert_eq!(got, ids.into_iter().rev().collect::<Vec<_>>());
        assert_eq!(store.calls(StoreOp::FetchTopLevel), 2);
    }

    #[test]
    fn missing_discussion_fails_closed() {
        let store = MockStore::new();
        assert_eq!(
            block_on(store.fetch_top_level_comments(SubjectId(1), 8, 0)),
            Err(Error::NoDiscussion(SubjectId(1)))
        );
    }

    #[test]
    fn injected_failures_are_consumed_in_order() {
        let store = MockStore::new();
        let ana = store.add_user("ana");
        let id = store.seed_comment(SubjectId(1), &ana, "hi", None);
        store.fail_next(StoreOp::IncrementVote, Error::Timeout);

        assert_eq!(
            block_on(store.increment_vote(id, VoteDirection::Up)),
            Err(Error::Timeout)
        );
        assert_eq!(
            block_on(store.increment_vote(id, VoteDirection::Up)),
            Ok(VoteCounts {
                upvotes: 1,
                downvotes: 0
            })
        );
        assert_eq!(store.calls(StoreOp::IncrementVote), 2);
    }

    #[test]
    fn paused_calls_wait_for_resume() {
        let store = MockStore::new();
        let ana = store.add_user("ana");
        let id = store.seed_comment(SubjectId(1), &ana, "hi", None);
        store.pause();
        block_on(async {
            let vote = store.increment_vote(id, VoteDirection::Down);
            let release = async {
                tokio::task::yield_now().await;
                assert_eq!(store.get(id).unwrap().votes.downvotes, 0);
                store.resume();
            };
            let (res, ()) = futures::join!(vote, release);
            assert_eq!(res.unwrap().downvotes, 1);
        });
    }

    #[test]
    fn fixture_round_trip() {
        let store = MockStore::new();
        let ana = store.add_user("ana");
        let id = store.seed_comment(SubjectId(9), &ana, "hi", None);
        let json = serde_json::to_string(&store.fixture()).unwrap();
        let loaded = MockStore::from_json(&json).unwrap();
        assert_eq!(loaded.get(id), store.get(id));
        assert_eq!(loaded.total_calls(), 0);
    }
}
