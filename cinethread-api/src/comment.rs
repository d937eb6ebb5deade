use uuid::Uuid;

use crate::{Error, Profile, Time, UserId, VoteCounts, DELETED_SENTINEL, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

/// Discussion container a subject's comments hang off
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

/// The movie a thread is attached to
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct SubjectId(pub i64);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author: Profile,

    /// None for top-level comments
    pub parent_id: Option<CommentId>,

    pub text: String,
    pub date: Time,
    pub edited_at: Option<Time>,
    pub votes: VoteCounts,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.text == DELETED_SENTINEL
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub subject: SubjectId,
    pub author_id: UserId,
    pub text: String,
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    /// Trims `text`, so that what gets validated is what gets sent
    pub fn new(
        subject: SubjectId,
        author_id: UserId,
        text: &str,
        parent_id: Option<CommentId>,
    ) -> NewComment {
        NewComment {
            subject,
            author_id,
            text: String::from(text.trim()),
            parent_id,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.text.trim().is_empty() {
            return Err(Error::EmptyText);
        }
        crate::validate_string(&self.text)
    }
}

/// What the store echoes back after a text update or a soft-delete
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentEdit {
    pub id: CommentId,
    pub text: String,
    pub edited_at: Option<Time>,
}
