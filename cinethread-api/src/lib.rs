use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

/// Text a soft-deleted comment is left with. The row itself is never removed.
pub const DELETED_SENTINEL: &str = "[deleted]";

mod comment;
pub use comment::{Comment, CommentEdit, CommentId, NewComment, PostId, SubjectId};

mod error;
pub use error::Error;

mod order;
pub use order::CommentOrder;

mod store;
pub use store::CommentStore;

mod user;
pub use user::{Actor, Profile, UserId};

mod vote;
pub use vote::{VoteCounts, VoteDirection};

// The store accepts arbitrary text, but postgres-backed stores reject null bytes,
// so refuse them here before anything goes on the wire.
pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}
