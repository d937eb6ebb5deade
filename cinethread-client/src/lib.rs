mod db;
pub use db::ThreadDb;

mod comment;
pub use comment::Comment;

mod composer;
pub use composer::{Composer, ComposerMode};

mod config;
pub use config::ThreadConfig;

mod notice;
pub use notice::{Notice, Operation};

mod replies;
pub use replies::{ReplyState, ReplyView};

mod thread;
pub use thread::{CommentThread, PageLoad};

mod fuzz;

pub mod api {
    pub use cinethread_api::*;
}

pub mod prelude {
    pub use crate::{
        api::{Actor, CommentId, CommentStore, SubjectId, VoteDirection},
        CommentThread, PageLoad, ThreadConfig,
    };
}
