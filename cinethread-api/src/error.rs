use crate::{CommentId, SubjectId};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Comment not found {0:?}")]
    CommentNotFound(CommentId),

    #[error("No discussion exists for subject {0:?}")]
    NoDiscussion(SubjectId),

    #[error("Comment text is empty")]
    EmptyText,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Comment {0:?} was not written by the current user")]
    NotCommentOwner(CommentId),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

impl Error {
    /// Errors raised locally, before anything was sent to the store
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::EmptyText
                | Error::NotAuthenticated
                | Error::NotCommentOwner(_)
                | Error::NullByteInString(_)
        )
    }

    /// Whether the user should be told about this error at all. A missing
    /// discussion just means nobody commented yet, and an empty composer is
    /// simply ignored.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Error::NoDiscussion(_) | Error::EmptyText)
    }

    pub fn user_message(&self) -> String {
        match self {
            Error::Unknown(msg) if !msg.is_empty() => msg.clone(),
            Error::Unknown(_) => String::from("Something went wrong"),
            Error::Network(_) => String::from("Could not reach the server"),
            Error::Timeout => String::from("The server took too long to answer"),
            Error::PermissionDenied => String::from("You are not allowed to do this"),
            Error::CommentNotFound(_) => String::from("This comment no longer exists"),
            Error::NoDiscussion(_) => String::from("No discussion yet"),
            Error::EmptyText => String::from("Write something first"),
            Error::NotAuthenticated => String::from("User not logged in"),
            Error::NotCommentOwner(_) => String::from("You can only edit your own comments"),
            Error::NullByteInString(_) => String::from("The text contains invalid characters"),
        }
    }
}
