use crate::api::Error;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    LoadPage,
    LoadReplies,
    Post,
    Edit,
    Delete,
    Vote,
}

impl Operation {
    pub fn failure_title(&self) -> &'static str {
        match self {
            Operation::LoadPage => "Failed to load comments",
            Operation::LoadReplies => "Failed to load replies",
            Operation::Post => "Failed to post comment",
            Operation::Edit => "Edit failed",
            Operation::Delete => "Delete failed",
            Operation::Vote => "Vote failed",
        }
    }
}

/// A non-blocking message for the user, typically shown as a toast
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub operation: Operation,
    pub error: Error,
}

impl Notice {
    pub fn message(&self) -> String {
        format!(
            "{}: {}",
            self.operation.failure_title(),
            self.error.user_message()
        )
    }
}
