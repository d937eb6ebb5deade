use crate::api::CommentId;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ComposerMode {
    #[default]
    NewComment,
    Reply {
        parent: CommentId,
    },
    Edit {
        comment: CommentId,
    },
}

/// The single text box under the thread, in one of its three modes
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Composer {
    pub mode: ComposerMode,
    pub draft: String,
}

impl Composer {
    pub fn start_reply(&mut self, parent: CommentId) {
        // an edit buffer must not turn into a reply
        if let ComposerMode::Edit { .. } = self.mode {
            self.draft.clear();
        }
        self.mode = ComposerMode::Reply { parent };
    }

    pub fn start_edit(&mut self, comment: CommentId, current_text: &str) {
        self.mode = ComposerMode::Edit { comment };
        self.draft = String::from(current_text);
    }

    pub fn cancel(&mut self) {
        *self = Composer::default();
    }

    pub fn reply_target(&self) -> Option<CommentId> {
        match self.mode {
            ComposerMode::Reply { parent } => Some(parent),
            _ => None,
        }
    }

    pub fn editing(&self) -> Option<CommentId> {
        match self.mode {
            ComposerMode::Edit { comment } => Some(comment),
            _ => None,
        }
    }
}
