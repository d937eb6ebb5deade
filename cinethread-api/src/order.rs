use std::cmp::Reverse;

use crate::{Comment, CommentId, Time};

/// Top-level comments are listed newest first, replies oldest first. Ties on the
/// timestamp are broken by id so that offset pagination stays stable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum CommentOrder {
    NewestFirst,
    OldestFirst,
}

impl CommentOrder {
    pub fn sort(&self, comments: &mut [Comment]) {
        self.sort_by_key(comments, |c| (c.date, c.id))
    }

    pub fn sort_by_key<T>(&self, items: &mut [T], key: impl Fn(&T) -> (Time, CommentId)) {
        match self {
            CommentOrder::NewestFirst => items.sort_unstable_by_key(|i| Reverse(key(i))),
            CommentOrder::OldestFirst => items.sort_unstable_by_key(|i| key(i)),
        }
    }

    /// Whether `a` may be listed before `b`
    pub fn is_ordered(&self, a: (Time, CommentId), b: (Time, CommentId)) -> bool {
        match self {
            CommentOrder::NewestFirst => a >= b,
            CommentOrder::OldestFirst => a <= b,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn ties_are_broken_by_id() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let a = CommentId(Uuid::from_u128(1));
        let b = CommentId(Uuid::from_u128(2));
        let c = CommentId(Uuid::from_u128(3));
        let mut items = vec![(t, b), (t + Duration::seconds(1), c), (t, a)];

        CommentOrder::NewestFirst.sort_by_key(&mut items, |i| *i);
        assert_eq!(
            items.iter().map(|i| i.1).collect::<Vec<_>>(),
            vec![c, b, a]
        );

        CommentOrder::OldestFirst.sort_by_key(&mut items, |i| *i);
        assert_eq!(
            items.iter().map(|i| i.1).collect::<Vec<_>>(),
            vec![a, b, c]
        );
        assert!(CommentOrder::OldestFirst.is_ordered(items[0], items[1]));
        assert!(!CommentOrder::NewestFirst.is_ordered(items[0], items[1]));
    }
}
