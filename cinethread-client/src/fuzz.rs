#![cfg(test)]

use std::{collections::HashSet, panic::AssertUnwindSafe, sync::Arc};

use cinethread_mock_server::MockStore;

use crate::{
    api::{CommentOrder, SubjectId},
    CommentThread, PageLoad, ThreadConfig,
};

macro_rules! do_tokio_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let () = runtime.block_on($fn(v));
                })
        }
    };
}

do_tokio_test!(
    pagination_lists_every_comment_once,
    (u8, Vec<u8>),
    |(page_size, replies): (u8, Vec<u8>)| async move {
        let page_size = usize::from(page_size % 10) + 1;
        let subject = SubjectId(1);
        let store = Arc::new(MockStore::new());
        let user = store.add_user("fuzzer");
        store.add_discussion(subject);
        let seeded = replies
            .iter()
            .take(40)
            .enumerate()
            .map(|(i, num_replies)| {
                let id = store.seed_comment(subject, &user, &format!("comment {i}"), None);
                for r in 0..(num_replies % 5) {
                    store.seed_comment(subject, &user, &format!("reply {r}"), Some(id));
                }
                (id, usize::from(num_replies % 5))
            })
            .collect::<Vec<_>>();

        let config = ThreadConfig {
            page_size,
            ..ThreadConfig::default()
        };
        let preview_len = config.reply_preview_len;
        let thread = CommentThread::with_config(store.clone(), subject, config).unwrap();
        for _ in 0..=(seeded.len() / page_size + 1) {
            if thread.load_next_page().await.unwrap() == PageLoad::Exhausted {
                break;
            }
        }
        assert!(!thread.more_available());

        let listed = thread.top_level_comments();
        let unique = listed.iter().map(|c| c.id).collect::<HashSet<_>>();
        assert_eq!(unique.len(), listed.len(), "duplicate comment listed");
        assert_eq!(listed.len(), seeded.len());
        for w in listed.windows(2) {
            assert!(
                CommentOrder::NewestFirst.is_ordered(w[0].order_key(), w[1].order_key()),
                "comments listed out of order"
            );
        }
        for (id, num_replies) in seeded {
            assert_eq!(thread.reply_preview(id).len(), num_replies.min(preview_len));
        }

        let calls = store.total_calls();
        assert_eq!(thread.load_next_page().await, Ok(PageLoad::Exhausted));
        assert_eq!(store.total_calls(), calls);
    }
);
