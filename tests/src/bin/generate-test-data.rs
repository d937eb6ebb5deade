use chrono::{Duration, Utc};
use cinethread_api::{
    Comment, CommentId, PostId, Profile, SubjectId, Time, UserId, VoteCounts, DELETED_SENTINEL,
};
use cinethread_mock_server::Fixture;
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

const NUM_USERS: usize = 5;
const NUM_SUBJECTS: usize = 4;

const NUM_TOP_LEVEL_PER_SUBJECT: usize = 30;
const MAX_REPLIES: usize = 8;
const MAX_COMMENT_WORDS: usize = 40;
const MAX_VOTES: u64 = 50;

// One in this many comments gets soft-deleted, one in this many edited
const DELETED_ONE_IN: u32 = 15;
const EDITED_ONE_IN: u32 = 6;

fn gen_comment_text(rng: &mut impl Rng) -> String {
    lipsum::lipsum_words(rng.gen_range(1..=MAX_COMMENT_WORDS))
}

fn gen_votes(rng: &mut impl Rng) -> VoteCounts {
    VoteCounts {
        upvotes: rng.gen_range(0..=MAX_VOTES),
        downvotes: rng.gen_range(0..=MAX_VOTES / 4),
    }
}

fn gen_comment(
    rng: &mut impl Rng,
    post_id: PostId,
    users: &[Profile],
    parent_id: Option<CommentId>,
    date: Time,
) -> Comment {
    let mut text = gen_comment_text(rng);
    let mut edited_at = None;
    if rng.gen_ratio(1, DELETED_ONE_IN) {
        text = String::from(DELETED_SENTINEL);
    } else if rng.gen_ratio(1, EDITED_ONE_IN) {
        edited_at = Some(date + Duration::minutes(rng.gen_range(1..600)));
    }
    Comment {
        id: CommentId(Uuid::new_v4()),
        post_id,
        author: users
            .choose(rng)
            .cloned()
            .expect("generating comments without users"),
        parent_id,
        text,
        date,
        edited_at,
        votes: gen_votes(rng),
    }
}

fn main() {
    let mut rng = rand::thread_rng();
    let start = Utc::now() - Duration::days(30);

    // Generate users
    let users = (0..NUM_USERS)
        .map(|_| Profile {
            id: UserId(Uuid::new_v4()),
            name: lipsum::lipsum_title(),
            avatar_url: match rng.gen_bool(0.5) {
                true => Some(format!("https://avatars.invalid/{}.png", Uuid::new_v4())),
                false => None,
            },
        })
        .collect::<Vec<_>>();

    // Generate discussions, the last subject is left without one
    let discussions = (0..NUM_SUBJECTS - 1)
        .map(|i| (SubjectId(i as i64 + 1), PostId(Uuid::new_v4())))
        .collect::<Vec<_>>();

    // Generate comments, each reply younger than its parent
    let mut comments = Vec::new();
    for (_, post_id) in &discussions {
        for _ in 0..NUM_TOP_LEVEL_PER_SUBJECT {
            let date = start + Duration::minutes(rng.gen_range(0..30 * 24 * 60));
            let top = gen_comment(&mut rng, *post_id, &users, None, date);
            let mut reply_date = top.date;
            for _ in 0..rng.gen_range(0..=MAX_REPLIES) {
                reply_date = reply_date + Duration::minutes(rng.gen_range(1..240));
                let reply = gen_comment(&mut rng, *post_id, &users, Some(top.id), reply_date);
                comments.push(reply);
            }
            comments.push(top);
        }
    }

    let fixture = Fixture {
        users,
        discussions,
        comments,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&fixture).expect("serializing generated fixture")
    );
}
