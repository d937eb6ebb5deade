use std::ops::Add;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum VoteDirection {
    Up,
    Down,
}

#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize,
)]
pub struct VoteCounts {
    pub upvotes: u64,
    pub downvotes: u64,
}

impl VoteCounts {
    pub fn get(&self, dir: VoteDirection) -> u64 {
        match dir {
            VoteDirection::Up => self.upvotes,
            VoteDirection::Down => self.downvotes,
        }
    }

    pub fn increment(&mut self, dir: VoteDirection) {
        match dir {
            VoteDirection::Up => self.upvotes += 1,
            VoteDirection::Down => self.downvotes += 1,
        }
    }

    pub fn decrement(&mut self, dir: VoteDirection) {
        match dir {
            VoteDirection::Up => self.upvotes = self.upvotes.saturating_sub(1),
            VoteDirection::Down => self.downvotes = self.downvotes.saturating_sub(1),
        }
    }

    /// Counters only ever grow, so the larger value is always the more recent one
    pub fn merge(self, other: VoteCounts) -> VoteCounts {
        VoteCounts {
            upvotes: self.upvotes.max(other.upvotes),
            downvotes: self.downvotes.max(other.downvotes),
        }
    }
}

impl Add for VoteCounts {
    type Output = Self;

    fn add(self, rhs: VoteCounts) -> VoteCounts {
        VoteCounts {
            upvotes: self.upvotes + rhs.upvotes,
            downvotes: self.downvotes + rhs.downvotes,
        }
    }
}
