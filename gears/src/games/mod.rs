//! Game-agnostic scaffolding shared by the chess implementation.
//!
//! The original codebase this crate is patterned on abstracts over several
//! unrelated games (chess, mnk, ataxx, uttt) behind a common `Board` trait.
//! This crate keeps only the chess game: the generic trait machinery added
//! nothing the search core needs and every non-chess game has no counterpart
//! in the specification this crate implements.

pub mod chess;

/// A single Zobrist-keyed position hash, newtyped to avoid confusing it with
/// other `u64`s (move counts, node counts, ...).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct PosHash(pub u64);

impl std::ops::BitXor for PosHash {
    type Output = PosHash;
    fn bitxor(self, rhs: Self) -> Self::Output {
        PosHash(self.0 ^ rhs.0)
    }
}

impl std::ops::BitXorAssign for PosHash {
    fn bitxor_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

/// History of position hashes seen so far this game, used for repetition and
/// cycle detection. Truncated whenever the fifty-move counter resets, since
/// positions before an irreversible move can never repeat.
#[derive(Clone, Debug, Default)]
pub struct ZobristHistory(pub Vec<PosHash>);

impl ZobristHistory {
    pub fn push(&mut self, hash: PosHash) {
        self.0.push(hash);
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Truncate to the last `n` entries, called whenever the fifty-move counter resets.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}
