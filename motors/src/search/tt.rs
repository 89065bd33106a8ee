//! Global, shared, lock-free transposition table: a bucketed cache of
//! previously searched positions keyed by the fifty-move-adjusted Zobrist
//! hash. Bucket reads/writes are raw and unlocked (§5): torn reads are
//! accepted, and the 16-bit key verifier combined with [`is_legal`] catches
//! the fallout from a race.

use gears::games::PosHash;
use gears::games::chess::board_state::BoardState;
use gears::games::chess::movegen::is_legal;
use gears::games::chess::moves::ChessMove;
use gears::score::Score;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering::Relaxed};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Bound {
    Exact = 0,
    Upper = 1,
    Lower = 2,
}

impl Bound {
    fn from_bits(bits: u8) -> Option<Bound> {
        match bits {
            0 => Some(Bound::Exact),
            1 => Some(Bound::Upper),
            2 => Some(Bound::Lower),
            _ => None,
        }
    }
}

/// The logical wire layout: 16-bit key verifier, 16-bit move, 16-bit score,
/// 16-bit static eval, 8-bit depth, 8-bit meta (2-bit bound + 6-bit
/// generation) — 10 bytes, matching `spec.md` §3 exactly (a deliberate
/// deviation from the teacher engine's later 16-byte/4-entry-per-bucket
/// revision; see `DESIGN.md`).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub struct Entry {
    pub key_verifier: u16,
    pub mov: ChessMove,
    pub score: Score,
    pub eval: Score,
    pub depth: i8,
    pub bound: Option<Bound>,
    pub generation: u8,
}

// 2 (key_verifier) + 2 (mov) + 2 (score) + 2 (eval) + 1 (depth) + 1 (meta) = 10 bytes
// logically; `Entry` itself is the unpacked, alignment-padded in-memory form
// used between `AtomicEntry::load`/`store` calls, not the wire layout.

impl Entry {
    fn is_empty(&self) -> bool {
        self.bound.is_none()
    }
}

/// Two plain atomics back each slot: there is no native 80-bit integer to
/// `transmute` through the way the teacher's 128-bit entry does, so packing
/// here is always explicit bit-shifts rather than a `transmute_copy` fast
/// path.
#[derive(Debug, Default)]
struct AtomicEntry {
    key_and_move: AtomicU64, // key_verifier:16 | mov:16 | score:16 | eval:16
    depth_and_meta: AtomicU16, // depth:8 | meta:8
}

impl AtomicEntry {
    fn load(&self) -> Entry {
        let km = self.key_and_move.load(Relaxed);
        let dm = self.depth_and_meta.load(Relaxed);
        let meta = (dm >> 8) as u8;
        let (bound, generation) = (Bound::from_bits(meta & 0b11), meta >> 2);
        Entry {
            key_verifier: km as u16,
            mov: ChessMove::from_bits((km >> 16) as u16),
            score: Score::new(((km >> 32) as u16) as i16 as i32),
            eval: Score::new(((km >> 48) as u16) as i16 as i32),
            depth: dm as u8 as i8,
            bound,
            generation,
        }
    }

    fn store(&self, entry: Entry) {
        let km = entry.key_verifier as u64
            | (entry.mov.to_bits() as u64) << 16
            | ((entry.score.value() as i16 as u16) as u64) << 32
            | ((entry.eval.value() as i16 as u16) as u64) << 48;
        let bound_bits = entry.bound.map(|b| b as u8).unwrap_or(0b11);
        let meta = (entry.generation << 2) | bound_bits;
        let dm = (entry.depth as u8 as u16) | (meta as u16) << 8;
        self.key_and_move.store(km, Relaxed);
        self.depth_and_meta.store(dm, Relaxed);
    }

    fn clear(&self) {
        self.key_and_move.store(0, Relaxed);
        // meta = 0b11 marks "no bound" i.e. empty, matching `Entry::is_empty`
        self.depth_and_meta.store(0b11 << 8, Relaxed);
    }

    /// Refreshes just the generation bits of an already-matched entry,
    /// leaving depth/bound untouched, so a TT hit counts as "seen this
    /// search" for replacement-policy purposes (§4.E).
    fn bump_generation(&self, generation: u8) {
        let dm = self.depth_and_meta.load(Relaxed);
        let bound_bits = (dm >> 8) as u8 & 0b11;
        let new_meta = (generation << 2) | bound_bits;
        let new_dm = (dm & 0xFF) | (new_meta as u16) << 8;
        self.depth_and_meta.store(new_dm, Relaxed);
    }
}

const ENTRIES_PER_BUCKET: usize = 3;

#[derive(Debug, Default)]
#[repr(align(32))]
struct Bucket([AtomicEntry; ENTRIES_PER_BUCKET]);

pub const DEFAULT_HASH_SIZE_MB: usize = 16;

/// The fifty-move counter is bucketed into 10 slabs and folded into the
/// stored key so that positions near the 50-move limit don't collide with
/// otherwise-identical fresher positions (§4.E).
fn fifty_move_slab_hash(fifty_move_ctr: u16) -> u64 {
    let slab = (fifty_move_ctr / 10).min(9) as u64;
    // a simple odd multiplier spread across the key's bit range; any fixed
    // per-slab constant works, since only internal self-consistency matters
    slab.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17)
}

fn adjusted_key(board: &BoardState) -> PosHash {
    PosHash(board.hash_pos().0 ^ fifty_move_slab_hash(board.fifty_move_ctr()))
}

fn key_verifier(key: PosHash) -> u16 {
    (key.0 >> 48) as u16
}

#[derive(Clone, Debug, Default, Copy, Eq, PartialEq)]
pub struct Generation(pub u8);

pub struct TranspositionTable {
    buckets: Box<[Bucket]>,
}

impl TranspositionTable {
    pub fn new_with_mib(mib: usize) -> Self {
        Self::new_with_bytes(mib * (1 << 20))
    }

    fn new_with_bytes(bytes: usize) -> Self {
        let num_buckets = 1.max(bytes / (std::mem::size_of::<Bucket>() * ENTRIES_PER_BUCKET));
        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, Bucket::default);
        TranspositionTable { buckets: buckets.into_boxed_slice() }
    }

    pub fn size_in_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn size_in_mib(&self) -> usize {
        (self.buckets.len() * std::mem::size_of::<Bucket>() + (1 << 19)) / (1 << 20)
    }

    /// Zero-fills every bucket. Called on `ucinewgame`/`Clear Hash`; the
    /// teacher does this in parallel across threads for large tables, which
    /// this single-threaded implementation doesn't need to reproduce for
    /// correctness, only for resize latency.
    pub fn clear(&self) {
        for bucket in self.buckets.iter() {
            for entry in &bucket.0 {
                entry.clear();
            }
        }
    }

    fn bucket_index(&self, key: PosHash) -> usize {
        ((key.0 as u128 * self.buckets.len() as u128) >> 64) as usize
    }

    /// Returns the matching entry, if any, with its score already reversed
    /// for `distance_from_root` (§3: mate scores are stored as an absolute
    /// distance and re-adjusted on read). A hit also refreshes the entry's
    /// generation to `generation` (§4.E: "update its generation to now"),
    /// so a position kept alive only by repeated TT hits doesn't read as
    /// stale to the replacement policy.
    pub fn probe(&self, board: &BoardState, distance_from_root: i32, generation: u8) -> Option<Entry> {
        let key = adjusted_key(board);
        let verifier = key_verifier(key);
        let bucket = &self.buckets[self.bucket_index(key)];
        let mut found = None;
        for slot in &bucket.0 {
            let e = slot.load();
            if !e.is_empty() && e.key_verifier == verifier {
                if e.generation != generation {
                    slot.bump_generation(generation);
                }
                found = Some(e);
                break;
            }
        }
        found.map(|mut e| {
            e.score = e.score.from_tt_score(distance_from_root);
            e
        })
    }

    /// Store, honoring the replacement policy of §4.E: empty slot first,
    /// else same-key overwrite gated by quality, else the slot minimizing
    /// `depth - 4*age_diff`.
    pub fn store(
        &self,
        board: &BoardState,
        distance_from_root: i32,
        mut mov: ChessMove,
        score: Score,
        eval: Score,
        depth: i8,
        bound: Bound,
        generation: u8,
    ) {
        let key = adjusted_key(board);
        let verifier = key_verifier(key);
        let bucket = &self.buckets[self.bucket_index(key)];
        let score = score.to_tt_score(distance_from_root);

        let mut same_key_idx = None;
        let mut empty_idx = None;
        let mut worst_idx = 0usize;
        let mut worst_score = i32::MAX;
        let loaded: Vec<Entry> = bucket.0.iter().map(|s| s.load()).collect();
        for (i, e) in loaded.iter().enumerate() {
            if e.is_empty() {
                empty_idx.get_or_insert(i);
            } else if e.key_verifier == verifier {
                same_key_idx.get_or_insert(i);
            }
            let age_diff = generation.wrapping_sub(e.generation) as i32 & 0b11_1111;
            let replacement_score = e.depth as i32 - 4 * age_diff;
            if replacement_score < worst_score {
                worst_score = replacement_score;
                worst_idx = i;
            }
        }

        if mov.is_null() {
            if let Some(i) = same_key_idx {
                mov = loaded[i].mov;
            }
        }

        let idx = if let Some(i) = empty_idx {
            i
        } else if let Some(i) = same_key_idx {
            let existing = loaded[i];
            if bound == Bound::Exact || depth as i32 >= existing.depth as i32 - 3 { i } else { return };
        } else {
            worst_idx
        };

        bucket.0[idx].store(Entry { key_verifier: verifier, mov, score, eval, depth, bound: Some(bound), generation });
    }

    /// Per-mille fill estimate, sampling the first 1000 entries (§4.E).
    pub fn hashfull(&self, generation: u8) -> usize {
        let num_buckets = (1000 / ENTRIES_PER_BUCKET).min(self.buckets.len()).max(1);
        let sampled = num_buckets * ENTRIES_PER_BUCKET;
        let used = self.buckets[..num_buckets]
            .iter()
            .flat_map(|b| b.0.iter())
            .filter(|e| {
                let e = e.load();
                !e.is_empty() && e.generation == generation
            })
            .count();
        ((used * 1000) / sampled.max(1)).min(1000)
    }

    /// A move from the TT is untrusted input: validate it before acting on
    /// it (§7's "the search must never panic on a stale TT move").
    pub fn trusted_move(mov: ChessMove, board: &BoardState) -> Option<ChessMove> {
        (!mov.is_null() && is_legal(board, mov)).then_some(mov)
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new_with_mib(DEFAULT_HASH_SIZE_MB)
    }
}

/// `(half_move_count - distance_from_root) mod 64`, per §4.E.
pub fn current_generation(half_move_count: u16, distance_from_root: i32) -> u8 {
    (half_move_count as i64 - distance_from_root as i64).rem_euclid(64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use gears::games::chess::squares::sq;

    #[test]
    fn round_trips_a_stored_entry() {
        let tt = TranspositionTable::new_with_mib(1);
        let board = BoardState::startpos();
        let mov = ChessMove::new(sq("e2"), sq("e4"), gears::games::chess::moves::MoveFlag::DoublePawnPush);
        tt.store(&board, 3, mov, Score::new(57), Score::new(40), 6, Bound::Exact, 1);
        let entry = tt.probe(&board, 3, 1).unwrap();
        assert_eq!(entry.mov, mov);
        assert_eq!(entry.score, Score::new(57));
        assert_eq!(entry.depth, 6);
        assert_eq!(entry.bound, Some(Bound::Exact));
    }

    #[test]
    fn mate_score_round_trips_at_matching_distance() {
        let tt = TranspositionTable::new_with_mib(1);
        let board = BoardState::startpos();
        let mov = ChessMove::default();
        let mate = Score::mate_in(4);
        tt.store(&board, 7, mov, mate, Score::DRAW, 10, Bound::Exact, 2);
        let entry = tt.probe(&board, 7, 2).unwrap();
        assert_eq!(entry.score, mate);
    }

    #[test]
    fn wrong_key_verifier_misses() {
        let tt = TranspositionTable::new_with_mib(1);
        let a = BoardState::startpos();
        let b = BoardState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        tt.store(&a, 0, ChessMove::default(), Score::new(12), Score::new(12), 4, Bound::Exact, 0);
        assert!(tt.probe(&b, 0, 0).is_none());
    }

    #[test]
    fn probe_bumps_generation_on_hit() {
        let tt = TranspositionTable::new_with_mib(1);
        let board = BoardState::startpos();
        tt.store(&board, 0, ChessMove::default(), Score::new(5), Score::new(5), 2, Bound::Exact, 1);
        tt.probe(&board, 0, 9);
        let bucket = &tt.buckets[tt.bucket_index(adjusted_key(&board))];
        let refreshed = bucket.0.iter().map(|s| s.load()).find(|e| !e.is_empty()).unwrap();
        assert_eq!(refreshed.generation, 9);
        assert_eq!(refreshed.bound, Some(Bound::Exact));
        assert_eq!(refreshed.depth, 2);
    }

    #[test]
    fn hashfull_starts_empty_and_rises_after_stores() {
        let tt = TranspositionTable::new_with_mib(1);
        assert_eq!(tt.hashfull(0), 0);
        let board = BoardState::startpos();
        for _ in 0..50 {
            tt.store(&board, 0, ChessMove::default(), Score::new(1), Score::new(1), 1, Bound::Exact, 0);
        }
        assert!(tt.hashfull(0) > 0);
    }
}
