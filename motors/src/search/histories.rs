//! History tables: per-worker, reset on `new_game` and not between searches
//! (§3). Every table uses the same saturating "gravity" update so that a
//! surprising bonus moves an entry a lot while a confirming one barely
//! moves it, and entries stay bounded without an explicit clamp on read.

use gears::games::chess::board_state::BoardState;
use gears::games::chess::moves::ChessMove;
use gears::games::chess::pieces::{Color, NUM_PIECE_TYPES, PieceType};
use gears::games::chess::squares::NUM_SQUARES;

pub type HistScore = i32;

/// `entry += scale*change - entry*|change|*scale/max_value`, with `change`
/// first clamped to `±max_value/scale` (§3, §4.D).
fn gravity_update(entry: &mut HistScore, change: HistScore, scale: i32, max_value: i32) {
    let change = change.clamp(-max_value / scale, max_value / scale);
    *entry += scale * change - *entry * change.abs() * scale / max_value;
}

fn bonus_for_depth(depth: i32) -> HistScore {
    // coefficients are tunable (§4.D); these are a reasonable mid-range choice
    (300 * depth + 30 * depth * depth).min(2000)
}

fn malus_for_depth(depth: i32) -> HistScore {
    -bonus_for_depth(depth)
}

const PAWN_HASH_BUCKETS: usize = 512;
const PAWN_SCALE: i32 = 37;
const PAWN_MAX: i32 = 8335;

#[derive(Clone)]
pub struct PawnHistory(Box<[[[HistScore; NUM_SQUARES]; NUM_PIECE_TYPES]; PAWN_HASH_BUCKETS]>);

impl Default for PawnHistory {
    fn default() -> Self {
        PawnHistory(Box::new([[[0; NUM_SQUARES]; NUM_PIECE_TYPES]; PAWN_HASH_BUCKETS]))
    }
}

impl PawnHistory {
    fn bucket(board: &BoardState) -> usize {
        (board.pawn_hash().0 as usize) % PAWN_HASH_BUCKETS
    }

    pub fn score(&self, board: &BoardState, pt: PieceType, mov: ChessMove) -> HistScore {
        self.0[Self::bucket(board)][pt as usize][mov.dest_square().bb_idx()]
    }

    pub fn update(&mut self, board: &BoardState, pt: PieceType, mov: ChessMove, change: HistScore) {
        let entry = &mut self.0[Self::bucket(board)][pt as usize][mov.dest_square().bb_idx()];
        gravity_update(entry, change, PAWN_SCALE, PAWN_MAX);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

const THREAT_SCALE: i32 = 41;
const THREAT_MAX: i32 = 5113;

/// `ThreatHistory[side][from-square-is-threatened?][from][to]`.
#[derive(Clone)]
pub struct ThreatHistory(Box<[[[[HistScore; 64]; 64]; 2]; 2]>);

impl Default for ThreatHistory {
    fn default() -> Self {
        ThreatHistory(Box::new([[[[0; 64]; 64]; 2]; 2]))
    }
}

impl ThreatHistory {
    pub fn score(&self, us: Color, from_threatened: bool, mov: ChessMove) -> HistScore {
        self.0[us.idx()][from_threatened as usize][mov.src_square().bb_idx()][mov.dest_square().bb_idx()]
    }

    pub fn update(&mut self, us: Color, from_threatened: bool, mov: ChessMove, change: HistScore) {
        let entry = &mut self.0[us.idx()][from_threatened as usize][mov.src_square().bb_idx()][mov.dest_square().bb_idx()];
        gravity_update(entry, change, THREAT_SCALE, THREAT_MAX);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

const CAPTURE_SCALE: i32 = 40;
const CAPTURE_MAX: i32 = 19616;

/// `CaptureHistory[side][moving_pt][to][captured_pt]`.
#[derive(Clone)]
pub struct CaptureHistory(Box<[[[[HistScore; NUM_PIECE_TYPES]; NUM_SQUARES]; NUM_PIECE_TYPES]; 2]>);

impl Default for CaptureHistory {
    fn default() -> Self {
        CaptureHistory(Box::new([[[[0; NUM_PIECE_TYPES]; NUM_SQUARES]; NUM_PIECE_TYPES]; 2]))
    }
}

impl CaptureHistory {
    pub fn score(&self, us: Color, moving_pt: PieceType, mov: ChessMove, captured_pt: PieceType) -> HistScore {
        self.0[us.idx()][moving_pt as usize][mov.dest_square().bb_idx()][captured_pt as usize]
    }

    pub fn update(&mut self, us: Color, moving_pt: PieceType, mov: ChessMove, captured_pt: PieceType, change: HistScore) {
        let entry = &mut self.0[us.idx()][moving_pt as usize][mov.dest_square().bb_idx()][captured_pt as usize];
        gravity_update(entry, change, CAPTURE_SCALE, CAPTURE_MAX);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

const CONT_SCALE: i32 = 35;
const CONT_MAX: i32 = 9270;

/// A `[pt][to]` subtable, looked up by a previous `(pt, to)` pair and
/// re-used for the 1-, 2-, and 4-plies-back continuation lookups (§3).
#[derive(Clone)]
pub struct ContinuationHistory(Box<[[[[HistScore; NUM_SQUARES]; NUM_PIECE_TYPES]; NUM_SQUARES]; NUM_PIECE_TYPES]>);

impl Default for ContinuationHistory {
    fn default() -> Self {
        ContinuationHistory(Box::new([[[[0; NUM_SQUARES]; NUM_PIECE_TYPES]; NUM_SQUARES]; NUM_PIECE_TYPES]))
    }
}

impl ContinuationHistory {
    pub fn score(&self, prev_pt: PieceType, prev_to: usize, pt: PieceType, to: usize) -> HistScore {
        self.0[prev_pt as usize][prev_to][pt as usize][to]
    }

    pub fn update(&mut self, prev_pt: PieceType, prev_to: usize, pt: PieceType, to: usize, change: HistScore) {
        let entry = &mut self.0[prev_pt as usize][prev_to][pt as usize][to];
        gravity_update(entry, change, CONT_SCALE, CONT_MAX);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

const CORR_HASH_BUCKETS: usize = 16384;
const CORR_SCALE: i32 = 134;
const PAWN_CORRECTION_MAX: i32 = 59;
const NON_PAWN_CORRECTION_MAX: i32 = 82;

#[derive(Clone)]
pub struct PawnCorrHistory(Box<[[HistScore; CORR_HASH_BUCKETS]; 2]>);

impl Default for PawnCorrHistory {
    fn default() -> Self {
        PawnCorrHistory(Box::new([[0; CORR_HASH_BUCKETS]; 2]))
    }
}

impl PawnCorrHistory {
    pub fn correction(&self, board: &BoardState) -> HistScore {
        self.0[board.side_to_move().idx()][(board.pawn_hash().0 as usize) % CORR_HASH_BUCKETS] / CORR_SCALE
    }

    pub fn update(&mut self, board: &BoardState, delta: HistScore) {
        let entry = &mut self.0[board.side_to_move().idx()][(board.pawn_hash().0 as usize) % CORR_HASH_BUCKETS];
        gravity_update(entry, delta, CORR_SCALE, PAWN_CORRECTION_MAX * CORR_SCALE);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Clone)]
pub struct NonPawnCorrHistory(Box<[[[HistScore; CORR_HASH_BUCKETS]; 2]; 2]>);

impl Default for NonPawnCorrHistory {
    fn default() -> Self {
        NonPawnCorrHistory(Box::new([[[0; CORR_HASH_BUCKETS]; 2]; 2]))
    }
}

impl NonPawnCorrHistory {
    pub fn correction(&self, board: &BoardState, tracked: Color) -> HistScore {
        let idx = (board.non_pawn_hash(tracked).0 as usize) % CORR_HASH_BUCKETS;
        self.0[board.side_to_move().idx()][tracked.idx()][idx] / CORR_SCALE
    }

    pub fn update(&mut self, board: &BoardState, tracked: Color, delta: HistScore) {
        let idx = (board.non_pawn_hash(tracked).0 as usize) % CORR_HASH_BUCKETS;
        let entry = &mut self.0[board.side_to_move().idx()][tracked.idx()][idx];
        gravity_update(entry, delta, CORR_SCALE, NON_PAWN_CORRECTION_MAX * CORR_SCALE);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Indexed like [`ContinuationHistory`] but stores an eval-correction term
/// rather than an ordering bonus.
#[derive(Clone)]
pub struct ContinuationCorrHistory(Box<[[[[HistScore; NUM_SQUARES]; NUM_PIECE_TYPES]; NUM_SQUARES]; NUM_PIECE_TYPES]>);

impl Default for ContinuationCorrHistory {
    fn default() -> Self {
        ContinuationCorrHistory(Box::new([[[[0; NUM_SQUARES]; NUM_PIECE_TYPES]; NUM_SQUARES]; NUM_PIECE_TYPES]))
    }
}

impl ContinuationCorrHistory {
    pub fn correction(&self, prev_pt: PieceType, prev_to: usize, pt: PieceType, to: usize) -> HistScore {
        self.0[prev_pt as usize][prev_to][pt as usize][to] / CORR_SCALE
    }

    pub fn update(&mut self, prev_pt: PieceType, prev_to: usize, pt: PieceType, to: usize, delta: HistScore) {
        let entry = &mut self.0[prev_pt as usize][prev_to][pt as usize][to];
        gravity_update(entry, delta, CORR_SCALE, NON_PAWN_CORRECTION_MAX * CORR_SCALE);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Every history table a worker owns, plus the depth-scaled bonus/malus
/// helpers §4.D names.
#[derive(Clone, Default)]
pub struct Histories {
    pub pawn: PawnHistory,
    pub threat: ThreatHistory,
    pub capture: CaptureHistory,
    pub continuation: ContinuationHistory,
    pub pawn_corr: PawnCorrHistory,
    pub non_pawn_corr: NonPawnCorrHistory,
    pub continuation_corr: ContinuationCorrHistory,
}

impl Histories {
    pub fn bonus(depth: i32) -> HistScore {
        bonus_for_depth(depth)
    }

    pub fn malus(depth: i32) -> HistScore {
        malus_for_depth(depth)
    }

    pub fn reset(&mut self) {
        self.pawn.reset();
        self.threat.reset();
        self.capture.reset();
        self.continuation.reset();
        self.pawn_corr.reset();
        self.non_pawn_corr.reset();
        self.continuation_corr.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gears::games::chess::squares::sq;

    #[test]
    fn repeated_bonus_saturates_rather_than_growing_unboundedly() {
        let mut pawn = PawnHistory::default();
        let board = BoardState::startpos();
        let mov = ChessMove::new(sq("e2"), sq("e4"), gears::games::chess::moves::MoveFlag::DoublePawnPush);
        for _ in 0..10_000 {
            pawn.update(&board, PieceType::Pawn, mov, Histories::bonus(10));
        }
        let score = pawn.score(&board, PieceType::Pawn, mov);
        assert!(score <= PAWN_MAX && score >= -PAWN_MAX);
    }

    #[test]
    fn malus_moves_score_negative() {
        let mut threat = ThreatHistory::default();
        let mov = ChessMove::new(sq("g1"), sq("f3"), gears::games::chess::moves::MoveFlag::Quiet);
        threat.update(Color::White, false, mov, Histories::malus(6));
        assert!(threat.score(Color::White, false, mov) < 0);
    }

    #[test]
    fn correction_history_resets_to_zero() {
        let mut corr = PawnCorrHistory::default();
        let board = BoardState::startpos();
        corr.update(&board, 500);
        assert_ne!(corr.correction(&board), 0);
        corr.reset();
        assert_eq!(corr.correction(&board), 0);
    }
}
