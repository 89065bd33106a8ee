//! Tablebase integration (§4.G): a WDL probe consulted in-search, and a DTZ
//! probe consulted only at the root to pick a move that actually makes
//! progress. The persistent file format (Syzygy/Pyrrhic) is a Non-goal —
//! this module defines the boundary trait the search calls through and
//! adapts its result into this crate's own [`ChessMove`]/[`Score`] types,
//! the same way [`crate::eval::Eval`] stands in for the NN.

use gears::games::chess::board_state::BoardState;
use gears::games::chess::moves::ChessMove;
use gears::score::Score;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Wdl {
    Loss,
    BlessedLoss,
    Draw,
    CursedWin,
    Win,
}

impl Wdl {
    /// A WDL result is only trustworthy in positions with no castling rights
    /// and (for most backends) no more than `MAX_PIECES` on the board; the
    /// adapter enforces that gate, not the probe itself.
    pub fn to_search_score(self, ply_from_root: i32) -> Score {
        match self {
            Wdl::Win => Score::tb_win_in(ply_from_root),
            Wdl::CursedWin | Wdl::Draw | Wdl::BlessedLoss => Score::DRAW,
            Wdl::Loss => Score::tb_loss_in(ply_from_root),
        }
    }
}

/// The root-only probe: in addition to WDL, names a move and the distance
/// to the next pawn push/capture (DTZ), since a WDL-only result can't tell
/// a 2-move mate from a 50-move shuffle towards one.
#[derive(Copy, Clone, Debug)]
pub struct DtzResult {
    pub wdl: Wdl,
    pub best_move: ChessMove,
    pub distance_to_zero: u32,
}

/// The boundary to an external probing library (Pyrrhic or equivalent). A
/// no-op implementation (`NoTablebase`) is provided so the search core
/// compiles and runs without one configured.
pub trait TablebaseProbe: Send + Sync {
    /// Maximum piece count (both sides, including kings) this backend's
    /// loaded files cover; the search core only probes at or below it.
    fn max_pieces(&self) -> u32;

    fn probe_wdl(&self, board: &BoardState) -> Option<Wdl>;

    /// Only called at the root, so the best move can be substituted for a
    /// non-mating one the main search preferred.
    fn probe_dtz(&self, board: &BoardState) -> Option<DtzResult>;
}

#[derive(Default)]
pub struct NoTablebase;

impl TablebaseProbe for NoTablebase {
    fn max_pieces(&self) -> u32 {
        0
    }

    fn probe_wdl(&self, _board: &BoardState) -> Option<Wdl> {
        None
    }

    fn probe_dtz(&self, _board: &BoardState) -> Option<DtzResult> {
        None
    }
}

/// Positions with castling rights still available, or with more pieces than
/// the backend covers, are not probed (§4.G edge case: a backend must never
/// be asked about a position outside its table range).
pub fn is_probeable(board: &BoardState, probe: &dyn TablebaseProbe) -> bool {
    if board.castling_rights().rook_squares().next().is_some() {
        return false;
    }
    let pieces = board.occupied_bb().num_ones();
    pieces <= probe.max_pieces()
}

/// In-search WDL consultation (§4.G step 1): returns a search-ready score
/// with the TT store bound it should be recorded under. Unlike the root DTZ
/// probe, this additionally requires a clean fifty-move counter: a WDL
/// result ignores the fifty-move rule entirely, so probing with it already
/// ticking up risks reporting a win/loss the fifty-move rule would actually
/// turn into a draw before it's realized.
pub fn probe_in_search(board: &BoardState, ply_from_root: i32, probe: &dyn TablebaseProbe) -> Option<Score> {
    if board.fifty_move_ctr() != 0 || !is_probeable(board, probe) {
        return None;
    }
    probe.probe_wdl(board).map(|wdl| wdl.to_search_score(ply_from_root))
}

/// Root DTZ consultation (§4.G step 2, §9 resolution 4): if the root is a TB
/// win, prefer a DTZ-reported move that keeps making progress over whatever
/// the main search's unextended PV would have picked.
pub fn probe_at_root(board: &BoardState, probe: &dyn TablebaseProbe) -> Option<DtzResult> {
    if !is_probeable(board, probe) {
        return None;
    }
    probe.probe_dtz(board)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_tablebase_never_probes() {
        let board = BoardState::startpos();
        let probe = NoTablebase;
        assert!(!is_probeable(&board, &probe));
        assert!(probe_in_search(&board, 0, &probe).is_none());
        assert!(probe_at_root(&board, &probe).is_none());
    }

    #[test]
    fn win_score_favors_shorter_mates_first() {
        let near = Wdl::Win.to_search_score(2);
        let far = Wdl::Win.to_search_score(10);
        assert!(near > far);
    }

    #[test]
    fn cursed_win_and_blessed_loss_both_score_as_draws() {
        assert_eq!(Wdl::CursedWin.to_search_score(5), Score::DRAW);
        assert_eq!(Wdl::BlessedLoss.to_search_score(5), Score::DRAW);
    }

    struct AlwaysWin;
    impl TablebaseProbe for AlwaysWin {
        fn max_pieces(&self) -> u32 {
            32
        }
        fn probe_wdl(&self, _board: &BoardState) -> Option<Wdl> {
            Some(Wdl::Win)
        }
        fn probe_dtz(&self, _board: &BoardState) -> Option<DtzResult> {
            None
        }
    }

    #[test]
    fn in_search_probe_declines_a_ticking_fifty_move_counter() {
        let board = BoardState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 3 5").unwrap();
        let probe = AlwaysWin;
        assert!(is_probeable(&board, &probe));
        assert!(probe_in_search(&board, 0, &probe).is_none());
    }
}
