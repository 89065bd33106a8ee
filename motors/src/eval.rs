//! The NN evaluator is an opaque oracle: this module defines the trait the
//! search core calls through, not any network internals. `static_eval` is
//! the only method a minimal implementation needs; the lazy-update methods
//! default to falling back on it so an incremental (NNUE-style) evaluator
//! can override just the hot path without the search core knowing the
//! difference.

use gears::games::chess::board_state::BoardState;
use gears::score::Score;

/// A per-worker evaluator. Implementations may carry incremental
/// accumulator state; the trait itself stays stateless in its contract so
/// the search core never inspects what's behind it.
pub trait Eval: Send {
    /// Full static evaluation from scratch, from the side to move's
    /// perspective. The only method the search core strictly requires.
    fn static_eval(&mut self, pos: &BoardState) -> Score;

    /// Called at the start of a new search (root position pushed). Default
    /// no-op: stateless evaluators have nothing to reset.
    fn reset_new_search(&mut self, _pos: &BoardState) {}

    /// Called after a move is made, before the accumulator is actually
    /// needed, so an incremental evaluator can queue the update lazily.
    /// Default no-op, since [`Self::static_eval`] recomputes from scratch.
    fn store_lazy_updates(&mut self, _prev: &BoardState, _cur: &BoardState, _mov: gears::games::chess::moves::ChessMove) {}

    /// Applies any updates queued by [`Self::store_lazy_updates`]. Default
    /// no-op for the same reason.
    fn apply_lazy_updates(&mut self) {}
}

/// Classical 1/3/3/5/9 material count, side-to-move relative. Ambient test
/// tooling, not the NN — useful for exercising the search core without
/// pulling in network weights.
#[derive(Debug, Default, Clone)]
pub struct MaterialOnlyEval;

const MATERIAL_VALUE: [i32; 5] = [100, 300, 300, 500, 900];

impl Eval for MaterialOnlyEval {
    fn static_eval(&mut self, pos: &BoardState) -> Score {
        use gears::games::chess::pieces::PieceType;
        let mut color = pos.side_to_move();
        let mut score = 0;
        for _ in 0..2 {
            for (i, pt) in [PieceType::Pawn, PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen]
                .into_iter()
                .enumerate()
            {
                score += pos.piece_bb(color, pt).num_ones() as i32 * MATERIAL_VALUE[i];
            }
            score = -score;
            color = color.other();
        }
        Score::new(score).clamp_eval()
    }
}

/// Tapered piece-square-table evaluator, white-relative tables flipped for
/// black. Ambient test tooling alongside [`MaterialOnlyEval`]; values are a
/// placeholder hand-tuned-looking set, not an actual tuned PSQT, since the
/// NN's real weights are out of scope.
#[derive(Debug, Clone)]
pub struct PstOnlyEval {
    tables: [[i32; 64]; 12],
}

const PIECE_PHASE: [i32; 6] = [0, 1, 1, 2, 4, 0];

impl Default for PstOnlyEval {
    fn default() -> Self {
        let mut tables = [[0i32; 64]; 12];
        // pawn mg/eg: mild center/advance bonus
        for sq in 0..64 {
            let rank = sq / 8;
            tables[0][sq] = 5 * rank as i32;
            tables[1][sq] = 8 * rank as i32;
        }
        // knight/bishop mg/eg: centralization bonus
        for (base, value) in [(2, 10), (4, 8)] {
            for sq in 0..64 {
                let (r, f) = (sq / 8, sq % 8);
                let center = 3 - ((r as i32 - 3).abs().min((r as i32 - 4).abs()) + (f as i32 - 3).abs().min((f as i32 - 4).abs()));
                tables[base][sq] = center * value;
                tables[base + 1][sq] = center * value / 2;
            }
        }
        // rook/queen: flat, no positional term beyond material captured elsewhere
        // king mg: stay on the back rank; king eg: centralize
        for sq in 0..64 {
            let (r, f) = (sq / 8, sq % 8);
            tables[10][sq] = if r == 0 { 20 } else { -10 * r as i32 } - (f as i32 - 4).abs() * 2;
            let center = 3 - ((r as i32 - 3).abs().min((r as i32 - 4).abs()) + (f as i32 - 3).abs().min((f as i32 - 4).abs()));
            tables[11][sq] = center * 6;
        }
        PstOnlyEval { tables }
    }
}

impl Eval for PstOnlyEval {
    fn static_eval(&mut self, pos: &BoardState) -> Score {
        use gears::games::chess::pieces::{Color, PieceType};
        let piece_order =
            [PieceType::Pawn, PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen, PieceType::King];
        let mut mg = 0i32;
        let mut eg = 0i32;
        let mut phase = 0i32;
        for color in [Color::White, Color::Black] {
            let mut side_mg = 0i32;
            let mut side_eg = 0i32;
            for (i, pt) in piece_order.into_iter().enumerate() {
                let mg_table = i * 2;
                let eg_table = mg_table + 1;
                for sq in pos.piece_bb(color, pt).ones() {
                    let idx = match color {
                        Color::White => (sq ^ 0b111_000) as usize,
                        Color::Black => sq as usize,
                    };
                    side_mg += self.tables[mg_table][idx] + MATERIAL_VALUE.get(i).copied().unwrap_or(0);
                    side_eg += self.tables[eg_table][idx] + MATERIAL_VALUE.get(i).copied().unwrap_or(0);
                    phase += PIECE_PHASE[i];
                }
            }
            match color {
                Color::White => {
                    mg += side_mg;
                    eg += side_eg;
                }
                Color::Black => {
                    mg -= side_mg;
                    eg -= side_eg;
                }
            }
        }
        phase = phase.min(24);
        let tapered = (mg * phase + eg * (24 - phase)) / 24;
        let score = match pos.side_to_move() {
            Color::White => tapered,
            Color::Black => -tapered,
        };
        Score::new(score).clamp_eval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gears::games::chess::board_state::BoardState;

    #[test]
    fn startpos_material_is_balanced() {
        let mut eval = MaterialOnlyEval;
        assert_eq!(eval.static_eval(&BoardState::startpos()), Score::DRAW);
    }

    #[test]
    fn missing_a_rook_is_a_material_deficit() {
        let board = BoardState::from_fen("4k3/8/8/8/8/8/8/R3K3 w Q - 0 1").unwrap();
        let mut eval = MaterialOnlyEval;
        assert!(eval.static_eval(&board).value() > 0);
    }

    #[test]
    fn pst_eval_is_deterministic() {
        let board = BoardState::startpos();
        let mut eval = PstOnlyEval::default();
        let a = eval.static_eval(&board);
        let b = eval.static_eval(&board);
        assert_eq!(a, b);
    }
}
