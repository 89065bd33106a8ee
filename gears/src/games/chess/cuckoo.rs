//! Cuckoo hash table for O(1) upcoming-repetition detection.
//!
//! Based on M. N. J. van Kervinck, "A fast software-based method for
//! upcoming cycle detection in search trees".
//! <https://web.archive.org/web/20180713113001/http://marcelk.net/2013-04-06/paper/upcoming-rep-v2.pdf>

use crate::games::PosHash;
use crate::games::ZobristHistory;
use crate::games::chess::board_state::BoardState;
use crate::games::chess::movegen::attack_bb;
use crate::games::chess::moves::{ChessMove, MoveFlag};
use crate::games::chess::pieces::{Color, PieceType};
use crate::games::chess::squares::ChessSquare;
use crate::games::chess::zobrist::ZOBRIST_KEYS;
use crate::general::bitboards::{Bitboard, ray_between_exclusive};
use std::sync::LazyLock;

const SIZE: usize = 8192;
const MASK: u64 = (SIZE as u64) - 1;

fn h1(hash: u64) -> usize {
    ((hash >> 32) & MASK) as usize
}

fn h2(hash: u64) -> usize {
    ((hash >> 48) & MASK) as usize
}

pub struct CuckooTable {
    hashes: Vec<u64>,
    moves: Vec<ChessMove>,
}

fn is_reversible(pt: PieceType, from: ChessSquare, to: ChessSquare) -> bool {
    if pt == PieceType::Pawn {
        return false;
    }
    attack_bb(pt, from, Bitboard::EMPTY).is_bit_set_at(to.bb_idx())
}

fn build() -> CuckooTable {
    let mut hashes = vec![0u64; SIZE];
    let mut moves = vec![ChessMove::default(); SIZE];
    let mut count = 0;

    for color in [Color::White, Color::Black] {
        for pt in PieceType::non_pawns() {
            for from in ChessSquare::iter() {
                for to in ChessSquare::iter() {
                    if to.bb_idx() <= from.bb_idx() {
                        continue;
                    }
                    if !is_reversible(pt, from, to) {
                        continue;
                    }
                    let mut mov = ChessMove::new(from, to, MoveFlag::Quiet);
                    let mut hash = ZOBRIST_KEYS.piece_key(pt, color, from).0
                        ^ ZOBRIST_KEYS.piece_key(pt, color, to).0
                        ^ ZOBRIST_KEYS.side_to_move_key;
                    let mut idx = h1(hash);
                    loop {
                        std::mem::swap(&mut hashes[idx], &mut hash);
                        std::mem::swap(&mut moves[idx], &mut mov);
                        if mov.is_null() {
                            break;
                        }
                        idx = if idx == h1(hash) { h2(hash) } else { h1(hash) };
                    }
                    count += 1;
                }
            }
        }
    }
    debug_assert_eq!(count, 3668, "expected exactly 3668 reversible moves on an empty board");
    CuckooTable { hashes, moves }
}

pub static CUCKOO_TABLE: LazyLock<CuckooTable> = LazyLock::new(build);

/// Forces eager initialization of the table, so the (short) build cost isn't
/// paid inside the first search call.
pub fn force_init() {
    let _ = LazyLock::force(&CUCKOO_TABLE);
}

/// True iff the side to move has a legal reversible move that would create a
/// repetition of a position already seen within the fifty-move window, even
/// before playing it (a "cursed-win" avoidance: this preserves draw scores
/// on ladders where the opponent can always force repetition one move away).
pub fn has_upcoming_repetition(board: &BoardState, history: &ZobristHistory) -> bool {
    if board.fifty_move_ctr() < 3 || history.is_empty() {
        return false;
    }
    has_upcoming_repetition_impl(&CUCKOO_TABLE, board, history)
}

fn has_upcoming_repetition_impl(table: &CuckooTable, board: &BoardState, history: &ZobristHistory) -> bool {
    let n = history.len();
    let max_lookback = (board.fifty_move_ctr() as usize).min(n);
    let mut their_delta =
        board.hash_pos().0 ^ history.0[n - 1].0 ^ ZOBRIST_KEYS.side_to_move_key;

    let mut i = 3;
    while i <= max_lookback {
        their_delta ^= history.0[n - i + 1].0 ^ history.0[n - i].0 ^ ZOBRIST_KEYS.side_to_move_key;
        if their_delta != 0 {
            i += 2;
            continue;
        }
        let diff = board.hash_pos().0 ^ history.0[n - i].0;
        let mut idx = h1(diff);
        if table.hashes[idx] != diff {
            idx = h2(diff);
            if table.hashes[idx] != diff {
                i += 2;
                continue;
            }
        }
        let (src, dest) = (table.moves[idx].src_square(), table.moves[idx].dest_square());
        let ray = ray_between_exclusive(src.bb_idx() as u8, dest.bb_idx() as u8);
        if (ray & board.occupied_bb()).has_set_bit() {
            i += 2;
            continue;
        }
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::chess::moves::MoveFlag;
    use crate::games::chess::squares::sq;

    #[test]
    fn table_contains_a_known_reversible_move() {
        let table = build();
        let mov = ChessMove::new(sq("g1"), sq("f3"), MoveFlag::Quiet);
        assert!(table.moves.contains(&mov));
    }

    #[test]
    fn detects_a_reachable_repetition() {
        force_init();
        let mut board = BoardState::from_fen("7k/8/8/8/8/8/8/R6K w - - 0 1").unwrap();
        let mut hist = ZobristHistory::default();
        let moves = [
            ChessMove::new(sq("a1"), sq("b1"), MoveFlag::Quiet),
            ChessMove::new(sq("h8"), sq("g8"), MoveFlag::Quiet),
            ChessMove::new(sq("b1"), sq("a1"), MoveFlag::Quiet),
        ];
        for mov in moves {
            hist.push(board.hash_pos());
            board.apply_move(mov);
        }
        // black to move, rook back on a1, king on g8: g8-h8 would recreate
        // the very first position pushed into `hist`
        assert!(has_upcoming_repetition(&board, &hist));
    }

    #[test]
    fn no_upcoming_repetition_without_history() {
        force_init();
        let board = BoardState::from_fen("7k/8/8/8/8/8/8/R6K w - - 3 4").unwrap();
        assert!(!has_upcoming_repetition(&board, &ZobristHistory::default()));
    }
}
