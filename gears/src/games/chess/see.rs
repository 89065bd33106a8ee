//! Static exchange evaluation: `see_ge(board, move, threshold)` returns true
//! iff the side to move gains at least `threshold` from a full capture
//! sequence on the move's destination square, assuming both sides play
//! least-valuable-attacker-first.

use crate::games::chess::board_state::BoardState;
use crate::games::chess::movegen::attack_bb;
use crate::games::chess::moves::{ChessMove, MoveFlag};
use crate::games::chess::pieces::{Color, PieceType};
use crate::games::chess::squares::ChessSquare;
use crate::general::bitboards::Bitboard;

const SEE_ORDER: [PieceType; 6] = [
    PieceType::Pawn,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Rook,
    PieceType::Queen,
    PieceType::King,
];

fn all_attackers_to(board: &BoardState, sq: ChessSquare, occupied: Bitboard) -> Bitboard {
    let mut attackers = Bitboard::EMPTY;
    for color in [Color::White, Color::Black] {
        for pt in SEE_ORDER {
            for from in board.piece_bb(color, pt).ones() {
                let from_sq = ChessSquare::new(from);
                let reaches = if pt == PieceType::Pawn {
                    crate::games::chess::movegen::pawn_attack_bb(from_sq, color)
                } else {
                    attack_bb(pt, from_sq, occupied)
                };
                if reaches.is_bit_set_at(sq.bb_idx()) {
                    attackers |= Bitboard::from_square(from);
                }
            }
        }
    }
    attackers
}

/// Least-valuable attacker belonging to `color` among `attackers`, if any.
fn least_valuable_attacker(
    board: &BoardState,
    attackers: Bitboard,
    color: Color,
) -> Option<(ChessSquare, PieceType)> {
    for pt in SEE_ORDER {
        let candidates = attackers & board.piece_bb(color, pt);
        if candidates.has_set_bit() {
            return Some((ChessSquare::new(candidates.lsb()), pt));
        }
    }
    None
}

/// Full swap-list SEE: returns the net material gain (in centipawns) for the
/// side to move if both sides continue capturing on `mov`'s destination
/// square with least-valuable-attacker-first play.
pub fn see(board: &BoardState, mov: ChessMove) -> i32 {
    let to = mov.dest_square();
    let from = mov.src_square();
    let us = board.side_to_move();
    let flag = mov.flag();

    let mut occupied = board.occupied_bb();
    let mut attackers = all_attackers_to(board, to, occupied);

    let mut gain = [0i32; 32];
    let mut depth = 0usize;

    let mut victim_value = if flag == MoveFlag::EnPassant {
        PieceType::Pawn.see_value()
    } else {
        board.piece_at(to).map(|p| p.piece_type.see_value()).unwrap_or(0)
    };
    let mut attacker_pt = board.piece_at(from).expect("see requires a piece on from").piece_type;

    gain[depth] = victim_value;

    // remove the initial mover from the board and, for en passant, also the captured pawn
    occupied &= !Bitboard::from_square(from.bb_idx() as u8);
    attackers &= !Bitboard::from_square(from.bb_idx() as u8);
    if flag == MoveFlag::EnPassant {
        let captured_sq = ChessSquare::from_rank_file(from.rank(), to.file());
        occupied &= !Bitboard::from_square(captured_sq.bb_idx() as u8);
        attackers &= !Bitboard::from_square(captured_sq.bb_idx() as u8);
    }
    reveal_xrays(board, to, from, occupied, &mut attackers);

    if let Some(promo) = flag.promo_piece() {
        victim_value = attacker_pt.see_value(); // irrelevant after first ply, kept for symmetry
        attacker_pt = promo;
        gain[depth] += promo.see_value() - PieceType::Pawn.see_value();
    }
    let _ = victim_value;

    let mut side = us.other();
    loop {
        let Some((from_sq, pt)) = least_valuable_attacker(board, attackers, side) else {
            break;
        };
        depth += 1;
        gain[depth] = attacker_pt.see_value() - gain[depth - 1];
        if gain[depth].max(-gain[depth - 1]) < 0 {
            // the exchange is already hopeless for this side; it won't capture
            depth -= 1;
            break;
        }
        attacker_pt = pt;
        occupied &= !Bitboard::from_square(from_sq.bb_idx() as u8);
        attackers &= !Bitboard::from_square(from_sq.bb_idx() as u8);
        reveal_xrays(board, to, from_sq, occupied, &mut attackers);
        side = side.other();
        if attacker_pt == PieceType::King && (attackers & board.color_bb(side)).has_set_bit() {
            // the king can't recapture into an attacked square; stop as if it had no attacker
            depth -= 1;
            break;
        }
    }

    while depth > 0 {
        gain[depth - 1] = -gain[depth].max(-gain[depth - 1]);
        depth -= 1;
    }
    gain[0]
}

/// Re-adds any slider whose line to `target` is revealed now that the piece
/// on `vacated` has left the board. Recomputing each slider's attack set
/// against the updated occupancy naturally accounts for newly-opened lines,
/// so no alignment check against `vacated` is needed.
fn reveal_xrays(board: &BoardState, target: ChessSquare, vacated: ChessSquare, occupied: Bitboard, attackers: &mut Bitboard) {
    let _ = vacated;
    for color in [Color::White, Color::Black] {
        for pt in [PieceType::Bishop, PieceType::Rook, PieceType::Queen] {
            for from in board.piece_bb(color, pt).ones() {
                let from_sq = ChessSquare::new(from);
                if attack_bb(pt, from_sq, occupied).is_bit_set_at(target.bb_idx()) {
                    *attackers |= Bitboard::from_square(from);
                }
            }
        }
    }
}

/// Null-window SEE test: `see(board, mov) >= threshold`, matching the
/// boolean predicate search uses for pruning.
pub fn see_ge(board: &BoardState, mov: ChessMove, threshold: i32) -> bool {
    see(board, mov) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::chess::board_state::BoardState;
    use crate::games::chess::squares::sq;

    #[test]
    fn trivial_pawn_takes_pawn_is_zero_sum() {
        let board = BoardState::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let mov = ChessMove::new(sq("e4"), sq("d5"), MoveFlag::Capture);
        assert_eq!(see(&board, mov), PieceType::Pawn.see_value());
    }

    #[test]
    fn see_ge_matches_see_threshold() {
        let board = BoardState::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let mov = ChessMove::new(sq("e4"), sq("d5"), MoveFlag::Capture);
        assert!(see_ge(&board, mov, PieceType::Pawn.see_value()));
        assert!(!see_ge(&board, mov, PieceType::Pawn.see_value() + 1));
    }

    #[test]
    fn losing_exchange_is_negative() {
        // white rook takes a pawn defended by a black pawn: loses the exchange
        let board = BoardState::from_fen("4k3/8/3p4/3p4/8/8/3R4/4K3 w - - 0 1").unwrap();
        let mov = ChessMove::new(sq("d2"), sq("d5"), MoveFlag::Capture);
        assert!(see(&board, mov) < 0);
    }
}
