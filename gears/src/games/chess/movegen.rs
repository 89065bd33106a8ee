//! Attack tables and legal move generation. Per the move-generation Non-goal,
//! this is a conventional ray-based (not magic-bitboard) slider implementation:
//! correct and unsurprising, not the part of the engine under specification.

use crate::games::chess::board_state::BoardState;
use crate::games::chess::castling::CastleSide;
use crate::games::chess::moves::{ChessMove, MoveFlag};
use crate::games::chess::pieces::{Color, PieceType};
use crate::games::chess::squares::{ChessSquare, NUM_SQUARES};
use crate::general::bitboards::{Bitboard, FILE_A, FILE_H};
use std::sync::LazyLock;

struct AttackTables {
    knight: [Bitboard; NUM_SQUARES],
    king: [Bitboard; NUM_SQUARES],
}

fn knight_attacks_from(sq: u8) -> Bitboard {
    let bb = Bitboard::from_square(sq);
    let not_a = !FILE_A;
    let not_h = !FILE_H;
    let not_ab = Bitboard(not_a.0 & (not_a.0 >> 1 | 0)) & Bitboard(!(FILE_A.0 | (FILE_A.0 << 1)));
    let not_gh = Bitboard(!(FILE_H.0 | (FILE_H.0 >> 1)));
    let mut res = Bitboard::EMPTY;
    // the 8 knight deltas, masked so wraps around file edges don't leak
    let deltas: [(i32, Bitboard); 8] = [
        (17, not_a),
        (15, not_h),
        (10, not_ab),
        (6, not_gh),
        (-17, not_h),
        (-15, not_a),
        (-10, not_gh),
        (-6, not_ab),
    ];
    for (delta, mask) in deltas {
        let shifted = if delta >= 0 {
            bb.0.checked_shl(delta as u32).unwrap_or(0)
        } else {
            bb.0.checked_shr((-delta) as u32).unwrap_or(0)
        };
        res |= Bitboard(shifted) & mask;
    }
    res
}

fn king_attacks_from(sq: u8) -> Bitboard {
    let bb = Bitboard::from_square(sq);
    let not_a = !FILE_A;
    let not_h = !FILE_H;
    let mut res = Bitboard::EMPTY;
    for (delta, mask) in [
        (8i32, Bitboard::ALL),
        (-8, Bitboard::ALL),
        (1, not_h),
        (-1, not_a),
        (9, not_h),
        (7, not_a),
        (-9, not_a),
        (-7, not_h),
    ] {
        let shifted = if delta >= 0 {
            bb.0.checked_shl(delta as u32).unwrap_or(0)
        } else {
            bb.0.checked_shr((-delta) as u32).unwrap_or(0)
        };
        res |= Bitboard(shifted) & mask;
    }
    res
}

impl AttackTables {
    fn generate() -> Self {
        let mut knight = [Bitboard::EMPTY; NUM_SQUARES];
        let mut king = [Bitboard::EMPTY; NUM_SQUARES];
        for s in 0..64u8 {
            knight[s as usize] = knight_attacks_from(s);
            king[s as usize] = king_attacks_from(s);
        }
        AttackTables { knight, king }
    }
}

static ATTACK_TABLES: LazyLock<AttackTables> = LazyLock::new(AttackTables::generate);

const fn ray_dirs(pt: PieceType) -> &'static [(i32, i32)] {
    match pt {
        PieceType::Rook => &[(1, 0), (-1, 0), (0, 1), (0, -1)],
        PieceType::Bishop => &[(1, 1), (1, -1), (-1, 1), (-1, -1)],
        PieceType::Queen => &[
            (1, 0),
            (-1, 0),
            (0, 1),
            (0, -1),
            (1, 1),
            (1, -1),
            (-1, 1),
            (-1, -1),
        ],
        _ => &[],
    }
}

fn slider_attacks(sq: ChessSquare, occupied: Bitboard, pt: PieceType) -> Bitboard {
    let mut res = Bitboard::EMPTY;
    let (rank, file) = (sq.rank() as i32, sq.file() as i32);
    for &(dr, df) in ray_dirs(pt) {
        let (mut r, mut f) = (rank + dr, file + df);
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let dest = ChessSquare::from_rank_file(r as u8, f as u8);
            res |= Bitboard::from_square(dest.bb_idx() as u8);
            if occupied.is_bit_set_at(dest.bb_idx()) {
                break;
            }
            r += dr;
            f += df;
        }
    }
    res
}

fn pawn_attacks_from(sq: ChessSquare, color: Color) -> Bitboard {
    let (rank, file) = (sq.rank() as i32, sq.file() as i32);
    let dr = match color {
        Color::White => 1,
        Color::Black => -1,
    };
    let mut res = Bitboard::EMPTY;
    for df in [-1, 1] {
        let (r, f) = (rank + dr, file + df);
        if (0..8).contains(&r) && (0..8).contains(&f) {
            res |= Bitboard::from_square(ChessSquare::from_rank_file(r as u8, f as u8).bb_idx() as u8);
        }
    }
    res
}

/// Attacks a piece of type `pt` on `sq` would give, against `occupied`.
/// This is the function x-ray reveals in SEE and the cuckoo table's
/// reversible-move check both call.
pub fn attack_bb(pt: PieceType, sq: ChessSquare, occupied: Bitboard) -> Bitboard {
    match pt {
        PieceType::Knight => ATTACK_TABLES.knight[sq.bb_idx()],
        PieceType::King => ATTACK_TABLES.king[sq.bb_idx()],
        PieceType::Rook | PieceType::Bishop | PieceType::Queen => slider_attacks(sq, occupied, pt),
        PieceType::Pawn => Bitboard::EMPTY, // pawn attacks are color-dependent; use pawn_attack_bb
    }
}

pub fn pawn_attack_bb(sq: ChessSquare, color: Color) -> Bitboard {
    pawn_attacks_from(sq, color)
}

/// All squares attacked by any piece of `color` on `board`, used for
/// check/legality testing and threat-bitboard maintenance.
pub fn squares_attacked_by(board: &BoardState, color: Color) -> Bitboard {
    let occupied = board.occupied_bb();
    let mut res = Bitboard::EMPTY;
    for pt in [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ] {
        for s in board.piece_bb(color, pt).ones() {
            let sq = ChessSquare::new(s);
            res |= if pt == PieceType::Pawn {
                pawn_attack_bb(sq, color)
            } else {
                attack_bb(pt, sq, occupied)
            };
        }
    }
    res
}

pub fn is_in_check(board: &BoardState, color: Color) -> bool {
    let king_sq = board.king_square(color);
    squares_attacked_by_excluding_king(board, color.other()).is_bit_set_at(king_sq.bb_idx())
}

/// Attacked squares, but sliders see through the moving side's king (needed
/// when testing whether a king move leaves it in check: the king must not
/// "block its own check" by having just vacated the square).
fn squares_attacked_by_excluding_king(board: &BoardState, color: Color) -> Bitboard {
    let occupied = board.occupied_bb() & !board.piece_bb(color.other(), PieceType::King);
    let mut res = Bitboard::EMPTY;
    for pt in [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ] {
        for s in board.piece_bb(color, pt).ones() {
            let sq = ChessSquare::new(s);
            res |= if pt == PieceType::Pawn {
                pawn_attack_bb(sq, color)
            } else {
                attack_bb(pt, sq, occupied)
            };
        }
    }
    res
}

/// Generates pseudo-legal moves (does not yet filter moves that leave the
/// king in check) split into loud and quiet lists.
fn pseudolegal_moves(board: &BoardState, loud_only: bool) -> Vec<ChessMove> {
    let mut moves = Vec::with_capacity(64);
    let us = board.side_to_move();
    let them = us.other();
    let occupied = board.occupied_bb();
    let our_occ = board.color_bb(us);
    let their_occ = board.color_bb(them);

    for pt in [
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ] {
        for from in board.piece_bb(us, pt).ones() {
            let from_sq = ChessSquare::new(from);
            let targets = attack_bb(pt, from_sq, occupied) & !our_occ;
            for to in targets.ones() {
                let to_sq = ChessSquare::new(to);
                let is_capture = their_occ.is_bit_set_at(to as usize);
                if loud_only && !is_capture {
                    continue;
                }
                let flag = if is_capture {
                    MoveFlag::Capture
                } else {
                    MoveFlag::Quiet
                };
                moves.push(ChessMove::new(from_sq, to_sq, flag));
            }
        }
    }

    generate_pawn_moves(board, us, them, occupied, their_occ, loud_only, &mut moves);
    if !loud_only {
        generate_castling_moves(board, us, occupied, &mut moves);
    }
    moves
}

fn generate_pawn_moves(
    board: &BoardState,
    us: Color,
    them: Color,
    occupied: Bitboard,
    their_occ: Bitboard,
    loud_only: bool,
    moves: &mut Vec<ChessMove>,
) {
    let (push, start_rank, promo_rank) = match us {
        Color::White => (8i32, 1u8, 7u8),
        Color::Black => (-8i32, 6u8, 0u8),
    };
    for from in board.piece_bb(us, PieceType::Pawn).ones() {
        let from_sq = ChessSquare::new(from);
        let single = from as i32 + push;
        let promoting = (single / 8) as u8 == promo_rank;
        if (0..64).contains(&single) && !occupied.is_bit_set_at(single as usize) {
            let to_sq = ChessSquare::new(single as u8);
            if promoting {
                for flag in [
                    MoveFlag::PromoQueen,
                    MoveFlag::PromoRook,
                    MoveFlag::PromoBishop,
                    MoveFlag::PromoKnight,
                ] {
                    moves.push(ChessMove::new(from_sq, to_sq, flag));
                }
            } else if !loud_only {
                moves.push(ChessMove::new(from_sq, to_sq, MoveFlag::Quiet));
                if from_sq.rank() == start_rank {
                    let double = from as i32 + 2 * push;
                    if !occupied.is_bit_set_at(double as usize) {
                        moves.push(ChessMove::new(
                            from_sq,
                            ChessSquare::new(double as u8),
                            MoveFlag::DoublePawnPush,
                        ));
                    }
                }
            }
        }
        let attacks = pawn_attack_bb(from_sq, us);
        for to in attacks.ones() {
            let to_sq = ChessSquare::new(to);
            if their_occ.is_bit_set_at(to as usize) {
                if promoting {
                    for flag in [
                        MoveFlag::PromoQueenCapture,
                        MoveFlag::PromoRookCapture,
                        MoveFlag::PromoBishopCapture,
                        MoveFlag::PromoKnightCapture,
                    ] {
                        moves.push(ChessMove::new(from_sq, to_sq, flag));
                    }
                } else {
                    moves.push(ChessMove::new(from_sq, to_sq, MoveFlag::Capture));
                }
            } else if Some(to_sq) == board.ep_square() {
                moves.push(ChessMove::new(from_sq, to_sq, MoveFlag::EnPassant));
            }
        }
    }
    let _ = them;
}

fn generate_castling_moves(board: &BoardState, us: Color, occupied: Bitboard, moves: &mut Vec<ChessMove>) {
    let king_sq = board.king_square(us);
    if is_in_check(board, us) {
        return;
    }
    for rook_sq in board.castling_rights().rook_squares() {
        let on_back_rank = rook_sq.rank() == king_sq.rank();
        let our_rank = match us {
            Color::White => 0,
            Color::Black => 7,
        };
        if !on_back_rank || king_sq.rank() != our_rank {
            continue;
        }
        let side = if rook_sq.file() < king_sq.file() {
            CastleSide::ASide
        } else {
            CastleSide::HSide
        };
        let (king_dest_file, rook_dest_file) = match side {
            CastleSide::ASide => (2u8, 3u8),
            CastleSide::HSide => (6u8, 5u8),
        };
        let king_dest = ChessSquare::from_rank_file(our_rank, king_dest_file);
        let rook_dest = ChessSquare::from_rank_file(our_rank, rook_dest_file);
        let relevant = crate::general::bitboards::ray_between_exclusive(king_sq.bb_idx() as u8, rook_sq.bb_idx() as u8)
            | Bitboard::from_square(king_dest.bb_idx() as u8)
            | Bitboard::from_square(rook_dest.bb_idx() as u8);
        let relevant_minus_movers = relevant
            & !Bitboard::from_square(king_sq.bb_idx() as u8)
            & !Bitboard::from_square(rook_sq.bb_idx() as u8);
        if (occupied & relevant_minus_movers).has_set_bit() {
            continue;
        }
        // every square the king passes through, inclusive, must not be attacked
        let king_path = crate::general::bitboards::ray_between_exclusive(king_sq.bb_idx() as u8, king_dest.bb_idx() as u8)
            | Bitboard::from_square(king_sq.bb_idx() as u8)
            | Bitboard::from_square(king_dest.bb_idx() as u8);
        let attacked = squares_attacked_by_excluding_king(board, us.other());
        if (king_path & attacked).has_set_bit() {
            continue;
        }
        let flag = match side {
            CastleSide::ASide => MoveFlag::CastleASide,
            CastleSide::HSide => MoveFlag::CastleHSide,
        };
        moves.push(ChessMove::new(king_sq, rook_sq, flag));
    }
}

/// A cheap partial validator for moves from an untrusted source (the TT):
/// checks that the move is structurally consistent with the current
/// position without fully replaying legality. Never panics on garbage input.
pub fn is_legal(board: &BoardState, mov: ChessMove) -> bool {
    if mov.is_null() {
        return false;
    }
    let us = board.side_to_move();
    let from = mov.src_square();
    let Some(moving) = board.piece_at(from) else {
        return false;
    };
    if moving.color != us {
        return false;
    }
    pseudolegal_moves(board, false).contains(&mov) && board.clone().try_apply_move(mov)
}

pub fn pseudolegal_to_legal(board: &BoardState, pseudo: Vec<ChessMove>) -> Vec<ChessMove> {
    pseudo
        .into_iter()
        .filter(|&m| board.clone().try_apply_move(m))
        .collect()
}

pub fn legal_moves(board: &BoardState) -> Vec<ChessMove> {
    pseudolegal_to_legal(board, pseudolegal_moves(board, false))
}

pub fn loud_moves(board: &BoardState) -> Vec<ChessMove> {
    pseudolegal_to_legal(board, pseudolegal_moves(board, true))
}

pub fn quiet_moves(board: &BoardState) -> Vec<ChessMove> {
    legal_moves(board)
        .into_iter()
        .filter(|m| !m.flag().is_capture() && !m.flag().is_promotion())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::chess::board_state::BoardState;

    #[test]
    fn startpos_has_twenty_legal_moves() {
        let board = BoardState::startpos();
        assert_eq!(legal_moves(&board).len(), 20);
    }

    #[test]
    fn every_legal_move_passes_is_legal() {
        let board = BoardState::startpos();
        for m in legal_moves(&board) {
            assert!(is_legal(&board, m), "{m} should be legal");
        }
    }

    #[test]
    fn garbage_move_is_rejected_without_panicking() {
        let board = BoardState::startpos();
        let garbage = ChessMove::from_bits(0xffff);
        assert!(!is_legal(&board, garbage));
    }
}
