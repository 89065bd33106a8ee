use crate::games::chess::pieces::PieceType;
use crate::games::chess::squares::ChessSquare;
use std::fmt::{Display, Formatter};

/// 16-bit plain-old-data move: `{from:6, to:6, flag:4}`. Trivially copyable,
/// no heap allocation — this is the wire encoding stored in the TT and
/// passed through the search stack.
///
/// Castling is encoded king-captures-own-rook (`from` = king square, `to` =
/// the rook's square) for Chess960 compatibility; the UCI-facing
/// king-to-g/c representation is a presentation-layer concern (Non-goal).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[must_use]
pub struct ChessMove(u16);

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[must_use]
#[repr(u8)]
pub enum MoveFlag {
    Quiet = 0,
    DoublePawnPush = 1,
    CastleASide = 2,
    CastleHSide = 3,
    Capture = 4,
    EnPassant = 5,
    PromoKnight = 6,
    PromoBishop = 7,
    PromoRook = 8,
    PromoQueen = 9,
    PromoKnightCapture = 10,
    PromoBishopCapture = 11,
    PromoRookCapture = 12,
    PromoQueenCapture = 13,
}

impl MoveFlag {
    pub const fn is_capture(self) -> bool {
        matches!(
            self,
            MoveFlag::Capture
                | MoveFlag::EnPassant
                | MoveFlag::PromoKnightCapture
                | MoveFlag::PromoBishopCapture
                | MoveFlag::PromoRookCapture
                | MoveFlag::PromoQueenCapture
        )
    }

    pub const fn is_promotion(self) -> bool {
        matches!(
            self,
            MoveFlag::PromoKnight
                | MoveFlag::PromoBishop
                | MoveFlag::PromoRook
                | MoveFlag::PromoQueen
                | MoveFlag::PromoKnightCapture
                | MoveFlag::PromoBishopCapture
                | MoveFlag::PromoRookCapture
                | MoveFlag::PromoQueenCapture
        )
    }

    pub const fn promo_piece(self) -> Option<PieceType> {
        Some(match self {
            MoveFlag::PromoKnight | MoveFlag::PromoKnightCapture => PieceType::Knight,
            MoveFlag::PromoBishop | MoveFlag::PromoBishopCapture => PieceType::Bishop,
            MoveFlag::PromoRook | MoveFlag::PromoRookCapture => PieceType::Rook,
            MoveFlag::PromoQueen | MoveFlag::PromoQueenCapture => PieceType::Queen,
            _ => return None,
        })
    }

    pub const fn is_castle(self) -> bool {
        matches!(self, MoveFlag::CastleASide | MoveFlag::CastleHSide)
    }

    const fn from_bits(bits: u8) -> Self {
        match bits {
            0 => MoveFlag::Quiet,
            1 => MoveFlag::DoublePawnPush,
            2 => MoveFlag::CastleASide,
            3 => MoveFlag::CastleHSide,
            4 => MoveFlag::Capture,
            5 => MoveFlag::EnPassant,
            6 => MoveFlag::PromoKnight,
            7 => MoveFlag::PromoBishop,
            8 => MoveFlag::PromoRook,
            9 => MoveFlag::PromoQueen,
            10 => MoveFlag::PromoKnightCapture,
            11 => MoveFlag::PromoBishopCapture,
            12 => MoveFlag::PromoRookCapture,
            13 => MoveFlag::PromoQueenCapture,
            _ => MoveFlag::Quiet,
        }
    }
}

impl ChessMove {
    pub const UNINITIALIZED: ChessMove = ChessMove(0);

    pub fn new(from: ChessSquare, to: ChessSquare, flag: MoveFlag) -> Self {
        ChessMove((from.bb_idx() as u16) | ((to.bb_idx() as u16) << 6) | ((flag as u16) << 12))
    }

    pub const fn from_bits(bits: u16) -> Self {
        ChessMove(bits)
    }

    pub const fn to_bits(self) -> u16 {
        self.0
    }

    pub fn src_square(self) -> ChessSquare {
        ChessSquare::new((self.0 & 0x3f) as u8)
    }

    pub fn dest_square(self) -> ChessSquare {
        ChessSquare::new(((self.0 >> 6) & 0x3f) as u8)
    }

    pub fn flag(self) -> MoveFlag {
        MoveFlag::from_bits((self.0 >> 12) as u8)
    }

    pub fn is_null(self) -> bool {
        self == ChessMove::UNINITIALIZED
    }

    /// Index into move-keyed history tables: `from*64+to`, 4096 entries.
    pub fn from_to_idx(self) -> usize {
        (self.0 & 0xfff) as usize
    }
}

impl Display for ChessMove {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.src_square(), self.dest_square())?;
        if let Some(promo) = self.flag().promo_piece() {
            let c = match promo {
                PieceType::Knight => 'n',
                PieceType::Bishop => 'b',
                PieceType::Rook => 'r',
                PieceType::Queen => 'q',
                _ => unreachable!(),
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChessMove {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}({:?})", self.flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::chess::squares::sq;

    #[test]
    fn round_trips_through_bits() {
        let mov = ChessMove::new(sq("e2"), sq("e4"), MoveFlag::DoublePawnPush);
        let bits = mov.to_bits();
        assert_eq!(ChessMove::from_bits(bits), mov);
        assert_eq!(mov.src_square(), sq("e2"));
        assert_eq!(mov.dest_square(), sq("e4"));
        assert_eq!(mov.flag(), MoveFlag::DoublePawnPush);
    }

    #[test]
    fn default_move_is_null() {
        assert!(ChessMove::default().is_null());
    }

    #[test]
    fn capture_flags_agree_with_is_capture() {
        assert!(MoveFlag::PromoQueenCapture.is_capture());
        assert!(MoveFlag::PromoQueenCapture.is_promotion());
        assert!(!MoveFlag::Quiet.is_capture());
    }
}
