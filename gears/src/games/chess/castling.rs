use crate::games::chess::pieces::Color;
use crate::games::chess::squares::ChessSquare;

/// Castling rights as a bitboard of rook squares, as the data model requires
/// (this is what makes the encoding Chess960-safe: the king's destination
/// square is derived from the rook's starting file rather than assumed to
/// be c/g-file).
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug, Hash)]
#[must_use]
pub struct CastlingRights(u64);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CastleSide {
    ASide,
    HSide,
}

impl CastlingRights {
    pub const EMPTY: CastlingRights = CastlingRights(0);

    pub fn grant(&mut self, rook_square: ChessSquare) {
        self.0 |= 1 << rook_square.bb_idx();
    }

    pub fn revoke(&mut self, rook_square: ChessSquare) {
        self.0 &= !(1 << rook_square.bb_idx());
    }

    /// Revoke every right belonging to `color`, called when that side's king moves.
    pub fn revoke_color(&mut self, color: Color) {
        let mask: u64 = match color {
            Color::White => 0x0000_0000_0000_00ff,
            Color::Black => 0xff00_0000_0000_0000,
        };
        self.0 &= !mask;
    }

    pub fn has_right(&self, rook_square: ChessSquare) -> bool {
        self.0 & (1 << rook_square.bb_idx()) != 0
    }

    pub fn rook_squares(&self) -> impl Iterator<Item = ChessSquare> + '_ {
        let bits = self.0;
        (0..64u8)
            .filter(move |&b| bits & (1 << b) != 0)
            .map(ChessSquare::new)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::chess::squares::sq;

    #[test]
    fn grant_and_revoke_roundtrip() {
        let mut rights = CastlingRights::EMPTY;
        rights.grant(sq("a1"));
        rights.grant(sq("h1"));
        assert!(rights.has_right(sq("a1")));
        rights.revoke(sq("a1"));
        assert!(!rights.has_right(sq("a1")));
        assert!(rights.has_right(sq("h1")));
    }

    #[test]
    fn revoke_color_only_affects_that_sides_rank() {
        let mut rights = CastlingRights::EMPTY;
        rights.grant(sq("a1"));
        rights.grant(sq("a8"));
        rights.revoke_color(Color::White);
        assert!(!rights.has_right(sq("a1")));
        assert!(rights.has_right(sq("a8")));
    }
}
