use strum_macros::{EnumIter, FromRepr};

pub const NUM_PIECE_TYPES: usize = 6;
pub const NUM_COLORS: usize = 2;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, EnumIter, FromRepr, Hash)]
#[must_use]
pub enum PieceType {
    #[default]
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    /// Used by SEE and capture-history indexing: the conventional material values.
    pub const fn see_value(self) -> i32 {
        match self {
            PieceType::Pawn => 100,
            PieceType::Knight => 300,
            PieceType::Bishop => 300,
            PieceType::Rook => 500,
            PieceType::Queen => 900,
            PieceType::King => 10_000,
        }
    }

    pub fn non_pawns() -> impl Iterator<Item = PieceType> {
        use strum::IntoEnumIterator;
        PieceType::iter().filter(|p| *p != PieceType::Pawn)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, EnumIter, FromRepr, Hash)]
#[must_use]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const fn other(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub const fn idx(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[must_use]
pub struct Piece {
    pub color: Color,
    pub piece_type: PieceType,
}

impl Piece {
    pub const fn new(color: Color, piece_type: PieceType) -> Self {
        Piece { color, piece_type }
    }

    /// 0..12, white pieces first, matching the mailbox encoding in `BoardState`.
    pub const fn idx(self) -> usize {
        self.color.idx() * NUM_PIECE_TYPES + self.piece_type as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_color_is_involution() {
        assert_eq!(Color::White.other().other(), Color::White);
    }
}
