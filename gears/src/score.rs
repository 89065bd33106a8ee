//! Signed centipawn score with named mate/tablebase thresholds, and the
//! distance-from-root adjustment that keeps mate scores meaningful when
//! they're stored in and loaded back out of the transposition table.

use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// How many plies of recursion the mate/TB score bands reserve. Must exceed
/// the maximum search depth so that every reachable mate distance fits.
pub const MAX_RECURSION: i32 = 512;

#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Debug, Default, Hash)]
#[must_use]
pub struct Score(pub i16);

impl Score {
    pub const MATED: i32 = -10_000;
    pub const MATE: i32 = 10_000;
    pub const TB_LOSS_SCORE: i32 = Self::MATED + MAX_RECURSION + 1;
    pub const TB_WIN_SCORE: i32 = Self::MATE - MAX_RECURSION - 1;
    pub const EVAL_MIN: i32 = Self::TB_LOSS_SCORE + MAX_RECURSION + 1;
    pub const EVAL_MAX: i32 = Self::TB_WIN_SCORE - MAX_RECURSION - 1;
    pub const DRAW: Score = Score(0);

    /// Sentinel returned on every "the search is unwinding, discard this"
    /// path, per the exception-free search design. Never appears in a
    /// result the iterative-deepening driver accepts.
    pub const UNDEFINED: Score = Score(-32768);

    pub const fn new(value: i32) -> Self {
        Score(value as i16)
    }

    pub const fn value(self) -> i32 {
        self.0 as i32
    }

    pub const fn mated_in(ply: i32) -> Score {
        Score::new(Self::MATED + ply)
    }

    pub const fn mate_in(ply: i32) -> Score {
        Score::new(Self::MATE - ply)
    }

    pub const fn tb_loss_in(ply: i32) -> Score {
        Score::new(Self::TB_LOSS_SCORE + ply)
    }

    pub const fn tb_win_in(ply: i32) -> Score {
        Score::new(Self::TB_WIN_SCORE - ply)
    }

    /// A small deterministic jitter around zero so repeated draws by
    /// different paths don't all compare exactly equal, matching Koivisto's
    /// `draw_random` trick (credited in the original engine).
    pub fn draw_random(seed: u64) -> Score {
        Score::new(8 - (seed & 0b1111) as i32)
    }

    pub fn is_win(self) -> bool {
        self >= Score::tb_win_in(MAX_RECURSION)
    }

    pub fn is_loss(self) -> bool {
        self <= Score::tb_loss_in(MAX_RECURSION)
    }

    pub fn is_decisive(self) -> bool {
        self.is_win() || self.is_loss()
    }

    pub fn is_draw(self) -> bool {
        self == Score::DRAW
    }

    /// Adjusts a score for storage in the TT: mate/TB scores are relative to
    /// the root when computed but must be stored as an absolute distance so
    /// that re-loading them at a different `distance_from_root` still makes
    /// sense (§3, §8 invariant 5).
    pub fn to_tt_score(self, distance_from_root: i32) -> Score {
        if self.is_win() {
            Score::new(self.value() + distance_from_root)
        } else if self.is_loss() {
            Score::new(self.value() - distance_from_root)
        } else {
            self
        }
    }

    /// Reverses [`Self::to_tt_score`].
    pub fn from_tt_score(self, distance_from_root: i32) -> Score {
        if self.is_win() {
            Score::new(self.value() - distance_from_root)
        } else if self.is_loss() {
            Score::new(self.value() + distance_from_root)
        } else {
            self
        }
    }

    /// Clamp a raw evaluation into the band that can never collide with
    /// mate/TB scores, per §7's "numerical corner cases" error-handling rule.
    pub fn clamp_eval(self) -> Score {
        Score::new(self.value().clamp(Self::EVAL_MIN, Self::EVAL_MAX))
    }

    /// UCI `cp N` / `mate ±K` formatting, per §6.
    pub fn format_uci(self) -> String {
        if self.value().abs() < Self::MATE - MAX_RECURSION {
            format!("cp {}", self.value())
        } else {
            let dist = Self::MATE - self.value().abs();
            let full_moves = (dist + 1) / 2;
            let signed = if self.value() > 0 { full_moves } else { -full_moves };
            format!("mate {signed}")
        }
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_uci())
    }
}

impl Neg for Score {
    type Output = Score;
    fn neg(self) -> Score {
        Score::new(-self.value())
    }
}

impl Add for Score {
    type Output = Score;
    fn add(self, rhs: Score) -> Score {
        Score::new(self.value() + rhs.value())
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        *self = *self + rhs;
    }
}

impl Sub for Score {
    type Output = Score;
    fn sub(self, rhs: Score) -> Score {
        Score::new(self.value() - rhs.value())
    }
}

impl SubAssign for Score {
    fn sub_assign(&mut self, rhs: Score) {
        *self = *self - rhs;
    }
}

impl Add<i32> for Score {
    type Output = Score;
    fn add(self, rhs: i32) -> Score {
        Score::new(self.value() + rhs)
    }
}

impl Sub<i32> for Score {
    type Output = Score;
    fn sub(self, rhs: i32) -> Score {
        Score::new(self.value() - rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tt_round_trip_preserves_mate_distance_at_matching_ply() {
        for distance_from_root in [0, 1, 10, 40] {
            let mate = Score::mate_in(5);
            let stored = mate.to_tt_score(distance_from_root);
            let loaded = stored.from_tt_score(distance_from_root);
            assert_eq!(loaded, mate);
        }
    }

    #[test]
    fn mate_in_n_is_a_win() {
        assert!(Score::mate_in(5).is_win());
        assert!(Score::mated_in(5).is_loss());
        assert!(!Score::DRAW.is_decisive());
    }

    #[test]
    fn formats_mate_scores_as_uci_expects() {
        assert_eq!(Score::mate_in(1).format_uci(), "mate 1");
        assert_eq!(Score::mated_in(1).format_uci(), "mate -1");
        assert_eq!(Score::new(37).format_uci(), "cp 37");
    }
}
