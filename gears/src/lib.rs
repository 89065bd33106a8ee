//! Board representation and position primitives that the search core builds on.
//!
//! Move generation itself (legal move enumeration, attack tables) is treated
//! as a solved problem here: the bitboard attack tables in [`games::chess::movegen`]
//! are a conventional ray/knight/king table implementation, not the focus of
//! this crate. The parts that matter for search correctness — Zobrist keys,
//! repetition/cycle detection, SEE, and the cuckoo upcoming-repetition table —
//! are implemented in full.

pub mod games;
pub mod general;
pub mod score;

/// Shared fallible-result alias, used for the narrow set of operations that can fail
/// (FEN parsing, option parsing) as opposed to the search itself, which never errors.
pub type Res<T> = Result<T, String>;
