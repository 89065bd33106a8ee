//! The halogen search core: transposition table, history heuristics, staged
//! move generation, the negamax worker, the Lazy-SMP thread pool, the time
//! manager, and a tablebase adapter. Sits on top of `gears` for board/move
//! primitives; the NN evaluator is an opaque oracle (see [`eval::Eval`]).

pub mod eval;
pub mod search;
pub mod ugi;

pub type Res<T> = Result<T, String>;
