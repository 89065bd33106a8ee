//! The search core's module tree (§2 component list) and the handful of
//! entry points a caller — the UCI loop, a bench harness, a test — drives it
//! through (§4.L).

pub mod constants;
pub mod core;
pub mod histories;
pub mod move_picker;
pub mod multithreading;
pub mod tablebase;
pub mod time_manager;
pub mod tt;

use crate::eval::Eval;
use core::Worker;
use gears::games::ZobristHistory;
use gears::games::chess::board_state::BoardState;
use gears::games::chess::moves::ChessMove;
use gears::score::Score;
use multithreading::{AtomicSearchState, EngineReceives, SearchParams, SearchSharedState, spawn_workers};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time_manager::{TimeControl, TimeManager};
use tt::TranspositionTable;

/// The Lazy-SMP coordinator's summary of a completed search (§4.I): the best
/// worker's move, score, and completed depth, plus the total node count
/// across every worker.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: ChessMove,
    pub ponder_move: Option<ChessMove>,
    pub score: Score,
    pub depth: i32,
    pub nodes: u64,
}

/// Blocking entry point (§4.L): spawns `shared.worker_count()` workers
/// against `shared`, sends every one of them the same root to search, waits
/// for them all to stop, then tears the threads back down and returns the
/// coordinator's pick.
///
/// `shared` must already have its worker slots sized via
/// [`SearchSharedState::ensure_workers`] before being wrapped in the `Arc`
/// passed here — this function only spawns threads and waits, it doesn't
/// resize anything, since doing so while other workers might be mid-search
/// would race the shared TT's `Arc` swap.
pub fn launch_search<E, F>(shared: Arc<SearchSharedState>, params: SearchParams, make_eval: F) -> SearchResult
where
    E: Eval + 'static,
    F: Fn() -> E,
{
    let threads = shared.worker_count().max(1);
    let senders = spawn_workers(Arc::clone(&shared), threads, make_eval);
    for sender in &senders {
        let _ = sender.send(EngineReceives::Search(params.clone()));
    }

    // wait for every worker to pick the command up before watching for them
    // to finish, so a search that completes within a single poll tick can't
    // be mistaken for one that never started
    while !(0..threads).any(|i| shared.worker_state(i).currently_searching()) {
        std::thread::sleep(Duration::from_millis(1));
    }
    while (0..threads).any(|i| shared.worker_state(i).currently_searching()) {
        std::thread::sleep(Duration::from_millis(1));
    }

    for sender in &senders {
        let _ = sender.send(EngineReceives::Quit);
    }

    let best_idx = shared.best_worker().unwrap_or(0);
    let best = shared.worker_state(best_idx);
    SearchResult { best_move: best.best_move(), ponder_move: None, score: best.score(), depth: best.depth(), nodes: shared.total_nodes() }
}

/// One position's result from [`bench`]: its own node count alongside the
/// search's best move, so a CI harness can both sum totals and spot-check a
/// regression in a single position's chosen move.
#[derive(Debug, Clone)]
pub struct BenchPositionResult {
    pub best_move: ChessMove,
    pub nodes: u64,
}

#[derive(Debug, Clone)]
pub struct BenchResult {
    pub per_position: Vec<BenchPositionResult>,
    pub total_nodes: u64,
    pub total_time: Duration,
    pub nps: u64,
}

/// Ambient CI/OpenBench-style tooling (§4.L): a single-threaded, fixed-depth
/// search over a fixed position list with a fresh TT and a fresh `Eval` per
/// position, so the resulting node counts are reproducible run to run (§8
/// Testable Property 8) regardless of what else is running on the machine.
pub fn bench<E, F>(positions: &[BoardState], depth: i32, make_eval: F) -> BenchResult
where
    E: Eval + 'static,
    F: Fn() -> E,
{
    let start = Instant::now();
    let mut per_position = Vec::with_capacity(positions.len());
    let mut total_nodes = 0u64;
    for &root in positions {
        let tt = Arc::new(TranspositionTable::default());
        let state = Arc::new(AtomicSearchState::default());
        let mut worker = Worker::new(0, tt, Arc::clone(&state), make_eval());
        let params = SearchParams {
            root,
            history: ZobristHistory::default(),
            time_manager: TimeManager::new(Instant::now(), TimeControl::Infinite, None, Some(depth)),
        };
        worker.run_iterative_deepening(params);
        let nodes = state.nodes();
        total_nodes += nodes;
        per_position.push(BenchPositionResult { best_move: state.best_move(), nodes });
    }
    let total_time = start.elapsed();
    let nps = if total_time.as_millis() > 0 { (total_nodes as u128 * 1000 / total_time.as_millis()) as u64 } else { total_nodes };
    BenchResult { per_position, total_nodes, total_time, nps }
}

/// `ucinewgame` (§4.L: "new_game, clears TT + histories"): clears the TT and
/// every worker's persistent history tables, since a new game shares no
/// context with the previous one. [`core::Worker::new_game`] already clears
/// both; this just applies it across every worker in the pool.
pub fn ucinewgame<E: Eval>(tt: &TranspositionTable, workers: &mut [Worker<E>]) {
    tt.clear();
    for worker in workers {
        worker.new_game();
    }
}

/// `Clear Hash` (§4.L: "forget, clears TT, keeps histories"): clears only
/// the TT, leaving history tables (meant to persist across positions within
/// the same game) untouched.
pub fn clear_hash(tt: &TranspositionTable) {
    tt.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::MaterialOnlyEval;

    #[test]
    fn bench_is_deterministic_across_runs() {
        let positions = [BoardState::startpos()];
        let a = bench(&positions, 4, || MaterialOnlyEval);
        let b = bench(&positions, 4, || MaterialOnlyEval);
        assert_eq!(a.total_nodes, b.total_nodes);
        assert_eq!(a.per_position[0].best_move, b.per_position[0].best_move);
    }

    #[test]
    fn bench_reports_one_result_per_position() {
        let positions = [BoardState::startpos(), BoardState::from_fen("4k3/8/8/8/8/8/8/R3K3 w Q - 0 1").unwrap()];
        let result = bench(&positions, 3, || MaterialOnlyEval);
        assert_eq!(result.per_position.len(), 2);
    }

    #[test]
    fn launch_search_finds_a_legal_best_move_from_startpos() {
        let mut shared = SearchSharedState::new(crate::ugi::UgiOutput::new(false));
        shared.ensure_workers(1);
        let shared = Arc::new(shared);
        let params = SearchParams {
            root: BoardState::startpos(),
            history: ZobristHistory::default(),
            time_manager: TimeManager::new(Instant::now(), TimeControl::Infinite, None, Some(3)),
        };
        let result = launch_search(shared, params, || MaterialOnlyEval);
        assert!(!result.best_move.is_null());
    }
}
