//! Lazy-SMP thread pool and the shared state its workers report through
//! (§4.I, §5). Generalizes the teacher's `AtomicSearchState<B>`/
//! `EngineThread<B, E>` ("one engine of any `Board` type") down to "the
//! halogen chess search worker specifically" — no generic parameter remains,
//! since this crate has exactly one `Board`.

use crate::eval::Eval;
use crate::search::core::Worker;
use crate::search::time_manager::TimeManager;
use crate::search::tt::TranspositionTable;
use crate::ugi::UgiOutput;
use gears::games::ZobristHistory;
use gears::games::chess::board_state::BoardState;
use gears::games::chess::moves::ChessMove;
use gears::score::Score;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicIsize, AtomicU64, AtomicU16};
use std::sync::{Arc, Mutex};

pub type Sender<T> = crossbeam_channel::Sender<T>;
pub type Receiver<T> = crossbeam_channel::Receiver<T>;

/// A root position and the time/node/depth budget to search it under.
#[derive(Clone)]
pub struct SearchParams {
    pub root: BoardState,
    pub history: ZobristHistory,
    pub time_manager: TimeManager,
}

pub enum EngineReceives {
    Quit,
    Forget,
    SetHashSize(usize),
    Search(SearchParams),
    Stop,
}

/// Per-worker progress, readable from any thread with relaxed/acquire loads
/// while the worker writes with relaxed/release stores (§5: no locks on the
/// hot path, only the TT buckets and this counter block are shared).
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicSearchState {
    should_stop: AtomicBool,
    currently_searching: AtomicBool,
    nodes: AtomicU64,
    depth: AtomicIsize,
    seldepth: AtomicIsize,
    best_move: AtomicU16,
    score: AtomicI32,
}

impl Default for AtomicSearchState {
    fn default() -> Self {
        AtomicSearchState {
            should_stop: AtomicBool::new(false),
            currently_searching: AtomicBool::new(false),
            nodes: AtomicU64::new(0),
            depth: AtomicIsize::new(0),
            seldepth: AtomicIsize::new(0),
            best_move: AtomicU16::new(ChessMove::UNINITIALIZED.to_bits()),
            score: AtomicI32::new(Score::UNDEFINED.value()),
        }
    }
}

impl AtomicSearchState {
    pub fn reset(&self) {
        self.nodes.store(0, Relaxed);
        self.depth.store(0, Relaxed);
        self.seldepth.store(0, Relaxed);
        self.best_move.store(ChessMove::UNINITIALIZED.to_bits(), Relaxed);
        self.score.store(Score::UNDEFINED.value(), Relaxed);
        self.should_stop.store(false, Relaxed);
        self.currently_searching.store(true, Relaxed);
    }

    pub fn stop_flag(&self) -> bool {
        self.should_stop.load(Acquire)
    }

    pub fn set_stop(&self, val: bool) {
        self.should_stop.store(val, Release);
    }

    pub fn currently_searching(&self) -> bool {
        self.currently_searching.load(Relaxed)
    }

    pub fn set_searching(&self, val: bool) {
        self.currently_searching.store(val, Relaxed);
    }

    pub fn count_node(&self) {
        self.nodes.fetch_add(1, Relaxed);
    }

    pub fn nodes(&self) -> u64 {
        self.nodes.load(Relaxed)
    }

    pub fn set_depth(&self, depth: i32) {
        self.depth.store(depth as isize, Relaxed);
    }

    pub fn depth(&self) -> i32 {
        self.depth.load(Relaxed) as i32
    }

    pub fn update_seldepth(&self, seldepth: i32) {
        self.seldepth.fetch_max(seldepth as isize, Relaxed);
    }

    pub fn seldepth(&self) -> i32 {
        self.seldepth.load(Relaxed) as i32
    }

    pub fn set_best_move(&self, mov: ChessMove) {
        self.best_move.store(mov.to_bits(), Relaxed);
    }

    pub fn best_move(&self) -> ChessMove {
        ChessMove::from_bits(self.best_move.load(Relaxed))
    }

    pub fn set_score(&self, score: Score) {
        self.score.store(score.value(), Relaxed);
    }

    pub fn score(&self) -> Score {
        Score::new(self.score.load(Relaxed))
    }
}

/// Shared across every worker: the TT, the output sink, and (by index) each
/// worker's atomic progress block, so the UGI-facing side can read live
/// `info` lines without locking the search itself.
pub struct SearchSharedState {
    pub tt: Arc<TranspositionTable>,
    pub output: Arc<Mutex<UgiOutput>>,
    per_worker: Vec<Arc<AtomicSearchState>>,
}

impl SearchSharedState {
    pub fn new(output: UgiOutput) -> Self {
        SearchSharedState {
            tt: Arc::new(TranspositionTable::default()),
            output: Arc::new(Mutex::new(output)),
            per_worker: Vec::new(),
        }
    }

    pub fn resize_hash(&mut self, mib: usize) {
        self.tt = Arc::new(TranspositionTable::new_with_mib(mib));
    }

    pub fn ensure_workers(&mut self, count: usize) {
        while self.per_worker.len() < count {
            self.per_worker.push(Arc::new(AtomicSearchState::default()));
        }
        self.per_worker.truncate(count.max(1));
    }

    pub fn worker_state(&self, idx: usize) -> Arc<AtomicSearchState> {
        self.per_worker[idx].clone()
    }

    pub fn worker_count(&self) -> usize {
        self.per_worker.len()
    }

    pub fn request_stop(&self) {
        for w in &self.per_worker {
            w.set_stop(true);
        }
    }

    /// True once every worker has left its search loop (the shutdown
    /// sequence the teacher's `EngineWrapper::quit` spin-waits on).
    pub fn all_idle(&self) -> bool {
        self.per_worker.iter().all(|w| !w.currently_searching())
    }

    /// The worker with the greatest completed depth, tie-broken by node
    /// count, is the one whose PV the Lazy-SMP coordinator reports (§4.I).
    pub fn best_worker(&self) -> Option<usize> {
        self.per_worker
            .iter()
            .enumerate()
            .max_by_key(|(_, w)| (w.depth(), w.nodes()))
            .map(|(i, _)| i)
    }

    pub fn total_nodes(&self) -> u64 {
        self.per_worker.iter().map(|w| w.nodes()).sum()
    }
}

/// One OS thread running one [`Worker`]'s iterative-deepening loop, driven
/// by commands sent over a `crossbeam_channel`.
pub struct EngineThread<E: Eval> {
    worker: Worker<E>,
    receiver: Receiver<EngineReceives>,
}

impl<E: Eval + 'static> EngineThread<E> {
    pub fn new(worker: Worker<E>, receiver: Receiver<EngineReceives>) -> Self {
        EngineThread { worker, receiver }
    }

    pub fn run(mut self) {
        while let Ok(msg) = self.receiver.recv() {
            match msg {
                EngineReceives::Quit => break,
                EngineReceives::Forget => self.worker.new_game(),
                EngineReceives::SetHashSize(_) => {} // shared TT is resized by `SearchSharedState`, not per-worker
                EngineReceives::Search(params) => self.worker.run_iterative_deepening(params),
                EngineReceives::Stop => self.worker.state.set_stop(true),
            }
        }
    }
}

/// Spawns `threads` worker threads against a shared [`SearchSharedState`],
/// returning the command senders the UGI layer drives. Every worker runs the
/// same search against the same root and the same shared TT (§4.I: no
/// explicit work-splitting); Lazy-SMP's benefit comes entirely from threads
/// racing through the TT at different paces, not from any ordering spread
/// across workers.
pub fn spawn_workers<E, F>(
    shared: Arc<SearchSharedState>,
    threads: usize,
    make_eval: F,
) -> Vec<Sender<EngineReceives>>
where
    E: Eval + 'static,
    F: Fn() -> E,
{
    let mut senders = Vec::with_capacity(threads);
    for idx in 0..threads {
        let (tx, rx) = crossbeam_channel::unbounded();
        let state = shared.worker_state(idx);
        let worker = Worker::new(idx, Arc::clone(&shared.tt), state, make_eval());
        let thread = EngineThread::new(worker, rx);
        std::thread::Builder::new()
            .name(format!("halogen-worker-{idx}"))
            .spawn(move || thread.run())
            .expect("failed to spawn search worker thread");
        senders.push(tx);
    }
    senders
}
