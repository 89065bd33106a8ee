//! The negamax search worker: iterative deepening, aspiration windows, and
//! the full PVS node function (§4.H), adapted from the teacher's `caps.rs`
//! node function to this crate's concrete chess types and to the exact step
//! ordering `spec.md` §4.H names. Runs single-threaded per [`Worker`]; the
//! Lazy-SMP fan-out lives in [`crate::search::multithreading`].

use super::constants::{LmrTable, sc};
use super::histories::Histories;
use super::move_picker::{ContinuationContext, ContinuationRef, MovePicker};
use super::multithreading::{AtomicSearchState, SearchParams};
use super::tablebase::{NoTablebase, TablebaseProbe, probe_at_root, probe_in_search};
use super::tt::{self, Bound, TranspositionTable};
use crate::eval::Eval;
use gears::games::ZobristHistory;
use gears::games::chess::board_state::BoardState;
use gears::games::chess::cuckoo::has_upcoming_repetition;
use gears::games::chess::movegen::legal_moves;
use gears::games::chess::moves::ChessMove;
use gears::games::chess::pieces::{Color, PieceType};
use gears::score::Score;
use std::sync::Arc;

pub const MAX_PLY: usize = 128;

#[derive(Copy, Clone, Default)]
struct StackEntry {
    killer: ChessMove,
    moved: Option<(PieceType, usize)>,
    static_eval: Score,
}

/// Per-thread search state: the TT is shared, everything else here is
/// thread-local and reset between searches only where §3 specifies it
/// (history tables persist across searches within a game; the stack and
/// node counters do not).
pub struct Worker<E: Eval> {
    pub id: usize,
    tt: Arc<TranspositionTable>,
    pub state: Arc<AtomicSearchState>,
    eval: E,
    histories: Histories,
    lmr: LmrTable,
    tablebase: Arc<dyn TablebaseProbe>,
    stack: Vec<StackEntry>,
    line_history: ZobristHistory,
    root_best_move: ChessMove,
    root_move_nodes: std::collections::HashMap<ChessMove, u64>,
}

impl<E: Eval> Worker<E> {
    pub fn new(id: usize, tt: Arc<TranspositionTable>, state: Arc<AtomicSearchState>, eval: E) -> Self {
        Worker {
            id,
            tt,
            state,
            eval,
            histories: Histories::default(),
            lmr: LmrTable::new(),
            tablebase: Arc::new(NoTablebase),
            stack: vec![StackEntry::default(); MAX_PLY + 8],
            line_history: ZobristHistory::default(),
            root_best_move: ChessMove::default(),
            root_move_nodes: std::collections::HashMap::new(),
        }
    }

    pub fn set_tablebase(&mut self, probe: Arc<dyn TablebaseProbe>) {
        self.tablebase = probe;
    }

    /// §3: history tables and the TT persist across a game; only `ucinewgame`
    /// clears them.
    pub fn new_game(&mut self) {
        self.histories.reset();
        self.tt.clear();
    }

    fn cont_context(&self, ply: i32) -> ContinuationContext {
        let at = |back: i32| -> ContinuationRef {
            if ply - back < 0 {
                ContinuationRef(None)
            } else {
                ContinuationRef(self.stack[(ply - back) as usize].moved)
            }
        };
        ContinuationContext { one_ply: at(1), two_ply: at(2), four_ply: at(4) }
    }

    fn is_draw(&self, board: &BoardState, ply: i32) -> bool {
        if board.fifty_move_ctr() >= 100 {
            return true;
        }
        if board.is_insufficient_material() {
            return true;
        }
        gears::games::chess::is_draw_by_repetition(board, &self.line_history, ply as usize)
    }

    /// Iterative deepening driver (§4.I/§4.L): grows `depth` one ply at a
    /// time, re-using the previous iteration's score as an aspiration-window
    /// center, and stops when the time manager's soft limit or an external
    /// stop request fires.
    pub fn run_iterative_deepening(&mut self, params: SearchParams) {
        self.state.reset();
        self.line_history = params.history.clone();
        self.eval.reset_new_search(&params.root);
        self.root_best_move = ChessMove::default();
        self.root_move_nodes.clear();

        let root_moves = legal_moves(&params.root);
        if root_moves.is_empty() {
            self.state.set_searching(false);
            return;
        }
        self.root_best_move = root_moves[0];

        if let Some(dtz) = probe_at_root(&params.root, self.tablebase.as_ref()) {
            if dtz.distance_to_zero > 0 {
                self.root_best_move = dtz.best_move;
            }
        }

        let mut score = Score::DRAW;
        let mut depth = 1;
        loop {
            if self.state.stop_flag() || params.time_manager.must_stop(self.state.nodes(), depth - 1) {
                break;
            }
            let mut window = sc::aspiration_initial_width();
            let (mut alpha, mut beta) = if depth <= 4 {
                (Score::new(-Score::MATE), Score::new(Score::MATE))
            } else {
                (score - window, score + window)
            };
            loop {
                let mut pv = Vec::new();
                let result = self.negamax(&params.root, 0, depth, alpha, beta, &mut pv, false);
                if self.state.stop_flag() {
                    break;
                }
                if result <= alpha {
                    beta = Score::new((alpha.value() + beta.value()) / 2);
                    alpha = Score::new(result.value().saturating_sub(window));
                    window *= 2;
                } else if result >= beta {
                    beta = Score::new(result.value().saturating_add(window));
                    window *= 2;
                } else {
                    score = result;
                    if let Some(&first) = pv.first() {
                        self.root_best_move = first;
                    }
                    self.state.set_score(score);
                    self.state.set_best_move(self.root_best_move);
                    self.state.set_depth(depth);
                    break;
                }
                if params.time_manager.must_stop(self.state.nodes(), depth - 1) {
                    break;
                }
            }
            if self.state.stop_flag() {
                break;
            }
            // node-based time management (§4.J): shrink the effective soft
            // limit once the node budget has concentrated heavily on one
            // root move (a stable best move), stretch it otherwise
            let total_nodes = self.state.nodes();
            let best_move_nodes = self.root_move_nodes.get(&self.root_best_move).copied().unwrap_or(0);
            let fraction = if total_nodes > 0 { best_move_nodes as f64 / total_nodes as f64 } else { 0.0 };
            if params.time_manager.elapsed() >= params.time_manager.scaled_soft_limit(fraction) {
                break;
            }
            depth += 1;
            if depth as usize >= MAX_PLY {
                break;
            }
        }
        self.state.set_searching(false);
    }

    /// The PVS node function (§4.H's numbered steps): TT probe, tablebase
    /// probe, static eval + correction, RFP/NMP/IIR pruning, the staged move
    /// loop with LMP/FP/SEE pruning and LMR, the PVS re-search shape, and
    /// the TT store with its bound computed from where the search landed
    /// relative to the original alpha/beta window.
    #[allow(clippy::too_many_arguments)]
    fn negamax(
        &mut self,
        board: &BoardState,
        ply: i32,
        depth: i32,
        alpha: Score,
        beta: Score,
        pv: &mut Vec<ChessMove>,
        cut_node: bool,
    ) -> Score {
        self.negamax_excluding(board, ply, depth, alpha, beta, pv, cut_node, ChessMove::default())
    }

    /// The PVS node function with an optional singular-search exclusion
    /// (§4.H step 12.f): when `excluded` is set, that move is skipped in the
    /// move loop and the TT store is suppressed, since the result describes
    /// "how good is this position without its best move", not the position
    /// itself.
    #[allow(clippy::too_many_arguments)]
    fn negamax_excluding(
        &mut self,
        board: &BoardState,
        ply: i32,
        mut depth: i32,
        mut alpha: Score,
        mut beta: Score,
        pv: &mut Vec<ChessMove>,
        cut_node: bool,
        excluded: ChessMove,
    ) -> Score {
        self.state.count_node();
        self.state.update_seldepth(ply);
        pv.clear();

        let is_root = ply == 0;
        let in_check = board.is_in_check();
        if depth <= 0 && !in_check {
            return self.quiescence(board, ply, alpha, beta);
        }
        depth = depth.max(1);

        if !is_root {
            if self.is_draw(board, ply) {
                return Score::draw_random(board.hash_pos().0);
            }
            // mate distance pruning: a shorter mate than the window allows can't improve it
            alpha = alpha.max(Score::mated_in(ply));
            beta = beta.min(Score::mate_in(ply + 1));
            if alpha >= beta {
                return alpha;
            }
            if has_upcoming_repetition(board, &self.line_history) {
                let draw = Score::draw_random(board.hash_pos().0);
                if draw >= beta {
                    return draw;
                }
            }
        }

        let generation = tt::current_generation(board.half_move_ctr(), ply);
        let tt_entry = self.tt.probe(board, ply, generation);
        let tt_move = tt_entry.as_ref().map(|e| e.mov).unwrap_or_default();
        // a TT bound from a prior, unrelated visit to this key can't be trusted
        // once the current path has already repeated through it: the repeated
        // position is draw-scored by the repetition check above in a real replay,
        // but a stored non-draw bound would short-circuit that outcome here.
        let path_has_repeated = gears::games::chess::find_repetition(board, &self.line_history).is_some();
        if let Some(entry) = &tt_entry {
            if !is_root && excluded.is_null() && !path_has_repeated && entry.depth as i32 >= depth {
                let usable = match entry.bound {
                    Some(Bound::Exact) => true,
                    Some(Bound::Lower) => entry.score >= beta,
                    Some(Bound::Upper) => entry.score <= alpha,
                    None => false,
                };
                if usable {
                    return entry.score;
                }
            }
        }

        if excluded.is_null() {
            if let Some(tb_score) = probe_in_search(board, ply, self.tablebase.as_ref()) {
                if !is_root {
                    return tb_score;
                }
            }
        }

        let cont = self.cont_context(ply);
        let is_pv = beta.value() > alpha.value() + 1;

        // static eval: raw NN oracle value (reused from the TT if present),
        // scaled down as the fifty-move counter climbs, then corrected by
        // every correction-history contribution (§4.H step 7). The raw value
        // is what gets stored back in the TT; the corrected one drives pruning.
        let raw_eval = if in_check {
            Score::UNDEFINED
        } else {
            tt_entry.as_ref().map(|e| e.eval).unwrap_or_else(|| self.eval.static_eval(board))
        };
        let adjusted_eval = if raw_eval == Score::UNDEFINED {
            Score::UNDEFINED
        } else {
            let fifty = board.fifty_move_ctr() as i32;
            let scaled = raw_eval.value() * (sc::fifty_move_scale_base() - fifty) / sc::fifty_move_scale_divisor();
            let mut correction = self.histories.pawn_corr.correction(board)
                + self.histories.non_pawn_corr.correction(board, Color::White)
                + self.histories.non_pawn_corr.correction(board, Color::Black);
            if let (Some(one), Some(two)) = (cont.one_ply.0, cont.two_ply.0) {
                correction += self.histories.continuation_corr.correction(one.0, one.1, two.0, two.1);
            }
            Score::new(scaled + correction).clamp_eval()
        };
        self.stack[ply as usize].static_eval = adjusted_eval;
        let improving = ply >= 2 && !in_check && adjusted_eval != Score::UNDEFINED && {
            let prev = self.stack[(ply - 2) as usize].static_eval;
            prev != Score::UNDEFINED && adjusted_eval > prev
        };

        // reverse futility pruning: a big static-eval margin above beta means
        // even a quiet reply is unlikely to bring the score back down to it
        if !is_root
            && !in_check
            && excluded.is_null()
            && depth <= sc::rfp_depth_limit()
            && adjusted_eval != Score::UNDEFINED
            && adjusted_eval - sc::rfp_margin_per_depth() * depth.max(0) >= beta
            && !beta.is_decisive()
        {
            return adjusted_eval;
        }

        // null move pruning: skip our move entirely and see if the opponent
        // still can't beat beta, meaning our position is so good a real move
        // would surely do better
        if !is_root
            && !in_check
            && excluded.is_null()
            && depth >= 3
            && adjusted_eval != Score::UNDEFINED
            && adjusted_eval >= beta
            && !beta.is_decisive()
            && board.occupied_bb().num_ones() > 4
        {
            let reduction = sc::nmp_base()
                + depth / sc::nmp_depth_divisor()
                + ((adjusted_eval - beta).value() / sc::nmp_eval_divisor()).min(sc::nmp_max_eval_reduction());
            let mut null_board = *board;
            null_board.apply_null_move();
            self.line_history.push(board.hash_pos());
            let mut child_pv = Vec::new();
            let score = -self.negamax(&null_board, ply + 1, depth - 1 - reduction, -beta, -beta + 1, &mut child_pv, !cut_node);
            self.line_history.pop();
            if score >= beta {
                return beta;
            }
        }

        // internal iterative reduction: with no TT move to try first, shrink
        // the depth slightly rather than spend a full-depth search ordering blind
        if !is_root && tt_move.is_null() && depth >= sc::iir_depth_min() {
            depth -= 1;
        }

        let mut picker = MovePicker::new(board, tt_move, false);
        let mut best_score = Score::new(-Score::MATE);
        let mut best_move = ChessMove::default();
        let mut moves_tried = 0;
        let mut quiets_tried = 0;
        let original_alpha = alpha;

        while let Some(mov) = picker.next(board, &self.histories, &cont) {
            if mov == excluded {
                continue;
            }
            let is_quiet = !mov.flag().is_capture() && !mov.flag().is_promotion();

            if !is_root && !best_score.is_decisive() && !in_check {
                // late move pruning: once enough quiets have failed to raise alpha,
                // stop trying more at low depth
                if is_quiet && quiets_tried as i32 >= sc::lmp_base() + sc::lmp_depth_coeff() * depth {
                    continue;
                }
                // futility pruning: a quiet move can't plausibly recover if
                // static eval plus a depth-scaled margin is already below alpha
                if is_quiet
                    && depth <= sc::fp_depth_limit()
                    && adjusted_eval != Score::UNDEFINED
                    && adjusted_eval + sc::fp_base() + sc::fp_depth_coeff() * depth <= alpha
                {
                    continue;
                }
                // SEE pruning: reject moves that lose too much material for the
                // remaining depth, separately thresholded for quiet vs loud moves
                let see_margin = if is_quiet { -sc::see_quiet_margin() * depth } else { -sc::see_loud_margin() * depth * depth };
                if depth <= sc::see_depth_limit() && !gears::games::chess::see::see_ge(board, mov, see_margin) {
                    continue;
                }
            }

            // singular extension: probe whether the TT move is the only
            // move keeping this node from collapsing; if so, extend it —
            // if something else nearly matches it, this node isn't singular
            // at all and may even warrant a multi-cut (§4.H step 12.f)
            let mut extension = 0;
            if !is_root
                && excluded.is_null()
                && moves_tried == 0
                && mov == tt_move
                && depth >= sc::singular_depth_min()
            {
                if let Some(entry) = &tt_entry {
                    if entry.depth as i32 >= depth - 3 && entry.bound != Some(Bound::Upper) && !entry.score.is_decisive() {
                        let sbeta = Score::new(entry.score.value() - sc::singular_beta_margin() * depth / 64);
                        let sdepth = ((depth - 1) / 2).max(1);
                        let mut excluded_pv = Vec::new();
                        let singular_score =
                            self.negamax_excluding(board, ply, sdepth, sbeta - 1, sbeta, &mut excluded_pv, cut_node, tt_move);
                        if singular_score < sbeta {
                            extension = if !is_pv && singular_score.value() < sbeta.value() - sc::singular_double_margin() {
                                2
                            } else {
                                1
                            };
                        } else if sbeta >= beta && !sbeta.is_decisive() {
                            return sbeta;
                        } else if entry.score >= beta || cut_node {
                            extension = -2;
                        }
                    }
                }
            }

            let mut child = *board;
            child.apply_move(mov);
            let gives_check = child.is_in_check();
            if gives_check {
                extension += 1;
            }
            let new_depth = depth - 1 + extension;

            self.stack[ply as usize].moved =
                board.piece_at(mov.src_square()).map(|p| (p.piece_type, mov.dest_square().bb_idx()));
            self.line_history.push(board.hash_pos());
            self.eval.store_lazy_updates(board, &child, mov);

            // node-TM bookkeeping (§4.J): only meaningful at the root, where
            // `run_iterative_deepening` later reads how the node budget split
            // across root moves to scale the soft time limit
            let nodes_before_move = if is_root { self.state.nodes() } else { 0 };

            let mut child_pv = Vec::new();
            let mut score;
            if moves_tried == 0 {
                score = -self.negamax(&child, ply + 1, new_depth, -beta, -alpha, &mut child_pv, false);
            } else {
                let mut reduction = 0;
                if depth >= 3 && moves_tried >= 2 && is_quiet {
                    reduction = self.lmr.reduction(depth, moves_tried as i32);
                    if !improving {
                        reduction += 1;
                    }
                    if cut_node {
                        reduction += 1;
                    }
                    reduction = reduction.clamp(0, new_depth - 1);
                }
                score = -self.negamax(&child, ply + 1, new_depth - reduction, -alpha - 1, -alpha, &mut child_pv, true);
                if score > alpha && (reduction > 0 || score < beta) {
                    score = -self.negamax(&child, ply + 1, new_depth, -beta, -alpha, &mut child_pv, false);
                }
            }

            if is_root {
                let spent = self.state.nodes().saturating_sub(nodes_before_move);
                *self.root_move_nodes.entry(mov).or_insert(0) += spent;
            }

            self.line_history.pop();
            moves_tried += 1;
            if is_quiet {
                quiets_tried += 1;
            }

            if self.state.stop_flag() {
                return Score::UNDEFINED;
            }

            if score > best_score {
                best_score = score;
                best_move = mov;
                if score > alpha {
                    alpha = score;
                    pv.clear();
                    pv.push(mov);
                    pv.extend_from_slice(&child_pv);
                }
            }

            if alpha >= beta {
                let depth_bonus = depth;
                if is_quiet {
                    picker.update_quiet_history(board, &mut self.histories, &cont, mov, depth_bonus);
                    self.stack[ply as usize].killer = mov;
                } else {
                    picker.update_loud_history(board, &mut self.histories, mov, depth_bonus);
                }
                break;
            }
        }

        if moves_tried == 0 {
            if !excluded.is_null() {
                return alpha;
            }
            return if in_check { Score::mated_in(ply) } else { Score::DRAW };
        }

        let bound = if best_score <= original_alpha {
            Bound::Upper
        } else if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };

        // correction history update (§4.D, §4.H step 14): only when the best
        // move was quiet, the node wasn't in check, and the stored bound
        // doesn't contradict the direction the correction would push
        let best_is_quiet = !best_move.flag().is_capture() && !best_move.flag().is_promotion();
        let direction_ok = match bound {
            Bound::Lower => best_score > adjusted_eval,
            Bound::Upper => best_score < adjusted_eval,
            Bound::Exact => true,
        };
        if excluded.is_null() && !in_check && best_is_quiet && direction_ok && adjusted_eval != Score::UNDEFINED && !best_score.is_decisive() {
            let delta = (best_score.value() - adjusted_eval.value()) * depth;
            self.histories.pawn_corr.update(board, delta);
            self.histories.non_pawn_corr.update(board, Color::White, delta);
            self.histories.non_pawn_corr.update(board, Color::Black, delta);
            if let (Some(one), Some(two)) = (cont.one_ply.0, cont.two_ply.0) {
                self.histories.continuation_corr.update(one.0, one.1, two.0, two.1, delta);
            }
        }

        if excluded.is_null() {
            self.tt.store(board, ply, best_move, best_score, raw_eval, depth as i8, bound, generation);
        }

        best_score
    }

    fn quiescence(&mut self, board: &BoardState, ply: i32, mut alpha: Score, beta: Score) -> Score {
        self.state.count_node();
        self.state.update_seldepth(ply);

        if self.is_draw(board, ply) {
            return Score::draw_random(board.hash_pos().0);
        }

        let in_check = board.is_in_check();
        let generation = tt::current_generation(board.half_move_ctr(), ply);
        let tt_entry = self.tt.probe(board, ply, generation);
        if let Some(entry) = &tt_entry {
            let usable = match entry.bound {
                Some(Bound::Exact) => true,
                Some(Bound::Lower) => entry.score >= beta,
                Some(Bound::Upper) => entry.score <= alpha,
                None => false,
            };
            if usable {
                return entry.score;
            }
        }

        // in check there's no "stand pat": every legal reply must be tried,
        // not just captures, since the side to move cannot simply do nothing
        let mut best_score = Score::mated_in(ply);
        if !in_check {
            let static_eval = tt_entry.as_ref().map(|e| e.eval).unwrap_or_else(|| self.eval.static_eval(board));
            if static_eval >= beta {
                return static_eval;
            }
            alpha = alpha.max(static_eval);
            best_score = static_eval;
        }

        let tt_move = tt_entry.map(|e| e.mov).unwrap_or_default();
        let cont = self.cont_context(ply);
        let mut picker = MovePicker::new(board, tt_move, !in_check);
        let mut any_move = false;
        // once a first non-losing move has been explored, at most 2 more are
        // tried: quiescence only needs to confirm the position is safe, not
        // enumerate every capture (check evasions are exempt, every reply
        // must be tried there since standing pat isn't legal)
        let mut explored_since_first_good = 0;
        while let Some(mov) = picker.next(board, &self.histories, &cont) {
            if !in_check && !gears::games::chess::see::see_ge(board, mov, 0) {
                continue;
            }
            if !in_check && any_move && explored_since_first_good >= 2 {
                break;
            }
            if !in_check && any_move {
                explored_since_first_good += 1;
            }
            any_move = true;
            let mut child = *board;
            child.apply_move(mov);
            self.line_history.push(board.hash_pos());
            let score = -self.quiescence(&child, ply + 1, -beta, -alpha);
            self.line_history.pop();
            if self.state.stop_flag() {
                return Score::UNDEFINED;
            }
            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                }
            }
            if alpha >= beta {
                break;
            }
        }
        if in_check && !any_move {
            return Score::mated_in(ply);
        }
        best_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::MaterialOnlyEval;
    use crate::search::time_manager::{NodeLimit, TimeControl, TimeManager};
    use std::time::{Duration, Instant};

    fn new_worker() -> Worker<MaterialOnlyEval> {
        Worker::new(0, Arc::new(TranspositionTable::new_with_mib(1)), Arc::new(AtomicSearchState::default()), MaterialOnlyEval)
    }

    #[test]
    fn finds_mate_in_one() {
        let mut worker = new_worker();
        // white to move, Qh5-f7 style back-rank mate setup: rook delivers mate on the back rank
        let board = BoardState::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        let params = SearchParams {
            root: board,
            history: ZobristHistory::default(),
            time_manager: TimeManager::new(Instant::now(), TimeControl::MoveTime(Duration::from_millis(500)), None, Some(6)),
        };
        worker.run_iterative_deepening(params);
        let score = worker.state.score();
        assert!(score.is_win(), "expected a forced win, got {score:?}");
    }

    #[test]
    fn stalemate_scores_as_a_draw() {
        let mut worker = new_worker();
        let board = BoardState::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let mut pv = Vec::new();
        let score = worker.negamax(&board, 0, 1, Score::new(-Score::MATE), Score::new(Score::MATE), &mut pv, false);
        assert_eq!(score, Score::DRAW);
    }

    #[test]
    fn quiescence_does_not_blunder_a_hanging_queen_capture() {
        let mut worker = new_worker();
        let board = BoardState::from_fen("4k3/8/8/4q3/4R3/8/8/4K3 w - - 0 1").unwrap();
        let score = worker.quiescence(&board, 0, Score::new(-Score::MATE), Score::new(Score::MATE));
        assert!(score.value() > 0, "rook should take the hanging queen");
    }

    #[test]
    fn excluding_a_move_never_beats_searching_with_it_available() {
        // the best score over a subset of moves can never exceed the best
        // score over the full move set searched under the same window
        let mut worker = new_worker();
        let board = BoardState::startpos();
        let best = legal_moves(&board)[0];
        let mut pv = Vec::new();
        let full = worker.negamax(&board, 0, 3, Score::new(-Score::MATE), Score::new(Score::MATE), &mut pv, false);
        let mut excluded_pv = Vec::new();
        let excluded_score = worker.negamax_excluding(
            &board,
            0,
            3,
            Score::new(-Score::MATE),
            Score::new(Score::MATE),
            &mut excluded_pv,
            false,
            best,
        );
        assert!(excluded_score <= full);
    }

    #[test]
    fn fifty_move_counter_at_the_limit_is_a_draw() {
        let worker = new_worker();
        let board = BoardState::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 100 50").unwrap();
        assert!(worker.is_draw(&board, 5));
    }

    #[test]
    fn third_occurrence_of_a_position_is_a_draw() {
        let mut worker = new_worker();
        // a halfmove clock of at least 4 is needed for `is_draw_by_repetition`'s
        // lookback window to reach back far enough to see the two prior visits
        let board = BoardState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 4 3").unwrap();
        worker.line_history.push(board.hash_pos());
        worker.line_history.push(board.hash_pos());
        assert!(worker.is_draw(&board, 4));
    }

    #[test]
    fn returned_score_never_lands_outside_eval_bounds_unless_decisive() {
        let mut worker = new_worker();
        let board = BoardState::startpos();
        let mut pv = Vec::new();
        let score = worker.negamax(&board, 0, 5, Score::new(-Score::MATE), Score::new(Score::MATE), &mut pv, false);
        assert!(score.is_decisive() || (score.value() >= Score::EVAL_MIN && score.value() <= Score::EVAL_MAX));
    }

    #[test]
    fn fixed_node_limit_search_is_deterministic() {
        let run = || {
            let mut worker = new_worker();
            let params = SearchParams {
                root: BoardState::startpos(),
                history: ZobristHistory::default(),
                time_manager: TimeManager::new(Instant::now(), TimeControl::Infinite, Some(NodeLimit(5000)), None),
            };
            worker.run_iterative_deepening(params);
            (worker.state.best_move(), worker.state.nodes())
        };
        let (move_a, nodes_a) = run();
        let (move_b, nodes_b) = run();
        assert_eq!(move_a, move_b);
        assert_eq!(nodes_a, nodes_b);
    }
}
