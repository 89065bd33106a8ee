//! Soft/hard time budgeting across the four UCI time regimes, plus
//! node-based time management (§4.J).

use std::time::{Duration, Instant};

/// A safety margin subtracted from the raw time left before any regime
/// computes its budget, so a slow OS scheduler tick never causes a flag.
const SAFETY_BUFFER: Duration = Duration::from_millis(25);

#[derive(Copy, Clone, Debug)]
pub enum TimeControl {
    /// `go movetime N`: search for exactly this long (minus the safety buffer).
    MoveTime(Duration),
    /// `go movestogo N wtime/btime`: divide the remaining time evenly across
    /// the moves left in the current time control.
    MovesToGo { time_left: Duration, increment: Duration, moves_to_go: u32 },
    /// `go wtime/btime winc/binc` with no `movestogo`: assume a fixed
    /// notional number of moves remain.
    Increment { time_left: Duration, increment: Duration },
    /// Sudden death: `wtime`/`btime` only, no increment.
    SuddenDeath { time_left: Duration },
    /// `go infinite`/no time control given: run until `stop`.
    Infinite,
}

/// A node budget, independent of wall-clock time, used by `bench` and by
/// fixed-node test harnesses so results are deterministic (§8 Testable
/// Property 8).
#[derive(Copy, Clone, Debug)]
pub struct NodeLimit(pub u64);

/// Assumed moves remaining in a sudden-death or no-`movestogo` increment
/// game, used to divide the remaining clock into a per-move budget.
const ASSUMED_MOVES_LEFT: u32 = 40;

#[derive(Copy, Clone, Debug)]
pub struct TimeManager {
    start: Instant,
    soft_limit: Duration,
    hard_limit: Duration,
    node_limit: Option<u64>,
    depth_limit: Option<i32>,
}

impl TimeManager {
    pub fn new(start: Instant, control: TimeControl, node_limit: Option<NodeLimit>, depth_limit: Option<i32>) -> Self {
        let (soft_limit, hard_limit) = Self::compute_limits(control);
        TimeManager { start, soft_limit, hard_limit, node_limit: node_limit.map(|n| n.0), depth_limit }
    }

    fn compute_limits(control: TimeControl) -> (Duration, Duration) {
        match control {
            TimeControl::MoveTime(t) => {
                let budget = t.saturating_sub(SAFETY_BUFFER);
                (budget, budget)
            }
            TimeControl::MovesToGo { time_left, increment, moves_to_go } => {
                let time_left = time_left.saturating_sub(SAFETY_BUFFER);
                let moves_to_go = moves_to_go.max(1);
                let per_move = time_left / moves_to_go + increment;
                let soft = per_move.min(time_left);
                let hard = (per_move * 3).min(time_left);
                (soft, hard)
            }
            TimeControl::Increment { time_left, increment } => {
                let time_left = time_left.saturating_sub(SAFETY_BUFFER);
                let per_move = time_left / ASSUMED_MOVES_LEFT + increment;
                let soft = per_move.min(time_left);
                let hard = (per_move * 4).min(time_left);
                (soft, hard)
            }
            TimeControl::SuddenDeath { time_left } => {
                let time_left = time_left.saturating_sub(SAFETY_BUFFER);
                let per_move = time_left / ASSUMED_MOVES_LEFT;
                let soft = per_move.min(time_left);
                let hard = (per_move * 4).min(time_left);
                (soft, hard)
            }
            TimeControl::Infinite => (Duration::MAX, Duration::MAX),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// True once the hard limit, node limit, or depth limit is exceeded: the
    /// search must stop immediately, even mid-iteration.
    pub fn must_stop(&self, nodes: u64, completed_depth: i32) -> bool {
        if let Some(limit) = self.node_limit {
            if nodes >= limit {
                return true;
            }
        }
        if let Some(limit) = self.depth_limit {
            if completed_depth >= limit {
                return true;
            }
        }
        self.elapsed() >= self.hard_limit
    }

    /// Node-based time management (§4.J): scales the soft limit down when
    /// the best move's effective branching factor suggests it's stable
    /// (most nodes spent on one move), and up when the position looks
    /// unsettled. `best_move_node_fraction` is `nodes_spent_on_best_move /
    /// total_nodes_this_iteration`, in `[0, 1]`.
    pub fn scaled_soft_limit(&self, best_move_node_fraction: f64) -> Duration {
        // go infinite / a pure depth-limited search has no wall-clock budget
        // to scale; mul_f64 on Duration::MAX would overflow
        if self.soft_limit == Duration::MAX {
            return Duration::MAX;
        }
        // a stable best move (high fraction) shrinks the soft limit towards
        // 50% of its nominal value; an unstable one stretches it up to 130%
        let fraction = best_move_node_fraction.clamp(0.0, 1.0);
        let scale = 1.3 - 0.8 * fraction;
        self.soft_limit.mul_f64(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movetime_budget_subtracts_safety_buffer() {
        let tm = TimeManager::new(Instant::now(), TimeControl::MoveTime(Duration::from_millis(1000)), None, None);
        assert_eq!(tm.hard_limit, Duration::from_millis(975));
        assert_eq!(tm.soft_limit, tm.hard_limit);
    }

    #[test]
    fn node_limit_triggers_must_stop_independent_of_clock() {
        let tm =
            TimeManager::new(Instant::now(), TimeControl::Infinite, Some(NodeLimit(1000)), None);
        assert!(!tm.must_stop(999, 0));
        assert!(tm.must_stop(1000, 0));
    }

    #[test]
    fn depth_limit_triggers_must_stop() {
        let tm = TimeManager::new(Instant::now(), TimeControl::Infinite, None, Some(10));
        assert!(tm.must_stop(0, 10));
        assert!(!tm.must_stop(0, 9));
    }

    #[test]
    fn stable_best_move_shrinks_soft_limit() {
        let tm = TimeManager::new(
            Instant::now(),
            TimeControl::MovesToGo { time_left: Duration::from_secs(60), increment: Duration::ZERO, moves_to_go: 30 },
            None,
            None,
        );
        assert!(tm.scaled_soft_limit(0.9) < tm.scaled_soft_limit(0.1));
    }

    #[test]
    fn infinite_control_scales_without_overflow() {
        let tm = TimeManager::new(Instant::now(), TimeControl::Infinite, None, Some(10));
        assert_eq!(tm.scaled_soft_limit(0.5), Duration::MAX);
    }
}
