//! Search limits and the clock.
//!
//! `Limits` is the parsed `go` command; `SearchLimiter` turns it into
//! deadlines and answers the stop questions. Hard limits abort the search
//! mid-tree (sampled every 1024 nodes to keep clock reads off the hot path);
//! soft limits only stop between iterative-deepening iterations. Pondering
//! suspends enforcement until `stop_pondering` rebases the deadlines to
//! "now plus the original budget".

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::board::types::Color;

use super::constants::MAX_DEPTH;

/// Everything a `go` command can constrain
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub white_time: Option<u64>,
    pub black_time: Option<u64>,
    pub white_inc: Option<u64>,
    pub black_inc: Option<u64>,
    pub moves_to_go: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<i32>,
    pub mate: Option<i32>,
    pub nodes: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
}

impl Limits {
    /// Fixed-depth limits, mostly for tests and `go depth N`
    #[must_use]
    pub fn depth(depth: i32) -> Self {
        Limits {
            depth: Some(depth),
            ..Limits::default()
        }
    }

    /// Unbounded search, stopped only externally
    #[must_use]
    pub fn infinite() -> Self {
        Limits {
            infinite: true,
            ..Limits::default()
        }
    }
}

struct ClockState {
    start: Instant,
    hard_deadline: Option<Instant>,
    soft_deadline: Option<Instant>,
    // Original budgets, kept so a ponderhit can rebase from "now"
    hard_budget: Option<Duration>,
    soft_budget: Option<Duration>,
}

pub struct SearchLimiter {
    clock: Mutex<ClockState>,
    pondering: AtomicBool,
    hard_nodes: Option<u64>,
    depth_cap: i32,
    mate_target: Option<i32>,
}

impl SearchLimiter {
    /// Build a limiter for the side to move. `overhead_ms` is reserved for
    /// I/O latency on every clocked move.
    #[must_use]
    pub fn new(limits: &Limits, stm: Color, overhead_ms: u64) -> Self {
        let now = Instant::now();
        let (remaining, increment) = match stm {
            Color::White => (limits.white_time, limits.white_inc.unwrap_or(0)),
            Color::Black => (limits.black_time, limits.black_inc.unwrap_or(0)),
        };

        let (hard_budget, soft_budget) = if limits.infinite {
            (None, None)
        } else if let Some(movetime) = limits.movetime {
            let budget = Duration::from_millis(movetime.saturating_sub(overhead_ms).max(1));
            (Some(budget), Some(budget))
        } else if let Some(remaining) = remaining {
            let hard_ms = (remaining / 10 + increment * 2 / 3)
                .saturating_sub(overhead_ms)
                .clamp(1, remaining.saturating_sub(overhead_ms).max(1));
            let soft_ms = (hard_ms / 3).max(1);
            (
                Some(Duration::from_millis(hard_ms)),
                Some(Duration::from_millis(soft_ms)),
            )
        } else {
            (None, None)
        };

        SearchLimiter {
            clock: Mutex::new(ClockState {
                start: now,
                hard_deadline: hard_budget.map(|b| now + b),
                soft_deadline: soft_budget.map(|b| now + b),
                hard_budget,
                soft_budget,
            }),
            pondering: AtomicBool::new(limits.ponder),
            hard_nodes: limits.nodes,
            depth_cap: limits.depth.unwrap_or(MAX_DEPTH).clamp(1, MAX_DEPTH),
            mate_target: limits.mate,
        }
    }

    /// A limiter that never stops on its own (ponder fallback, tests)
    #[must_use]
    pub fn infinite() -> Self {
        SearchLimiter::new(&Limits::infinite(), Color::White, 0)
    }

    #[must_use]
    pub fn depth_cap(&self) -> i32 {
        self.depth_cap
    }

    #[must_use]
    pub fn mate_target(&self) -> Option<i32> {
        self.mate_target
    }

    #[must_use]
    pub fn is_pondering(&self) -> bool {
        self.pondering.load(Ordering::Acquire)
    }

    /// Ponderhit: the pondered move was played, so time enforcement begins
    /// with fresh deadlines from this instant
    pub fn stop_pondering(&self) {
        let mut clock = self.clock.lock();
        let now = Instant::now();
        clock.start = now;
        clock.hard_deadline = clock.hard_budget.map(|b| now + b);
        clock.soft_deadline = clock.soft_budget.map(|b| now + b);
        self.pondering.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.lock().start.elapsed()
    }

    /// Hard stop inside the tree. The clock is only sampled every 1024
    /// nodes; node limits are exact.
    #[must_use]
    pub fn should_stop(&self, nodes: u64) -> bool {
        if self.pondering.load(Ordering::Acquire) {
            return false;
        }
        if let Some(limit) = self.hard_nodes {
            if nodes >= limit {
                return true;
            }
        }
        if nodes % 1024 == 0 {
            if let Some(deadline) = self.clock.lock().hard_deadline {
                return Instant::now() >= deadline;
            }
        }
        false
    }

    /// Soft stop between iterations. `scale` stretches or shrinks the soft
    /// deadline (best-move instability extends it, node-count dominance of
    /// one root move shortens it).
    #[must_use]
    pub fn should_stop_soft(&self, nodes: u64, scale: f64) -> bool {
        if self.pondering.load(Ordering::Acquire) {
            return false;
        }
        if let Some(limit) = self.hard_nodes {
            if nodes >= limit {
                return true;
            }
        }
        let clock = self.clock.lock();
        if let (Some(budget), Some(_)) = (clock.soft_budget, clock.soft_deadline) {
            let scaled = budget.mul_f64(scale.clamp(0.3, 3.0));
            return clock.start.elapsed() >= scaled;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinite_never_stops() {
        let limiter = SearchLimiter::infinite();
        assert!(!limiter.should_stop(1 << 20));
        assert!(!limiter.should_stop_soft(1 << 20, 1.0));
    }

    #[test]
    fn test_node_limit() {
        let limits = Limits {
            nodes: Some(1000),
            ..Limits::default()
        };
        let limiter = SearchLimiter::new(&limits, Color::White, 0);
        assert!(!limiter.should_stop(999));
        assert!(limiter.should_stop(1000));
    }

    #[test]
    fn test_depth_cap_clamped() {
        let limiter = SearchLimiter::new(&Limits::depth(500), Color::White, 0);
        assert_eq!(limiter.depth_cap(), MAX_DEPTH);
        let limiter = SearchLimiter::new(&Limits::depth(6), Color::White, 0);
        assert_eq!(limiter.depth_cap(), 6);
    }

    #[test]
    fn test_movetime_deadline() {
        let limits = Limits {
            movetime: Some(1),
            ..Limits::default()
        };
        let limiter = SearchLimiter::new(&limits, Color::White, 0);
        std::thread::sleep(Duration::from_millis(5));
        // Sampled checks only fire on multiples of 1024
        assert!(limiter.should_stop(1024));
        assert!(limiter.should_stop_soft(0, 1.0));
    }

    #[test]
    fn test_pondering_suspends_deadlines() {
        let limits = Limits {
            movetime: Some(1),
            ponder: true,
            ..Limits::default()
        };
        let limiter = SearchLimiter::new(&limits, Color::White, 0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(!limiter.should_stop(1024));
        limiter.stop_pondering();
        assert!(!limiter.is_pondering());
        std::thread::sleep(Duration::from_millis(5));
        assert!(limiter.should_stop(1024));
    }

    #[test]
    fn test_time_allocation_split() {
        let limits = Limits {
            white_time: Some(10_000),
            white_inc: Some(300),
            ..Limits::default()
        };
        let limiter = SearchLimiter::new(&limits, Color::White, 50);
        let clock = limiter.clock.lock();
        // hard = 10000/10 + 300*2/3 - 50 = 1150ms, soft = hard/3
        assert_eq!(clock.hard_budget, Some(Duration::from_millis(1150)));
        assert_eq!(clock.soft_budget, Some(Duration::from_millis(383)));
    }
}
