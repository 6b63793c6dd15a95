//! Supervision strategies: pure functions from `(failure, child stats,
//! siblings)` to a directive, plus the restart-rate bookkeeping a parent
//! keeps per child. Grounded in the teacher's `actor::Strategy` /
//! `actor_cell` restart-tracking split, generalized to the `Failed`
//! system message this runtime actually carries.

use std::time::{Duration, Instant};

use crate::protocol::Failure;

/// What should happen to a failed child (and, for `AllForOne`, to its
/// siblings too).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Leave the child's state as-is and let it keep processing.
    Resume,
    /// Replace the child's behavior instance, preserving its ref/mailbox.
    Restart,
    /// Terminate the child permanently.
    Stop,
    /// Re-raise the failure as the supervisor's own; its parent decides.
    Escalate,
}

/// Per-child restart accounting a parent keeps to enforce
/// `max_retries`/`within_time_range`.
#[derive(Debug)]
pub struct RestartStatsState {
    pub count: u32,
    pub window_start: Option<Instant>,
}

impl Default for RestartStatsState {
    fn default() -> Self {
        RestartStatsState {
            count: 0,
            window_start: None,
        }
    }
}

impl RestartStatsState {
    /// Records one more failure and returns the count to compare against
    /// `max_retries`. Resets the window (and the count) if the previous
    /// failure fell outside `within_time_range`.
    pub fn record_failure(&mut self, within: Option<Duration>) -> u32 {
        let now = Instant::now();
        let expired = match (self.window_start, within) {
            (Some(start), Some(window)) => now.duration_since(start) > window,
            _ => false,
        };

        if expired || self.window_start.is_none() {
            self.window_start = Some(now);
            self.count = 1;
        } else {
            self.count += 1;
        }

        self.count
    }
}

/// How a failure classifier decides. Kept deliberately simple: a single
/// default decision plus an ordered list of "if the failure text matches
/// this substring, use this decision instead" overrides, which is enough
/// to express the common Akka-style `Decider` pattern without requiring
/// `std::any`-based exception typing (panics in Rust carry no stable
/// type tag once unwound).
#[derive(Clone)]
pub struct Decider {
    default: Directive,
    overrides: Vec<(String, Directive)>,
}

impl Default for Decider {
    fn default() -> Self {
        Decider {
            default: Directive::Restart,
            overrides: Vec::new(),
        }
    }
}

impl Decider {
    pub fn with_default(directive: Directive) -> Self {
        Decider {
            default: directive,
            overrides: Vec::new(),
        }
    }

    pub fn on_contains(mut self, needle: impl Into<String>, directive: Directive) -> Self {
        self.overrides.push((needle.into(), directive));
        self
    }

    pub fn decide(&self, cause: &Failure) -> Directive {
        let text = cause.to_string();
        for (needle, directive) in &self.overrides {
            if text.contains(needle.as_str()) {
                return *directive;
            }
        }
        self.default
    }
}

/// Whether a supervisor's decision applies only to the failing child
/// (`OneForOne`) or to the failing child and all of its siblings
/// (`AllForOne`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    OneForOne,
    AllForOne,
}

/// A full supervision strategy: how to classify a failure, its scope, and
/// the restart-rate budget.
#[derive(Clone)]
pub struct Strategy {
    pub scope: Scope,
    pub decider: Decider,
    pub max_retries: Option<u32>,
    pub within_time_range: Option<Duration>,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy {
            scope: Scope::OneForOne,
            decider: Decider::default(),
            max_retries: None,
            within_time_range: None,
        }
    }
}

impl Strategy {
    pub fn one_for_one(decider: Decider) -> Self {
        Strategy {
            scope: Scope::OneForOne,
            decider,
            ..Default::default()
        }
    }

    pub fn all_for_one(decider: Decider) -> Self {
        Strategy {
            scope: Scope::AllForOne,
            decider,
            ..Default::default()
        }
    }

    pub fn with_retry_limit(mut self, max_retries: u32, within: Duration) -> Self {
        self.max_retries = Some(max_retries);
        self.within_time_range = Some(within);
        self
    }

    /// Decide what to do about a child's failure, given its own restart
    /// stats. Returns the directive to apply to the failed child (and,
    /// under `AllForOne`, to every sibling too -- the caller is
    /// responsible for iterating siblings when `scope == AllForOne`).
    pub fn handle(&self, cause: &Failure, stats: &mut RestartStatsState) -> Directive {
        let decision = self.decider.decide(cause);

        if decision != Directive::Restart {
            return decision;
        }

        let count = stats.record_failure(self.within_time_range);
        match self.max_retries {
            Some(limit) if count > limit => Directive::Stop,
            _ => Directive::Restart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_budget_exhausts() {
        let strategy = Strategy::one_for_one(Decider::default())
            .with_retry_limit(2, Duration::from_secs(60));
        let mut stats = RestartStatsState::default();
        let cause = Failure::new("boom");

        assert_eq!(strategy.handle(&cause, &mut stats), Directive::Restart);
        assert_eq!(strategy.handle(&cause, &mut stats), Directive::Restart);
        assert_eq!(strategy.handle(&cause, &mut stats), Directive::Stop);
    }

    #[test]
    fn decider_override_wins() {
        let decider = Decider::with_default(Directive::Restart)
            .on_contains("fatal", Directive::Stop);
        assert_eq!(decider.decide(&Failure::new("a fatal error")), Directive::Stop);
        assert_eq!(decider.decide(&Failure::new("transient")), Directive::Restart);
    }
}
