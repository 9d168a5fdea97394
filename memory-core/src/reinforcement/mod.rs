//! Component I — Reinforcement Scheduler.
//!
//! Spaced-repetition review scheduling. Every memory gets a
//! [`ReviewSchedule`] on creation; reviewing it with a [`Grade`] grows or
//! shrinks the next interval per the active [`ReinforcementPolicy`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::error::{Error, Result};

/// A review-outcome grade, SM-2 style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// The memory was not recalled at all; restart the interval.
    Fail,
    /// Recalled with difficulty; grow the interval slowly.
    Hard,
    /// Recalled normally; grow the interval per policy.
    Good,
    /// Recalled easily; grow the interval faster than normal.
    Easy,
}

impl std::str::FromStr for Grade {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Grade::Fail),
            "hard" => Ok(Grade::Hard),
            "good" => Ok(Grade::Good),
            "easy" => Ok(Grade::Easy),
            other => Err(Error::InvalidGrade(other.to_string())),
        }
    }
}

/// A memory's current review state.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSchedule {
    /// The memory this schedule tracks.
    pub memory_id: String,
    /// Current interval, in days, between reviews.
    pub interval_days: f64,
    /// When the memory was last reviewed, if ever.
    pub last_reviewed: Option<DateTime<Utc>>,
    /// When the next review is due.
    pub due_at: DateTime<Utc>,
    /// How many times this memory has been reviewed.
    pub review_count: u64,
    /// Whether this memory is flagged as a flashbulb memory, which
    /// changes how fast its interval grows.
    pub is_flashbulb: bool,
}

/// Pluggable interval-growth policy, so scheduling behavior can be
/// swapped without touching [`ReinforcementScheduler`].
pub trait ReinforcementPolicy: Send + Sync {
    /// The interval, in days, to use for a brand-new schedule.
    fn initial_interval_days(&self) -> f64;

    /// The next interval given the previous one, the grade just
    /// recorded, and whether the memory is a flashbulb memory.
    fn next_interval_days(&self, previous_interval_days: f64, grade: Grade, is_flashbulb: bool) -> f64;
}

/// The default policy: standard SM-2-ish doubling on `Good`, with
/// flashbulb memories growing by [`defaults::FLASHBULB_INTERVAL_MULTIPLIER`]
/// instead of the default doubling.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl ReinforcementPolicy for DefaultPolicy {
    fn initial_interval_days(&self) -> f64 {
        defaults::INITIAL_REVIEW_INTERVAL_DAYS
    }

    fn next_interval_days(&self, previous_interval_days: f64, grade: Grade, is_flashbulb: bool) -> f64 {
        let multiplier = match grade {
            Grade::Fail => return defaults::MIN_REVIEW_INTERVAL_DAYS,
            Grade::Hard => 1.2,
            Grade::Good if is_flashbulb => defaults::FLASHBULB_INTERVAL_MULTIPLIER,
            Grade::Good => 2.0,
            Grade::Easy if is_flashbulb => defaults::FLASHBULB_INTERVAL_MULTIPLIER * 1.3,
            Grade::Easy => 2.6,
        };
        (previous_interval_days * multiplier).max(defaults::MIN_REVIEW_INTERVAL_DAYS)
    }
}

/// Tracks [`ReviewSchedule`]s across memories and advances them on
/// review.
pub struct ReinforcementScheduler<P: ReinforcementPolicy = DefaultPolicy> {
    policy: P,
    schedules: RwLock<HashMap<String, ReviewSchedule>>,
}

impl ReinforcementScheduler<DefaultPolicy> {
    /// A scheduler using [`DefaultPolicy`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DefaultPolicy)
    }
}

impl Default for ReinforcementScheduler<DefaultPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ReinforcementPolicy> ReinforcementScheduler<P> {
    /// A scheduler using a custom policy.
    pub fn with_policy(policy: P) -> Self {
        Self {
            policy,
            schedules: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a fresh schedule for a new memory, due after the policy's
    /// initial interval.
    pub fn schedule_new(&self, memory_id: &str, is_flashbulb: bool, now: DateTime<Utc>) -> ReviewSchedule {
        let interval = self.policy.initial_interval_days();
        let schedule = ReviewSchedule {
            memory_id: memory_id.to_string(),
            interval_days: interval,
            last_reviewed: None,
            due_at: now + chrono::Duration::seconds((interval * 86400.0) as i64),
            review_count: 0,
            is_flashbulb,
        };
        self.schedules.write().insert(memory_id.to_string(), schedule.clone());
        schedule
    }

    /// Records a review outcome, advancing the schedule's interval and
    /// due date. Errors with [`Error::NotScheduled`] if `memory_id` has
    /// no schedule yet.
    pub fn record_review(&self, memory_id: &str, grade: Grade, now: DateTime<Utc>) -> Result<ReviewSchedule> {
        let mut schedules = self.schedules.write();
        let schedule = schedules.get_mut(memory_id).ok_or_else(|| Error::NotScheduled(memory_id.to_string()))?;

        let next_interval = self.policy.next_interval_days(schedule.interval_days, grade, schedule.is_flashbulb);
        schedule.interval_days = next_interval;
        schedule.last_reviewed = Some(now);
        schedule.due_at = now + chrono::Duration::seconds((next_interval * 86400.0) as i64);
        schedule.review_count += 1;
        Ok(schedule.clone())
    }

    /// Up to `limit` schedules currently due at or before `now`, ordered by
    /// `due_at` ascending then `memory_id` ascending.
    #[must_use]
    pub fn due_reviews(&self, limit: usize, now: DateTime<Utc>) -> Vec<ReviewSchedule> {
        let mut due: Vec<ReviewSchedule> =
            self.schedules.read().values().filter(|s| s.due_at <= now).cloned().collect();
        due.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.memory_id.cmp(&b.memory_id)));
        due.truncate(limit);
        due
    }

    /// How many schedules are overdue (due strictly before `now`).
    #[must_use]
    pub fn overdue_count(&self, now: DateTime<Utc>) -> usize {
        self.schedules.read().values().filter(|s| s.due_at < now).count()
    }

    /// How many schedules were last reviewed on the same calendar day as
    /// `now` (UTC), for a simple daily-volume metric.
    #[must_use]
    pub fn daily_count(&self, now: DateTime<Utc>) -> usize {
        let today = now.date_naive();
        self.schedules
            .read()
            .values()
            .filter(|s| s.last_reviewed.is_some_and(|t| t.date_naive() == today))
            .count()
    }

    /// The tracked schedule for `memory_id`, if any.
    #[must_use]
    pub fn schedule_for(&self, memory_id: &str) -> Option<ReviewSchedule> {
        self.schedules.read().get(memory_id).cloned()
    }

    /// A snapshot of every tracked schedule, for checkpointing to the
    /// `review_schedule` table.
    #[must_use]
    pub fn all_schedules(&self) -> Vec<ReviewSchedule> {
        self.schedules.read().values().cloned().collect()
    }

    /// Rebuilds the scheduler's state from previously-checkpointed rows,
    /// e.g. on startup from the `review_schedule` table.
    pub fn load_schedules(&self, rows: Vec<ReviewSchedule>) {
        let mut schedules = self.schedules.write();
        for schedule in rows {
            schedules.insert(schedule.memory_id.clone(), schedule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_parses_case_insensitively() {
        assert_eq!("GOOD".parse::<Grade>().unwrap(), Grade::Good);
        assert!("excellent".parse::<Grade>().is_err());
    }

    #[test]
    fn schedule_new_sets_initial_interval() {
        let scheduler = ReinforcementScheduler::new();
        let now = Utc::now();
        let schedule = scheduler.schedule_new("m1", false, now);
        assert_eq!(schedule.interval_days, defaults::INITIAL_REVIEW_INTERVAL_DAYS);
        assert_eq!(schedule.review_count, 0);
    }

    #[test]
    fn record_review_on_unscheduled_memory_errors() {
        let scheduler = ReinforcementScheduler::new();
        let result = scheduler.record_review("ghost", Grade::Good, Utc::now());
        assert!(matches!(result, Err(Error::NotScheduled(_))));
    }

    #[test]
    fn fail_resets_interval_to_minimum() {
        let scheduler = ReinforcementScheduler::new();
        let now = Utc::now();
        scheduler.schedule_new("m1", false, now);
        scheduler.record_review("m1", Grade::Good, now).unwrap();
        let after_fail = scheduler.record_review("m1", Grade::Fail, now).unwrap();
        assert_eq!(after_fail.interval_days, defaults::MIN_REVIEW_INTERVAL_DAYS);
    }

    #[test]
    fn good_doubles_interval_for_non_flashbulb() {
        let scheduler = ReinforcementScheduler::new();
        let now = Utc::now();
        scheduler.schedule_new("m1", false, now);
        let after = scheduler.record_review("m1", Grade::Good, now).unwrap();
        assert_eq!(after.interval_days, defaults::INITIAL_REVIEW_INTERVAL_DAYS * 2.0);
    }

    #[test]
    fn flashbulb_memory_grows_by_reduced_multiplier() {
        let scheduler = ReinforcementScheduler::new();
        let now = Utc::now();
        scheduler.schedule_new("m1", true, now);
        let after = scheduler.record_review("m1", Grade::Good, now).unwrap();
        assert_eq!(
            after.interval_days,
            defaults::INITIAL_REVIEW_INTERVAL_DAYS * defaults::FLASHBULB_INTERVAL_MULTIPLIER
        );
    }

    #[test]
    fn due_reviews_includes_schedules_due_exactly_now() {
        let scheduler = ReinforcementScheduler::new();
        let now = Utc::now();
        scheduler.schedule_new("m1", false, now - chrono::Duration::days(2));
        let due = scheduler.due_reviews(10, now);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn due_reviews_orders_by_due_at_then_id_and_respects_limit() {
        let scheduler = ReinforcementScheduler::new();
        let now = Utc::now();
        scheduler.schedule_new("later", false, now - chrono::Duration::days(1));
        scheduler.schedule_new("earlier", false, now - chrono::Duration::days(3));
        scheduler.schedule_new("also-earlier", false, now - chrono::Duration::days(3));

        let due = scheduler.due_reviews(2, now);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].memory_id, "also-earlier");
        assert_eq!(due[1].memory_id, "earlier");
    }
}
