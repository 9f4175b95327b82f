//! The review scheduler: a pure function from the previous review state and a
//! new recall quality to the next ease factor, interval and due date.
//!
//! The ease update is the classic smoothed spaced-repetition adjustment
//!
//! ```text
//! d    = 5 - quality
//! ease = previous + (0.1 - d * (0.08 + d * 0.02))
//! ```
//!
//! rounded to two decimals and floored at [`MIN_EASE_FACTOR`]. Intervals are
//! whole calendar days anchored at midnight UTC.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::{model::Review, quality::RecallQuality};

/// Ease factor of a phrase that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lower bound for every stored ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// The outcome of scheduling one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schedule {
  pub ease_factor:    f64,
  pub interval_days:  u32,
  pub reviewed_at:    DateTime<Utc>,
  pub next_review_at: DateTime<Utc>,
  /// The interval reached the mastery threshold.
  pub mastered:       bool,
}

pub fn next_ease_factor(previous: f64, quality: RecallQuality) -> f64 {
  let d = quality.distance_from_perfect();
  let ease = previous + (0.1 - d * (0.08 + d * 0.02));
  let ease = (ease * 100.0).round() / 100.0;
  ease.max(MIN_EASE_FACTOR)
}

/// Failed recalls and first reviews restart at one day; otherwise the
/// previous interval grows by the new ease factor (floored).
pub fn next_interval(
  previous_interval: u32,
  new_ease: f64,
  quality: RecallQuality,
) -> u32 {
  if !quality.is_recalled() || previous_interval == 0 {
    return 1;
  }
  let grown = (f64::from(previous_interval) * new_ease).floor();
  // `as` saturates on overflow.
  (grown as u32).max(1)
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
  now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

pub fn due_date(now: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
  start_of_day(now) + Duration::days(i64::from(interval_days))
}

/// Compute the next schedule for an attempt at `now`.
///
/// `previous` is the current review for the pair, if any; a fresh phrase uses
/// [`DEFAULT_EASE_FACTOR`] and an interval of zero.
pub fn schedule(
  previous: Option<&Review>,
  quality: RecallQuality,
  now: DateTime<Utc>,
  max_interval_days: u32,
) -> Schedule {
  let (previous_ease, previous_interval) = previous
    .map(|r| (r.ease_factor, r.interval_days))
    .unwrap_or((DEFAULT_EASE_FACTOR, 0));

  let ease_factor = next_ease_factor(previous_ease, quality);
  let interval_days = next_interval(previous_interval, ease_factor, quality);

  Schedule {
    ease_factor,
    interval_days,
    reviewed_at: now,
    next_review_at: due_date(now, interval_days),
    mastered: interval_days >= max_interval_days,
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::model::{PhraseId, SessionId, UserId};

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
  }

  fn review(ease: f64, interval: u32, next: DateTime<Utc>) -> Review {
    Review {
      user_id:        UserId(1),
      phrase_id:      PhraseId(1),
      session_id:     SessionId(1),
      recall_quality: RecallQuality::Fluent,
      ease_factor:    ease,
      interval_days:  interval,
      reviewed_at:    next - Duration::days(i64::from(interval)),
      next_review_at: next,
    }
  }

  #[test]
  fn fresh_phrase_ease_by_quality() {
    let now = at(2024, 3, 10, 15);
    let cases = [
      (RecallQuality::Perfect, 2.6),
      (RecallQuality::Fluent, 2.5),
      (RecallQuality::Remembered, 2.36),
      (RecallQuality::Hesitant, 2.18),
      (RecallQuality::Forgot, 1.96),
    ];
    for (quality, ease) in cases {
      let s = schedule(None, quality, now, 180);
      assert_eq!(s.ease_factor, ease, "{quality}");
      assert_eq!(s.interval_days, 1, "{quality}");
      assert!(!s.mastered);
    }
  }

  #[test]
  fn ease_is_floored() {
    assert_eq!(next_ease_factor(1.3, RecallQuality::Forgot), MIN_EASE_FACTOR);
    assert_eq!(next_ease_factor(1.5, RecallQuality::Hesitant), MIN_EASE_FACTOR);
    assert_eq!(next_ease_factor(1.3, RecallQuality::Perfect), 1.4);
  }

  #[test]
  fn next_review_is_anchored_at_midnight() {
    let now = at(2024, 3, 10, 23);
    let s = schedule(None, RecallQuality::Perfect, now, 180);
    assert_eq!(s.reviewed_at, now);
    assert_eq!(
      s.next_review_at,
      Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
    );
  }

  #[test]
  fn successful_recall_grows_interval() {
    let now = at(2024, 3, 20, 9);
    let prev = review(2.5, 6, at(2024, 3, 20, 0));
    let s = schedule(Some(&prev), RecallQuality::Perfect, now, 180);
    assert_eq!(s.ease_factor, 2.6);
    // floor(6 * 2.6) = 15
    assert_eq!(s.interval_days, 15);
    assert_eq!(s.next_review_at, start_of_day(now) + Duration::days(15));
  }

  #[test]
  fn failed_recall_resets_interval() {
    let now = at(2024, 3, 20, 9);
    let prev = review(2.5, 40, at(2024, 3, 19, 0));
    for quality in [RecallQuality::Forgot, RecallQuality::Hesitant] {
      let s = schedule(Some(&prev), quality, now, 180);
      assert_eq!(s.interval_days, 1);
    }
  }

  #[test]
  fn crossing_threshold_marks_mastered() {
    let now = at(2024, 9, 1, 9);
    let prev = review(2.5, 70, at(2024, 9, 1, 0));
    let s = schedule(Some(&prev), RecallQuality::Perfect, now, 180);
    assert_eq!(s.interval_days, 182);
    assert!(s.mastered);

    let below = schedule(Some(&prev), RecallQuality::Remembered, now, 180);
    // floor(70 * 2.36) = 165
    assert_eq!(below.interval_days, 165);
    assert!(!below.mastered);
  }

  #[test]
  fn due_check_uses_next_review_at() {
    let next = at(2024, 3, 11, 0);
    let prev = review(2.5, 1, next);
    assert!(!prev.is_due(next - Duration::seconds(1)));
    assert!(prev.is_due(next));
    assert!(prev.is_due(next + Duration::hours(3)));
  }
}
