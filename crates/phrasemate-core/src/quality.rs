//! The self-reported recall quality signal.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::Error;

/// How well the learner recalled a phrase, from worst to best.
///
/// Only the five ordinals below exist; anything else is rejected with
/// [`Error::InvalidQuality`] before any state is touched.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Display,
  EnumIter,
  Serialize,
  Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum RecallQuality {
  Forgot     = 1,
  Hesitant   = 2,
  Remembered = 3,
  Fluent     = 4,
  Perfect    = 5,
}

impl RecallQuality {
  pub const fn ordinal(self) -> u8 { self as u8 }

  /// `5 - ordinal`: zero for a perfect answer, four for a blank.
  pub fn distance_from_perfect(self) -> f64 {
    f64::from(Self::Perfect.ordinal() - self.ordinal())
  }

  /// Whether the answer counts as a successful recall (Remembered or better).
  pub fn is_recalled(self) -> bool { self >= Self::Remembered }

  /// All qualities in ascending order; the choice set offered to the learner.
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }
}

impl TryFrom<u8> for RecallQuality {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      1 => Ok(Self::Forgot),
      2 => Ok(Self::Hesitant),
      3 => Ok(Self::Remembered),
      4 => Ok(Self::Fluent),
      5 => Ok(Self::Perfect),
      other => Err(Error::InvalidQuality(other)),
    }
  }
}

impl From<RecallQuality> for u8 {
  fn from(q: RecallQuality) -> Self { q.ordinal() }
}
