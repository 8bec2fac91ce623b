//! Review quality grade.

use serde::{Deserialize, Serialize};

use crate::error::{RehearseError, RehearseResult};

/// Self-reported recall quality on the 0-5 scale.
///
/// - 0: complete blackout
/// - 1: incorrect, the answer was recognised once shown
/// - 2: incorrect but familiar (last failing grade)
/// - 3: correct with serious difficulty
/// - 4: correct after hesitation
/// - 5: perfect recall
///
/// Grades of 3 and above are passes; anything lower is a lapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const BLACKOUT: Quality = Quality(0);
    pub const INCORRECT_RECOGNISED: Quality = Quality(1);
    pub const INCORRECT_FAMILIAR: Quality = Quality(2);
    pub const CORRECT_DIFFICULT: Quality = Quality(3);
    pub const CORRECT_HESITANT: Quality = Quality(4);
    pub const PERFECT: Quality = Quality(5);

    /// Lowest passing grade.
    pub const PASS_THRESHOLD: u8 = 3;

    /// Highest grade.
    pub const MAX: u8 = 5;

    /// Validate a raw grade.
    pub fn new(value: i64) -> RehearseResult<Self> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RehearseError::invalid_quality(value))
        }
    }

    /// Raw grade.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether this grade counts as successful recall.
    pub fn is_pass(self) -> bool {
        self.0 >= Self::PASS_THRESHOLD
    }

    /// Whether this grade is a lapse.
    pub fn is_lapse(self) -> bool {
        !self.is_pass()
    }

    /// All valid grades, lowest first.
    pub fn all() -> impl Iterator<Item = Quality> {
        (0..=Self::MAX).map(Quality)
    }
}

impl TryFrom<i64> for Quality {
    type Error = RehearseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for Quality {
    type Error = RehearseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value as i64)
    }
}

impl TryFrom<u8> for Quality {
    type Error = RehearseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value as i64)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range() {
        for value in 0..=5 {
            assert_eq!(Quality::new(value).unwrap().value() as i64, value);
        }
    }

    #[test]
    fn test_out_of_range_rejected_with_value() {
        for value in [-1_i64, 6, 100] {
            match Quality::new(value) {
                Err(RehearseError::InvalidQuality { value: v }) => assert_eq!(v, value),
                other => panic!("expected InvalidQuality, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_pass_threshold() {
        assert!(Quality::INCORRECT_FAMILIAR.is_lapse());
        assert!(Quality::CORRECT_DIFFICULT.is_pass());
        assert_eq!(Quality::all().filter(|q| q.is_pass()).count(), 3);
    }

    #[test]
    fn test_deserialize_validates() {
        let q: Quality = serde_json::from_str("4").unwrap();
        assert_eq!(q, Quality::CORRECT_HESITANT);
        assert!(serde_json::from_str::<Quality>("9").is_err());
        assert_eq!(serde_json::to_string(&Quality::PERFECT).unwrap(), "5");
    }
}
