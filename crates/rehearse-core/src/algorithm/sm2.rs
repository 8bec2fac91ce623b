//! SM-2 (SuperMemo 2).
//!
//! Quality ratings 3-5 grow the interval (first pass, second pass, then
//! multiplied by the ease factor) and adjust the ease factor by
//! `EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))`, floored at 1.3.
//! Ratings 0-2 reset repetitions and send the card back to relearning with
//! its ease factor untouched.

use super::{ReviewAlgorithm, Transition};
use crate::config::Sm2Config;
use crate::types::{Algorithm, Card, LearningState, Quality};

/// SM-2 strategy.
#[derive(Debug, Clone, Default)]
pub struct Sm2 {
    config: Sm2Config,
}

impl Sm2 {
    pub fn new(config: Sm2Config) -> Self {
        Self { config }
    }

    /// Ease factor after a passing grade.
    pub fn next_ease_factor(&self, ease_factor: f64, quality: Quality) -> f64 {
        let miss = 5.0 - quality.value() as f64;
        let ef = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
        ef.max(self.config.min_ease_factor)
    }
}

impl ReviewAlgorithm for Sm2 {
    fn kind(&self) -> Algorithm {
        Algorithm::Sm2
    }

    fn transition(&self, card: &Card, quality: Quality) -> Transition {
        let ease_factor = card.ease_factor.max(self.config.min_ease_factor);

        if quality.is_lapse() {
            return Transition {
                learning_state: LearningState::Relearning,
                interval: self.config.first_interval,
                repetitions: 0,
                ease_factor: (ease_factor != card.ease_factor).then_some(ease_factor),
                leitner_box: None,
            };
        }

        let repetitions = card.repetitions.saturating_add(1);
        let interval = match repetitions {
            1 => self.config.first_interval,
            2 => self.config.second_interval,
            // Grows with the ease factor the card carried into this review.
            _ => (card.interval * ease_factor)
                .round()
                .max(self.config.first_interval)
                .min(self.config.max_interval),
        };

        Transition {
            learning_state: if repetitions >= 2 {
                LearningState::Review
            } else {
                LearningState::Learning
            },
            interval,
            repetitions,
            ease_factor: Some(self.next_ease_factor(ease_factor, quality)),
            leitner_box: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::review;
    use crate::config::MemoryConfig;
    use crate::types::MAX_INTERVAL_DAYS;
    use chrono::Utc;

    fn card() -> Card {
        Card::new("u", Algorithm::Sm2, Utc::now())
    }

    #[test]
    fn test_first_review_correct() {
        let t = Sm2::default().transition(&card(), Quality::CORRECT_HESITANT);
        assert_eq!(t.interval, 1.0);
        assert_eq!(t.repetitions, 1);
        assert_eq!(t.learning_state, LearningState::Learning);
    }

    #[test]
    fn test_second_review_correct() {
        let mut c = card();
        c.repetitions = 1;
        c.interval = 1.0;

        let t = Sm2::default().transition(&c, Quality::CORRECT_HESITANT);
        assert_eq!(t.interval, 6.0);
        assert_eq!(t.repetitions, 2);
        assert_eq!(t.learning_state, LearningState::Review);
    }

    #[test]
    fn test_subsequent_review_multiplies_by_ease() {
        let mut c = card();
        c.repetitions = 5;
        c.interval = 10.0;
        c.ease_factor = 2.5;

        let t = Sm2::default().transition(&c, Quality::CORRECT_HESITANT);
        assert_eq!(t.interval, 25.0);
    }

    #[test]
    fn test_three_perfect_reviews() {
        let sm2 = Sm2::default();
        let memory = MemoryConfig::default();
        let now = Utc::now();
        let mut c = card();
        c.interval = 0.0;
        c.ease_factor = 2.5;

        review(&sm2, &memory, &c, Quality::PERFECT, now).apply(&mut c);
        assert_eq!((c.repetitions, c.interval), (1, 1.0));

        review(&sm2, &memory, &c, Quality::PERFECT, now).apply(&mut c);
        assert_eq!((c.repetitions, c.interval), (2, 6.0));
        let ease_after_two = c.ease_factor;

        review(&sm2, &memory, &c, Quality::PERFECT, now).apply(&mut c);
        assert_eq!(c.repetitions, 3);
        assert_eq!(c.interval, (6.0 * ease_after_two).round());
        assert_eq!(c.learning_state, LearningState::Review);
    }

    #[test]
    fn test_long_run_of_perfect_reviews_is_capped() {
        let sm2 = Sm2::default();
        let memory = MemoryConfig::default();
        let mut now = Utc::now();
        let mut c = card();

        for _ in 0..40 {
            review(&sm2, &memory, &c, Quality::PERFECT, now).apply(&mut c);
            assert!(c.interval <= MAX_INTERVAL_DAYS);
            now = c.next_review;
        }
        assert_eq!(c.interval, MAX_INTERVAL_DAYS);
        assert_eq!(c.repetitions, 40);
    }

    #[test]
    fn test_custom_interval_ceiling() {
        let sm2 = Sm2::new(Sm2Config {
            max_interval: 30.0,
            ..Sm2Config::default()
        });
        let mut c = card();
        c.repetitions = 4;
        c.interval = 25.0;
        c.ease_factor = 2.5;

        assert_eq!(sm2.transition(&c, Quality::PERFECT).interval, 30.0);
    }

    #[test]
    fn test_ease_factor_floor_for_every_quality() {
        let sm2 = Sm2::default();
        for start in [1.3, 1.35, 1.5, 2.5, 3.0] {
            for quality in Quality::all() {
                let mut c = card();
                c.ease_factor = start;
                c.repetitions = 3;
                c.interval = 10.0;

                let t = sm2.transition(&c, quality);
                let ef = t.ease_factor.unwrap_or(c.ease_factor);
                assert!(ef >= 1.3, "ease {ef} below floor for start {start} quality {quality}");
            }
        }
    }

    #[test]
    fn test_lapse_resets_regardless_of_state() {
        let sm2 = Sm2::default();
        for state in [
            LearningState::New,
            LearningState::Learning,
            LearningState::Review,
            LearningState::Relearning,
        ] {
            for quality in [Quality::BLACKOUT, Quality::INCORRECT_RECOGNISED, Quality::INCORRECT_FAMILIAR] {
                let mut c = card();
                c.learning_state = state;
                c.repetitions = 7;
                c.interval = 40.0;

                let t = sm2.transition(&c, quality);
                assert_eq!(t.repetitions, 0);
                assert_eq!(t.learning_state, LearningState::Relearning);
                assert_eq!(t.interval, 1.0);
            }
        }
    }

    #[test]
    fn test_lapse_keeps_ease_factor() {
        let mut c = card();
        c.ease_factor = 2.1;
        let t = Sm2::default().transition(&c, Quality::BLACKOUT);
        assert_eq!(t.ease_factor, None);
    }

    #[test]
    fn test_perfect_raises_and_difficult_lowers_ease() {
        let sm2 = Sm2::default();
        assert!((sm2.next_ease_factor(2.5, Quality::PERFECT) - 2.6).abs() < 1e-9);
        assert!((sm2.next_ease_factor(2.5, Quality::CORRECT_HESITANT) - 2.5).abs() < 1e-9);
        assert!((sm2.next_ease_factor(2.5, Quality::CORRECT_DIFFICULT) - 2.36).abs() < 1e-9);
    }
}
