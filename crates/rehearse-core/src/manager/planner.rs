//! Time-boxed study plans.
//!
//! Due cards are ranked by a weighted mix of forgetting risk
//! (`1 - retention`) and urgency (days overdue over a horizon, capped at 1),
//! then taken greedily while the estimated time fits the budget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use super::ReviewScheduleManager;
use crate::config::PlannerConfig;
use crate::error::RehearseResult;
use crate::math::{mean, round2};
use crate::scheduler::estimate_retention;
use crate::types::{Algorithm, Card, LearningState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StudyFocus {
    NoCardsDue,
    ReviewDifficultCards,
    CatchUpOverdue,
    MaintenanceReview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCard {
    pub card_id: String,
    pub algorithm: Algorithm,
    pub learning_state: LearningState,
    pub retention: f64,
    pub days_overdue: f64,
    pub urgency: f64,
    pub priority: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
    pub user_id: String,
    pub available_time_minutes: u32,
    pub estimated_time_minutes: f64,
    pub total_due: usize,
    pub selected_count: usize,
    pub high_priority: Vec<PlannedCard>,
    pub medium_priority: Vec<PlannedCard>,
    pub low_priority: Vec<PlannedCard>,
    pub average_retention: f64,
    pub average_urgency: f64,
    pub study_focus: StudyFocus,
}

impl ReviewScheduleManager {
    /// Pick the due cards most worth reviewing in `available_time_minutes`.
    pub async fn suggest_study_plan(
        &self,
        user_id: &str,
        available_time_minutes: u32,
    ) -> RehearseResult<StudyPlan> {
        let config = &self.scheduler.config().planner;
        let due = self
            .scheduler
            .get_due_cards(user_id, config.max_candidates, None)
            .await?;

        let plan = build_study_plan(user_id, &due, available_time_minutes, self.scheduler.now(), config);
        debug!(
            user_id,
            due = plan.total_due,
            selected = plan.selected_count,
            focus = %plan.study_focus,
            "Built study plan"
        );
        Ok(plan)
    }
}

pub fn build_study_plan(
    user_id: &str,
    due: &[Card],
    available_time_minutes: u32,
    now: DateTime<Utc>,
    config: &PlannerConfig,
) -> StudyPlan {
    let mut ranked: Vec<PlannedCard> = due.iter().map(|card| rank(card, now, config)).collect();
    ranked.sort_by(|a, b| {
        b.priority
            .total_cmp(&a.priority)
            .then(b.days_overdue.total_cmp(&a.days_overdue))
    });

    let budget_secs = available_time_minutes as u64 * 60;
    let per_card = config.seconds_per_card.max(1) as u64;
    let capacity = (budget_secs / per_card) as usize;
    ranked.truncate(capacity);

    let selected = ranked;
    let average_retention = mean(selected.iter().map(|c| c.retention));
    let average_urgency = mean(selected.iter().map(|c| c.urgency));

    let study_focus = if selected.is_empty() {
        StudyFocus::NoCardsDue
    } else if average_retention < config.difficult_retention {
        StudyFocus::ReviewDifficultCards
    } else if average_urgency > config.urgency_threshold {
        StudyFocus::CatchUpOverdue
    } else {
        StudyFocus::MaintenanceReview
    };

    let selected_count = selected.len();
    let estimated_time_minutes = round2((selected_count as u64 * per_card) as f64 / 60.0);

    let mut plan = StudyPlan {
        user_id: user_id.to_string(),
        available_time_minutes,
        estimated_time_minutes,
        total_due: due.len(),
        selected_count,
        high_priority: Vec::new(),
        medium_priority: Vec::new(),
        low_priority: Vec::new(),
        average_retention,
        average_urgency,
        study_focus,
    };

    for card in selected {
        if card.priority >= config.high_priority {
            plan.high_priority.push(card);
        } else if card.priority >= config.medium_priority {
            plan.medium_priority.push(card);
        } else {
            plan.low_priority.push(card);
        }
    }

    plan
}

fn rank(card: &Card, now: DateTime<Utc>, config: &PlannerConfig) -> PlannedCard {
    let retention = estimate_retention(card, now);
    let days_overdue = card.days_overdue(now);
    let urgency = if config.urgency_horizon_days > 0.0 {
        (days_overdue / config.urgency_horizon_days).min(1.0)
    } else {
        1.0
    };

    PlannedCard {
        card_id: card.id.clone(),
        algorithm: card.algorithm,
        learning_state: card.learning_state,
        retention,
        days_overdue,
        urgency,
        priority: config.retention_weight * (1.0 - retention) + config.urgency_weight * urgency,
    }
}
