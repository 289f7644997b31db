//! User-fixable validation errors, one variant per offending row
//! shape. Contract violations abort via asserts instead.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GradeError {
    #[error("component weights sum to {actual_sum}, expected exactly 100")]
    WeightSum { actual_sum: i32 },

    #[error("component '{name}' has non-positive weight {weight}")]
    NonPositiveWeight { name: String, weight: i32 },

    #[error("component '{name}' has non-positive max score {max_score}")]
    NonPositiveMaxScore { name: String, max_score: f64 },

    #[error("score {score} for component {component_id} is outside [0, {max_score}]")]
    ScoreOutOfRange {
        component_id: Uuid,
        score: f64,
        max_score: f64,
    },

    #[error("{kind} adjustment requires a non-empty reason")]
    MissingAdjustmentReason { kind: &'static str },

    #[error("{kind} adjustment amount {amount} must be greater than zero")]
    NonPositiveAdjustment { kind: &'static str, amount: f64 },
}

pub type GradeResult<T> = Result<T, GradeError>;
