//! Objective functions and output transformations.
//!
//! The [`Objective`] enum determines how the raw margins summed over the
//! forest become the score returned to callers. Binary classification uses
//! sigmoid to convert logits to probabilities, matching what XGBoost's
//! `Booster.predict` returns by default.

use std::cmp::Ordering;

use crate::compat::xgboost;

/// The training objective is not usable for single-score serving.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("objective `{0}` does not produce a single score")]
pub struct UnsupportedObjective(pub &'static str);

/// Objective function for output transformation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Objective {
    /// Squared/absolute error, raw logits, ranking: no transformation.
    #[default]
    Identity,

    /// Binary logistic (sigmoid transform).
    BinaryLogistic,

    /// Binary hinge: 1.0 for a positive margin, else 0.0.
    BinaryHinge,

    /// Poisson, gamma, tweedie, cox (exp transform).
    Exp,

    /// Multiclass softmax: index of the highest margin.
    MultiSoftmax { num_class: u32 },
}

impl Objective {
    /// Map an XGBoost objective to its output transformation.
    ///
    /// `multi:softprob` yields one probability per class and is rejected.
    pub fn from_xgboost(objective: &xgboost::Objective) -> Result<Self, UnsupportedObjective> {
        use xgboost::Objective as X;

        Ok(match objective {
            X::RegSquaredError
            | X::RegPseudohuberError
            | X::RegSquaredLogError
            | X::RegLinear
            | X::RegAbsoluteError
            | X::BinaryLogitRaw
            | X::RankPairwise
            | X::RankNdcg
            | X::RankMap
            | X::Unknown => Objective::Identity,
            X::RegLogistic | X::BinaryLogistic => Objective::BinaryLogistic,
            X::BinaryHinge => Objective::BinaryHinge,
            X::CountPoisson | X::RegTweedie | X::RegGamma | X::SurvivalCox => Objective::Exp,
            X::MultiSoftmax {
                softmax_multiclass_param,
            } => Objective::MultiSoftmax {
                num_class: softmax_multiclass_param.num_class.max(1) as u32,
            },
            X::MultiSoftprob { .. } => return Err(UnsupportedObjective(objective.name())),
        })
    }

    /// Number of margins [`transform`](Self::transform) expects.
    pub fn num_outputs(&self) -> usize {
        match self {
            Objective::MultiSoftmax { num_class } => *num_class as usize,
            _ => 1,
        }
    }

    /// Turn the per-group margins of one row into the final score.
    pub fn transform(&self, margins: &[f32]) -> f32 {
        debug_assert_eq!(margins.len(), self.num_outputs());
        match self {
            Objective::Identity => margins[0],
            Objective::BinaryLogistic => sigmoid(margins[0]),
            Objective::BinaryHinge => {
                if margins[0] > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Objective::Exp => margins[0].exp(),
            Objective::MultiSoftmax { .. } => argmax(margins) as f32,
        }
    }

    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Objective::Identity => "identity",
            Objective::BinaryLogistic => "binary:logistic",
            Objective::BinaryHinge => "binary:hinge",
            Objective::Exp => "exp",
            Objective::MultiSoftmax { .. } => "multi:softmax",
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Index of the first maximum, skipping NaN. An all-NaN row yields 0.
fn argmax(values: &[f32]) -> usize {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if v.partial_cmp(&top) != Some(Ordering::Greater) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map_or(0, |(i, _)| i)
}
