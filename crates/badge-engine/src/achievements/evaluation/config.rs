use serde::{Deserialize, Serialize};

use crate::achievements::history::PercentileBands;

/// Tunables for rule evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub percentile_bands: PercentileBands,
}
