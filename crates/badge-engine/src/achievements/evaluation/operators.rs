use serde::{Deserialize, Serialize};

const EQUALITY_TOLERANCE: f64 = 1e-9;

/// Numeric comparison applied to a rule's resolved value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", content = "target", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparison {
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    Eq(f64),
    Neq(f64),
    /// Inclusive on both ends.
    Between {
        min: f64,
        max: f64,
    },
    /// Operator or target that could not be understood; never matches.
    #[serde(other)]
    Unsupported,
}

impl Comparison {
    /// Parse a string-encoded operator and target, e.g. `("BETWEEN", "2200,2800")`.
    pub fn parse(operator: &str, target: &str) -> Result<Self, ComparisonParseError> {
        let operator = operator.trim().to_ascii_uppercase();

        if matches!(operator.as_str(), "BETWEEN" | "RANGE") {
            let (min, max) = parse_range(target)?;
            return Ok(Comparison::Between { min, max });
        }

        let build: fn(f64) -> Comparison = match operator.as_str() {
            "GT" | ">" => Comparison::Gt,
            "GTE" | ">=" => Comparison::Gte,
            "LT" | "<" => Comparison::Lt,
            "LTE" | "<=" => Comparison::Lte,
            "EQ" | "=" | "==" => Comparison::Eq,
            "NEQ" | "!=" | "<>" => Comparison::Neq,
            _ => return Err(ComparisonParseError::UnknownOperator(operator)),
        };

        Ok(build(parse_number(target)?))
    }

    pub fn matches(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }

        match *self {
            Comparison::Gt(target) => value > target,
            Comparison::Gte(target) => value >= target,
            Comparison::Lt(target) => value < target,
            Comparison::Lte(target) => value <= target,
            Comparison::Eq(target) => (value - target).abs() < EQUALITY_TOLERANCE,
            Comparison::Neq(target) => (value - target).abs() >= EQUALITY_TOLERANCE,
            Comparison::Between { min, max } => value >= min && value <= max,
            Comparison::Unsupported => false,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Comparison::Unsupported)
    }
}

fn parse_number(raw: &str) -> Result<f64, ComparisonParseError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ComparisonParseError::InvalidTarget(raw.to_string()))
}

fn parse_range(raw: &str) -> Result<(f64, f64), ComparisonParseError> {
    let invalid = || ComparisonParseError::InvalidRange(raw.to_string());
    let (min, max) = raw.split_once(',').ok_or_else(invalid)?;
    let min = parse_number(min).map_err(|_| invalid())?;
    let max = parse_number(max).map_err(|_| invalid())?;
    if min > max {
        return Err(invalid());
    }
    Ok((min, max))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComparisonParseError {
    #[error("unknown comparison operator '{0}'")]
    UnknownOperator(String),
    #[error("comparison target '{0}' is not a number")]
    InvalidTarget(String),
    #[error("range target '{0}' must be formatted as min,max")]
    InvalidRange(String),
}
