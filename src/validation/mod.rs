//! Client-side parameter validation.
//!
//! [`validate`] maps a parameter name and a candidate string to a
//! [`Validation`] using the static rule table in [`rules`]. It is pure and
//! total: every input produces a structured result, and names without a
//! registered rule are accepted unchanged so that parameters added by newer
//! daemons still pass through.
//!
//! ```rust
//! use motionctl::validation::{validate, Validation};
//!
//! assert!(validate("stream_quality", "80").is_valid());
//! assert!(!validate("threshold", "abc").is_valid());
//! assert_eq!(validate("brand_new_param", "anything"), Validation::Valid);
//! ```

pub mod rules;

use crate::types::parse_bool;
pub use rules::{RULES_VERSION, known_parameters, rule_for};

/// Outcome of validating one candidate value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid { message: String },
}

impl Validation {
    /// Check if the candidate passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// Failure message, if the candidate was rejected.
    pub fn message(&self) -> Option<&str> {
        match self {
            Validation::Valid => None,
            Validation::Invalid { message } => Some(message),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Validation::Invalid { message: message.into() }
    }
}

/// Type and range rule for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Whole number in `min..=max`
    Int { min: i64, max: i64 },
    /// Whole number in `min..=max` that is a multiple of `multiple`
    IntMultiple { min: i64, max: i64, multiple: i64 },
    /// `0` (automatic) or a whole number in `min..=max`
    IntOrZero { min: i64, max: i64 },
    /// Whole number from a fixed set
    IntSet(&'static [i64]),
    /// Decimal number in `min..=max`
    Float { min: f64, max: f64 },
    /// One of a fixed set of option strings
    OneOf(&'static [&'static str]),
    /// On/off toggle
    Bool,
    /// Free text
    Text { non_empty: bool },
    /// Weekly schedule: seven `|`-separated day fields of `HH:MM-HH:MM` ranges
    Schedule,
}

impl Rule {
    /// Check a candidate against this rule.
    pub fn check(&self, candidate: &str) -> Validation {
        match *self {
            Rule::Int { min, max } => match parse_int(candidate) {
                Ok(v) => in_range(v, min, max),
                Err(v) => v,
            },
            Rule::IntMultiple { min, max, multiple } => match parse_int(candidate) {
                Ok(v) if v % multiple != 0 => {
                    Validation::invalid(format!("Must be a multiple of {}", multiple))
                }
                Ok(v) => in_range(v, min, max),
                Err(v) => v,
            },
            Rule::IntOrZero { min, max } => match parse_int(candidate) {
                Ok(0) => Validation::Valid,
                Ok(v) if (min..=max).contains(&v) => Validation::Valid,
                Ok(_) => Validation::invalid(format!("Must be 0 (auto) or between {} and {}", min, max)),
                Err(v) => v,
            },
            Rule::IntSet(allowed) => match parse_int(candidate) {
                Ok(v) if allowed.contains(&v) => Validation::Valid,
                Ok(_) => Validation::invalid(format!("Must be one of: {}", join(allowed))),
                Err(v) => v,
            },
            Rule::Float { min, max } => match candidate.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v >= min && v <= max => Validation::Valid,
                Ok(v) if v.is_finite() => {
                    Validation::invalid(format!("Must be between {} and {}", min, max))
                }
                _ => Validation::invalid("Must be a number"),
            },
            Rule::OneOf(options) => {
                if options.contains(&candidate) {
                    Validation::Valid
                } else {
                    Validation::invalid(format!("Must be one of: {}", options.join(", ")))
                }
            }
            Rule::Bool => match parse_bool(candidate) {
                Some(_) => Validation::Valid,
                None => Validation::invalid("Must be on or off"),
            },
            Rule::Text { non_empty } => {
                if non_empty && candidate.trim().is_empty() {
                    Validation::invalid("Must not be empty")
                } else {
                    Validation::Valid
                }
            }
            Rule::Schedule => check_schedule(candidate),
        }
    }
}

/// Validate a candidate value for a named parameter.
pub fn validate(name: &str, candidate: &str) -> Validation {
    match rule_for(name) {
        Some(rule) => rule.check(candidate),
        None => Validation::Valid,
    }
}

fn parse_int(candidate: &str) -> Result<i64, Validation> {
    candidate.trim().parse::<i64>().map_err(|_| Validation::invalid("Must be a whole number"))
}

fn in_range(value: i64, min: i64, max: i64) -> Validation {
    if (min..=max).contains(&value) {
        Validation::Valid
    } else {
        Validation::invalid(format!("Must be between {} and {}", min, max))
    }
}

fn join(values: &[i64]) -> String {
    values.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}

fn check_schedule(candidate: &str) -> Validation {
    if candidate.is_empty() {
        return Validation::Valid;
    }
    let days: Vec<&str> = candidate.split('|').collect();
    if days.len() != 7 {
        return Validation::invalid("Schedule must have 7 day fields separated by '|'");
    }
    let all_ranges_ok = days
        .iter()
        .filter(|day| !day.is_empty())
        .flat_map(|day| day.split(','))
        .all(is_time_range);
    if all_ranges_ok {
        Validation::Valid
    } else {
        Validation::invalid("Schedule ranges must look like HH:MM-HH:MM")
    }
}

fn is_time_range(range: &str) -> bool {
    match range.split_once('-') {
        Some((start, end)) => match (parse_time(start), parse_time(end)) {
            (Some(s), Some(e)) => s <= e,
            _ => false,
        },
        None => false,
    }
}

fn parse_time(time: &str) -> Option<u32> {
    let (h, m) = time.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let (h, m): (u32, u32) = (h.parse().ok()?, m.parse().ok()?);
    (h < 24 && m < 60).then_some(h * 60 + m)
}
