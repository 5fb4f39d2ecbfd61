//! Glycemic load and GI/GL classification

use std::fmt;

use serde::Serialize;

/// Glycemic load for one serving
///
/// `round(index * carbs / 100, 1)`. Absent when either input is absent;
/// zero or negative carbohydrate gives a load of 0.
pub fn calculate_gl(glycemic_index: Option<u8>, carbs_per_serving: Option<f64>) -> Option<f64> {
    let index = f64::from(glycemic_index?);
    let carbs = carbs_per_serving.filter(|c| c.is_finite())?;
    if carbs <= 0.0 {
        return Some(0.0);
    }
    Some(round_tenth(index * carbs / 100.0))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Glycemic index band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GiLevel {
    /// 55 or less
    Low,
    /// 56 to 69
    Medium,
    /// 70 and up
    High,
}

impl GiLevel {
    pub fn from_index(index: u8) -> Self {
        match index {
            0..=55 => GiLevel::Low,
            56..=69 => GiLevel::Medium,
            _ => GiLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GiLevel::Low => "low",
            GiLevel::Medium => "medium",
            GiLevel::High => "high",
        }
    }
}

impl fmt::Display for GiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Glycemic load band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlLevel {
    /// 10 or less
    Low,
    /// Above 10 up to 19
    Medium,
    /// Above 19
    High,
}

impl GlLevel {
    pub fn from_load(load: f64) -> Self {
        if load <= 10.0 {
            GlLevel::Low
        } else if load <= 19.0 {
            GlLevel::Medium
        } else {
            GlLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GlLevel::Low => "low",
            GlLevel::Medium => "medium",
            GlLevel::High => "high",
        }
    }
}

impl fmt::Display for GlLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
