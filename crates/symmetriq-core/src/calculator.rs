//! Ideal body-proportion targets from frame measurements.
//!
//! Targets are fixed multiples of bone-structure measurements (wrist and
//! ankle) and of the waist, the latter via the golden ratio. All values are
//! in inches and rounded to two decimals.

use serde::Serialize;

use crate::error::{RagError, Result};

/// Shoulder-to-waist ratio of an ideal V-taper.
pub const GOLDEN_RATIO: f64 = 1.618;

/// User-supplied measurements, in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurements {
    pub height: f64,
    pub wrist: f64,
    pub ankle: f64,
    pub waist: f64,
    /// Current shoulder circumference; `0.0` when unknown.
    pub shoulders: f64,
}

impl Default for Measurements {
    fn default() -> Self {
        Self {
            height: 70.0,
            wrist: 5.5,
            ankle: 7.5,
            waist: 29.0,
            shoulders: 0.0,
        }
    }
}

impl Measurements {
    /// Check every measurement against its accepted range.
    pub fn validate(&self) -> Result<()> {
        check_range("height", self.height, 50.0, 90.0)?;
        check_range("wrist", self.wrist, 4.0, 10.0)?;
        check_range("ankle", self.ankle, 5.0, 12.0)?;
        check_range("waist", self.waist, 20.0, 50.0)?;
        check_range("shoulders", self.shoulders, 0.0, 70.0)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(RagError::invalid(
            field,
            format!("{} is outside {}..={} inches", value, min, max),
        ));
    }
    Ok(())
}

/// Target measurements, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Proportions {
    pub shoulders: f64,
    pub chest: f64,
    pub arms: f64,
    pub forearms: f64,
    pub thighs: f64,
    pub calves: f64,
}

impl Proportions {
    /// `(body part, ideal inches)` rows in display order.
    pub fn rows(&self) -> [(&'static str, f64); 6] {
        [
            ("Shoulders", self.shoulders),
            ("Chest", self.chest),
            ("Arms", self.arms),
            ("Forearms", self.forearms),
            ("Thighs", self.thighs),
            ("Calves", self.calves),
        ]
    }
}

/// Where the current shoulders stand relative to the golden-ratio taper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VTaper {
    Achieved { ratio: f64 },
    /// `inches` is the shoulder growth needed to reach the ideal.
    Short { ratio: f64, inches: f64 },
}

pub fn ideal_proportions(m: &Measurements) -> Proportions {
    Proportions {
        shoulders: round2(m.waist * GOLDEN_RATIO),
        chest: round2(m.wrist * 6.5),
        arms: round2(m.wrist * 2.5),
        forearms: round2(m.wrist * 2.0),
        thighs: round2(m.ankle * 2.0),
        calves: round2(m.ankle * 1.9),
    }
}

/// V-taper verdict, or `None` when current shoulders were not given.
pub fn v_taper(m: &Measurements) -> Option<VTaper> {
    if m.shoulders <= 0.0 || m.waist <= 0.0 {
        return None;
    }
    let ratio = round2(m.shoulders / m.waist);
    if ratio < GOLDEN_RATIO {
        let ideal = ideal_proportions(m).shoulders;
        Some(VTaper::Short {
            ratio,
            inches: round2(ideal - m.shoulders),
        })
    } else {
        Some(VTaper::Achieved { ratio })
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
