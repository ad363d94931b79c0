//! Spawn scheduling for the intersection
//!
//! The run is split into intervals whose lengths are proportional to the
//! weights in the spawn policy; each interval restricts the directions new
//! cars may come from.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use super::types::Direction;

/// Which directions may spawn during an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnRule {
    UpDown,
    LeftRight,
    AllDirections,
    None,
}

impl SpawnRule {
    /// Directions a new car may be given under this rule
    pub fn allowed_directions(self) -> &'static [Direction] {
        match self {
            SpawnRule::UpDown => &[Direction::Up, Direction::Down],
            SpawnRule::LeftRight => &[Direction::Left, Direction::Right],
            SpawnRule::AllDirections => &Direction::ALL,
            SpawnRule::None => &[],
        }
    }
}

impl FromStr for SpawnRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "up_down" => Ok(SpawnRule::UpDown),
            "left_right" => Ok(SpawnRule::LeftRight),
            "all_directions" => Ok(SpawnRule::AllDirections),
            "none" => Ok(SpawnRule::None),
            other => bail!(
                "Unknown spawn rule '{}' (expected up_down, left_right, all_directions or none)",
                other
            ),
        }
    }
}

impl fmt::Display for SpawnRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SpawnRule::UpDown => "up_down",
            SpawnRule::LeftRight => "left_right",
            SpawnRule::AllDirections => "all_directions",
            SpawnRule::None => "none",
        };
        f.write_str(label)
    }
}

/// Parse a policy of the form `up_down:1,left_right:1,all_directions:2`
pub fn parse_spawn_policy(text: &str) -> Result<Vec<(SpawnRule, f64)>> {
    let mut policy = Vec::new();
    for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (label, weight) = entry
            .split_once(':')
            .with_context(|| format!("Spawn policy entry '{}' is missing ':<weight>'", entry))?;
        let rule: SpawnRule = label.parse()?;
        let weight: f64 = weight
            .trim()
            .parse()
            .with_context(|| format!("Invalid weight in spawn policy entry '{}'", entry))?;
        policy.push((rule, weight));
    }
    if policy.is_empty() {
        bail!("Spawn policy must contain at least one entry");
    }
    Ok(policy)
}

/// Spawn rules laid out over the run duration
#[derive(Debug, Clone)]
pub struct SpawnSchedule {
    /// (rule, interval length in seconds), in policy order
    intervals: Vec<(SpawnRule, f64)>,
    period: f64,
}

impl SpawnSchedule {
    /// Allocate `total_duration` seconds across the policy entries in
    /// proportion to their weights
    pub fn new(policy: &[(SpawnRule, f64)], total_duration: f32) -> Result<Self> {
        if policy.is_empty() {
            bail!("Spawn policy must contain at least one entry");
        }
        if let Some((rule, weight)) = policy
            .iter()
            .find(|(_, weight)| !weight.is_finite() || *weight <= 0.0)
        {
            bail!("Spawn weight for '{}' must be positive, got {}", rule, weight);
        }
        if !total_duration.is_finite() || total_duration <= 0.0 {
            bail!(
                "Simulation duration must be positive, got {}",
                total_duration
            );
        }

        let total_weight: f64 = policy.iter().map(|(_, weight)| weight).sum();
        let total_duration = total_duration as f64;
        let intervals: Vec<(SpawnRule, f64)> = policy
            .iter()
            .map(|(rule, weight)| (*rule, weight / total_weight * total_duration))
            .collect();
        let period: f64 = intervals.iter().map(|(_, length)| length).sum();

        Ok(Self { intervals, period })
    }

    pub fn intervals(&self) -> &[(SpawnRule, f64)] {
        &self.intervals
    }

    /// Length of one full pass over the intervals, in seconds
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Rule in force at `elapsed_secs`; the schedule repeats after one period
    pub fn current_interval(&self, elapsed_secs: f64) -> SpawnRule {
        let t = elapsed_secs.max(0.0) % self.period;
        let mut start = 0.0;
        for (rule, length) in &self.intervals {
            let end = start + length;
            if t >= start && t < end {
                return *rule;
            }
            start = end;
        }
        // Float rounding can leave t a hair past the last boundary
        self.intervals
            .last()
            .map(|(rule, _)| *rule)
            .unwrap_or(SpawnRule::None)
    }
}
