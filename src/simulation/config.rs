//! Simulation configuration
//!
//! Every constant the components need (geometry, timing, spawn policy,
//! controller mode) lives here and is passed in explicitly.

use anyhow::{bail, Result};

use super::spawner::{SpawnRule, SpawnSchedule};
use super::types::{ControlMode, CAR_LENGTH, CAR_SPEED, CAR_WIDTH, TICKS_PER_SECOND};

/// Green time before the fixed timer forces a change
pub const GREEN_DURATION: u32 = 300;

/// Time an axis stays yellow before turning red
pub const YELLOW_DURATION: u32 = 90;

/// Minimum green dwell before the adaptive controller may request a change
pub const MIN_GREEN_TICKS: u32 = 150;

/// Distance from the intersection center to the stop line
pub const STOP_LINE_OFFSET: f32 = 50.0;

/// Depth of the band behind the stop line where a car halts
pub const STOP_BAND: f32 = 3.0;

/// Configuration for one simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Window width in world units
    pub width: f32,
    /// Window height in world units
    pub height: f32,
    pub ticks_per_second: u32,

    pub car_speed: f32,
    pub car_width: f32,
    pub car_length: f32,

    /// Offset of a lane from the centerline on the driver's right
    pub lane_offset: f32,
    /// Gap between the centerline and the opposite lane
    pub lane_gap: f32,
    pub stop_line_offset: f32,
    pub stop_band: f32,
    /// Following band behind a stopped car (inclusive)
    pub follow_gap_min: f32,
    pub follow_gap_max: f32,

    /// Ticks of green before the fixed timer switches
    pub green_duration: u32,
    pub yellow_duration: u32,
    /// Dwell time for the adaptive controller
    pub min_green_ticks: u32,

    /// Seconds between spawn attempts
    pub car_spawn_frequency: f32,
    /// Run length in seconds, used to size the spawn intervals
    pub simulation_duration: f32,
    pub spawn_policy: Vec<(SpawnRule, f64)>,

    pub mode: ControlMode,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            ticks_per_second: TICKS_PER_SECOND,
            car_speed: CAR_SPEED,
            car_width: CAR_WIDTH,
            car_length: CAR_LENGTH,
            lane_offset: 5.0,
            lane_gap: 4.0,
            stop_line_offset: STOP_LINE_OFFSET,
            stop_band: STOP_BAND,
            follow_gap_min: 4.0,
            follow_gap_max: 6.0,
            green_duration: GREEN_DURATION,
            yellow_duration: YELLOW_DURATION,
            min_green_ticks: MIN_GREEN_TICKS,
            car_spawn_frequency: 1.5,
            simulation_duration: 120.0,
            spawn_policy: vec![
                (SpawnRule::AllDirections, 2.0),
                (SpawnRule::UpDown, 1.0),
                (SpawnRule::LeftRight, 1.0),
                (SpawnRule::None, 1.0),
            ],
            mode: ControlMode::FixedTimer,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Check the configuration before anything is built from it
    pub fn validate(&self) -> Result<()> {
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            bail!(
                "Window size must be greater than 0 (got {}x{})",
                self.width,
                self.height
            );
        }
        if self.ticks_per_second == 0 {
            bail!("ticks_per_second must be greater than 0");
        }
        ensure_positive("car_speed", self.car_speed)?;
        ensure_positive("car_width", self.car_width)?;
        ensure_positive("car_length", self.car_length)?;
        ensure_non_negative("lane_offset", self.lane_offset)?;
        ensure_non_negative("lane_gap", self.lane_gap)?;
        ensure_non_negative("stop_line_offset", self.stop_line_offset)?;
        ensure_non_negative("stop_band", self.stop_band)?;
        ensure_non_negative("follow_gap_min", self.follow_gap_min)?;
        ensure_non_negative("follow_gap_max", self.follow_gap_max)?;
        if self.follow_gap_min > self.follow_gap_max {
            bail!(
                "Invalid following band {}..={}",
                self.follow_gap_min,
                self.follow_gap_max
            );
        }

        let reach = self.stop_line_offset + self.stop_band + self.car_length;
        if self.width / 2.0 <= reach || self.height / 2.0 <= reach {
            bail!(
                "Window {}x{} is too small for a stop line {} units from the center",
                self.width,
                self.height,
                self.stop_line_offset
            );
        }

        if self.yellow_duration == 0 {
            bail!("yellow_duration must be at least one tick");
        }
        ensure_positive("car_spawn_frequency", self.car_spawn_frequency)?;

        // Builds and discards the schedule to surface policy errors here
        SpawnSchedule::new(&self.spawn_policy, self.simulation_duration)?;

        Ok(())
    }

    pub fn mid_x(&self) -> f32 {
        self.width / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        self.height / 2.0
    }

    /// Number of ticks between spawn attempts
    pub fn spawn_every_ticks(&self) -> u64 {
        let ticks = (self.car_spawn_frequency * self.ticks_per_second as f32).round() as u64;
        ticks.max(1)
    }
}

fn ensure_positive(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{} must be a positive number, got {}", name, value);
    }
    Ok(())
}

fn ensure_non_negative(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{} must be zero or more, got {}", name, value);
    }
    Ok(())
}
