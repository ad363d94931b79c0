//! Simulation statistics
//!
//! Waiting time is accumulated every tick and sampled once per simulated
//! second so fixed-timer and adaptive runs can be compared afterwards.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use super::car::SimCar;
use super::types::{ControlMode, Direction};

/// Statistics collected over one run
#[derive(Debug, Clone, Default)]
pub struct SimStats {
    /// Total waiting time of all cars so far, in seconds, one entry per elapsed second
    pub cumulative_waiting_time_by_second: Vec<f64>,
    /// Stopped cars at each elapsed second
    pub stopped_vehicles_by_second: Vec<usize>,
    /// Stopped cars after the latest tick
    pub stopped_vehicle_count: usize,
    /// Stopped cars per heading after the latest tick, indexed by `Direction::index`
    pub queue_lengths_by_direction: [usize; 4],
    pub total_cars_spawned: usize,
    pub total_cars_exited: usize,
    /// Spawn attempts dropped because the entry lane was occupied
    pub spawns_blocked: usize,
    pub controller_queries: usize,
    pub signal_changes_requested: usize,
    cumulative_waiting_ticks: u64,
    ticks_per_second: u32,
}

impl SimStats {
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            ticks_per_second: ticks_per_second.max(1),
            ..Self::default()
        }
    }

    /// Fold the cars' state after a tick into the running totals
    pub fn record_tick(&mut self, cars: &[SimCar]) {
        let mut queues = [0; 4];
        for car in cars.iter().filter(|car| car.stopped) {
            queues[car.direction.index()] += 1;
        }
        self.queue_lengths_by_direction = queues;
        self.stopped_vehicle_count = queues.iter().sum();
        self.cumulative_waiting_ticks += self.stopped_vehicle_count as u64;
    }

    /// Take the per-second sample
    pub fn record_second(&mut self) {
        self.cumulative_waiting_time_by_second
            .push(self.cumulative_waiting_secs());
        self.stopped_vehicles_by_second
            .push(self.stopped_vehicle_count);
    }

    pub fn cumulative_waiting_secs(&self) -> f64 {
        self.cumulative_waiting_ticks as f64 / self.ticks_per_second as f64
    }

    pub fn queue_length(&self, direction: Direction) -> usize {
        self.queue_lengths_by_direction[direction.index()]
    }

    /// Write one `second,cumulative_waiting_secs,stopped_vehicles` row per
    /// sampled second
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create stats file {}", path.display()))?;

        writer.write_record(["second", "cumulative_waiting_secs", "stopped_vehicles"])?;
        for (second, (waiting, stopped)) in self
            .cumulative_waiting_time_by_second
            .iter()
            .zip(&self.stopped_vehicles_by_second)
            .enumerate()
        {
            writer.write_record(&[
                (second + 1).to_string(),
                format!("{:.2}", waiting),
                stopped.to_string(),
            ])?;
        }
        writer.flush().context("Failed to flush stats file")?;
        Ok(())
    }

    /// Log the end-of-run summary
    pub fn log_summary(&self, mode: ControlMode, elapsed_secs: f64) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Mode: {}", mode);
        info!("Elapsed time: {:.1}s", elapsed_secs);
        info!("Total cars spawned: {}", self.total_cars_spawned);
        info!("Total cars exited: {}", self.total_cars_exited);
        info!("Spawns blocked: {}", self.spawns_blocked);
        info!("Controller queries: {}", self.controller_queries);
        info!("Signal changes requested: {}", self.signal_changes_requested);
        info!("Stopped cars: {}", self.stopped_vehicle_count);
        for direction in Direction::ALL {
            info!("Queue {}: {}", direction, self.queue_length(direction));
        }
        info!(
            "Cumulative waiting time: {:.1}s",
            self.cumulative_waiting_secs()
        );
    }
}
