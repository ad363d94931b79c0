//! Standalone intersection simulation
//!
//! This module contains the intersection model (cars, right-of-way rules,
//! signal, spawn schedule) and the adaptive signal controller. It runs
//! headless and is driven one tick at a time by `SimWorld`.

mod car;
mod car_manager;
mod config;
mod intersection;
mod mdp;
mod signal;
mod spawner;
mod stats;
mod types;
mod world;

// Re-export public types for external use
pub use car::SimCar;
pub use car_manager::{spawn_vehicle, update_car, update_cars, CarUpdateResult};
pub use config::{
    SimConfig, GREEN_DURATION, MIN_GREEN_TICKS, STOP_BAND, STOP_LINE_OFFSET, YELLOW_DURATION,
};
pub use intersection::SimIntersection;
pub use mdp::{TrafficMdp, CONVERGENCE_THRESHOLD, DISCOUNT_FACTOR, MAX_SWEEPS};
pub use signal::SignalState;
pub use spawner::{parse_spawn_policy, SpawnRule, SpawnSchedule};
pub use stats::SimStats;
pub use types::{
    Action, Axis, CarId, ControlMode, Direction, LightColor, Position, CAR_LENGTH, CAR_SPEED,
    CAR_WIDTH, TICKS_PER_SECOND,
};
pub use world::SimWorld;
