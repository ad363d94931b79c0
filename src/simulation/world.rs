//! Main simulation world that ties everything together
//!
//! Owns the cars, the signal, the spawn schedule, the MDP and the random
//! source, and advances all of them one tick at a time.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;

use super::car::SimCar;
use super::car_manager::{spawn_vehicle, update_cars};
use super::config::SimConfig;
use super::intersection::SimIntersection;
use super::mdp::TrafficMdp;
use super::signal::SignalState;
use super::spawner::{SpawnRule, SpawnSchedule};
use super::stats::SimStats;
use super::types::{Action, Axis, CarId, ControlMode, Direction};

/// The main simulation world
pub struct SimWorld {
    pub config: SimConfig,

    /// Intersection geometry and rules
    pub intersection: SimIntersection,

    pub signal: SignalState,

    /// Cars on screen, in spawn order
    pub cars: Vec<SimCar>,

    pub stats: SimStats,

    schedule: SpawnSchedule,

    /// Decision model for the adaptive modes
    mdp: TrafficMdp,

    /// Single source of randomness so seeded runs are reproducible
    rng: StdRng,

    next_id: usize,

    /// Ticks elapsed since the start of the run
    tick: u64,

    /// Elapsed second of the last controller query
    last_query_second: Option<u64>,
}

impl SimWorld {
    fn new_internal(config: SimConfig, initial_green: Option<Axis>) -> Result<Self> {
        config.validate()?;

        let schedule = SpawnSchedule::new(&config.spawn_policy, config.simulation_duration)?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let signal = match initial_green {
            Some(axis) => SignalState::new(axis, config.yellow_duration),
            None => SignalState::random(&mut rng, config.yellow_duration),
        };
        let intersection = SimIntersection::from_config(&config);
        let mdp = TrafficMdp::new(intersection.center, config.ticks_per_second);
        let stats = SimStats::new(config.ticks_per_second);

        debug!(
            "Created world {}x{} in {} mode, {} starts green",
            config.width,
            config.height,
            config.mode,
            signal.right_of_way()
        );

        Ok(Self {
            config,
            intersection,
            signal,
            cars: Vec::new(),
            stats,
            schedule,
            mdp,
            rng,
            next_id: 0,
            tick: 0,
            last_query_second: None,
        })
    }

    /// Create a world whose initial green axis is chosen at random
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::new_internal(config, None)
    }

    /// Create a world with `green` holding right-of-way at the start
    pub fn new_with_signal(config: SimConfig, green: Axis) -> Result<Self> {
        Self::new_internal(config, Some(green))
    }

    fn next_car_id(&mut self) -> CarId {
        let id = CarId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 / self.config.ticks_per_second as f64
    }

    fn elapsed_whole_secs(&self) -> u64 {
        self.tick / self.config.ticks_per_second as u64
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// Spawn rule in force right now
    pub fn current_spawn_rule(&self) -> SpawnRule {
        self.schedule.current_interval(self.elapsed_secs())
    }

    /// Spawn one car from a random direction in `filter` (all four if
    /// `None`)
    ///
    /// Returns `None` when the filter is empty or the chosen lane has no
    /// room at its entry.
    pub fn spawn(&mut self, filter: Option<&[Direction]>) -> Option<CarId> {
        let allowed = filter.unwrap_or(&Direction::ALL);
        let direction = *allowed.choose(&mut self.rng)?;
        let turn_intent = self.rng.random_bool(0.5);
        if !self.intersection.is_entry_clear(direction, &self.cars) {
            trace!("Skipping spawn heading {}: entry occupied", direction);
            self.stats.spawns_blocked += 1;
            return None;
        }
        Some(self.spawn_with(direction, turn_intent))
    }

    /// Spawn a car with a fixed heading and turn intent
    pub fn spawn_with(&mut self, direction: Direction, turn_intent: bool) -> CarId {
        let id = self.next_car_id();
        let car = spawn_vehicle(id, direction, turn_intent, &self.intersection, &self.config);
        self.cars.push(car);
        self.stats.total_cars_spawned += 1;
        id
    }

    /// Ask the controller for a decision about the current cars
    pub fn solve(&mut self, current_state: Axis) -> Result<Action> {
        self.mdp
            .solve(self.config.mode, &self.cars, current_state, &mut self.rng)
    }

    fn spawn_on_cadence(&mut self) {
        if self.tick % self.config.spawn_every_ticks() != 0 {
            return;
        }
        let rule = self.current_spawn_rule();
        if let Some(id) = self.spawn(Some(rule.allowed_directions())) {
            debug!("Spawned car {:?} under rule {}", id, rule);
        }
    }

    fn run_controller(&mut self) {
        match self.config.mode {
            ControlMode::FixedTimer => {
                if self.signal.green_axis().is_some()
                    && self.signal.time_green >= self.config.green_duration
                {
                    self.signal.switch_to_yellow();
                    self.stats.signal_changes_requested += 1;
                }
            }
            ControlMode::PolicyIteration | ControlMode::ValueIteration => {
                let Some(state) = self.signal.green_axis() else {
                    return;
                };
                if self.signal.time_green < self.config.min_green_ticks {
                    return;
                }
                let second = self.elapsed_whole_secs();
                if self.last_query_second == Some(second) {
                    return;
                }
                self.last_query_second = Some(second);
                self.stats.controller_queries += 1;

                match self.solve(state) {
                    Ok(Action::Change) => {
                        debug!(
                            "Controller: change {} after {} ticks green",
                            state, self.signal.time_green
                        );
                        self.signal.switch_to_yellow();
                        self.stats.signal_changes_requested += 1;
                    }
                    Ok(Action::Maintain) => {}
                    Err(e) => warn!("Controller failed, keeping {} green: {:#}", state, e),
                }
            }
        }
    }

    /// Main simulation tick
    pub fn tick(&mut self) {
        self.signal.tick();
        self.tick += 1;

        self.spawn_on_cadence();

        self.run_controller();

        let (survivors, despawned) = update_cars(&self.cars, &self.signal, &self.intersection);
        self.cars = survivors;
        self.stats.total_cars_exited += despawned.len();

        self.stats.record_tick(&self.cars);
        if self.tick % self.config.ticks_per_second as u64 == 0 {
            self.stats.record_second();
            debug!(
                "Elapsed Time: {} sec | Spawning rule: {} | Cumulative Waitings: {:.0} sec | Running mode: {}",
                self.elapsed_whole_secs(),
                self.current_spawn_rule(),
                self.stats.cumulative_waiting_secs(),
                self.config.mode
            );
        }
    }

    /// Run up to `ticks` ticks, stopping early when `stop` is set
    ///
    /// Returns the number of ticks actually run.
    pub fn run(&mut self, ticks: u64, stop: &AtomicBool) -> u64 {
        let mut ran = 0;
        while ran < ticks {
            if stop.load(Ordering::Relaxed) {
                debug!("Stop requested after {} ticks", ran);
                break;
            }
            self.tick();
            ran += 1;
        }
        ran
    }

    /// One-line state summary for periodic output
    pub fn summary(&self) -> String {
        format!(
            "t={:.1}s | NS={:?} EW={:?} | cars={} stopped={} | waiting={:.1}s",
            self.elapsed_secs(),
            self.signal.color_ns,
            self.signal.color_ew,
            self.cars.len(),
            self.stats.stopped_vehicle_count,
            self.stats.cumulative_waiting_secs()
        )
    }
}
