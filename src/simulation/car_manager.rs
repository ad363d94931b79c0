//! Car spawning and per-tick updates
//!
//! Separates the car bookkeeping from the world loop. Every update runs
//! against a snapshot of the cars as they were at the start of the tick, so
//! removing cars never disturbs the iteration.

use log::trace;

use super::car::SimCar;
use super::config::SimConfig;
use super::intersection::SimIntersection;
use super::signal::SignalState;
use super::types::CarId;
use super::types::Direction;

/// Result of a car update indicating what should happen to the car
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarUpdateResult {
    /// Car is still on screen
    Continue,
    /// Car has left the window
    Despawn,
}

/// Build a car entering the window heading `direction`
pub fn spawn_vehicle(
    car_id: CarId,
    direction: Direction,
    turn_intent: bool,
    intersection: &SimIntersection,
    config: &SimConfig,
) -> SimCar {
    let position = intersection.spawn_position(direction);
    trace!(
        "Spawning car {:?} heading {} at ({:.0}, {:.0}), turning={}",
        car_id,
        direction,
        position.x,
        position.y,
        turn_intent
    );
    SimCar::new(
        car_id,
        position,
        direction,
        config.car_speed,
        config.car_width,
        config.car_length,
        turn_intent,
    )
}

/// Update one car for this tick
///
/// `others` is the tick-start snapshot; the car's own stale copy in it is
/// harmless since a car is never inside its own following band.
pub fn update_car(
    car: &mut SimCar,
    others: &[SimCar],
    signal: &SignalState,
    intersection: &SimIntersection,
) -> CarUpdateResult {
    if car.stopped {
        car.wait();
        if signal.is_green(car.direction.axis()) {
            car.release();
            intersection.turn_or_go_straight(car);
            car.step();
        }
    } else if intersection.must_stop(car, signal) || !intersection.can_move(car, others) {
        car.stop();
    } else {
        intersection.turn_or_go_straight(car);
        car.step();
    }

    if intersection.is_out_of_window(car) {
        CarUpdateResult::Despawn
    } else {
        CarUpdateResult::Continue
    }
}

/// Update all cars and return the survivors in their original order
pub fn update_cars(
    cars: &[SimCar],
    signal: &SignalState,
    intersection: &SimIntersection,
) -> (Vec<SimCar>, Vec<CarId>) {
    let mut survivors = Vec::with_capacity(cars.len());
    let mut despawned = Vec::new();

    for car in cars {
        let mut next = car.clone();
        match update_car(&mut next, cars, signal, intersection) {
            CarUpdateResult::Continue => survivors.push(next),
            CarUpdateResult::Despawn => {
                trace!("Car {:?} left the window heading {}", next.id, next.direction);
                despawned.push(next.id);
            }
        }
    }

    (survivors, despawned)
}
