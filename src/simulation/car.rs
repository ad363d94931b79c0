//! Car state for the intersection simulation
//!
//! A car only knows where it is, where it is heading and whether it is
//! waiting. The rules that decide when it stops or turns live in
//! `intersection`.

use super::types::{CarId, Direction, Position};

/// A car in the intersection simulation
#[derive(Debug, Clone, PartialEq)]
pub struct SimCar {
    pub id: CarId,
    /// Top-left corner of the bounding box
    pub position: Position,
    pub direction: Direction,
    /// Units moved per tick
    pub speed: f32,
    pub width: f32,
    pub length: f32,
    pub stopped: bool,
    /// Ticks spent stopped since the car last moved
    pub waiting_time: u32,
    /// Whether the car will turn right at the center (used at most once)
    pub turn_intent: bool,
}

impl SimCar {
    pub fn new(
        id: CarId,
        position: Position,
        direction: Direction,
        speed: f32,
        width: f32,
        length: f32,
        turn_intent: bool,
    ) -> Self {
        Self {
            id,
            position,
            direction,
            speed,
            width,
            length,
            stopped: false,
            waiting_time: 0,
            turn_intent,
        }
    }

    /// Coordinate of the front bumper along the moving axis
    pub fn leading_edge(&self) -> f32 {
        match self.direction {
            Direction::Up => self.position.y,
            Direction::Down => self.position.y + self.length,
            Direction::Left => self.position.x,
            Direction::Right => self.position.x + self.length,
        }
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Resume moving; the wait counter restarts from zero
    pub fn release(&mut self) {
        self.stopped = false;
        self.waiting_time = 0;
    }

    /// Count one tick of waiting
    pub fn wait(&mut self) {
        debug_assert!(self.stopped, "only stopped cars accumulate waiting time");
        self.waiting_time += 1;
    }

    /// Move one tick along the current heading
    ///
    /// # Panics
    /// If the car is stopped.
    pub fn step(&mut self) {
        assert!(!self.stopped, "car {:?} moved while stopped", self.id);
        match self.direction {
            Direction::Up => self.position.y -= self.speed,
            Direction::Down => self.position.y += self.speed,
            Direction::Left => self.position.x -= self.speed,
            Direction::Right => self.position.x += self.speed,
        }
    }
}
