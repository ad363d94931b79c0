//! Right-of-way rules for the four-way intersection
//!
//! The intersection owns the geometry (lanes, stop lines, following band)
//! and answers questions about a car: must it stop, may it move, does it
//! turn here, has it left the window.

use super::car::SimCar;
use super::config::SimConfig;
use super::signal::SignalState;
use super::types::{Direction, LightColor, Position};

/// Geometry of the single signalized intersection
#[derive(Debug, Clone)]
pub struct SimIntersection {
    pub width: f32,
    pub height: f32,
    /// Center of the intersection
    pub center: Position,
    /// Offset of the right-hand lane from the centerline
    pub lane_offset: f32,
    /// Offset of the far lane's near edge from the centerline
    pub lane_gap: f32,
    pub car_width: f32,
    pub car_length: f32,
    pub car_speed: f32,
    pub stop_line_offset: f32,
    pub stop_band: f32,
    pub follow_gap_min: f32,
    pub follow_gap_max: f32,
}

impl SimIntersection {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            center: Position::new(config.mid_x(), config.mid_y()),
            lane_offset: config.lane_offset,
            lane_gap: config.lane_gap,
            car_width: config.car_width,
            car_length: config.car_length,
            car_speed: config.car_speed,
            stop_line_offset: config.stop_line_offset,
            stop_band: config.stop_band,
            follow_gap_min: config.follow_gap_min,
            follow_gap_max: config.follow_gap_max,
        }
    }

    /// Cross-axis coordinate of the lane used by `direction`
    ///
    /// x for Up/Down, y for Left/Right.
    pub fn lane(&self, direction: Direction) -> f32 {
        let near = self.lane_offset;
        let far = self.car_width + self.lane_gap;
        match direction {
            Direction::Up => self.center.x + near,
            Direction::Down => self.center.x - far,
            Direction::Left => self.center.y - far,
            Direction::Right => self.center.y + near,
        }
    }

    /// Where a car heading `direction` enters the window
    pub fn spawn_position(&self, direction: Direction) -> Position {
        match direction {
            Direction::Up => Position::new(self.lane(direction), self.height),
            Direction::Down => Position::new(self.lane(direction), 0.0),
            Direction::Left => Position::new(self.width, self.lane(direction)),
            Direction::Right => Position::new(0.0, self.lane(direction)),
        }
    }

    /// Whether a new car heading `direction` fits at its spawn point
    ///
    /// The car ahead must be at least a car length plus the following gap
    /// plus one step away, so the newcomer can still stop in the following
    /// band if that car halts.
    pub fn is_entry_clear(&self, direction: Direction, cars: &[SimCar]) -> bool {
        let entry = self.spawn_position(direction);
        let clearance = self.car_length + self.follow_gap_min + self.car_speed;
        !cars
            .iter()
            .filter(|car| car.direction == direction)
            .any(|car| {
                let distance = match direction {
                    Direction::Up | Direction::Down => (car.position.y - entry.y).abs(),
                    Direction::Left | Direction::Right => (car.position.x - entry.x).abs(),
                };
                distance < clearance
            })
    }

    /// Whether the car's front bumper is inside the stop band of its approach
    pub fn is_at_stop_line(&self, car: &SimCar) -> bool {
        let edge = car.leading_edge();
        let offset = self.stop_line_offset;
        let band = self.stop_band;
        match car.direction {
            Direction::Up => (self.center.y + offset..=self.center.y + offset + band).contains(&edge),
            Direction::Down => {
                (self.center.y - offset - band..=self.center.y - offset).contains(&edge)
            }
            Direction::Left => {
                (self.center.x + offset..=self.center.x + offset + band).contains(&edge)
            }
            Direction::Right => {
                (self.center.x - offset - band..=self.center.x - offset).contains(&edge)
            }
        }
    }

    /// A car must stop when it reaches the stop line on a red or yellow axis
    ///
    /// Cars already past the band (inside the intersection) are never
    /// stopped again.
    pub fn must_stop(&self, car: &SimCar, signal: &SignalState) -> bool {
        self.is_at_stop_line(car)
            && matches!(
                signal.color(car.direction.axis()),
                LightColor::Red | LightColor::Yellow
            )
    }

    /// False when a stopped car with the same heading sits directly ahead,
    /// with this car inside the following band behind it
    pub fn can_move(&self, car: &SimCar, others: &[SimCar]) -> bool {
        let (min, max) = (self.follow_gap_min, self.follow_gap_max);
        let blocked_by = |other: &SimCar| {
            if !other.stopped || other.direction != car.direction {
                return false;
            }
            let (x, y) = (car.position.x, car.position.y);
            let (ox, oy) = (other.position.x, other.position.y);
            match car.direction {
                Direction::Up => (oy + other.length + min..=oy + other.length + max).contains(&y),
                Direction::Down => (oy - car.length - max..=oy - car.length - min).contains(&y),
                Direction::Left => (ox + other.length + min..=ox + other.length + max).contains(&x),
                Direction::Right => (ox - car.length - max..=ox - car.length - min).contains(&x),
            }
        };
        !others.iter().any(blocked_by)
    }

    /// Whether the front bumper is within one step of the centerline
    pub fn is_at_center(&self, car: &SimCar) -> bool {
        let edge = car.leading_edge();
        let mid = match car.direction {
            Direction::Up | Direction::Down => self.center.y,
            Direction::Left | Direction::Right => self.center.x,
        };
        (mid - car.speed..=mid + car.speed).contains(&edge)
    }

    /// Turn right at the center if the car intends to; returns whether it turned
    pub fn turn_or_go_straight(&self, car: &mut SimCar) -> bool {
        if !car.turn_intent || !self.is_at_center(car) {
            return false;
        }

        let half = car.length / 2.0;
        let next = car.direction.clockwise();
        match car.direction {
            Direction::Up => {
                car.position.x += half;
                car.position.y = self.lane(next);
            }
            Direction::Down => {
                car.position.x -= half;
                car.position.y = self.lane(next);
            }
            Direction::Left => {
                car.position.x = self.lane(next);
                car.position.y -= half;
            }
            Direction::Right => {
                car.position.x = self.lane(next);
                car.position.y += half;
            }
        }
        car.direction = next;
        car.turn_intent = false;
        true
    }

    /// Whether the car has left the window along its moving axis
    pub fn is_out_of_window(&self, car: &SimCar) -> bool {
        match car.direction {
            Direction::Up | Direction::Down => !(0.0..=self.height).contains(&car.position.y),
            Direction::Left | Direction::Right => !(0.0..=self.width).contains(&car.position.x),
        }
    }
}
