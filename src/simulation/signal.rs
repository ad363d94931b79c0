//! Two-axis traffic light for the intersection
//!
//! Exactly one axis is green or yellow at any time; the other is red.
//! The light only changes through `switch_to_yellow` and `tick`.

use log::debug;
use rand::Rng;

use super::types::{Axis, LightColor};

/// State of the intersection signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalState {
    pub color_ns: LightColor,
    pub color_ew: LightColor,
    /// Ticks the current axis has been green
    pub time_green: u32,
    /// Ticks the current axis has been yellow
    pub time_yellow: u32,
    yellow_duration: u32,
}

impl SignalState {
    /// Create a signal with `green` holding right-of-way
    pub fn new(green: Axis, yellow_duration: u32) -> Self {
        let (color_ns, color_ew) = match green {
            Axis::NS => (LightColor::Green, LightColor::Red),
            Axis::EW => (LightColor::Red, LightColor::Green),
        };
        Self {
            color_ns,
            color_ew,
            time_green: 0,
            time_yellow: 0,
            yellow_duration,
        }
    }

    /// Create a signal with the green axis picked uniformly at random
    pub fn random<R: Rng + ?Sized>(rng: &mut R, yellow_duration: u32) -> Self {
        let green = if rng.random_bool(0.5) { Axis::NS } else { Axis::EW };
        Self::new(green, yellow_duration)
    }

    pub fn color(&self, axis: Axis) -> LightColor {
        match axis {
            Axis::NS => self.color_ns,
            Axis::EW => self.color_ew,
        }
    }

    pub fn is_green(&self, axis: Axis) -> bool {
        self.color(axis) == LightColor::Green
    }

    /// The axis currently showing green, if any
    pub fn green_axis(&self) -> Option<Axis> {
        Axis::ALL.into_iter().find(|axis| self.is_green(*axis))
    }

    /// The axis holding right-of-way (green or yellow)
    pub fn right_of_way(&self) -> Axis {
        if self.color_ns == LightColor::Red {
            Axis::EW
        } else {
            Axis::NS
        }
    }

    /// Turn the green axis yellow; no-op while an axis is already yellow
    pub fn switch_to_yellow(&mut self) {
        if self.color_ns == LightColor::Green {
            self.color_ns = LightColor::Yellow;
            debug!("Signal NS -> yellow after {} ticks green", self.time_green);
        } else if self.color_ew == LightColor::Green {
            self.color_ew = LightColor::Yellow;
            debug!("Signal EW -> yellow after {} ticks green", self.time_green);
        }
    }

    /// Advance the timers by one tick
    pub fn tick(&mut self) {
        let colors = [self.color_ns, self.color_ew];
        if colors.contains(&LightColor::Green) {
            self.time_green += 1;
        }
        if colors.contains(&LightColor::Yellow) {
            self.time_yellow += 1;
        }

        if self.time_yellow >= self.yellow_duration {
            if self.color_ns == LightColor::Yellow {
                self.color_ns = LightColor::Red;
                self.color_ew = LightColor::Green;
                debug!("Signal EW -> green");
            } else if self.color_ew == LightColor::Yellow {
                self.color_ew = LightColor::Red;
                self.color_ns = LightColor::Green;
                debug!("Signal NS -> green");
            }
            self.time_green = 0;
            self.time_yellow = 0;
        }
    }
}
