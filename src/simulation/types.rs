//! Core types for the intersection simulation
//!
//! Closed enumerations for headings, axes, light colors and controller
//! actions, plus the small geometry helpers shared by the other modules.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;

/// A unique identifier for a spawned vehicle (assigned in spawn order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(pub usize);

/// Heading of a vehicle on screen (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// The axis this heading travels on
    pub fn axis(self) -> Axis {
        match self {
            Direction::Up | Direction::Down => Axis::NS,
            Direction::Left | Direction::Right => Axis::EW,
        }
    }

    /// Next heading clockwise (a right turn)
    pub fn clockwise(self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// Index into per-direction tables
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// One of the two perpendicular traffic flows
///
/// Also the MDP state: which axis currently holds right-of-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    NS,
    EW,
}

impl Axis {
    /// Iteration order used by the solvers
    pub const ALL: [Axis; 2] = [Axis::EW, Axis::NS];

    pub fn other(self) -> Axis {
        match self {
            Axis::NS => Axis::EW,
            Axis::EW => Axis::NS,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::EW => 0,
            Axis::NS => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::NS => f.write_str("NS"),
            Axis::EW => f.write_str("EW"),
        }
    }
}

/// Color shown by one axis of the signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightColor {
    Green,
    Yellow,
    Red,
}

/// Decision returned by the signal controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Maintain,
    Change,
}

impl Action {
    /// Order matters: ties between action values go to the first entry
    pub const ALL: [Action; 2] = [Action::Maintain, Action::Change];

    pub fn index(self) -> usize {
        match self {
            Action::Maintain => 0,
            Action::Change => 1,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Maintain => f.write_str("maintain"),
            Action::Change => f.write_str("change"),
        }
    }
}

/// How the signal is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Switch after a fixed green time regardless of traffic
    FixedTimer,
    /// Query the MDP and solve it with policy iteration
    PolicyIteration,
    /// Query the MDP and solve it with value iteration
    ValueIteration,
}

impl ControlMode {
    pub fn is_adaptive(self) -> bool {
        !matches!(self, ControlMode::FixedTimer)
    }
}

impl FromStr for ControlMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ft" | "fixed-timer" | "fixed_timer" => Ok(ControlMode::FixedTimer),
            "pi" | "policy-iteration" | "policy_iteration" => Ok(ControlMode::PolicyIteration),
            "vi" | "value-iteration" | "value_iteration" => Ok(ControlMode::ValueIteration),
            other => bail!(
                "Unknown control mode '{}' (expected ft, pi or vi)",
                other
            ),
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlMode::FixedTimer => "fixed time",
            ControlMode::PolicyIteration => "policy iteration",
            ControlMode::ValueIteration => "value iteration",
        };
        f.write_str(name)
    }
}

/// A 2D position in window coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Speed of a car in units per tick
pub const CAR_SPEED: f32 = 2.0;

/// Width of a car in world units
pub const CAR_WIDTH: f32 = 20.0;

/// Length of a car in world units
pub const CAR_LENGTH: f32 = 40.0;

/// Reference tick rate
pub const TICKS_PER_SECOND: u32 = 30;
