//! Markov decision process for the adaptive signal controller
//!
//! The state is the axis holding right-of-way, the actions are keeping it
//! or handing it over. Rewards and transitions are recomputed from the live
//! cars on every query, so the model is re-solved each time the controller
//! asks for a decision.

use anyhow::{Context, Result};
use log::{trace, warn};
use ordered_float::OrderedFloat;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use super::car::SimCar;
use super::types::{Action, Axis, ControlMode, Direction, Position};

/// Discount applied to the value of the next state
pub const DISCOUNT_FACTOR: f64 = 0.95;

/// Sweeps stop once no state value moves by more than this
pub const CONVERGENCE_THRESHOLD: f64 = 0.01;

/// Upper bound on sweeps for any single solver loop
pub const MAX_SWEEPS: usize = 10_000;

/// Per-state table indexed by `Axis::index`
type StateTable<T> = [T; 2];

/// Action distribution indexed by `Action::index`
type ActionDistribution = [f64; 2];

/// The traffic signal MDP for one intersection
#[derive(Debug, Clone)]
pub struct TrafficMdp {
    pub discount_factor: f64,
    pub theta: f64,
    values: StateTable<f64>,
    policy: StateTable<ActionDistribution>,
    /// Intersection center, splits approaching from departing cars
    center: Position,
    ticks_per_second: u32,
}

impl TrafficMdp {
    pub fn new(center: Position, ticks_per_second: u32) -> Self {
        Self {
            discount_factor: DISCOUNT_FACTOR,
            theta: CONVERGENCE_THRESHOLD,
            values: [0.0; 2],
            policy: [[0.5, 0.5]; 2],
            center,
            ticks_per_second: ticks_per_second.max(1),
        }
    }

    pub fn value(&self, state: Axis) -> f64 {
        self.values[state.index()]
    }

    /// Probability of `action` in `state` under the current policy
    pub fn policy(&self, state: Axis, action: Action) -> f64 {
        self.policy[state.index()][action.index()]
    }

    /// Whether the car is still heading toward the center on `axis`
    fn is_incoming(&self, car: &SimCar, axis: Axis) -> bool {
        let Position { x, y } = car.position;
        match (axis, car.direction) {
            (Axis::EW, Direction::Left) => x > self.center.x,
            (Axis::EW, Direction::Right) => x < self.center.x,
            (Axis::NS, Direction::Up) => y > self.center.y,
            (Axis::NS, Direction::Down) => y < self.center.y,
            _ => false,
        }
    }

    /// R(s, a)
    ///
    /// Changing pays off when cars on the red axis have waited long compared
    /// to the traffic still arriving on the green axis; maintaining pays off
    /// in the opposite case. Never divides by zero.
    pub fn reward(&self, cars: &[SimCar], action: Action, state: Axis) -> f64 {
        let red_axis = state.other();
        let waits: Vec<u32> = cars
            .iter()
            .filter(|car| car.stopped && car.direction.axis() == red_axis)
            .map(|car| car.waiting_time / self.ticks_per_second)
            .collect();
        let incoming = cars
            .iter()
            .filter(|car| !car.stopped && self.is_incoming(car, state))
            .count() as f64;

        let avg_wait = if waits.is_empty() {
            0.0
        } else {
            waits.iter().map(|w| *w as f64).sum::<f64>() / waits.len() as f64
        };

        match action {
            Action::Change if incoming > 0.0 => avg_wait / incoming,
            Action::Change => avg_wait,
            Action::Maintain if avg_wait > 0.0 => incoming / avg_wait,
            Action::Maintain => incoming,
        }
    }

    /// P(s' | s, a)
    ///
    /// Maintain can only keep the state and change can only flip it. The
    /// possible outcome has probability 1 when its action strictly beats the
    /// other one on reward, 0 otherwise.
    pub fn transition_probability(
        &self,
        cars: &[SimCar],
        action: Action,
        state: Axis,
        next_state: Axis,
    ) -> f64 {
        match action {
            Action::Maintain if state != next_state => return 0.0,
            Action::Change if state == next_state => return 0.0,
            _ => {}
        }

        let change = self.reward(cars, Action::Change, state);
        let maintain = self.reward(cars, Action::Maintain, state);
        let wins = match action {
            Action::Maintain => maintain > change,
            Action::Change => change > maintain,
        };
        if wins {
            1.0
        } else {
            0.0
        }
    }

    /// Σ_s' P(s'|s,a) (R(s,a) + γ V(s'))
    fn action_value(&self, cars: &[SimCar], action: Action, state: Axis) -> f64 {
        let reward = self.reward(cars, action, state);
        Axis::ALL
            .iter()
            .map(|next| {
                self.transition_probability(cars, action, state, *next)
                    * (reward + self.discount_factor * self.values[next.index()])
            })
            .sum()
    }

    /// Action values for `state`, in `Action::ALL` order
    pub fn action_values(&self, cars: &[SimCar], state: Axis) -> [f64; 2] {
        Action::ALL.map(|action| self.action_value(cars, action, state))
    }

    /// Iterative policy evaluation with in-place updates
    pub fn policy_evaluation(&mut self, cars: &[SimCar]) {
        for _ in 0..MAX_SWEEPS {
            let mut delta: f64 = 0.0;
            for state in Axis::ALL {
                let old = self.values[state.index()];
                let new_value: f64 = Action::ALL
                    .iter()
                    .map(|action| {
                        self.policy[state.index()][action.index()]
                            * self.action_value(cars, *action, state)
                    })
                    .sum();
                self.values[state.index()] = new_value;
                delta = delta.max((old - new_value).abs());
            }
            if delta < self.theta {
                return;
            }
        }
        warn!("Policy evaluation hit {} sweeps without converging", MAX_SWEEPS);
    }

    /// Make the policy greedy with respect to the current values
    ///
    /// Returns true when no state's preferred action changed.
    pub fn policy_improvement(&mut self, cars: &[SimCar]) -> bool {
        let mut stable = true;
        for state in Axis::ALL {
            let old_action = first_max(&self.policy[state.index()]);
            let best_action = first_max(&self.action_values(cars, state));

            let mut distribution = [0.0; 2];
            distribution[best_action.index()] = 1.0;
            self.policy[state.index()] = distribution;

            if old_action != best_action {
                stable = false;
            }
        }
        stable
    }

    /// Alternate evaluation and improvement until the policy is stable
    pub fn policy_iteration(&mut self, cars: &[SimCar]) {
        for round in 0..MAX_SWEEPS {
            self.policy_evaluation(cars);
            if self.policy_improvement(cars) {
                trace!("Policy iteration stable after {} rounds", round + 1);
                return;
            }
        }
        warn!("Policy iteration hit {} rounds without stabilizing", MAX_SWEEPS);
    }

    /// Sample an action for `state` from the current policy
    pub fn get_action<R: Rng + ?Sized>(&self, state: Axis, rng: &mut R) -> Result<Action> {
        let weights = self.policy[state.index()];
        let dist = WeightedIndex::new(weights)
            .with_context(|| format!("Invalid policy for state {}: {:?}", state, weights))?;
        Ok(Action::ALL[dist.sample(rng)])
    }

    /// Solve for optimal values, then pick the best action for `current_state`
    pub fn value_iteration(&mut self, cars: &[SimCar], current_state: Axis) -> Action {
        let mut converged = false;
        for _ in 0..MAX_SWEEPS {
            let mut new_values = [0.0; 2];
            let mut delta: f64 = 0.0;
            for state in Axis::ALL {
                let best = self
                    .action_values(cars, state)
                    .into_iter()
                    .map(OrderedFloat)
                    .max()
                    .map(OrderedFloat::into_inner)
                    .unwrap_or(0.0);
                new_values[state.index()] = best;
                delta = delta.max((self.values[state.index()] - best).abs());
            }
            self.values = new_values;
            if delta < self.theta {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!("Value iteration hit {} sweeps without converging", MAX_SWEEPS);
        }

        first_max(&self.action_values(cars, current_state))
    }

    /// Controller entry point for the adaptive modes
    ///
    /// Fixed-timer mode has no decision to make here and always maintains;
    /// the world applies the timer itself.
    pub fn solve<R: Rng + ?Sized>(
        &mut self,
        mode: ControlMode,
        cars: &[SimCar],
        current_state: Axis,
        rng: &mut R,
    ) -> Result<Action> {
        match mode {
            ControlMode::FixedTimer => Ok(Action::Maintain),
            ControlMode::PolicyIteration => {
                self.policy_iteration(cars);
                self.get_action(current_state, rng)
            }
            ControlMode::ValueIteration => Ok(self.value_iteration(cars, current_state)),
        }
    }
}

/// First action with the largest entry, in `Action::ALL` order
fn first_max(values: &[f64; 2]) -> Action {
    let mut best = Action::ALL[0];
    for action in Action::ALL.into_iter().skip(1) {
        if values[action.index()] > values[best.index()] {
            best = action;
        }
    }
    best
}
