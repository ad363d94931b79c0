//! Signal Simulation Library
//!
//! Simulates traffic through one four-way signalized intersection and
//! compares a fixed-timer signal against an MDP-driven adaptive one.

pub mod simulation;
