//! Camera navigation: raw pointer events become [`Action`]s, and
//! [`OrbitControls`] turn actions into camera motion once per frame.
//!
//! # Invariants
//! - Controls consume actions, never raw window events.
//! - The camera only moves inside [`Controls::update`].

pub mod action;
pub mod orbit;

pub use action::{Action, PointerButton, PointerState};
pub use orbit::{Controls, OrbitControls};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("invalid orbit limits: {0}")]
    InvalidLimits(String),
}
