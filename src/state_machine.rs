//! Turn controller state machine
//!
//! Elm-style: a pure transition function maps (state, event) to a new state
//! plus a list of effects. All I/O lives in the runtime that executes them.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{SessionContext, SessionState};
pub use transition::transition;
