//! IPC handler wiring.

mod handlers;
mod register;

pub use register::register_handlers;
