//! IPC handlers, one module per action group.

pub mod cache;
pub mod health;
pub mod reload;
pub mod request;
