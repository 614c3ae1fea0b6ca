//! Bounded asynchronous dispatch

pub mod ports;
pub mod service;

pub use service::AsyncDispatcher;
