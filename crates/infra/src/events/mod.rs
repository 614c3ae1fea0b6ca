//! Event delivery over HTTP

pub mod client;

pub use client::{EventReceipt, HttpEventClient};
