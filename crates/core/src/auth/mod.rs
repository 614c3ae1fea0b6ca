//! Authorization and credential ports

pub mod ports;
