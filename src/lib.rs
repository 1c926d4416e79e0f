//! Dojang Hub - Payment Event Pipeline
//!
//! This crate implements the payment subsystem of the Dojang Hub martial
//! arts school platform: checkout preference creation against an external
//! payment gateway, webhook admission, queued idempotent status processing,
//! and live status push to waiting clients.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
