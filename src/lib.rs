//! Campnet - keep-alive auto-login agent for Cyberoam-style captive portals
//!
//! The agent polls on a fixed interval: it checks that the device is on a
//! qualifying network, probes for internet access, and logs in through the
//! portal when the probe says the gateway is holding traffic back.

pub mod config;
pub mod daemon;
pub mod eligibility;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod network;
pub mod orchestrator;
pub mod parser;
pub mod portal;
pub mod probe;
pub mod session;

#[cfg(test)]
mod testing;
