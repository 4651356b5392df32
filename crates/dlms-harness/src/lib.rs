//! Deterministic simulation harness for DLMS/COSEM testing.
//!
//! [`virtual_clock`] supplies a [`dlms_hdlc::Clock`] impl that advances only
//! when told to; [`channel`] is a seeded fault-injecting byte channel for
//! chaos tests against the HDLC and WRAPPER layers; [`strategies`] holds
//! `proptest` generators shared across the workspace's integration tests.

pub mod channel;
pub mod strategies;
pub mod virtual_clock;

pub use channel::{FaultProfile, LossyChannel};
pub use virtual_clock::VirtualClock;
