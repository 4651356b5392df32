//! An in-memory byte channel that drops, reorders, and duplicates frames
//! under a seeded RNG, for chaos-testing the HDLC connection state machine
//! and the WRAPPER framing layer against an unreliable transport.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Per-channel fault probabilities, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy)]
pub struct FaultProfile {
    /// Probability a given frame is dropped entirely.
    pub drop_probability: f64,
    /// Probability a given frame is duplicated.
    pub duplicate_probability: f64,
    /// Probability a frame is held back and delivered after the next one.
    pub reorder_probability: f64,
}

impl FaultProfile {
    /// No faults: every frame arrives once, in order.
    #[must_use]
    pub fn reliable() -> Self {
        Self { drop_probability: 0.0, duplicate_probability: 0.0, reorder_probability: 0.0 }
    }
}

impl Default for FaultProfile {
    fn default() -> Self {
        Self::reliable()
    }
}

/// A one-directional, seeded, fault-injecting channel of byte frames.
pub struct LossyChannel {
    rng: ChaCha8Rng,
    profile: FaultProfile,
    held_back: Option<Vec<u8>>,
}

impl LossyChannel {
    /// Build a channel seeded for reproducibility.
    #[must_use]
    pub fn new(seed: u64, profile: FaultProfile) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed), profile, held_back: None }
    }

    /// Feed one frame through the channel, returning what should be
    /// delivered to the receiver this step, in order. A held-back frame
    /// from a prior [`Self::send`] call may be flushed first.
    pub fn send(&mut self, frame: Vec<u8>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        if let Some(held) = self.held_back.take() {
            out.push(held);
        }

        if self.rng.gen_bool(self.profile.drop_probability) {
            return out;
        }

        if self.rng.gen_bool(self.profile.reorder_probability) && self.held_back.is_none() {
            self.held_back = Some(frame);
            return out;
        }

        out.push(frame.clone());
        if self.rng.gen_bool(self.profile.duplicate_probability) {
            out.push(frame);
        }
        out
    }

    /// Flush a frame held back for reordering, if any is pending.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        self.held_back.take()
    }
}
