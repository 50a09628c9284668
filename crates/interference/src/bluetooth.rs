// Copyright 2025-2026 CEMAXECUTER LLC

//! Bluetooth-like hopping emitter estimate.
//!
//! Short narrowband pulses landing on a new channel each time raise a
//! confidence score that decays with elapsed time. While confident, the
//! duration-weighted mean power of recent qualifying pulses is reported.

use std::collections::VecDeque;

use crate::channel::decayed;

/// Qualifying pulse duration bounds (exclusive), timestamp units.
pub const MIN_PULSE_LENGTH: i32 = 150;
pub const MAX_PULSE_LENGTH: i32 = 3750;
/// Qualifying bandwidth bounds (exclusive), MHz.
pub const MIN_BANDWIDTH_MHZ: f64 = 0.5;
pub const MAX_BANDWIDTH_MHZ: f64 = 1.0;

/// Score added per unit of credited pulse duration.
pub const SCORE_PER_LENGTH: i32 = 100;
pub const MAX_SCORE: i32 = 2_000_000;
/// Score from which the power estimate is exposed.
pub const CONFIDENCE_THRESHOLD: i32 = 1_000_000;

/// Cumulative pulse duration kept in the power window.
pub const MAX_WINDOW_LENGTH: i32 = 20_000;

#[derive(Debug, Clone, Copy)]
struct PowerEntry {
    power_total: f64,
    length: i32,
}

/// Duration-weighted power average over recent credited pulses.
#[derive(Debug, Clone, Default)]
pub struct PowerWindow {
    entries: VecDeque<PowerEntry>,
    power_sum: f64,
    length_sum: i32,
}

impl PowerWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pulse, then drop the oldest while the window holds at least
    /// `MAX_WINDOW_LENGTH` of pulse time.
    pub fn push(&mut self, power: f64, length: i32) {
        let power_total = power * length as f64;
        self.entries.push_back(PowerEntry { power_total, length });
        self.power_sum += power_total;
        self.length_sum += length;

        while self.length_sum >= MAX_WINDOW_LENGTH {
            let Some(old) = self.entries.pop_front() else {
                break;
            };
            self.power_sum -= old.power_total;
            self.length_sum -= old.length;
        }
    }

    /// NaN while empty.
    pub fn mean_power(&self) -> f64 {
        if self.length_sum > 0 {
            self.power_sum / self.length_sum as f64
        } else {
            f64::NAN
        }
    }

    pub fn total_length(&self) -> i32 {
        self.length_sum
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Confidence score plus power window.
#[derive(Debug, Clone, Default)]
pub struct BluetoothEstimator {
    score: i32,
    last_channel: Option<usize>,
    window: PowerWindow,
}

impl BluetoothEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decay(&mut self, elapsed: i32) {
        self.score = decayed(self.score, elapsed);
    }

    /// Whether a closed pulse looks like one Bluetooth hop.
    pub fn qualifies(length: i32, bandwidth: f64) -> bool {
        length > MIN_PULSE_LENGTH
            && length < MAX_PULSE_LENGTH
            && bandwidth > MIN_BANDWIDTH_MHZ
            && bandwidth < MAX_BANDWIDTH_MHZ
    }

    /// A repeat on the channel credited last is not a new hop.
    pub fn is_new_channel(&self, channel: usize) -> bool {
        self.last_channel != Some(channel)
    }

    pub fn credit(&mut self, channel: usize, power: f64, length: i32) {
        self.last_channel = Some(channel);
        self.score = self
            .score
            .saturating_add(length.saturating_mul(SCORE_PER_LENGTH))
            .min(MAX_SCORE);
        self.window.push(power, length);
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn is_confident(&self) -> bool {
        self.score >= CONFIDENCE_THRESHOLD
    }

    /// Mean power of recent hops, NaN unless confident.
    pub fn power(&self) -> f64 {
        if self.is_confident() {
            self.window.mean_power()
        } else {
            f64::NAN
        }
    }

    pub fn window(&self) -> &PowerWindow {
        &self.window
    }
}
