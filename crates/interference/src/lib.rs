// Copyright 2025-2026 CEMAXECUTER LLC

//! Interference classification from closed pulses.
//!
//! Every round the classifier first lets all cooldowns and the Bluetooth
//! confidence score decay by the time elapsed since the previous round,
//! then looks at the pulses that closed in this round:
//!
//! * wideband pulses (> 2 MHz) block Bluetooth credit on the channels they
//!   cover for `COOLDOWN_CEILING` timestamp units;
//! * short 0.5-1 MHz pulses on an unblocked channel, different from the
//!   channel credited last, count as Bluetooth hops;
//! * independently, Zigbee channels get the same treatment with their own
//!   bandwidth and length limits.

pub mod bluetooth;
pub mod channel;
pub mod zigbee;

use sa_dsp::TrackedPulse;

use crate::bluetooth::BluetoothEstimator;
use crate::channel::{ChannelSpan, Cooldowns, NUM_BT_CHANNELS};
use crate::zigbee::ZigbeeMonitor;

pub use crate::zigbee::ZigbeeCandidate;

/// Bluetooth channels are suppressed by pulses wider than this (MHz).
pub const WIDEBAND_MHZ: f64 = 2.0;

/// What one classification round produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundSummary {
    /// Closed pulses credited as Bluetooth hops
    pub bluetooth_hops: usize,
    /// Closed pulses that set Bluetooth cooldowns
    pub wideband: usize,
    pub zigbee: Vec<ZigbeeCandidate>,
}

pub struct Classifier {
    bt_cooldowns: Cooldowns,
    bluetooth: BluetoothEstimator,
    zigbee: ZigbeeMonitor,
    prev_timestamp: Option<i32>,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            bt_cooldowns: Cooldowns::new(NUM_BT_CHANNELS),
            bluetooth: BluetoothEstimator::new(),
            zigbee: ZigbeeMonitor::new(),
            prev_timestamp: None,
        }
    }

    /// Run one round at `timestamp` over the pulses that just closed.
    pub fn update(&mut self, timestamp: i32, closed: &[TrackedPulse]) -> RoundSummary {
        if let Some(prev) = self.prev_timestamp {
            if timestamp > prev {
                let elapsed = timestamp.saturating_sub(prev);
                self.bt_cooldowns.decay(elapsed);
                self.zigbee.decay(elapsed);
                self.bluetooth.decay(elapsed);
            }
        }
        self.prev_timestamp = Some(timestamp);

        let mut summary = RoundSummary::default();

        for pulse in closed {
            let length = pulse.duration();
            let Some(span) = ChannelSpan::from_pulse(pulse.center, pulse.bandwidth) else {
                continue;
            };

            if pulse.bandwidth > WIDEBAND_MHZ {
                for ch in span.range.clone() {
                    self.bt_cooldowns.suppress(ch);
                }
                summary.wideband += 1;
            } else if BluetoothEstimator::qualifies(length, pulse.bandwidth) {
                if let Some(ch) = span.center_index() {
                    if self.bt_cooldowns.is_clear(ch) && self.bluetooth.is_new_channel(ch) {
                        self.bluetooth.credit(ch, pulse.power, length);
                        summary.bluetooth_hops += 1;
                    }
                }
            }

            if let Some(candidate) = self.zigbee.observe(&span, pulse.center, pulse.bandwidth, length) {
                log::debug!(
                    "zigbee candidate: channel {} center {:.4} bw {:.4} length {}",
                    candidate.channel,
                    candidate.center,
                    candidate.bandwidth,
                    candidate.length
                );
                summary.zigbee.push(candidate);
            }
        }

        summary
    }

    /// Mean power of Bluetooth-like hops, NaN unless confident.
    pub fn bluetooth_power(&self) -> f64 {
        self.bluetooth.power()
    }

    pub fn bluetooth(&self) -> &BluetoothEstimator {
        &self.bluetooth
    }

    pub fn bt_cooldowns(&self) -> &Cooldowns {
        &self.bt_cooldowns
    }

    pub fn zigbee(&self) -> &ZigbeeMonitor {
        &self.zigbee
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::MAX_SCORE;
    use crate::channel::COOLDOWN_CEILING;
    use approx::assert_relative_eq;

    fn pulse(center: f64, bandwidth: f64, power: f64, first: i32, last: i32) -> TrackedPulse {
        TrackedPulse {
            center,
            bandwidth,
            power,
            first_seen: first,
            last_seen: last,
            count: 2,
            matched: false,
        }
    }

    fn hop(channel: i32, t: i32) -> TrackedPulse {
        pulse(2402.0 + channel as f64, 0.8, -60.0, t - 600, t)
    }

    #[test]
    fn test_hop_credited() {
        let mut cls = Classifier::new();
        let summary = cls.update(1000, &[hop(20, 1000)]);
        assert_eq!(summary.bluetooth_hops, 1);
        assert_eq!(cls.bluetooth().score(), 60_000);
        assert!(cls.bluetooth_power().is_nan());
    }

    #[test]
    fn test_same_channel_not_credited_twice() {
        let mut cls = Classifier::new();
        cls.update(1000, &[hop(20, 1000)]);
        let summary = cls.update(1001, &[hop(20, 1001)]);
        assert_eq!(summary.bluetooth_hops, 0);

        let summary = cls.update(1002, &[hop(21, 1002)]);
        assert_eq!(summary.bluetooth_hops, 1);
    }

    #[test]
    fn test_wideband_blocks_spanned_channels() {
        let mut cls = Classifier::new();
        // 2414 MHz +/- 2 MHz covers channels 10..=14
        cls.update(0, &[pulse(2414.0, 4.0, -50.0, -500, 0)]);
        for ch in 10..15 {
            assert_eq!(cls.bt_cooldowns().get(ch), COOLDOWN_CEILING);
        }
        assert_eq!(cls.bt_cooldowns().get(9), 0);
        assert_eq!(cls.bt_cooldowns().get(15), 0);

        let mut t = 0;
        for ch in [10, 11, 12, 13, 14, 10, 12, 14] {
            t += 300;
            let summary = cls.update(t, &[hop(ch, t)]);
            assert_eq!(summary.bluetooth_hops, 0, "channel {} credited at t={}", ch, t);
        }
        assert_eq!(cls.bluetooth().score(), 0);

        // Cooldown over after 2500 units
        let summary = cls.update(2500, &[hop(11, 2500)]);
        assert_eq!(summary.bluetooth_hops, 1);
    }

    #[test]
    fn test_three_mhz_pulse_spans_channels() {
        let mut cls = Classifier::new();
        let summary = cls.update(0, &[pulse(2414.0, 3.0, -50.0, -500, 0)]);
        assert_eq!(summary.wideband, 1);
        let blocked: Vec<usize> = (0..NUM_BT_CHANNELS)
            .filter(|&ch| cls.bt_cooldowns().get(ch) > 0)
            .collect();
        assert_eq!(blocked, vec![11, 12, 13, 14]);
    }

    #[test]
    fn test_decay_uses_elapsed_time() {
        let mut cls = Classifier::new();
        cls.update(100, &[pulse(2430.0, 5.0, -50.0, 0, 100)]);
        cls.update(1100, &[]);
        assert_eq!(cls.bt_cooldowns().get(28), COOLDOWN_CEILING - 1000);

        // Time going backwards does not decay
        cls.update(500, &[]);
        assert_eq!(cls.bt_cooldowns().get(28), COOLDOWN_CEILING - 1000);
        cls.update(600, &[]);
        assert_eq!(cls.bt_cooldowns().get(28), COOLDOWN_CEILING - 1100);
    }

    #[test]
    fn test_confidence_exposes_power() {
        let mut cls = Classifier::new();
        let mut t = 0;
        let mut ch = 0;
        // Each hop adds 3000 * 100, decays by the 10 units between rounds
        while !cls.bluetooth().is_confident() {
            t += 10;
            ch = (ch + 7) % 79;
            cls.update(t, &[pulse(2402.0 + ch as f64, 0.7, -55.0, t - 3000, t)]);
            assert!(cls.bluetooth().score() <= MAX_SCORE);
        }
        assert_relative_eq!(cls.bluetooth_power(), -55.0);

        for _ in 0..50 {
            t += 10;
            ch = (ch + 7) % 79;
            cls.update(t, &[pulse(2402.0 + ch as f64, 0.7, -55.0, t - 3000, t)]);
            assert!(cls.bluetooth().score() <= MAX_SCORE);
        }
        assert!(cls.bluetooth().score() > 0);

        cls.update(t + 10_000_000, &[]);
        assert_eq!(cls.bluetooth().score(), 0);
        assert!(cls.bluetooth_power().is_nan());
    }

    #[test]
    fn test_zigbee_reported() {
        let mut cls = Classifier::new();
        let summary = cls.update(0, &[pulse(2425.0, 1.5, -70.0, -1000, 0)]);
        assert_eq!(summary.zigbee.len(), 1);
        assert_eq!(summary.zigbee[0].channel, 15);
        assert_eq!(summary.bluetooth_hops, 0);
    }

    #[test]
    fn test_nan_pulse_ignored() {
        let mut cls = Classifier::new();
        let summary = cls.update(0, &[pulse(f64::NAN, f64::NAN, 0.0, 0, 400)]);
        assert_eq!(summary.bluetooth_hops, 0);
        assert_eq!(summary.wideband, 0);
        assert!(summary.zigbee.is_empty());
        assert!(cls.bt_cooldowns().as_slice().iter().all(|&c| c == 0));
    }
}
