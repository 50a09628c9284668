// Copyright 2025-2026 CEMAXECUTER LLC

use serde::Serialize;

use crate::channel::{ChannelSpan, Cooldowns};

/// Number of 5 MHz Zigbee channels (11 through 26).
pub const NUM_ZB_CHANNELS: usize = 16;

/// Zigbee channel number of cooldown index 0.
pub const FIRST_ZB_CHANNEL: u8 = 11;

/// 1 MHz channel offset, modulo 5, of a Zigbee channel center.
const ZB_CENTER_PHASE: i32 = 3;

pub const MIN_PULSE_LENGTH: i32 = 150;
pub const MAX_PULSE_LENGTH: i32 = 6250;
/// Pulses outside `[MIN_BANDWIDTH_MHZ, MAX_BANDWIDTH_MHZ]` count as
/// foreign activity on the Zigbee channels they cover.
pub const MIN_BANDWIDTH_MHZ: f64 = 1.0;
pub const MAX_BANDWIDTH_MHZ: f64 = 2.0;

/// A closed pulse consistent with a Zigbee transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZigbeeCandidate {
    /// IEEE 802.15.4 channel number
    pub channel: u8,
    pub center: f64,
    pub bandwidth: f64,
    pub length: i32,
}

fn zigbee_index(bt_channel: i32) -> Option<usize> {
    if bt_channel % 5 != ZB_CENTER_PHASE {
        return None;
    }
    usize::try_from(bt_channel / 5)
        .ok()
        .filter(|&i| i < NUM_ZB_CHANNELS)
}

/// Zigbee channel occupancy from closed pulses.
#[derive(Debug, Clone)]
pub struct ZigbeeMonitor {
    cooldowns: Cooldowns,
}

impl ZigbeeMonitor {
    pub fn new() -> Self {
        Self { cooldowns: Cooldowns::new(NUM_ZB_CHANNELS) }
    }

    pub fn decay(&mut self, elapsed: i32) {
        self.cooldowns.decay(elapsed);
    }

    pub fn cooldowns(&self) -> &Cooldowns {
        &self.cooldowns
    }

    /// Apply one closed pulse. Returns a candidate when the pulse sits on a
    /// quiet Zigbee channel with a plausible length.
    pub fn observe(
        &mut self,
        span: &ChannelSpan,
        center: f64,
        bandwidth: f64,
        length: i32,
    ) -> Option<ZigbeeCandidate> {
        if !(MIN_BANDWIDTH_MHZ..=MAX_BANDWIDTH_MHZ).contains(&bandwidth) {
            for bt_channel in span.range.clone() {
                if let Some(idx) = zigbee_index(bt_channel as i32) {
                    self.cooldowns.suppress(idx);
                }
            }
            return None;
        }

        if length <= MIN_PULSE_LENGTH || length >= MAX_PULSE_LENGTH {
            return None;
        }
        let idx = zigbee_index(span.center)?;
        if !self.cooldowns.is_clear(idx) {
            return None;
        }

        Some(ZigbeeCandidate {
            channel: FIRST_ZB_CHANNEL + idx as u8,
            center,
            bandwidth,
            length,
        })
    }
}

impl Default for ZigbeeMonitor {
    fn default() -> Self {
        Self::new()
    }
}
