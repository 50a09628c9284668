// Copyright 2025-2026 CEMAXECUTER LLC

use std::ops::Range;

/// Frequency of channel 0 in MHz; channels are 1 MHz apart.
pub const BASE_FREQ_MHZ: f64 = 2402.0;

/// Number of 1 MHz Bluetooth-like channels.
pub const NUM_BT_CHANNELS: usize = 79;

/// Value a cooldown is reset to when wideband activity covers it.
pub const COOLDOWN_CEILING: i32 = 2500;

/// Channels touched by a pulse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpan {
    /// Channel nearest the pulse center; may lie outside the channel plan
    pub center: i32,
    /// Covered channels, clipped to `[0, NUM_BT_CHANNELS)`
    pub range: Range<usize>,
}

impl ChannelSpan {
    /// `None` for non-finite pulse statistics.
    pub fn from_pulse(center: f64, bandwidth: f64) -> Option<Self> {
        if !center.is_finite() || !bandwidth.is_finite() {
            return None;
        }

        let channel = |f: f64| (f - BASE_FREQ_MHZ).round() as i32;
        let start = channel(center - bandwidth / 2.0).max(0);
        let end = (channel(center + bandwidth / 2.0) + 1).min(NUM_BT_CHANNELS as i32);

        let range = if end > start {
            start as usize..end as usize
        } else {
            0..0
        };
        Some(Self { center: channel(center), range })
    }

    /// Center channel as an index, if it is inside the channel plan.
    pub fn center_index(&self) -> Option<usize> {
        usize::try_from(self.center)
            .ok()
            .filter(|&c| c < NUM_BT_CHANNELS)
    }
}

/// Per-channel countdowns that block narrowband credit after wideband
/// activity. Never negative.
#[derive(Debug, Clone)]
pub struct Cooldowns {
    counters: Vec<i32>,
}

impl Cooldowns {
    pub fn new(channels: usize) -> Self {
        Self { counters: vec![0; channels] }
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Count every channel down by `elapsed`, flooring at zero.
    pub fn decay(&mut self, elapsed: i32) {
        for c in self.counters.iter_mut() {
            *c = decayed(*c, elapsed);
        }
    }

    pub fn suppress(&mut self, channel: usize) {
        if let Some(c) = self.counters.get_mut(channel) {
            *c = COOLDOWN_CEILING;
        }
    }

    pub fn get(&self, channel: usize) -> i32 {
        self.counters.get(channel).copied().unwrap_or(0)
    }

    pub fn is_clear(&self, channel: usize) -> bool {
        self.get(channel) <= 0
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.counters
    }
}

/// `value - elapsed`, floored at zero.
pub(crate) fn decayed(value: i32, elapsed: i32) -> i32 {
    if value > elapsed {
        value - elapsed
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_mapping() {
        let span = ChannelSpan::from_pulse(2426.0, 0.8).unwrap();
        assert_eq!(span.center, 24);
        assert_eq!(span.range, 24..25);

        let span = ChannelSpan::from_pulse(2414.0, 4.0).unwrap();
        assert_eq!(span.center, 12);
        assert_eq!(span.range, 10..15);
    }

    #[test]
    fn test_channel_mapping_clipped() {
        let span = ChannelSpan::from_pulse(2400.0, 6.0).unwrap();
        assert_eq!(span.center, -2);
        assert_eq!(span.range, 0..2);
        assert_eq!(span.center_index(), None);

        let span = ChannelSpan::from_pulse(2482.0, 4.0).unwrap();
        assert_eq!(span.range, 78..79);
        assert_eq!(span.center_index(), None);

        let span = ChannelSpan::from_pulse(2300.0, 1.0).unwrap();
        assert!(span.range.is_empty());

        assert!(ChannelSpan::from_pulse(f64::NAN, 1.0).is_none());
    }

    #[test]
    fn test_cooldown_decay_floors_at_zero() {
        let mut cd = Cooldowns::new(4);
        cd.suppress(1);
        cd.suppress(9); // out of range, ignored
        cd.decay(1000);
        assert_eq!(cd.get(1), 1500);
        cd.decay(2000);
        assert_eq!(cd.get(1), 0);
        assert!(cd.as_slice().iter().all(|&c| c >= 0));
    }
}
