// Copyright 2025-2026 CEMAXECUTER LLC

use crate::pulse::PulseCandidate;

/// Maximum center frequency difference (MHz) for a match; bandwidths may
/// differ by twice this.
pub const MATCH_FREQ_MHZ: f64 = 1.0;
/// Maximum peak power difference (dB) for a match.
pub const MATCH_POWER_DB: f64 = 3.0;
/// A pulse not seen for this long (timestamp units) starts a new lineage.
pub const MATCH_TIME: i32 = 150;

/// A pulse followed across consecutive scans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPulse {
    pub center: f64,
    pub bandwidth: f64,
    pub power: f64,
    pub first_seen: i32,
    pub last_seen: i32,
    /// Number of scans merged into this pulse
    pub count: u32,
    /// Set when a newer scan extended this pulse
    pub matched: bool,
}

impl TrackedPulse {
    fn start(c: &PulseCandidate) -> Self {
        Self {
            center: c.center,
            bandwidth: c.bandwidth,
            power: c.power,
            first_seen: c.timestamp,
            last_seen: c.timestamp,
            count: 1,
            matched: false,
        }
    }

    pub fn duration(&self) -> i32 {
        self.last_seen.saturating_sub(self.first_seen)
    }

    fn accepts(&self, c: &PulseCandidate) -> bool {
        self.center < c.center + MATCH_FREQ_MHZ
            && (self.bandwidth - c.bandwidth).abs() < MATCH_FREQ_MHZ * 2.0
            && (self.power - c.power).abs() < MATCH_POWER_DB
            && (c.timestamp as i64) < self.last_seen as i64 + MATCH_TIME as i64
    }

    /// Running average weighted by the number of scans already merged.
    fn merged(&self, c: &PulseCandidate) -> Self {
        let n = self.count as f64;
        let blend = |new: f64, old: f64| (new + n * old) / (n + 1.0);
        Self {
            center: blend(c.center, self.center),
            bandwidth: blend(c.bandwidth, self.bandwidth),
            power: blend(c.power, self.power),
            first_seen: self.first_seen,
            last_seen: c.timestamp,
            count: self.count + 1,
            matched: false,
        }
    }
}

/// Carries pulses from one scan to the next.
pub struct PulseTracker {
    pulses: Vec<TrackedPulse>,
    longest_previous: f64,
}

impl PulseTracker {
    pub fn new() -> Self {
        Self {
            pulses: Vec::new(),
            longest_previous: f64::NAN,
        }
    }

    /// Pulses alive after the latest round, in frequency order.
    pub fn pulses(&self) -> &[TrackedPulse] {
        &self.pulses
    }

    /// Merge this round's candidates (frequency ordered) into the tracked
    /// set. Returns the previous round's pulses that found no successor;
    /// those are finished and dropped from the tracker.
    ///
    /// Matching is a single greedy pass: each candidate is compared with
    /// the first previous pulse not more than `MATCH_FREQ_MHZ` below it.
    pub fn update(&mut self, candidates: &[PulseCandidate]) -> Vec<TrackedPulse> {
        let mut previous = std::mem::take(&mut self.pulses);
        self.pulses.reserve(candidates.len());

        let mut old_idx = 0;
        for c in candidates {
            while old_idx < previous.len() && previous[old_idx].center <= c.center - MATCH_FREQ_MHZ {
                old_idx += 1;
            }

            match previous.get_mut(old_idx) {
                Some(old) if old.accepts(c) => {
                    self.pulses.push(old.merged(c));
                    old.matched = true;
                    old_idx += 1;
                }
                _ => self.pulses.push(TrackedPulse::start(c)),
            }
        }

        self.longest_previous = longest_center(&previous);
        previous.retain(|p| !p.matched);
        if !previous.is_empty() {
            log::trace!("{} pulses closed, {} tracked", previous.len(), self.pulses.len());
        }
        previous
    }

    /// Center of the longest pulse carried into the latest round, whether
    /// or not it was extended. NaN when the round started with no pulses.
    pub fn longest_previous(&self) -> f64 {
        self.longest_previous
    }
}

/// First pulse wins ties. NaN for an empty set.
fn longest_center(pulses: &[TrackedPulse]) -> f64 {
    let mut longest = -1;
    let mut center = f64::NAN;
    for p in pulses {
        if p.duration() > longest {
            longest = p.duration();
            center = p.center;
        }
    }
    center
}

impl Default for PulseTracker {
    fn default() -> Self {
        Self::new()
    }
}
