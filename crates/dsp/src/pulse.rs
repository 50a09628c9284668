// Copyright 2025-2026 CEMAXECUTER LLC

//! Power pulse detection on an averaged spectrum.
//!
//! A pulse is a contiguous run of bins within `PEAK_MARGIN_DB` of a local
//! maximum. Its center and bandwidth are the power-weighted mean and twice
//! the power-weighted standard deviation of the bin index, converted to MHz
//! using the fixed scan span.

use std::ops::Range;

use sa_scan::SPAN_WIDTH_MHZ;

use crate::window::AveragedSpectrum;

/// Bins further than this below the peak end a run.
pub const PEAK_MARGIN_DB: f64 = 10.0;

const SPAN_WIDTH: f64 = SPAN_WIDTH_MHZ as f64;

/// Detection floor and minimum run width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionProfile {
    /// Peaks at or below this power are ignored, and runs are trimmed past
    /// bins at or below it
    pub floor: f64,
    /// Narrowest accepted run, in bins
    pub min_width: usize,
}

impl DetectionProfile {
    /// Used for interference classification.
    pub const STRICT: DetectionProfile = DetectionProfile { floor: -100.0, min_width: 2 };

    /// Admits single-bin pulses, but only well above the noise.
    pub const LOOSE: DetectionProfile = DetectionProfile { floor: -80.0, min_width: 1 };

    /// Profile compiled into the pipeline.
    #[cfg(not(feature = "loose-detect"))]
    pub const ACTIVE: DetectionProfile = DetectionProfile::STRICT;
    #[cfg(feature = "loose-detect")]
    pub const ACTIVE: DetectionProfile = DetectionProfile::LOOSE;
}

impl Default for DetectionProfile {
    fn default() -> Self {
        Self::ACTIVE
    }
}

/// One pulse detected in one averaged spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseCandidate {
    /// Center frequency in MHz
    pub center: f64,
    /// Bandwidth in MHz
    pub bandwidth: f64,
    /// Peak power in dB
    pub power: f64,
    pub timestamp: i32,
}

impl PulseCandidate {
    /// Zero-power runs produce NaN statistics; those are detector noise.
    pub fn is_finite(&self) -> bool {
        self.center.is_finite() && self.bandwidth.is_finite()
    }
}

pub struct PulseDetector {
    profile: DetectionProfile,
}

impl PulseDetector {
    pub fn new(profile: DetectionProfile) -> Self {
        Self { profile }
    }

    /// Find all disjoint pulses, in increasing frequency order.
    pub fn detect(&self, spectrum: &AveragedSpectrum) -> Vec<PulseCandidate> {
        let pwr = &spectrum.bins;
        let n = pwr.len();
        let floor = self.profile.floor;
        let mut pulses = Vec::new();

        let mut next = 0usize;
        while next < n {
            let peak = next;
            let peak_pwr = pwr[peak];
            let mut start = peak;
            let mut end = peak;

            // Shoulder below the peak on the low side
            while start > 0 && pwr[start - 1] > peak_pwr - PEAK_MARGIN_DB && pwr[start - 1] < peak_pwr {
                start -= 1;
            }
            if start > 0 && pwr[start - 1] >= peak_pwr {
                // Belongs to a higher or equal peak further down
                next += 1;
                continue;
            }

            while end < n && pwr[end] > peak_pwr - PEAK_MARGIN_DB && pwr[end] <= peak_pwr {
                end += 1;
            }
            next = end.max(peak + 1);
            if end < n && pwr[end] > peak_pwr {
                // Still rising, the real peak is picked up when we get there
                continue;
            }
            if peak_pwr <= floor {
                continue;
            }

            while start < peak && pwr[start] <= floor {
                start += 1;
            }
            while end > peak && pwr[end - 1] <= floor {
                end -= 1;
            }
            if end - start < self.profile.min_width {
                continue;
            }

            pulses.push(make_pulse(spectrum, start..end, peak));
        }

        log::trace!("{} pulses at t={}", pulses.len(), spectrum.timestamp);
        pulses
    }
}

impl Default for PulseDetector {
    fn default() -> Self {
        Self::new(DetectionProfile::ACTIVE)
    }
}

fn make_pulse(spectrum: &AveragedSpectrum, run: Range<usize>, peak: usize) -> PulseCandidate {
    let pwr = &spectrum.bins;
    let n = pwr.len() as f64;

    let mut sum_pwr = 0.0;
    let mut sum_prod = 0.0;
    for bin in run.clone() {
        sum_pwr += pwr[bin];
        sum_prod += bin as f64 * pwr[bin];
    }
    let center_bin = sum_prod / sum_pwr;

    let sum_dis: f64 = run
        .map(|bin| (bin as f64 - center_bin).powi(2) * pwr[bin])
        .sum();
    let bw_bin = 2.0 * (sum_dis / sum_pwr).sqrt();

    PulseCandidate {
        center: (center_bin / n - 0.5) * SPAN_WIDTH + spectrum.center_freq as f64,
        bandwidth: bw_bin / n * SPAN_WIDTH,
        power: pwr[peak],
        timestamp: spectrum.timestamp,
    }
}

/// Bins covered by a pulse at `center`/`bandwidth` MHz in a scan of
/// `bin_count` bins tuned to `center_freq`. Inverse of the conversion used
/// by the detector; clipped to the scan, empty for non-finite input.
pub fn bin_range(center: f64, bandwidth: f64, center_freq: u16, bin_count: usize) -> Range<usize> {
    if !center.is_finite() || !bandwidth.is_finite() {
        return 0..0;
    }

    let n = bin_count as f64;
    let center_bin = ((center - center_freq as f64) / SPAN_WIDTH + 0.5) * n;
    let bw_bin = bandwidth / SPAN_WIDTH * n;

    let start = (center_bin - bw_bin / 2.0).round().max(0.0);
    let end = ((center_bin + bw_bin / 2.0).round() + 1.0).min(n);
    if end <= start {
        return 0..0;
    }
    start as usize..end as usize
}
