// Copyright 2025-2026 CEMAXECUTER LLC

use std::collections::VecDeque;

use sa_scan::{ScanSample, MAX_NUM_BINS};

/// Maximum number of scans kept in the averaging window.
pub const MAX_WINDOW_SIZE: usize = 200;

/// Maximum age of a scan in the window, in timestamp units.
pub const MAX_WINDOW_TIME: i32 = 625;

/// Rolling per-bin average over the current window.
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedSpectrum {
    pub bins: Vec<f64>,
    pub center_freq: u16,
    pub timestamp: i32,
}

impl AveragedSpectrum {
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }
}

/// Trailing moving average over recent scans of the same layout.
///
/// Scans whose bin count or center frequency differ from the newest one,
/// or which fell out of the time window, are evicted before averaging, so
/// a retune flushes the window.
pub struct WindowAverager {
    scans: VecDeque<ScanSample>,
    sum: Vec<i32>,
    capacity: usize,
    max_age: i32,
}

impl WindowAverager {
    pub fn new() -> Self {
        Self::with_limits(MAX_WINDOW_SIZE, MAX_WINDOW_TIME)
    }

    pub fn with_limits(capacity: usize, max_age: i32) -> Self {
        let capacity = capacity.max(1);
        Self {
            scans: VecDeque::with_capacity(capacity),
            sum: vec![0; MAX_NUM_BINS],
            capacity,
            max_age,
        }
    }

    /// Admit a scan and return the average over the updated window.
    pub fn push(&mut self, scan: ScanSample) -> AveragedSpectrum {
        let oldest_kept = scan.timestamp as i64 - self.max_age as i64;

        while let Some(front) = self.scans.front() {
            let stale = !front.same_layout(&scan) || front.timestamp as i64 <= oldest_kept;
            if !stale {
                break;
            }
            self.evict_front();
        }

        if self.scans.len() >= self.capacity {
            self.evict_front();
        }

        for (acc, &p) in self.sum.iter_mut().zip(&scan.bins) {
            *acc += p as i32;
        }

        let n = scan.bins.len();
        let (center_freq, timestamp) = (scan.center_freq, scan.timestamp);
        self.scans.push_back(scan);

        let size = self.scans.len() as f64;
        AveragedSpectrum {
            bins: self.sum[..n].iter().map(|&s| s as f64 / size).collect(),
            center_freq,
            timestamp,
        }
    }

    fn evict_front(&mut self) {
        if let Some(old) = self.scans.pop_front() {
            for (acc, &p) in self.sum.iter_mut().zip(&old.bins) {
                *acc -= p as i32;
            }
        }
    }

    /// Scans currently retained, oldest first.
    pub fn scans(&self) -> impl Iterator<Item = &ScanSample> {
        self.scans.iter()
    }

    /// Running per-bin sum over the retained scans.
    pub fn sum(&self) -> &[i32] {
        &self.sum
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }
}

impl Default for WindowAverager {
    fn default() -> Self {
        Self::new()
    }
}
