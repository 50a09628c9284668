// Copyright 2025-2026 CEMAXECUTER LLC

use sa_dsp::pulse::bin_range;
use sa_dsp::{PulseCandidate, TrackedPulse};

/// Pack 8-bit channel values into RGB565. Channel values are expected in
/// `0..=255`.
pub fn rgb565(red: i32, green: i32, blue: i32) -> u16 {
    (((red << 8) & 0xf800) | ((green << 3) & 0x07e0) | ((blue >> 3) & 0x001f)) as u16
}

/// Baseline colour of a bin.
pub fn power_color(pwr: i8) -> u16 {
    let p = pwr as i32;
    rgb565(0x80 + p, 0x40 + p / 2, 0xc0 + p / 2)
}

/// Colour of bins covered by a pulse that just closed.
pub fn closed_pulse_color() -> u16 {
    rgb565(0xff, 0, 0)
}

/// Colour of bins covered by a pulse detected in this scan.
pub fn candidate_color(pwr: i8) -> u16 {
    let p = pwr as i32;
    rgb565(0x80 + p, 0xc0 + p / 2, 0x40 + p / 2)
}

/// One colour-mapped waterfall line, one pixel per bin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlotRow {
    pub pixels: Vec<u16>,
    pub timestamp: i32,
}

impl PlotRow {
    /// Colour-map a raw scan. With `overlay`, bins under closed pulses and
    /// under this scan's candidates are repainted, candidates last.
    pub fn render(
        bins: &[i8],
        center_freq: u16,
        timestamp: i32,
        overlay: Option<(&[TrackedPulse], &[PulseCandidate])>,
    ) -> Self {
        let mut pixels: Vec<u16> = bins.iter().map(|&p| power_color(p)).collect();

        if let Some((closed, candidates)) = overlay {
            let n = bins.len();
            for pulse in closed {
                for bin in bin_range(pulse.center, pulse.bandwidth, center_freq, n) {
                    pixels[bin] = closed_pulse_color();
                }
            }
            for pulse in candidates {
                for bin in bin_range(pulse.center, pulse.bandwidth, center_freq, n) {
                    pixels[bin] = candidate_color(bins[bin]);
                }
            }
        }

        Self { pixels, timestamp }
    }

    /// Rows that were never written have no pixels.
    pub fn is_written(&self) -> bool {
        !self.pixels.is_empty()
    }
}

/// Fixed-capacity ring of plot rows; the oldest row is overwritten when
/// full. Draining leaves the slots in place so recent timestamps can still
/// be sampled for display markers.
#[derive(Debug, Default)]
pub struct PlotRing {
    slots: Vec<PlotRow>,
    pos: usize,
    size: usize,
}

impl PlotRing {
    pub fn new(capacity: usize) -> Self {
        let mut ring = Self::default();
        ring.resize(capacity);
        ring
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Rows waiting to be drained.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Reallocate for `capacity` rows, dropping everything buffered. If the
    /// allocation fails the ring falls back to capacity 0.
    pub fn resize(&mut self, capacity: usize) {
        self.slots = Vec::new();
        self.pos = 0;
        self.size = 0;

        if capacity == 0 {
            return;
        }
        if let Err(e) = self.slots.try_reserve_exact(capacity) {
            log::error!("can't allocate plot ring of {} rows: {}", capacity, e);
            return;
        }
        self.slots.resize_with(capacity, PlotRow::default);
    }

    /// Append a row, evicting the oldest when full. Dropped at capacity 0.
    pub fn push(&mut self, row: PlotRow) {
        let capacity = self.capacity();
        if capacity == 0 {
            return;
        }

        let write_pos = (self.pos + self.size) % capacity;
        self.slots[write_pos] = row;

        if self.size < capacity {
            self.size += 1;
        } else {
            self.pos = (self.pos + 1) % capacity;
        }
    }

    /// Take every buffered row, oldest first.
    pub fn drain(&mut self) -> Vec<PlotRow> {
        let capacity = self.capacity();
        let mut rows = Vec::with_capacity(self.size);
        while self.size > 0 {
            rows.push(self.slots[self.pos].clone());
            self.pos = (self.pos + 1) % capacity;
            self.size -= 1;
        }
        rows
    }

    /// Slot written `age` rows before the most recent one, counting drained
    /// rows too. `None` if that slot was never written.
    pub fn recent(&self, age: usize) -> Option<&PlotRow> {
        let capacity = self.capacity();
        if capacity == 0 {
            return None;
        }
        let newest = (self.pos + self.size + capacity - 1) % capacity;
        let idx = (newest + capacity - age % capacity) % capacity;
        let row = &self.slots[idx];
        row.is_written().then_some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timestamp: i32) -> PlotRow {
        PlotRow { pixels: vec![0x1234; 4], timestamp }
    }

    #[test]
    fn test_rgb565_packing() {
        assert_eq!(rgb565(0xff, 0, 0), 0xf800);
        assert_eq!(rgb565(0, 0xff, 0), 0x07e0);
        assert_eq!(rgb565(0, 0, 0xff), 0x001f);
        assert_eq!(closed_pulse_color(), 0xf800);
    }

    #[test]
    fn test_power_colors() {
        // -100: r=28, g=14, b=142
        assert_eq!(power_color(-100), rgb565(28, 14, 142));
        // odd powers truncate toward zero: -61 / 2 == -30
        assert_eq!(power_color(-61), rgb565(67, 34, 162));
        assert_eq!(candidate_color(-61), rgb565(67, 162, 34));
        assert_eq!(power_color(127), rgb565(255, 127, 255));
        assert_eq!(power_color(-128), rgb565(0, 0, 128));
    }

    #[test]
    fn test_render_without_overlay() {
        let r = PlotRow::render(&[-100, -50], 2440, 7, None);
        assert_eq!(r.pixels, vec![power_color(-100), power_color(-50)]);
        assert_eq!(r.timestamp, 7);
    }

    #[test]
    fn test_render_overlay() {
        let bins = vec![-90i8; 256];
        let closed = [TrackedPulse {
            center: 2430.0,
            bandwidth: 0.0,
            power: -60.0,
            first_seen: 0,
            last_seen: 10,
            count: 2,
            matched: false,
        }];
        let candidates = [PulseCandidate { center: 2440.0, bandwidth: 1.0, power: -60.0, timestamp: 20 }];

        let r = PlotRow::render(&bins, 2440, 20, Some((&closed, &candidates)));
        // 2430 MHz -> bin 64
        assert_eq!(r.pixels[64], closed_pulse_color());
        assert_eq!(r.pixels[63], power_color(-90));
        assert_eq!(r.pixels[65], power_color(-90));
        for bin in 125..132 {
            assert_eq!(r.pixels[bin], candidate_color(-90));
        }
        assert_eq!(r.pixels[132], power_color(-90));
    }

    #[test]
    fn test_drain_keeps_newest_k() {
        let mut ring = PlotRing::new(5);
        for t in 0..12 {
            ring.push(row(t));
        }
        assert_eq!(ring.len(), 5);

        let ts: Vec<i32> = ring.drain().iter().map(|r| r.timestamp).collect();
        assert_eq!(ts, vec![7, 8, 9, 10, 11]);
        assert!(ring.is_empty());
        assert!(ring.drain().is_empty());
    }

    #[test]
    fn test_resize_clears() {
        let mut ring = PlotRing::new(4);
        ring.push(row(1));
        ring.push(row(2));
        ring.resize(8);
        assert!(ring.is_empty());
        assert!(ring.recent(0).is_none());

        ring.push(row(3));
        ring.resize(2);
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 2);
    }

    #[test]
    fn test_zero_capacity_drops_rows() {
        let mut ring = PlotRing::new(0);
        ring.push(row(1));
        assert!(ring.is_empty());
        assert!(ring.drain().is_empty());
        assert!(ring.recent(0).is_none());
    }

    #[test]
    fn test_recent_after_drain() {
        let mut ring = PlotRing::new(4);
        for t in 0..6 {
            ring.push(row(t));
        }
        ring.drain();
        assert_eq!(ring.recent(0).map(|r| r.timestamp), Some(5));
        assert_eq!(ring.recent(1).map(|r| r.timestamp), Some(4));
        assert_eq!(ring.recent(3).map(|r| r.timestamp), Some(2));

        let mut partial = PlotRing::new(4);
        partial.push(row(9));
        assert_eq!(partial.recent(0).map(|r| r.timestamp), Some(9));
        assert!(partial.recent(1).is_none());
    }
}
