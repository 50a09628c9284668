use serde::Serialize;

use sa_dsp::{PulseDetector, PulseTracker, TrackedPulse, WindowAverager};
use sa_interference::{Classifier, RoundSummary, ZigbeeCandidate};
use sa_output::{DisplayMarks, PlotRing, PlotRow, PlotSurface};
use sa_scan::{ScanSample, SPAN_WIDTH_MHZ};

/// What one datagram did to the analysis state.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub timestamp: i32,
    /// Pulses detected in this scan
    pub candidates: usize,
    /// Pulses tracked after this scan
    pub tracked: usize,
    /// Pulses from the previous scan that found no successor
    pub closed: Vec<TrackedPulse>,
    pub summary: RoundSummary,
}

/// Snapshot handed to the display after a render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderStatus {
    /// Rows drained into the surface
    pub rows: usize,
    /// Time from the newest row back to the rows a quarter, half and three
    /// quarters of the display height older
    pub elapsed: [Option<i64>; 3],
    pub center_pos: f32,
    pub center_freq: u16,
    pub span_width: u32,
    /// NaN (null in JSON) until Bluetooth-like hopping is established
    pub bluetooth_power: f64,
    /// Center of the longest pulse tracked into the latest round, NaN when
    /// there was none
    pub pulse_freq: f64,
    pub zigbee: Vec<ZigbeeCandidate>,
}

/// Full analysis state: one `process` call per datagram.
pub struct Pipeline {
    window: WindowAverager,
    detector: PulseDetector,
    tracker: PulseTracker,
    classifier: Classifier,
    ring: PlotRing,
    center_freq: u16,
    bluetooth_power: f64,
    pulse_freq: f64,
    zigbee: Vec<ZigbeeCandidate>,
    rounds: u64,
    dropped: u64,
}

impl Pipeline {
    pub fn new(display_height: usize) -> Self {
        Self {
            window: WindowAverager::new(),
            detector: PulseDetector::default(),
            tracker: PulseTracker::new(),
            classifier: Classifier::new(),
            ring: PlotRing::new(display_height),
            center_freq: 0,
            bluetooth_power: f64::NAN,
            pulse_freq: f64::NAN,
            zigbee: Vec::new(),
            rounds: 0,
            dropped: 0,
        }
    }

    /// Decode and analyse one datagram. Malformed datagrams are dropped.
    pub fn process(&mut self, datagram: &[u8], overlay: bool) -> Option<RoundReport> {
        match sa_scan::parse(datagram) {
            Ok(scan) => Some(self.process_scan(scan, overlay)),
            Err(e) => {
                self.dropped += 1;
                log::trace!("dropping datagram: {}", e);
                None
            }
        }
    }

    pub fn process_scan(&mut self, scan: ScanSample, overlay: bool) -> RoundReport {
        let ScanSample { center_freq, timestamp, .. } = scan;
        let bins = scan.bins.clone();

        let spectrum = self.window.push(scan);
        let candidates = self.detector.detect(&spectrum);
        let closed = self.tracker.update(&candidates);
        let summary = self.classifier.update(timestamp, &closed);

        self.center_freq = center_freq;
        self.bluetooth_power = self.classifier.bluetooth_power();
        self.pulse_freq = self.tracker.longest_previous();
        if !summary.zigbee.is_empty() {
            self.zigbee = summary.zigbee.clone();
        }
        self.rounds += 1;

        if self.ring.capacity() > 0 {
            let overlay = overlay.then_some((closed.as_slice(), candidates.as_slice()));
            self.ring.push(PlotRow::render(&bins, center_freq, timestamp, overlay));
        }

        log::debug!(
            "t={} {} MHz: {} candidates, {} tracked, {} closed, {} hops, {} wideband",
            timestamp,
            center_freq,
            candidates.len(),
            self.tracker.pulses().len(),
            closed.len(),
            summary.bluetooth_hops,
            summary.wideband
        );

        RoundReport {
            timestamp,
            candidates: candidates.len(),
            tracked: self.tracker.pulses().len(),
            closed,
            summary,
        }
    }

    /// Resize the waterfall ring; clears buffered rows unless unchanged.
    pub fn set_display_height(&mut self, rows: usize) {
        if rows != self.ring.capacity() {
            self.ring.resize(rows);
        }
    }

    /// Drain buffered rows into `surface` and report the latest outputs.
    pub fn render(&mut self, surface: &mut PlotSurface) -> RenderStatus {
        let rows = self.ring.drain();
        surface.draw(&rows);

        let marks = DisplayMarks::sample(&self.ring, surface);
        RenderStatus {
            rows: rows.len(),
            elapsed: [marks.elapsed(1), marks.elapsed(2), marks.elapsed(3)],
            center_pos: marks.center_pos,
            center_freq: self.center_freq,
            span_width: SPAN_WIDTH_MHZ,
            bluetooth_power: self.bluetooth_power,
            pulse_freq: self.pulse_freq,
            zigbee: self.zigbee.clone(),
        }
    }

    pub fn tracker(&self) -> &PulseTracker {
        &self.tracker
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn window(&self) -> &WindowAverager {
        &self.window
    }

    pub fn ring(&self) -> &PlotRing {
        &self.ring
    }

    pub fn bluetooth_power(&self) -> f64 {
        self.bluetooth_power
    }

    /// Zigbee candidates from the most recent round that produced any.
    pub fn zigbee(&self) -> &[ZigbeeCandidate] {
        &self.zigbee
    }

    /// (rounds processed, datagrams dropped)
    pub fn counters(&self) -> (u64, u64) {
        (self.rounds, self.dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FLOOR: i8 = -100;

    fn datagram(bins: Vec<i8>, timestamp: i32) -> Vec<u8> {
        ScanSample { bins, center_freq: 2440, timestamp }.to_datagram()
    }

    fn peak_bins() -> Vec<i8> {
        let mut bins = vec![FLOOR; 256];
        bins[127] = -85;
        bins[128] = -80;
        bins[129] = -85;
        bins
    }

    #[test]
    fn test_three_datagram_sequence() {
        let mut p = Pipeline::new(16);

        let a = p.process(&datagram(vec![FLOOR; 256], 0), false).unwrap();
        assert_eq!(a.candidates, 0);
        assert_eq!(a.tracked, 0);

        // Far enough from (a) that the window holds (b) alone
        let b = p.process(&datagram(peak_bins(), 1000), false).unwrap();
        assert_eq!(b.candidates, 1);
        assert_eq!(p.tracker().pulses().len(), 1);
        let pulse = p.tracker().pulses()[0];
        assert_eq!(pulse.count, 1);
        assert_eq!(pulse.first_seen, 1000);
        assert_relative_eq!(pulse.center, 2440.0, epsilon = 1e-9);

        let c = p.process(&datagram(peak_bins(), 1100), false).unwrap();
        assert!(c.closed.is_empty());
        assert_eq!(p.tracker().pulses().len(), 1);
        let pulse = p.tracker().pulses()[0];
        assert_eq!(pulse.count, 2);
        assert_eq!(pulse.first_seen, 1000);
        assert_eq!(pulse.last_seen, 1100);
    }

    #[test]
    fn test_pulse_closes_when_gone() {
        let mut p = Pipeline::new(0);
        p.process(&datagram(peak_bins(), 1000), false);
        p.process(&datagram(peak_bins(), 1100), false);

        // A different bin count flushes the window, leaving a flat spectrum
        let r = p.process(&datagram(vec![FLOOR; 128], 1200), false).unwrap();
        assert_eq!(r.closed.len(), 1);
        assert_eq!(r.closed[0].duration(), 100);
        assert_eq!(r.tracked, 0);
    }

    #[test]
    fn test_pulse_freq_follows_carrier() {
        let mut p = Pipeline::new(0);
        let mut surface = PlotSurface::new(8, 0);
        for t in 0..5 {
            p.process(&datagram(peak_bins(), 1000 + t * 50), false);
        }
        assert_eq!(p.tracker().pulses()[0].count, 5);
        let status = p.render(&mut surface);
        assert_relative_eq!(status.pulse_freq, 2440.0, epsilon = 1e-9);

        // Reported for the round the carrier closes in, then cleared
        p.process(&datagram(vec![FLOOR; 128], 1300), false);
        assert_relative_eq!(p.render(&mut surface).pulse_freq, 2440.0, epsilon = 1e-9);
        p.process(&datagram(vec![FLOOR; 128], 1350), false);
        assert!(p.render(&mut surface).pulse_freq.is_nan());
    }

    #[test]
    fn test_malformed_datagram_changes_nothing() {
        let mut p = Pipeline::new(4);
        p.process(&datagram(peak_bins(), 1000), false);

        let mut bad = datagram(peak_bins(), 1010);
        bad[0] = 0;
        assert!(p.process(&bad, false).is_none());
        assert!(p.process(&[0u8; 10], false).is_none());

        assert_eq!(p.counters(), (1, 2));
        assert_eq!(p.window().len(), 1);
        assert_eq!(p.ring().len(), 1);
        assert_eq!(p.tracker().pulses()[0].count, 1);
    }

    #[test]
    fn test_render_drains_and_reports() {
        let mut p = Pipeline::new(4);
        for t in 0..6 {
            p.process(&datagram(vec![FLOOR; 64], t * 100), false);
        }

        let mut surface = PlotSurface::new(256, 4);
        let status = p.render(&mut surface);
        assert_eq!(status.rows, 4);
        assert_eq!(status.center_freq, 2440);
        assert_eq!(status.span_width, 40);
        assert!(status.bluetooth_power.is_nan());
        // height 4: quartile rows are 1, 2 and 3 rows older
        assert_eq!(status.elapsed, [Some(100), Some(200), Some(300)]);
        assert!((status.center_pos - 0.5).abs() < 1e-6);
        assert_eq!(surface.line(0)[0], sa_output::waterfall::power_color(FLOOR));

        let status = p.render(&mut surface);
        assert_eq!(status.rows, 0);
    }

    #[test]
    fn test_display_height_change_clears() {
        let mut p = Pipeline::new(4);
        p.process(&datagram(vec![FLOOR; 8], 0), false);
        p.set_display_height(4);
        assert_eq!(p.ring().len(), 1);
        p.set_display_height(2);
        assert_eq!(p.ring().len(), 0);
        assert_eq!(p.ring().capacity(), 2);
    }

    #[test]
    fn test_overlay_marks_candidates() {
        let mut p = Pipeline::new(2);
        p.process(&datagram(peak_bins(), 1000), true);
        let mut surface = PlotSurface::new(256, 2);
        p.render(&mut surface);

        let line = surface.line(0);
        assert_eq!(line[128], sa_output::waterfall::candidate_color(-80));
        assert_eq!(line[10], sa_output::waterfall::power_color(FLOOR));
    }

    #[test]
    fn test_json_status_nan_is_null() {
        let mut p = Pipeline::new(0);
        let mut surface = PlotSurface::new(8, 1);
        let status = p.render(&mut surface);
        let json = serde_json::to_value(&status).unwrap();
        assert!(json["bluetooth_power"].is_null());
        assert_eq!(json["span_width"], 40);
    }
}
