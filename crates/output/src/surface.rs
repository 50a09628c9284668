// Copyright 2025-2026 CEMAXECUTER LLC

use serde::Serialize;

use crate::waterfall::{PlotRing, PlotRow};

/// RGB565 pixel buffer the waterfall is drawn into, row-major, row 0 at
/// the top (newest).
#[derive(Debug, Clone)]
pub struct PlotSurface {
    width: usize,
    height: usize,
    pixels: Vec<u16>,
}

impl PlotSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn line(&self, y: usize) -> &[u16] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Scroll in freshly drained rows (oldest first). The newest row ends up
    /// on line 0 and older content moves down; rows that would land below
    /// the surface are skipped.
    pub fn draw(&mut self, rows: &[PlotRow]) {
        let n = rows.len();
        if n == 0 || self.height == 0 {
            return;
        }

        if n < self.height {
            let shift = n * self.width;
            let keep = (self.height - n) * self.width;
            self.pixels.copy_within(0..keep, shift);
        }

        for (i, row) in rows.iter().enumerate() {
            let y = n - 1 - i;
            if y >= self.height {
                continue;
            }
            self.draw_line(y, row);
        }
    }

    fn draw_line(&mut self, y: usize, row: &PlotRow) {
        let width = self.width;
        let line = &mut self.pixels[y * width..(y + 1) * width];

        let bins = row.pixels.len();
        let bin_width = if bins > 0 { width / bins } else { 0 };
        let used = bin_width * bins;

        if bin_width > 0 {
            for (chunk, &pixel) in line[..used].chunks_exact_mut(bin_width).zip(&row.pixels) {
                chunk.fill(pixel);
            }
        }
        line[used..].fill(0);
    }
}

/// Overlay alignment data sampled from the ring after a drain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayMarks {
    /// Timestamps of the newest row and of the rows one, two and three
    /// quarters of the surface height older
    pub timestamps: [Option<i32>; 4],
    /// Horizontal center of the drawn area as a fraction of the width
    pub center_pos: f32,
}

impl DisplayMarks {
    pub fn unavailable() -> Self {
        Self { timestamps: [None; 4], center_pos: f32::NAN }
    }

    /// Only meaningful when the ring holds exactly one surface worth of
    /// rows.
    pub fn sample(ring: &PlotRing, surface: &PlotSurface) -> Self {
        let height = surface.height();
        if height == 0 || ring.capacity() != height {
            return Self::unavailable();
        }

        let mut marks = Self::unavailable();
        if let Some(newest) = ring.recent(0) {
            marks.timestamps[0] = Some(newest.timestamp);
            let width = surface.width();
            let bins = newest.pixels.len();
            if width > 0 && bins > 0 {
                let used = width - width % bins;
                marks.center_pos = used as f32 / 2.0 / width as f32;
            }
        }
        for q in 1..4 {
            marks.timestamps[q] = ring.recent(q * (height / 4)).map(|r| r.timestamp);
        }
        marks
    }

    /// Time from quartile row `q` (1..=3) to the newest row.
    pub fn elapsed(&self, q: usize) -> Option<i64> {
        let newest = self.timestamps[0]?;
        let older = *self.timestamps.get(q)?;
        Some(newest as i64 - older? as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pixels: Vec<u16>, timestamp: i32) -> PlotRow {
        PlotRow { pixels, timestamp }
    }

    #[test]
    fn test_draw_replicates_bins() {
        let mut s = PlotSurface::new(10, 3);
        s.draw(&[row(vec![1, 2, 3], 0)]);
        assert_eq!(s.line(0), &[1, 1, 1, 2, 2, 2, 3, 3, 3, 0]);
    }

    #[test]
    fn test_draw_newest_on_top_and_scrolls() {
        let mut s = PlotSurface::new(4, 4);
        s.draw(&[row(vec![1; 4], 0), row(vec![2; 4], 1)]);
        assert_eq!(s.line(0), &[2; 4]);
        assert_eq!(s.line(1), &[1; 4]);
        assert_eq!(s.line(2), &[0; 4]);

        s.draw(&[row(vec![3; 4], 2)]);
        assert_eq!(s.line(0), &[3; 4]);
        assert_eq!(s.line(1), &[2; 4]);
        assert_eq!(s.line(2), &[1; 4]);
    }

    #[test]
    fn test_draw_more_rows_than_height() {
        let mut s = PlotSurface::new(2, 2);
        let rows: Vec<PlotRow> = (0..5).map(|t| row(vec![t as u16; 2], t)).collect();
        s.draw(&rows);
        assert_eq!(s.line(0), &[4, 4]);
        assert_eq!(s.line(1), &[3, 3]);
    }

    #[test]
    fn test_draw_bins_wider_than_surface() {
        let mut s = PlotSurface::new(4, 1);
        s.draw(&[row(vec![7; 8], 0)]);
        assert_eq!(s.line(0), &[0; 4]);
        s.draw(&[row(vec![], 0)]);
        assert_eq!(s.line(0), &[0; 4]);
    }

    #[test]
    fn test_marks_at_full_height() {
        let mut ring = PlotRing::new(8);
        for t in 0..8 {
            ring.push(row(vec![1; 3], t * 10));
        }
        ring.drain();

        let surface = PlotSurface::new(100, 8);
        let marks = DisplayMarks::sample(&ring, &surface);
        assert_eq!(marks.timestamps, [Some(70), Some(50), Some(30), Some(10)]);
        assert_eq!(marks.elapsed(1), Some(20));
        assert_eq!(marks.elapsed(3), Some(60));
        // 100 - 100 % 3 = 99 pixels used
        assert!((marks.center_pos - 0.495).abs() < 1e-6);
    }

    #[test]
    fn test_marks_need_matching_height() {
        let mut ring = PlotRing::new(8);
        ring.push(row(vec![1; 3], 5));
        let marks = DisplayMarks::sample(&ring, &PlotSurface::new(100, 6));
        assert_eq!(marks.timestamps, [None; 4]);
        assert!(marks.center_pos.is_nan());

        let marks = DisplayMarks::sample(&ring, &PlotSurface::new(100, 8));
        assert_eq!(marks.timestamps, [Some(5), None, None, None]);
        assert_eq!(marks.elapsed(1), None);
    }
}
