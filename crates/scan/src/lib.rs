// Copyright 2025-2026 CEMAXECUTER LLC

pub mod file;
pub mod memory;
pub mod parser;
#[cfg(unix)]
pub mod unix;

use std::sync::atomic::AtomicBool;

use crossbeam::channel::Sender;

pub use parser::{parse, ScanError};

/// Largest bin count a scan may declare.
pub const MAX_NUM_BINS: usize = 512;

/// Frequency span (MHz) covered by the full bin range of one scan.
pub const SPAN_WIDTH_MHZ: u32 = 40;

/// Receive buffer size for one raw datagram.
pub const MAX_DATAGRAM_LEN: usize = 1216;

/// One decoded power-spectrum snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSample {
    /// Per-bin power in dB, at most `MAX_NUM_BINS` entries
    pub bins: Vec<i8>,
    /// Center frequency in MHz
    pub center_freq: u16,
    /// Chipset timestamp
    pub timestamp: i32,
}

impl ScanSample {
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Whether `other` was taken with the same bin layout and tuning.
    pub fn same_layout(&self, other: &ScanSample) -> bool {
        self.bins.len() == other.bins.len() && self.center_freq == other.center_freq
    }
}

/// Raw, undecoded scan datagram.
pub type Datagram = Vec<u8>;

/// Common trait for everything that delivers raw scan datagrams.
pub trait ScanSource: Send {
    /// Stream datagrams into the channel until `running` is cleared, the
    /// receiver goes away, or the source is exhausted.
    fn start(&mut self, tx: Sender<Datagram>, running: &AtomicBool) -> Result<(), String>;

    /// Short human readable description for logs.
    fn describe(&self) -> String;
}
