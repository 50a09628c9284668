// Copyright 2025-2026 CEMAXECUTER LLC

//! Spectral scan datagram layout (little-endian):
//!
//! | offset    | field                      |
//! |-----------|----------------------------|
//! | [0, 4)    | magic `0xDEADBEEF`         |
//! | [4, 6)    | center frequency, u16 MHz  |
//! | [44, 48)  | timestamp, i32             |
//! | [87, 89)  | bin count, u16             |
//! | [93, ..)  | `bin count` x i8 power     |

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::{ScanSample, MAX_NUM_BINS};

pub const SCAN_MAGIC: u32 = 0xDEAD_BEEF;
pub const HEADER_LEN: usize = 93;

const MAGIC_OFFSET: usize = 0;
const CENTER_FREQ_OFFSET: usize = 4;
const TIMESTAMP_OFFSET: usize = 44;
const BIN_COUNT_OFFSET: usize = 87;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("datagram too short: {0} bytes")]
    TooShort(usize),

    #[error("bad magic 0x{0:08x}")]
    BadMagic(u32),

    #[error("bin count {0} exceeds 512")]
    TooManyBins(usize),

    #[error("datagram truncated: {declared} bins declared, {available} available")]
    Truncated { declared: usize, available: usize },
}

/// Decode one raw datagram.
pub fn parse(buf: &[u8]) -> Result<ScanSample, ScanError> {
    if buf.len() < HEADER_LEN {
        return Err(ScanError::TooShort(buf.len()));
    }

    let magic = LittleEndian::read_u32(&buf[MAGIC_OFFSET..MAGIC_OFFSET + 4]);
    if magic != SCAN_MAGIC {
        return Err(ScanError::BadMagic(magic));
    }

    let bin_count = LittleEndian::read_u16(&buf[BIN_COUNT_OFFSET..BIN_COUNT_OFFSET + 2]) as usize;
    if bin_count > MAX_NUM_BINS {
        return Err(ScanError::TooManyBins(bin_count));
    }
    let available = buf.len() - HEADER_LEN;
    if bin_count > available {
        return Err(ScanError::Truncated { declared: bin_count, available });
    }

    let center_freq = LittleEndian::read_u16(&buf[CENTER_FREQ_OFFSET..CENTER_FREQ_OFFSET + 2]);
    let timestamp = LittleEndian::read_i32(&buf[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4]);
    let bins = buf[HEADER_LEN..HEADER_LEN + bin_count]
        .iter()
        .map(|&b| b as i8)
        .collect();

    Ok(ScanSample { bins, center_freq, timestamp })
}

impl ScanSample {
    /// Encode into the datagram layout understood by [`parse`].
    /// Unused header bytes are zero.
    pub fn to_datagram(&self) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN + self.bins.len()];
        LittleEndian::write_u32(&mut buf[MAGIC_OFFSET..], SCAN_MAGIC);
        LittleEndian::write_u16(&mut buf[CENTER_FREQ_OFFSET..], self.center_freq);
        LittleEndian::write_i32(&mut buf[TIMESTAMP_OFFSET..], self.timestamp);
        LittleEndian::write_u16(&mut buf[BIN_COUNT_OFFSET..], self.bins.len() as u16);
        for (dst, &p) in buf[HEADER_LEN..].iter_mut().zip(&self.bins) {
            *dst = p as u8;
        }
        buf
    }
}
