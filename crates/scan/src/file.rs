// Copyright 2025-2026 CEMAXECUTER LLC

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crossbeam::channel::Sender;

use crate::{Datagram, ScanSource, MAX_DATAGRAM_LEN};

/// Capture file reader: replays recorded scan datagrams.
///
/// Each record is a little-endian `u32` length followed by that many bytes
/// of the raw datagram.
pub struct FileSource {
    path: String,
    reader: BufReader<File>,
    /// Delay between records, zero replays as fast as the consumer allows
    pace: Duration,
}

impl FileSource {
    /// Open a capture for replay. Fails here, not in `start`, when the file
    /// can't be read.
    pub fn open(path: impl Into<String>) -> Result<Self, String> {
        let path = path.into();
        let file = File::open(Path::new(&path)).map_err(|e| format!("failed to open {}: {}", path, e))?;
        Ok(Self {
            path,
            reader: BufReader::new(file),
            pace: Duration::ZERO,
        })
    }

    pub fn set_pace(&mut self, pace: Duration) {
        self.pace = pace;
    }

    /// Read one record. `Ok(None)` at a clean end of file.
    fn read_record<R: Read>(reader: &mut R) -> io::Result<Option<Datagram>> {
        let len = match reader.read_u32::<LittleEndian>() {
            Ok(len) => len as usize,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        };
        if len > MAX_DATAGRAM_LEN {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("record of {} bytes exceeds {}", len, MAX_DATAGRAM_LEN),
            ));
        }
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        Ok(Some(buf))
    }
}

/// Append one datagram to a capture stream in the [`FileSource`] format.
pub fn write_record<W: Write>(w: &mut W, datagram: &[u8]) -> io::Result<()> {
    w.write_u32::<LittleEndian>(datagram.len() as u32)?;
    w.write_all(datagram)
}

impl ScanSource for FileSource {
    fn start(&mut self, tx: Sender<Datagram>, running: &AtomicBool) -> Result<(), String> {
        log::info!("replaying scans from {}", self.path);

        let mut count = 0u64;
        while running.load(Ordering::Relaxed) {
            match Self::read_record(&mut self.reader) {
                Ok(Some(datagram)) => {
                    if tx.send(datagram).is_err() {
                        break; // receiver dropped
                    }
                    count += 1;
                    if !self.pace.is_zero() {
                        thread::sleep(self.pace);
                    }
                }
                Ok(None) => {
                    log::info!("end of file: {} ({} records)", self.path, count);
                    break;
                }
                Err(e) => {
                    return Err(format!("read error in {}: {}", self.path, e));
                }
            }
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path)
    }
}
