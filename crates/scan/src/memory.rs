// Copyright 2025-2026 CEMAXECUTER LLC

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::Sender;

use crate::{Datagram, ScanSource};

/// In-memory datagram source, delivers a fixed list once.
pub struct MemorySource {
    datagrams: Vec<Datagram>,
}

impl MemorySource {
    pub fn new(datagrams: Vec<Datagram>) -> Self {
        Self { datagrams }
    }
}

impl ScanSource for MemorySource {
    fn start(&mut self, tx: Sender<Datagram>, running: &AtomicBool) -> Result<(), String> {
        for datagram in self.datagrams.drain(..) {
            if !running.load(Ordering::Relaxed) || tx.send(datagram).is_err() {
                break;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory ({} datagrams)", self.datagrams.len())
    }
}
