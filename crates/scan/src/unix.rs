// Copyright 2025-2026 CEMAXECUTER LLC

use std::io::ErrorKind;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::channel::Sender;

use crate::{Datagram, ScanSource, MAX_DATAGRAM_LEN};

/// How long a receive may block before the running flag is re-checked.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Local datagram socket fed by the spectral scan controller.
/// The socket file is removed again when the source is dropped.
pub struct UnixDatagramSource {
    socket: UnixDatagram,
    path: PathBuf,
}

impl UnixDatagramSource {
    /// Bind a datagram socket at `path`.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref().to_path_buf();
        let socket = UnixDatagram::bind(&path)
            .map_err(|e| format!("failed to bind {}: {}", path.display(), e))?;

        // From here on Drop unlinks the path if anything below fails.
        let source = Self { socket, path };
        source
            .socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .map_err(|e| format!("set_read_timeout: {}", e))?;

        log::info!("listening for scans on {}", source.path.display());
        Ok(source)
    }
}

impl ScanSource for UnixDatagramSource {
    fn start(&mut self, tx: Sender<Datagram>, running: &AtomicBool) -> Result<(), String> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];

        while running.load(Ordering::Relaxed) {
            let len = match self.socket.recv(&mut buf) {
                Ok(len) => len,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => continue,
                Err(ref e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(format!("recv on {}: {}", self.path.display(), e)),
            };

            if tx.send(buf[..len].to_vec()).is_err() {
                break; // receiver dropped
            }
        }

        Ok(())
    }

    fn describe(&self) -> String {
        format!("socket {}", self.path.display())
    }
}

impl Drop for UnixDatagramSource {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("can't unlink socket {}: {}", self.path.display(), e);
        }
    }
}
