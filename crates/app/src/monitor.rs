// Copyright 2025-2026 CEMAXECUTER LLC

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;

use sa_output::PlotSurface;
use sa_scan::{Datagram, ScanSource};

use crate::pipeline::{Pipeline, RenderStatus};

/// Datagrams buffered between the source and the analysis thread.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Waterfall rows kept between renders
    pub display_height: usize,
    /// Paint pulses over the waterfall
    pub overlay: bool,
    pub queue_depth: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            display_height: 0,
            overlay: false,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// Owns the analysis state and the threads feeding it.
///
/// A source thread pushes raw datagrams into a bounded channel; the
/// analysis thread drains it and updates the shared [`Pipeline`]. The
/// display side calls [`SpectralMonitor::render`] at its own pace.
pub struct SpectralMonitor {
    pipeline: Arc<Mutex<Pipeline>>,
    running: Arc<AtomicBool>,
    overlay: Arc<AtomicBool>,
    display_height: usize,
    queue_depth: usize,
    shutdown_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

fn lock(pipeline: &Mutex<Pipeline>) -> MutexGuard<'_, Pipeline> {
    pipeline.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SpectralMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(Pipeline::new(0))),
            running: Arc::new(AtomicBool::new(false)),
            overlay: Arc::new(AtomicBool::new(config.overlay)),
            display_height: config.display_height,
            queue_depth: config.queue_depth.max(1),
            shutdown_tx: None,
            worker: None,
            reader: None,
        }
    }

    /// Start consuming `source` with fresh analysis state.
    ///
    /// Does nothing if already running. On failure no thread is left
    /// behind and the monitor stays stopped.
    pub fn start<S: ScanSource + 'static>(&mut self, mut source: S) -> Result<(), String> {
        if self.is_running() {
            log::debug!("monitor already running, ignoring start");
            return Ok(());
        }
        // A previous source may have run out on its own
        self.stop();

        let description = source.describe();
        *lock(&self.pipeline) = Pipeline::new(self.display_height);
        self.running.store(true, Ordering::SeqCst);

        let (tx, rx) = channel::bounded::<Datagram>(self.queue_depth);
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);

        let pipeline = self.pipeline.clone();
        let running = self.running.clone();
        let overlay = self.overlay.clone();
        let worker = thread::Builder::new()
            .name("scan-analysis".to_string())
            .spawn(move || analysis_loop(rx, shutdown_rx, &pipeline, &running, &overlay));
        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(format!("analysis thread: {}", e));
            }
        };

        let running = self.running.clone();
        let reader = thread::Builder::new()
            .name("scan-source".to_string())
            .spawn(move || {
                if let Err(e) = source.start(tx, &running) {
                    log::error!("scan source error: {}", e);
                }
                log::info!("scan source thread exiting");
            });
        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                drop(shutdown_tx);
                let _ = worker.join();
                *lock(&self.pipeline) = Pipeline::new(0);
                return Err(format!("source thread: {}", e));
            }
        };

        log::info!("monitor started on {}", description);
        self.shutdown_tx = Some(shutdown_tx);
        self.worker = Some(worker);
        self.reader = Some(reader);
        Ok(())
    }

    /// Stop both threads and release the waterfall buffer. Does nothing if
    /// not running.
    pub fn stop(&mut self) {
        if self.worker.is_none() && self.reader.is_none() {
            return;
        }

        self.running.store(false, Ordering::SeqCst);
        // Disconnecting wakes the analysis thread even with an idle source
        drop(self.shutdown_tx.take());

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("analysis thread panicked");
            }
        }
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                log::error!("source thread panicked");
            }
        }

        let mut pipeline = lock(&self.pipeline);
        let (rounds, dropped) = pipeline.counters();
        pipeline.set_display_height(0);
        log::info!("monitor stopped: {} scans, {} dropped", rounds, dropped);
    }

    /// False once stopped, and also once the analysis thread has finished
    /// an exhausted source.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// True once the source is exhausted and every queued datagram has been
    /// analysed. Stays false while stopped.
    pub fn is_drained(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_finished())
    }

    /// Takes effect from the next processed datagram.
    pub fn set_overlay(&self, enabled: bool) {
        self.overlay.store(enabled, Ordering::Relaxed);
    }

    pub fn overlay(&self) -> bool {
        self.overlay.load(Ordering::Relaxed)
    }

    /// Resize the waterfall buffer. Buffered rows are discarded unless the
    /// height is unchanged. While stopped, applies from the next start.
    pub fn set_display_height(&mut self, rows: usize) {
        self.display_height = rows;
        if self.worker.is_some() {
            lock(&self.pipeline).set_display_height(rows);
        }
    }

    pub fn display_height(&self) -> usize {
        self.display_height
    }

    /// Drain buffered rows into `surface`. Safe to call concurrently with
    /// analysis; the analysis thread waits while this runs.
    pub fn render(&self, surface: &mut PlotSurface) -> RenderStatus {
        lock(&self.pipeline).render(surface)
    }

    /// Run `f` against the current analysis state.
    pub fn with_pipeline<R>(&self, f: impl FnOnce(&Pipeline) -> R) -> R {
        f(&lock(&self.pipeline))
    }
}

impl Drop for SpectralMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn analysis_loop(
    rx: Receiver<Datagram>,
    shutdown_rx: Receiver<()>,
    pipeline: &Mutex<Pipeline>,
    running: &AtomicBool,
    overlay: &AtomicBool,
) {
    loop {
        let datagram = select! {
            recv(rx) -> msg => match msg {
                Ok(d) => d,
                Err(_) => {
                    log::info!("scan source exhausted");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => break,
        };
        if !running.load(Ordering::SeqCst) {
            break;
        }
        lock(pipeline).process(&datagram, overlay.load(Ordering::Relaxed));
    }
    running.store(false, Ordering::SeqCst);
    log::debug!("analysis thread exiting");
}
