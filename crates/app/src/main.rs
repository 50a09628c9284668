use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;

use sa_app::pipeline::RenderStatus;
use sa_app::{MonitorConfig, SpectralMonitor};
use sa_output::PlotSurface;
use sa_scan::file::FileSource;
use sa_scan::ScanSource;

#[derive(Parser, Debug)]
#[command(name = "spectral-monitor")]
#[command(about = "2.4 GHz interference monitor fed by spectral scan datagrams")]
struct Cli {
    /// Unix datagram socket to bind and receive scans on
    #[arg(short = 's', long, conflicts_with = "file")]
    socket: Option<PathBuf>,

    /// Replay a recorded capture of length-prefixed datagrams
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Delay between replayed datagrams in microseconds
    #[arg(long, default_value = "0")]
    pace_us: u64,

    /// Waterfall width in pixels
    #[arg(long, default_value = "512")]
    width: usize,

    /// Waterfall height in rows (0 disables the waterfall)
    #[arg(long, default_value = "256")]
    height: usize,

    /// Paint detected pulses over the waterfall
    #[arg(long)]
    overlay: bool,

    /// Render interval in milliseconds
    #[arg(short = 'i', long, default_value = "500")]
    interval_ms: u64,

    /// Print each status as a JSON line on stdout
    #[arg(long)]
    json: bool,

    /// Stop after this many seconds
    #[arg(short = 'd', long)]
    duration: Option<u64>,

    /// Log at info level unless RUST_LOG says otherwise
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG still wins; -v only changes the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level())).init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let mut monitor = SpectralMonitor::new(MonitorConfig {
        display_height: cli.height,
        overlay: cli.overlay,
        ..MonitorConfig::default()
    });

    if let Some(ref file) = cli.file {
        let mut source = FileSource::open(file.to_string_lossy().to_string())?;
        source.set_pace(Duration::from_micros(cli.pace_us));
        start(&mut monitor, source)?;
    } else if let Some(ref socket) = cli.socket {
        start(&mut monitor, bind_socket(socket)?)?;
    } else {
        return Err("no input specified. Use -s <socket> or -f <capture>".to_string());
    }

    let mut surface = PlotSurface::new(cli.width, cli.height);
    let interval = Duration::from_millis(cli.interval_ms.max(1));
    let deadline = cli.duration.map(|secs| Instant::now() + Duration::from_secs(secs));

    loop {
        std::thread::sleep(interval);
        // Sample before rendering so the last rows of a replay are not lost
        let drained = monitor.is_drained();
        report(&monitor.render(&mut surface), cli.json)?;

        if drained {
            log::info!("input exhausted");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
    }

    monitor.stop();
    Ok(())
}

fn start<S: ScanSource + 'static>(monitor: &mut SpectralMonitor, source: S) -> Result<(), String> {
    log::info!("spectral-monitor starting on {}", source.describe());
    monitor.start(source)
}

#[cfg(unix)]
fn bind_socket(path: &std::path::Path) -> Result<sa_scan::unix::UnixDatagramSource, String> {
    sa_scan::unix::UnixDatagramSource::bind(path)
}

#[cfg(not(unix))]
fn bind_socket(_path: &std::path::Path) -> Result<FileSource, String> {
    Err("datagram sockets need a unix platform".to_string())
}

fn report(status: &RenderStatus, json: bool) -> Result<(), String> {
    if json {
        let line = serde_json::to_string(status).map_err(|e| format!("status encode: {}", e))?;
        println!("{}", line);
        return Ok(());
    }

    let elapsed: Vec<String> = status
        .elapsed
        .iter()
        .map(|e| e.map_or_else(|| "-".to_string(), |t| t.to_string()))
        .collect();
    eprintln!(
        "{} MHz ±{}: rows {} BT power {:.1} dB pulse {:.1} MHz zigbee {} marks [{}]",
        status.center_freq,
        status.span_width / 2,
        status.rows,
        status.bluetooth_power,
        status.pulse_freq,
        status.zigbee.len(),
        elapsed.join(" "),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_log_level() {
        let cli = Cli::try_parse_from(["spectral-monitor", "-f", "capture.bin"]).unwrap();
        assert_eq!(cli.log_level(), "warn");

        let cli = Cli::try_parse_from(["spectral-monitor", "-v", "-f", "capture.bin"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_socket_and_file_conflict() {
        assert!(Cli::try_parse_from(["spectral-monitor", "-s", "a.sock", "-f", "b.bin"]).is_err());
    }

    #[test]
    fn test_missing_capture_is_an_error() {
        let cli = Cli::try_parse_from(["spectral-monitor", "-f", "/nonexistent/capture.bin"]).unwrap();
        let err = run(&cli).unwrap_err();
        assert!(err.contains("failed to open"));
    }
}
