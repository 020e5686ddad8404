//! smokealert: smoker and food probe alerts over per-sensor streams.
//!
//! One producer fans a multi-column temperature log out to three streams on
//! an MQTT broker; one detector process per stream watches for trouble.
//!
//! # Usage
//!
//! Start the detectors (each in its own terminal):
//! ```sh
//! smokealert listen --stream smoker
//! smokealert listen --stream food-a
//! smokealert listen --stream food-b --format json
//! ```
//!
//! Feed them a log, one row every 500 ms:
//! ```sh
//! smokealert produce --input data/smoker-temps.csv --delay-ms 500
//! ```
//!
//! Or run the whole pipeline in one process without a broker:
//! ```sh
//! smokealert replay --input data/smoker-temps.csv
//! ```

mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use smokealert_connectors::{MqttChannel, MqttConfig};
use smokealert_core::constants::{
    DEFAULT_POLL_INTERVAL_MS, FOOD_STALL_MAX_SPREAD_DEG, SMOKER_DROP_THRESHOLD_DEG,
};
use smokealert_core::events::DetectorKind;
use smokealert_core::stream::CsvStream;
use smokealert_core::{
    AlertDetector, ConsumerStats, DeliveryChannel, DropDetector, DropRule, MemoryBroker,
    SensorStream, StallDetector, StallRule, StreamConsumer, StreamRouter,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use output::{AlertPrinter, OutputFormat};

/// Temperature alerts for a smoker and two food probes.
#[derive(Parser, Debug)]
#[command(name = "smokealert")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish a CSV temperature log to the per-sensor streams
    Produce {
        #[command(flatten)]
        broker: BrokerArgs,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Watch one sensor stream and print alerts
    Listen {
        #[command(flatten)]
        broker: BrokerArgs,

        /// Stream to watch
        #[arg(long, short = 's', value_enum)]
        stream: StreamArg,

        #[command(flatten)]
        detect: DetectArgs,
    },

    /// Route a CSV log through an in-process broker to all three detectors
    Replay {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        detect: DetectArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct BrokerArgs {
    /// MQTT broker host
    #[arg(long, env = "SMOKEALERT_BROKER_HOST", default_value = "localhost")]
    broker_host: String,

    /// MQTT broker port
    #[arg(long, env = "SMOKEALERT_BROKER_PORT", default_value = "1883")]
    broker_port: u16,

    /// MQTT client id; names the broker session, so keep it stable
    #[arg(long, env = "SMOKEALERT_CLIENT_ID")]
    client_id: Option<String>,

    /// Topic prefix for stream names
    #[arg(long, default_value = "smokealert/")]
    topic_prefix: String,
}

impl BrokerArgs {
    fn config(&self, default_client_id: &str) -> MqttConfig {
        let client_id = self.client_id.clone().unwrap_or_else(|| default_client_id.to_string());
        MqttConfig::new(self.broker_host.clone(), self.broker_port, client_id)
            .with_topic_prefix(self.topic_prefix.clone())
    }
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// CSV file: timestamp, smoker, food A, food B (header row skipped)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Pause between records in milliseconds
    #[arg(long, default_value = "0")]
    delay_ms: u64,
}

#[derive(Args, Debug, Clone)]
struct DetectArgs {
    /// Smoker alert fires when the window drops by more than this
    #[arg(long, default_value_t = SMOKER_DROP_THRESHOLD_DEG)]
    drop_threshold: f64,

    /// Food alert fires when the window spread is at most this
    #[arg(long, default_value_t = FOOD_STALL_MAX_SPREAD_DEG)]
    stall_spread: f64,

    /// Alert output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Milliseconds between checks for an interrupt while idle
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StreamArg {
    Smoker,
    FoodA,
    FoodB,
}

impl From<StreamArg> for SensorStream {
    fn from(arg: StreamArg) -> Self {
        match arg {
            StreamArg::Smoker => SensorStream::Smoker,
            StreamArg::FoodA => SensorStream::FoodA,
            StreamArg::FoodB => SensorStream::FoodB,
        }
    }
}

/// Set the returned flag on Ctrl+C instead of killing the process.
fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;

    thread::Builder::new()
        .name("signal".into())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Received Ctrl+C, shutting down");
                        flag.store(true, Ordering::Relaxed);
                    }
                    Err(e) => warn!("Cannot listen for Ctrl+C: {}", e),
                }
            })
        })
        .context("Failed to spawn signal thread")?;

    Ok(stop)
}

fn open_source(path: &Path) -> Result<CsvStream> {
    CsvStream::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn run_produce(broker: &BrokerArgs, source: &SourceArgs) -> Result<()> {
    let config = broker.config("smokealert-producer");
    let mut csv = open_source(&source.input)?;

    info!("Connecting to MQTT broker at {}:{}", config.host, config.port);
    let channel = MqttChannel::connect(&config).context("Failed to connect to broker")?;

    let stop = interrupt_flag()?;
    let mut router =
        StreamRouter::new(channel).with_record_delay(Duration::from_millis(source.delay_ms));

    let stats = router.run_until(&mut csv, &stop).context("Routing failed")?;
    let skipped = csv.stats().parse_errors;

    let mut channel = router.into_channel();
    channel.close().context("Broker did not confirm every message")?;

    info!("Produce complete: {}", stats);
    if skipped > 0 {
        warn!("{} rows could not be decoded and were skipped", skipped);
    }
    Ok(())
}

fn detect<C, D>(
    channel: &mut C,
    stream: SensorStream,
    detector: D,
    args: &DetectArgs,
    stop: &AtomicBool,
) -> Result<ConsumerStats>
where
    C: DeliveryChannel,
    C::Error: std::error::Error + Send + Sync + 'static,
    D: AlertDetector,
{
    let mut consumer = StreamConsumer::new(stream.queue_name(), detector, AlertPrinter::new(args.format))
        .with_poll_interval(Duration::from_millis(args.poll_ms));

    consumer
        .run(channel, stop)
        .with_context(|| format!("{} consumer stopped on a transport failure", stream))
}

/// Build the detector for `stream` and run it on `channel`.
fn run_detector<C>(
    channel: &mut C,
    stream: SensorStream,
    args: &DetectArgs,
    stop: &AtomicBool,
) -> Result<ConsumerStats>
where
    C: DeliveryChannel,
    C::Error: std::error::Error + Send + Sync + 'static,
{
    match stream.detector_kind() {
        DetectorKind::Drop => {
            let detector = DropDetector::new(stream.label(), DropRule::with_threshold(args.drop_threshold));
            detect(channel, stream, detector, args, stop)
        }
        DetectorKind::Stall => {
            let detector = StallDetector::new(stream.label(), StallRule::with_max_spread(args.stall_spread));
            detect(channel, stream, detector, args, stop)
        }
    }
}

fn run_listen(broker: &BrokerArgs, stream: SensorStream, args: &DetectArgs) -> Result<()> {
    let config = broker.config(&format!("smokealert-{}", stream.queue_name()));

    info!("Connecting to MQTT broker at {}:{}", config.host, config.port);
    let mut channel = MqttChannel::connect(&config).context("Failed to connect to broker")?;

    let stop = interrupt_flag()?;
    info!("Watching {} ({}). Press Ctrl+C to stop.", stream.label(), stream);

    let stats = run_detector(&mut channel, stream, args, &stop)?;
    info!("{} detector stopped: {}", stream.label(), stats);
    Ok(())
}

fn spawn_detector(
    broker: &MemoryBroker,
    stream: SensorStream,
    args: &DetectArgs,
    stop: &Arc<AtomicBool>,
) -> Result<JoinHandle<Result<ConsumerStats>>> {
    let mut channel = broker.channel();
    let args = args.clone();
    let stop = Arc::clone(stop);

    thread::Builder::new()
        .name(stream.queue_name().to_string())
        .spawn(move || run_detector(&mut channel, stream, &args, &stop))
        .with_context(|| format!("Failed to spawn {} detector", stream))
}

/// Wait for the detectors to empty every queue
///
/// Gives up when `stop` is set or a detector thread has already exited,
/// since its queue would never drain. Returns whether the broker drained.
fn await_drain<T>(
    broker: &MemoryBroker,
    stop: &AtomicBool,
    detectors: &[(SensorStream, JoinHandle<T>)],
    poll: Duration,
) -> Result<bool> {
    loop {
        if stop.load(Ordering::Relaxed) {
            return Ok(false);
        }
        if let Some((stream, _)) = detectors.iter().find(|(_, handle)| handle.is_finished()) {
            warn!("{} detector exited before its stream drained", stream.label());
            return Ok(false);
        }
        if broker.wait_drained(poll)? {
            return Ok(true);
        }
    }
}

fn run_replay(source: &SourceArgs, args: &DetectArgs) -> Result<()> {
    let mut csv = open_source(&source.input)?;
    let broker = MemoryBroker::new();
    let stop = interrupt_flag()?;

    let mut router = StreamRouter::new(broker.channel())
        .with_record_delay(Duration::from_millis(source.delay_ms));
    router.declare_streams().context("Failed to declare streams")?;

    let detectors = SensorStream::ALL
        .iter()
        .map(|&stream| spawn_detector(&broker, stream, args, &stop).map(|handle| (stream, handle)))
        .collect::<Result<Vec<_>>>()?;

    let routed = router.run_until(&mut csv, &stop).context("Routing failed");

    // Let the detectors catch up before stopping them
    if routed.is_ok() {
        await_drain(&broker, &stop, &detectors, Duration::from_millis(args.poll_ms))?;
    }
    stop.store(true, Ordering::Relaxed);

    let mut failure = None;
    for (stream, handle) in detectors {
        match handle.join().map_err(|_| anyhow!("{} detector panicked", stream))? {
            Ok(stats) => info!("{} detector: {}", stream.label(), stats),
            Err(e) => {
                error!("{:#}", e);
                failure.get_or_insert(e);
            }
        }
    }

    let stats = routed?;
    info!("Replay complete: {}", stats);
    failure.map_or(Ok(()), Err)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; also picks up `log` records from the libraries
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("smokealert v{}", env!("CARGO_PKG_VERSION"));

    let result = match &cli.command {
        Commands::Produce { broker, source } => run_produce(broker, source),
        Commands::Listen { broker, stream, detect } => run_listen(broker, (*stream).into(), detect),
        Commands::Replay { source, detect } => run_replay(source, detect),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn listen_defaults() {
        let cli = Cli::try_parse_from(["smokealert", "listen", "--stream", "food-a"]).unwrap();
        match cli.command {
            Commands::Listen { broker, stream, detect } => {
                assert_eq!(SensorStream::from(stream), SensorStream::FoodA);
                assert_eq!(broker.broker_port, 1883);
                assert_eq!(detect.stall_spread, 1.0);
                assert_eq!(detect.format, OutputFormat::Text);
                assert_eq!(
                    broker.config("smokealert-02-food-A").topic("02-food-A"),
                    "smokealert/02-food-A"
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn produce_requires_input() {
        assert!(Cli::try_parse_from(["smokealert", "produce"]).is_err());

        let cli = Cli::try_parse_from([
            "smokealert",
            "produce",
            "--input",
            "log.csv",
            "--delay-ms",
            "500",
            "--client-id",
            "pit",
        ])
        .unwrap();
        match cli.command {
            Commands::Produce { broker, source } => {
                assert_eq!(source.delay_ms, 500);
                assert_eq!(broker.config("unused").client_id, "pit");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn unknown_stream_rejected() {
        assert!(Cli::try_parse_from(["smokealert", "listen", "--stream", "food-c"]).is_err());
    }

    #[test]
    fn drain_wait_ends_when_a_detector_dies() {
        let broker = MemoryBroker::new();
        let mut producer = broker.channel();
        producer.declare("01-smoker").unwrap();
        producer.publish("01-smoker", b"t1,300").unwrap();

        let stop = AtomicBool::new(false);
        let handle = thread::spawn(|| -> Result<ConsumerStats> { Err(anyhow!("channel closed")) });
        while !handle.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        let detectors = vec![(SensorStream::Smoker, handle)];

        let drained = await_drain(&broker, &stop, &detectors, Duration::from_millis(10)).unwrap();
        assert!(!drained);
        assert_eq!(broker.queue_len("01-smoker"), Some(1));

        for (_, handle) in detectors {
            assert!(handle.join().unwrap().is_err());
        }
    }

    #[test]
    fn drain_wait_succeeds_once_queues_empty() {
        let broker = MemoryBroker::new();
        broker.channel().declare("01-smoker").unwrap();

        let stop = AtomicBool::new(false);
        let detectors: Vec<(SensorStream, JoinHandle<()>)> = Vec::new();
        assert!(await_drain(&broker, &stop, &detectors, Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn replay_end_to_end() {
        let dir = std::env::temp_dir().join(format!("smokealert-replay-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("cook.csv");

        let mut csv = String::from("Time,Smoker,Food A,Food B\n");
        for i in 0..25 {
            csv.push_str(&format!("t{},{},225,{}\n", i, 320 - 5 * i, 150 + i));
        }
        std::fs::write(&input, csv).unwrap();

        let source = SourceArgs { input, delay_ms: 0 };
        let args = DetectArgs {
            drop_threshold: SMOKER_DROP_THRESHOLD_DEG,
            stall_spread: FOOD_STALL_MAX_SPREAD_DEG,
            format: OutputFormat::Json,
            poll_ms: 10,
        };
        assert!(run_replay(&source, &args).is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
