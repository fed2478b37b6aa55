use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use player_bridge_control::{check_percentage, Dispatcher};
use player_bridge_core::{AppConfig, Snapshot};
use player_bridge_engine::{ChangeNotifier, NotifierAction};
use player_bridge_providers::{build_snapshot, SessionBus};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "player-bridge",
    about = "MPRIS players on the session bus -> JSON for a desktop shell",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the current players once
    Get,
    /// Print the players every time their state changes
    Listen {
        /// Poll interval in milliseconds, overriding the config file
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Toggle play/pause
    PlayPause { player_id: Option<String> },
    /// Seek to an absolute position: [player_id] <usecs>
    SetPosition {
        #[arg(value_name = "ARGS", num_args = 1..=2, required = true, allow_negative_numbers = true)]
        args: Vec<String>,
    },
    /// Seek to a percentage of the track: [player_id] <percent>
    SetPositionPercent {
        #[arg(value_name = "ARGS", num_args = 1..=2, required = true, allow_negative_numbers = true)]
        args: Vec<String>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("player-bridge: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Config {
            action: ConfigAction::Init,
        } => {
            init_config(&cfg_path)?;
            eprintln!("Initialized config at {}", cfg_path.display());
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let cfg = load_or_default(&cfg_path)?;
            init_logging(&cfg.log_level);
            run(command, &cfg).await
        }
    }
}

/// A command with its arguments parsed and checked, ready to touch the bus.
#[derive(Debug, PartialEq)]
enum Request {
    Get,
    Listen(Duration),
    PlayPause(Option<String>),
    Seek { player: Option<String>, usecs: i64 },
    SeekPercent { player: Option<String>, percent: f64 },
}

fn plan(command: Commands, cfg: &AppConfig) -> Result<Request> {
    let request = match command {
        Commands::Get => Request::Get,
        Commands::Listen { interval_ms } => Request::Listen(
            interval_ms
                .map(|ms| Duration::from_millis(ms.max(cfg.intervals.min_poll_ms)))
                .unwrap_or_else(|| cfg.intervals.poll_interval()),
        ),
        Commands::PlayPause { player_id } => Request::PlayPause(player_id),
        Commands::SetPosition { args } => {
            let (player, raw) = split_target(&args)?;
            let usecs: i64 = raw
                .parse()
                .with_context(|| format!("invalid position in microseconds: {raw}"))?;
            Request::Seek {
                player: player.map(str::to_string),
                usecs,
            }
        }
        Commands::SetPositionPercent { args } => {
            let (player, raw) = split_target(&args)?;
            let percent: f64 = raw
                .parse()
                .with_context(|| format!("invalid percentage: {raw}"))?;
            check_percentage(percent)?;
            Request::SeekPercent {
                player: player.map(str::to_string),
                percent,
            }
        }
        Commands::Config { .. } => bail!("config commands do not touch the bus"),
    };
    Ok(request)
}

async fn run(command: Commands, cfg: &AppConfig) -> Result<ExitCode> {
    let request = plan(command, cfg)?;

    let bus = SessionBus::connect().await?;
    let dispatcher = Dispatcher::new(&bus);

    let outcome = match request {
        Request::Get => {
            get(&bus).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Request::Listen(interval) => {
            listen(&bus, interval).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Request::PlayPause(player) => dispatcher.play_pause(player.as_deref()).await,
        Request::Seek { player, usecs } => dispatcher.seek_to(player.as_deref(), usecs).await,
        Request::SeekPercent { player, percent } => {
            dispatcher.seek_to_percent(player.as_deref(), percent).await
        }
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            error!(error = %err, "command failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn get(bus: &SessionBus) -> Result<()> {
    let wire = build_snapshot(bus).await.to_wire()?;
    emit(&wire)
}

async fn listen(bus: &SessionBus, interval: Duration) -> Result<()> {
    // Registered before the first tick so no SIGINT falls between polls.
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    info!(interval_ms = interval.as_millis() as u64, "listening for player changes");

    let ticks = poll_loop(interval, || build_snapshot(bus), emit, async move {
        interrupt.recv().await;
    })
    .await?;

    info!(ticks, "received ctrl-c; shutting down");
    Ok(())
}

/// Polls `snapshot` on a fixed cadence and hands every change to `sink`
/// until `shutdown` resolves. Shutdown wins over both the wait and an
/// in-flight snapshot. Returns the number of completed ticks.
async fn poll_loop<S, Fut, E, D>(
    interval: Duration,
    mut snapshot: S,
    mut sink: E,
    shutdown: D,
) -> Result<u64>
where
    S: FnMut() -> Fut,
    Fut: Future<Output = Snapshot>,
    E: FnMut(&str) -> Result<()>,
    D: Future<Output = ()>,
{
    let mut notifier = ChangeNotifier::new(interval);
    let mut next_poll_in = Duration::from_secs(0);
    let mut ticks = 0;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(next_poll_in) => {}
        }

        let current = tokio::select! {
            _ = &mut shutdown => break,
            current = snapshot() => current,
        };

        let out = notifier.tick(&current);
        next_poll_in = out.next_poll_in;
        ticks += 1;

        if let NotifierAction::Emit(wire) = out.action {
            sink(&wire)?;
        }
    }

    Ok(ticks)
}

fn emit(wire: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{wire}").context("failed to write to stdout")?;
    out.flush().context("failed to flush stdout")?;
    Ok(())
}

/// Splits `[player_id] <value>` into its optional target and the value.
fn split_target(args: &[String]) -> Result<(Option<&str>, &str)> {
    match args {
        [value] => Ok((None, value.as_str())),
        [player, value] => Ok((Some(player.as_str()), value.as_str())),
        _ => bail!("expected [player_id] <value>"),
    }
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("player-bridge").join("config.toml")
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_config(data: &str) -> Result<AppConfig> {
    Ok(toml::from_str(data)?)
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
