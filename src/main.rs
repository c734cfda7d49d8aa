use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tidesong::terminal::{CrlfWriter, InterruptListener, install_signal_handler};
use tidesong::{
    CancelToken, Config, EventSink, LogSink, MidiPortSink, PlayMode, Player, Source, build_library,
    ingest, output,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "tidesong")]
#[command(about = "Play weather and tide data as looping MIDI")]
#[command(version)]
struct Cli {
    /// RON config file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one city until q, Esc or Ctrl-C
    Play {
        /// City code, e.g. LAX
        city: String,

        /// Daily weather CSV (STATION, DATE, AWND, PRCP, TMAX)
        #[arg(long, default_value = "data/weather.csv")]
        weather: PathBuf,

        /// Water level CSV (STATION, DATE, WATER_LEVEL)
        #[arg(long, default_value = "data/tides.csv")]
        tides: PathBuf,

        /// Substring of the MIDI output port to use
        #[arg(short, long)]
        port: Option<String>,

        /// Milliseconds between ticks
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many ticks
        #[arg(long)]
        steps: Option<u64>,

        /// Play each track through once instead of looping
        #[arg(long)]
        once: bool,

        /// Log events instead of sending MIDI
        #[arg(long)]
        dry_run: bool,
    },

    /// List MIDI output ports
    Ports,

    /// Write the default config to a file
    InitConfig { path: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(CrlfWriter::<std::io::Stderr>::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Play {
            city,
            weather,
            tides,
            port,
            interval_ms,
            steps,
            once,
            dry_run,
        } => {
            if let Some(ms) = interval_ms {
                config.tick_interval_ms = ms;
            }
            if port.is_some() {
                config.midi.port = port;
            }
            config.validate()?;

            let inputs = vec![
                (Source::Weather, ingest::load_rows(&weather)?),
                (Source::Tides, ingest::load_rows(&tides)?),
            ];
            let library = build_library(&config, &inputs)?;
            let tracks = library.city(&city)?;

            let sink: Box<dyn EventSink> = if dry_run {
                Box::new(LogSink::new())
            } else {
                match &config.midi.port {
                    Some(pattern) => Box::new(MidiPortSink::open(&config.midi.client_name, pattern)?),
                    None => Box::new(MidiPortSink::open_virtual(&config.midi.client_name)?),
                }
            };

            let mut player = Player::new(config.tick_interval());
            if let Some(steps) = steps {
                player = player.with_max_steps(steps);
            }
            if once {
                player = player.with_mode(PlayMode::Once);
            }

            let cancel = CancelToken::new();
            install_signal_handler(cancel.clone())?;
            info!("Playing {}, press q to stop", city);
            let report = {
                let _listener = InterruptListener::spawn(cancel.clone());
                player.play(tracks, sink, &cancel)?
            };
            info!(
                "{:?} after {} ticks, {} events sent",
                report.state, report.ticks, report.events_sent
            );
        }

        Commands::Ports => {
            let ports = output::list_output_ports(&config.midi.client_name)?;
            if ports.is_empty() {
                println!("No MIDI output ports found");
            }
            for (i, name) in ports.iter().enumerate() {
                println!("  {}: {}", i, name);
            }
        }

        Commands::InitConfig { path } => {
            config.save(&path)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
