use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wxstation_core::{Command, Validator};
use wxstation_master::{
    Config, NodePoller, PressureSensor, RetryPolicy, SerialTransport, StationController,
    StationReport,
};

const DEFAULT_LOG_FILTER: &str = "tracing=info,wxstation_master=info,wxstation_core=info";

#[derive(Parser)]
#[command(name = "wxstation-master")]
#[command(about = "Weather station master: polls telemetry nodes over a serial link")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "wxstation-master.toml")]
    config: PathBuf,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Poll the station every interval until Ctrl+C (default)
    Run,
    /// Run a single station cycle and print the report
    Once {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send one command token to the receiver and print the response line
    Raw {
        /// Command token, e.g. `current` or `node1`
        command: Command,
    },
    /// Read the barometer once
    Pressure,
}

type Station = StationController<SerialTransport>;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let (config, loaded) = if cli.config.exists() {
        (Config::load(&cli.config)?, true)
    } else {
        (Config::default(), false)
    };

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        config
            .logging
            .filter
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned())
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    if loaded {
        info!(path = ?cli.config, "Loaded configuration");
    } else {
        info!("No configuration file found, using defaults");
    }

    info!(
        port = %config.link.port,
        baud_rate = config.link.baud_rate,
        pressure = config.pressure.is_some(),
        "Starting wxstation-master"
    );

    let station = build_station(&config);

    match cli.mode.unwrap_or(Mode::Run) {
        Mode::Run => run(station, config.polling.interval()).await,
        Mode::Once { json } => {
            let (_, report) = cycle(station).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Mode::Raw { command } => {
            let mut station = station;
            let line = tokio::task::spawn_blocking(move || station.poller_mut().raw(command))
                .await??;
            println!("{line}");
            Ok(())
        }
        Mode::Pressure => {
            let mut station = station;
            let pressure = tokio::task::spawn_blocking(move || {
                station
                    .pressure_sensor_mut()
                    .map(|sensor| sensor.read_pressure())
            })
            .await?
            .ok_or_else(|| eyre!("no [pressure] section in the configuration"))??;
            println!("{pressure}");
            Ok(())
        }
    }
}

fn build_station(config: &Config) -> Station {
    let policy = RetryPolicy::new(config.polling.max_attempts);
    let poller = NodePoller::new(
        SerialTransport::receiver(&config.link),
        Validator::default(),
        policy,
    );
    let station = StationController::new(poller, config.polling.pacing());

    match &config.pressure {
        Some(pressure) => {
            station.with_pressure(PressureSensor::new(SerialTransport::barometer(pressure), policy))
        }
        None => station,
    }
}

/// Run one blocking station cycle off the async runtime and hand the
/// controller back.
async fn cycle(mut station: Station) -> color_eyre::Result<(Station, StationReport)> {
    let result = tokio::task::spawn_blocking(move || {
        let report = station.poll_all();
        (station, report)
    })
    .await?;
    Ok(result)
}

async fn run(mut station: Station, interval: Duration) -> color_eyre::Result<()> {
    let cancel = CancellationToken::new();

    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => error!(error = ?e, "Failed to listen for Ctrl+C"),
        }
        cancel_on_signal.cancel();
    });

    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let (returned, report) = cycle(station).await?;
        station = returned;
        log_report(&report);
    }

    info!("wxstation-master shut down complete");
    Ok(())
}

fn log_report(report: &StationReport) {
    for outcome in &report.nodes {
        match &outcome.result {
            Ok(reading) => match reading.telemetry {
                Some(t) => info!(
                    node = %outcome.node,
                    temperature_c = t.temperature_c,
                    vin_mv = t.vin_millivolts,
                    vbat_mv = t.vbat_millivolts,
                    age_s = t.age_seconds,
                    error = reading.error,
                    "Node"
                ),
                None => warn!(node = %outcome.node, "Node has no reading"),
            },
            Err(e) => warn!(node = %outcome.node, error = %e, "Node unavailable"),
        }
    }

    match &report.lacrosse {
        Ok(l) => info!(
            temperature_c = l.temperature_c,
            humidity_pct = l.relative_humidity_pct,
            wind_kmh = l.wind_speed_kmh,
            wind_deg = l.wind_direction_deg,
            rain_mm = l.rainfall_mm,
            dew_point_c = l.dew_point_c,
            humidex_c = l.humidex_c,
            "La Crosse"
        ),
        Err(e) => warn!(error = %e, "La Crosse unavailable"),
    }

    match &report.pressure {
        Some(Ok(pressure)) => info!(pressure, "Pressure"),
        Some(Err(e)) => warn!(error = %e, "Pressure unavailable"),
        None => {}
    }
}

fn print_report(report: &StationReport) {
    println!("polled at {}", report.polled_at);

    for outcome in &report.nodes {
        match &outcome.result {
            Ok(reading) => match reading.telemetry {
                Some(t) => println!(
                    "{:<8} {:>6.1} C  vin {:>4} mV  vbat {:>4} mV  age {:>4} s{}",
                    outcome.node,
                    t.temperature_c,
                    t.vin_millivolts,
                    t.vbat_millivolts,
                    t.age_seconds,
                    if reading.error { "  [error]" } else { "" }
                ),
                None => println!("{:<8} no reading", outcome.node),
            },
            Err(e) => println!("{:<8} failed: {e}", outcome.node),
        }
    }

    match &report.lacrosse {
        Ok(l) => println!(
            "lacrosse {:>6.1} C  {} %  wind {:.1} km/h @ {} deg  rain {} mm  dew point {} C  humidex {:.1} C",
            l.temperature_c,
            l.relative_humidity_pct,
            l.wind_speed_kmh,
            l.wind_direction_deg,
            l.rainfall_mm,
            l.dew_point_c,
            l.humidex_c
        ),
        Err(e) => println!("lacrosse failed: {e}"),
    }

    match &report.pressure {
        Some(Ok(pressure)) => println!("pressure {pressure:.2}"),
        Some(Err(e)) => println!("pressure failed: {e}"),
        None => {}
    }
}
