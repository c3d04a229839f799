//! simlink-server: stand-alone simulation network server.
//!
//! Listens for controllers and viewers, logs every control message, and
//! shuts down when a controller sends `KILL_SIMULATOR` or on Ctrl-C.
//! Viewers are told `KILLED` (after `END` if a run is still open) before
//! their connections are closed.

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use simlink_common::SimlinkError;
use simlink_config::{config_to_json, load_config, validation, LogLevel, SimlinkConfig};
use simlink_protocol::{ProbeDescription, ProbeIdentifier, SimulationConfiguration};
use simlink_server::{ClientSession, NetworkServer, ServerListener};
use tokio::sync::Notify;

#[derive(Parser)]
#[command(name = "simlink-server", about = "Network server for remote simulation controllers and viewers")]
struct Args {
    /// Port to listen on (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides the config file).
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Config file to use instead of the platform default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

/// Logs every inbound event.
struct LoggingListener;

impl ServerListener for LoggingListener {
    fn on_connection_opened(&self, session: &Arc<ClientSession>) {
        tracing::info!(session = %session.id(), peer = %session.remote_addr(), "Connection opened");
    }

    fn on_connection_closed(&self, session: &Arc<ClientSession>) {
        tracing::info!(session = %session.id(), role = ?session.role(), "Connection closed");
    }

    fn on_init_message(&self, config: &SimulationConfiguration) {
        tracing::info!(
            search_directory = ?config.search_directory,
            xml_len = config.xml_configuration.len(),
            "INIT"
        );
    }

    fn on_play_message(&self) {
        tracing::info!("PLAY");
    }

    fn on_step_message(&self) {
        tracing::info!("STEP");
    }

    fn on_pause_message(&self) {
        tracing::info!("PAUSE");
    }

    fn on_stop_message(&self) {
        tracing::info!("STOP");
    }

    fn on_add_probe_message(&self, probe: &ProbeDescription) {
        tracing::info!(
            place = %probe.probe_id.place_id,
            probe = %probe.probe_id.probe_name,
            kind = %probe.probe_type,
            "ADD_PROBE"
        );
    }

    fn on_remove_probe_message(&self, probe_id: &ProbeIdentifier) {
        tracing::info!(place = %probe_id.place_id, probe = %probe_id.probe_name, "REMOVE_PROBE");
    }

    fn on_set_simulation_delay(&self, delay_ms: i64) {
        tracing::info!(delay_ms, "SET_SIMULATION_DELAY");
    }
}

/// Wakes the main task when a controller asks to kill the simulator.
struct KillSwitch {
    kill: Arc<Notify>,
}

impl ServerListener for KillSwitch {
    fn on_kill_simulation_message(&self) {
        tracing::info!("KILL_SIMULATOR received");
        self.kill.notify_one();
    }
}

fn apply_overrides(config: &mut SimlinkConfig, args: &Args) {
    if let Some(port) = args.port {
        config.server.port = u32::from(port);
    }
    if let Some(bind) = args.bind {
        config.server.bind_address = bind.to_string();
    }
}

fn init_logging(level: LogLevel) {
    let fallback = format!("simlink_server={}", level.as_filter());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging depends on the configured level, so errors before this
    // point go to stderr.
    let (mut config, load_error) = match load_config(args.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) if args.config.is_some() => {
            eprintln!("simlink-server: {e}");
            return ExitCode::FAILURE;
        }
        Err(e) => (SimlinkConfig::default(), Some(e)),
    };
    apply_overrides(&mut config, &args);

    if args.print_config {
        println!("{}", config_to_json(&config));
        return ExitCode::SUCCESS;
    }

    init_logging(config.logging.level);
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Using default configuration");
    }
    // Checked once, after overrides; out-of-range values fall back at bind.
    if let Err(e) = validation::validate(&config) {
        tracing::warn!(error = %e, "Invalid configuration values, falling back where needed");
    }

    match run(&config).await {
        Ok(()) => {
            tracing::info!("simlink-server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "simlink-server failed");
            ExitCode::FAILURE
        }
    }
}

/// Serve until killed, then shut down: stop accepting, tell viewers,
/// and drop every session.
async fn run(config: &SimlinkConfig) -> simlink_common::Result<()> {
    let server = NetworkServer::bind(config.server.socket_addr())
        .await
        .map_err(|e| SimlinkError::Network(e.to_string()))?;
    let server = Arc::new(server);

    let kill = Arc::new(Notify::new());
    server.add_listener(Arc::new(LoggingListener));
    server.add_listener(Arc::new(KillSwitch { kill: kill.clone() }));

    let mut acceptor = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };

    let finished = tokio::select! {
        res = &mut acceptor => Some(res),
        _ = kill.notified() => None,
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::error!(error = %e, "Cannot listen for Ctrl-C");
            }
            tracing::info!("Interrupted");
            None
        }
    };

    server.stop();
    match server.send_killed_message().await {
        Ok(viewers) => tracing::info!(viewers, "Sent KILLED"),
        Err(e) => tracing::warn!(error = %e, "Cannot notify every viewer"),
    }
    server.close_all_connections();

    let result = match finished {
        Some(res) => res,
        None => acceptor.await,
    };
    result
        .map_err(|e| SimlinkError::Other(format!("acceptor task failed: {e}")))?
        .map_err(|e| SimlinkError::Network(e.to_string()))
}
