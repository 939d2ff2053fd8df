use anyhow::{bail, Context, Result};
use bustrack_core::{
    demo,
    transit::{RouteCatalog, RouteIdentifier, RouteProvider},
    Credential, NetworkConfig, Ticker,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use geo::Point;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod output;

#[derive(Parser, Debug)]
#[command(
    name = "fleet-sim",
    author,
    version,
    about = "Run the bus fleet simulator and follow it as a tracking viewer",
    long_about = "Loads a network definition (routes, buses and issued tickets), moves every \
                  bus along its route on a fixed tick, and prints what a viewer holding the \
                  given credential would see after each tick, one JSON object per line.\n\n\
                  Without --network the built-in Kano demo network is used \
                  (tickets TCK001-TCK003, admin code admin123)."
)]
struct Args {
    /// Network definition JSON file
    #[arg(short, long, global = true)]
    network: Option<PathBuf>,

    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the fleet as a viewer
    Run {
        /// Ticket id, or the admin code to see every bus
        #[arg(short, long)]
        credential: String,

        /// Number of updates to print before stopping
        #[arg(short, long, default_value_t = 10)]
        ticks: u32,

        /// Override the tick interval from the network definition
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Seed for occupancy drift
        #[arg(long)]
        seed: Option<u64>,

        /// Only show buses on this route
        #[arg(long)]
        route: Option<String>,

        /// Print fleet summary figures at the end (admin only)
        #[arg(long)]
        summary: bool,
    },

    /// List routes and their waypoints
    Routes {
        /// Only routes passing near this point, given as "X,Y" in catalog order
        #[arg(long, value_parser = parse_point, requires = "radius")]
        near: Option<Point>,

        /// Search radius in catalog units
        #[arg(long)]
        radius: Option<f64>,
    },
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad X coordinate: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad Y coordinate: {e}"))?;
    Ok(Point::new(x, y))
}

fn load_network(path: Option<&Path>) -> Result<NetworkConfig> {
    match path {
        Some(path) => {
            info!("Network: {}", path.display());
            NetworkConfig::load(path).context("Failed to load network definition")
        }
        None => {
            info!("Network: built-in Kano demo");
            demo::network_config().context("Failed to load demo network")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for JSON output
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let config = load_network(args.network.as_deref())?;

    match args.command {
        Command::Run {
            credential,
            ticks,
            interval_ms,
            seed,
            route,
            summary,
        } => run(config, credential, ticks, interval_ms, seed, route, summary).await,
        Command::Routes { near, radius } => list_routes(&config, near, radius),
    }
}

async fn run(
    mut config: NetworkConfig,
    credential: String,
    ticks: u32,
    interval_ms: Option<u64>,
    seed: Option<u64>,
    route: Option<String>,
    summary: bool,
) -> Result<()> {
    if let Some(interval_ms) = interval_ms {
        config.simulation.tick_interval_ms = interval_ms;
    }
    if seed.is_some() {
        config.simulation.rng_seed = seed;
    }

    let network = config.build(Utc::now()).context("Failed to build network")?;
    info!(
        "Loaded {} routes, {} buses",
        network.catalog.list_routes().len(),
        network.simulator.snapshot().len()
    );

    let service = network.tracking_service();
    let mut session = match service.open(&Credential::new(credential)) {
        Ok(session) => session,
        Err(e) => bail!("Access denied: {e}"),
    };
    info!("Access granted: {:?}", session.capability());

    let route = route.map(RouteIdentifier::new);
    let visible = |session: &bustrack_core::TrackingSession| match &route {
        Some(route) => session.view_route(route),
        None => session.view(),
    };

    let mut stdout = std::io::stdout();
    output::write_line(
        &mut stdout,
        &output::frame_json(session.last_snapshot_version(), &visible(&session)),
    )?;

    let ticker = Ticker::spawn(network.simulator, network.config.tick_interval());

    for _ in 0..ticks {
        if session.next_update().await.is_none() {
            warn!("Simulator stopped early");
            break;
        }
        output::write_line(
            &mut stdout,
            &output::frame_json(session.last_snapshot_version(), &visible(&session)),
        )?;
    }

    if summary {
        match session.route_summaries() {
            Ok(summary) => output::write_line(&mut stdout, &output::summary_json(&summary))?,
            Err(e) => warn!("No summary: {e}"),
        }
    }

    session.close();
    let simulator = ticker.shutdown().await.context("Ticker did not stop cleanly")?;
    info!("Stopped at snapshot version {}", simulator.snapshot().version());

    Ok(())
}

fn list_routes(config: &NetworkConfig, near: Option<Point>, radius: Option<f64>) -> Result<()> {
    let catalog: RouteCatalog = config.build_catalog().context("Failed to build route catalog")?;

    let routes = match (near, radius) {
        (Some(point), Some(radius)) => {
            let routes = catalog.routes_near(point, radius);
            info!("{} routes within {} of ({}, {})", routes.len(), radius, point.x(), point.y());
            routes
        }
        _ => catalog.all_routes(),
    };

    let mut stdout = std::io::stdout();
    for route in &routes {
        output::write_line(&mut stdout, &output::route_json(route))?;
    }

    Ok(())
}
