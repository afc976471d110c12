// greenwave_replay.rs
//
// Replays recorded tick snapshots (one JSON object per line) through the
// coordinator and prints one TickReport JSON line per tick.
//
// usage: greenwave_replay <network.json> <config.json> <ticks.jsonl> [--csv out.csv] [--fill-routes]

use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use traffic_greenwave::control_system::policy::LongestQueuePolicy;
use traffic_greenwave::monitoring::tick_log::append_tick_record;
use traffic_greenwave::road_network::grid::RoadNetwork;
use traffic_greenwave::road_network::lane::EdgeId;
use traffic_greenwave::road_network::route_generation::route_to_exit;
use traffic_greenwave::shared_data::TickSnapshot;
use traffic_greenwave::vehicles::vehicle::VehicleId;
use traffic_greenwave::{Coordinator, CoordinatorConfig};

struct Args {
    network: PathBuf,
    config: PathBuf,
    ticks: PathBuf,
    csv: Option<PathBuf>,
    fill_routes: bool,
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let mut positional = Vec::new();
    let mut csv = None;
    let mut fill_routes = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" => csv = Some(PathBuf::from(args.next().ok_or("--csv needs a path")?)),
            "--fill-routes" => fill_routes = true,
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let [network, config, ticks]: [PathBuf; 3] = positional.try_into().map_err(|_| {
        "usage: greenwave_replay <network.json> <config.json> <ticks.jsonl> [--csv out.csv] [--fill-routes]"
    })?;
    Ok(Args {
        network,
        config,
        ticks,
        csv,
        fill_routes,
    })
}

/// Gives emergency vehicles without a declared route the nearest-exit route
/// from the edge they were first seen on. The route is kept for later ticks.
fn fill_routes(
    snapshot: &mut TickSnapshot,
    network: &RoadNetwork,
    filled: &mut BTreeMap<VehicleId, Vec<EdgeId>>,
) {
    for vehicle in snapshot.vehicles.iter_mut() {
        if !vehicle.is_emergency() || vehicle.route.is_some() {
            continue;
        }
        if !filled.contains_key(&vehicle.id) {
            match route_to_exit(network, &vehicle.edge) {
                Some(route) => {
                    filled.insert(vehicle.id.clone(), route);
                }
                None => {
                    warn!("No exit route for {} from {}", vehicle.id, vehicle.edge);
                    continue;
                }
            }
        }
        vehicle.route = filled.get(&vehicle.id).cloned();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = parse_args()?;

    let network = RoadNetwork::from_json_file(&args.network)?;
    let config = CoordinatorConfig::from_json_file(&args.config)?;
    info!(
        "Loaded {} junctions from {}",
        network.junction_count(),
        args.network.display()
    );
    let mut coordinator = Coordinator::new(network, config)?;
    let mut policy = LongestQueuePolicy;
    let mut filled = BTreeMap::new();

    let mut lines = BufReader::new(File::open(&args.ticks).await?).lines();
    let mut replayed = 0usize;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let mut snapshot: TickSnapshot = match serde_json::from_str(&line) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Skipping malformed tick line: {}", e);
                continue;
            }
        };
        if args.fill_routes {
            fill_routes(&mut snapshot, coordinator.network(), &mut filled);
        }

        let report = coordinator.tick(&snapshot, &mut policy);
        println!("{}", serde_json::to_string(&report)?);
        if let Some(path) = &args.csv {
            if let Err(e) = append_tick_record(path, &report) {
                eprintln!("Error logging tick {}: {}", report.tick, e);
            }
        }
        replayed += 1;
    }

    info!("Replayed {} ticks", replayed);
    Ok(())
}
