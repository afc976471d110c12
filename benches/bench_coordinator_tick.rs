use criterion::{criterion_group, criterion_main, Criterion};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::time::Duration;

use traffic_greenwave::control_system::policy::LongestQueuePolicy;
use traffic_greenwave::road_network::grid::RoadNetwork;
use traffic_greenwave::road_network::lane::Edge;
use traffic_greenwave::road_network::route_generation::random_route;
use traffic_greenwave::shared_data::{TickSnapshot, VehicleSnapshot};
use traffic_greenwave::vehicles::vehicle::VehicleClass;
use traffic_greenwave::{Coordinator, CoordinatorConfig};

fn bench_coordinator_tick(c: &mut Criterion) {
    let network = RoadNetwork::grid(4, 4, 200.0).expect("grid network");
    let mut rng = rand::rng();
    let approaches: Vec<Edge> = network.edges().filter(|e| e.to.is_some()).cloned().collect();

    // 300 ordinary vehicles halted or crawling on random approaches, plus a
    // handful of emergency vehicles with routes.
    let mut vehicles = Vec::new();
    for i in 0..300 {
        if let Some(edge) = approaches.choose(&mut rng) {
            vehicles.push(
                VehicleSnapshot::new(format!("car_{}", i), VehicleClass::Ordinary, edge.id.clone(), (0.0, 0.0))
                    .with_speed(rng.random_range(0.0..3.0))
                    .with_waiting_time(rng.random_range(0.0..30.0)),
            );
        }
    }
    for i in 0..4 {
        let route = random_route(&network, &mut rng);
        if let Some(first) = route.first().cloned() {
            vehicles.push(
                VehicleSnapshot::new(format!("ev_{}", i), VehicleClass::Emergency, first, (0.0, 0.0))
                    .with_speed(9.0)
                    .with_route(route),
            );
        }
    }

    let mut group = c.benchmark_group("coordinator_tick");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("grid_4x4_300_vehicles", |b| {
        let mut coordinator =
            Coordinator::new(network.clone(), CoordinatorConfig::default()).expect("valid config");
        let mut policy = LongestQueuePolicy;
        let mut tick = 0;
        b.iter(|| {
            let snapshot = TickSnapshot::new(tick, vehicles.clone());
            tick += 1;
            criterion::black_box(coordinator.tick(&snapshot, &mut policy));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_coordinator_tick);
criterion_main!(benches);
