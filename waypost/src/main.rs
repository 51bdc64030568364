use std::sync::Arc;
use std::time::Duration;

use tracing::{Level, info};
use waypost_engine::history::RouteHistoryStore;
use waypost_engine::location::{LivePosition, ScriptedLocationStream};
use waypost_engine::route::{Route, Waypoint};
use waypost_engine::routing::{RouteRequest, RoutingProvider};
use waypost_engine::session::{SessionConfig, TripSession};
use waypost_engine::storage::JsonFileStore;
use waypost_providers::crow_flies::CrowFliesProvider;

fn demo_route() -> Route {
    Route::new(
        Waypoint::new("Downtown Kigali", -1.9398, 30.0445),
        Waypoint::new("Kigali International Airport", -1.9366, 30.1302),
        vec![
            Waypoint::new("Kimihurura", -1.9355, 30.0602),
            Waypoint::new("Remera", -1.9557, 30.1041),
        ],
    )
}

fn scripted_drive() -> Vec<LivePosition> {
    vec![
        LivePosition::new(-1.9398, 30.0445),
        LivePosition::new(-1.9380, 30.0520),
        LivePosition::new(-1.9355, 30.0602),
        LivePosition::new(-1.9450, 30.0810),
        LivePosition::new(-1.9557, 30.1041),
        LivePosition::new(-1.9470, 30.1180),
        LivePosition::new(-1.9366, 30.1302),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let route = demo_route();
    let provider = Arc::new(CrowFliesProvider::new(40.0));

    // The rendering layer would draw this full path; here we just log its
    // totals.
    let overview = provider
        .route(RouteRequest {
            origin: (&route.start).into(),
            destination: (&route.end).into(),
            waypoints: route.stops.iter().map(geo_types::Point::from).collect(),
        })
        .await?;
    info!(
        "route {} -> {}: {:.1} km over {} legs",
        route.start.name,
        route.end.name,
        overview.total_distance_meters() / 1000.0,
        overview.legs.len()
    );

    let history = RouteHistoryStore::new(JsonFileStore::new("waypost_history.json"));
    if history.add(&route)? {
        info!("route saved to history");
    } else {
        info!("route already in history");
    }

    let stream = ScriptedLocationStream::from_positions(scripted_drive(), Duration::from_millis(300));
    let session = TripSession::start(route, &stream, provider, SessionConfig::default())?;

    let mut snapshots = session.subscribe();
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        match (snapshot.position, snapshot.eta) {
            (Some(position), Some(eta)) => info!(
                "at ({:.4}, {:.4}), stop index {}, next target {:.1} km / {:.0} s away",
                position.lat,
                position.lng,
                snapshot.progress.current_stop_index,
                eta.distance_km,
                eta.duration_seconds
            ),
            (Some(position), None) => info!(
                "at ({:.4}, {:.4}), stop index {}, ETA pending",
                position.lat, position.lng, snapshot.progress.current_stop_index
            ),
            _ => info!("waiting for the first position sample"),
        }
    }

    session.end();
    info!("trip finished");
    Ok(())
}
