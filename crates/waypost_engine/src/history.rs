use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::route::{Route, Waypoint};
use crate::storage::{KeyValueStore, StorageError};

/// Key the serialized history blob lives under, carried over from the
/// historical storage layout.
pub const SAVED_ROUTES_KEY: &str = "savedRoutes";

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("could not serialize route history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Wire shape of one persisted route. Kept distinct from the domain types so
/// the historical camelCase blob layout stays stable.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedRouteRecord {
    starting_point: NamedLocation,
    ending_point: NamedLocation,
    stops: Vec<NamedLocation>,
}

#[derive(Serialize, Deserialize)]
struct NamedLocation {
    name: String,
    location: LatLng,
}

#[derive(Serialize, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<&Waypoint> for NamedLocation {
    fn from(waypoint: &Waypoint) -> Self {
        Self {
            name: waypoint.name.clone(),
            location: LatLng {
                lat: waypoint.lat,
                lng: waypoint.lng,
            },
        }
    }
}

impl From<NamedLocation> for Waypoint {
    fn from(named: NamedLocation) -> Self {
        Waypoint::new(named.name, named.location.lat, named.location.lng)
    }
}

impl From<&Route> for SavedRouteRecord {
    fn from(route: &Route) -> Self {
        Self {
            starting_point: (&route.start).into(),
            ending_point: (&route.end).into(),
            stops: route.stops.iter().map(NamedLocation::from).collect(),
        }
    }
}

impl From<SavedRouteRecord> for Route {
    fn from(record: SavedRouteRecord) -> Self {
        Route::new(
            record.starting_point.into(),
            record.ending_point.into(),
            record.stops.into_iter().map(Waypoint::from).collect(),
        )
    }
}

/// Deduplicated, insertion-ordered favorite routes, persisted as one blob in
/// a key/value store.
///
/// Every mutation rewrites the whole blob; route counts are small. The store
/// is the single source of truth for "is this route favorited" — callers
/// query `contains` instead of keeping their own flag.
pub struct RouteHistoryStore<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> RouteHistoryStore<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, SAVED_ROUTES_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Saved routes in persisted (insertion) order.
    pub fn list(&self) -> Result<Vec<Route>, HistoryError> {
        let Some(blob) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };
        Ok(parse_history_blob(&blob))
    }

    /// Adds the route unless a structurally equal entry already exists.
    /// Returns whether an insertion happened, making favoriting idempotent.
    pub fn add(&self, route: &Route) -> Result<bool, HistoryError> {
        let mut routes = self.list()?;
        if routes.contains(route) {
            debug!("route {} - {} already saved", route.start.name, route.end.name);
            return Ok(false);
        }
        routes.push(route.clone());
        self.write(&routes)?;
        Ok(true)
    }

    /// Deletes the entry at `index`. Out-of-range indices are a caller error
    /// and surface synchronously.
    pub fn remove(&self, index: usize) -> Result<(), HistoryError> {
        let mut routes = self.list()?;
        if index >= routes.len() {
            return Err(HistoryError::OutOfRange {
                index,
                len: routes.len(),
            });
        }
        routes.remove(index);
        self.write(&routes)
    }

    /// Structural membership query.
    pub fn contains(&self, route: &Route) -> Result<bool, HistoryError> {
        Ok(self.list()?.contains(route))
    }

    fn write(&self, routes: &[Route]) -> Result<(), HistoryError> {
        let records: Vec<SavedRouteRecord> = routes.iter().map(SavedRouteRecord::from).collect();
        let blob = serde_json::to_string(&records)?;
        self.store.set(&self.key, &blob)?;
        Ok(())
    }
}

/// Normalizes the persisted blob to a list of routes.
///
/// Older blobs held a single record instead of an array; both shapes parse.
/// Anything else reads as empty history — persisted state is best-effort,
/// not authoritative.
fn parse_history_blob(blob: &str) -> Vec<Route> {
    if let Ok(records) = serde_json::from_str::<Vec<SavedRouteRecord>>(blob) {
        return records.into_iter().map(Route::from).collect();
    }
    if let Ok(record) = serde_json::from_str::<SavedRouteRecord>(blob) {
        return vec![record.into()];
    }
    warn!("malformed route history blob, treating history as empty");
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn kigali_route() -> Route {
        Route::new(
            Waypoint::new("Start", -1.9398, 30.0445),
            Waypoint::new("End", -1.9366, 30.1302),
            vec![Waypoint::new("Stop", -1.9355, 30.0602)],
        )
    }

    fn store() -> RouteHistoryStore<MemoryStore> {
        RouteHistoryStore::new(MemoryStore::default())
    }

    #[test]
    fn test_add_is_deduplicated() {
        let history = store();
        let route = kigali_route();

        assert!(history.add(&route).unwrap());
        assert!(!history.add(&route).unwrap());

        let routes = history.list().unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0], route);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let history = store();
        let first = kigali_route();
        let mut second = kigali_route();
        second.stops.clear();

        history.add(&first).unwrap();
        history.add(&second).unwrap();

        let routes = history.list().unwrap();
        assert_eq!(routes, vec![first, second]);
    }

    #[test]
    fn test_reordered_stops_are_a_different_route() {
        let history = store();
        let mut route = kigali_route();
        route.stops.push(Waypoint::new("Remera", -1.9557, 30.1041));
        let mut reordered = route.clone();
        reordered.stops.swap(0, 1);

        assert!(history.add(&route).unwrap());
        assert!(history.add(&reordered).unwrap());
        assert_eq!(history.list().unwrap().len(), 2);
    }

    #[test]
    fn test_remove_and_out_of_range() {
        let history = store();
        history.add(&kigali_route()).unwrap();

        history.remove(0).unwrap();
        assert!(history.list().unwrap().is_empty());

        let err = history.remove(0).unwrap_err();
        assert!(matches!(err, HistoryError::OutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn test_contains_is_structural() {
        let history = store();
        let route = kigali_route();
        history.add(&route).unwrap();

        assert!(history.contains(&route).unwrap());

        let mut renamed = route.clone();
        renamed.stops[0].name = "Elsewhere".to_string();
        assert!(!history.contains(&renamed).unwrap());
    }

    #[test]
    fn test_single_record_blob_is_normalized() {
        let backing = MemoryStore::default();
        backing
            .set(
                SAVED_ROUTES_KEY,
                r#"{
                    "startingPoint": { "name": "Start", "location": { "lat": -1.9398, "lng": 30.0445 } },
                    "endingPoint": { "name": "End", "location": { "lat": -1.9366, "lng": 30.1302 } },
                    "stops": [{ "name": "Stop", "location": { "lat": -1.9355, "lng": 30.0602 } }]
                }"#,
            )
            .unwrap();

        let history = RouteHistoryStore::new(backing);
        let routes = history.list().unwrap();
        assert_eq!(routes, vec![kigali_route()]);
    }

    #[test]
    fn test_malformed_blob_reads_as_empty() {
        let backing = MemoryStore::default();
        backing.set(SAVED_ROUTES_KEY, "not json at all").unwrap();

        let history = RouteHistoryStore::new(backing);
        assert!(history.list().unwrap().is_empty());

        // The store still accepts new entries afterwards.
        assert!(history.add(&kigali_route()).unwrap());
        assert_eq!(history.list().unwrap().len(), 1);
    }

    #[test]
    fn test_mutations_rewrite_the_blob() {
        let backing = MemoryStore::default();
        let history = RouteHistoryStore::new(backing);
        history.add(&kigali_route()).unwrap();

        let blob = history.store.get(SAVED_ROUTES_KEY).unwrap().unwrap();
        assert!(blob.starts_with('['));
        assert!(blob.contains("startingPoint"));
        assert!(blob.contains("endingPoint"));
    }
}
