use serde::{Deserialize, Serialize};

/// A named geographic point.
///
/// Equality is structural and exact: the name and both coordinates must all
/// match, with no coordinate tolerance. This is the uniqueness key for the
/// route history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
        }
    }
}

impl From<&Waypoint> for geo_types::Point {
    fn from(waypoint: &Waypoint) -> Self {
        geo_types::Point::new(waypoint.lng, waypoint.lat)
    }
}

/// An ordered start → stops → end trip.
///
/// Stop order is traversal order. A route with no stops is a direct
/// start → end trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub start: Waypoint,
    pub end: Waypoint,
    pub stops: Vec<Waypoint>,
}

impl Route {
    pub fn new(start: Waypoint, end: Waypoint, stops: Vec<Waypoint>) -> Self {
        Self { start, end, stops }
    }

    /// All waypoints in traversal order: start, stops, end.
    pub fn waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        std::iter::once(&self.start)
            .chain(self.stops.iter())
            .chain(std::iter::once(&self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_route() -> Route {
        Route::new(
            Waypoint::new("Downtown", -1.9398, 30.0445),
            Waypoint::new("Airport", -1.9366, 30.1302),
            vec![
                Waypoint::new("Kimihurura", -1.9355, 30.0602),
                Waypoint::new("Remera", -1.9557, 30.1041),
            ],
        )
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(sample_route(), sample_route());
    }

    #[test]
    fn test_stop_order_is_significant() {
        let route = sample_route();
        let mut swapped = route.clone();
        swapped.stops.swap(0, 1);
        assert_ne!(route, swapped);
    }

    #[test]
    fn test_renamed_waypoint_is_unequal() {
        let route = sample_route();
        let mut renamed = route.clone();
        renamed.stops[0].name = "Kacyiru".to_string();
        assert_ne!(route, renamed);
    }

    #[test]
    fn test_waypoints_traversal_order() {
        let route = sample_route();
        let names: Vec<&str> = route.waypoints().map(|w| w.name.as_str()).collect();
        assert_eq!(names, ["Downtown", "Kimihurura", "Remera", "Airport"]);
    }
}
