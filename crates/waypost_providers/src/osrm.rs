use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use waypost_engine::routing::{
    ProviderError, RouteLeg, RouteRequest, RoutedPath, RoutingProvider,
};

pub const OSRM_ROUTE_API_PATH: &str = "/route/v1/";

pub struct OsrmRouteClientParams {
    pub osrm_url: String,
    /// Routing profile, e.g. "driving".
    pub profile: String,
}

/// Client for the OSRM route service.
///
/// Requests the full path geometry as a polyline and one leg per consecutive
/// pair of request points.
pub struct OsrmRouteClient {
    params: OsrmRouteClientParams,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: String,
    legs: Vec<OsrmLeg>,
}

#[derive(Deserialize)]
struct OsrmLeg {
    /// Meters
    distance: f64,
    /// Seconds
    duration: f64,
}

impl OsrmRouteClient {
    pub fn new(params: OsrmRouteClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    fn route_url(&self, request: &RouteRequest) -> String {
        let mut url = self.params.osrm_url.clone();
        url.push_str(OSRM_ROUTE_API_PATH);
        url.push_str(&self.params.profile);
        url.push('/');

        let points: Vec<&geo_types::Point> = request.points().collect();
        for (i, point) in points.iter().enumerate() {
            url.push_str(&format!("{},{}", point.x(), point.y()));

            if i < points.len() - 1 {
                url.push(';');
            }
        }

        url
    }
}

fn routed_path_from_response(response: OsrmRouteResponse) -> Result<RoutedPath, ProviderError> {
    if response.code != "Ok" {
        return Err(ProviderError::NoRoute);
    }

    let route = response.routes.into_iter().next().ok_or(ProviderError::NoRoute)?;

    Ok(RoutedPath {
        path_encoded: route.geometry,
        legs: route
            .legs
            .into_iter()
            .map(|leg| RouteLeg {
                distance_meters: leg.distance,
                duration_seconds: leg.duration,
            })
            .collect(),
    })
}

#[async_trait]
impl RoutingProvider for OsrmRouteClient {
    async fn route(&self, request: RouteRequest) -> Result<RoutedPath, ProviderError> {
        let url = self.route_url(&request);
        debug!("requesting OSRM route: {url}");

        let response = self
            .client
            .get(url)
            .query(&[("overview", "full"), ("geometries", "polyline")])
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api { status, message });
        }

        let body: OsrmRouteResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        routed_path_from_response(body)
    }
}
