//! Loaders for the initial fleet, patrol tracks and restricted zones.
//!
//! Zone geometry arrives as loosely shaped GeoJSON and is parsed into
//! [`RestrictedZone`] here, so nothing past this module sees raw payloads.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use fleet_core::{parse_track_csv, ActivationWindow, LatLon, ResourceRecord, RestrictedZone};

pub trait ResourceSource: Send + Sync {
    fn load_resources(&self) -> BoxFuture<'_, Result<Vec<ResourceRecord>>>;
}

pub trait TrackSource: Send + Sync {
    fn load_track<'a>(&'a self, resource_id: &'a str) -> BoxFuture<'a, Result<Vec<LatLon>>>;
}

pub trait ZoneSource: Send + Sync {
    fn load_zones(&self) -> BoxFuture<'_, Result<Vec<RestrictedZone>>>;
}

/// Resource list stored as a JSON array on disk.
pub struct FileResourceSource {
    path: PathBuf,
}

impl FileResourceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResourceSource for FileResourceSource {
    fn load_resources(&self) -> BoxFuture<'_, Result<Vec<ResourceRecord>>> {
        async move {
            let raw = tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("Failed to read resource list {}", self.path.display()))?;
            let records: Vec<ResourceRecord> =
                serde_json::from_str(&raw).context("Failed to parse resource list")?;
            Ok(records)
        }
        .boxed()
    }
}

/// Tracks stored as `<dir>/<resource id>.csv`.
pub struct DirTrackSource {
    dir: PathBuf,
}

impl DirTrackSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl TrackSource for DirTrackSource {
    fn load_track<'a>(&'a self, resource_id: &'a str) -> BoxFuture<'a, Result<Vec<LatLon>>> {
        async move {
            let path = self.dir.join(format!("{}.csv", resource_id));
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(parse_track_csv(&raw))
        }
        .boxed()
    }
}

/// In-memory tracks.
#[derive(Default)]
pub struct StaticTrackSource {
    tracks: HashMap<String, Vec<LatLon>>,
}

impl StaticTrackSource {
    pub fn new(tracks: HashMap<String, Vec<LatLon>>) -> Self {
        Self { tracks }
    }
}

impl TrackSource for StaticTrackSource {
    fn load_track<'a>(&'a self, resource_id: &'a str) -> BoxFuture<'a, Result<Vec<LatLon>>> {
        let track = self
            .tracks
            .get(resource_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No track for {}", resource_id));
        futures::future::ready(track).boxed()
    }
}

/// Fixed zone list, used when no zone store is configured.
#[derive(Default)]
pub struct StaticZoneSource {
    zones: Vec<RestrictedZone>,
}

impl StaticZoneSource {
    pub fn new(zones: Vec<RestrictedZone>) -> Self {
        Self { zones }
    }
}

impl ZoneSource for StaticZoneSource {
    fn load_zones(&self) -> BoxFuture<'_, Result<Vec<RestrictedZone>>> {
        futures::future::ready(Ok(self.zones.clone())).boxed()
    }
}

const NO_FLY_ZONE_TEMPLATE: &str = "no_fly_zone";
const ZONE_SEARCH_LIMIT: u32 = 1000;

/// Restricted zones from the custom-entity search endpoint.
pub struct HttpZoneSource {
    client: Client,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneSearchResponse {
    #[serde(default)]
    ce_instances: Vec<ZoneInstance>,
}

#[derive(Debug, Deserialize)]
struct ZoneInstance {
    id: String,
    geometry: ZoneGeometry,
    #[serde(default)]
    data: ZoneData,
}

#[derive(Debug, Deserialize)]
struct ZoneGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZoneData {
    #[serde(default)]
    activation_start: ActivationTime,
    #[serde(default)]
    activation_end: ActivationTime,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivationTime {
    #[serde(default)]
    timestamp_ms: i64,
}

type Ring = Vec<Vec<f64>>;

impl HttpZoneSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    fn search_body() -> Value {
        json!({
            "ceInstance": { "templateId": { "equals": [NO_FLY_ZONE_TEMPLATE] } },
            "offset": 0,
            "limit": ZONE_SEARCH_LIMIT,
            "order": "creation_date:asc",
            "withTotal": true
        })
    }

    async fn fetch(&self) -> Result<Vec<RestrictedZone>> {
        let response = self
            .client
            .post(&self.url)
            .json(&Self::search_body())
            .send()
            .await
            .context("Failed to fetch restricted zones")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Zone search failed: {} {}", status, body));
        }

        let payload = response
            .json::<ZoneSearchResponse>()
            .await
            .context("Failed to parse zone search response")?;

        Ok(parse_zones(payload))
    }
}

impl ZoneSource for HttpZoneSource {
    fn load_zones(&self) -> BoxFuture<'_, Result<Vec<RestrictedZone>>> {
        self.fetch().boxed()
    }
}

fn parse_zones(payload: ZoneSearchResponse) -> Vec<RestrictedZone> {
    payload
        .ce_instances
        .into_iter()
        .filter_map(|instance| {
            let Some(polygon) = outer_ring(&instance.geometry) else {
                tracing::warn!("Skipping zone {} with unusable {} geometry", instance.id, instance.geometry.kind);
                return None;
            };
            Some(RestrictedZone {
                id: instance.id,
                polygon,
                active: ActivationWindow::from_millis(
                    instance.data.activation_start.timestamp_ms,
                    instance.data.activation_end.timestamp_ms,
                ),
            })
        })
        .collect()
}

/// First ring of the (first) polygon as lat/lon, without the closing vertex.
fn outer_ring(geometry: &ZoneGeometry) -> Option<Vec<LatLon>> {
    let ring: Ring = match geometry.kind.as_str() {
        "Polygon" => serde_json::from_value::<Vec<Ring>>(geometry.coordinates.clone())
            .ok()?
            .into_iter()
            .next()?,
        "MultiPolygon" => serde_json::from_value::<Vec<Vec<Ring>>>(geometry.coordinates.clone())
            .ok()?
            .into_iter()
            .next()?
            .into_iter()
            .next()?,
        _ => return None,
    };

    let mut polygon: Vec<LatLon> = ring
        .iter()
        .map(|pos| match pos.as_slice() {
            [lon, lat, ..] => Some(LatLon::new(*lat, *lon)),
            _ => None,
        })
        .collect::<Option<_>>()?;

    if polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    (polygon.len() >= 3).then_some(polygon)
}
