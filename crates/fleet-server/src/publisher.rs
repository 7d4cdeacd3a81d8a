//! Downstream telemetry publishing.
//!
//! Publishing is fire-and-forget: a failed post is logged and never slows
//! down or rolls back the simulation.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use fleet_core::{DroneStatus, ResourceLocation};

pub trait StatusPublisher: Send + Sync {
    fn publish_location(&self, location: ResourceLocation);
    fn publish_status(&self, status: DroneStatus);
}

/// Posts to `{connector}/resources/{id}/location` and `/status`.
pub struct HttpPublisher {
    client: Client,
    base_url: String,
}

impl HttpPublisher {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn post<T: Serialize + Send + 'static>(&self, url: String, body: T, kind: &'static str) {
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::trace!("Published {} to {}", kind, url);
                }
                Ok(response) => {
                    tracing::warn!("Publishing {} to {} returned {}", kind, url, response.status());
                }
                Err(e) => {
                    tracing::warn!("Failed to publish {} to {}: {}", kind, url, e);
                }
            }
        });
    }
}

impl StatusPublisher for HttpPublisher {
    fn publish_location(&self, location: ResourceLocation) {
        let url = format!("{}/resources/{}/location", self.base_url, location.resource_id);
        self.post(url, location, "location");
    }

    fn publish_status(&self, status: DroneStatus) {
        let url = format!("{}/resources/{}/status", self.base_url, status.resource_id);
        self.post(url, status, "status");
    }
}

/// Publisher used when no connector is configured.
pub struct LogPublisher;

impl StatusPublisher for LogPublisher {
    fn publish_location(&self, location: ResourceLocation) {
        tracing::debug!(
            "Location {} -> {} at {} ft",
            location.resource_id,
            location.location,
            location.altitude
        );
    }

    fn publish_status(&self, status: DroneStatus) {
        tracing::debug!(
            "Status {}: battery {}%, heading {}, {} km from home",
            status.resource_id,
            status.battery_level,
            status.heading,
            status.distance_from_home
        );
    }
}
