//! Cached patrol tracks, keyed by resource id.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::RwLock;

use fleet_core::LatLon;

use crate::sources::TrackSource;

/// Resources loaded concurrently per batch.
const LOAD_CHUNK_SIZE: usize = 500;

#[derive(Default)]
pub struct TrackStore {
    tracks: RwLock<HashMap<String, Vec<LatLon>>>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, resource_id: impl Into<String>, track: Vec<LatLon>) {
        self.tracks.write().await.insert(resource_id.into(), track);
    }

    /// Point `index` of a track (wrapping) and the track length.
    pub async fn point(&self, resource_id: &str, index: usize) -> Option<(LatLon, usize)> {
        let tracks = self.tracks.read().await;
        let track = tracks.get(resource_id).filter(|t| !t.is_empty())?;
        Some((track[index % track.len()], track.len()))
    }

    /// Ids with a non-empty track.
    pub async fn patrolling_ids(&self) -> Vec<String> {
        self.tracks
            .read()
            .await
            .iter()
            .filter(|(_, track)| !track.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Load tracks for `ids` in parallel batches. Failed loads are logged
    /// and leave the resource without a patrol.
    pub async fn load_all(self: &Arc<Self>, source: Arc<dyn TrackSource>, ids: Vec<String>) -> usize {
        let started = std::time::Instant::now();
        for chunk in ids.chunks(LOAD_CHUNK_SIZE) {
            let loads = chunk.iter().cloned().map(|id| {
                let store = Arc::clone(self);
                let source = Arc::clone(&source);
                tokio::spawn(async move {
                    match source.load_track(&id).await {
                        Ok(track) => {
                            tracing::debug!("Loaded {} track points for {}", track.len(), id);
                            store.insert(id, track).await;
                        }
                        Err(e) => tracing::warn!("Could not load track for {}: {:#}", id, e),
                    }
                })
            });
            for result in join_all(loads).await {
                if let Err(e) = result {
                    tracing::error!("Track loader task failed: {}", e);
                }
            }
        }

        let loaded = self.patrolling_ids().await.len();
        tracing::info!("Loaded {} patrol tracks in {:?}", loaded, started.elapsed());
        loaded
    }
}
