//! Patrol loop: replays a resource's historical track while it is on patrol.

use tokio::sync::broadcast;
use tokio::time::interval;

use fleet_core::ResourceStatus;

use crate::simulator::TaskContext;

pub async fn run_patrol_loop(
    ctx: TaskContext,
    resource_id: String,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(ctx.settings.patrol_interval);
    let mut index = 0usize;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Patrol loop for {} shutting down", resource_id);
                break;
            }
            _ = ticker.tick() => {
                if ctx.registry.status(&resource_id) != Some(ResourceStatus::Patrol)
                    || ctx.registry.is_grounded(&resource_id)
                {
                    continue;
                }

                let Some((point, len)) = ctx.tracks.point(&resource_id, index).await else {
                    tracing::warn!("Track for {} disappeared, ending patrol", resource_id);
                    break;
                };

                tracing::debug!(
                    "Patrol {} point {}/{}: {},{}",
                    resource_id,
                    index % len,
                    len,
                    point.lat,
                    point.lon
                );
                let altitude = ctx.registry.altitude(&resource_id);
                if !ctx.emit_patrol_location(&resource_id, point, altitude).await {
                    break;
                }
                index = (index + 1) % len;
            }
        }
    }
}
