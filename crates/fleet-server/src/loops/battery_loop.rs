//! Battery loop: charges drones at base, drains them in flight and brings
//! empty ones home.

use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};

use fleet_core::DroneStatus;

use crate::simulator::TaskContext;

pub async fn run_battery_loop(ctx: TaskContext, mut shutdown: broadcast::Receiver<()>) {
    let period = ctx.settings.battery_tick;
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Battery loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                battery_tick(&ctx).await;
            }
        }
    }
}

async fn battery_tick(ctx: &TaskContext) {
    for drone_id in ctx.registry.drone_ids() {
        let Some((step, snapshot)) = ctx.registry.update_battery(&drone_id, &ctx.settings.battery)
        else {
            continue;
        };

        if step.depleted {
            let home = snapshot.drone.home_position;
            tracing::warn!("{} battery depleted, returning it to {},{}", drone_id, home.lat, home.lon);
            ctx.emit_location(&drone_id, home, 0.0).await;
        }

        ctx.publisher
            .publish_status(DroneStatus::from_snapshot(&snapshot, ctx.settings.cruise_speed_mph));
    }
}
