//! Mission and return-to-base tasks.
//!
//! Both fly a 12-step straight route, one step per tick. Command signals are
//! polled once per tick, so a stop or a new mission takes effect within one
//! tick interval.

use tokio::time::sleep;

use fleet_core::{straight_route, LatLon, ResourceStatus, MISSION_ROUTE_STEPS};

use crate::simulator::TaskContext;
use crate::state::commands::TaskSignal;

/// Fly `resource_id` to `destination`, then hand over to return-to-base.
///
/// With `preempt_return` set, a running return-to-base task is told to stand
/// down before the first step.
pub async fn run_mission(
    ctx: TaskContext,
    resource_id: String,
    destination: LatLon,
    preempt_return: bool,
) {
    let Some(mut shutdown) = ctx.subscribe() else {
        return;
    };
    let channel = ctx.commands.channel(&resource_id);

    if preempt_return {
        if channel
            .deliver(TaskSignal::Start, ctx.settings.command_wait)
            .await
        {
            tracing::info!("Return to base of {} aborted by new mission", resource_id);
        } else {
            tracing::debug!("No return-to-base task running for {}", resource_id);
        }
    }

    let Some(resource) = ctx.registry.get(&resource_id) else {
        tracing::warn!("Mission for unknown resource {}", resource_id);
        return;
    };
    let altitude = ctx.settings.cruise_altitude_ft;
    ctx.registry.set_altitude(&resource_id, altitude);

    let route = straight_route(resource.position, destination, MISSION_ROUTE_STEPS);
    let mut last = resource.position;
    let mut grounded = false;

    for (step, point) in route.iter().enumerate().skip(1) {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Mission loop for {} shutting down", resource_id);
                return;
            }
            _ = sleep(ctx.settings.mission_tick) => {}
        }

        match channel.poll() {
            Some(TaskSignal::Stop) => {
                tracing::info!("Mission for {} stopped at step {}", resource_id, step - 1);
                break;
            }
            Some(TaskSignal::Start) => {
                tracing::warn!("Ignoring start signal for {} during mission", resource_id);
            }
            None => {}
        }
        if ctx.registry.is_grounded(&resource_id) {
            tracing::warn!("Battery of {} is empty, abandoning mission", resource_id);
            grounded = true;
            break;
        }

        tracing::debug!(
            "Mission {} step {}/{}: {},{}",
            resource_id,
            step,
            MISSION_ROUTE_STEPS,
            point.lat,
            point.lon
        );
        if !ctx.emit_location(&resource_id, *point, altitude).await {
            return;
        }
        last = *point;
        if step == MISSION_ROUTE_STEPS {
            tracing::info!("{} reached mission destination", resource_id);
        }
    }

    ctx.registry.clear_mission(&resource_id);
    if grounded {
        // the battery task brings the drone home
        if ctx
            .registry
            .transition(&resource_id, ResourceStatus::Mission, ResourceStatus::Patrol)
        {
            ctx.registry.set_altitude(&resource_id, 0.0);
        }
        return;
    }
    if ctx
        .registry
        .transition(&resource_id, ResourceStatus::Mission, ResourceStatus::ReturnToBase)
    {
        tracing::info!("{} returning to base", resource_id);
        tokio::spawn(run_return_to_base(ctx, resource_id, last));
    }
}

/// Fly `resource_id` from `from` back home and put it back on patrol.
pub async fn run_return_to_base(ctx: TaskContext, resource_id: String, from: LatLon) {
    let Some(mut shutdown) = ctx.subscribe() else {
        return;
    };
    let Some(home) = ctx.registry.home_position(&resource_id) else {
        return;
    };
    let channel = ctx.commands.channel(&resource_id);
    let altitude = ctx.settings.cruise_altitude_ft;

    if from != home {
        let route = straight_route(from, home, MISSION_ROUTE_STEPS);
        for point in route.iter().skip(1) {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Return-to-base loop for {} shutting down", resource_id);
                    return;
                }
                _ = sleep(ctx.settings.mission_tick) => {}
            }

            match channel.poll() {
                Some(TaskSignal::Start) => {
                    // the new mission owns the resource now
                    return;
                }
                Some(TaskSignal::Stop) => {
                    if ctx.registry.transition(
                        &resource_id,
                        ResourceStatus::ReturnToBase,
                        ResourceStatus::Patrol,
                    ) {
                        tracing::info!("Return to base of {} stopped, back on patrol", resource_id);
                    }
                    return;
                }
                None => {}
            }
            if ctx.registry.is_grounded(&resource_id) {
                tracing::warn!("Battery of {} is empty, ending return to base", resource_id);
                break;
            }

            if !ctx.emit_location(&resource_id, *point, altitude).await {
                return;
            }
        }
    }

    if ctx
        .registry
        .transition(&resource_id, ResourceStatus::ReturnToBase, ResourceStatus::Patrol)
    {
        ctx.registry.set_altitude(&resource_id, 0.0);
        tracing::info!("{} back at base, resuming patrol", resource_id);
    }
}
