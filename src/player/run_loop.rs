// src/player/run_loop.rs
use super::{command_handler, Disposition, Player, PlayerCommand, PlayerError, PlayerEvent, PlayerStateUpdate, PLAYER_LOG_TARGET};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace};

/// Runs the player's event loop until the unit terminates, then tears it down.
pub async fn run_player_loop(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Player run loop started.");

    let mut progress_interval = interval(player.progress_interval.max(Duration::from_millis(1)));
    progress_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased; // Events first

            maybe_event = player.event_rx.recv() => {
                match maybe_event {
                    Some(event) => {
                        trace!(target: PLAYER_LOG_TARGET, "Received event: {:?}", event);
                        if command_handler::handle_event(player, event).await == Disposition::Terminate {
                            info!(target: PLAYER_LOG_TARGET, "Unit terminating.");
                            break;
                        }
                    }
                    None => {
                        info!(target: PLAYER_LOG_TARGET, "All handles dropped. Exiting run loop.");
                        break;
                    }
                }
            }

            _ = progress_interval.tick(), if player.session.is_outputting() => {
                if let Some(resource) = player.session.resource_id() {
                    player.broadcast_update(PlayerStateUpdate::Progress {
                        resource,
                        position: player.session.position(),
                    });
                }
            }
        }
    }

    info!(target: PLAYER_LOG_TARGET, "Player run loop finished. Performing final cleanup.");
    let before = player.observe();
    player.session.release();
    player.focus.abandon_focus().await;
    player.publish_changes(before);
    player.broadcast_update(PlayerStateUpdate::Terminated);

    // Nothing queued after this point is acted upon.
    player.event_rx.close();
    while let Ok(event) = player.event_rx.try_recv() {
        match event {
            PlayerEvent::Command(command) => reject_command(player, command),
            other => trace!(target: PLAYER_LOG_TARGET, "Dropping event after termination: {:?}", other),
        }
    }

    for reply in player.shutdown_replies.drain(..) {
        let _ = reply.send(());
    }
    info!(target: PLAYER_LOG_TARGET, "Player task cleanup complete.");
}

fn reject_command(player: &mut Player, command: PlayerCommand) {
    debug!(target: PLAYER_LOG_TARGET, "Rejecting command after termination: {:?}", command);
    match command {
        PlayerCommand::PlayMedia { reply, .. }
        | PlayerCommand::PauseMedia(reply)
        | PlayerCommand::ResumeMedia(reply)
        | PlayerCommand::StopMedia(reply) => {
            let _ = reply.send(Err(PlayerError::Terminated));
        }
        PlayerCommand::GetSnapshot(reply) => {
            let _ = reply.send(player.snapshot());
        }
        PlayerCommand::Shutdown(reply) => player.shutdown_replies.push(reply),
    }
}
