// src/player/command_handler.rs
use super::{Disposition, Player, PlayerCommand, PlayerError, PlayerEvent, PlayerStateUpdate, PLAYER_LOG_TARGET};
use crate::audio::{EngineEvent, ResourceId};
use crate::focus::{FocusChange, FocusState};
use tracing::{debug, info, instrument, warn};

/// Routes one queued event and publishes the resulting state changes.
pub async fn handle_event(player: &mut Player, event: PlayerEvent) -> Disposition {
    let before = player.observe();
    let disposition = match event {
        PlayerEvent::Command(command) => handle_command(player, command).await,
        PlayerEvent::Engine { resource, event } => handle_engine_event(player, resource, event),
        PlayerEvent::Focus(change) => handle_focus_change(player, change),
    };
    player.publish_changes(before);
    disposition
}

async fn handle_command(player: &mut Player, command: PlayerCommand) -> Disposition {
    match command {
        PlayerCommand::PlayMedia { locator, reply } => {
            let (result, disposition) = handle_play_media(player, &locator).await;
            let _ = reply.send(result);
            disposition
        }
        PlayerCommand::PauseMedia(reply) => {
            handle_pause(player);
            let _ = reply.send(Ok(()));
            Disposition::Continue
        }
        PlayerCommand::ResumeMedia(reply) => {
            let (result, disposition) = handle_resume(player);
            let _ = reply.send(result);
            disposition
        }
        PlayerCommand::StopMedia(reply) => {
            handle_stop(player);
            let _ = reply.send(Ok(()));
            Disposition::Continue
        }
        PlayerCommand::GetSnapshot(reply) => {
            let _ = reply.send(player.snapshot());
            Disposition::Continue
        }
        PlayerCommand::Shutdown(reply) => {
            info!(target: PLAYER_LOG_TARGET, "Shutdown command received.");
            player.shutdown_replies.push(reply);
            Disposition::Terminate
        }
    }
}

/// Takes focus and loads `locator`. Focus is requested on every call so a new track takes over
/// from whoever holds focus now.
#[instrument(skip(player), fields(focus = %player.focus.state()))]
pub async fn handle_play_media(player: &mut Player, locator: &str) -> (Result<(), PlayerError>, Disposition) {
    info!(target: PLAYER_LOG_TARGET, locator, "Handling PlayMedia command.");

    if player.focus.request_focus().await != FocusState::Granted {
        warn!(target: PLAYER_LOG_TARGET, locator, "Focus denied, refusing to play.");
        // Nothing may stay loaded without focus.
        player.session.release();
        player.broadcast_update(PlayerStateUpdate::Error(PlayerError::FocusDenied));
        return (Err(PlayerError::FocusDenied), Disposition::Terminate);
    }

    match player.session.load(locator) {
        Ok(()) => (Ok(()), Disposition::Continue),
        Err(e) => {
            warn!(target: PLAYER_LOG_TARGET, locator, "Load failed: {}", e);
            player.broadcast_update(PlayerStateUpdate::Error(e.clone()));
            (Err(e), Disposition::Continue)
        }
    }
}

#[instrument(skip(player), fields(state = %player.session.state()))]
pub fn handle_pause(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Handling PauseMedia command.");
    player.session.pause();
}

#[instrument(skip(player), fields(state = %player.session.state()))]
pub fn handle_resume(player: &mut Player) -> (Result<(), PlayerError>, Disposition) {
    info!(target: PLAYER_LOG_TARGET, "Handling ResumeMedia command.");
    match player.session.resume() {
        Ok(()) => (Ok(()), Disposition::Continue),
        Err(e) => {
            let disposition = failure_disposition(&e);
            player.broadcast_update(PlayerStateUpdate::Error(e.clone()));
            (Err(e), disposition)
        }
    }
}

#[instrument(skip(player), fields(state = %player.session.state()))]
pub fn handle_stop(player: &mut Player) {
    info!(target: PLAYER_LOG_TARGET, "Handling StopMedia command.");
    player.session.stop();
}

/// Engine faults the session acted on, reported errors and failed starts alike, are published.
fn handle_engine_event(player: &mut Player, resource: ResourceId, event: EngineEvent) -> Disposition {
    let disposition = player.session.handle_engine_event(resource, event);
    if let Some(fault) = player.session.take_fault() {
        player.broadcast_update(PlayerStateUpdate::Error(PlayerError::Engine(fault)));
    }
    disposition
}

fn handle_focus_change(player: &mut Player, change: FocusChange) -> Disposition {
    if !player.focus.is_registered() {
        // The adapter logs and drops it.
        let _ = player.focus.on_focus_changed(change, &mut player.session);
        return Disposition::Continue;
    }
    let outcome = player.focus.on_focus_changed(change, &mut player.session);
    player.broadcast_update(PlayerStateUpdate::FocusChanged { change, focus: player.focus.state() });
    match outcome {
        Ok(()) => Disposition::Continue,
        Err(e) => {
            warn!(target: PLAYER_LOG_TARGET, %change, "Focus change could not be applied: {}", e);
            let disposition = failure_disposition(&e);
            player.broadcast_update(PlayerStateUpdate::Error(e));
            disposition
        }
    }
}

/// Engine faults end the unit; the rest only fail the attempt.
fn failure_disposition(error: &PlayerError) -> Disposition {
    match error {
        PlayerError::Engine(_) => {
            debug!(target: PLAYER_LOG_TARGET, "Engine fault, unit will terminate.");
            Disposition::Terminate
        }
        _ => Disposition::Continue,
    }
}
