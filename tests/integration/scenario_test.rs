//! End-to-end playback scenarios driven through the player handle
//!
//! Each test runs a real player task against the scripted engine and the in-process arbiter.

use crate::test_utils::{transitions, Harness};
use r_focusplay::audio::{EngineEvent, ResourceCall, Volume};
use r_focusplay::focus::{FocusChange, FocusGain, FocusState};
use r_focusplay::player::{PlayerError, PlayerStateUpdate, SessionState};
use std::time::Duration;

#[cfg(test)]
mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_play_goes_through_loading_to_playing() {
        let mut h = Harness::new();

        h.handle.play_media("fileA").await.unwrap();
        let loading = h.snapshot().await;
        assert_eq!(loading.session, SessionState::Loading);
        assert_eq!(loading.focus, FocusState::Granted);
        let id = loading.resource.unwrap();
        assert!(!h.engine.is_playing(id));

        h.engine.emit(id, EngineEvent::Prepared);
        let playing = h.snapshot().await;
        assert_eq!(playing.session, SessionState::Playing);
        assert_eq!(playing.locator.as_deref(), Some("fileA"));
        assert!(h.engine.is_playing(id));
        assert_eq!(h.arbiter.holders().len(), 1);

        assert_eq!(
            transitions(&h.drain_updates()),
            vec![
                (SessionState::Idle, SessionState::Loading),
                (SessionState::Loading, SessionState::Playing),
            ]
        );
    }

    #[tokio::test]
    async fn test_focus_denied_creates_nothing_and_terminates() {
        let mut h = Harness::new();
        h.arbiter.set_locked(true);

        assert_eq!(h.handle.play_media("fileA").await, Err(PlayerError::FocusDenied));
        h.join().await;

        assert_eq!(h.engine.created_count(), 0);
        let updates = h.drain_updates();
        assert!(transitions(&updates).is_empty());
        assert_eq!(
            updates,
            vec![PlayerStateUpdate::Error(PlayerError::FocusDenied), PlayerStateUpdate::Terminated]
        );
        assert_eq!(h.handle.snapshot().await, Err(PlayerError::Terminated));
    }

    #[tokio::test]
    async fn test_transient_loss_pauses_then_gain_resumes_at_position() {
        let mut h = Harness::new();
        let id = h.start_playing("fileA").await;
        h.engine.set_position(id, Duration::from_millis(5_000));

        let call = h.interrupt(FocusGain::GainTransient).await;
        let paused = h.snapshot().await;
        assert_eq!(paused.session, SessionState::Paused);
        assert_eq!(paused.resource, Some(id));
        assert_eq!(paused.focus, FocusState::Granted);
        assert!(!h.engine.is_playing(id));

        h.give_back(call).await;
        let resumed = h.snapshot().await;
        assert_eq!(resumed.session, SessionState::Playing);
        assert_eq!(resumed.resource, Some(id));
        assert_eq!(resumed.position, Duration::from_millis(5_000));
        assert_eq!(resumed.volume, Some(Volume::FULL));
        assert_eq!(h.engine.created_count(), 1);

        let calls = h.engine.calls(id);
        let seek = calls.iter().position(|c| *c == ResourceCall::SeekTo(Duration::from_millis(5_000)));
        let last_start = calls.iter().rposition(|c| *c == ResourceCall::Start);
        assert!(seek.is_some() && seek < last_start);

        let focus_updates: Vec<FocusChange> = h
            .drain_updates()
            .into_iter()
            .filter_map(|u| match u {
                PlayerStateUpdate::FocusChanged { change, .. } => Some(change),
                _ => None,
            })
            .collect();
        assert_eq!(focus_updates, vec![FocusChange::LostTransient, FocusChange::Gained]);
    }

    #[tokio::test]
    async fn test_permanent_loss_releases_and_gain_builds_fresh_resource() {
        let h = Harness::new();
        let first = h.start_playing("fileA").await;

        let other = h.interrupt(FocusGain::Gain).await;
        let lost = h.snapshot().await;
        assert_eq!(lost.session, SessionState::Idle);
        assert_eq!(lost.resource, None);
        assert_eq!(lost.focus, FocusState::None);
        assert_eq!(h.engine.release_count(first), 1);

        h.give_back(other).await;
        let reloading = h.snapshot().await;
        assert_eq!(reloading.session, SessionState::Loading);
        assert_eq!(reloading.focus, FocusState::Granted);
        let fresh = reloading.resource.unwrap();
        assert_ne!(fresh, first);
        assert_eq!(h.engine.locator(fresh).as_deref(), Some("fileA"));
        // The released resource was never touched again.
        assert_eq!(h.engine.calls(first).last(), Some(&ResourceCall::Release));

        h.engine.emit(fresh, EngineEvent::Prepared);
        assert_eq!(h.snapshot().await.session, SessionState::Playing);
    }

    #[tokio::test]
    async fn test_completion_releases_and_terminates() {
        let mut h = Harness::new();
        let id = h.start_playing("fileA").await;

        h.engine.emit(id, EngineEvent::Completed);
        h.join().await;

        assert_eq!(h.engine.release_count(id), 1);
        assert!(h.arbiter.holders().is_empty());
        let calls_after_teardown = h.engine.calls(id).len();

        // Late callbacks for the finished resource go nowhere.
        h.engine.emit(id, EngineEvent::Prepared);
        h.engine.emit(id, EngineEvent::Completed);
        assert_eq!(h.engine.calls(id).len(), calls_after_teardown);
        assert_eq!(h.handle.resume_media().await, Err(PlayerError::Terminated));

        let updates = h.drain_updates();
        assert_eq!(transitions(&updates).last(), Some(&(SessionState::Playing, SessionState::Idle)));
        assert_eq!(updates.last(), Some(&PlayerStateUpdate::Terminated));
    }

    #[tokio::test]
    async fn test_engine_error_is_reported_and_terminates() {
        let mut h = Harness::new();
        let id = h.start_playing("fileA").await;
        let error = r_focusplay::audio::EngineError::new(
            r_focusplay::audio::MEDIA_ERROR_SERVER_DIED,
            r_focusplay::audio::MEDIA_ERROR_IO,
        );

        h.engine.emit(id, EngineEvent::Error(error));
        h.join().await;

        assert_eq!(h.engine.release_count(id), 1);
        let updates = h.drain_updates();
        assert!(updates.contains(&PlayerStateUpdate::Error(PlayerError::Engine(error))));
        assert_eq!(updates.last(), Some(&PlayerStateUpdate::Terminated));
    }

    #[tokio::test]
    async fn test_failed_start_after_prepared_is_reported() {
        let mut h = Harness::new();
        let error = r_focusplay::audio::EngineError::new(
            r_focusplay::audio::MEDIA_ERROR_SERVER_DIED,
            r_focusplay::audio::MEDIA_ERROR_IO,
        );
        h.engine.fail_start("fileA", error);

        h.handle.play_media("fileA").await.unwrap();
        let id = h.engine.latest().unwrap();
        h.engine.emit(id, EngineEvent::Prepared);
        h.join().await;

        assert_eq!(h.engine.release_count(id), 1);
        let updates = h.drain_updates();
        let reported = updates
            .iter()
            .position(|u| *u == PlayerStateUpdate::Error(PlayerError::Engine(error)));
        assert!(reported.is_some());
        assert_eq!(transitions(&updates).last(), Some(&(SessionState::Loading, SessionState::Idle)));
        assert_eq!(updates.last(), Some(&PlayerStateUpdate::Terminated));
    }

    #[tokio::test]
    async fn test_stop_while_loading_is_not_undone_by_prepared() {
        let h = Harness::new();
        h.handle.play_media("fileA").await.unwrap();
        let id = h.engine.latest().unwrap();

        h.handle.stop_media().await.unwrap();
        assert_eq!(h.snapshot().await.session, SessionState::Stopped);
        h.engine.emit(id, EngineEvent::Prepared);
        let stopped = h.snapshot().await;
        assert_eq!(stopped.session, SessionState::Stopped);
        assert_eq!(stopped.resource, Some(id));
        assert!(!h.engine.is_playing(id));

        h.handle.resume_media().await.unwrap();
        assert_eq!(h.snapshot().await.session, SessionState::Loading);
        h.engine.emit(id, EngineEvent::Prepared);
        assert_eq!(h.snapshot().await.session, SessionState::Playing);
        assert!(h.engine.is_playing(id));
    }

    #[tokio::test]
    async fn test_transient_loss_while_loading_holds_output_until_gain() {
        let h = Harness::new();
        h.handle.play_media("fileA").await.unwrap();
        let id = h.engine.latest().unwrap();

        let call = h.interrupt(FocusGain::GainTransient).await;
        assert_eq!(h.snapshot().await.session, SessionState::Paused);
        h.engine.emit(id, EngineEvent::Prepared);
        assert_eq!(h.snapshot().await.session, SessionState::Paused);
        assert!(!h.engine.is_playing(id));

        h.give_back(call).await;
        let resumed = h.snapshot().await;
        assert_eq!(resumed.session, SessionState::Playing);
        assert_eq!(resumed.volume, Some(Volume::FULL));
        assert!(h.engine.is_playing(id));
        assert_eq!(h.engine.created_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_source_fails_command_but_unit_survives() {
        let h = Harness::new();
        h.engine.mark_unavailable("missing.mp3");

        let result = h.handle.play_media("missing.mp3").await;
        assert!(matches!(result, Err(PlayerError::SourceUnavailable { .. })));
        let snapshot = h.snapshot().await;
        assert_eq!(snapshot.session, SessionState::Idle);
        assert_eq!(snapshot.resource, None);

        h.start_playing("fileB").await;
        assert_eq!(h.engine.live_resources().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_releases_abandons_and_rejects_later_calls() {
        let mut h = Harness::new();
        let id = h.start_playing("fileA").await;

        h.handle.shutdown().await.unwrap();
        h.join().await;

        assert_eq!(h.engine.release_count(id), 1);
        assert!(h.arbiter.holders().is_empty());
        assert!(h.handle.is_terminated());
        assert_eq!(h.handle.play_media("fileB").await, Err(PlayerError::Terminated));
        assert_eq!(h.handle.shutdown().await, Err(PlayerError::Terminated));
        assert_eq!(h.engine.created_count(), 1);
    }

    #[tokio::test]
    async fn test_dropping_every_handle_tears_down() {
        let h = Harness::new();
        let id = h.start_playing("fileA").await;
        let Harness { engine, arbiter, handle, task, .. } = h;

        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();

        assert_eq!(engine.release_count(id), 1);
        assert!(arbiter.holders().is_empty());
    }
}
