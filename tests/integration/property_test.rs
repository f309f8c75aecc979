//! Resource, callback and focus guarantees checked across longer command sequences

use crate::test_utils::Harness;
use r_focusplay::audio::{
    EngineError, EngineEvent, ResourceCall, ScriptedEngine, Volume, MEDIA_ERROR_MALFORMED, MEDIA_ERROR_UNKNOWN,
};
use r_focusplay::focus::{FocusGain, FocusState};
use r_focusplay::player::{PlayerError, SessionState};
use std::time::Duration;

#[cfg(test)]
mod property_tests {
    use super::*;

    fn assert_each_released_once(engine: &ScriptedEngine) {
        for id in engine.resource_ids() {
            assert_eq!(engine.release_count(id), 1, "{} must be released exactly once", id);
        }
    }

    #[tokio::test]
    async fn test_every_resource_released_exactly_once() {
        let mut h = Harness::new();
        h.start_playing("fileA").await;
        h.start_playing("fileB").await;
        h.handle.pause_media().await.unwrap();
        h.handle.stop_media().await.unwrap();

        let other = h.interrupt(FocusGain::Gain).await;
        h.snapshot().await;
        h.give_back(other).await;
        // The reload is still loading when the unit shuts down.
        assert_eq!(h.snapshot().await.session, SessionState::Loading);

        h.handle.shutdown().await.unwrap();
        h.join().await;

        assert_eq!(h.engine.created_count(), 3);
        assert!(h.engine.live_resources().is_empty());
        assert_each_released_once(&h.engine);
    }

    #[tokio::test]
    async fn test_failed_loads_do_not_leak() {
        let mut h = Harness::new();
        h.engine.mark_unavailable("bad-1");
        h.engine.mark_unavailable("bad-2");

        assert!(h.handle.play_media("bad-1").await.is_err());
        assert!(h.handle.play_media("bad-2").await.is_err());
        h.handle.shutdown().await.unwrap();
        h.join().await;

        assert_eq!(h.engine.created_count(), 2);
        assert_each_released_once(&h.engine);
    }

    #[tokio::test]
    async fn test_callbacks_for_abandoned_resource_are_ignored() {
        let h = Harness::new();
        h.handle.play_media("fileA").await.unwrap();
        let abandoned = h.engine.latest().unwrap();
        // Replacing the resource while it is still loading releases it.
        h.handle.play_media("fileB").await.unwrap();
        let current = h.engine.latest().unwrap();
        assert_eq!(h.engine.release_count(abandoned), 1);

        h.engine.emit(abandoned, EngineEvent::Prepared);
        h.engine.emit(
            abandoned,
            EngineEvent::Error(EngineError::new(MEDIA_ERROR_UNKNOWN, MEDIA_ERROR_MALFORMED)),
        );
        h.engine.emit(abandoned, EngineEvent::Completed);

        let snapshot = h.snapshot().await;
        assert_eq!(snapshot.session, SessionState::Loading);
        assert_eq!(snapshot.resource, Some(current));
        assert!(!h.handle.is_terminated());
        assert!(!h.engine.calls(abandoned).contains(&ResourceCall::Start));
        assert_eq!(h.engine.calls(abandoned).last(), Some(&ResourceCall::Release));
    }

    #[tokio::test]
    async fn test_no_resource_survives_denied_focus() {
        let mut h = Harness::new();
        let first = h.start_playing("fileA").await;

        h.arbiter.set_locked(true);
        assert_eq!(h.handle.play_media("fileB").await, Err(PlayerError::FocusDenied));
        h.join().await;

        assert_eq!(h.engine.created_count(), 1);
        assert_eq!(h.engine.release_count(first), 1);
        assert!(h.engine.live_resources().is_empty());
        assert!(h.arbiter.holders().is_empty());
    }

    #[tokio::test]
    async fn test_pause_resume_keeps_position_and_resource() {
        let h = Harness::new();
        let id = h.start_playing("fileA").await;
        h.engine.set_position(id, Duration::from_millis(73_250));

        h.handle.pause_media().await.unwrap();
        let paused = h.snapshot().await;
        assert_eq!(paused.session, SessionState::Paused);
        assert_eq!(paused.position, Duration::from_millis(73_250));

        h.handle.resume_media().await.unwrap();
        let resumed = h.snapshot().await;
        assert_eq!(resumed.session, SessionState::Playing);
        assert_eq!(resumed.position, Duration::from_millis(73_250));
        assert_eq!(resumed.resource, Some(id));
        assert_eq!(h.engine.created_count(), 1);
    }

    #[tokio::test]
    async fn test_ducking_is_reversible() {
        let h = Harness::new();
        let id = h.start_playing("fileA").await;

        let chime = h.interrupt(FocusGain::GainTransientMayDuck).await;
        let ducked = h.snapshot().await;
        assert_eq!(ducked.session, SessionState::Playing);
        assert_eq!(ducked.volume, Some(Volume::uniform(0.1)));
        assert!(h.engine.is_playing(id));

        h.give_back(chime).await;
        let restored = h.snapshot().await;
        assert_eq!(restored.session, SessionState::Playing);
        assert_eq!(restored.volume, Some(Volume::FULL));
        assert_eq!(restored.focus, FocusState::Granted);
        assert!(!h.engine.calls(id).contains(&ResourceCall::Pause));
    }

    #[tokio::test]
    async fn test_duck_while_paused_leaves_volume_alone() {
        let h = Harness::new();
        let id = h.start_playing("fileA").await;
        h.handle.pause_media().await.unwrap();

        let chime = h.interrupt(FocusGain::GainTransientMayDuck).await;
        assert_eq!(h.snapshot().await.volume, Some(Volume::FULL));
        assert!(!h.engine.calls(id).iter().any(|c| matches!(c, ResourceCall::SetVolume(_))));

        // Gained resumes whatever resource exists, then restores full volume.
        h.give_back(chime).await;
        let after = h.snapshot().await;
        assert_eq!(after.session, SessionState::Playing);
        assert_eq!(after.volume, Some(Volume::FULL));
    }

    #[tokio::test]
    async fn test_resume_without_resource_fails() {
        let h = Harness::new();
        assert_eq!(h.handle.resume_media().await, Err(PlayerError::NoActiveResource));
        // Pause and stop are no-ops without a resource.
        assert_eq!(h.handle.pause_media().await, Ok(()));
        assert_eq!(h.handle.stop_media().await, Ok(()));
        assert_eq!(h.snapshot().await.session, SessionState::Idle);
        assert!(!h.handle.is_terminated());
    }

    #[tokio::test]
    async fn test_stop_then_resume_prepares_again() {
        let h = Harness::new();
        let id = h.start_playing("fileA").await;

        h.handle.stop_media().await.unwrap();
        assert_eq!(h.snapshot().await.session, SessionState::Stopped);
        h.handle.resume_media().await.unwrap();
        assert_eq!(h.snapshot().await.session, SessionState::Loading);

        h.engine.emit(id, EngineEvent::Prepared);
        assert_eq!(h.snapshot().await.session, SessionState::Playing);
        let prepares = h.engine.calls(id).iter().filter(|c| **c == ResourceCall::PrepareAsync).count();
        assert_eq!(prepares, 2);
    }

    #[tokio::test]
    async fn test_auto_prepared_engine_plays_without_help() {
        let h = Harness::with_engine(ScriptedEngine::new().with_auto_prepare());
        h.handle.play_media("fileA").await.unwrap();
        assert_eq!(h.snapshot().await.session, SessionState::Playing);
    }
}
