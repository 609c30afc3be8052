//! Refresh cycle: reachability changes and the polling fallback

mod helpers;

use helpers::*;
use sonos_sync::{MediaKind, TransportState};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unreachable_speaker_is_reset() {
    let household = FakeHousehold::three_rooms();
    let engine = engine_for(&household).await;
    let (living, kitchen) = (id(LIVING_ROOM), id(KITCHEN));
    engine.join(&living, &[kitchen.clone()]).await;

    household.set_reachable(KITCHEN, false);
    engine.refresh().await;

    let state = engine.device_state(&kitchen).unwrap();
    assert!(!state.available);
    assert_eq!(state.transport, TransportState::Off);
    assert_eq!(state.volume, None);
    assert_eq!(state.media.kind, MediaKind::None);
    assert_eq!(engine.group_of(&kitchen), vec![kitchen.clone()]);
    assert_eq!(engine.group_of(&living), vec![living.clone()]);
    assert_eq!(household.subscription_count(KITCHEN), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_returning_speaker_is_reinitialized() {
    let household = FakeHousehold::three_rooms();
    let engine = engine_for(&household).await;
    let (living, kitchen) = (id(LIVING_ROOM), id(KITCHEN));
    engine.join(&living, &[kitchen.clone()]).await;

    household.set_reachable(KITCHEN, false);
    engine.refresh().await;
    household.update_player(KITCHEN, |player| player.rendering.volume = 35);
    household.set_reachable(KITCHEN, true);
    engine.refresh().await;

    let state = engine.device_state(&kitchen).unwrap();
    assert!(state.available);
    assert_eq!(state.volume, Some(35));
    assert_eq!(household.subscription_count(KITCHEN), 4);
    // The player never left the group on its side
    assert!(eventually(|| engine.group_of(&kitchen) == vec![living.clone(), kitchen.clone()]).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_still_unreachable_speaker_is_left_alone() {
    let household = FakeHousehold::three_rooms();
    let engine = engine_for(&household).await;

    household.set_reachable(OFFICE, false);
    engine.refresh().await;
    engine.refresh().await;

    assert!(!engine.device_state(&id(OFFICE)).unwrap().available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_silent_channels_are_polled() {
    let household = FakeHousehold::three_rooms();
    household.block_events(true);
    let engine = engine_for(&household).await;
    let living = id(LIVING_ROOM);

    household.update_player(LIVING_ROOM, |player| {
        player.rendering.volume = 55;
        player.transport = "PLAYING".to_string();
    });
    engine.refresh().await;

    let state = engine.device_state(&living).unwrap();
    assert_eq!(state.volume, Some(55));
    assert_eq!(state.transport, TransportState::Playing);
    assert_eq!(state.media.kind, MediaKind::Track);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_speakers_receiving_events_are_not_polled() {
    let household = FakeHousehold::three_rooms();
    let engine = engine_for(&household).await;
    let (living, kitchen) = (id(LIVING_ROOM), id(KITCHEN));
    engine.join(&living, &[kitchen.clone()]).await;

    household.block_events(true);
    household.update_player(KITCHEN, |player| player.transport = "PLAYING".to_string());
    engine.refresh().await;

    // Every channel delivered once, so nothing is polled at all
    assert_ne!(
        engine.device_state(&kitchen).unwrap().transport,
        TransportState::Playing
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refresh_loop_runs_until_shutdown() {
    let household = FakeHousehold::three_rooms();
    household.block_events(true);
    let config = sonos_sync::EngineConfig {
        refresh_interval: std::time::Duration::from_millis(50),
        ..test_config()
    };
    let engine = engine_with(&household, config).await;
    let office = id(OFFICE);

    engine.spawn_refresh_loop();
    household.update_player(OFFICE, |player| player.rendering.volume = 64);
    assert!(eventually(|| engine.device_state(&office).unwrap().volume == Some(64)).await);

    engine.shutdown().await;
    assert_eq!(household.subscription_count(OFFICE), 0);
}
