//! Rooms talking to each other over one in-process hub

use std::sync::Arc;

use study_harbor::{
    presence::PresenceNotice,
    state::{Identity, TimerDurations, TimerMode, TimerPhase},
    sync::{ConnectionStatus, Room, RoomSettings, PRESENCE_CHANNEL, TIMER_CHANNEL},
    transport::{ManualClock, MemoryHub},
};

type TestRoom = Room<MemoryHub, Arc<ManualClock>>;

const START: i64 = 1_700_000_000_000;

fn settings() -> RoomSettings {
    RoomSettings {
        durations: TimerDurations::new(1_500_000, 300_000),
        reconnect_interval_ms: 5_000,
        ..RoomSettings::default()
    }
}

fn join(hub: &MemoryHub, clock: &Arc<ManualClock>, id: &str, name: &str) -> TestRoom {
    let mut room = Room::new(hub.clone(), Arc::clone(clock), Identity::new(id, name, "#C7D2FE"), settings()).unwrap();
    room.open();
    room
}

/// Let every room drain its queues a few times so request/answer pairs settle
fn settle(rooms: &mut [&mut TestRoom]) {
    for _ in 0..3 {
        for room in rooms.iter_mut() {
            room.pump();
        }
    }
}

#[test]
fn test_join_and_leave_notices() {
    let hub = MemoryHub::new();
    let clock = Arc::new(ManualClock::new(START));
    let mut ada = join(&hub, &clock, "guest-ada001", "Ada");
    let mut bo = join(&hub, &clock, "guest-bo0002", "Bo");

    ada.pump();
    let bo_notices = bo.pump();
    let ada_notices = ada.pump();

    assert_eq!(bo_notices.iter().map(PresenceNotice::message).collect::<Vec<_>>(), vec!["Ada joined"]);
    assert_eq!(ada_notices.len(), 1);
    assert_eq!(ada_notices[0].id(), "guest-bo0002");
    assert_eq!(ada.online_count(), 1);
    assert_eq!(bo.online_count(), 1);

    bo.close();
    let notices = ada.pump();
    assert_eq!(notices.len(), 1);
    assert!(matches!(&notices[0], PresenceNotice::Left { id, .. } if id == "guest-bo0002"));
    assert_eq!(notices[0].message(), "Bo left");
    assert_eq!(ada.online_count(), 0);
    assert_eq!(ada.notices().count(), 2);
}

#[test]
fn test_remote_avatar_follows_published_position() {
    let hub = MemoryHub::new();
    let clock = Arc::new(ManualClock::new(START));
    let mut ada = join(&hub, &clock, "guest-ada001", "Ada");
    let mut bo = join(&hub, &clock, "guest-bo0002", "Bo");
    settle(&mut [&mut ada, &mut bo]);

    bo.move_to(0.9, 0.2);
    for _ in 0..80 {
        clock.advance(100);
        bo.frame();
        ada.pump();
        ada.frame();
    }

    let local = bo.reconciler().local_position();
    assert_eq!((local.x, local.y), (0.9, 0.2));
    let remote = ada.reconciler().remote("guest-bo0002").unwrap();
    assert!((remote.target_x - 0.9).abs() < 1e-9);
    assert!((remote.target_y - 0.2).abs() < 1e-9);
    assert!((remote.x - 0.9).abs() < 0.01);
    assert!((remote.y - 0.2).abs() < 0.01);
}

#[test]
fn test_shared_timer_reaches_peer_through_sync_request() {
    let hub = MemoryHub::new();
    let clock = Arc::new(ManualClock::new(START));
    let mut ada = join(&hub, &clock, "guest-ada001", "Ada");
    let mut bo = join(&hub, &clock, "guest-bo0002", "Bo");
    settle(&mut [&mut ada, &mut bo]);

    ada.toggle_mode().unwrap();
    ada.toggle_running();
    clock.advance(60_000);
    ada.tick_timer().unwrap();
    assert_eq!(ada.timer_state().remaining_ms, 1_440_000);

    // Bo is still solo: the snapshot is cached, not shown.
    bo.pump();
    assert_eq!(bo.timer_state().mode, TimerMode::Solo);
    assert_eq!(bo.timer_state().remaining_ms, 1_500_000);
    assert_eq!(bo.shared_snapshot().map(|s| s.remaining_ms), Some(1_440_000));

    clock.advance(500);
    let joined = bo.toggle_mode().unwrap();
    assert_eq!(joined.mode, TimerMode::Shared);
    assert_eq!(joined.remaining_ms, 1_440_000);
    assert!(joined.is_running);

    // Ada answers Bo's request with her live timer.
    ada.tick_timer().unwrap();
    ada.pump();
    bo.pump();
    assert_eq!(bo.timer_state().remaining_ms, ada.timer_state().remaining_ms);
    assert_eq!(bo.timer_state().phase, TimerPhase::Focus);
    assert!(bo.timer_state().is_running);
}

#[test]
fn test_peer_actions_propagate_in_shared_mode() {
    let hub = MemoryHub::new();
    let clock = Arc::new(ManualClock::new(START));
    let mut ada = join(&hub, &clock, "guest-ada001", "Ada");
    let mut bo = join(&hub, &clock, "guest-bo0002", "Bo");
    settle(&mut [&mut ada, &mut bo]);

    ada.toggle_mode().unwrap();
    bo.toggle_mode().unwrap();
    settle(&mut [&mut ada, &mut bo]);

    bo.skip_phase().unwrap();
    ada.pump();
    assert_eq!(ada.timer_state().phase, TimerPhase::Break);
    assert_eq!(ada.timer_state().remaining_ms, 300_000);
    assert_eq!(ada.timer_state().last_updated_at, START);

    ada.toggle_running();
    bo.pump();
    assert!(bo.timer_state().is_running);

    ada.reset_timer().unwrap();
    bo.pump();
    assert_eq!(bo.timer_state().phase, TimerPhase::Focus);
    assert!(!bo.timer_state().is_running);
}

#[test]
fn test_solo_room_is_unaffected_by_shared_updates() {
    let hub = MemoryHub::new();
    let clock = Arc::new(ManualClock::new(START));
    let mut ada = join(&hub, &clock, "guest-ada001", "Ada");
    let mut cy = join(&hub, &clock, "guest-cy0003", "Cy");
    settle(&mut [&mut ada, &mut cy]);

    cy.toggle_running();
    ada.toggle_mode().unwrap();
    ada.skip_phase().unwrap();
    clock.advance(1_000);
    cy.tick_timer().unwrap();
    cy.pump();

    assert_eq!(cy.timer_state().mode, TimerMode::Solo);
    assert_eq!(cy.timer_state().phase, TimerPhase::Focus);
    assert_eq!(cy.timer_state().remaining_ms, 1_499_000);
    assert_eq!(cy.shared_snapshot().map(|s| s.phase), Some(TimerPhase::Break));
}

#[test]
fn test_outage_reconnects_and_resyncs() {
    let hub = MemoryHub::new();
    let clock = Arc::new(ManualClock::new(START));
    let mut ada = join(&hub, &clock, "guest-ada001", "Ada");
    let mut bo = join(&hub, &clock, "guest-bo0002", "Bo");
    settle(&mut [&mut ada, &mut bo]);
    ada.toggle_mode().unwrap();
    bo.toggle_mode().unwrap();
    settle(&mut [&mut ada, &mut bo]);
    assert_eq!(ada.connection_status(), ConnectionStatus::Connected);

    hub.set_online(false);
    ada.pump();
    bo.pump();
    assert_eq!(ada.connection_status(), ConnectionStatus::Error);

    // Local control keeps working while the transport is down.
    ada.toggle_running();
    assert!(ada.timer_state().is_running);
    assert!(!bo.timer_state().is_running);

    clock.advance(5_000);
    ada.maintain();
    assert_eq!(ada.connection_status(), ConnectionStatus::Error);

    hub.set_online(true);
    clock.advance(1_000);
    ada.maintain();
    assert_eq!(ada.connection_status(), ConnectionStatus::Error, "retry waits for the interval");

    clock.advance(4_000);
    ada.maintain();
    assert_eq!(ada.connection_status(), ConnectionStatus::Connecting);

    ada.pump();
    assert_eq!(ada.connection_status(), ConnectionStatus::Connected);
    bo.pump();
    assert_eq!(bo.connection_status(), ConnectionStatus::Connected);
    ada.pump();

    // Ada's reconnect sync request pulled Bo's stopped timer back in.
    assert!(!ada.timer_state().is_running);
    assert_eq!(ada.online_count(), 1);
    assert_eq!(hub.subscriber_count(PRESENCE_CHANNEL), 2);
}

#[test]
fn test_close_releases_every_subscription() {
    let hub = MemoryHub::new();
    let clock = Arc::new(ManualClock::new(START));
    let mut ada = join(&hub, &clock, "guest-ada001", "Ada");
    let bo = join(&hub, &clock, "guest-bo0002", "Bo");
    ada.pump();
    assert_eq!(hub.subscriber_count(TIMER_CHANNEL), 2);

    ada.close();
    drop(bo);
    assert_eq!(hub.subscriber_count(PRESENCE_CHANNEL), 0);
    assert_eq!(hub.subscriber_count(TIMER_CHANNEL), 0);
    assert!(hub.members(PRESENCE_CHANNEL).is_empty());
    assert_eq!(ada.connection_status(), ConnectionStatus::Idle);
    assert_eq!(ada.online_count(), 0);
}
