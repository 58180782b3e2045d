//! Notification channel integration tests
//!
//! Tests for the real-time channel including:
//! - Joining the user's room
//! - Alert de-duplication and the read/unread log
//! - Bulk mark-read and clear
//! - Reconnect budget and shutdown

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use common::*;
use pocket_farm_client::channel::NotificationChannel;
use pocket_farm_client::{ChannelEvent, ChannelState, ClientError, WateringStatusStore};
use shared::{
    AlertEvent, AlertType, AlertValue, CareReminder, ClientEvent, ServerEvent, WeatherSnapshot,
};

fn channel_with(
    transport: &Arc<ScriptedTransport>,
    api: &Arc<FakeNotificationApi>,
) -> NotificationChannel {
    NotificationChannel::connect(
        USER,
        realtime_config(),
        transport.clone(),
        api.clone(),
        None,
    )
}

async fn wait_connected(channel: &NotificationChannel) {
    let mut state = channel.subscribe_state();
    tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| matches!(s, ChannelState::Connected { .. })),
    )
    .await
    .expect("channel did not connect")
    .unwrap();
}

fn heavy_rain() -> AlertEvent {
    AlertEvent::new(AlertType::HeavyRain, AlertValue::Text("Rain".to_string()))
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_joins_user_room() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);

    wait_connected(&channel).await;

    assert_eq!(
        channel.state(),
        ChannelState::Connected {
            room: "user_7".to_string()
        }
    );
    assert_eq!(server.sent()[0], ClientEvent::JoinRoom { user_id: USER });
    channel.shutdown().await;
}

#[tokio::test]
async fn test_join_syncs_persisted_notifications() {
    let transport = ScriptedTransport::new();
    let _server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    api.records
        .lock()
        .unwrap()
        .push(stored_notification(1, "Time to water your Tomato today!"));
    let channel = channel_with(&transport, &api);

    wait_connected(&channel).await;

    assert!(wait_until(|| channel.notifications().len() == 1).await);
    assert_eq!(channel.unread_count(), 1);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_weather_snapshot_is_kept_and_broadcast() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    let mut events = channel.events();
    wait_connected(&channel).await;

    let snapshot = WeatherSnapshot {
        observed_at: Utc::now(),
        location: None,
        temperature_celsius: Decimal::from(28),
        humidity_percent: 70,
        wind_speed_mps: Decimal::from(2),
        rain_1h_mm: None,
        condition: "Clouds".to_string(),
        description: "broken clouds".to_string(),
    };
    server.push(ServerEvent::WeatherSnapshot(snapshot.clone()));

    assert!(wait_until(|| channel.latest_weather().is_some()).await);
    assert_eq!(channel.latest_weather(), Some(snapshot.clone()));
    loop {
        if let ChannelEvent::Weather(received) = events.recv().await.unwrap() {
            assert_eq!(received, snapshot);
            break;
        }
    }
    channel.shutdown().await;
}

// ============================================================================
// Alerts and de-duplication
// ============================================================================

#[tokio::test]
async fn test_duplicate_alert_is_suppressed() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    let mut events = channel.events();
    wait_connected(&channel).await;

    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    server.push(ServerEvent::Pong);
    assert!(wait_until(|| channel.notifications().len() == 1).await);

    // Give the second alert time to be (not) recorded
    tokio::time::sleep(Duration::from_millis(50)).await;
    let records = channel.notifications();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].message,
        "Heavy rain alert! Consider protecting your plants."
    );
    assert!(!records[0].read);

    let mut alerts = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ChannelEvent::Alert(_)) {
            alerts += 1;
        }
    }
    assert_eq!(alerts, 1);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_alert_stays_collapsed_after_rejoin() {
    let transport = ScriptedTransport::new();
    let first = transport.accept_and_join(USER);
    let second = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    wait_connected(&channel).await;

    let message = heavy_rain().message;
    first.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    first.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    assert!(wait_until(|| channel.notifications().len() == 1).await);

    // Server copy holds both deliveries
    {
        let mut stored = api.records.lock().unwrap();
        stored.push(stored_notification(2, &message));
        stored.push(stored_notification(1, &message));
    }

    first.frames.send(Frame::Close).unwrap();
    assert!(wait_until(|| api.list_calls.load(Ordering::SeqCst) >= 2).await);
    wait_connected(&channel).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let records = channel.notifications();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, message);

    second.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    second.push(ServerEvent::Pong);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(channel.notifications().len(), 1);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_distinct_alerts_in_one_frame_are_all_recorded() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    wait_connected(&channel).await;

    server.push(ServerEvent::WeatherAlert(vec![
        heavy_rain(),
        AlertEvent::new(AlertType::StrongWind, AlertValue::Number(Decimal::from(40))),
    ]));

    assert!(wait_until(|| channel.notifications().len() == 2).await);
    assert_eq!(channel.unread_count(), 2);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_malformed_frame_is_skipped() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    wait_connected(&channel).await;

    server.frames.send(Frame::Malformed).unwrap();
    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));

    assert!(wait_until(|| channel.notifications().len() == 1).await);
    assert!(matches!(channel.state(), ChannelState::Connected { .. }));
    assert_eq!(transport.connect_count(), 1);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_care_reminder_invalidates_store() {
    let schedules = FakeScheduleApi::with_records(vec![record("Tomato", false)]);
    let store = WateringStatusStore::spawn(USER, schedules.clone());
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = NotificationChannel::connect(
        USER,
        realtime_config(),
        transport.clone(),
        api.clone(),
        Some(store.invalidator()),
    );
    wait_connected(&channel).await;

    // Joining reloads the store once
    assert!(wait_until(|| schedules.lists() == 1).await);

    server.push(ServerEvent::CareReminder(CareReminder::watering(
        "Tomato",
        date("2024-05-04"),
    )));

    assert!(wait_until(|| schedules.lists() == 2).await);
    assert!(wait_until(|| channel.notifications().len() == 1).await);
    assert_eq!(
        channel.notifications()[0].message,
        "Time to water your Tomato today!"
    );

    server.push(ServerEvent::ScheduleChanged {
        crop_names: vec!["Tomato".to_string()],
    });
    assert!(wait_until(|| schedules.lists() == 3).await);
    channel.shutdown().await;
}

// ============================================================================
// Bulk operations
// ============================================================================

#[tokio::test]
async fn test_mark_all_read_without_unread_sends_nothing() {
    let transport = ScriptedTransport::new();
    let _server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    wait_connected(&channel).await;

    assert_eq!(channel.mark_all_read().await.unwrap(), 0);
    assert_eq!(api.mark_calls.load(Ordering::SeqCst), 0);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_mark_all_read_marks_unread_records() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    wait_connected(&channel).await;

    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    assert!(wait_until(|| channel.unread_count() == 1).await);

    assert_eq!(channel.mark_all_read().await.unwrap(), 1);
    assert_eq!(channel.unread_count(), 0);
    assert_eq!(channel.notifications().len(), 1);
    assert_eq!(api.mark_calls.load(Ordering::SeqCst), 1);

    // Acknowledged, so the same alert is recorded again
    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    assert!(wait_until(|| channel.unread_count() == 1).await);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_failed_mark_all_read_leaves_log_unchanged() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    let mut events = channel.events();
    wait_connected(&channel).await;

    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    assert!(wait_until(|| channel.unread_count() == 1).await);

    api.fail.store(true, Ordering::SeqCst);
    let result = channel.mark_all_read().await;
    assert!(matches!(result, Err(ClientError::Service { .. })));
    assert_eq!(channel.unread_count(), 1);

    let mut failed = false;
    while let Ok(event) = events.try_recv() {
        if let ChannelEvent::OperationFailed { operation, .. } = event {
            assert_eq!(operation, "mark_all_read");
            failed = true;
        }
    }
    assert!(failed);
    channel.shutdown().await;
}

#[tokio::test]
async fn test_clear_all_removes_records() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    wait_connected(&channel).await;

    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    assert!(wait_until(|| channel.notifications().len() == 1).await);

    assert_eq!(channel.clear_all().await.unwrap(), 1);
    assert!(channel.notifications().is_empty());
    assert_eq!(api.clear_calls.load(Ordering::SeqCst), 1);

    api.fail.store(true, Ordering::SeqCst);
    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    assert!(wait_until(|| channel.notifications().len() == 1).await);
    assert!(channel.clear_all().await.is_err());
    assert_eq!(channel.notifications().len(), 1);
    channel.shutdown().await;
}

// ============================================================================
// Reconnect and shutdown
// ============================================================================

#[tokio::test]
async fn test_reconnects_after_drop_and_rejoins() {
    let transport = ScriptedTransport::new();
    let first = transport.accept_and_join(USER);
    let second = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    wait_connected(&channel).await;

    first.frames.send(Frame::Close).unwrap();

    assert!(wait_until(|| transport.connect_count() == 2).await);
    wait_connected(&channel).await;
    assert!(first.is_closed());
    assert!(wait_until(|| !second.sent().is_empty()).await);
    assert_eq!(second.sent()[0], ClientEvent::JoinRoom { user_id: USER });
    channel.shutdown().await;
}

#[tokio::test]
async fn test_gives_up_after_attempt_budget() {
    let transport = ScriptedTransport::new();
    let unjoined = transport.accept();
    unjoined.frames.send(Frame::Close).unwrap();
    transport.refuse();
    // Anything beyond the budget would be refused too
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);

    assert!(wait_until(|| transport.connect_count() == 3).await);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(transport.connect_count(), 3);
    assert_eq!(channel.state(), ChannelState::Disconnected);
    assert!(unjoined.is_closed());
    channel.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_interrupts_backoff() {
    let transport = ScriptedTransport::new();
    let api = Arc::new(FakeNotificationApi::default());
    let mut config = realtime_config();
    config.reconnect_base_delay_ms = 60_000;
    config.reconnect_max_delay_ms = 60_000;
    let channel = NotificationChannel::connect(USER, config, transport.clone(), api.clone(), None);

    assert!(wait_until(|| transport.connect_count() == 1).await);

    tokio::time::timeout(Duration::from_secs(1), channel.shutdown())
        .await
        .expect("shutdown waited for backoff");
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(channel.state(), ChannelState::Disconnected);
}

#[tokio::test]
async fn test_shutdown_closes_connection_and_clears_log() {
    let transport = ScriptedTransport::new();
    let server = transport.accept_and_join(USER);
    let api = Arc::new(FakeNotificationApi::default());
    let channel = channel_with(&transport, &api);
    wait_connected(&channel).await;

    server.push(ServerEvent::WeatherAlert(vec![heavy_rain()]));
    assert!(wait_until(|| channel.notifications().len() == 1).await);

    channel.shutdown().await;

    assert!(server.is_closed());
    assert!(channel.notifications().is_empty());
    assert_eq!(channel.state(), ChannelState::Disconnected);
}
