//! Real-time notification channel
//!
//! One connection per signed-in session. A background task connects, joins
//! the user's room and dispatches pushed events, reconnecting with capped
//! exponential backoff until the attempt budget runs out or the session ends.

mod log;
mod transport;

pub use log::{DedupKey, NotificationLog};
pub use transport::{RealtimeConnection, RealtimeTransport, WsTransport};

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shared::{
    AlertEvent, CareReminder, ClientEvent, NotificationRecord, ServerEvent, UserId,
    WeatherSnapshot,
};

use crate::api::NotificationApi;
use crate::config::RealtimeConfig;
use crate::error::{ClientError, ClientResult};
use crate::store::ScheduleInvalidator;

const EVENT_CAPACITY: usize = 128;

/// Connection lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected { room: String },
}

/// Events re-broadcast to views
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    State(ChannelState),
    Weather(WeatherSnapshot),
    /// Transient alert; the log already holds its record
    Alert(AlertEvent),
    Reminder(CareReminder),
    ScheduleChanged { crop_names: Vec<String> },
    OperationFailed { operation: &'static str, reason: String },
}

/// State shared between the channel handle and its connection task
struct ChannelShared {
    user_id: UserId,
    log: Mutex<NotificationLog>,
    latest_weather: Mutex<Option<WeatherSnapshot>>,
    state: watch::Sender<ChannelState>,
    events: broadcast::Sender<ChannelEvent>,
    api: Arc<dyn NotificationApi>,
    invalidator: Option<ScheduleInvalidator>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl ChannelShared {
    fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state.clone());
        let _ = self.events.send(ChannelEvent::State(state));
    }

    fn broadcast(&self, event: ChannelEvent) {
        let _ = self.events.send(event);
    }

    fn invalidate_schedule(&self) {
        if let Some(invalidator) = &self.invalidator {
            if !invalidator.invalidate() {
                debug!(user_id = %self.user_id, "Schedule store already closed");
            }
        }
    }

    /// Pull the persisted log after joining; failures keep the local log
    async fn sync_log(&self) {
        match self.api.list_notifications(self.user_id, false).await {
            Ok(records) => lock(&self.log).replace_with(records),
            Err(e) => warn!(user_id = %self.user_id, error = %e, "Notification sync failed"),
        }
    }

    async fn handle_event(&self, event: ServerEvent) {
        match event {
            ServerEvent::Joined { room } => {
                info!(user_id = %self.user_id, room = %room, "Joined notification room");
                self.set_state(ChannelState::Connected { room });
                self.sync_log().await;
                self.invalidate_schedule();
            }
            ServerEvent::WeatherSnapshot(snapshot) => {
                *lock(&self.latest_weather) = Some(snapshot.clone());
                self.broadcast(ChannelEvent::Weather(snapshot));
            }
            ServerEvent::WeatherAlert(alerts) => {
                for alert in alerts {
                    let appended = lock(&self.log).append(
                        DedupKey::alert(&alert),
                        alert.message.clone(),
                        Utc::now(),
                    );
                    match appended {
                        Some(_) => self.broadcast(ChannelEvent::Alert(alert)),
                        None => debug!(alert_type = %alert.alert_type, "Suppressed duplicate alert"),
                    }
                }
            }
            ServerEvent::CareReminder(reminder) => {
                let appended = lock(&self.log).append(
                    DedupKey::reminder(&reminder),
                    reminder.message.clone(),
                    Utc::now(),
                );
                self.invalidate_schedule();
                if appended.is_some() {
                    self.broadcast(ChannelEvent::Reminder(reminder));
                }
            }
            ServerEvent::ScheduleChanged { crop_names } => {
                self.invalidate_schedule();
                self.broadcast(ChannelEvent::ScheduleChanged { crop_names });
            }
            ServerEvent::Pong => debug!(user_id = %self.user_id, "Pong"),
        }
    }
}

/// Handle to a user's notification channel
pub struct NotificationChannel {
    shared: Arc<ChannelShared>,
    state: watch::Receiver<ChannelState>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationChannel {
    /// Start the connection task for a user
    pub fn connect(
        user_id: UserId,
        config: RealtimeConfig,
        transport: Arc<dyn RealtimeTransport>,
        api: Arc<dyn NotificationApi>,
        invalidator: Option<ScheduleInvalidator>,
    ) -> Self {
        let (state_tx, state) = watch::channel(ChannelState::Disconnected);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let shared = Arc::new(ChannelShared {
            user_id,
            log: Mutex::new(NotificationLog::new(config.dedup_window())),
            latest_weather: Mutex::new(None),
            state: state_tx,
            events,
            api,
            invalidator,
        });

        let task = tokio::spawn(connection_loop(
            Arc::clone(&shared),
            config,
            transport,
            shutdown_rx,
        ));

        Self {
            shared,
            state,
            shutdown,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.shared.user_id
    }

    pub fn state(&self) -> ChannelState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.shared.events.subscribe()
    }

    /// Notifications, newest first
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        lock(&self.shared.log).records().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        lock(&self.shared.log).unread_count()
    }

    pub fn latest_weather(&self) -> Option<WeatherSnapshot> {
        lock(&self.shared.latest_weather).clone()
    }

    /// Mark every unread notification read
    ///
    /// Skips the request when nothing is unread. Local records change only
    /// after the server accepts; records arriving meanwhile stay unread.
    pub async fn mark_all_read(&self) -> ClientResult<usize> {
        let unread = lock(&self.shared.log).unread_ids();
        if unread.is_empty() {
            return Ok(0);
        }

        match self.shared.api.mark_all_read(self.shared.user_id).await {
            Ok(_) => Ok(lock(&self.shared.log).mark_read(&unread)),
            Err(e) => Err(self.operation_failed("mark_all_read", e)),
        }
    }

    /// Clear every notification present when the request is made
    pub async fn clear_all(&self) -> ClientResult<usize> {
        let present = lock(&self.shared.log).all_ids();

        match self.shared.api.clear_all(self.shared.user_id).await {
            Ok(_) => Ok(lock(&self.shared.log).remove(&present)),
            Err(e) => Err(self.operation_failed("clear_all", e)),
        }
    }

    fn operation_failed(&self, operation: &'static str, error: ClientError) -> ClientError {
        warn!(user_id = %self.shared.user_id, operation, error = %error, "Notification operation failed");
        self.shared.broadcast(ChannelEvent::OperationFailed {
            operation,
            reason: error.to_string(),
        });
        error
    }

    /// Stop reconnecting, close the connection and wait for the task to end
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let task = lock(&self.task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Notification channel task ended abnormally");
            }
        }
        lock(&self.shared.log).clear();
        *lock(&self.shared.latest_weather) = None;
    }
}

enum SessionEnd {
    Shutdown,
    Dropped { joined: bool },
}

async fn connection_loop(
    shared: Arc<ChannelShared>,
    config: RealtimeConfig,
    transport: Arc<dyn RealtimeTransport>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }
        if attempt >= config.max_reconnect_attempts {
            warn!(user_id = %shared.user_id, attempt, "Giving up on notification channel");
            break;
        }
        attempt += 1;
        shared.set_state(ChannelState::Connecting { attempt });

        let connected = tokio::select! {
            result = transport.connect(&config.url) => result,
            _ = shutdown.changed() => break,
        };

        match connected {
            Ok(mut conn) => {
                let end = serve(&shared, &config, &mut conn, &mut shutdown).await;
                conn.close().await;
                shared.set_state(ChannelState::Disconnected);
                match end {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Dropped { joined } => {
                        warn!(user_id = %shared.user_id, attempt, "Notification channel dropped");
                        if joined {
                            attempt = 0;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(user_id = %shared.user_id, attempt, error = %e, "Notification channel connect failed");
            }
        }

        if attempt >= config.max_reconnect_attempts {
            continue;
        }
        let delay = config.backoff_delay(attempt.max(1));
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    shared.set_state(ChannelState::Disconnected);
    debug!(user_id = %shared.user_id, "Notification channel stopped");
}

/// Run one connected session until it drops or shutdown is requested
async fn serve(
    shared: &ChannelShared,
    config: &RealtimeConfig,
    conn: &mut Box<dyn RealtimeConnection>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let join = ClientEvent::JoinRoom {
        user_id: shared.user_id,
    };
    if let Err(e) = conn.send(&join).await {
        warn!(user_id = %shared.user_id, error = %e, "Failed to join notification room");
        return SessionEnd::Dropped { joined: false };
    }

    let mut joined = false;
    let mut ping = tokio::time::interval(config.ping_interval());
    // Skip the first immediate tick.
    ping.tick().await;

    loop {
        tokio::select! {
            frame = conn.next_event() => match frame {
                Some(Ok(event)) => {
                    if matches!(event, ServerEvent::Joined { .. }) {
                        joined = true;
                    }
                    shared.handle_event(event).await;
                }
                Some(Err(ClientError::Decode(e))) => {
                    warn!(user_id = %shared.user_id, error = %e, "Ignoring malformed frame");
                }
                Some(Err(e)) => {
                    warn!(user_id = %shared.user_id, error = %e, "Notification channel read failed");
                    return SessionEnd::Dropped { joined };
                }
                None => return SessionEnd::Dropped { joined },
            },
            _ = ping.tick() => {
                if let Err(e) = conn.send(&ClientEvent::Ping).await {
                    warn!(user_id = %shared.user_id, error = %e, "Ping failed");
                    return SessionEnd::Dropped { joined };
                }
            }
            _ = shutdown.changed() => return SessionEnd::Shutdown,
        }
    }
}
