//! In-memory collaborators for client integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{mpsc, Semaphore};

use pocket_farm_client::api::{CropReferenceApi, GardenInventoryApi, NotificationApi, ScheduleApi};
use pocket_farm_client::channel::{RealtimeConnection, RealtimeTransport};
use pocket_farm_client::config::{
    ClientConfig, CompanionConfig, RealtimeConfig, ServicesConfig,
};
use pocket_farm_client::{ClientError, ClientResult};
use shared::{
    ClientEvent, CropDetail, CropScheduleRecord, NotificationId, NotificationRecord, ServerEvent,
    UserId,
};

pub const USER: UserId = UserId(7);

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn record(name: &str, watered: bool) -> CropScheduleRecord {
    CropScheduleRecord {
        crop_name: name.to_string(),
        last_watered: Some(date("2024-05-01")),
        growing_time_days: 60,
        watering_frequency_days: 3,
        fertilization_frequency_days: 14,
        next_watering: date("2024-05-04"),
        watered,
    }
}

fn unavailable(service: &'static str) -> ClientError {
    ClientError::Service {
        service,
        status: 503,
        message: "unavailable".to_string(),
    }
}

/// Poll `condition` every few milliseconds for up to two seconds
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

pub fn realtime_config() -> RealtimeConfig {
    RealtimeConfig {
        url: "ws://test/api/v1/realtime".to_string(),
        max_reconnect_attempts: 3,
        reconnect_base_delay_ms: 10,
        reconnect_max_delay_ms: 40,
        ping_interval_secs: 60,
        dedup_window_secs: 1800,
    }
}

pub fn client_config() -> ClientConfig {
    ClientConfig {
        environment: "test".to_string(),
        services: ServicesConfig {
            schedule_url: "http://localhost:3000/api/v1".to_string(),
            notification_url: "http://localhost:3000/api/v1".to_string(),
            inventory_url: "http://localhost:5000".to_string(),
            crop_reference_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 5,
        },
        realtime: realtime_config(),
        companions: CompanionConfig::default(),
    }
}

// ============================================================================
// Schedule service
// ============================================================================

pub struct FakeScheduleApi {
    pub records: Mutex<BTreeMap<String, CropScheduleRecord>>,
    pub fail_updates: AtomicBool,
    pub fail_loads: AtomicBool,
    pub fail_creates: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub hold_updates: AtomicBool,
    pub hold_loads: AtomicBool,
    gate: Semaphore,
    load_gate: Semaphore,
    pub list_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Default for FakeScheduleApi {
    fn default() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            fail_updates: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
            fail_creates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            hold_updates: AtomicBool::new(false),
            hold_loads: AtomicBool::new(false),
            gate: Semaphore::new(0),
            load_gate: Semaphore::new(0),
            list_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl FakeScheduleApi {
    pub fn with_records(records: Vec<CropScheduleRecord>) -> Arc<Self> {
        let api = Self::default();
        {
            let mut map = api.records.lock().unwrap();
            for record in records {
                map.insert(record.crop_name.clone(), record);
            }
        }
        Arc::new(api)
    }

    /// Let one held watering update through
    pub fn release_update(&self) {
        self.gate.add_permits(1);
    }

    /// Let one held schedule load through
    pub fn release_load(&self) {
        self.load_gate.add_permits(1);
    }

    pub fn server_record(&self, name: &str) -> Option<CropScheduleRecord> {
        self.records.lock().unwrap().get(name).cloned()
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleApi for FakeScheduleApi {
    async fn list_schedules(&self, _user_id: UserId) -> ClientResult<Vec<CropScheduleRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(unavailable("schedule"));
        }
        // Held loads answer with the records as they were when the request arrived
        let records: Vec<CropScheduleRecord> =
            self.records.lock().unwrap().values().cloned().collect();
        if self.hold_loads.load(Ordering::SeqCst) {
            if let Ok(permit) = self.load_gate.acquire().await {
                permit.forget();
            }
        }
        Ok(records)
    }

    async fn update_watering(
        &self,
        _user_id: UserId,
        crop_name: &str,
        watered: bool,
    ) -> ClientResult<CropScheduleRecord> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hold_updates.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(unavailable("schedule"));
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(crop_name)
            .ok_or_else(|| ClientError::Service {
                service: "schedule",
                status: 404,
                message: "not found".to_string(),
            })?;
        record.watered = watered;
        Ok(record.clone())
    }

    async fn create_schedule(
        &self,
        _user_id: UserId,
        crop_name: &str,
    ) -> ClientResult<CropScheduleRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(unavailable("schedule"));
        }
        let created = CropScheduleRecord {
            last_watered: None,
            next_watering: Utc::now().date_naive(),
            ..record(crop_name, false)
        };
        self.records
            .lock()
            .unwrap()
            .insert(crop_name.to_string(), created.clone());
        Ok(created)
    }

    async fn delete_schedule(&self, _user_id: UserId, crop_name: &str) -> ClientResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(unavailable("schedule"));
        }
        self.records.lock().unwrap().remove(crop_name);
        Ok(())
    }
}

// ============================================================================
// Notification service
// ============================================================================

#[derive(Default)]
pub struct FakeNotificationApi {
    pub records: Mutex<Vec<NotificationRecord>>,
    pub fail: AtomicBool,
    pub list_calls: AtomicUsize,
    pub mark_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
}

#[async_trait]
impl NotificationApi for FakeNotificationApi {
    async fn list_notifications(
        &self,
        _user_id: UserId,
        unread_only: bool,
    ) -> ClientResult<Vec<NotificationRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| !unread_only || !r.read)
            .cloned()
            .collect())
    }

    async fn mark_all_read(&self, _user_id: UserId) -> ClientResult<u64> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("notification"));
        }
        let mut records = self.records.lock().unwrap();
        let mut marked = 0;
        for record in records.iter_mut().filter(|r| !r.read) {
            record.read = true;
            marked += 1;
        }
        Ok(marked)
    }

    async fn clear_all(&self, _user_id: UserId) -> ClientResult<u64> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("notification"));
        }
        let mut records = self.records.lock().unwrap();
        let cleared = records.len() as u64;
        records.clear();
        Ok(cleared)
    }
}

pub fn stored_notification(id: i64, message: &str) -> NotificationRecord {
    NotificationRecord {
        id: NotificationId(id),
        message: message.to_string(),
        timestamp: Utc::now(),
        read: false,
    }
}

// ============================================================================
// Garden inventory and crop reference services
// ============================================================================

#[derive(Default)]
pub struct FakeInventoryApi {
    pub crops: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl GardenInventoryApi for FakeInventoryApi {
    async fn garden_crops(&self, _user_id: UserId) -> ClientResult<Vec<String>> {
        Ok(self.crops.lock().unwrap().clone())
    }

    async fn add_crop(&self, _user_id: UserId, crop_name: &str) -> ClientResult<Vec<String>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("inventory"));
        }
        let mut crops = self.crops.lock().unwrap();
        if !crops.iter().any(|c| c == crop_name) {
            crops.push(crop_name.to_string());
        }
        Ok(crops.clone())
    }

    async fn remove_crop(&self, _user_id: UserId, crop_name: &str) -> ClientResult<Vec<String>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("inventory"));
        }
        let mut crops = self.crops.lock().unwrap();
        crops.retain(|c| c != crop_name);
        Ok(crops.clone())
    }
}

#[derive(Default)]
pub struct FakeCropReference {
    pub details: HashMap<String, CropDetail>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeCropReference {
    pub fn with_crops(crops: Vec<CropDetail>) -> Arc<Self> {
        Arc::new(Self {
            details: crops.into_iter().map(|c| (c.name.clone(), c)).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }
}

#[async_trait]
impl CropReferenceApi for FakeCropReference {
    async fn crop_detail(&self, crop_name: &str) -> ClientResult<CropDetail> {
        self.calls.lock().unwrap().push(crop_name.to_string());
        self.details
            .get(crop_name)
            .cloned()
            .ok_or_else(|| ClientError::Service {
                service: "crop reference",
                status: 404,
                message: format!("{} not found", crop_name),
            })
    }
}

pub fn crop(name: &str, companions: &[&str]) -> CropDetail {
    let mut detail = CropDetail::named(name);
    detail.companion_crops = companions.iter().map(|c| c.to_string()).collect();
    detail
}

// ============================================================================
// Scripted real-time transport
// ============================================================================

#[derive(Debug)]
pub enum Frame {
    Event(ServerEvent),
    Malformed,
    Close,
}

/// Server side of one scripted connection
pub struct ServerEnd {
    pub frames: mpsc::UnboundedSender<Frame>,
    pub sent: Arc<Mutex<Vec<ClientEvent>>>,
    pub closed: Arc<AtomicBool>,
}

impl ServerEnd {
    pub fn push(&self, event: ServerEvent) {
        let _ = self.frames.send(Frame::Event(event));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<ClientEvent> {
        self.sent.lock().unwrap().clone()
    }
}

struct ScriptedConnection {
    frames: mpsc::UnboundedReceiver<Frame>,
    sent: Arc<Mutex<Vec<ClientEvent>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl RealtimeConnection for ScriptedConnection {
    async fn send(&mut self, event: &ClientEvent) -> ClientResult<()> {
        self.sent.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ClientResult<ServerEvent>> {
        match self.frames.recv().await {
            Some(Frame::Event(event)) => Some(Ok(event)),
            Some(Frame::Malformed) => {
                let error = serde_json::from_str::<ServerEvent>("{\"event\":\"bogus\"}");
                Some(Err(ClientError::from(error.unwrap_err())))
            }
            Some(Frame::Close) | None => None,
        }
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

enum Plan {
    Accept(ScriptedConnection),
    Refuse,
}

/// Transport that follows a queue of accept/refuse plans, refusing once empty
#[derive(Default)]
pub struct ScriptedTransport {
    plans: Mutex<VecDeque<Plan>>,
    pub connects: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue an accepted connection and return its server end
    pub fn accept(&self) -> ServerEnd {
        let (frames, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        self.plans.lock().unwrap().push_back(Plan::Accept(ScriptedConnection {
            frames: rx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        }));
        ServerEnd {
            frames,
            sent,
            closed,
        }
    }

    /// Queue an accepted connection that joins the user's room right away
    pub fn accept_and_join(&self, user_id: UserId) -> ServerEnd {
        let end = self.accept();
        end.push(ServerEvent::Joined {
            room: user_id.room(),
        });
        end
    }

    pub fn refuse(&self) {
        self.plans.lock().unwrap().push_back(Plan::Refuse);
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealtimeTransport for ScriptedTransport {
    async fn connect(&self, _url: &str) -> ClientResult<Box<dyn RealtimeConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let plan = self.plans.lock().unwrap().pop_front();
        match plan {
            Some(Plan::Accept(conn)) => Ok(Box::new(conn)),
            Some(Plan::Refuse) | None => Err(ClientError::Channel("connection refused".to_string())),
        }
    }
}
