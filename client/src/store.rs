//! Watering status store
//!
//! A single actor task owns a user's schedule records. Every view reads the
//! same snapshot through a `watch` channel and mutates only by sending commands,
//! so there is exactly one copy of each record on the client.
//!
//! Ordering uses a logical clock owned by the actor. Each load and each settled
//! toggle takes a tick, which lets a load response recognise data that was
//! fetched before a local mutation finished.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use shared::{CropScheduleRecord, UserId, WateringAction};

use crate::api::ScheduleApi;
use crate::error::{ClientError, ClientResult};

const FEEDBACK_CAPACITY: usize = 64;

/// Read-only view of the store at one point in time
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    user_id: UserId,
    records: BTreeMap<String, CropScheduleRecord>,
    pending: BTreeSet<String>,
    version: u64,
    loaded: bool,
}

impl ScheduleSnapshot {
    fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            records: BTreeMap::new(),
            pending: BTreeSet::new(),
            version: 0,
            loaded: false,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Records ordered by crop name
    pub fn records(&self) -> impl Iterator<Item = &CropScheduleRecord> {
        self.records.values()
    }

    pub fn record(&self, crop_name: &str) -> Option<&CropScheduleRecord> {
        self.records.get(crop_name)
    }

    /// Whether a watering update for the crop is waiting on the server
    pub fn is_pending(&self, crop_name: &str) -> bool {
        self.pending.contains(crop_name)
    }

    /// Increments on every published change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether at least one load has completed since the store started
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn watering_action(&self, crop_name: &str, today: NaiveDate) -> Option<WateringAction> {
        self.record(crop_name)
            .map(|record| WateringAction::for_record(record, today))
    }
}

/// Immediate user-facing feedback from store operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFeedback {
    MarkedWatered { crop_name: String },
    UnmarkedWatered { crop_name: String },
    ToggleFailed { crop_name: String, reason: String },
    LoadFailed { reason: String },
}

impl StoreFeedback {
    /// Short text for a toast or status line
    pub fn message(&self) -> String {
        match self {
            StoreFeedback::MarkedWatered { crop_name } => format!("Watering {}!", crop_name),
            StoreFeedback::UnmarkedWatered { crop_name } => {
                format!("Unmarked {} as watered", crop_name)
            }
            StoreFeedback::ToggleFailed { .. } => "Failed to update watering status".to_string(),
            StoreFeedback::LoadFailed { .. } => "Failed to load watering schedule".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StoreFeedback::ToggleFailed { .. } | StoreFeedback::LoadFailed { .. }
        )
    }
}

enum Command {
    Load {
        reply: Option<oneshot::Sender<ClientResult<()>>>,
    },
    Loaded {
        ticket: u64,
        result: ClientResult<Vec<CropScheduleRecord>>,
        reply: Option<oneshot::Sender<ClientResult<()>>>,
    },
    Toggle {
        crop_name: String,
        reply: oneshot::Sender<ClientResult<bool>>,
    },
    ToggleSettled {
        crop_name: String,
        previous: bool,
        target: bool,
        result: ClientResult<CropScheduleRecord>,
        reply: oneshot::Sender<ClientResult<bool>>,
    },
    Clear,
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

/// Handle to the store actor; cheap to clone and share between views
#[derive(Clone)]
pub struct WateringStatusStore {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<Arc<ScheduleSnapshot>>,
    feedback: broadcast::Sender<StoreFeedback>,
}

impl WateringStatusStore {
    /// Start the store actor for a user. The cache is empty until the first load.
    pub fn spawn(user_id: UserId, api: Arc<dyn ScheduleApi>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(Arc::new(ScheduleSnapshot::empty(user_id)));
        let (feedback, _) = broadcast::channel(FEEDBACK_CAPACITY);

        let actor = StoreActor {
            user_id,
            api,
            records: BTreeMap::new(),
            pending: BTreeSet::new(),
            settled_at: HashMap::new(),
            clock: 0,
            last_applied_load: 0,
            version: 0,
            loaded: false,
            commands: commands.downgrade(),
            snapshot_tx,
            feedback: feedback.clone(),
        };
        tokio::spawn(actor.run(rx));

        Self {
            commands,
            snapshot,
            feedback,
        }
    }

    /// Fetch the full record set and replace the cache
    pub async fn load(&self) -> ClientResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Load { reply: Some(reply) })?;
        rx.await.map_err(|_| ClientError::StoreClosed)?
    }

    /// Flip the watered flag for a crop
    ///
    /// The new value is visible in the snapshot before the server answers. On
    /// failure the previous value is restored and the error returned. Returns
    /// the confirmed flag on success.
    pub async fn toggle_watered(&self, crop_name: &str) -> ClientResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Toggle {
            crop_name: crop_name.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| ClientError::StoreClosed)?
    }

    pub fn snapshot(&self) -> Arc<ScheduleSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes
    pub fn subscribe(&self) -> watch::Receiver<Arc<ScheduleSnapshot>> {
        self.snapshot.clone()
    }

    pub fn feedback(&self) -> broadcast::Receiver<StoreFeedback> {
        self.feedback.subscribe()
    }

    /// Handle that asks the store to reload without holding it open
    pub fn invalidator(&self) -> ScheduleInvalidator {
        ScheduleInvalidator {
            commands: self.commands.downgrade(),
        }
    }

    /// Drop all cached records
    pub fn clear(&self) {
        let _ = self.send(Command::Clear);
    }

    /// Clear the cache and stop the actor
    pub async fn shutdown(&self) {
        let (ack, rx) = oneshot::channel();
        if self.send(Command::Shutdown { ack }).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, command: Command) -> ClientResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::StoreClosed)
    }
}

/// Requests a background reload of the store
#[derive(Clone)]
pub struct ScheduleInvalidator {
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl ScheduleInvalidator {
    /// Queue a reload. Returns false once the store has gone away.
    pub fn invalidate(&self) -> bool {
        match self.commands.upgrade() {
            Some(commands) => commands.send(Command::Load { reply: None }).is_ok(),
            None => false,
        }
    }
}

struct StoreActor {
    user_id: UserId,
    api: Arc<dyn ScheduleApi>,
    records: BTreeMap<String, CropScheduleRecord>,
    pending: BTreeSet<String>,
    /// Clock tick at which each crop's latest toggle settled
    settled_at: HashMap<String, u64>,
    clock: u64,
    last_applied_load: u64,
    version: u64,
    loaded: bool,
    commands: mpsc::WeakUnboundedSender<Command>,
    snapshot_tx: watch::Sender<Arc<ScheduleSnapshot>>,
    feedback: broadcast::Sender<StoreFeedback>,
}

impl StoreActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Load { reply } => self.start_load(reply),
                Command::Loaded {
                    ticket,
                    result,
                    reply,
                } => self.finish_load(ticket, result, reply),
                Command::Toggle { crop_name, reply } => self.start_toggle(crop_name, reply),
                Command::ToggleSettled {
                    crop_name,
                    previous,
                    target,
                    result,
                    reply,
                } => self.finish_toggle(crop_name, previous, target, result, reply),
                Command::Clear => self.clear(),
                Command::Shutdown { ack } => {
                    self.clear();
                    let _ = ack.send(());
                    break;
                }
            }
        }
        debug!(user_id = %self.user_id, "Watering status store stopped");
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn start_load(&mut self, reply: Option<oneshot::Sender<ClientResult<()>>>) {
        let ticket = self.tick();
        let api = Arc::clone(&self.api);
        let commands = self.commands.clone();
        let user_id = self.user_id;

        tokio::spawn(async move {
            let result = api.list_schedules(user_id).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::Loaded {
                    ticket,
                    result,
                    reply,
                });
            }
        });
    }

    fn finish_load(
        &mut self,
        ticket: u64,
        result: ClientResult<Vec<CropScheduleRecord>>,
        reply: Option<oneshot::Sender<ClientResult<()>>>,
    ) {
        let outcome = match result {
            Ok(_) if ticket < self.last_applied_load => {
                debug!(user_id = %self.user_id, ticket, "Discarding superseded schedule load");
                Ok(())
            }
            Ok(server_records) => {
                self.last_applied_load = ticket;
                self.records = merge_loaded(
                    std::mem::take(&mut self.records),
                    server_records,
                    &self.pending,
                    &self.settled_at,
                    ticket,
                );
                self.loaded = true;
                self.publish();
                info!(user_id = %self.user_id, crops = self.records.len(), "Loaded watering schedule");
                Ok(())
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Failed to load watering schedule");
                self.emit(StoreFeedback::LoadFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        };

        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }
    }

    fn start_toggle(&mut self, crop_name: String, reply: oneshot::Sender<ClientResult<bool>>) {
        if self.pending.contains(&crop_name) {
            let _ = reply.send(Err(ClientError::ToggleInFlight(crop_name)));
            return;
        }
        let Some(record) = self.records.get_mut(&crop_name) else {
            let _ = reply.send(Err(ClientError::UnknownCrop(crop_name)));
            return;
        };

        let previous = record.watered;
        let target = !previous;
        record.watered = target;
        self.pending.insert(crop_name.clone());
        self.publish();

        self.emit(if target {
            StoreFeedback::MarkedWatered {
                crop_name: crop_name.clone(),
            }
        } else {
            StoreFeedback::UnmarkedWatered {
                crop_name: crop_name.clone(),
            }
        });

        let api = Arc::clone(&self.api);
        let commands = self.commands.clone();
        let user_id = self.user_id;

        tokio::spawn(async move {
            let result = api.update_watering(user_id, &crop_name, target).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::ToggleSettled {
                    crop_name,
                    previous,
                    target,
                    result,
                    reply,
                });
            }
        });
    }

    fn finish_toggle(
        &mut self,
        crop_name: String,
        previous: bool,
        target: bool,
        result: ClientResult<CropScheduleRecord>,
        reply: oneshot::Sender<ClientResult<bool>>,
    ) {
        self.pending.remove(&crop_name);
        let settled = self.tick();
        self.settled_at.insert(crop_name.clone(), settled);

        match result {
            Ok(mut confirmed) => {
                confirmed.watered = target;
                if let Some(record) = self.records.get_mut(&crop_name) {
                    *record = confirmed;
                }
                self.publish();
                info!(user_id = %self.user_id, crop_name = %crop_name, watered = target, "Watering status updated");

                // Reconcile with whatever else changed on the server
                self.start_load(None);
                let _ = reply.send(Ok(target));
            }
            Err(e) => {
                if let Some(record) = self.records.get_mut(&crop_name) {
                    record.watered = previous;
                }
                self.publish();
                warn!(user_id = %self.user_id, crop_name = %crop_name, error = %e, "Watering update failed, reverted");
                self.emit(StoreFeedback::ToggleFailed {
                    crop_name,
                    reason: e.to_string(),
                });
                let _ = reply.send(Err(e));
            }
        }
    }

    fn clear(&mut self) {
        self.records.clear();
        self.pending.clear();
        self.settled_at.clear();
        self.loaded = false;
        self.publish();
    }

    fn publish(&mut self) {
        self.version += 1;
        let snapshot = ScheduleSnapshot {
            user_id: self.user_id,
            records: self.records.clone(),
            pending: self.pending.clone(),
            version: self.version,
            loaded: self.loaded,
        };
        self.snapshot_tx.send_replace(Arc::new(snapshot));
    }

    fn emit(&self, feedback: StoreFeedback) {
        let _ = self.feedback.send(feedback);
    }
}

/// Merge a load response into the local records
///
/// Server data wins, except for crops with a pending toggle or whose toggle
/// settled after the load was issued. Those keep their local record.
fn merge_loaded(
    mut local: BTreeMap<String, CropScheduleRecord>,
    server_records: Vec<CropScheduleRecord>,
    pending: &BTreeSet<String>,
    settled_at: &HashMap<String, u64>,
    ticket: u64,
) -> BTreeMap<String, CropScheduleRecord> {
    let protected = |name: &str| {
        pending.contains(name) || settled_at.get(name).is_some_and(|settled| *settled > ticket)
    };

    let mut merged = BTreeMap::new();
    for record in server_records {
        if protected(&record.crop_name) {
            if let Some(kept) = local.remove(&record.crop_name) {
                merged.insert(kept.crop_name.clone(), kept);
                continue;
            }
        }
        merged.insert(record.crop_name.clone(), record);
    }
    for (name, record) in local {
        if pending.contains(&name) {
            merged.insert(name, record);
        }
    }
    merged
}
