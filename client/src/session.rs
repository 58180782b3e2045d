//! Signed-in garden session
//!
//! Wires the store, the notification channel and the garden actions for one
//! user. Logging out tears all of it down.

use std::sync::Arc;

use tracing::{info, warn};

use shared::UserId;

use crate::api::{
    CropReferenceApi, GardenInventoryApi, HttpServiceClient, NotificationApi, ScheduleApi,
};
use crate::channel::{NotificationChannel, RealtimeTransport};
use crate::companion::CompanionResolver;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::garden::GardenActions;
use crate::store::WateringStatusStore;

/// Collaborator services used by a session
#[derive(Clone)]
pub struct Services {
    pub schedules: Arc<dyn ScheduleApi>,
    pub notifications: Arc<dyn NotificationApi>,
    pub inventory: Arc<dyn GardenInventoryApi>,
    pub crop_reference: Arc<dyn CropReferenceApi>,
}

impl Services {
    /// All services over HTTP, as configured
    pub fn http(config: &ClientConfig) -> ClientResult<Self> {
        let client = Arc::new(HttpServiceClient::new(&config.services)?);
        Ok(Self {
            schedules: client.clone(),
            notifications: client.clone(),
            inventory: client.clone(),
            crop_reference: client,
        })
    }
}

/// Everything scoped to one signed-in user
pub struct GardenSession {
    user_id: UserId,
    store: WateringStatusStore,
    channel: NotificationChannel,
    companions: Arc<CompanionResolver>,
    garden: GardenActions,
}

impl GardenSession {
    /// Start a session: spawn the store, load it, and connect the channel
    ///
    /// A failed first load is logged; the channel's join triggers another.
    pub async fn start(
        user_id: UserId,
        config: &ClientConfig,
        services: Services,
        transport: Arc<dyn RealtimeTransport>,
    ) -> Self {
        let store = WateringStatusStore::spawn(user_id, services.schedules.clone());
        if let Err(e) = store.load().await {
            warn!(user_id = %user_id, error = %e, "Initial schedule load failed");
        }

        let channel = NotificationChannel::connect(
            user_id,
            config.realtime.clone(),
            transport,
            services.notifications.clone(),
            Some(store.invalidator()),
        );

        let companions = Arc::new(CompanionResolver::new(
            services.crop_reference.clone(),
            config.companions.max_companions,
        ));
        let garden = GardenActions::new(
            user_id,
            services.inventory.clone(),
            services.schedules.clone(),
            Arc::clone(&companions),
            store.invalidator(),
        );

        info!(user_id = %user_id, "Garden session started");
        Self {
            user_id,
            store,
            channel,
            companions,
            garden,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn store(&self) -> &WateringStatusStore {
        &self.store
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    pub fn garden(&self) -> &GardenActions {
        &self.garden
    }

    pub fn companions(&self) -> &CompanionResolver {
        &self.companions
    }

    /// Stop the channel, then drop every piece of user-scoped state
    pub async fn logout(self) {
        self.channel.shutdown().await;
        self.store.shutdown().await;
        self.companions.clear();
        info!(user_id = %self.user_id, "Garden session ended");
    }
}
