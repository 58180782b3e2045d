//! HTTP implementations of the collaborator contracts

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use shared::{
    ClearAllResponse, CreateScheduleRequest, CropDetail, CropScheduleRecord,
    MarkAllReadResponse, NotificationRecord, UserId, WateringUpdate,
};

use super::{
    AddCropRequest, CropReferenceApi, GardenCrops, GardenInventoryApi, NotificationApi,
    ScheduleApi,
};
use crate::config::ServicesConfig;
use crate::error::{ClientError, ClientResult};

const SCHEDULE: &str = "schedule";
const NOTIFICATION: &str = "notification";
const INVENTORY: &str = "inventory";
const CROP_REFERENCE: &str = "crop reference";

/// One reqwest client speaking to every collaborator service
#[derive(Clone)]
pub struct HttpServiceClient {
    client: Client,
    schedule_url: Url,
    notification_url: Url,
    inventory_url: Url,
    crop_reference_url: Url,
}

impl HttpServiceClient {
    /// Create a client from the configured service endpoints
    pub fn new(config: &ServicesConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|source| ClientError::Transport {
                service: SCHEDULE,
                source,
            })?;

        Ok(Self {
            client,
            schedule_url: parse_base(&config.schedule_url)?,
            notification_url: parse_base(&config.notification_url)?,
            inventory_url: parse_base(&config.inventory_url)?,
            crop_reference_url: parse_base(&config.crop_reference_url)?,
        })
    }

    fn request(
        &self,
        method: Method,
        base: &Url,
        segments: &[&str],
    ) -> ClientResult<RequestBuilder> {
        let url = join_segments(base, segments)?;
        Ok(self.client.request(method, url))
    }

    async fn send(service: &'static str, request: RequestBuilder) -> ClientResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { service, source })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Service {
                service,
                status,
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        service: &'static str,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        Self::send(service, request)
            .await?
            .json()
            .await
            .map_err(|source| ClientError::Transport { service, source })
    }
}

fn parse_base(raw: &str) -> ClientResult<Url> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Append path segments to a base URL, percent-encoding each segment
fn join_segments(base: &Url, segments: &[&str]) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl ScheduleApi for HttpServiceClient {
    async fn list_schedules(&self, user_id: UserId) -> ClientResult<Vec<CropScheduleRecord>> {
        let user = user_id.to_string();
        let request = self.request(Method::GET, &self.schedule_url, &["schedules", &user])?;
        Self::send_json(SCHEDULE, request).await
    }

    async fn update_watering(
        &self,
        user_id: UserId,
        crop_name: &str,
        watered: bool,
    ) -> ClientResult<CropScheduleRecord> {
        let user = user_id.to_string();
        let request = self
            .request(
                Method::POST,
                &self.schedule_url,
                &["schedules", &user, crop_name, "watering"],
            )?
            .json(&WateringUpdate { watered });
        Self::send_json(SCHEDULE, request).await
    }

    async fn create_schedule(
        &self,
        user_id: UserId,
        crop_name: &str,
    ) -> ClientResult<CropScheduleRecord> {
        let request = self
            .request(Method::POST, &self.schedule_url, &["schedules"])?
            .json(&CreateScheduleRequest {
                user_id,
                crop_name: crop_name.to_string(),
            });
        Self::send_json(SCHEDULE, request).await
    }

    async fn delete_schedule(&self, user_id: UserId, crop_name: &str) -> ClientResult<()> {
        let user = user_id.to_string();
        let request = self.request(
            Method::DELETE,
            &self.schedule_url,
            &["schedules", &user, crop_name],
        )?;
        Self::send(SCHEDULE, request).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for HttpServiceClient {
    async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> ClientResult<Vec<NotificationRecord>> {
        let user = user_id.to_string();
        let request = self
            .request(
                Method::GET,
                &self.notification_url,
                &["notifications", &user],
            )?
            .query(&[("unread_only", unread_only)]);
        Self::send_json(NOTIFICATION, request).await
    }

    async fn mark_all_read(&self, user_id: UserId) -> ClientResult<u64> {
        let user = user_id.to_string();
        let request = self.request(
            Method::POST,
            &self.notification_url,
            &["notifications", &user, "read"],
        )?;
        let body: MarkAllReadResponse = Self::send_json(NOTIFICATION, request).await?;
        Ok(body.marked_count)
    }

    async fn clear_all(&self, user_id: UserId) -> ClientResult<u64> {
        let user = user_id.to_string();
        let request = self.request(
            Method::DELETE,
            &self.notification_url,
            &["notifications", &user],
        )?;
        let body: ClearAllResponse = Self::send_json(NOTIFICATION, request).await?;
        Ok(body.cleared_count)
    }
}

#[async_trait]
impl GardenInventoryApi for HttpServiceClient {
    async fn garden_crops(&self, user_id: UserId) -> ClientResult<Vec<String>> {
        let user = user_id.to_string();
        let request = self.request(Method::GET, &self.inventory_url, &["garden", &user])?;
        let body: GardenCrops = Self::send_json(INVENTORY, request).await?;
        Ok(body.crops)
    }

    async fn add_crop(&self, user_id: UserId, crop_name: &str) -> ClientResult<Vec<String>> {
        let user = user_id.to_string();
        let request = self
            .request(Method::POST, &self.inventory_url, &["garden", &user])?
            .json(&AddCropRequest {
                crop_name: crop_name.to_string(),
            });
        let body: GardenCrops = Self::send_json(INVENTORY, request).await?;
        Ok(body.crops)
    }

    async fn remove_crop(&self, user_id: UserId, crop_name: &str) -> ClientResult<Vec<String>> {
        let user = user_id.to_string();
        let request = self.request(
            Method::DELETE,
            &self.inventory_url,
            &["garden", &user, crop_name],
        )?;
        let body: GardenCrops = Self::send_json(INVENTORY, request).await?;
        Ok(body.crops)
    }
}

#[async_trait]
impl CropReferenceApi for HttpServiceClient {
    async fn crop_detail(&self, crop_name: &str) -> ClientResult<CropDetail> {
        let request = self.request(Method::GET, &self.crop_reference_url, &["crops", crop_name])?;
        Self::send_json(CROP_REFERENCE, request).await
    }
}
