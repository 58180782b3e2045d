//! Pocket Farm garden client - terminal companion
//!
//! Signs in as `PFC_USER_ID`, prints today's watering overview and then
//! streams notifications until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pocket_farm_client::{
    ChannelEvent, ClientConfig, GardenSession, ScheduleSnapshot, Services, WsTransport,
};
use shared::{next_fertilization_date, watering_dates, UserId};

const UPCOMING_DATES: usize = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pf_garden=info,pocket_farm_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = ClientConfig::load()?;
    let user_id: i64 = std::env::var("PFC_USER_ID")
        .context("PFC_USER_ID must be set")?
        .parse()
        .context("PFC_USER_ID must be an integer")?;
    let user_id = UserId(user_id);

    tracing::info!("Starting Pocket Farm garden client");
    tracing::info!("Environment: {}", config.environment);

    let services = Services::http(&config)?;
    let session = GardenSession::start(user_id, &config, services, Arc::new(WsTransport)).await;

    print_overview(&session.store().snapshot());

    let mut events = session.channel().events();
    let mut feedback = session.store().feedback();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed notification events");
                }
                Err(RecvError::Closed) => break,
            },
            update = feedback.recv() => {
                if let Ok(update) = update {
                    println!("{}", update.message());
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.logout().await;
    Ok(())
}

fn print_overview(snapshot: &ScheduleSnapshot) {
    let today = Local::now().date_naive();

    if snapshot.is_empty() {
        println!("No crops scheduled yet.");
        return;
    }

    for record in snapshot.records() {
        let action = shared::WateringAction::for_record(record, today);
        let upcoming = match watering_dates(record, today) {
            Ok(dates) => dates
                .filter(|date| *date >= today)
                .take(UPCOMING_DATES)
                .map(|date| date.format("%b %d").to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Err(e) => format!("unavailable ({})", e),
        };
        let fertilize = match next_fertilization_date(record, today) {
            Ok(Some(date)) => date.format("%b %d").to_string(),
            Ok(None) => "-".to_string(),
            Err(e) => format!("unavailable ({})", e),
        };

        println!(
            "{:<20} [{}] next watering: {}  upcoming: {}  fertilize: {}",
            record.crop_name,
            action.label(),
            record.next_watering,
            upcoming,
            fertilize
        );
    }
}

fn print_event(event: &ChannelEvent) {
    match event {
        ChannelEvent::State(state) => tracing::info!(?state, "Channel state"),
        ChannelEvent::Weather(weather) => println!(
            "Weather: {} {}C, humidity {}%",
            weather.condition, weather.temperature_celsius, weather.humidity_percent
        ),
        ChannelEvent::Alert(alert) => println!("ALERT: {}", alert.message),
        ChannelEvent::Reminder(reminder) => println!("Reminder: {}", reminder.message),
        ChannelEvent::ScheduleChanged { crop_names } => {
            println!("Schedule updated: {}", crop_names.join(", "))
        }
        ChannelEvent::OperationFailed { operation, reason } => {
            println!("{} failed: {}", operation, reason)
        }
    }
}
