//! # Seed Data Generator
//!
//! Populates the database with a demo business for development.
//!
//! ## Usage
//! ```bash
//! # Use slotwise.toml / SLOTWISE_DB_PATH / ./slotwise.db
//! cargo run -p slotwise-db --bin seed
//!
//! # Specify database path and how many days of slots to print
//! cargo run -p slotwise-db --bin seed -- --db ./data/dev.db --days 14
//!
//! # More logging
//! RUST_LOG=slotwise_db=debug cargo run -p slotwise-db --bin seed
//! ```
//!
//! ## Generated Data
//! - "Demo Studio", two clients per slot, UTC+1
//! - Mon-Fri split hours 09:00-13:00 / 16:00-20:00, Saturday 10:00-14:00
//! - Services: Haircut (30 min, every open day), Weekend brunch (60 min, Sat/Sun)
//! - A three-day "Team retreat" ten days from today

use std::env;
use std::path::PathBuf;

use chrono::Duration;
use slotwise_core::{
    CapacityPolicy, Clock, DaySchedule, Service, SystemClock, TimeWindow, WeekdaySet,
};
use slotwise_db::{BookingService, Database, SlotwiseConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_NAME: &str = "Demo Studio";
const DEMO_UTC_OFFSET_MINUTES: i32 = 60;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut days: i64 = 7;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--days" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(7);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Slotwise Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides config)");
                println!("  -c, --config <PATH>   Config file (default: ./slotwise.toml)");
                println!("      --days <N>        Days of slots to print (default: 7)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = SlotwiseConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 Slotwise Seed Data Generator");
    println!("===============================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.businesses().list().await?;
    let business = match existing.into_iter().find(|b| b.name == DEMO_NAME) {
        Some(business) => {
            println!("⚠ {} already exists ({}), reusing it", DEMO_NAME, business.id);
            business
        }
        None => seed_business(&db).await?,
    };

    let booking = BookingService::from_settings(db.clone(), &config.booking);
    let today = SystemClock.local_now(business.utc_offset_minutes).date();
    let services = db.services().list_active(&business.id).await?;

    println!();
    println!("Open slots for the next {} days:", days);
    for offset in 0..days {
        let date = today + Duration::days(offset);
        let mut line = format!("  {} {}", date, date.format("%a"));
        for service in &services {
            let slots = booking
                .get_available_slots(&business.id, date, Some(&service.id))
                .await?;
            let open = slots.iter().filter(|s| s.available).count();
            line.push_str(&format!("  {}: {:>2}", service.name, open));
        }
        println!("{}", line);
    }

    println!();
    println!("✓ Seed complete!");
    db.close().await;
    Ok(())
}

async fn seed_business(db: &Database) -> Result<slotwise_core::Business, Box<dyn std::error::Error>> {
    let business = db
        .businesses()
        .create(DEMO_NAME, CapacityPolicy::multiple(2)?, DEMO_UTC_OFFSET_MINUTES)
        .await?;
    info!(business_id = %business.id, "Demo business created");

    let morning = TimeWindow::from_hm((9, 0), (13, 0)).ok_or("invalid morning window")?;
    let afternoon = TimeWindow::from_hm((16, 0), (20, 0)).ok_or("invalid afternoon window")?;
    let saturday = TimeWindow::from_hm((10, 0), (14, 0)).ok_or("invalid saturday window")?;

    let week = (0..7u8)
        .map(|weekday| match weekday {
            0..=4 => DaySchedule::split(weekday, morning, afternoon, 30),
            5 => DaySchedule::continuous(weekday, saturday, 30),
            _ => DaySchedule::closed(weekday),
        })
        .collect();
    db.schedules().save_week(&business.id, week).await?;
    println!("✓ Weekly schedule saved");

    let haircut = Service {
        id: String::new(),
        business_id: business.id.clone(),
        name: "Haircut".to_string(),
        duration_minutes: 30,
        price_cents: 2500,
        available_weekdays: WeekdaySet::all(),
        active_from: None,
        active_until: None,
        is_active: true,
    };
    let brunch = Service {
        name: "Weekend brunch".to_string(),
        duration_minutes: 60,
        price_cents: 4500,
        available_weekdays: WeekdaySet::from_indices(&[5, 6])?,
        ..haircut.clone()
    };
    db.services().create(&haircut).await?;
    db.services().create(&brunch).await?;
    println!("✓ 2 services created");

    let today = SystemClock.local_now(business.utc_offset_minutes).date();
    let start = today + Duration::days(10);
    let inserted = db
        .days_off()
        .add_range(&business.id, start, start + Duration::days(2), Some("Team retreat"))
        .await?;
    println!("✓ {} days off added", inserted);

    Ok(business)
}
