// ABOUTME: insite-sync CLI - runs sync passes and manages local therapy profiles
// ABOUTME: Uses the synthetic health source and an in-memory document store for local runs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Run one sync pass over 14 days of seeded data and print the report
//! insite-sync sync --days 14
//!
//! # Same, ignoring the saved checkpoint and exporting the written documents
//! insite-sync sync --fresh --export ./store.json
//!
//! # List profiles and activate one
//! insite-sync profile list
//! insite-sync profile activate Weekend
//!
//! # Evaluate uROC for one bucket
//! insite-sync uroc --start-bg 180 --end-bg 150 --minutes 60
//!
//! # Show the range of the active profile covering 7am local
//! insite-sync resolve --hour 7
//!
//! # Record an infusion site change
//! insite-sync site-change --location abdomen
//! ```

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use insite_analytics::URocCalculator;
use insite_core::constants::time::HOURS_PER_DAY;
use insite_providers::{
    GuardConfig, GuardedSource, HealthDataSource, SyntheticHealthSource, SyntheticSeeder,
    DEFAULT_SEED_DAYS,
};
use insite_sync::checkpoint::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
use insite_sync::config::SyncConfig;
use insite_sync::logging;
use insite_sync::persistence::{DocumentStore, InMemoryDocumentStore, StreamUploader};
use insite_sync::site_changes::SiteChangeTracker;
use insite_sync::sync::SyncOrchestrator;
use insite_sync::therapy::{ProfileStore, SnapshotLog, TherapyLogStore, TherapyService};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "insite-sync",
    about = "InSite health data sync",
    long_about = "Runs therapy-aware sync passes against a synthetic health source and manages local therapy profiles."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Run one sync pass and print the report as JSON
    Sync {
        /// Days of synthetic history to seed
        #[arg(long, default_value_t = DEFAULT_SEED_DAYS)]
        days: u32,

        /// Seed for the synthetic generator
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Ignore the saved checkpoint and leave it untouched
        #[arg(long)]
        fresh: bool,

        /// Write the resulting store contents to this JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Therapy profile management
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Evaluate uROC for one bucket
    Uroc {
        /// Glucose at bucket start (mg/dL)
        #[arg(long)]
        start_bg: f64,

        /// Glucose at bucket end (mg/dL)
        #[arg(long)]
        end_bg: f64,

        /// Bucket length in minutes
        #[arg(long, default_value = "60")]
        minutes: u32,

        /// Target glucose (mg/dL), defaults to the configured target
        #[arg(long)]
        target: Option<f64>,
    },

    /// Show which hour range of the active profile covers a local hour
    Resolve {
        /// Local hour (0-23)
        #[arg(long)]
        hour: u8,
    },

    /// Record an infusion site change and print the rebuilt daily statuses
    SiteChange {
        /// Body location label
        #[arg(long)]
        location: String,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum ProfileCommand {
    /// List saved profiles
    List,

    /// Activate a saved profile by name
    Activate {
        /// Profile name (case-insensitive)
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_from_env()?;

    let config = SyncConfig::from_env().context("failed to load configuration")?;
    info!("{}", config.summary());

    match cli.command {
        Command::Sync {
            days,
            seed,
            fresh,
            export,
        } => run_sync(config, days, seed, fresh, export).await,
        Command::Profile { action } => run_profile(&config, action).await,
        Command::Uroc {
            start_bg,
            end_bg,
            minutes,
            target,
        } => run_uroc(&config, start_bg, end_bg, minutes, target),
        Command::Resolve { hour } => run_resolve(&config, hour).await,
        Command::SiteChange { location } => run_site_change(&config, &location).await,
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn therapy_service(config: &SyncConfig, store: Arc<dyn DocumentStore>, cache: SnapshotLog) -> TherapyService {
    TherapyService::new(
        ProfileStore::new(config.profiles_path()),
        TherapyLogStore::new(store, config.account_id.clone()),
        cache,
    )
}

async fn run_sync(
    config: SyncConfig,
    days: u32,
    seed: u64,
    fresh: bool,
    export: Option<PathBuf>,
) -> Result<()> {
    let now = Utc::now();
    let synthetic = SyntheticHealthSource::new();
    let seeded = SyntheticSeeder::new(seed, days, config.timezone).seed_into(&synthetic, now);
    info!(
        quantity_samples = seeded.quantity_samples,
        category_samples = seeded.category_samples,
        "synthetic source seeded"
    );
    let source: Arc<dyn HealthDataSource> = Arc::new(GuardedSource::new(
        Arc::new(synthetic),
        GuardConfig {
            query_timeout: config.query_timeout,
            ..GuardConfig::default()
        },
    ));

    let memory = InMemoryDocumentStore::new();
    let store: Arc<dyn DocumentStore> = Arc::new(memory.clone());
    let checkpoints: Arc<dyn CheckpointStore> = if fresh {
        Arc::new(InMemoryCheckpointStore::new())
    } else {
        Arc::new(FileCheckpointStore::new(config.checkpoint_path()))
    };

    // The store starts empty, so the active profile is logged as of the backfill start
    let cache = SnapshotLog::new();
    let service = therapy_service(&config, Arc::clone(&store), cache.clone());
    let checkpoint = checkpoints.load().await?;
    let backfill_from = checkpoint.backfill_window_start(now)
        - chrono::Duration::hours(config.backfill_buffer_hours);
    let active = service.profiles().active().await?;
    service.activate_profile(&active, backfill_from).await?;

    let orchestrator = SyncOrchestrator::new(config, source, store, checkpoints, cache);
    let report = orchestrator.sync_at(now).await?;
    print_json(&serde_json::to_value(&report)?)?;

    if let Some(path) = export {
        let contents = serde_json::to_vec_pretty(&memory.export_json().await)?;
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "store exported");
    }
    Ok(())
}

async fn run_profile(config: &SyncConfig, action: ProfileCommand) -> Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let service = therapy_service(config, store, SnapshotLog::new());
    match action {
        ProfileCommand::List => {
            let active = service.profiles().active().await?;
            let profiles: Vec<serde_json::Value> = service
                .profiles()
                .list()
                .await?
                .into_iter()
                .map(|profile| {
                    json!({
                        "id": profile.id,
                        "name": profile.name,
                        "active": profile.id == active.id,
                        "hourRanges": profile.hour_ranges,
                    })
                })
                .collect();
            print_json(&json!(profiles))
        }
        ProfileCommand::Activate { name } => {
            let snapshot = service.activate_by_name(&name, Utc::now()).await?;
            print_json(&serde_json::to_value(&snapshot)?)
        }
    }
}

fn run_uroc(config: &SyncConfig, start_bg: f64, end_bg: f64, minutes: u32, target: Option<f64>) -> Result<()> {
    if minutes == 0 {
        bail!("--minutes must be positive");
    }
    let target = target.unwrap_or(config.target_bg);
    let duration_secs = f64::from(minutes) * 60.0;
    let estimate = URocCalculator::new(target).estimate(start_bg, end_bg, duration_secs);
    print_json(&json!({
        "startBg": start_bg,
        "endBg": end_bg,
        "minutes": minutes,
        "targetBg": target,
        "estimate": estimate,
    }))
}

async fn run_resolve(config: &SyncConfig, hour: u8) -> Result<()> {
    if hour >= HOURS_PER_DAY {
        bail!("--hour must be between 0 and 23");
    }
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let service = therapy_service(config, store, SnapshotLog::new());
    let (profile, range) = service.range_for_local_hour(hour).await?;
    print_json(&json!({
        "profile": profile.name,
        "profileId": profile.id,
        "localHour": hour,
        "range": range,
    }))
}

async fn run_site_change(config: &SyncConfig, location: &str) -> Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let uploader = StreamUploader::new(store, config.account_id.clone()).with_batch_size(config.batch_size);
    let outcome = SiteChangeTracker::new(uploader)
        .record_site_change(location, config.timezone, Utc::now())
        .await?;
    let days: Vec<serde_json::Value> = outcome
        .days
        .iter()
        .map(|day| {
            json!({
                "date": day.date.format("%Y-%m-%d").to_string(),
                "daysSinceChange": day.days_since_change,
                "location": day.location,
            })
        })
        .collect();
    print_json(&json!({
        "eventId": outcome.event.id,
        "location": outcome.event.location,
        "days": days,
        "uploads": outcome.uploads,
    }))
}
