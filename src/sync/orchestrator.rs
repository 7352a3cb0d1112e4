// ABOUTME: Sync orchestrator fanning out every stream branch and the therapy backfill concurrently
// ABOUTME: Joins all branches, tags records with the active therapy profile, uploads, then moves checkpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Sync Orchestrator
//!
//! One pass:
//!
//! 1. read the checkpoint; the metric window is `[last sync (or one month ago), now]`
//! 2. spawn the therapy backfill and the eight metric branches on a `JoinSet`,
//!    each under its own deadline
//! 3. join every branch; a failed or timed-out branch contributes nothing and
//!    never cancels its siblings
//! 4. tag each record with the profile active at its bucket start
//! 5. upload per record kind
//! 6. save the checkpoint once, according to the [`CheckpointPolicy`]

use super::report::{BranchOutcome, SyncBranch, SyncReport};
use crate::checkpoint::CheckpointStore;
use crate::config::{CheckpointPolicy, SyncConfig};
use crate::persistence::{DocumentStore, StreamRecord, StreamUploader, UploadSummary};
use crate::streams::{
    fetch_blood_glucose, fetch_body_mass, fetch_energy, fetch_exercise, fetch_heart_rate,
    fetch_menstrual, fetch_resting_heart_rate, fetch_sleep, BloodGlucoseStreams, EnergyStreams,
    ExerciseStreams, FetchContext, HeartRateStreams,
};
use crate::therapy::{BackfillEngine, BackfillOutcome, SnapshotLog, SnapshotTimeline, TherapyLogStore};
use chrono::{DateTime, Utc};
use insite_core::errors::{AppError, AppResult};
use insite_core::models::{
    DailyMenstrual, DailyRestingHeartRate, DailySleepDurations, HourlyBodyMass, ProfileTagged,
    SyncCheckpoint, TherapyHour,
};
use insite_providers::HealthDataSource;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Records produced by one branch
#[derive(Debug, Clone)]
enum BranchData {
    Therapy(BackfillOutcome),
    BloodGlucose(BloodGlucoseStreams),
    HeartRate(HeartRateStreams),
    Exercise(ExerciseStreams),
    Menstrual(Vec<DailyMenstrual>),
    BodyMass(Vec<HourlyBodyMass>),
    RestingHeartRate(Vec<DailyRestingHeartRate>),
    Sleep(Vec<DailySleepDurations>),
    Energy(EnergyStreams),
}

impl BranchData {
    fn record_count(&self) -> usize {
        match self {
            Self::Therapy(outcome) => outcome.hours.len(),
            Self::BloodGlucose(streams) => streams.record_count(),
            Self::HeartRate(streams) => streams.hourly.len() + streams.daily_average.len(),
            Self::Exercise(streams) => streams.hourly.len() + streams.daily_average.len(),
            Self::Menstrual(records) => records.len(),
            Self::BodyMass(records) => records.len(),
            Self::RestingHeartRate(records) => records.len(),
            Self::Sleep(records) => records.len(),
            Self::Energy(streams) => streams.hourly.len() + streams.daily_average.len(),
        }
    }
}

type BranchResult = (SyncBranch, Result<BranchData, BranchOutcome>);

/// Coordinates one sync pass over explicitly injected collaborators
pub struct SyncOrchestrator {
    config: SyncConfig,
    source: Arc<dyn HealthDataSource>,
    uploader: StreamUploader,
    backfill: BackfillEngine,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl SyncOrchestrator {
    /// Wire an orchestrator from its collaborators
    #[must_use]
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn HealthDataSource>,
        store: Arc<dyn DocumentStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        cache: SnapshotLog,
    ) -> Self {
        let uploader = StreamUploader::new(Arc::clone(&store), config.account_id.clone())
            .with_batch_size(config.batch_size)
            .with_commit_timeout(config.query_timeout);
        let backfill = BackfillEngine::new(TherapyLogStore::new(store, config.account_id.clone()), cache)
            .with_buffer_hours(config.backfill_buffer_hours);
        Self {
            config,
            source,
            uploader,
            backfill,
            checkpoints,
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Shared therapy snapshot cache
    #[must_use]
    pub const fn snapshot_cache(&self) -> &SnapshotLog {
        self.backfill.cache()
    }

    /// Run one pass ending now
    ///
    /// # Errors
    ///
    /// Returns an error only when the checkpoint cannot be read
    pub async fn sync(&self) -> AppResult<SyncReport> {
        self.sync_at(Utc::now()).await
    }

    /// Run one pass ending at `now`
    ///
    /// # Errors
    ///
    /// Returns an error only when the checkpoint cannot be read
    pub async fn sync_at(&self, now: DateTime<Utc>) -> AppResult<SyncReport> {
        let checkpoint = self.checkpoints.load().await?;
        let window_start = checkpoint.sync_window_start(now).min(now);
        let (backfill_start, backfill_end) = self.backfill.window(&checkpoint, now);
        info!(
            window_start = %window_start,
            window_end = %now,
            backfill_start = %backfill_start,
            policy = %self.config.checkpoint_policy,
            "sync pass starting"
        );

        let ctx = FetchContext {
            source: Arc::clone(&self.source),
            window_start,
            window_end: now,
            tz: self.config.timezone,
            thresholds: self.config.thresholds,
            target_bg: self.config.target_bg,
            max_concurrent_queries: self.config.max_concurrent_queries,
        };

        let results = self.run_branches(&ctx, backfill_start, backfill_end).await;

        let mut branches = BTreeMap::new();
        let mut data = Vec::new();
        for (branch, result) in results {
            match result {
                Ok(records) => {
                    let outcome = BranchOutcome::Completed {
                        records: records.record_count(),
                    };
                    info!(sync.branch = %branch, sync.records = records.record_count(), "branch completed");
                    branches.insert(branch, outcome);
                    data.push(records);
                }
                Err(outcome) => {
                    warn!(sync.branch = %branch, outcome = ?outcome, "branch produced no records");
                    branches.insert(branch, outcome);
                }
            }
        }

        let timeline = self.backfill.cache().timeline().await;
        if timeline.is_empty() {
            warn!("no therapy snapshots available; records are uploaded without a profile");
        }

        let mut uploads = BTreeMap::new();
        for records in data {
            self.enrich_and_upload(records, &timeline, &mut uploads).await;
        }

        let mut report = SyncReport {
            window_start,
            window_end: now,
            backfill_start,
            branches,
            uploads,
            therapy_snapshots: timeline.len(),
            sync_checkpoint_advanced: false,
            backfill_checkpoint_advanced: false,
        };
        self.advance_checkpoint(checkpoint, now, &mut report).await;

        info!(
            documents = report.documents_written(),
            failed_branches = report.failed_branches().len(),
            failed_batches = report.batches_failed(),
            sync_checkpoint_advanced = report.sync_checkpoint_advanced,
            "sync pass finished"
        );
        Ok(report)
    }

    async fn run_branches(
        &self,
        ctx: &FetchContext,
        backfill_start: DateTime<Utc>,
        backfill_end: DateTime<Utc>,
    ) -> Vec<BranchResult> {
        let mut set: JoinSet<BranchResult> = JoinSet::new();
        let timeout = self.config.branch_timeout;

        let engine = self.backfill.clone();
        let tz = self.config.timezone;
        spawn_branch(&mut set, SyncBranch::TherapyBackfill, timeout, async move {
            engine
                .run(backfill_start, backfill_end, tz)
                .await
                .map(BranchData::Therapy)
        });

        for branch in SyncBranch::METRICS {
            let ctx = ctx.clone();
            spawn_branch(&mut set, branch, timeout, async move {
                fetch_branch(branch, &ctx).await
            });
        }

        let mut results: Vec<BranchResult> = Vec::with_capacity(SyncBranch::METRICS.len() + 1);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "branch task aborted"),
            }
        }

        // A panicked task never reports its branch
        let reported: HashSet<SyncBranch> = results.iter().map(|(branch, _)| *branch).collect();
        for branch in std::iter::once(SyncBranch::TherapyBackfill).chain(SyncBranch::METRICS) {
            if !reported.contains(&branch) {
                results.push((
                    branch,
                    Err(BranchOutcome::Failed {
                        message: "branch task aborted".to_owned(),
                    }),
                ));
            }
        }
        results
    }

    async fn enrich_and_upload(
        &self,
        data: BranchData,
        timeline: &SnapshotTimeline,
        uploads: &mut BTreeMap<String, UploadSummary>,
    ) {
        match data {
            BranchData::Therapy(outcome) => {
                self.upload(&outcome.hours, uploads).await;
            }
            BranchData::BloodGlucose(mut streams) => {
                tag_profiles(&mut streams.hourly, timeline);
                tag_profiles(&mut streams.average, timeline);
                tag_profiles(&mut streams.percentages, timeline);
                tag_profiles(&mut streams.uroc, timeline);
                self.upload(&streams.hourly, uploads).await;
                self.upload(&streams.average, uploads).await;
                self.upload(&streams.percentages, uploads).await;
                self.upload(&streams.uroc, uploads).await;
            }
            BranchData::HeartRate(mut streams) => {
                tag_profiles(&mut streams.hourly, timeline);
                tag_profiles(&mut streams.daily_average, timeline);
                self.upload(&streams.hourly, uploads).await;
                self.upload(&streams.daily_average, uploads).await;
            }
            BranchData::Exercise(mut streams) => {
                tag_profiles(&mut streams.hourly, timeline);
                tag_profiles(&mut streams.daily_average, timeline);
                self.upload(&streams.hourly, uploads).await;
                self.upload(&streams.daily_average, uploads).await;
            }
            BranchData::Energy(mut streams) => {
                tag_profiles(&mut streams.hourly, timeline);
                tag_profiles(&mut streams.daily_average, timeline);
                self.upload(&streams.hourly, uploads).await;
                self.upload(&streams.daily_average, uploads).await;
            }
            BranchData::Menstrual(mut records) => {
                tag_profiles(&mut records, timeline);
                self.upload(&records, uploads).await;
            }
            BranchData::BodyMass(mut records) => {
                tag_profiles(&mut records, timeline);
                self.upload(&records, uploads).await;
            }
            BranchData::RestingHeartRate(mut records) => {
                tag_profiles(&mut records, timeline);
                self.upload(&records, uploads).await;
            }
            BranchData::Sleep(mut records) => {
                tag_profiles(&mut records, timeline);
                self.upload(&records, uploads).await;
            }
        }
    }

    async fn upload<R: StreamRecord + Sync>(&self, records: &[R], uploads: &mut BTreeMap<String, UploadSummary>) {
        let summary = self.uploader.upsert(records).await;
        uploads.entry(upload_key::<R>()).or_default()
            .absorb(summary);
    }

    async fn advance_checkpoint(&self, mut checkpoint: SyncCheckpoint, now: DateTime<Utc>, report: &mut SyncReport) {
        let therapy_key = upload_key::<TherapyHour>();
        let therapy_ok = report
            .branches
            .get(&SyncBranch::TherapyBackfill)
            .is_some_and(BranchOutcome::is_success);
        let therapy_batches_failed = report
            .uploads
            .get(&therapy_key)
            .is_some_and(|summary| !summary.is_complete());
        let metric_batches_failed = report
            .uploads
            .iter()
            .filter(|(kind, _)| **kind != therapy_key)
            .any(|(_, summary)| !summary.is_complete());

        let (advance_sync, advance_backfill) = match self.config.checkpoint_policy {
            CheckpointPolicy::Lenient => (true, true),
            CheckpointPolicy::HoldOnFailure => (
                !report.has_metric_failure() && !metric_batches_failed,
                therapy_ok && !therapy_batches_failed,
            ),
        };
        if !advance_backfill {
            warn!(therapy_ok, therapy_batches_failed, "holding therapy backfill checkpoint");
        }
        if !advance_sync {
            warn!(failed = ?report.failed_branches(), "holding sync checkpoint after failures");
        }
        if advance_sync {
            checkpoint.last_sync_date = Some(now);
        }
        if advance_backfill {
            checkpoint.last_therapy_backfill_date = Some(now);
        }
        if !(advance_sync || advance_backfill) {
            return;
        }

        match self.checkpoints.save(&checkpoint).await {
            Ok(()) => {
                report.sync_checkpoint_advanced = advance_sync;
                report.backfill_checkpoint_advanced = advance_backfill;
            }
            Err(e) => error!(error = %e, "failed to save sync checkpoint"),
        }
    }
}

fn spawn_branch<F>(
    set: &mut JoinSet<BranchResult>,
    branch: SyncBranch,
    timeout: Duration,
    work: F,
) where
    F: Future<Output = AppResult<BranchData>> + Send + 'static,
{
    set.spawn(async move {
        let result = match tokio::time::timeout(timeout, work).await {
            Ok(Ok(records)) => Ok(records),
            Ok(Err(e)) => Err(BranchOutcome::Failed { message: e.to_string() }),
            Err(_) => Err(BranchOutcome::TimedOut {
                after_secs: timeout.as_secs(),
            }),
        };
        (branch, result)
    });
}

async fn fetch_branch(branch: SyncBranch, ctx: &FetchContext) -> AppResult<BranchData> {
    let data = match branch {
        SyncBranch::BloodGlucose => fetch_blood_glucose(ctx).await.map(BranchData::BloodGlucose),
        SyncBranch::HeartRate => fetch_heart_rate(ctx).await.map(BranchData::HeartRate),
        SyncBranch::Exercise => fetch_exercise(ctx).await.map(BranchData::Exercise),
        SyncBranch::Menstrual => fetch_menstrual(ctx).await.map(BranchData::Menstrual),
        SyncBranch::BodyMass => fetch_body_mass(ctx).await.map(BranchData::BodyMass),
        SyncBranch::RestingHeartRate => fetch_resting_heart_rate(ctx)
            .await
            .map(BranchData::RestingHeartRate),
        SyncBranch::Sleep => fetch_sleep(ctx).await.map(BranchData::Sleep),
        SyncBranch::Energy => fetch_energy(ctx).await.map(BranchData::Energy),
        SyncBranch::TherapyBackfill => {
            return Err(AppError::internal("therapy backfill is not a metric branch"));
        }
    };
    data.map_err(AppError::from)
}

/// Report key of a record type's uploads: `{kind}/{subpath}`
fn upload_key<R: StreamRecord>() -> String {
    format!("{}/{}", R::KIND, R::subpath())
}

/// Attach the profile active at each record's bucket start
pub fn tag_profiles<R: ProfileTagged>(records: &mut [R], timeline: &SnapshotTimeline) {
    for record in records {
        record.set_therapy_profile_id(timeline.profile_at(record.bucket_start()));
    }
}
