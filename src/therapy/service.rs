// ABOUTME: Therapy service tying the local profile store to the snapshot log
// ABOUTME: Activating a profile appends an immutable snapshot both remotely and to the shared cache
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::log::{SnapshotLog, TherapyLogStore};
use super::profile::ProfileStore;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use insite_core::errors::AppResult;
use insite_core::models::{resolve_hour_range, HourRange, TherapyHour, TherapyProfile, TherapySnapshot};
use tracing::info;

/// Profile management and point-in-time resolution
pub struct TherapyService {
    profiles: ProfileStore,
    log_store: TherapyLogStore,
    cache: SnapshotLog,
}

impl TherapyService {
    /// Service over explicit collaborators
    #[must_use]
    pub const fn new(profiles: ProfileStore, log_store: TherapyLogStore, cache: SnapshotLog) -> Self {
        Self {
            profiles,
            log_store,
            cache,
        }
    }

    /// Local profile store
    #[must_use]
    pub const fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Shared snapshot cache
    #[must_use]
    pub const fn cache(&self) -> &SnapshotLog {
        &self.cache
    }

    /// Make `profile` the active configuration from `at` onward.
    ///
    /// The profile is validated and saved locally, then a snapshot is written
    /// to the remote log and appended to the cache.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an invalid profile, or a storage error if
    /// either write fails
    pub async fn activate_profile(&self, profile: &TherapyProfile, at: DateTime<Utc>) -> AppResult<TherapySnapshot> {
        self.profiles.set_active(profile).await?;
        let snapshot = TherapySnapshot::capture(profile, at);
        self.log_store.append(&snapshot).await?;
        self.cache.append(snapshot.clone()).await;
        info!(
            therapy.profile_id = %profile.id,
            therapy.profile = %profile.name,
            snapshot_id = %snapshot.id,
            effective = %at,
            "therapy profile activated"
        );
        Ok(snapshot)
    }

    /// Activate the saved profile called `name`
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for an unknown name, otherwise as
    /// [`Self::activate_profile`]
    pub async fn activate_by_name(&self, name: &str, at: DateTime<Utc>) -> AppResult<TherapySnapshot> {
        let profile = self.profiles.find_by_name(name).await?;
        self.activate_profile(&profile, at).await
    }

    /// Settings in effect at `at`, from the cached log
    pub async fn resolve(&self, at: DateTime<Utc>, tz: Tz) -> Option<TherapyHour> {
        self.cache.timeline().await.resolve(at, tz)
    }

    /// Range of the locally active profile covering `local_hour`
    ///
    /// # Errors
    ///
    /// Returns an error if the profile file cannot be read
    pub async fn range_for_local_hour(&self, local_hour: u8) -> AppResult<(TherapyProfile, Option<HourRange>)> {
        let profile = self.profiles.active().await?;
        let range = resolve_hour_range(local_hour, &profile.hour_ranges).copied();
        Ok((profile, range))
    }
}
