// ABOUTME: Local therapy profile store persisted as a JSON file in the state directory
// ABOUTME: Validates profiles at edit time and falls back to a built-in default profile
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use insite_core::errors::{AppError, AppResult};
use insite_core::models::TherapyProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// On-disk layout of the profile file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileFile {
    #[serde(default)]
    profiles: Vec<TherapyProfile>,
    #[serde(default)]
    active_profile_id: Option<Uuid>,
}

/// Therapy profiles the user has configured on this device
pub struct ProfileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ProfileStore {
    /// Store backed by `path`; the file is created on first save
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> AppResult<ProfileFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no profile file yet");
                Ok(ProfileFile::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file(&self, file: &ProfileFile) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(file)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }

    /// Saved profiles, or the default profile when none are saved
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub async fn list(&self) -> AppResult<Vec<TherapyProfile>> {
        let file = self.read_file().await?;
        if file.profiles.is_empty() {
            return Ok(vec![TherapyProfile::default_profile()]);
        }
        Ok(file.profiles)
    }

    /// Profile with the given name, compared case-insensitively
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when no profile has that name
    pub async fn find_by_name(&self, name: &str) -> AppResult<TherapyProfile> {
        self.list()
            .await?
            .into_iter()
            .find(|profile| profile.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| AppError::not_found(format!("therapy profile '{name}'")))
    }

    /// Insert or replace a profile by id
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an invalid profile or a name already used by
    /// another profile, or a storage error if the file cannot be written
    pub async fn save(&self, profile: &TherapyProfile) -> AppResult<()> {
        profile.validate()?;
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_file().await?;

        if file
            .profiles
            .iter()
            .any(|existing| existing.id != profile.id && existing.name.eq_ignore_ascii_case(&profile.name))
        {
            return Err(AppError::invalid_input(format!(
                "a therapy profile named '{}' already exists",
                profile.name
            )));
        }

        match file.profiles.iter_mut().find(|existing| existing.id == profile.id) {
            Some(existing) => *existing = profile.clone(),
            None => file.profiles.push(profile.clone()),
        }
        self.write_file(&file).await?;
        info!(therapy.profile_id = %profile.id, therapy.profile = %profile.name, "therapy profile saved");
        Ok(())
    }

    /// Profile marked active, else the first saved profile, else the default
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub async fn active(&self) -> AppResult<TherapyProfile> {
        let file = self.read_file().await?;
        let active = file
            .active_profile_id
            .and_then(|id| file.profiles.iter().find(|profile| profile.id == id))
            .or_else(|| file.profiles.first())
            .cloned();
        Ok(active.unwrap_or_else(TherapyProfile::default_profile))
    }

    /// Mark `profile` active, saving it first if it is new
    ///
    /// # Errors
    ///
    /// Returns the validation or storage error from saving
    pub async fn set_active(&self, profile: &TherapyProfile) -> AppResult<()> {
        self.save(profile).await?;
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_file().await?;
        file.active_profile_id = Some(profile.id);
        self.write_file(&file).await
    }
}
