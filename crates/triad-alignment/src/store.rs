//! The alignment store.
//!
//! Mutations take a per-user lock, build the candidate profile set, persist
//! it and only then publish it in memory. A failed write therefore leaves
//! both the file and the in-memory view at their previous state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use triad_types::{AlignmentProfile, AlignmentStats, MoodVector};

use crate::error::{AlignmentError, AlignmentResult};
use crate::persistence::{InMemoryProfiles, JsonLinesProfileFile, ProfilePersistence};

/// Keyed, durable store of alignment profiles.
#[async_trait]
pub trait AlignmentStore: Send + Sync {
    /// Return the profile, creating a neutral one on first contact.
    async fn get_or_create(&self, user_id: &str) -> AlignmentResult<AlignmentProfile>;

    /// Apply one accepted interaction. Never call for rejected results.
    async fn apply_accepted(
        &self,
        user_id: &str,
        mood: &MoodVector,
        coherence: f64,
    ) -> AlignmentResult<AlignmentProfile>;

    /// Read without creating.
    async fn peek(&self, user_id: &str) -> AlignmentResult<Option<AlignmentProfile>>;

    /// Set one free-form preference. EMA state is untouched.
    async fn set_preference(
        &self,
        user_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> AlignmentResult<AlignmentProfile>;

    /// Copy of every profile, sorted by user id.
    async fn snapshot(&self) -> AlignmentResult<Vec<AlignmentProfile>>;

    async fn len(&self) -> AlignmentResult<usize>;

    async fn stats(&self) -> AlignmentResult<AlignmentStats> {
        let profiles = self.snapshot().await?;
        Ok(AlignmentStats::from_profiles(&profiles))
    }
}

/// Alignment store over any [`ProfilePersistence`] backend.
///
/// Backend saves run on the blocking pool; only the committing user and
/// other writers wait for the disk.
pub struct ProfileStore<P: ProfilePersistence> {
    profiles: RwLock<HashMap<String, AlignmentProfile>>,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Serialises persist-then-publish so the backend always holds the
    /// latest full set.
    commit_lock: Mutex<()>,
    persistence: Arc<P>,
}

pub type JsonProfileStore = ProfileStore<JsonLinesProfileFile>;
pub type InMemoryProfileStore = ProfileStore<InMemoryProfiles>;

impl<P: ProfilePersistence + 'static> ProfileStore<P> {
    /// Open the store, loading whatever the backend already holds.
    pub fn open(persistence: P) -> AlignmentResult<Self> {
        let loaded = persistence.load()?;
        let profiles: HashMap<String, AlignmentProfile> = loaded
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();

        info!(profiles = profiles.len(), "Alignment store opened");

        Ok(Self {
            profiles: RwLock::new(profiles),
            user_locks: Mutex::new(HashMap::new()),
            commit_lock: Mutex::new(()),
            persistence: Arc::new(persistence),
        })
    }

    pub fn persistence(&self) -> &P {
        self.persistence.as_ref()
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the user's lock entry once no task holds a handle to it.
    async fn release_user_lock(&self, user_id: &str) {
        let mut locks = self.user_locks.lock().await;
        if locks
            .get(user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(user_id);
        }
    }

    #[cfg(test)]
    async fn tracked_user_locks(&self) -> usize {
        self.user_locks.lock().await.len()
    }

    async fn current(&self, user_id: &str) -> Option<AlignmentProfile> {
        self.profiles.read().await.get(user_id).cloned()
    }

    /// Persist the set with `updated` in place, then publish it.
    ///
    /// Callers must hold the user's lock.
    async fn commit(&self, updated: AlignmentProfile) -> AlignmentResult<AlignmentProfile> {
        let _commit = self.commit_lock.lock().await;

        let mut candidate: Vec<AlignmentProfile> = {
            let profiles = self.profiles.read().await;
            profiles
                .values()
                .filter(|p| p.user_id != updated.user_id)
                .cloned()
                .collect()
        };
        candidate.push(updated.clone());

        let persistence = Arc::clone(&self.persistence);
        let saved = tokio::task::spawn_blocking(move || persistence.save(&candidate))
            .await
            .unwrap_or_else(|e| {
                Err(AlignmentError::Persistence(format!(
                    "profile save task failed: {e}"
                )))
            });
        if let Err(e) = saved {
            error!(
                user_id = %updated.user_id,
                error = %e,
                "Failed to persist alignment profiles; change discarded"
            );
            return Err(e);
        }

        self.profiles
            .write()
            .await
            .insert(updated.user_id.clone(), updated.clone());
        Ok(updated)
    }

    /// Run `mutate` on the user's profile (created if absent) under the
    /// user's lock and commit the result.
    async fn mutate<F>(&self, user_id: &str, mutate: F) -> AlignmentResult<AlignmentProfile>
    where
        F: FnOnce(&mut AlignmentProfile) + Send,
    {
        validate_user_id(user_id)?;
        let result = {
            let lock = self.user_lock(user_id).await;
            let _guard = lock.lock().await;

            let mut profile = match self.current(user_id).await {
                Some(p) => p,
                None => {
                    info!(user_id = %user_id, "Creating alignment profile");
                    AlignmentProfile::new(user_id, Utc::now())
                }
            };
            mutate(&mut profile);
            self.commit(profile).await
        };
        self.release_user_lock(user_id).await;
        result
    }
}

fn validate_user_id(user_id: &str) -> AlignmentResult<()> {
    if user_id.trim().is_empty() {
        return Err(AlignmentError::InvalidInput("user id must not be empty".into()));
    }
    Ok(())
}

impl ProfileStore<InMemoryProfiles> {
    pub fn in_memory() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
            commit_lock: Mutex::new(()),
            persistence: Arc::new(InMemoryProfiles::new()),
        }
    }
}

#[async_trait]
impl<P: ProfilePersistence + 'static> AlignmentStore for ProfileStore<P> {
    async fn get_or_create(&self, user_id: &str) -> AlignmentResult<AlignmentProfile> {
        validate_user_id(user_id)?;
        if let Some(existing) = self.current(user_id).await {
            return Ok(existing);
        }

        let result = {
            let lock = self.user_lock(user_id).await;
            let _guard = lock.lock().await;
            // another task may have created it while we waited
            match self.current(user_id).await {
                Some(existing) => Ok(existing),
                None => {
                    info!(user_id = %user_id, "Creating alignment profile");
                    self.commit(AlignmentProfile::new(user_id, Utc::now()))
                        .await
                }
            }
        };
        self.release_user_lock(user_id).await;
        result
    }

    async fn apply_accepted(
        &self,
        user_id: &str,
        mood: &MoodVector,
        coherence: f64,
    ) -> AlignmentResult<AlignmentProfile> {
        let mood = *mood;
        let updated = self
            .mutate(user_id, move |profile| {
                profile.absorb(&mood, coherence, Utc::now())
            })
            .await?;

        info!(
            user_id = %user_id,
            alignment_score = updated.alignment_score,
            interaction_count = updated.interaction_count,
            "Alignment profile updated"
        );
        Ok(updated)
    }

    async fn peek(&self, user_id: &str) -> AlignmentResult<Option<AlignmentProfile>> {
        Ok(self.current(user_id).await)
    }

    async fn set_preference(
        &self,
        user_id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> AlignmentResult<AlignmentProfile> {
        if key.trim().is_empty() {
            return Err(AlignmentError::InvalidInput(
                "preference key must not be empty".into(),
            ));
        }
        let key = key.to_string();
        debug!(user_id = %user_id, key = %key, "Setting profile preference");
        self.mutate(user_id, move |profile| {
            profile.preferences.insert(key, value);
        })
        .await
    }

    async fn snapshot(&self) -> AlignmentResult<Vec<AlignmentProfile>> {
        let mut profiles: Vec<AlignmentProfile> =
            self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(profiles)
    }

    async fn len(&self) -> AlignmentResult<usize> {
        Ok(self.profiles.read().await.len())
    }
}
