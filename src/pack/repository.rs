use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{MapRule, PackMapEntry};
use crate::shared::AppError;

/// Trait for pack map-list and modifier-rule operations.
///
/// The tracker only reads; writes come from the import handlers.
#[async_trait]
pub trait PackRepository: Send + Sync {
    async fn active_map_ids(&self, pack_id: i64) -> Result<HashSet<i64>, AppError>;
    async fn map_rule(&self, pack_id: i64, beatmap_id: i64) -> Result<Option<MapRule>, AppError>;
    async fn replace_pack_maps(
        &self,
        pack_id: i64,
        maps: Vec<PackMapEntry>,
    ) -> Result<(), AppError>;
    async fn remove_pack(&self, pack_id: i64) -> Result<u64, AppError>;
}

/// In-memory implementation for development and testing
#[derive(Default)]
pub struct InMemoryPackRepository {
    packs: Mutex<HashMap<i64, HashMap<i64, Option<MapRule>>>>,
}

impl InMemoryPackRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for tests: seed one pack map, optionally with a rule.
    pub fn insert_map(&self, pack_id: i64, beatmap_id: i64, rule: Option<MapRule>) {
        self.packs
            .lock()
            .unwrap()
            .entry(pack_id)
            .or_default()
            .insert(beatmap_id, rule);
    }
}

#[async_trait]
impl PackRepository for InMemoryPackRepository {
    async fn active_map_ids(&self, pack_id: i64) -> Result<HashSet<i64>, AppError> {
        let packs = self.packs.lock().unwrap();
        Ok(packs
            .get(&pack_id)
            .map(|maps| maps.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn map_rule(&self, pack_id: i64, beatmap_id: i64) -> Result<Option<MapRule>, AppError> {
        let packs = self.packs.lock().unwrap();
        Ok(packs
            .get(&pack_id)
            .and_then(|maps| maps.get(&beatmap_id))
            .cloned()
            .flatten())
    }

    async fn replace_pack_maps(
        &self,
        pack_id: i64,
        maps: Vec<PackMapEntry>,
    ) -> Result<(), AppError> {
        let mut packs = self.packs.lock().unwrap();
        let entry = packs.entry(pack_id).or_default();
        entry.clear();
        for map in maps {
            entry.insert(map.beatmap_id, map.rule);
        }
        Ok(())
    }

    async fn remove_pack(&self, pack_id: i64) -> Result<u64, AppError> {
        let mut packs = self.packs.lock().unwrap();
        let removed = packs.remove(&pack_id).map(|m| m.len()).unwrap_or(0);
        Ok(removed as u64)
    }
}

/// PostgreSQL implementation of pack repository
pub struct PostgresPackRepository {
    pool: PgPool,
}

impl PostgresPackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PackRepository for PostgresPackRepository {
    #[instrument(skip(self))]
    async fn active_map_ids(&self, pack_id: i64) -> Result<HashSet<i64>, AppError> {
        let rows = sqlx::query("SELECT beatmap_id FROM maps WHERE pack_id = $1")
            .bind(pack_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, pack_id, "Failed to fetch pack map list");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(rows.iter().map(|row| row.get("beatmap_id")).collect())
    }

    #[instrument(skip(self))]
    async fn map_rule(&self, pack_id: i64, beatmap_id: i64) -> Result<Option<MapRule>, AppError> {
        let row = sqlx::query(
            "SELECT mods, multiplier, exact_mods FROM maps WHERE pack_id = $1 AND beatmap_id = $2",
        )
        .bind(pack_id)
        .bind(beatmap_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, pack_id, beatmap_id, "Failed to fetch map rule");
            AppError::DatabaseError(e.to_string())
        })?;

        // A map row with NULL mods is in the pack but has no modifier rule.
        let rule = row.and_then(|row| {
            let mods: Option<Vec<String>> = row.get("mods");
            let multiplier: Option<f64> = row.get("multiplier");
            match (mods, multiplier) {
                (Some(required_mods), Some(multiplier)) => Some(MapRule {
                    required_mods,
                    multiplier,
                    exact_mods: row.get::<Option<bool>, _>("exact_mods").unwrap_or(false),
                }),
                _ => None,
            }
        });

        Ok(rule)
    }

    #[instrument(skip(self, maps), fields(map_count = maps.len()))]
    async fn replace_pack_maps(
        &self,
        pack_id: i64,
        maps: Vec<PackMapEntry>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, pack_id, "Failed to open import transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        sqlx::query("DELETE FROM maps WHERE pack_id = $1")
            .bind(pack_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        for map in &maps {
            let (mods, multiplier, exact_mods) = match &map.rule {
                Some(rule) => (
                    Some(rule.required_mods.clone()),
                    Some(rule.multiplier),
                    Some(rule.exact_mods),
                ),
                None => (None, None, None),
            };

            sqlx::query(
                "INSERT INTO maps (pack_id, beatmap_id, mods, multiplier, exact_mods) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(pack_id)
            .bind(map.beatmap_id)
            .bind(mods)
            .bind(multiplier)
            .bind(exact_mods)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                warn!(error = %e, pack_id, beatmap_id = map.beatmap_id, "Failed to insert pack map");
                AppError::DatabaseError(e.to_string())
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        debug!(pack_id, map_count = maps.len(), "Pack map list replaced");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_pack(&self, pack_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM maps WHERE pack_id = $1")
            .bind(pack_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, pack_id, "Failed to remove pack");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(result.rows_affected())
    }
}
