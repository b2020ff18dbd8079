use std::sync::Arc;

use crate::dao::{
    kv_store::{KvStore, PutOptions},
    models::Observation,
    storage::{StorageError, StorageResult},
};

/// Key holding the single retained [`Observation`].
pub const OBSERVATION_KEY: &str = "odin-observation";

/// Data Access Object for the last player-count observation.
#[derive(Clone)]
pub struct ObservationRepository {
    kv: Arc<dyn KvStore>,
}

impl ObservationRepository {
    /// Repository over `kv`.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Read the retained observation, if one was ever written.
    pub async fn get(&self) -> StorageResult<Option<Observation>> {
        let Some(json) = self.kv.get(OBSERVATION_KEY.to_string()).await? else {
            return Ok(None);
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: OBSERVATION_KEY.to_string(),
                source,
            })
    }

    /// Overwrite the retained observation.
    pub async fn put(&self, observation: Observation) -> StorageResult<()> {
        let json = serde_json::to_string(&observation).map_err(|source| StorageError::Corrupt {
            key: OBSERVATION_KEY.to_string(),
            source,
        })?;
        self.kv
            .put(OBSERVATION_KEY.to_string(), json, PutOptions::default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::kv_store::MemoryKvStore;

    #[tokio::test]
    async fn round_trips_offline_observation_as_null() {
        let store = MemoryKvStore::new();
        let repository = ObservationRepository::new(Arc::new(store.clone()));
        assert!(repository.get().await.unwrap().is_none());

        let offline = Observation {
            instant: 10,
            num_players: None,
        };
        repository.put(offline).await.unwrap();

        let raw = store.get(OBSERVATION_KEY.into()).await.unwrap().unwrap();
        assert_eq!(raw, r#"{"instant":10,"numPlayers":null}"#);
        assert_eq!(repository.get().await.unwrap(), Some(offline));
    }

    #[tokio::test]
    async fn garbage_is_reported_as_corrupt() {
        let store = MemoryKvStore::new();
        store
            .put(OBSERVATION_KEY.into(), "{".into(), PutOptions::default())
            .await
            .unwrap();

        let err = ObservationRepository::new(Arc::new(store))
            .get()
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
