// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for the Waypoint chat relay.
//!
//! Provides the two [`RealtimeStore`] backends (Firebase REST and an
//! in-process tree) and the typed views the relay works through:
//! [`MessageStore`], [`PresenceSignal`], and [`ItineraryStateStore`].

pub mod firebase;
pub mod itinerary;
pub mod memory;
pub mod messages;
pub mod presence;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use waypoint_config::model::DatabaseConfig;
use waypoint_core::{RealtimeStore, RelayError};

pub use firebase::{FirebaseStore, ServiceAccountKey};
pub use itinerary::{ItineraryState, ItineraryStateStore};
pub use memory::MemoryStore;
pub use messages::MessageStore;
pub use presence::PresenceSignal;

/// Construct the store selected by configuration.
///
/// Called once at startup; the returned handle is shared by every component.
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn RealtimeStore>, RelayError> {
    if config.is_memory() {
        info!("using in-process memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let url = config
        .url
        .as_deref()
        .ok_or_else(|| RelayError::Config("database.url is not set".to_string()))?;
    let credentials = config
        .credentials_path
        .as_deref()
        .ok_or_else(|| RelayError::Config("database.credentials_path is not set".to_string()))?;

    let key = ServiceAccountKey::from_file(Path::new(credentials)).await?;
    info!(
        database_url = url,
        client_email = %key.client_email,
        "connecting to firebase realtime database"
    );
    let store = FirebaseStore::new(
        url,
        key,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::ServiceAdapter;

    #[tokio::test]
    async fn memory_url_opens_memory_store() {
        let config = DatabaseConfig {
            url: Some("memory://".to_string()),
            ..Default::default()
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn firebase_requires_credentials() {
        let config = DatabaseConfig {
            url: Some("https://demo.firebaseio.com".to_string()),
            ..Default::default()
        };
        let err = open_store(&config).await.err().unwrap();
        assert!(matches!(err, RelayError::Config(msg) if msg.contains("credentials_path")));
    }

    #[tokio::test]
    async fn firebase_store_opens_from_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sa.json");
        let json = serde_json::json!({
            "client_email": "relay@demo-project.iam.gserviceaccount.com",
            "private_key": firebase::auth::tests::TEST_PRIVATE_KEY,
        });
        std::fs::write(&file, json.to_string()).unwrap();

        let config = DatabaseConfig {
            url: Some("https://demo.firebaseio.com".to_string()),
            credentials_path: Some(file.display().to_string()),
            ..Default::default()
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "firebase");
    }
}
