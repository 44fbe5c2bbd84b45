//! Recommendation commands
//!
//! CLI command implementations for the recommendation flow. Wires
//! configuration and environment credentials into the engine and keeps
//! per-session history on disk so "another one" works across
//! invocations.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::llm::{LlmClient, TextCompletion};
use crate::recommend::{
    LastRecommendation, RecommendRequest, Recommendation, RecommendationEngine,
};
use crate::weather::WttrClient;

use super::image;

/// Session key used when the caller does not name one
pub const DEFAULT_SESSION: &str = "cli";

/// One persisted session entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    last: LastRecommendation,
    stored_at: DateTime<Utc>,
}

/// Produce a recommendation for a free-form query
pub async fn recommend(
    config: &Config,
    query: Option<String>,
    city: Option<String>,
    session: Option<String>,
    with_image: bool,
    with_llm: bool,
) -> Result<Recommendation> {
    let engine = build_engine(config, with_image, with_llm)?;
    let session_key = session.unwrap_or_else(|| DEFAULT_SESSION.to_string());

    let request = RecommendRequest {
        query,
        city: city.or_else(|| config.weather.default_city.clone()),
        session_key: session_key.clone(),
        with_image,
    };
    let recommendation = engine.recommend(&request).await?;

    persist_session(&engine, &session_key);
    if recommendation.image_path.is_some() {
        image::sweep(config);
    }

    Ok(recommendation)
}

/// Re-roll the previous recommendation for a session
pub async fn another(config: &Config, session: Option<String>) -> Result<Recommendation> {
    let session_key = session.unwrap_or_else(|| DEFAULT_SESSION.to_string());

    let last = recall_stored(&session_key, config.recommend.session_ttl())?.ok_or_else(|| {
        Error::InvalidInput(
            "no recent recommendation for this session; ask for a fresh one first".to_string(),
        )
    })?;

    let engine = build_engine(config, last.with_image, true)?;
    engine.sessions().remember(session_key.clone(), last);

    let recommendation = engine.another(&session_key).await?;

    persist_session(&engine, &session_key);
    if recommendation.image_path.is_some() {
        image::sweep(config);
    }

    Ok(recommendation)
}

/// Build a recommendation engine wired from configuration and environment
pub fn build_engine(
    config: &Config,
    with_image: bool,
    with_llm: bool,
) -> Result<RecommendationEngine> {
    let mut builder = RecommendationEngine::builder();

    if with_llm && config.llm.enabled {
        match configured_llm(config)? {
            Some(client) => builder = builder.llm(client),
            None => debug!("no LLM API key configured, using catalog and templates"),
        }
    }

    if config.weather.enabled {
        let client = WttrClient::with_timeout(config.weather.timeout_secs)?
            .with_base_url(config.weather.base_url.clone());
        builder = builder.weather(Arc::new(client));
    }

    if with_image {
        match image::configured_client(config)? {
            Some(client) => {
                builder = builder
                    .image_client(client)
                    .image_request(image::request_from_config(&config.image, ""));
            }
            None => warn!("image generation requested but credentials are not set, skipping"),
        }
    }

    Ok(builder.build())
}

fn configured_llm(config: &Config) -> Result<Option<Arc<dyn TextCompletion>>> {
    let api_key = match config
        .llm
        .resolved_api_key()
        .map_err(|e| Error::Config(e.to_string()))?
    {
        Some(key) => key,
        None => return Ok(None),
    };

    let client = LlmClient::builder()
        .api_key(api_key)
        .base_url(config.llm.base_url.clone())
        .model(config.llm.model.clone())
        .temperature(config.llm.temperature)
        .max_tokens(config.llm.max_tokens)
        .timeout_secs(config.llm.timeout_secs)
        .build()?;

    Ok(Some(Arc::new(client)))
}

fn sessions_path() -> Result<PathBuf> {
    Config::config_dir()
        .map(|dir| dir.join("sessions.json"))
        .map_err(|e| Error::Config(e.to_string()))
}

/// Write the engine's record for `key` to the session file
fn persist_session(engine: &RecommendationEngine, key: &str) {
    let last = match engine.sessions().recall(key) {
        Some(last) => last,
        None => return,
    };
    let result = sessions_path().and_then(|path| store_session_at(&path, key, last));
    if let Err(e) = result {
        warn!(error = %e, "failed to persist session history");
    }
}

fn recall_stored(key: &str, ttl: Duration) -> Result<Option<LastRecommendation>> {
    let path = sessions_path()?;
    Ok(recall_stored_at(&path, key, ttl))
}

fn recall_stored_at(path: &Path, key: &str, ttl: Duration) -> Option<LastRecommendation> {
    let sessions = load_sessions_at(path);
    let entry = sessions.get(key)?;
    if Utc::now() - entry.stored_at > ttl {
        return None;
    }
    Some(entry.last.clone())
}

fn store_session_at(path: &Path, key: &str, last: LastRecommendation) -> Result<()> {
    let mut sessions = load_sessions_at(path);
    sessions.insert(
        key.to_string(),
        StoredSession {
            last,
            stored_at: Utc::now(),
        },
    );

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(&sessions)
        .map_err(|e| Error::Config(format!("failed to serialize session history: {e}")))?;
    fs::write(path, contents)?;
    Ok(())
}

fn load_sessions_at(path: &Path) -> HashMap<String, StoredSession> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return HashMap::new(),
    };
    serde_json::from_str(&contents).unwrap_or_else(|e| {
        debug!(error = %e, "session history unreadable, starting fresh");
        HashMap::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_last(dish: &str) -> LastRecommendation {
        LastRecommendation {
            dish: dish.to_string(),
            hint: None,
            city: Some("Shanghai".to_string()),
            with_image: false,
        }
    }

    #[test]
    fn test_store_and_recall_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");

        store_session_at(&path, "alice", sample_last("ramen")).unwrap();

        let recalled = recall_stored_at(&path, "alice", Duration::hours(24)).unwrap();
        assert_eq!(recalled.dish, "ramen");
        assert_eq!(recalled.city.as_deref(), Some("Shanghai"));
    }

    #[test]
    fn test_store_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sessions.json");

        store_session_at(&path, "alice", sample_last("ramen")).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_recall_misses_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");

        store_session_at(&path, "alice", sample_last("ramen")).unwrap();

        assert!(recall_stored_at(&path, "bob", Duration::hours(24)).is_none());
    }

    #[test]
    fn test_recall_filters_expired_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");

        let mut sessions = HashMap::new();
        sessions.insert(
            "stale".to_string(),
            StoredSession {
                last: sample_last("ramen"),
                stored_at: Utc::now() - Duration::hours(25),
            },
        );
        sessions.insert(
            "fresh".to_string(),
            StoredSession {
                last: sample_last("hotpot"),
                stored_at: Utc::now() - Duration::hours(1),
            },
        );
        fs::write(&path, serde_json::to_string(&sessions).unwrap()).unwrap();

        assert!(recall_stored_at(&path, "stale", Duration::hours(24)).is_none());
        assert_eq!(
            recall_stored_at(&path, "fresh", Duration::hours(24))
                .unwrap()
                .dish,
            "hotpot"
        );
    }

    #[test]
    fn test_store_keeps_other_sessions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");

        store_session_at(&path, "alice", sample_last("ramen")).unwrap();
        store_session_at(&path, "bob", sample_last("hotpot")).unwrap();

        let alice = recall_stored_at(&path, "alice", Duration::hours(24)).unwrap();
        let bob = recall_stored_at(&path, "bob", Duration::hours(24)).unwrap();
        assert_eq!(alice.dish, "ramen");
        assert_eq!(bob.dish, "hotpot");
    }

    #[test]
    fn test_corrupt_session_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "not json at all").unwrap();

        assert!(load_sessions_at(&path).is_empty());

        // And storing over it recovers
        store_session_at(&path, "alice", sample_last("ramen")).unwrap();
        assert!(recall_stored_at(&path, "alice", Duration::hours(24)).is_some());
    }

    #[test]
    fn test_build_engine_without_capabilities() {
        let mut config = Config::default();
        config.llm.enabled = false;
        config.weather.enabled = false;

        let engine = build_engine(&config, false, false).unwrap();
        assert!(engine.sessions().is_empty());
    }
}
