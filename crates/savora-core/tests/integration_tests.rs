//! Savora Core Integration Tests

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use savora_core::{
    Error, Result,
    config::Config,
    image::{GenerationRequest, GenerationResult},
    recommend::{RecommendRequest, RecommendationEngine, all_dishes},
    session::SessionStore,
    signing::{Credentials, RequestSigner, SigningContext},
    weather::WeatherReport,
};

#[tokio::test]
async fn test_full_recommendation_workflow() {
    let engine = RecommendationEngine::builder().build();

    let request = RecommendRequest {
        query: Some("something for dinner".to_string()),
        city: None,
        session_key: "workflow".to_string(),
        with_image: false,
    };

    let recommendation = engine.recommend(&request).await.unwrap();

    assert!(all_dishes().contains(&recommendation.dish.as_str()));
    assert!(!recommendation.description.is_empty());
    assert!(!recommendation.reason.is_empty());
    assert!(recommendation.image_path.is_none());

    // The session remembers the dish for "another one"
    let last = engine.sessions().recall("workflow").unwrap();
    assert_eq!(last.dish, recommendation.dish);
}

#[tokio::test]
async fn test_another_replaces_last_recommendation() {
    let engine = RecommendationEngine::builder().build();

    let request = RecommendRequest::new("swap");
    let first = engine.recommend(&request).await.unwrap();

    let second = engine.another("swap").await.unwrap();
    assert!(all_dishes().contains(&second.dish.as_str()));

    // The replacement is what the session now remembers
    let last = engine.sessions().recall("swap").unwrap();
    assert_eq!(last.dish, second.dish);

    // Usually a different dish; either way both are valid picks
    assert!(!first.dish.is_empty());
}

#[tokio::test]
async fn test_another_without_history_is_an_error() {
    let engine = RecommendationEngine::builder().build();

    let result = engine.another("stranger").await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_concurrent_recommendations() {
    let engine = Arc::new(RecommendationEngine::builder().build());

    let a = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.recommend(&RecommendRequest::new("desk-a")).await })
    };
    let b = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.recommend(&RecommendRequest::new("desk-b")).await })
    };
    let c = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.recommend(&RecommendRequest::new("desk-c")).await })
    };

    let (a, b, c) = tokio::join!(a, b, c);
    assert!(a.unwrap().is_ok());
    assert!(b.unwrap().is_ok());
    assert!(c.unwrap().is_ok());

    // Each desk keeps its own history
    assert!(engine.sessions().recall("desk-a").is_some());
    assert!(engine.sessions().recall("desk-b").is_some());
    assert!(engine.sessions().recall("desk-c").is_some());
}

#[test]
fn test_error_codes() {
    let errors = [
        Error::MissingCredentials,
        Error::HttpStatus(500),
        Error::Vendor {
            code: "50411".to_string(),
            message: "test".to_string(),
        },
        Error::NoImageInResponse,
        Error::Download("test".to_string()),
        Error::Llm("test".to_string()),
        Error::Weather("test".to_string()),
        Error::Config("test".to_string()),
        Error::InvalidInput("test".to_string()),
    ];

    for error in errors.iter() {
        let code = error.code();
        assert!(!code.is_empty());
        assert!(code.starts_with('E'));
    }
}

#[test]
fn test_result_types() {
    let ok_result: Result<i32> = Ok(42);
    let err_result: Result<i32> = Err(Error::MissingCredentials);

    assert!(ok_result.is_ok());
    assert!(err_result.is_err());
}

#[test]
fn test_error_display_messages() {
    // These strings surface to API callers, so they are pinned
    assert_eq!(
        Error::NoImageInResponse.to_string(),
        "no image urls in response"
    );
    assert_eq!(Error::HttpStatus(502).to_string(), "HTTP 502");

    let vendor = Error::Vendor {
        code: "50411".to_string(),
        message: "prompt rejected".to_string(),
    };
    assert_eq!(vendor.to_string(), "prompt rejected");

    assert!(Error::MissingCredentials.to_string().contains("VOLC_ACCESS_KEY"));
}

#[test]
fn test_error_debug() {
    let error = Error::Download("connection reset".to_string());
    let debug = format!("{:?}", error);
    assert!(debug.contains("Download"));
}

#[test]
fn test_error_suggestions() {
    assert!(Error::MissingCredentials.suggestion().is_some());
    assert!(Error::NoImageInResponse.suggestion().is_none());
}

#[test]
fn test_signing_is_deterministic() {
    let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let context = || {
        SigningContext::new("visual.volcengineapi.com", "cn-north-1", "cv").at(timestamp)
    };

    let mut query = BTreeMap::new();
    query.insert("Action".to_string(), "CVProcess".to_string());
    query.insert("Version".to_string(), "2022-08-31".to_string());

    let signer = RequestSigner::new(Credentials::new("ak", "sk"));
    let first = signer.sign(&context(), &query, "{}").unwrap();
    let second = signer.sign(&context(), &query, "{}").unwrap();

    assert_eq!(first.authorization, second.authorization);
    assert_eq!(first.x_content_sha256, second.x_content_sha256);

    // A different secret produces a different signature
    let other = RequestSigner::new(Credentials::new("ak", "other-sk"));
    let third = other.sign(&context(), &query, "{}").unwrap();
    assert_ne!(first.authorization, third.authorization);
}

#[test]
fn test_signing_header_shape() {
    let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let context = SigningContext::new("visual.volcengineapi.com", "cn-north-1", "cv").at(timestamp);

    let signer = RequestSigner::new(Credentials::new("ak", "sk"));
    let headers = signer.sign(&context, &BTreeMap::new(), "{}").unwrap();

    assert!(
        headers
            .authorization
            .starts_with("HMAC-SHA256 Credential=ak/20240501/cn-north-1/cv/request,")
    );
    assert!(
        headers
            .authorization
            .contains("SignedHeaders=content-type;host;x-content-sha256;x-date")
    );
    assert_eq!(headers.x_date, "20240501T120000Z");
    assert_eq!(headers.content_type, "application/json");
}

#[test]
fn test_signing_rejects_empty_credentials() {
    let signer = RequestSigner::new(Credentials::new("", "sk"));
    let context = SigningContext::new("host", "region", "service");

    let result = signer.sign(&context, &BTreeMap::new(), "{}");
    assert!(matches!(result, Err(Error::MissingCredentials)));
}

#[test]
fn test_generation_request_freeze_is_stable() {
    let request = GenerationRequest::new("a bowl of ramen");

    let first = request.freeze().unwrap();
    let second = request.freeze().unwrap();
    assert_eq!(first, second);
    assert!(first.contains("\"prompt\":\"a bowl of ramen\""));
}

#[test]
fn test_generation_request_rejects_empty_prompt() {
    let request = GenerationRequest::new("");
    assert!(matches!(
        request.freeze(),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_generation_result_from_error() {
    let result = GenerationResult::from(Error::NoImageInResponse);

    assert!(!result.is_success());
    match result {
        GenerationResult::Failure { code, message } => {
            assert_eq!(code, -1);
            assert_eq!(message, "no image urls in response");
        }
        GenerationResult::Success { .. } => panic!("expected failure"),
    }
}

#[test]
fn test_generation_result_first_url() {
    let result = GenerationResult::Success {
        image_urls: vec!["https://a".to_string(), "https://b".to_string()],
    };
    assert!(result.is_success());
    assert_eq!(result.first_url(), Some("https://a"));
}

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.image.host, "visual.volcengineapi.com");
    assert_eq!(config.image.region, "cn-north-1");
    assert_eq!(config.image.service, "cv");
    assert_eq!(config.image.model, "high_aes_general_v21_L");
    assert_eq!(config.image.width, 1024);
    assert_eq!(config.image.height, 1024);
    assert_eq!(config.image.max_kept_images, 10);
    assert!(config.image.access_key.is_none());

    assert_eq!(config.llm.model, "anthropic/claude-3.5-haiku");
    assert!(config.llm.enabled);
    assert!(config.llm.api_key.is_none());

    assert!(config.weather.enabled);
    assert_eq!(config.weather.base_url, "https://wttr.in");

    assert_eq!(config.recommend.session_ttl_hours, 24);
    assert_eq!(config.recommend.session_ttl(), Duration::hours(24));

    assert!(config.validate().is_ok());
}

#[test]
fn test_config_set_and_get() {
    let mut config = Config::default();

    config.set("image.width", "768").unwrap();
    assert_eq!(config.get("image.width").unwrap(), "768");

    config.set("llm.temperature", "0.5").unwrap();
    assert_eq!(config.get("llm.temperature").unwrap(), "0.5");

    config.set("weather.default_city", "Chengdu").unwrap();
    assert_eq!(config.get("weather.default_city").unwrap(), "Chengdu");
}

#[test]
fn test_config_set_validates_values() {
    let mut config = Config::default();

    assert!(config.set("image.width", "0").is_err());
    assert!(config.set("image.width", "wide").is_err());
    assert!(config.set("llm.temperature", "3.5").is_err());
    assert!(config.set("recommend.session_ttl_hours", "0").is_err());
}

#[test]
fn test_config_rejects_unknown_keys() {
    let mut config = Config::default();

    let err = config.set("image.quality", "high").unwrap_err();
    assert!(err.to_string().contains("Unknown configuration key"));
    assert!(config.get("image.quality").is_err());
}

#[test]
fn test_config_refuses_stored_secrets() {
    let mut config = Config::default();

    let err = config.set("llm.api_key", "sk-secret").unwrap_err();
    assert!(err.to_string().contains("cannot be stored"));

    let err = config.set("image.access_key", "ak").unwrap_err();
    assert!(err.to_string().contains("cannot be stored"));

    // A programmatically injected key fails validation too
    config.llm.api_key = Some("sk-secret".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_config_list_covers_sections() {
    let config = Config::default();
    let items = config.list().unwrap();

    let keys: Vec<&str> = items.iter().map(|(k, _)| k.as_str()).collect();
    assert!(keys.contains(&"image.model"));
    assert!(keys.contains(&"llm.model"));
    assert!(keys.contains(&"weather.enabled"));
    assert!(keys.contains(&"recommend.session_ttl_hours"));
}

#[test]
fn test_session_store_workflow() {
    let store: SessionStore<String> = SessionStore::new(Duration::hours(1));

    store.remember("alice", "ramen".to_string());
    store.remember("bob", "hotpot".to_string());

    assert_eq!(store.recall("alice").as_deref(), Some("ramen"));
    assert_eq!(store.recall("bob").as_deref(), Some("hotpot"));
    assert!(store.recall("carol").is_none());

    assert!(store.forget("alice"));
    assert!(store.recall("alice").is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_weather_report_helpers() {
    let fallback = WeatherReport::fallback("Shanghai");
    assert_eq!(fallback.temperature_c, 20);
    assert_eq!(fallback.description, "Clear");
    assert!(!fallback.is_wet());

    let rainy = WeatherReport {
        temperature_c: 15,
        description: "Light rain shower".to_string(),
        city: "London".to_string(),
    };
    assert!(rainy.is_wet());
}
