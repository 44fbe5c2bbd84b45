//! Recommendation engine
//!
//! Combines the clock, the dish catalog, and whatever capabilities the
//! caller handed over (LLM, weather, image generation) into a full
//! recommendation. Capabilities are explicit constructor parameters; a
//! missing one downgrades the result instead of failing it.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::image::{GenerationRequest, ImageClient, food_prompt, generate_image_to_file};
use crate::llm::{TextCompletion, completion_session_id};
use crate::session::SessionStore;
use crate::weather::{WeatherLookup, WeatherReport, detect_city};

use super::catalog::{self, Category, MealHint, MealPeriod, Season, parse_meal_hint};
use super::describe::{DishContext, ProviderChain, description_chain, reason_chain};

/// Attempts at landing a different dish for "another one"
const MAX_ANOTHER_ATTEMPTS: usize = 5;

/// Longest dish name accepted from the LLM
const MAX_DISH_NAME_CHARS: usize = 40;

/// City used when nothing resolved one
const FALLBACK_CITY: &str = "Shanghai";

/// What a recommendation request asks for
#[derive(Debug, Clone, Default)]
pub struct RecommendRequest {
    /// Free-form query text, scanned for city and meal hints
    pub query: Option<String>,
    /// Explicit city override
    pub city: Option<String>,
    /// Session key the result is remembered under
    pub session_key: String,
    /// Generate a dish photo alongside the text
    pub with_image: bool,
}

impl RecommendRequest {
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            ..Self::default()
        }
    }
}

/// A complete recommendation
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub dish: String,
    pub reason: String,
    pub description: String,
    pub image_path: Option<PathBuf>,
    pub weather: WeatherReport,
    pub period: MealPeriod,
    pub season: Season,
    pub recommended_at: DateTime<Utc>,
}

/// What the session store keeps for the "another one" flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastRecommendation {
    pub dish: String,
    pub hint: Option<MealHint>,
    pub city: Option<String>,
    pub with_image: bool,
}

/// Builder for the engine
#[derive(Default)]
pub struct RecommendationEngineBuilder {
    llm: Option<Arc<dyn TextCompletion>>,
    weather: Option<Arc<dyn WeatherLookup>>,
    image_client: Option<ImageClient>,
    image_request: Option<GenerationRequest>,
    sessions: Option<SessionStore<LastRecommendation>>,
}

impl RecommendationEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide text completion capability
    pub fn llm(mut self, llm: Arc<dyn TextCompletion>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Provide weather lookup capability
    pub fn weather(mut self, weather: Arc<dyn WeatherLookup>) -> Self {
        self.weather = Some(weather);
        self
    }

    /// Provide image generation capability
    pub fn image_client(mut self, client: ImageClient) -> Self {
        self.image_client = Some(client);
        self
    }

    /// Override the model parameters used for dish photos
    ///
    /// The prompt in the template is ignored; it is replaced per dish.
    pub fn image_request(mut self, request: GenerationRequest) -> Self {
        self.image_request = Some(request);
        self
    }

    /// Use a shared session store
    pub fn sessions(mut self, sessions: SessionStore<LastRecommendation>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn build(self) -> RecommendationEngine {
        RecommendationEngine {
            descriptions: description_chain(self.llm.clone()),
            reasons: reason_chain(self.llm.clone()),
            llm: self.llm,
            weather: self.weather,
            image_client: self.image_client,
            image_request: self.image_request,
            sessions: self.sessions.unwrap_or_default(),
        }
    }
}

/// Food recommendation engine
pub struct RecommendationEngine {
    llm: Option<Arc<dyn TextCompletion>>,
    weather: Option<Arc<dyn WeatherLookup>>,
    image_client: Option<ImageClient>,
    image_request: Option<GenerationRequest>,
    sessions: SessionStore<LastRecommendation>,
    descriptions: ProviderChain,
    reasons: ProviderChain,
}

impl RecommendationEngine {
    pub fn builder() -> RecommendationEngineBuilder {
        RecommendationEngineBuilder::new()
    }

    /// The session store backing the "another one" flow
    pub fn sessions(&self) -> &SessionStore<LastRecommendation> {
        &self.sessions
    }

    /// Produce a recommendation and remember it for the session
    pub async fn recommend(&self, request: &RecommendRequest) -> Result<Recommendation> {
        let hint = request.query.as_deref().and_then(parse_meal_hint);
        let city = request
            .city
            .clone()
            .or_else(|| request.query.as_deref().and_then(detect_city));

        let recommendation = self
            .build_recommendation(hint, city.clone(), request.query.as_deref(), request.with_image)
            .await?;

        self.sessions.remember(
            &request.session_key,
            LastRecommendation {
                dish: recommendation.dish.clone(),
                hint,
                city,
                with_image: request.with_image,
            },
        );

        Ok(recommendation)
    }

    /// Replace the session's last recommendation with a different dish
    ///
    /// Fails when the session has nothing recent to replace. Retries a
    /// few times to land on a different dish; with a small catalog the
    /// same dish can still come up, and the freshest result wins.
    pub async fn another(&self, session_key: &str) -> Result<Recommendation> {
        let last = self.sessions.recall(session_key).ok_or_else(|| {
            Error::InvalidInput(
                "no recent recommendation for this session; ask for a fresh one first".to_string(),
            )
        })?;

        // Photo generation waits until a dish is settled
        let mut recommendation = None;
        for attempt in 1..=MAX_ANOTHER_ATTEMPTS {
            let candidate = self
                .build_recommendation(last.hint, last.city.clone(), None, false)
                .await?;

            if candidate.dish != last.dish {
                recommendation = Some(candidate);
                break;
            }
            debug!(attempt, dish = %candidate.dish, "drew the same dish, retrying");
            recommendation = Some(candidate);
        }

        let mut recommendation = recommendation.ok_or_else(|| {
            Error::InvalidInput("could not produce a replacement recommendation".to_string())
        })?;

        if last.with_image {
            recommendation.image_path = self.generate_image(&recommendation.dish).await;
        }

        self.sessions.remember(
            session_key,
            LastRecommendation {
                dish: recommendation.dish.clone(),
                hint: last.hint,
                city: last.city.clone(),
                with_image: last.with_image,
            },
        );

        Ok(recommendation)
    }

    async fn build_recommendation(
        &self,
        hint: Option<MealHint>,
        city: Option<String>,
        query: Option<&str>,
        with_image: bool,
    ) -> Result<Recommendation> {
        let now = Local::now();
        let period = match hint {
            Some(MealHint::Period(p)) => p,
            _ => MealPeriod::from_hour(now.hour()),
        };
        let season = Season::from_month(now.month());
        let category = match hint {
            Some(MealHint::Category(c)) => c,
            _ => Category::for_period(period, &mut rand::thread_rng()),
        };

        let weather = self.resolve_weather(city.as_deref()).await;
        let dish = self.pick_dish(category, period, season, &weather, query).await;

        let context = DishContext {
            dish: dish.clone(),
            weather: weather.clone(),
            date: now.format("%B %-d, %Y").to_string(),
            period,
            season,
        };

        let description = self.descriptions.produce(&context).await?;
        let reason = self.reasons.produce(&context).await?;

        let image_path = if with_image {
            self.generate_image(&dish).await
        } else {
            None
        };

        info!(
            dish = %dish,
            category = %category,
            period = %period,
            city = %weather.city,
            has_image = image_path.is_some(),
            "recommendation ready"
        );

        Ok(Recommendation {
            dish,
            reason,
            description,
            image_path,
            weather,
            period,
            season,
            recommended_at: Utc::now(),
        })
    }

    /// Look up weather, degrading to a mild default on any failure
    async fn resolve_weather(&self, city: Option<&str>) -> WeatherReport {
        match &self.weather {
            Some(provider) => match provider.lookup(city).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(error = %e, "weather lookup failed, using defaults");
                    WeatherReport::fallback(city.unwrap_or(FALLBACK_CITY))
                }
            },
            None => WeatherReport::fallback(city.unwrap_or(FALLBACK_CITY)),
        }
    }

    /// Pick a dish, preferring a dynamic LLM suggestion over the catalog
    async fn pick_dish(
        &self,
        category: Category,
        period: MealPeriod,
        season: Season,
        weather: &WeatherReport,
        query: Option<&str>,
    ) -> String {
        if let Some(llm) = &self.llm {
            let prompt = dish_prompt(period, weather, season, query);
            let session = completion_session_id("food_recommendation");

            match llm.complete_text(&prompt, &session).await {
                Ok(raw) => {
                    if let Some(dish) = normalize_dish_name(&raw) {
                        debug!(dish = %dish, "using dynamic dish suggestion");
                        return dish;
                    }
                    warn!(raw = %raw, "unusable dish suggestion, falling back to catalog");
                }
                Err(e) => {
                    warn!(error = %e, "dish suggestion failed, falling back to catalog");
                }
            }
        }

        catalog::pick_dish(category, Some(weather), &mut rand::thread_rng()).to_string()
    }

    /// Generate a dish photo, swallowing failures
    async fn generate_image(&self, dish: &str) -> Option<PathBuf> {
        let client = self.image_client.as_ref()?;
        let request = match &self.image_request {
            Some(template) => {
                let mut request = template.clone();
                request.prompt = food_prompt(dish);
                request
            }
            None => GenerationRequest::new(food_prompt(dish)),
        };
        match generate_image_to_file(client, &request, dish).await {
            Ok(image) => Some(image.path),
            Err(e) => {
                warn!(error = %e, dish = %dish, "image generation failed, continuing without");
                None
            }
        }
    }
}

/// Build the dynamic dish prompt
fn dish_prompt(
    period: MealPeriod,
    weather: &WeatherReport,
    season: Season,
    query: Option<&str>,
) -> String {
    let mut prompt =
        String::from("Recommend one dish to eat right now. Return only the dish name, nothing else.");
    prompt.push_str(&format!("\nThis is for the {period} meal."));
    prompt.push_str(&format!(
        "\nCurrent weather: {}, temperature: {}°C.",
        weather.description, weather.temperature_c
    ));
    prompt.push_str(&format!("\nCurrent season: {season}."));

    if let Some(query) = query {
        let preferences = detect_preferences(query);
        if !preferences.is_empty() {
            prompt.push_str(&format!(
                "\nConsider these preferences: {}.",
                preferences.join(", ")
            ));
        }
    }

    prompt
}

/// Extract flavor and diet preferences from free-form text
fn detect_preferences(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let table: [(&str, &'static str); 10] = [
        ("spicy", "spicy"),
        ("sweet", "sweet"),
        ("sour", "sour"),
        ("salty", "salty"),
        ("vegetarian", "vegetarian"),
        ("veggie", "vegetarian"),
        ("vegetable", "vegetarian"),
        ("meat", "meat"),
        ("seafood", "seafood"),
        ("fish", "seafood"),
    ];

    let mut preferences = Vec::new();
    for (keyword, label) in table {
        if lower.contains(keyword) && !preferences.contains(&label) {
            preferences.push(label);
        }
    }
    preferences
}

/// Reduce raw LLM output to a plausible dish name
///
/// Takes the first line, strips quoting, and clips trailing prose. A
/// name that is empty or still too long is rejected so the caller can
/// fall back to the catalog.
fn normalize_dish_name(raw: &str) -> Option<String> {
    let first_line = raw.lines().next().unwrap_or("").trim();
    let mut name = first_line.trim_matches(['"', '\'', '.', '!']).trim();

    if name.chars().count() > MAX_DISH_NAME_CHARS {
        name = name
            .split(['.', ',', ';', ':'])
            .next()
            .unwrap_or("")
            .trim();
    }

    if name.is_empty() || name.chars().count() > MAX_DISH_NAME_CHARS {
        return None;
    }
    Some(name.to_string())
}
