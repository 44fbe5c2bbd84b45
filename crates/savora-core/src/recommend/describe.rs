//! Dish description and recommendation reason text
//!
//! Both artifacts are produced by an ordered chain of providers. Each
//! provider either returns text or fails; the first success wins. The
//! chains built here end with an infallible template provider, so a
//! missing or failing LLM degrades to canned text instead of an error.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::llm::{TextCompletion, completion_session_id};
use crate::weather::WeatherReport;

use super::catalog::{MealPeriod, Season};

/// Everything the text providers know about the recommendation
#[derive(Debug, Clone)]
pub struct DishContext {
    pub dish: String,
    pub weather: WeatherReport,
    pub date: String,
    pub period: MealPeriod,
    pub season: Season,
}

/// One source of recommendation text
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn produce(&self, context: &DishContext) -> Result<String>;
}

/// Ordered list of providers consulted until one succeeds
pub struct ProviderChain {
    label: &'static str,
    providers: Vec<Box<dyn TextProvider>>,
}

impl ProviderChain {
    pub fn new(label: &'static str, providers: Vec<Box<dyn TextProvider>>) -> Self {
        Self { label, providers }
    }

    /// Consult providers in order, returning the first success
    pub async fn produce(&self, context: &DishContext) -> Result<String> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.produce(context).await {
                Ok(text) => {
                    debug!(chain = self.label, provider = provider.name(), "provider succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    debug!(
                        chain = self.label,
                        provider = provider.name(),
                        error = %e,
                        "provider failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::Config(format!("no {} providers configured", self.label))))
    }
}

/// Build the description chain: LLM first when present, templates last
pub fn description_chain(llm: Option<Arc<dyn TextCompletion>>) -> ProviderChain {
    let mut providers: Vec<Box<dyn TextProvider>> = Vec::new();
    if let Some(llm) = llm {
        providers.push(Box::new(LlmDescription { llm }));
    }
    providers.push(Box::new(TemplateDescription));
    ProviderChain::new("description", providers)
}

/// Build the reason chain: LLM first when present, templates last
pub fn reason_chain(llm: Option<Arc<dyn TextCompletion>>) -> ProviderChain {
    let mut providers: Vec<Box<dyn TextProvider>> = Vec::new();
    if let Some(llm) = llm {
        providers.push(Box::new(LlmReason { llm }));
    }
    providers.push(Box::new(TemplateReason));
    ProviderChain::new("reason", providers)
}

struct LlmDescription {
    llm: Arc<dyn TextCompletion>,
}

#[async_trait]
impl TextProvider for LlmDescription {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn produce(&self, context: &DishContext) -> Result<String> {
        let prompt = format!(
            "Write a short description of the dish \"{}\" covering its character, \
             texture, and what makes it distinctive. No more than 50 words. \
             Return only the description text.",
            context.dish
        );
        let session = completion_session_id("food_description");
        self.llm.complete_text(&prompt, &session).await
    }
}

struct TemplateDescription;

#[async_trait]
impl TextProvider for TemplateDescription {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn produce(&self, context: &DishContext) -> Result<String> {
        Ok(template_description(&context.dish))
    }
}

struct LlmReason {
    llm: Arc<dyn TextCompletion>,
}

#[async_trait]
impl TextProvider for LlmReason {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn produce(&self, context: &DishContext) -> Result<String> {
        let prompt = format!(
            "Write a short reason to recommend the dish \"{}\" considering:\n\
             - weather: {}\n\
             - temperature: {}°C\n\
             - date: {}\n\
             - time of day: {}\n\
             - season: {}\n\
             - city: {}\n\n\
             Keep it under 50 words. Return only the reason text.",
            context.dish,
            context.weather.description,
            context.weather.temperature_c,
            context.date,
            context.period,
            context.season,
            context.weather.city,
        );
        let session = completion_session_id("food_reason");
        self.llm.complete_text(&prompt, &session).await
    }
}

struct TemplateReason;

#[async_trait]
impl TextProvider for TemplateReason {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn produce(&self, context: &DishContext) -> Result<String> {
        Ok(template_reason(context))
    }
}

/// Canned description, picked stably by dish name
fn template_description(dish: &str) -> String {
    match stable_index(dish, 5) {
        0 => format!(
            "{dish} is a widely loved dish with a distinctive taste and excellent flavor."
        ),
        1 => format!(
            "{dish} is known for its unique texture and rich flavor, a dish not to be missed."
        ),
        2 => format!("{dish} is tender and delicious, with a character all of its own."),
        3 => format!(
            "{dish} has an enticing aroma and a rich taste that keeps you coming back for more."
        ),
        _ => format!(
            "{dish} is flavorful and nourishing, satisfying both appetite and nutrition."
        ),
    }
}

/// Canned reason, picked stably by dish, weather, and date
fn template_reason(context: &DishContext) -> String {
    let DishContext {
        dish,
        weather,
        date,
        period,
        season,
    } = context;
    let (city, temp, desc) = (&weather.city, weather.temperature_c, &weather.description);

    let seed = format!("{dish}{desc}{date}");
    match stable_index(&seed, 5) {
        0 => format!(
            "On {date}, with {desc} skies and {temp}°C in {city}, a serving of {dish} is clearly the right call!"
        ),
        1 => format!(
            "{desc} weather in {city} on {date} at {temp}°C is perfect for savoring {dish}. A treat for your taste buds!"
        ),
        2 => format!(
            "A {season} day in {city} at {temp}°C with {desc} weather is the best moment for {dish}. Don't miss it!"
        ),
        3 => format!(
            "With {desc} weather in {city} and {temp}°C on {date}, {dish} tastes twice as good!"
        ),
        _ => format!(
            "{desc} weather in {city} this {period}, paired with a delicious {dish}: a perfect match!"
        ),
    }
}

/// Stable index in `0..len` derived from a seed string
fn stable_index(seed: &str, len: u64) -> u64 {
    let digest = Sha256::digest(seed.as_bytes());
    let n = u64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"));
    n % len
}
