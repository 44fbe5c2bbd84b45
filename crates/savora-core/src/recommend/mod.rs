//! Food recommendation
//!
//! This module provides:
//! - Clock and season driven dish selection with weather bias
//! - Dynamic dish, description, and reason text through provider chains
//! - Session-scoped "another one" replacement

pub mod catalog;
pub mod describe;
pub mod engine;

pub use catalog::{
    Category, MealHint, MealPeriod, Season, all_dishes, parse_meal_hint, pick_dish,
};
pub use describe::{DishContext, ProviderChain, TextProvider, description_chain, reason_chain};
pub use engine::{
    LastRecommendation, Recommendation, RecommendationEngine, RecommendationEngineBuilder,
    RecommendRequest,
};
