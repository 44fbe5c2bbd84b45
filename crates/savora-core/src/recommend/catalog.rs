//! Dish catalog and time/weather selection rules
//!
//! The static tables the engine falls back to when no LLM is available,
//! plus the clock-to-meal-period and month-to-season mappings that drive
//! category choice.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::weather::WeatherReport;

/// Above this temperature light dishes are preferred
pub const HOT_THRESHOLD_C: i32 = 28;

/// Below this temperature warming dishes are preferred
pub const COLD_THRESHOLD_C: i32 = 5;

/// Part of the day a recommendation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealPeriod {
    Breakfast,
    Lunch,
    Afternoon,
    Dinner,
    LateNight,
}

impl MealPeriod {
    /// Map an hour of day (0-23) to its meal period
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=9 => MealPeriod::Breakfast,
            10..=13 => MealPeriod::Lunch,
            14..=16 => MealPeriod::Afternoon,
            17..=20 => MealPeriod::Dinner,
            _ => MealPeriod::LateNight,
        }
    }

    /// Time-of-day label used in recommendation text
    pub fn label(&self) -> &'static str {
        match self {
            MealPeriod::Breakfast => "morning",
            MealPeriod::Lunch => "noon",
            MealPeriod::Afternoon => "afternoon",
            MealPeriod::Dinner => "evening",
            MealPeriod::LateNight => "late night",
        }
    }
}

impl std::fmt::Display for MealPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Season derived from the calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Map a month (1-12) to its season
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Dish category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Chinese,
    FastFood,
    Noodles,
    Breakfast,
    Dessert,
}

impl Category {
    /// All categories
    pub const ALL: [Category; 5] = [
        Category::Chinese,
        Category::FastFood,
        Category::Noodles,
        Category::Breakfast,
        Category::Dessert,
    ];

    /// Pick a category fitting the meal period
    pub fn for_period<R: Rng>(period: MealPeriod, rng: &mut R) -> Self {
        match period {
            MealPeriod::Breakfast => Category::Breakfast,
            MealPeriod::Lunch | MealPeriod::Dinner => *[
                Category::Chinese,
                Category::FastFood,
                Category::Noodles,
            ]
            .choose(rng)
            .unwrap_or(&Category::Chinese),
            MealPeriod::Afternoon => Category::Dessert,
            MealPeriod::LateNight => *[Category::FastFood, Category::Noodles]
                .choose(rng)
                .unwrap_or(&Category::Noodles),
        }
    }

    /// The dishes in this category
    pub fn dishes(&self) -> &'static [&'static str] {
        match self {
            Category::Chinese => CHINESE_DISHES,
            Category::FastFood => FAST_FOOD_DISHES,
            Category::Noodles => NOODLE_DISHES,
            Category::Breakfast => BREAKFAST_DISHES,
            Category::Dessert => DESSERT_DISHES,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Chinese => "chinese",
            Category::FastFood => "fast food",
            Category::Noodles => "noodles",
            Category::Breakfast => "breakfast",
            Category::Dessert => "dessert",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A parsed meal preference from free-form text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealHint {
    Period(MealPeriod),
    Category(Category),
}

/// Scan free-form text for a meal period or category hint
pub fn parse_meal_hint(text: &str) -> Option<MealHint> {
    let lower = text.to_lowercase();

    let table: [(&[&str], MealHint); 6] = [
        (
            &["breakfast", "morning"],
            MealHint::Period(MealPeriod::Breakfast),
        ),
        (
            &["lunch", "noon", "midday"],
            MealHint::Period(MealPeriod::Lunch),
        ),
        (
            &["dinner", "supper", "tonight", "evening"],
            MealHint::Period(MealPeriod::Dinner),
        ),
        (&["dessert", "sweet"], MealHint::Category(Category::Dessert)),
        (&["noodle"], MealHint::Category(Category::Noodles)),
        (
            &["fast food", "burger", "pizza"],
            MealHint::Category(Category::FastFood),
        ),
    ];

    for (keywords, hint) in table {
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some(hint);
        }
    }
    None
}

/// Pick a dish from a category, biased by weather when known
///
/// Hot days prefer light dishes, cold days warming ones, wet days
/// comfort food. A category with no dish of the preferred kind falls
/// back to its full list.
pub fn pick_dish<R: Rng>(
    category: Category,
    weather: Option<&WeatherReport>,
    rng: &mut R,
) -> &'static str {
    let pool = biased_pool(category, weather);
    pool.choose(rng).copied().unwrap_or("hotpot")
}

/// Every dish across all categories
pub fn all_dishes() -> Vec<&'static str> {
    Category::ALL
        .iter()
        .flat_map(|c| c.dishes().iter().copied())
        .collect()
}

fn biased_pool(category: Category, weather: Option<&WeatherReport>) -> Vec<&'static str> {
    let dishes = category.dishes();

    let preferred: Option<&[&str]> = weather.and_then(|w| {
        if w.temperature_c >= HOT_THRESHOLD_C {
            Some(LIGHT_DISHES)
        } else if w.temperature_c <= COLD_THRESHOLD_C {
            Some(WARMING_DISHES)
        } else if w.is_wet() {
            Some(COMFORT_DISHES)
        } else {
            None
        }
    });

    if let Some(preferred) = preferred {
        let matching: Vec<&'static str> = dishes
            .iter()
            .copied()
            .filter(|d| preferred.contains(d))
            .collect();
        if !matching.is_empty() {
            return matching;
        }
    }

    dishes.to_vec()
}

const CHINESE_DISHES: &[&str] = &[
    "braised pork belly",
    "twice-cooked pork",
    "kung pao chicken",
    "mapo tofu",
    "boiled fish in chili oil",
    "dongpo pork",
    "sweet and sour ribs",
    "yuxiang shredded pork",
    "tomato scrambled eggs",
    "spicy crayfish",
    "hotpot",
    "pickled cabbage fish",
    "peking duck",
    "steamed sea bass",
    "scallion lamb stir-fry",
    "laziji chicken",
    "hot and sour potato strips",
    "garlic broccoli",
    "braised spare ribs",
    "braised pork trotters",
];

const FAST_FOOD_DISHES: &[&str] = &[
    "hamburger",
    "fried chicken",
    "pizza",
    "french fries",
    "hot dog",
    "burrito",
    "sushi",
    "fried noodles",
    "rice bowl",
    "malatang",
    "jianbing pancake",
    "roujiamo",
    "rice noodle soup",
    "chuanchuan skewers",
    "grilled meat rice",
    "braised pork rice",
    "potato pancake",
    "chicken wrap",
];

const NOODLE_DISHES: &[&str] = &[
    "chongqing noodles",
    "dandan noodles",
    "yangchun noodles",
    "beef noodle soup",
    "knife-cut noodles",
    "lanzhou hand-pulled noodles",
    "hot dry noodles",
    "zhajiang noodles",
    "spicy noodles",
    "seafood noodles",
    "dalu noodles",
    "hot and sour noodles",
    "scallion oil noodles",
    "chicken soup noodles",
    "shredded pork noodles",
    "zhacai pork noodles",
];

const BREAKFAST_DISHES: &[&str] = &[
    "soy milk and youtiao",
    "jianbing pancake",
    "wonton soup",
    "steamed buns",
    "dumplings",
    "tea eggs",
    "millet congee",
    "eight treasure congee",
    "sesame flatbread",
    "roujiamo",
    "shouzhuabing pancake",
    "pan-fried buns",
    "fried sesame balls",
    "sandwich",
    "egg pancake",
    "mantou",
];

const DESSERT_DISHES: &[&str] = &[
    "ice cream",
    "cake",
    "chocolate",
    "cookies",
    "milk tea",
    "fruit jelly",
    "pudding",
    "cheesecake",
    "egg tart",
    "tofu pudding",
    "douhua",
    "liangfen jelly",
    "mango pomelo sago",
    "sago soup",
    "mung bean soup",
    "red bean shaved ice",
    "mango sago",
];

/// Dishes that suit hot weather
const LIGHT_DISHES: &[&str] = &[
    "scallion oil noodles",
    "yangchun noodles",
    "tomato scrambled eggs",
    "garlic broccoli",
    "steamed sea bass",
    "sushi",
    "sandwich",
    "ice cream",
    "fruit jelly",
    "mango pomelo sago",
    "sago soup",
    "mung bean soup",
    "red bean shaved ice",
    "mango sago",
    "liangfen jelly",
    "douhua",
];

/// Dishes that suit cold weather
const WARMING_DISHES: &[&str] = &[
    "hotpot",
    "braised pork belly",
    "dongpo pork",
    "braised spare ribs",
    "braised pork trotters",
    "scallion lamb stir-fry",
    "malatang",
    "beef noodle soup",
    "lanzhou hand-pulled noodles",
    "chicken soup noodles",
    "dalu noodles",
    "wonton soup",
    "millet congee",
    "eight treasure congee",
];

/// Dishes that suit rainy weather
const COMFORT_DISHES: &[&str] = &[
    "hotpot",
    "mapo tofu",
    "braised pork belly",
    "fried chicken",
    "pizza",
    "braised pork rice",
    "zhajiang noodles",
    "hot dry noodles",
    "beef noodle soup",
    "dumplings",
    "wonton soup",
    "milk tea",
    "cake",
];
