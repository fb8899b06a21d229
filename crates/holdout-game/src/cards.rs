//! Static card catalog: the attribute values a player's secrets are drawn
//! from.
//!
//! The catalog never changes at runtime; [`draw`] is used exactly once per
//! category when a player is created.

use holdout_protocol::CardCategory;
use rand::Rng;

const PROFESSIONS: &[&str] = &[
    "Doctor", "Engineer", "Chef", "Soldier", "Teacher", "Hacker", "Pilot",
    "Farmer",
];

const HEALTH: &[&str] = &[
    "Asthma",
    "Perfect health",
    "Diabetes",
    "Bad eyesight",
    "Strong immunity",
    "Heart issue",
];

const HOBBIES: &[&str] = &[
    "Guitar", "Chess", "Hunting", "Cooking", "Coding", "Drawing", "Sports",
];

const BAGGAGE: &[&str] = &[
    "First aid kit",
    "Water filter",
    "Seeds",
    "Laptop",
    "Tools",
    "Generator",
    "Medicine box",
];

const PHOBIAS: &[&str] = &[
    "Heights",
    "Darkness",
    "Crowds",
    "Spiders",
    "Claustrophobia",
    "Fire",
];

/// Returns the ordered list of values for a category.
pub fn catalog(category: CardCategory) -> &'static [&'static str] {
    match category {
        CardCategory::Profession => PROFESSIONS,
        CardCategory::Health => HEALTH,
        CardCategory::Hobby => HOBBIES,
        CardCategory::Baggage => BAGGAGE,
        CardCategory::Phobia => PHOBIAS,
    }
}

/// Picks one value uniformly at random from a category's list.
pub fn draw<R: Rng + ?Sized>(category: CardCategory, rng: &mut R) -> &'static str {
    let values = catalog(category);
    values[rng.random_range(0..values.len())]
}
