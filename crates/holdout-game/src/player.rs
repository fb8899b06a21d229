//! Players and their secret hands.

use std::collections::BTreeMap;

use holdout_protocol::{CardCategory, ConnectionId, PlayerView, PrivateStateView};
use rand::Rng;

use crate::cards;

/// A player's five secret attribute cards plus their revealed flags.
///
/// Cards are drawn once at creation and never change. Revealing is a
/// one-way, per-category flag flip; revealing an already-revealed
/// category is a harmless no-op.
#[derive(Debug, Clone)]
pub struct Hand {
    cards: [&'static str; CardCategory::COUNT],
    revealed: [bool; CardCategory::COUNT],
}

impl Hand {
    /// Draws a fresh hand, one card per category.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            cards: std::array::from_fn(|i| cards::draw(CardCategory::ALL[i], rng)),
            revealed: [false; CardCategory::COUNT],
        }
    }

    /// The secret value for a category, regardless of disclosure.
    pub fn card(&self, category: CardCategory) -> &'static str {
        self.cards[category.index()]
    }

    pub fn is_revealed(&self, category: CardCategory) -> bool {
        self.revealed[category.index()]
    }

    /// Marks a category as publicly visible. Idempotent.
    pub fn reveal(&mut self, category: CardCategory) {
        self.revealed[category.index()] = true;
    }

    fn revealed_flags(&self) -> BTreeMap<CardCategory, bool> {
        CardCategory::ALL
            .iter()
            .map(|&c| (c, self.is_revealed(c)))
            .collect()
    }

    /// Card values masked to `None` for every unrevealed category. This is
    /// the only way a hand reaches a public projection.
    fn masked_cards(&self) -> BTreeMap<CardCategory, Option<String>> {
        CardCategory::ALL
            .iter()
            .map(|&c| {
                let value = self.is_revealed(c).then(|| self.card(c).to_string());
                (c, value)
            })
            .collect()
    }

    fn private_view(&self) -> PrivateStateView {
        PrivateStateView {
            cards: CardCategory::ALL
                .iter()
                .map(|&c| (c, self.card(c).to_string()))
                .collect(),
            revealed: self.revealed_flags(),
        }
    }
}

/// A room member.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    /// `false` once eliminated; never flips back.
    pub alive: bool,
    hand: Hand,
}

impl Player {
    /// Creates a player with a freshly drawn hand, alive, nothing revealed.
    pub fn new<R: Rng + ?Sized>(id: ConnectionId, name: String, rng: &mut R) -> Self {
        Self {
            id,
            name,
            alive: true,
            hand: Hand::draw(rng),
        }
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn reveal(&mut self, category: CardCategory) {
        self.hand.reveal(category);
    }

    /// The player as the whole room sees them.
    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            alive: self.alive,
            revealed: self.hand.revealed_flags(),
            cards: self.hand.masked_cards(),
        }
    }

    /// The player's own unmasked secrets.
    pub fn private_view(&self) -> PrivateStateView {
        self.hand.private_view()
    }
}
