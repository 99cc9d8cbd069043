//! Question bank
//!
//! Per-category question pools and the random draw used when a category is
//! selected.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GameError;
use crate::types::{Category, QuestionRecord};

/// A question as stored in the bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub id: u32,
    pub text: String,
}

/// Question pools keyed by category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBank {
    pools: HashMap<Category, Vec<QuestionEntry>>,
}

impl Default for QuestionBank {
    fn default() -> Self {
        let mut pools = HashMap::new();
        for (category, texts) in DEFAULT_POOLS {
            let entries = texts
                .iter()
                .enumerate()
                .map(|(i, text)| QuestionEntry {
                    id: i as u32 + 1,
                    text: (*text).to_string(),
                })
                .collect();
            pools.insert(*category, entries);
        }
        Self { pools }
    }
}

impl QuestionBank {
    pub fn new(pools: HashMap<Category, Vec<QuestionEntry>>) -> Self {
        Self { pools }
    }

    /// Load a bank from JSON of the form `{"pools": {"food": [{"id": 1, "text": "..."}]}}`
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        serde_json::from_str(json).map_err(GameError::Json)
    }

    pub fn to_json(&self) -> Result<String, GameError> {
        serde_json::to_string_pretty(self).map_err(GameError::Json)
    }

    /// Questions available for a category
    pub fn pool(&self, category: Category) -> &[QuestionEntry] {
        self.pools
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Draw `count` distinct questions from a category as fresh unanswered records
    ///
    /// The pool is shuffled (Fisher-Yates) and the first `count` entries taken.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        category: Category,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<QuestionRecord>, GameError> {
        let pool = self.pool(category);
        if pool.is_empty() {
            return Err(GameError::EmptyCategory(category));
        }
        if pool.len() < count {
            return Err(GameError::NotEnoughQuestions {
                category,
                available: pool.len(),
                required: count,
            });
        }

        let mut shuffled: Vec<&QuestionEntry> = pool.iter().collect();
        shuffled.shuffle(rng);

        let drawn: Vec<QuestionRecord> = shuffled
            .into_iter()
            .take(count)
            .map(|entry| QuestionRecord::new(entry.id, entry.text.clone()))
            .collect();

        debug!(
            ?category,
            pool = pool.len(),
            ids = ?drawn.iter().map(|q| q.id).collect::<Vec<_>>(),
            "questions drawn"
        );
        Ok(drawn)
    }
}

const DEFAULT_POOLS: &[(Category, &[&str])] = &[
    (
        Category::Food,
        &[
            "Do you like pineapple on pizza?",
            "Would you eat Jollof rice every day?",
            "Have you ever lied about liking someone's cooking?",
            "Do you secretly hate a popular food everyone loves?",
            "Have you ever pretended to be full to avoid eating?",
            "Have you ever eaten food that fell on the floor?",
            "Do you finish snacks meant to be shared?",
            "Have you ever sent a dish back at a restaurant?",
        ],
    ),
    (
        Category::Relationships,
        &[
            "Have you ever lied to your partner?",
            "Do you believe in love at first sight?",
            "Have you ever faked being interested in someone?",
            "Would you date someone your friend dated?",
            "Have you ever cheated in a relationship?",
            "Have you ever read someone else's messages?",
            "Do you still think about an ex?",
            "Have you ever ignored a text on purpose?",
        ],
    ),
    (
        Category::Movies,
        &[
            "Do you pretend to have watched popular movies?",
            "Have you ever cried during a movie?",
            "Do you enjoy horror movies?",
            "Have you ever walked out of a cinema?",
            "Do you think you could act in a movie?",
            "Have you ever fallen asleep in a cinema?",
            "Do you read spoilers before watching a film?",
            "Have you ever snuck food into a cinema?",
        ],
    ),
    (
        Category::Music,
        &[
            "Do you sing in the shower?",
            "Have you ever pretended to know a popular song?",
            "Do you listen to music everyone makes fun of?",
            "Have you been to a concert before?",
            "Can you play a musical instrument?",
            "Have you ever sung karaoke in public?",
            "Do you know all the words to your national anthem?",
            "Have you ever skipped a friend's song recommendation?",
        ],
    ),
    (
        Category::Sports,
        &[
            "Do you actually enjoy watching sports?",
            "Have you ever lied about your fitness level?",
            "Do you pretend to understand sports rules?",
            "Have you ever faked an injury to avoid exercise?",
            "Would you rather watch sports than play them?",
            "Have you ever cheated at a game?",
            "Do you own gym clothes you have never worn?",
            "Have you ever left a match before it ended?",
        ],
    ),
    (
        Category::Personal,
        &[
            "Have you ever lied about finishing homework?",
            "Have you ever pretended to be sick to skip work?",
            "Do you think you're a good liar?",
            "Have you ever stolen something?",
            "Do you keep secrets from your best friend?",
            "Have you ever blamed someone else for your mistake?",
            "Have you ever regifted a present?",
            "Do you check your phone during conversations?",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_default_bank_covers_every_category() {
        let bank = QuestionBank::default();
        for category in Category::ALL {
            assert!(bank.pool(category).len() > 5, "{category:?} pool too small");
        }
    }

    #[test]
    fn test_draw_yields_distinct_pool_items() {
        let bank = QuestionBank::default();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let drawn = bank.draw(Category::Music, 5, &mut rng).unwrap();

            assert_eq!(drawn.len(), 5);
            let ids: HashSet<u32> = drawn.iter().map(|q| q.id).collect();
            assert_eq!(ids.len(), 5);

            let pool = bank.pool(Category::Music);
            for record in &drawn {
                assert!(pool.iter().any(|e| e.id == record.id && e.text == record.text));
                assert!(!record.is_answered());
            }
        }
    }

    #[test]
    fn test_draw_varies_with_seed() {
        let bank = QuestionBank::default();
        let orders: HashSet<Vec<u32>> = (0..20)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                bank.draw(Category::Food, 5, &mut rng)
                    .unwrap()
                    .iter()
                    .map(|q| q.id)
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1);
    }

    #[test]
    fn test_draw_entire_pool() {
        let bank = QuestionBank::default();
        let mut rng = StdRng::seed_from_u64(3);
        let size = bank.pool(Category::Sports).len();
        let drawn = bank.draw(Category::Sports, size, &mut rng).unwrap();
        let ids: HashSet<u32> = drawn.iter().map(|q| q.id).collect();
        assert_eq!(ids.len(), size);
    }

    #[test]
    fn test_empty_pool_is_configuration_error() {
        let bank = QuestionBank::new(HashMap::new());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            bank.draw(Category::Food, 5, &mut rng),
            Err(GameError::EmptyCategory(Category::Food))
        ));
    }

    #[test]
    fn test_small_pool_is_configuration_error() {
        let json = r#"{
            "pools": {
                "personal": [
                    {"id": 1, "text": "Have you ever stolen something?"},
                    {"id": 2, "text": "Do you think you're a good liar?"}
                ]
            }
        }"#;
        let bank = QuestionBank::from_json(json).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        match bank.draw(Category::Personal, 5, &mut rng) {
            Err(GameError::NotEnoughQuestions {
                available,
                required,
                ..
            }) => {
                assert_eq!(available, 2);
                assert_eq!(required, 5);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_bank_json_roundtrip() {
        let bank = QuestionBank::default();
        let json = bank.to_json().unwrap();
        assert_eq!(QuestionBank::from_json(&json).unwrap(), bank);
    }
}
