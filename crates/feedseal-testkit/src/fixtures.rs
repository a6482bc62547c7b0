//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use feedseal_builder::{create_complete_feed, FeedMetadata, ItemInput};
use feedseal_core::{Author, Extensions, Feed, Keypair};

/// A seeded author able to produce signed feeds.
pub struct TestFixture {
    pub keypair: Keypair,
    pub name: String,
    /// Origin used for every URL, e.g. `https://author-0.example`.
    pub origin: String,
}

impl TestFixture {
    /// Fixture with the fixed seed `[0x42; 32]`.
    pub fn new() -> Self {
        Self::with_seed([0x42; 32])
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            name: format!("Author {}", seed[0]),
            origin: format!("https://author-{}.example", seed[0]),
        }
    }

    pub fn public_key(&self) -> String {
        self.keypair.public_key().to_envelope()
    }

    pub fn private_key(&self) -> String {
        self.keypair.private_envelope()
    }

    pub fn author(&self) -> Author {
        Author {
            name: self.name.clone(),
            public_key: self.public_key(),
            url: Some(self.origin.clone()),
            avatar: None,
            extensions: Extensions::new(),
        }
    }

    pub fn metadata(&self) -> FeedMetadata {
        FeedMetadata::new(
            format!("{}'s notes", self.name),
            self.origin.clone(),
            format!("{}/feed.json", self.origin),
            self.author(),
        )
        .description("Fixture feed")
        .language("en")
    }

    /// The `n`th sample item, published on day `n + 1` of January 2024.
    pub fn item(&self, n: usize) -> ItemInput {
        ItemInput::new(format!("{}/posts/{}", self.origin, n))
            .title(format!("Post {}", n))
            .summary(format!("Summary of post {}", n))
            .markdown(format!("# Post {}\n\nBody of post {}.", n, n))
            .date_published(format!("2024-01-{:02}T00:00:00Z", n % 28 + 1))
            .tag("fixture")
    }

    pub fn items(&self, count: usize) -> Vec<ItemInput> {
        (0..count).map(|n| self.item(n)).collect()
    }

    /// A fully signed feed with `count` sample items.
    ///
    /// Panics if the fixture content fails validation.
    pub fn signed_feed(&self, count: usize) -> Feed {
        match create_complete_feed(self.metadata(), self.items(count), &self.private_key()) {
            Ok(feed) => feed,
            Err(e) => panic!("fixture feed failed to build: {e}"),
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple fixtures with distinct keys and origins.
pub fn multi_author_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
