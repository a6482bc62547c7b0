//! # feedseal builder
//!
//! Assembles, validates and signs feed documents.
//!
//! ```rust,no_run
//! use feedseal_builder::{DocumentBuilder, FeedMetadata, ItemInput};
//! use feedseal_core::{Author, Keypair};
//!
//! let kp = Keypair::generate();
//! let author = Author {
//!     name: "Ada".into(),
//!     public_key: kp.public_key().to_envelope(),
//!     url: None,
//!     avatar: None,
//!     extensions: Default::default(),
//! };
//! let builder = DocumentBuilder::default();
//! let feed = builder
//!     .create_complete_feed(
//!         FeedMetadata::new("Notes", "https://ada.example", "https://ada.example/feed.json", author),
//!         vec![ItemInput::new("https://ada.example/1").markdown("# Hello")],
//!         &kp.private_envelope(),
//!     )
//!     .unwrap();
//! assert!(feed.signature.is_some());
//! ```

pub mod builder;
pub mod content;
pub mod error;
pub mod tags;

pub use builder::{
    add_item, create_complete_feed, create_feed, sign_feed, BuilderConfig, DocumentBuilder,
    FeedMetadata, ItemInput,
};
pub use error::{BuildError, Result};
