//! # feedseal testkit
//!
//! Testing utilities for feedseal.
//!
//! - **Golden vectors**: fixed documents with their canonical form and the
//!   deterministic Ed25519 signature over it
//! - **Generators**: proptest strategies for JSON values and item inputs
//! - **Fixtures**: a seeded author with ready-made metadata and items
//!
//! ```rust
//! use feedseal_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors() {
//!     assert_eq!(vector.compute_canonical(), vector.canonical);
//! }
//! ```
//!
//! ```rust
//! use feedseal_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let feed = fixture.signed_feed(3);
//! assert_eq!(feed.items.len(), 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_author_fixtures, TestFixture};
