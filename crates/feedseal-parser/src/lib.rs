//! # feedseal parser
//!
//! Turns untrusted feed documents into typed [`Feed`](feedseal_core::Feed)s:
//! validation first, then signature verification at a chosen level, then
//! extension stripping and newest-first ordering.
//!
//! Cheap modes ([`Parser::parse_metadata_only`], [`Parser::parse_content_only`])
//! skip signatures entirely.

pub mod filter;
pub mod options;
pub mod parser;
pub mod result;
pub mod views;

pub use filter::{get_items, ItemFilter};
pub use options::{ParseOptions, SignatureLevel};
pub use parser::Parser;
pub use result::{
    ItemSignature, ParseMetadata, ParseResult, SignatureReport, SignatureStatus, SignatureSummary,
};
pub use views::{
    AuthorSummary, ContentResult, ContentType, DateRange, FeedMetadataView, ItemContent,
    MetadataResult,
};
