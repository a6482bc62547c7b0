//! # feedseal validate
//!
//! Two-phase validation of feed documents.
//!
//! 1. **Structural**: required fields, JSON types, formats (URL, RFC 3339,
//!    UUID, key envelope), patterns (https, language tag, MIME type) and
//!    unknown fields. Extension fields (`_`-prefixed) are always allowed.
//! 2. **Business rules**: pure predicates over a [`DocumentView`] and an
//!    [`ItemIndex`] (duplicate ids, date order, self replies, attachment
//!    numbers, extension names and values).
//!
//! Both phases report [`Diagnostic`]s into one list. Validation never fails
//! with an error: bad input always produces a [`ValidationResult`].

pub mod diagnostic;
pub mod rules;
pub mod schema;
pub mod structural;
pub mod validator;
pub mod view;

pub use diagnostic::{Diagnostic, DiagnosticCode, Report};
pub use schema::base_schema;
pub use validator::{ValidationOptions, ValidationResult, Validator};
pub use view::{DocumentView, ItemIndex, ItemView};
