//! Fan a single master document out into per-service `.proto` files.
//!
//! Sections are introduced by marker comments of the form `// # begin(name)`.
//! Every line after a marker, up to the next marker, lands in `name.proto`,
//! which is seeded with [`HEADER`].

pub mod error;
pub mod splitter;

pub use error::{Result, SplitError};
pub use splitter::{parse_marker, split, Section, SplitReport, Splitter, HEADER};
