//! `tsdocfmt_core` is the core library for the
//! [tsdocfmt](https://github.com/ifiokjr/tsdocfmt) documentation comment
//! formatter. It normalizes TSDoc comments in TypeScript and JavaScript
//! sources, enforces a release tag policy and re-renders each comment within a
//! width budget so that formatting is idempotent.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source file
//!   -> Source scanner (finds /** */ comments, builds a declaration tree)
//!   -> Body extraction (strips delimiters and ` * ` prefixes)
//!   -> Legacy transformer (rewrites JSDoc-era annotations)
//!   -> Parser (splits tagged sections into a CommentModel)
//!   -> Context analyzer (export, container and enum facts)
//!   -> Policy engine (dedupes and inserts release tags, orders tags)
//!   -> Layout (Doc IR, printer, embedded code formatters)
//!   -> Engine (splices formatted comments back in reverse offset order)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: `FormatOptions` and loading from `tsdocfmt.toml`.
//! - [`context`]: declaration trees and the export context of a comment.
//! - [`policy`]: release tag deduplication, insertion and tag ordering.
//! - [`legacy`]: JSDoc compatibility rewrites.
//! - [`doc`]: the layout document and its printer.
//! - [`project`]: gitignore-aware discovery of source files.
//!
//! ## Quick Start
//!
//! ```rust
//! use tsdocfmt_core::FormatOptions;
//! use tsdocfmt_core::NoopDiagnostics;
//! use tsdocfmt_core::format_source;
//!
//! let source = "/**\n * Adds two numbers.\n * @param {number} a first\n */\nexport function add(a: number) {}\n";
//! let formatted = format_source(source, &FormatOptions::default(), &NoopDiagnostics);
//!
//! assert!(formatted.contains(" * @param a - first"));
//! assert!(formatted.contains(" * @internal"));
//! ```

pub use config::*;
pub use context::*;
pub use diagnostics::*;
pub use embed::*;
pub use engine::*;
pub use error::*;
pub use layout::*;
pub use markdown_layout::*;
pub use model::*;
pub use parser::*;
pub use parser_cache::*;
pub use project::*;
pub use source_scanner::*;

pub mod config;
pub mod context;
mod diagnostics;
pub mod doc;
mod embed;
mod engine;
#[allow(unused_assignments)]
mod error;
mod layout;
pub mod legacy;
pub(crate) mod lexer;
mod markdown_layout;
mod model;
mod parser;
mod parser_cache;
pub mod policy;
pub mod project;
pub mod source_scanner;

#[cfg(test)]
mod __fixtures;
#[cfg(test)]
mod __tests;
