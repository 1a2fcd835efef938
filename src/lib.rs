//! # docx-merge
//!
//! Merge structured data into DOCX templates.
//!
//! ## Features
//!
//! - `{name}` placeholders, dotted paths and `{.}` for the current item
//! - Loops and conditionals with `{#name}…{/name}`, inverted with `{^name}`
//! - Raw markup with `{@name}`
//! - Tags split over several runs by Word are still recognized
//! - Parts without tags are written back byte for byte
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docx_merge::{render, parse_data};
//!
//! let template = std::fs::read("letter.docx")?;
//! let data = parse_data(r#"{"name": "Ada", "items": ["pen", "ink"]}"#)?;
//!
//! let output = render(&template, &data)?;
//! for error in &output.errors {
//!     eprintln!("{}", error);
//! }
//! std::fs::write("letter-ada.docx", output.bytes)?;
//! ```

pub mod error;
pub mod merge;
pub mod opc;
pub mod template;
pub mod xml;

pub use error::{Error, Result};
pub use merge::{parse_data, render, MergeOptions, MergeOutput, Merger, MissingFieldPolicy};
pub use opc::{Package, Part, PartUri};
pub use template::{RenderError, RenderErrorKind};
