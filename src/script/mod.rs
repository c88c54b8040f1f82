// src/script/mod.rs

//! Feature script inspection.
//!
//! - [`lexer`] tokenizes annotation and header lines.
//! - [`extract`] turns script text into a [`crate::dag::DeclarationTable`].

pub mod extract;
pub mod lexer;

pub use extract::{extract_declarations, extract_from_path, list_features_provided};
