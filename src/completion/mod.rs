//! Context-aware completion for EXML documents.
//!
//! A request flows: text + offset -> cursor classifier -> candidate
//! generator, which consults the class graph through the schema queries and
//! the auxiliary indices (states, images, theme styles).

pub mod assist;
pub mod cursor;
pub mod images;
pub mod schema;
pub mod states;
pub mod styles;

pub use assist::ContentAssistProcessor;
pub use cursor::{check_cursor_pos, CursorInfo, CursorPos};
