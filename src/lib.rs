//! Vector map rendering and label layout for paginated output.
//!
//! Map data is projected onto a page, matched against style rules,
//! compiled into a layered display list and drawn onto a
//! [`surface::DrawingSurface`]. Labels are placed greedily against a
//! page-wide collision index so they never overlap.

pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod map;
pub mod style;
pub mod surface;
