//! Export model, loading and template expansion.

pub mod loader;
pub mod model;
pub mod templates;
