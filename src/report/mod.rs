//! Rendering of dashboard views as Markdown or JSON.

mod generator;

pub use generator::*;
