//! Trip domain entities.

pub mod model;

pub use model::Trip;
