//! Collaborator traits the engine consumes.

mod clock;
mod repository;

pub use clock::*;
pub use repository::*;
