//! Core types for rehearse.

mod card;
mod filter;
mod patch;
mod quality;
mod review_log;

pub use card::*;
pub use filter::*;
pub use patch::*;
pub use quality::*;
pub use review_log::*;
