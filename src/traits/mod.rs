//! Core traits for target sources.

mod dispose;
mod target_source;

pub use dispose::Dispose;
pub use target_source::TargetSource;
