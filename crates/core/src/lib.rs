#![forbid(unsafe_code)]
#![warn(clippy::wildcard_enum_match_arm)]

pub mod codec;
pub mod model;
pub mod scoring;
pub mod time;

pub use time::Clock;
