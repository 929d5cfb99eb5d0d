pub mod core;
pub mod papers;
pub mod scores;
pub mod session;
pub mod stats;
pub mod updates;
