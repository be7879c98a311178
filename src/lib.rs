// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod progress;
pub mod runtime;
pub mod schedule;
pub mod session;
pub mod solve;
pub mod stats;
pub mod store;
pub mod timer;
pub mod ui;
pub mod util;

pub use error::{CubikError, CubikResult};
