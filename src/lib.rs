//! Per-module console logging with colored tags, level and module
//! filtering, and one-way production silencing.
//!
//! A [`LogService`] owns a registry of named [`Logger`] instances. Each
//! logger tags its lines with the module name in a color assigned at
//! creation; the service applies the global output policy (level
//! allow-list, module allow-list, production mode) before anything
//! reaches the console.
//!
//! ```no_run
//! use modlog::{Level, LogService, Logger};
//!
//! let logs = LogService::new();
//! logs.only_levels(&[Level::Info, Level::Warn]);
//!
//! let net: Logger = logs.create("net", &[]);
//! net.info("listener ready", vec![]);
//! net.data("dropped by the level filter", vec![]);
//! ```

pub mod color;
pub mod console;
mod display;
pub mod level;
pub mod logger;
pub mod service;
mod tick;

pub use color::Color;
pub use console::{Channel, Console, ConsoleSink, MemorySink, TermSink};
pub use level::Level;
pub use logger::{LogData, Logger};
pub use service::{LogService, LogServiceOptions, OptionsError};
