//! Structured logging with a composable handler chain.
//!
//! Records flow through `RedactionHandler -> StackHandler -> FanoutHandler`
//! into one terminal [`FormatHandler`] per sink (console and/or file). File
//! output can rotate by size through [`RotatingWriter`]. The process-wide
//! [`LoggerService`] can be reconfigured at any time without losing or
//! misrouting records, and `tracing` events can be bridged in with
//! [`init_tracing`].
//!
//! ```no_run
//! use logchain::{attr, Config, Level};
//!
//! logchain::configure(Config {
//!     level: Level::Debug,
//!     file_path: Some("logs/app.log".into()),
//!     file_max_size_bytes: 10 * 1024 * 1024,
//!     file_max_backups: 5,
//!     ..Config::default()
//! })
//! .ok();
//! logchain::set_redacted_keys(["password"]);
//! logchain::info("user login", [attr("user", "alice"), attr("password", "x")]);
//! ```

pub mod level;
pub mod record;
pub mod error;
pub mod sink;
pub mod noop_sink;
pub mod rotate;
pub mod handler;
pub mod format;
pub mod color;
pub mod fanout;
pub mod stack;
pub mod redaction;
pub mod config;
pub mod env;
pub mod logger;
pub mod controller;
pub mod layer;
pub mod init;

pub use color::{detect_color, ColorSink};
pub use config::Config;
pub use controller::{
    add_redacted_keys, clear_redacted_keys, configure, debug, error, error_err, error_loggable,
    fatal, global, info, list_redacted_keys, logger, reset, set_level, set_logger,
    set_redacted_keys, timed, timed_level, warn, with, with_group, LoggerService,
};
pub use error::{Error, HandlerError, Result};
pub use fanout::FanoutHandler;
pub use format::{Format, FormatHandler};
pub use handler::Handler;
pub use init::{init_tracing, init_tracing_with_layer};
pub use layer::ChainLayer;
pub use level::{Level, LevelVar};
pub use logger::{Loggable, Logger, Timer};
pub use noop_sink::NoopSink;
pub use record::{attr, Attr, LogRecord, Source, Value};
pub use redaction::{sanitize_url, sanitize_url_str, RedactedKeys, RedactionHandler, REDACTED};
pub use rotate::RotatingWriter;
pub use sink::{BufferSink, ConsoleSink, FileSink, Sink};
pub use stack::{StackHandler, DEFAULT_STACK_MAX_BYTES};
