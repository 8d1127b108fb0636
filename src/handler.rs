use crate::error::HandlerError;
use crate::level::Level;
use crate::record::{Attr, LogRecord};
use std::sync::Arc;

/// One stage of a handler chain.
///
/// Stages are composed by construction: decorators (redaction, stack
/// attachment, fan-out) own the next stage(s) as `Arc<dyn Handler>`, and the
/// chain ends in a formatter writing to a [`Sink`](crate::sink::Sink).
/// A built chain is never mutated; `with_attrs`/`with_group` derive a new one.
pub trait Handler: Send + Sync {
    /// Whether a record at `level` would be emitted by this stage.
    fn enabled(&self, level: Level) -> bool;

    /// Process one record.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was emitted (or deliberately skipped).
    /// - `Err(..)` if a sink or encoder failed.
    fn handle(&self, record: &LogRecord) -> Result<(), HandlerError>;

    /// New handler that includes `attrs` in every record it emits.
    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler>;

    /// New handler that nests subsequent attributes under `name`.
    fn with_group(&self, name: &str) -> Arc<dyn Handler>;
}
