use crate::error::HandlerError;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::{Attr, LogRecord};
use std::sync::Arc;

/// Delivers every record to each child handler in construction order.
///
/// A failing child never prevents delivery to the children after it; the
/// first error seen is returned once all children have been tried.
pub struct FanoutHandler {
    children: Vec<Arc<dyn Handler>>,
}

impl FanoutHandler {
    pub fn new(children: Vec<Arc<dyn Handler>>) -> Self {
        Self { children }
    }

    /// Collapse `children` into one handler: the sole child itself, or a
    /// fan-out over all of them. Returns `None` for an empty list.
    pub fn combine(mut children: Vec<Arc<dyn Handler>>) -> Option<Arc<dyn Handler>> {
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(Arc::new(Self::new(children))),
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Handler for FanoutHandler {
    fn enabled(&self, level: Level) -> bool {
        self.children.iter().any(|h| h.enabled(level))
    }

    fn handle(&self, record: &LogRecord) -> Result<(), HandlerError> {
        let mut first_err = None;
        for child in &self.children {
            if let Err(err) = child.handle(record) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_attrs(&self, attrs: &[Attr]) -> Arc<dyn Handler> {
        Arc::new(Self::new(
            self.children.iter().map(|h| h.with_attrs(attrs)).collect(),
        ))
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(Self::new(
            self.children.iter().map(|h| h.with_group(name)).collect(),
        ))
    }
}
