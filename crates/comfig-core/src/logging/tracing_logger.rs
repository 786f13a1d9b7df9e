//! Logger that forwards into `tracing`

use super::traits::Logger;

/// Emits every message as a `tracing` event with target `comfig`
///
/// Install any subscriber (for example `tracing_subscriber::fmt`) to see the
/// output; with none installed the events are dropped.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    component: Option<String>,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with a `component` field
    pub fn with_component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
        }
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }
}

macro_rules! forward {
    ($self:ident, $level:ident, $message:ident) => {
        match &$self.component {
            Some(component) => tracing::$level!(target: "comfig", component = %component, "{}", $message),
            None => tracing::$level!(target: "comfig", "{}", $message),
        }
    };
}

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        forward!(self, debug, message);
    }

    fn info(&self, message: &str) {
        forward!(self, info, message);
    }

    fn warn(&self, message: &str) {
        forward!(self, warn, message);
    }

    fn error(&self, message: &str) {
        forward!(self, error, message);
    }
}
