// src/context.rs

use crate::config::RouterConfig;

/// Process context handed to every invocation.
///
/// Created once by `Router::new` and shared behind an `Arc`; handlers reach
/// it through `Action::context`.
#[derive(Debug, Clone)]
pub struct Context {
    config: RouterConfig,
}

impl Context {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn debug_mode(&self) -> bool {
        self.config.debug_mode
    }
}
