use std::fmt;
use std::sync::Arc;

use csp_config::Config;
use csp_filter::Blocklist;

use crate::services::emitter::{ReportEmitter, ReportSink};

#[derive(Debug)]
struct StateInner {
    config: Arc<Config>,
    blocklist: Blocklist,
    emitter: ReportEmitter,
}

/// Server state shared by all request handlers.
///
/// Everything in the state is immutable after startup. Cloning is cheap.
#[derive(Clone)]
pub struct ServiceState {
    inner: Arc<StateInner>,
}

impl ServiceState {
    /// Creates the service state from the configuration, the loaded blocklist and the sink that
    /// receives accepted reports.
    pub fn new(config: Arc<Config>, blocklist: Blocklist, sink: Arc<dyn ReportSink>) -> Self {
        let emitter = ReportEmitter::new(&config, sink);

        Self {
            inner: Arc::new(StateInner {
                config,
                blocklist,
                emitter,
            }),
        }
    }

    /// Returns the collector's static configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the blocklist applied to all reports.
    pub fn blocklist(&self) -> &Blocklist {
        &self.inner.blocklist
    }

    /// Returns the emitter for accepted reports.
    pub fn emitter(&self) -> &ReportEmitter {
        &self.inner.emitter
    }
}

impl fmt::Debug for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}
