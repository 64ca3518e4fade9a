mod layer;

pub use layer::{ProcessorLayer, ProcessorService};

use crate::config::ProcessorConfig;
use crate::error::ConfigurationError;
use crate::snapshot::{RequestSnapshot, ResponseSnapshot};
use chrono::{DateTime, Utc};
use log::*;
use std::sync::{Arc, RwLock};

/// The user-supplied processing function. Receives the request snapshot, the
/// UTC start/end times of the request and the response snapshot. Runs
/// synchronously on the task completing the request; a panic inside it
/// propagates to the host framework.
pub type ProcessorCallback = Arc<
    dyn Fn(&RequestSnapshot, DateTime<Utc>, DateTime<Utc>, &ResponseSnapshot) + Send + Sync,
>;

pub(crate) struct ProcessorState {
    // written before traffic begins, read per request
    pub(crate) config: RwLock<ProcessorConfig>,
    pub(crate) callback: RwLock<Option<ProcessorCallback>>,
}

/// Hook registrar: owns the filter configuration and the single processing
/// callback, and hands out the [`ProcessorLayer`] that attaches the dispatch
/// path to a router.
///
/// Nothing is dispatched until the layer is attached, so a processor built
/// ahead of its router performs no work in the meantime. Clones share the
/// same underlying state.
#[derive(Clone)]
pub struct RequestResponseProcessor {
    state: Arc<ProcessorState>,
}

impl Default for RequestResponseProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestResponseProcessor {
    /// Processor with the default configuration (no status code filter).
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            state: Arc::new(ProcessorState {
                config: RwLock::new(config),
                callback: RwLock::new(None),
            }),
        }
    }

    /// Processor configured from `REQUEST_RESPONSE_PROCESSOR_*` environment
    /// variables, see [`ProcessorConfig::from_env`].
    pub fn from_env() -> Self {
        Self::with_config(ProcessorConfig::from_env())
    }

    /// Replace the filter configuration. Binding twice overwrites: the last
    /// call wins, and layers already attached observe the new configuration
    /// on their next request.
    pub fn bind(&self, config: ProcessorConfig) {
        debug!(
            "Binding processor config: {} status codes, exclude_only={}",
            config.status_codes.len(),
            config.exclude_only
        );
        *self.state.config.write().unwrap() = config;
    }

    pub fn config(&self) -> ProcessorConfig {
        self.state.config.read().unwrap().clone()
    }

    /// Set the processing callback. At most one callback is accepted per
    /// processor; a second registration fails and the first stays active.
    pub fn register_callback<F>(&self, callback: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&RequestSnapshot, DateTime<Utc>, DateTime<Utc>, &ResponseSnapshot)
            + Send
            + Sync
            + 'static,
    {
        let mut slot = self.state.callback.write().unwrap();
        if slot.is_some() {
            return Err(ConfigurationError::CallbackAlreadyRegistered);
        }
        *slot = Some(Arc::new(callback));
        Ok(())
    }

    /// The middleware layer to attach to a router. Every request passing
    /// through it is evaluated against the filter once its response exists.
    pub fn layer(&self) -> ProcessorLayer {
        ProcessorLayer::new(self.state.clone())
    }
}
