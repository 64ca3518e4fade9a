use thiserror::Error;

/// Errors raised while wiring up a [`RequestResponseProcessor`].
///
/// [`RequestResponseProcessor`]: crate::RequestResponseProcessor
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A processor accepts a single processing callback. Registering a second
    /// one fails and leaves the first in place.
    #[error("a processing callback is already registered on this processor")]
    CallbackAlreadyRegistered,
}
