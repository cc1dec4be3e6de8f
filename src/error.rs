//! Engine error taxonomy.
//!
//! Every failure the runtime can hit falls into one of three buckets:
//!
//! - [`EngineError::Validation`] – malformed event, hook, handle or parameter
//! - [`EngineError::Resource`] – device, environment or asset failure
//! - [`EngineError::Script`] – a Lua error raised while running a script or callback
//!
//! All three are fatal. The [`Scheduler`](crate::scheduler::Scheduler) funnels
//! them into a single [`FatalReporter`](crate::scheduler::FatalReporter).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("resource error: {0}")]
    Resource(String),
    #[error("script error: {0}")]
    Script(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }
}

impl From<mlua::Error> for EngineError {
    fn from(err: mlua::Error) -> Self {
        Self::Script(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Resource(err.to_string())
    }
}

impl From<image::ImageError> for EngineError {
    fn from(err: image::ImageError) -> Self {
        Self::Resource(err.to_string())
    }
}

impl From<EngineError> for mlua::Error {
    fn from(err: EngineError) -> Self {
        mlua::Error::external(err)
    }
}
