use thiserror::Error;

use floodlab_core::error::GatewayError;
use floodlab_core::resource::ResourceId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("flood sink services failed to start on '{0}'")]
    SinkServices(ResourceId),

    #[error("gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    #[error("result sink I/O error: {0}")]
    Io(#[from] std::io::Error),
}
