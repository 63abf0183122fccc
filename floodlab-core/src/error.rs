use thiserror::Error;

use crate::resource::ResourceId;

/// Failure of a single remote command, as reported by the executor.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("target unreachable: {0}")]
    Unreachable(String),

    #[error("command exited with status {status}: {detail}")]
    NonZeroExit { status: i32, detail: String },
}

/// Failure surfaced by the command gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no executor registered for resource '{0}'")]
    UnknownResource(ResourceId),

    #[error("command failed on '{resource}': {source}")]
    Command {
        resource: ResourceId,
        #[source]
        source: CommandError,
    },
}
