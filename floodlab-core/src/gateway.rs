//! Serialized command execution against shared remote resources.
//!
//! Every host and switch exposes a raw `run(command) -> output` interface.
//! Concurrent callers (the probing loop, the background monitor, mitigation
//! timers) must never interleave commands on the same resource, so the
//! gateway holds one mutual-exclusion gate per resource identity. Callers
//! targeting different resources proceed fully in parallel.
//!
//! The gateway performs no timeouts and no retries: commands are assumed to
//! complete in bounded real time, and a failed command is surfaced to the
//! caller as a result, never swallowed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{CommandError, GatewayError};
use crate::resource::ResourceId;

/// Raw command execution against one remote resource.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, command: &str) -> Result<String, CommandError>;
}

struct Slot {
    executor: Arc<dyn CommandExecutor>,
    gate: Mutex<()>,
}

/// Registry of per-resource executors with one lock per resource identity.
///
/// The registry is built once at topology-build time; resource identifiers
/// are stable for the lifetime of the run.
pub struct CommandGateway {
    slots: HashMap<ResourceId, Slot>,
}

impl CommandGateway {
    pub fn new(executors: impl IntoIterator<Item = (ResourceId, Arc<dyn CommandExecutor>)>) -> Self {
        let slots = executors
            .into_iter()
            .map(|(id, executor)| {
                (
                    id,
                    Slot {
                        executor,
                        gate: Mutex::new(()),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    pub fn knows(&self, id: &ResourceId) -> bool {
        self.slots.contains_key(id)
    }

    /// Runs `command` on the identified resource.
    ///
    /// At most one command is in flight per resource at any time; acquisition
    /// waits for the prior command on that resource to complete, in request
    /// order, without bound.
    pub async fn execute(&self, id: &ResourceId, command: &str) -> Result<String, GatewayError> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| GatewayError::UnknownResource(id.clone()))?;

        let _guard = slot.gate.lock().await;
        slot.executor
            .run(command)
            .await
            .map_err(|source| GatewayError::Command {
                resource: id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records the peak number of concurrently running commands.
    struct ConcurrencyProbe {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ConcurrencyProbe {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CommandExecutor for ConcurrencyProbe {
        async fn run(&self, _command: &str) -> Result<String, CommandError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(String::new())
        }
    }

    struct Failing;

    #[async_trait]
    impl CommandExecutor for Failing {
        async fn run(&self, _command: &str) -> Result<String, CommandError> {
            Err(CommandError::NonZeroExit {
                status: 1,
                detail: "boom".into(),
            })
        }
    }

    #[tokio::test]
    async fn serializes_commands_per_resource() {
        let probe = ConcurrencyProbe::new();
        let gateway = Arc::new(CommandGateway::new([(
            ResourceId::from("h1"),
            probe.clone() as Arc<dyn CommandExecutor>,
        )]));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let gw = gateway.clone();
            tasks.push(tokio::spawn(async move {
                gw.execute(&ResourceId::from("h1"), "noop").await.unwrap();
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_resources_run_in_parallel() {
        let probe = ConcurrencyProbe::new();
        let gateway = Arc::new(CommandGateway::new([
            (
                ResourceId::from("h1"),
                probe.clone() as Arc<dyn CommandExecutor>,
            ),
            (
                ResourceId::from("h2"),
                probe.clone() as Arc<dyn CommandExecutor>,
            ),
        ]));

        let a = {
            let gw = gateway.clone();
            tokio::spawn(async move { gw.execute(&ResourceId::from("h1"), "noop").await })
        };
        let b = {
            let gw = gateway.clone();
            tokio::spawn(async move { gw.execute(&ResourceId::from("h2"), "noop").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(probe.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn surfaces_command_failure() {
        let gateway = CommandGateway::new([(
            ResourceId::from("sw1"),
            Arc::new(Failing) as Arc<dyn CommandExecutor>,
        )]);

        let err = gateway
            .execute(&ResourceId::from("sw1"), "flow add")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Command { .. }));
    }

    #[tokio::test]
    async fn unknown_resource_is_an_error() {
        let gateway = CommandGateway::new(Vec::<(ResourceId, Arc<dyn CommandExecutor>)>::new());
        let err = gateway
            .execute(&ResourceId::from("ghost"), "noop")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownResource(_)));
    }
}
