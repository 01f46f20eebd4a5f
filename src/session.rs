//! Durable input session
//!
//! The aggregate root tying the crate together: reads allocator parameters
//! from a configuration mapping, validates them, opens the persistent
//! region through the service registry, and resolves the configured slot
//! into a handle for downstream record readers.

use crate::alloc::DurableAllocator;
use crate::config::ConfigMap;
use crate::durable::{instantiate_entity_factory_proxies, DurableType, EntityFactoryProxy};
use crate::error::{HeapError, Result};
use crate::service;
use crate::slot::SlotHandle;
use std::path::Path;
use std::sync::Arc;

/// Fixed initial capacity request passed to the allocator on open.
/// A growth hint for fresh regions, not a hard limit; re-opened regions
/// keep their persisted capacity.
pub const DEFAULT_CAPACITY: u64 = 1_024_000;

/// Task-attempt context handed in by the batch-processing framework.
///
/// The session only extracts the configuration mapping from it and keeps a
/// shared reference around for collaborators needing task metadata.
#[derive(Debug, Clone)]
pub struct TaskAttemptContext {
    task_id: String,
    attempt: u32,
    configuration: ConfigMap,
}

impl TaskAttemptContext {
    pub fn new(task_id: impl Into<String>, attempt: u32, configuration: ConfigMap) -> Self {
        TaskAttemptContext {
            task_id: task_id.into(),
            attempt,
            configuration,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn configuration(&self) -> &ConfigMap {
        &self.configuration
    }
}

/// Session lifecycle states.
///
/// `Failed` is terminal; a session is single-use for one open attempt and
/// never transitions back to `Unconfigured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    Configured,
    Ready,
    Failed,
}

/// A session over a persistent, memory-mapped heap of durable records.
///
/// Lifecycle: construct from a task context or a bare configuration
/// mapping, then `read_config`, then `initialize`. Only a `Ready` session
/// exposes its slot handle. The open allocator is owned exclusively by the
/// session and released when it drops, on every exit path.
pub struct InputSession {
    state: SessionState,
    configuration: Option<ConfigMap>,
    task_attempt_context: Option<Arc<TaskAttemptContext>>,

    service_name: String,
    durable_types: Vec<DurableType>,
    entity_factory_proxies: Vec<Arc<dyn EntityFactoryProxy>>,
    slot_key_id: u64,

    allocator: Option<Box<dyn DurableAllocator>>,
    handle: Option<SlotHandle>,
}

impl InputSession {
    /// Construct from a task-attempt context, extracting its configuration
    pub fn from_task_context(ctx: Arc<TaskAttemptContext>) -> Self {
        let mut session = Self::from_config(ctx.configuration().clone());
        session.task_attempt_context = Some(ctx);
        session
    }

    /// Construct directly from a configuration mapping
    pub fn from_config(configuration: ConfigMap) -> Self {
        InputSession {
            state: SessionState::Unconfigured,
            configuration: Some(configuration),
            task_attempt_context: None,
            service_name: String::new(),
            durable_types: Vec::new(),
            entity_factory_proxies: Vec::new(),
            slot_key_id: 0,
            allocator: None,
            handle: None,
        }
    }

    /// Construct with no configuration mapping at all.
    ///
    /// `read_config` on such a session fails until a mapping is supplied.
    pub fn unconfigured() -> Self {
        let mut session = Self::from_config(ConfigMap::new());
        session.configuration = None;
        session
    }

    /// Read the four allocator parameters from the configuration mapping
    /// under `prefix`, then validate them.
    ///
    /// Reading and validating are one step from the caller's perspective;
    /// any failure leaves the session terminally `Failed`.
    pub fn read_config(&mut self, prefix: &str) -> Result<()> {
        if self.state != SessionState::Unconfigured {
            return Err(HeapError::InvalidState(
                "session is single-use; read_config already ran",
            ));
        }

        match self.read_config_inner(prefix) {
            Ok(()) => {
                self.state = SessionState::Configured;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    fn read_config_inner(&mut self, prefix: &str) -> Result<()> {
        let conf = self
            .configuration
            .as_ref()
            .ok_or(HeapError::MissingConfiguration)?;

        self.service_name = conf.mem_service_name(prefix);
        self.durable_types = conf.durable_types(prefix)?;
        self.entity_factory_proxies =
            instantiate_entity_factory_proxies(&conf.entity_factory_proxies(prefix))?;
        self.slot_key_id = conf.slot_key_id(prefix)?;

        self.validate_config()
    }

    /// Enforce the two configuration rules, in order: the durable-type
    /// list is non-empty, and if its first entry is a nested durable
    /// entity there is at least one entity factory proxy.
    ///
    /// Only the first type tag gates the proxy rule; later `Durable`
    /// entries are assumed to be nested under the outer record wrapper.
    pub fn validate_config(&self) -> Result<()> {
        let first = match self.durable_types.first() {
            Some(first) => first,
            None => return Err(HeapError::MissingDurableType),
        };

        if first.is_durable() && self.entity_factory_proxies.is_empty() {
            return Err(HeapError::MissingEntityFactoryProxy);
        }

        Ok(())
    }

    /// Open the persistent region at `path` and resolve the configured
    /// slot into a handle.
    ///
    /// Requires a successful `read_config`. The region is opened with
    /// activate-existing semantics; allocator errors propagate verbatim
    /// and leave the session terminally `Failed`.
    pub fn initialize<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if self.state != SessionState::Configured {
            return Err(HeapError::InvalidState(
                "read_config must succeed before initialize",
            ));
        }

        match self.initialize_inner(path.as_ref()) {
            Ok(()) => {
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Failed;
                self.allocator = None;
                self.handle = None;
                Err(err)
            }
        }
    }

    fn initialize_inner(&mut self, path: &Path) -> Result<()> {
        let allocator =
            service::open_allocator(&self.service_name, path, DEFAULT_CAPACITY, true)?;
        let handle = allocator.handler(self.slot_key_id)?;

        tracing::debug!(
            service = %self.service_name,
            slot_key_id = self.slot_key_id,
            path = %path.display(),
            "durable session ready"
        );

        self.allocator = Some(allocator);
        self.handle = Some(handle);
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The resolved slot handle; only available once the session is `Ready`
    pub fn handle(&self) -> Result<SlotHandle> {
        match (self.state, self.handle) {
            (SessionState::Ready, Some(handle)) => Ok(handle),
            _ => Err(HeapError::InvalidState("session is not ready")),
        }
    }

    /// The open allocator; only available once the session is `Ready`
    pub fn allocator(&self) -> Result<&dyn DurableAllocator> {
        match (self.state, self.allocator.as_deref()) {
            (SessionState::Ready, Some(allocator)) => Ok(allocator),
            _ => Err(HeapError::InvalidState("session is not ready")),
        }
    }

    pub fn configuration(&self) -> Option<&ConfigMap> {
        self.configuration.as_ref()
    }

    pub fn task_attempt_context(&self) -> Option<&Arc<TaskAttemptContext>> {
        self.task_attempt_context.as_ref()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn durable_types(&self) -> &[DurableType] {
        &self.durable_types
    }

    pub fn entity_factory_proxies(&self) -> &[Arc<dyn EntityFactoryProxy>] {
        &self.entity_factory_proxies
    }

    pub fn slot_key_id(&self) -> u64 {
        self.slot_key_id
    }

    /// Release the allocator and end the session.
    ///
    /// Dropping the session has the same effect; this form surfaces flush
    /// errors instead of logging them.
    pub fn close(mut self) -> Result<()> {
        if let Some(mut allocator) = self.allocator.take() {
            allocator.flush()?;
        }
        self.handle = None;
        self.state = SessionState::Failed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_unconfigured() {
        let session = InputSession::from_config(ConfigMap::new());
        assert_eq!(session.state(), SessionState::Unconfigured);
        assert!(session.handle().is_err());
        assert!(session.allocator().is_err());
    }

    #[test]
    fn test_read_config_without_mapping() {
        let mut session = InputSession::unconfigured();
        let err = session.read_config("duraheap.input.").unwrap_err();
        assert!(matches!(err, HeapError::MissingConfiguration));
        assert_eq!(err.to_string(), "Configuration has not yet been set");
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_task_context_supplies_configuration() {
        let conf = ConfigMap::from_iter([("duraheap.input.durable-types", "long")]);
        let ctx = Arc::new(TaskAttemptContext::new("attempt_0001_m_000002", 1, conf));

        let mut session = InputSession::from_task_context(ctx.clone());
        session.read_config("duraheap.input.").unwrap();

        assert_eq!(session.state(), SessionState::Configured);
        let stored = session.task_attempt_context().unwrap();
        assert_eq!(stored.task_id(), "attempt_0001_m_000002");
        assert_eq!(stored.attempt(), 1);
        assert!(Arc::ptr_eq(stored, &ctx));
    }

    #[test]
    fn test_session_is_single_use() {
        let conf = ConfigMap::from_iter([("duraheap.input.durable-types", "long")]);
        let mut session = InputSession::from_config(conf);
        session.read_config("duraheap.input.").unwrap();
        assert!(matches!(
            session.read_config("duraheap.input."),
            Err(HeapError::InvalidState(_))
        ));
        // The guard itself does not poison the session
        assert_eq!(session.state(), SessionState::Configured);
    }

    #[test]
    fn test_initialize_requires_configured_state() {
        let mut session = InputSession::from_config(ConfigMap::new());
        assert!(matches!(
            session.initialize("/nonexistent"),
            Err(HeapError::InvalidState(_))
        ));
    }
}
