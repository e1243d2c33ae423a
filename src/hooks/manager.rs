//! Central hook manager implementation

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use crate::hooks::{
    types::HookStats, EffectApplier, Effects, HookContext, HookError, HookHandler, HookLifecycle,
    HookPayload, HookPriority, HookResult, HookType, HostEvent,
};

/// Entry for a registered hook handler
struct HandlerEntry {
    handler: Arc<dyn HookHandler>,
    priority: HookPriority,
    stats: HookStats,
    enabled: bool,
}

/// Registered handlers and their dispatch order
pub struct HookManager {
    /// Handler names by hook type, in priority order
    handlers: DashMap<HookType, Vec<String>>,

    /// Handler entries by name
    entries: DashMap<String, HandlerEntry>,

    lifecycle: Arc<HookLifecycle>,

    /// Whether hooks are enabled globally
    enabled: bool,
}

impl HookManager {
    /// Create a new hook manager
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            entries: DashMap::new(),
            lifecycle: Arc::new(HookLifecycle::new()),
            enabled: true,
        }
    }

    /// Register a handler for the given hook types
    pub fn register<H: HookHandler + 'static>(
        &self,
        name: impl Into<String>,
        hook_types: Vec<HookType>,
        handler: H,
        priority: HookPriority,
    ) -> HookResult<()> {
        let name = name.into();

        if self.entries.contains_key(&name) {
            return Err(HookError::RegistrationFailed(format!(
                "Handler '{}' already registered",
                name
            )));
        }
        if hook_types.is_empty() {
            return Err(HookError::RegistrationFailed(format!(
                "Handler '{}' has no hook types",
                name
            )));
        }

        self.entries.insert(
            name.clone(),
            HandlerEntry {
                handler: Arc::new(handler),
                priority,
                stats: HookStats::default(),
                enabled: true,
            },
        );

        for hook_type in hook_types {
            let mut handlers = self.handlers.entry(hook_type).or_default();
            handlers.push(name.clone());

            // Stable sort keeps registration order within a priority
            let entries = &self.entries;
            handlers.sort_by_key(|h| {
                entries
                    .get(h)
                    .map(|e| e.priority)
                    .unwrap_or(HookPriority::NORMAL)
            });
        }

        Ok(())
    }

    /// Unregister a hook handler
    pub fn unregister(&self, name: &str) -> HookResult<()> {
        if self.entries.remove(name).is_none() {
            return Err(HookError::HandlerNotFound(name.to_string()));
        }

        for mut handlers in self.handlers.iter_mut() {
            handlers.retain(|h| h != name);
        }

        Ok(())
    }

    /// Run every handler registered for the event's hook
    ///
    /// Each handler's effects are applied before the next handler runs, so
    /// later handlers see the updated payload and settings. The first failure
    /// aborts the dispatch and is returned unchanged.
    pub fn execute(
        &self,
        context: &HookContext,
        event: HostEvent,
        applier: &EffectApplier<'_>,
    ) -> HookResult<HostEvent> {
        if !self.enabled {
            return Ok(event);
        }

        let hook_type = event.hook_type();
        let handler_names = self
            .handlers
            .get(&hook_type)
            .map(|h| h.clone())
            .unwrap_or_default();

        let mut payload = HookPayload::new(event);

        for handler_name in handler_names {
            let (handler, enabled) = match self.entries.get(&handler_name) {
                Some(entry) => (entry.handler.clone(), entry.enabled),
                None => continue,
            };

            if !enabled || !handler.should_run(context, &payload) {
                self.lifecycle
                    .skipped(&payload.execution_id, &handler_name, hook_type);
                continue;
            }

            tracing::debug!(
                hook_type = %hook_type,
                handler = %handler_name,
                user_id = context.user_id(),
                execution_id = %payload.execution_id,
                request_id = context.request_id().unwrap_or("-"),
                "Running hook handler"
            );

            let start = Instant::now();
            self.lifecycle
                .pre_execution(&payload.execution_id, &handler_name, hook_type);

            let outcome = handler.execute(context, &payload).and_then(|effects| {
                let count = effects.len();
                applier.apply(effects, &mut payload.event)?;
                Ok(count)
            });

            let duration = start.elapsed();
            match outcome {
                Ok(count) => {
                    if let Some(mut entry) = self.entries.get_mut(&handler_name) {
                        entry.stats.record_success(duration, count > 0);
                    }
                    self.lifecycle.post_execution(
                        &payload.execution_id,
                        &handler_name,
                        hook_type,
                        count,
                    );
                }
                Err(e) => {
                    if let Some(mut entry) = self.entries.get_mut(&handler_name) {
                        entry.stats.record_failure(duration);
                    }
                    tracing::warn!(hook_type = %hook_type, handler = %handler_name, error = %e, "Hook handler failed");
                    self.lifecycle.failed(
                        &payload.execution_id,
                        &handler_name,
                        hook_type,
                        e.to_string(),
                    );
                    return Err(e);
                }
            }
        }

        Ok(payload.event)
    }

    /// Collect the effects every enabled handler would produce, without
    /// applying any of them
    pub fn plan(&self, context: &HookContext, payload: &HookPayload) -> HookResult<Effects> {
        let mut planned = Effects::none();
        if !self.enabled {
            return Ok(planned);
        }

        let handler_names = self
            .handlers
            .get(&payload.hook_type())
            .map(|h| h.clone())
            .unwrap_or_default();

        for handler_name in handler_names {
            let handler = match self.entries.get(&handler_name) {
                Some(entry) if entry.enabled => entry.handler.clone(),
                _ => continue,
            };
            if handler.should_run(context, payload) {
                planned.extend(handler.execute(context, payload)?);
            }
        }

        Ok(planned)
    }

    /// Enable or disable a specific handler
    pub fn set_handler_enabled(&self, name: &str, enabled: bool) -> HookResult<()> {
        self.entries
            .get_mut(name)
            .map(|mut entry| {
                entry.enabled = enabled;
            })
            .ok_or_else(|| HookError::HandlerNotFound(name.to_string()))
    }

    /// Get statistics for a handler
    pub fn get_stats(&self, name: &str) -> Option<HookStats> {
        self.entries.get(name).map(|entry| entry.stats.clone())
    }

    /// All registered handlers with their hook types, priority and state
    pub fn list_handlers(&self) -> Vec<(String, Vec<HookType>, HookPriority, bool)> {
        let mut result: Vec<_> = self
            .entries
            .iter()
            .map(|entry| {
                let name = entry.key().clone();
                let mut hook_types: Vec<HookType> = self
                    .handlers
                    .iter()
                    .filter(|handlers| handlers.value().contains(&name))
                    .map(|handlers| *handlers.key())
                    .collect();
                hook_types.sort();
                (name, hook_types, entry.priority, entry.enabled)
            })
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// Enable or disable all hooks
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get the lifecycle manager
    pub fn lifecycle(&self) -> Arc<HookLifecycle> {
        self.lifecycle.clone()
    }
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new()
    }
}
