//! Handler lifecycle notifications

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hooks::HookType;

/// Hook execution phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPhase {
    /// Before handler execution
    PreExecution,
    /// Handler returned effects and they were applied
    PostExecution,
    /// Handler or effect application failed
    Failed,
    /// Handler was disabled or declined the event
    Skipped,
}

/// Hook lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookLifecycleEvent {
    pub execution_id: String,
    pub handler: String,
    pub hook_type: HookType,
    pub phase: HookPhase,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    /// Number of effects applied (post-execution only)
    pub effects: Option<usize>,
    pub duration: Option<Duration>,
}

/// Hook lifecycle observer trait
pub trait LifecycleObserver: Send + Sync {
    /// Called when a lifecycle event occurs
    fn on_event(&self, event: &HookLifecycleEvent);
}

/// Hook lifecycle manager
pub struct HookLifecycle {
    observers: RwLock<Vec<Arc<dyn LifecycleObserver>>>,
    // Keyed by (execution id, handler name)
    active_executions: RwLock<HashMap<(String, String), DateTime<Utc>>>,
}

impl HookLifecycle {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            active_executions: RwLock::new(HashMap::new()),
        }
    }

    /// Register an observer
    pub fn register_observer(&self, observer: Arc<dyn LifecycleObserver>) -> Result<(), String> {
        self.observers
            .write()
            .map_err(|_| "Failed to acquire write lock")?
            .push(observer);
        Ok(())
    }

    pub fn pre_execution(&self, execution_id: &str, handler: &str, hook_type: HookType) {
        let event = self.event(execution_id, handler, hook_type, HookPhase::PreExecution);
        if let Ok(mut active) = self.active_executions.write() {
            active.insert(
                (execution_id.to_string(), handler.to_string()),
                event.timestamp,
            );
        }
        self.notify_observers(&event);
    }

    pub fn post_execution(
        &self,
        execution_id: &str,
        handler: &str,
        hook_type: HookType,
        effects: usize,
    ) {
        let mut event = self.event(execution_id, handler, hook_type, HookPhase::PostExecution);
        event.duration = self.finish(execution_id, handler);
        event.effects = Some(effects);
        self.notify_observers(&event);
    }

    pub fn failed(&self, execution_id: &str, handler: &str, hook_type: HookType, error: String) {
        let mut event = self.event(execution_id, handler, hook_type, HookPhase::Failed);
        event.duration = self.finish(execution_id, handler);
        event.error = Some(error);
        self.notify_observers(&event);
    }

    pub fn skipped(&self, execution_id: &str, handler: &str, hook_type: HookType) {
        let event = self.event(execution_id, handler, hook_type, HookPhase::Skipped);
        self.notify_observers(&event);
    }

    /// Handler runs that started but have not finished, as
    /// (execution id, handler, start time)
    pub fn active_executions(&self) -> Vec<(String, String, DateTime<Utc>)> {
        self.active_executions
            .read()
            .map(|active| {
                active
                    .iter()
                    .map(|((execution_id, handler), started)| {
                        (execution_id.clone(), handler.clone(), *started)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn event(
        &self,
        execution_id: &str,
        handler: &str,
        hook_type: HookType,
        phase: HookPhase,
    ) -> HookLifecycleEvent {
        HookLifecycleEvent {
            execution_id: execution_id.to_string(),
            handler: handler.to_string(),
            hook_type,
            phase,
            timestamp: Utc::now(),
            error: None,
            effects: None,
            duration: None,
        }
    }

    fn notify_observers(&self, event: &HookLifecycleEvent) {
        if let Ok(observers) = self.observers.read() {
            for observer in observers.iter() {
                observer.on_event(event);
            }
        }
    }

    // Removes the run from the active set, returning how long it took
    fn finish(&self, execution_id: &str, handler: &str) -> Option<Duration> {
        let started = self
            .active_executions
            .write()
            .ok()?
            .remove(&(execution_id.to_string(), handler.to_string()))?;
        Utc::now().signed_duration_since(started).to_std().ok()
    }
}

impl Default for HookLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards lifecycle events to `tracing`
pub struct LoggingObserver {
    log_level: tracing::Level,
}

impl LoggingObserver {
    pub fn new(log_level: tracing::Level) -> Self {
        Self { log_level }
    }
}

impl LifecycleObserver for LoggingObserver {
    fn on_event(&self, event: &HookLifecycleEvent) {
        let message = match event.phase {
            HookPhase::PreExecution => format!("Hook handler '{}' starting", event.handler),
            HookPhase::PostExecution => format!(
                "Hook handler '{}' applied {} effect(s)",
                event.handler,
                event.effects.unwrap_or_default()
            ),
            HookPhase::Failed => format!(
                "Hook handler '{}' failed: {}",
                event.handler,
                event.error.as_deref().unwrap_or("unknown error")
            ),
            HookPhase::Skipped => format!("Hook handler '{}' skipped", event.handler),
        };
        let hook = event.hook_type.name();

        match self.log_level {
            tracing::Level::TRACE => tracing::trace!(hook, "{}", message),
            tracing::Level::DEBUG => tracing::debug!(hook, "{}", message),
            tracing::Level::INFO => tracing::info!(hook, "{}", message),
            tracing::Level::WARN => tracing::warn!(hook, "{}", message),
            tracing::Level::ERROR => tracing::error!(hook, "{}", message),
        }
    }
}
