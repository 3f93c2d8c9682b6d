//! Logic hooks: team-configured handlers run on lifecycle events.
//!
//! Dispatch is best effort. A handler that fails, or an extension naming a
//! handler that is not registered, is counted in the [`DispatchReport`] and
//! logged, but never surfaces as an error of the operation that fired it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::extension::{Extension, HookEvent};
use crate::domain::types::TeamId;
use crate::repository::ExtensionReader;

pub const LOG_HANDLER: &str = "log";
pub const REQUIRE_FIELDS_HANDLER: &str = "require_fields";

/// What a handler sees of the event that fired it.
#[derive(Debug)]
pub struct HookContext<'a> {
    pub team_id: TeamId,
    pub event: HookEvent,
    pub payload: &'a Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("payload is missing required fields: {0}")]
    MissingFields(String),

    #[error("invalid handler config: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Failed(String),
}

pub trait LogicHook: Send + Sync {
    fn call(&self, extension: &Extension, context: &HookContext<'_>) -> Result<(), HookError>;
}

/// Writes one structured log line per event.
struct LogHook;

impl LogicHook for LogHook {
    fn call(&self, extension: &Extension, context: &HookContext<'_>) -> Result<(), HookError> {
        let message = extension
            .config
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("hook fired");
        log::info!(
            target: "teamcrm::hooks",
            "{message}: extension={} team={} event={} payload={}",
            extension.name,
            context.team_id,
            context.event,
            context.payload
        );
        Ok(())
    }
}

/// Fails when the payload lacks any field listed in `config.fields`.
///
/// A field counts as missing when it is absent, `null` or an empty string.
struct RequireFieldsHook;

impl LogicHook for RequireFieldsHook {
    fn call(&self, extension: &Extension, context: &HookContext<'_>) -> Result<(), HookError> {
        let fields = extension
            .config
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| HookError::InvalidConfig("`fields` must be a list".to_string()))?;

        let missing: Vec<&str> = fields
            .iter()
            .filter_map(Value::as_str)
            .filter(|field| match context.payload.get(*field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(HookError::MissingFields(missing.join(", ")))
        }
    }
}

/// Handlers available to extensions, keyed by the name extensions refer to.
#[derive(Clone)]
pub struct HookRegistry {
    handlers: HashMap<String, Arc<dyn LogicHook>>,
}

impl HookRegistry {
    /// A registry without any handlers.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn LogicHook>) {
        self.handlers.insert(key.into(), handler);
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn LogicHook>> {
        self.handlers.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }
}

impl Default for HookRegistry {
    /// The built-in `log` and `require_fields` handlers.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(LOG_HANDLER, Arc::new(LogHook));
        registry.register(REQUIRE_FIELDS_HANDLER, Arc::new(RequireFieldsHook));
        registry
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct DispatchReport {
    pub executed: usize,
    pub failed: usize,
    /// Extensions whose handler is not registered.
    pub skipped: usize,
}

/// Runs every active extension of the team bound to `event`, by priority.
pub fn dispatch<R>(
    repo: &R,
    hooks: &HookRegistry,
    team_id: TeamId,
    event: HookEvent,
    payload: &Value,
) -> DispatchReport
where
    R: ExtensionReader + ?Sized,
{
    let mut report = DispatchReport::default();

    let extensions = match repo.list_active_extensions(team_id, event) {
        Ok(extensions) => extensions,
        Err(err) => {
            log::error!("Failed to load extensions for {event}: {err}");
            return report;
        }
    };

    let context = HookContext {
        team_id,
        event,
        payload,
    };

    for extension in &extensions {
        let Some(handler) = hooks.get(extension.handler.as_str()) else {
            log::warn!(
                "Extension {} refers to unknown handler {}",
                extension.id,
                extension.handler
            );
            report.skipped += 1;
            continue;
        };

        match handler.call(extension, &context) {
            Ok(()) => report.executed += 1,
            Err(err) => {
                log::error!("Extension {} failed on {event}: {err}", extension.id);
                report.failed += 1;
            }
        }
    }

    report
}

/// Serializes `record` as the event payload and dispatches it.
pub fn fire<R, T>(
    repo: &R,
    hooks: &HookRegistry,
    team_id: TeamId,
    event: HookEvent,
    record: &T,
) -> DispatchReport
where
    R: ExtensionReader + ?Sized,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_value(record).unwrap_or_else(|err| {
        log::error!("Failed to serialize {event} payload: {err}");
        Value::Null
    });
    dispatch(repo, hooks, team_id, event, &payload)
}
