// Mock utilities for testing

use menuet_core::{Dependencies, ModuleEntry, RequestContext};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared, clonable log of calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call with its arguments
    pub fn record(&self, name: &str, args: Value) {
        self.calls.lock().push((name.to_string(), args));
    }

    /// Get the number of calls
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Get the number of calls to `name`
    pub fn count_of(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|(called, _)| called == name).count()
    }

    /// Check if `name` was called
    pub fn was_called(&self, name: &str) -> bool {
        self.count_of(name) > 0
    }

    /// Arguments of every call, in order
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// Arguments of the most recent call
    pub fn last(&self) -> Option<(String, Value)> {
        self.calls.lock().last().cloned()
    }

    /// Clear all calls
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// A controller that records what it receives and answers with a fixed payload.
#[derive(Debug, Clone)]
pub struct MockController {
    path: String,
    reply: Value,
    log: CallLog,
}

impl MockController {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            reply: json!({}),
            log: CallLog::new(),
        }
    }

    /// Payload returned by every call
    pub fn returning(mut self, reply: Value) -> Self {
        self.reply = reply;
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    /// The module entry to register; each call records
    /// `{params, query, body}` under the controller path.
    pub fn entry(&self) -> ModuleEntry {
        let path = self.path.clone();
        let reply = self.reply.clone();
        let log = self.log.clone();
        ModuleEntry::controller(self.path.clone(), &[], move |_: &Dependencies, ctx: RequestContext| {
            log.record(
                &path,
                json!({"params": ctx.params, "query": ctx.query, "body": ctx.body}),
            );
            let reply = reply.clone();
            async move { Ok(reply) }
        })
    }
}

/// Mock service with a configurable return value
#[derive(Debug, Clone)]
pub struct MockService<T> {
    log: CallLog,
    return_value: Arc<Mutex<Option<T>>>,
}

impl<T: Clone> MockService<T> {
    pub fn new() -> Self {
        Self {
            log: CallLog::new(),
            return_value: Arc::new(Mutex::new(None)),
        }
    }

    /// Set the return value
    pub fn with_return(self, value: T) -> Self {
        *self.return_value.lock() = Some(value);
        self
    }

    /// Record a call and hand back the configured value
    pub fn call(&self, method: &str, args: Value) -> Option<T> {
        self.log.record(method, args);
        self.return_value.lock().clone()
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }
}

impl<T: Clone> Default for MockService<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_log() {
        let log = CallLog::new();
        log.record("find", json!({"id": 1}));
        log.record("find", json!({"id": 2}));
        log.record("save", json!({}));

        assert_eq!(log.call_count(), 3);
        assert_eq!(log.count_of("find"), 2);
        assert!(log.was_called("save"));
        assert_eq!(log.last(), Some(("save".to_string(), json!({}))));

        log.clear();
        assert_eq!(log.call_count(), 0);
    }

    #[test]
    fn test_mock_service() {
        let mock = MockService::new().with_return(7u32);
        assert_eq!(mock.call("count", json!(null)), Some(7));
        assert!(mock.log().was_called("count"));
    }

    #[test]
    fn test_mock_controller_entry_path() {
        let controller = MockController::new("user/profile");
        assert_eq!(controller.entry().path, "user/profile");
        assert_eq!(controller.log().call_count(), 0);
    }
}
