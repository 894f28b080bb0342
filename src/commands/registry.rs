//! Handler registration.
//!
//! Handlers are plain async functions looked up by the name a command's
//! configuration entry declares. Modules that already hold a registry call
//! [`HandlerRegistry::register`]; code that runs before any bot exists can
//! stage handlers with [`register_later`], and each bot adopts (and clears)
//! the staged set when it is built.

use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::Invocation;
use crate::error::Result;

/// A bound command handler
pub type HandlerFn = Arc<dyn Fn(Invocation) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Wrap an async function as a [`HandlerFn`]
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |inv| Box::pin(f(inv)))
}

/// Handlers staged before a bot instance exists
static PENDING: Lazy<Mutex<HashMap<String, HandlerFn>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Stage a handler for the next bot that gets built
pub fn register_later(name: &str, f: HandlerFn) {
    let mut pending = PENDING.lock();
    if pending.insert(name.to_string(), f).is_some() {
        warn!("Pending handler '{}' registered twice, keeping the latest", name);
    }
}

/// Number of handlers currently staged
pub fn pending_count() -> usize {
    PENDING.lock().len()
}

/// Handler name -> function, owned by one bot instance
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerFn>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A second registration under the same name replaces the first.
    pub fn register(&mut self, name: &str, f: HandlerFn) {
        if self.handlers.insert(name.to_string(), f).is_some() {
            warn!("Handler '{}' registered twice, keeping the latest", name);
        } else {
            debug!("Registered handler '{}'", name);
        }
    }

    /// Move every staged handler into this registry and clear the staging set
    pub fn adopt_pending(&mut self) -> usize {
        let drained: Vec<(String, HandlerFn)> = PENDING.lock().drain().collect();
        let count = drained.len();
        for (name, f) in drained {
            self.register(&name, f);
        }
        count
    }

    pub fn get(&self, name: &str) -> Option<HandlerFn> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::PENDING_LOCK;

    fn noop() -> HandlerFn {
        handler(|_inv| async { Ok::<(), crate::error::BotError>(()) })
    }

    #[test]
    fn test_register_and_overwrite() {
        let mut registry = HandlerRegistry::new();
        registry.register("a", noop());
        registry.register("a", noop());
        registry.register("b", noop());
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_pending_handlers_are_adopted_once() {
        let _guard = PENDING_LOCK.lock();

        register_later("registry_test_staged", noop());
        let mut first = HandlerRegistry::new();
        assert!(first.adopt_pending() >= 1);
        assert!(first.contains("registry_test_staged"));
        assert_eq!(pending_count(), 0);

        let mut second = HandlerRegistry::new();
        assert_eq!(second.adopt_pending(), 0);
        assert!(!second.contains("registry_test_staged"));
    }
}
