use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Breakpoints set by the user, keyed by command display path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPoints {
    pub befores: BTreeSet<String>,
    pub afters: BTreeSet<String>,
    pub at_end: bool,
}

impl BreakPoints {
    pub fn is_empty(&self) -> bool {
        self.befores.is_empty() && self.afters.is_empty() && !self.at_end
    }
}

/// Registry shared between the executor, its background tasks and the
/// `dbg.break.*` commands
#[derive(Debug, Clone, Default)]
pub struct SharedBreakPoints {
    inner: Arc<RwLock<BreakPoints>>,
}

impl SharedBreakPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_breakpoints(breakpoints: BreakPoints) -> Self {
        Self {
            inner: Arc::new(RwLock::new(breakpoints)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BreakPoints> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BreakPoints> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_before(&self, path: &str) {
        self.write().befores.insert(path.to_string());
    }

    pub fn add_after(&self, path: &str) {
        self.write().afters.insert(path.to_string());
    }

    pub fn set_at_end(&self, enabled: bool) {
        self.write().at_end = enabled;
    }

    pub fn clear(&self) {
        *self.write() = BreakPoints::default();
    }

    pub fn has_before(&self, path: &str) -> bool {
        self.read().befores.contains(path)
    }

    pub fn has_after(&self, path: &str) -> bool {
        self.read().afters.contains(path)
    }

    pub fn at_end(&self) -> bool {
        self.read().at_end
    }

    pub fn snapshot(&self) -> BreakPoints {
        self.read().clone()
    }
}
