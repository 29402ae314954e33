//! Function descriptor and task registry.
//!
//! Rust cannot pickle an arbitrary closure or `eval` source text at
//! runtime the way `dill`/`mpi4py` can, so both descriptor kinds resolve
//! against a process-wide registry keyed by a stable string id (spec §3,
//! §9 — "ship two concrete loaders; no runtime module-name mangling").
//! A task is registered once, at process startup, under a key; the
//! helper binaries resolve that key after deserializing a
//! [`FuncDescriptor`] from the `.pik`/module tempfile.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{EzmapError, Result};

/// Which of the two serialization modes (spec §4.5) produced this
/// descriptor. Both resolve through the same registry; `Source` additionally
/// carries the literal source text for debug/inspection parity with the
/// original module-file behavior — it is never evaluated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FuncDescriptor {
    Blob { key: String },
    Source { key: String, source: String },
}

impl FuncDescriptor {
    pub fn key(&self) -> &str {
        match self {
            FuncDescriptor::Blob { key } | FuncDescriptor::Source { key, .. } => key,
        }
    }
}

/// Type-erased callable: takes a bincode-encoded argument tuple, returns a
/// bincode-encoded result. Concrete tasks are built with [`TaskRegistry::register`]
/// and stored behind this trait so the registry can hold tasks of different
/// argument/result types in one map.
pub trait Task: Send + Sync {
    fn call(&self, input: &[u8]) -> Result<Vec<u8>>;
}

struct TypedTask<F> {
    f: F,
}

impl<A, R, F> Task for TypedTask<F>
where
    A: DeserializeOwned,
    R: Serialize,
    F: Fn(A) -> R + Send + Sync,
{
    fn call(&self, input: &[u8]) -> Result<Vec<u8>> {
        let arg: A = bincode::deserialize(input).map_err(EzmapError::Decode)?;
        let result = (self.f)(arg);
        bincode::serialize(&result).map_err(EzmapError::Encode)
    }
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, Arc<dyn Task>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        TaskRegistry::default()
    }

    pub fn register<A, R, F>(&self, key: impl Into<String>, f: F)
    where
        A: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.tasks
            .write()
            .unwrap()
            .insert(key.into(), Arc::new(TypedTask { f }));
    }

    pub fn resolve(&self, key: &str) -> Result<Arc<dyn Task>> {
        self.tasks
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| EzmapError::UnknownTask { key: key.to_string() })
    }
}

static GLOBAL: OnceLock<TaskRegistry> = OnceLock::new();

/// The process-wide registry every helper binary resolves tasks against.
pub fn global() -> &'static TaskRegistry {
    GLOBAL.get_or_init(TaskRegistry::new)
}

/// Register a task against the global registry under `key`.
#[macro_export]
macro_rules! register_task {
    ($key:expr, $f:expr) => {
        $crate::registry::global().register($key, $f)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_task_round_trips_through_bytes() {
        let registry = TaskRegistry::new();
        registry.register::<u32, u32, _>("square", |x: u32| x * x);
        let task = registry.resolve("square").unwrap();
        let input = bincode::serialize(&7u32).unwrap();
        let output = task.call(&input).unwrap();
        let result: u32 = bincode::deserialize(&output).unwrap();
        assert_eq!(result, 49);
    }

    #[test]
    fn unknown_key_is_an_error() {
        let registry = TaskRegistry::new();
        assert!(matches!(registry.resolve("missing"), Err(EzmapError::UnknownTask { .. })));
    }
}
