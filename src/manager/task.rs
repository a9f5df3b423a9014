// src/manager/task.rs
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use ahash::AHashMap;
use log::debug;

use super::AlgorithmId;

/// What a recompute task covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskScope {
    /// Every registered algorithm.
    Global,
    /// A single algorithm.
    Algorithm(AlgorithmId),
}

/// Handle to a background recompute.
///
/// Cancelling only suppresses delivery of the result; the computation itself
/// is free to run to completion.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    scope: TaskScope,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    fn new(id: u64, scope: TaskScope) -> Self {
        Self {
            id,
            scope,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn scope(&self) -> TaskScope {
        self.scope
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// In-flight recomputes: at most one global task plus at most one task per
/// algorithm. Every `begin_*` cancels whatever it replaces.
#[derive(Debug, Default)]
pub struct TaskTable {
    next_id: u64,
    global: Option<TaskHandle>,
    per_algorithm: AHashMap<AlgorithmId, TaskHandle>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&mut self, scope: TaskScope) -> TaskHandle {
        self.next_id += 1;
        TaskHandle::new(self.next_id, scope)
    }

    /// Cancels everything in flight and registers a new global task.
    pub fn begin_global(&mut self) -> TaskHandle {
        self.cancel_all();
        let handle = self.next_handle(TaskScope::Global);
        self.global = Some(handle.clone());
        handle
    }

    /// Registers a new task for `algorithm`, cancelling its predecessor.
    /// Returns `None` while a global task is in flight.
    pub fn begin_algorithm(&mut self, algorithm: AlgorithmId) -> Option<TaskHandle> {
        if self.global.is_some() {
            return None;
        }
        if let Some(previous) = self.per_algorithm.remove(&algorithm) {
            debug!("Cancelling task {} for algorithm {}", previous.id, algorithm);
            previous.cancel();
        }
        let handle = self.next_handle(TaskScope::Algorithm(algorithm));
        self.per_algorithm.insert(algorithm, handle.clone());
        Some(handle)
    }

    pub fn cancel_algorithm(&mut self, algorithm: AlgorithmId) -> bool {
        match self.per_algorithm.remove(&algorithm) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns the number of tasks cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for (_, handle) in self.per_algorithm.drain() {
            handle.cancel();
            cancelled += 1;
        }
        if let Some(handle) = self.global.take() {
            handle.cancel();
            cancelled += 1;
        }
        if cancelled > 0 {
            debug!("Cancelled {} in-flight tasks", cancelled);
        }
        cancelled
    }

    /// Retires `handle` once its work is done. Returns `true` only when the
    /// task was neither cancelled nor superseded, i.e. its result may be
    /// delivered.
    pub fn finish(&mut self, handle: &TaskHandle) -> bool {
        if handle.is_cancelled() {
            return false;
        }
        match handle.scope {
            TaskScope::Global => {
                if self.global.as_ref().map(|g| g.id) == Some(handle.id) {
                    self.global = None;
                    true
                } else {
                    false
                }
            }
            TaskScope::Algorithm(algorithm) => {
                if self.per_algorithm.get(&algorithm).map(|t| t.id) == Some(handle.id) {
                    self.per_algorithm.remove(&algorithm);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn global_in_flight(&self) -> bool {
        self.global.is_some()
    }

    pub fn in_flight(&self) -> usize {
        self.per_algorithm.len() + usize::from(self.global.is_some())
    }
}
