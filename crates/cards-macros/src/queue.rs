/*
 * queue.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Deferred macro generation.
//!
//! The synchronous directive pass cannot await document or attachment
//! lookups. Instead, each directive leaves a placeholder in the output and
//! registers a [`Producer`] for it here. Once the pass is complete the queue
//! is drained exactly once: every producer runs (concurrently, in no
//! particular order) and the results are keyed by placeholder key.

use std::collections::HashMap;
use std::fmt;

use futures::future::{BoxFuture, try_join_all};

use crate::error::MacroResult;

/// Asynchronous computation of a placeholder's final text.
pub type Producer = BoxFuture<'static, MacroResult<String>>;

/// Append-only collection of `(key, producer)` pairs.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Vec<(String, Producer)>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the producer for placeholder `key`.
    pub fn push(&mut self, key: impl Into<String>, producer: Producer) {
        self.tasks.push((key.into(), producer));
    }

    /// Number of registered producers.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no producer has been registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every producer and collect the results by key.
    ///
    /// The first producer to fail aborts the drain; the remaining producers
    /// are dropped without being polled to completion.
    pub async fn drain(self) -> MacroResult<HashMap<String, String>> {
        let count = self.tasks.len();
        let (keys, producers): (Vec<String>, Vec<Producer>) = self.tasks.into_iter().unzip();

        let results = try_join_all(producers).await?;
        tracing::debug!(count, "Drained macro task queue");

        Ok(keys.into_iter().zip(results).collect())
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.tasks.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("TaskQueue").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MacroError;

    #[test]
    fn test_empty_queue_drains_to_empty_map() {
        let queue = TaskQueue::new();
        assert!(queue.is_empty());
        let results = pollster::block_on(queue.drain()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_are_keyed() {
        let mut queue = TaskQueue::new();
        queue.push("macro-1", Box::pin(async { Ok::<_, MacroError>("one".to_string()) }));
        queue.push("macro-2", Box::pin(async { Ok::<_, MacroError>("two".to_string()) }));
        assert_eq!(queue.len(), 2);

        let results = pollster::block_on(queue.drain()).unwrap();
        assert_eq!(results["macro-1"], "one");
        assert_eq!(results["macro-2"], "two");
    }

    #[tokio::test]
    async fn test_failure_aborts_drain() {
        let mut queue = TaskQueue::new();
        queue.push("ok", Box::pin(async { Ok::<_, MacroError>("fine".to_string()) }));
        queue.push("bad", Box::pin(async { Err::<String, _>(MacroError::semantic("gone")) }));

        let err = queue.drain().await.unwrap_err();
        assert_eq!(err.to_string(), "gone");
    }

    #[test]
    fn test_debug_lists_keys() {
        let mut queue = TaskQueue::new();
        queue.push("macro-7", Box::pin(async { Ok::<_, MacroError>(String::new()) }));
        assert_eq!(format!("{:?}", queue), "TaskQueue { keys: [\"macro-7\"] }");
    }
}
