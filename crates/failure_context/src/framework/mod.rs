//! Framework plugins.
//!
//! A [`Framework`] is detected passively: it only reports itself present when the host has
//! declared it through [`announce_loaded`]. Detected frameworks are asked once per failure to
//! extract a [`FrameworkContext`] from the full frame chain.

mod array;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock};

use tracing::debug;

use crate::model::SourceCodeBundle;

pub use array::{
    detect_transformation, extract_array_metadata, extract_key_metadata, ArrayFrameContext,
    ArrayFramework, ArrayFrameworkContext, ArrayMetadata, FrameworkProfile, KeyKind, KeyMetadata,
    TransformationType,
};

/// Per-failure output of one framework plugin.
///
/// Frame indices refer to the full, unpartitioned frame chain.
pub trait FrameworkContext: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Text fragment for the frame at `index`, or `None` when nothing relevant was found there.
    fn frame_context_string(&self, index: usize) -> Option<String>;
}

pub trait Framework: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the framework is active in this process. Must not load or initialize anything.
    fn detect(&self) -> bool;

    /// Must not mutate `bundles`. Returns `None` when no frame carries relevant metadata.
    fn extract_context(&self, bundles: &[SourceCodeBundle]) -> Option<Box<dyn FrameworkContext>>;
}

/// Ordered set of known framework plugins.
#[derive(Default)]
pub struct FrameworkRegistry {
    frameworks: Vec<Box<dyn Framework>>,
}

impl FrameworkRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_framework(mut self, framework: impl Framework + 'static) -> Self {
        self.register(framework);
        self
    }

    pub fn register(&mut self, framework: impl Framework + 'static) {
        self.frameworks.push(Box::new(framework));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frameworks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }

    /// Names of registered frameworks that currently report themselves present.
    #[must_use]
    pub fn detected(&self) -> Vec<&str> {
        self.frameworks
            .iter()
            .filter(|framework| framework.detect())
            .map(|framework| framework.name())
            .collect()
    }

    /// Runs every detected plugin once over `bundles`, keeping non-empty results in
    /// registration order.
    #[must_use]
    pub fn extract_all(&self, bundles: &[SourceCodeBundle]) -> Vec<Box<dyn FrameworkContext>> {
        let mut contexts = Vec::new();
        for framework in &self.frameworks {
            if !framework.detect() {
                continue;
            }
            match framework.extract_context(bundles) {
                Some(context) => {
                    debug!(framework = framework.name(), "framework context extracted");
                    contexts.push(context);
                }
                None => debug!(framework = framework.name(), "framework found nothing relevant"),
            }
        }
        contexts
    }
}

impl fmt::Debug for FrameworkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.frameworks.iter().map(|framework| framework.name()))
            .finish()
    }
}

fn loaded_frameworks() -> &'static Mutex<BTreeMap<String, String>> {
    static LOADED: OnceLock<Mutex<BTreeMap<String, String>>> = OnceLock::new();
    LOADED.get_or_init(|| Mutex::new(BTreeMap::new()))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Declares that `name` is linked and active in this process, at `version`.
///
/// Hosts call this at start-up for each framework they use; later calls replace the version.
pub fn announce_loaded(name: impl Into<String>, version: impl Into<String>) {
    lock_unpoisoned(loaded_frameworks()).insert(name.into(), version.into());
}

/// Reverses [`announce_loaded`].
pub fn withdraw(name: &str) {
    lock_unpoisoned(loaded_frameworks()).remove(name);
}

#[must_use]
pub fn is_loaded(name: &str) -> bool {
    lock_unpoisoned(loaded_frameworks()).contains_key(name)
}

#[must_use]
pub fn loaded_version(name: &str) -> Option<String> {
    lock_unpoisoned(loaded_frameworks()).get(name).cloned()
}
