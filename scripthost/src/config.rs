use std::fmt;
use std::sync::Arc;

pub(crate) type LoadFunction = Arc<dyn Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync>;

/// Per-script host policy: resource limits and the library loader.
///
/// The memory limit is enforced by the runtime's allocator on every
/// allocation the state makes; exceeding it surfaces as the memory
/// failure kind.
#[derive(Clone, Default)]
pub struct Configuration {
    pub(crate) memory_limit: Option<usize>,
    pub(crate) load: Option<LoadFunction>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the total number of bytes the script runtime may allocate.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Supply the loader consulted by the script-visible `require`.
    ///
    /// The loader maps a trimmed, non-empty library name to a buffer of
    /// source or precompiled bytecode.
    pub fn with_load_function<F>(mut self, load: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.load = Some(Arc::new(load));
        self
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("memory_limit", &self.memory_limit)
            .field("load", &self.load.as_ref().map(|_| ".."))
            .finish()
    }
}
