use crc32fast::Hasher;
use std::sync::atomic::{AtomicU32, Ordering};

static INSTANCES: AtomicU32 = AtomicU32::new(0);

/// Short hex seed derived from `label` with CRC32
pub fn get_seed(label: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(label.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ids for entities and code blocks.
///
/// Every generator created in a process gets its own seed, so ids stay
/// unique across runtimes; the first generator of a process always gets the
/// same seed, which keeps durable keys of scoped variables stable between
/// runs of the same document.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        let instance = INSTANCES.fetch_add(1, Ordering::Relaxed);
        Self::from_seed(get_seed(&format!("minibind:{}", instance)))
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn entity_id(&mut self) -> String {
        format!("Entity{}", self.new_id())
    }

    pub fn block_id(&mut self) -> String {
        format!("ScriptID{}", self.new_id())
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
