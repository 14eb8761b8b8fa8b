use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Validity flag shared between a view and its in-flight work.
///
/// Checked at the moment a result would be applied; the network call itself
/// is never cancelled.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark dead. Returns true only for the call that flipped the flag.
    pub fn kill(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
