//! tests/common/mod.rs
use std::sync::{Arc, Mutex, Once};

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "expiry_timer=trace".to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// An append-only log that callbacks write into.
#[derive(Clone, Default)]
pub struct FireLog(Arc<Mutex<Vec<u64>>>);

impl FireLog {
    pub fn recorder(&self, value: u64) -> impl FnOnce() + Send + 'static {
        let log = self.0.clone();
        move || log.lock().unwrap().push(value)
    }

    pub fn entries(&self) -> Vec<u64> {
        self.0.lock().unwrap().clone()
    }
}
