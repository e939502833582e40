use std::net::SocketAddr;
use std::time::Duration;

use crate::scheduler::PickPolicy;

/// Timing and scheduling knobs for the background worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long the worker sleeps when the queue is empty
    pub idle_backoff: Duration,
    /// Artificial delay added to every sort to emulate an expensive operation
    pub sort_delay: Duration,
    /// Which job the worker picks next
    pub pick_policy: PickPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_backoff: Duration::from_millis(1000),
            sort_delay: Duration::from_millis(5000),
            pick_policy: PickPolicy::Rotate,
        }
    }
}

impl WorkerConfig {
    pub fn with_delays(idle_backoff_ms: u64, sort_delay_ms: u64) -> Self {
        Self {
            idle_backoff: Duration::from_millis(idle_backoff_ms),
            sort_delay: Duration::from_millis(sort_delay_ms),
            ..Default::default()
        }
    }

    pub fn with_pick_policy(mut self, pick_policy: PickPolicy) -> Self {
        self.pick_policy = pick_policy;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub worker: WorkerConfig,
    /// Buffered job events per subscriber before slow subscribers lag
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "0.0.0.0:8080"
                .parse()
                .expect("default listen address is valid"),
            worker: WorkerConfig::default(),
            event_capacity: 1024,
        }
    }
}

impl ServiceConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_worker(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }
}
