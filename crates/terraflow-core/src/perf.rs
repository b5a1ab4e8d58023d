//! Perf sampler - per-tick cost counters and the push feed
//!
//! The engine wraps every tick and emits one [`PerfSample`] to each
//! registered [`PerfSink`]. GPU timings are whatever the render layer
//! last reported via `submit_gpu_timings`; the sampler never blocks a
//! tick waiting for a query, so those fields are `None` until (and
//! unless) timings arrive.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Timings the render layer reports back for a finished frame
#[derive(Clone, Debug, Default)]
pub struct GpuTimings {
    pub gpu_ms: f32,
    /// Named GPU pass timings in milliseconds
    pub passes: Vec<(String, f32)>,
    pub dispatches: u32,
    pub draws: u32,
}

/// One tick's worth of telemetry. Read-only; consumers keep at most a
/// bounded rolling window of these.
#[derive(Clone, Debug)]
pub struct PerfSample {
    pub frame: u64,
    pub cpu_ms: f32,
    /// `None` when GPU timing is unavailable
    pub gpu_ms: Option<f32>,
    pub passes: Vec<(String, f32)>,
    pub dispatches: u32,
    pub draws: u32,
    /// Estimated resident grid memory in bytes
    pub grid_bytes: usize,
}

/// Push-style observer for per-tick samples
pub trait PerfSink {
    fn on_sample(&mut self, sample: &PerfSample);
}

/// A no-op sink for when telemetry is not wired up
#[derive(Default)]
pub struct NoopSink;

impl PerfSink for NoopSink {
    fn on_sample(&mut self, _sample: &PerfSample) {}
}

/// Bounded rolling window of recent samples
pub struct PerfHistory {
    window: VecDeque<PerfSample>,
    capacity: usize,
}

impl PerfHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: PerfSample) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    pub fn latest(&self) -> Option<&PerfSample> {
        self.window.back()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn mean_cpu_ms(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().map(|s| s.cpu_ms).sum::<f32>() / self.window.len() as f32
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerfSample> {
        self.window.iter()
    }
}

impl PerfSink for PerfHistory {
    fn on_sample(&mut self, sample: &PerfSample) {
        self.push(sample.clone());
    }
}

/// Clonable history handle: one clone registers as an engine sink, the
/// other stays with the consumer reading summaries.
#[derive(Clone)]
pub struct SharedPerfHistory {
    inner: Arc<Mutex<PerfHistory>>,
}

impl SharedPerfHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PerfHistory::new(capacity))),
        }
    }

    pub fn latest(&self) -> Option<PerfSample> {
        self.lock().latest().cloned()
    }

    pub fn mean_cpu_ms(&self) -> f32 {
        self.lock().mean_cpu_ms()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PerfHistory> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PerfSink for SharedPerfHistory {
    fn on_sample(&mut self, sample: &PerfSample) {
        self.lock().push(sample.clone());
    }
}
