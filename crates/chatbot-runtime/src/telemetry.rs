//! Per-reply generation telemetry.
//!
//! A [`GenerationTimer`] wraps one model run. It reports time to first token
//! as soon as that token exists and a [`GenerationMetrics`] summary when the
//! run ends, through whichever [`TelemetryHook`] the gateway was built with.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the reply is delivered to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    Blocking,
    Streaming,
}

impl ReplyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyMode::Blocking => "blocking",
            ReplyMode::Streaming => "streaming",
        }
    }
}

/// Summary of one model run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationMetrics {
    pub mode: ReplyMode,
    /// Encoded history + prompt length.
    pub input_tokens: usize,
    /// Tokens produced, end-of-sequence included.
    pub output_tokens: usize,
    /// Time to first token; `None` when nothing was produced.
    pub first_token_ms: Option<f64>,
    pub elapsed_ms: f64,
    /// Decode rate after the first token.
    pub tokens_per_sec: f64,
}

pub trait TelemetryHook: Send + Sync {
    fn on_first_token(&self, _mode: ReplyMode, _elapsed_ms: f64) {}

    fn on_complete(&self, _metrics: &GenerationMetrics) {}
}

/// Discards everything. Handy in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetryHook for NoopTelemetry {}

/// Emits one `info` event per completed run.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTelemetry;

impl LogTelemetry {
    pub fn new() -> Self {
        Self
    }
}

impl TelemetryHook for LogTelemetry {
    fn on_first_token(&self, mode: ReplyMode, elapsed_ms: f64) {
        tracing::debug!(mode = mode.as_str(), ttft_ms = elapsed_ms, "first token");
    }

    fn on_complete(&self, metrics: &GenerationMetrics) {
        tracing::info!(
            mode = metrics.mode.as_str(),
            input_tokens = metrics.input_tokens,
            output_tokens = metrics.output_tokens,
            ttft_ms = metrics.first_token_ms.unwrap_or_default(),
            tokens_per_sec = metrics.tokens_per_sec,
            elapsed_ms = metrics.elapsed_ms,
            "reply generated"
        );
    }
}

/// Stopwatch for one model run.
pub struct GenerationTimer {
    mode: ReplyMode,
    input_tokens: usize,
    started: Instant,
    first_token: Option<Duration>,
    output_tokens: usize,
    hook: Arc<dyn TelemetryHook>,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl GenerationTimer {
    pub fn start(mode: ReplyMode, input_tokens: usize, hook: Arc<dyn TelemetryHook>) -> Self {
        Self {
            mode,
            input_tokens,
            started: Instant::now(),
            first_token: None,
            output_tokens: 0,
            hook,
        }
    }

    /// Count one produced token.
    pub fn record_token(&mut self) {
        if self.first_token.is_none() {
            let ttft = self.started.elapsed();
            self.first_token = Some(ttft);
            self.hook.on_first_token(self.mode, millis(ttft));
        }
        self.output_tokens += 1;
    }

    pub fn finish(self) -> GenerationMetrics {
        let elapsed = self.started.elapsed();
        let tokens_per_sec = match self.first_token {
            Some(ttft) if self.output_tokens > 1 && elapsed > ttft => {
                (self.output_tokens - 1) as f64 / (elapsed - ttft).as_secs_f64()
            }
            _ => 0.0,
        };

        let metrics = GenerationMetrics {
            mode: self.mode,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            first_token_ms: self.first_token.map(millis),
            elapsed_ms: millis(elapsed),
            tokens_per_sec,
        };
        self.hook.on_complete(&metrics);
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        first_token: Mutex<Vec<ReplyMode>>,
        completed: Mutex<Vec<GenerationMetrics>>,
    }

    impl TelemetryHook for Recorder {
        fn on_first_token(&self, mode: ReplyMode, _elapsed_ms: f64) {
            self.first_token.lock().unwrap().push(mode);
        }

        fn on_complete(&self, metrics: &GenerationMetrics) {
            self.completed.lock().unwrap().push(metrics.clone());
        }
    }

    #[test]
    fn timer_reports_through_hook() {
        let hook = Arc::new(Recorder::default());
        let mut timer = GenerationTimer::start(ReplyMode::Streaming, 5, hook.clone());
        timer.record_token();
        timer.record_token();
        timer.record_token();
        let metrics = timer.finish();

        assert_eq!(metrics.mode, ReplyMode::Streaming);
        assert_eq!(metrics.input_tokens, 5);
        assert_eq!(metrics.output_tokens, 3);
        let ttft = metrics.first_token_ms.unwrap();
        assert!(metrics.elapsed_ms >= ttft);

        assert_eq!(*hook.first_token.lock().unwrap(), vec![ReplyMode::Streaming]);
        assert_eq!(*hook.completed.lock().unwrap(), vec![metrics]);
    }

    #[test]
    fn empty_run_has_no_first_token() {
        let hook = Arc::new(Recorder::default());
        let metrics = GenerationTimer::start(ReplyMode::Blocking, 2, hook.clone()).finish();
        assert_eq!(metrics.first_token_ms, None);
        assert_eq!(metrics.output_tokens, 0);
        assert_eq!(metrics.tokens_per_sec, 0.0);
        assert!(hook.first_token.lock().unwrap().is_empty());
    }

    #[test]
    fn log_hook_accepts_reports() {
        let timer = GenerationTimer::start(ReplyMode::Blocking, 1, Arc::new(LogTelemetry::new()));
        assert_eq!(timer.finish().mode, ReplyMode::Blocking);
    }
}
