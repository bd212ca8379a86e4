//! Model gateway: owns the model/tokenizer pair and runs generation.
//!
//! The pair is built lazily by the configured [`ModelLoader`] the first time
//! a request needs it, at most once per process. The load runs as its own
//! blocking task: a caller that goes away mid-load leaves the task running,
//! and the next caller waits on that same task. A failed load leaves the
//! gateway empty so the next request tries again. Generation is synchronous
//! and runs on the blocking thread pool.

use std::ops::ControlFlow;
use std::sync::Arc;

use chatbot_engine::{
    DecodingState, GenerationConfig, LoadedModel, ModelError, ModelLoader, Result, TokenId,
};
use chatbot_runtime::{GenerationTimer, LogTelemetry, ReplyMode, TelemetryHook};
use tokio::sync::{mpsc, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Chunks buffered between the generation thread and the response stream.
pub const STREAM_CHANNEL_CAPACITY: usize = 32;

/// One item of a streamed reply: a text chunk, or the error that ended it.
pub type ChunkResult = Result<String>;

pub struct ModelGateway {
    model_id: String,
    loader: Arc<dyn ModelLoader>,
    loaded: OnceCell<LoadedModel>,
    pending_load: Mutex<Option<JoinHandle<Result<LoadedModel>>>>,
    max_length: usize,
    telemetry: Arc<dyn TelemetryHook>,
}

impl ModelGateway {
    pub fn new(
        model_id: impl Into<String>,
        loader: Arc<dyn ModelLoader>,
        max_length: usize,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            loader,
            loaded: OnceCell::new(),
            pending_load: Mutex::new(None),
            max_length,
            telemetry: Arc::new(LogTelemetry::new()),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryHook>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Load the model pair unless it is already loaded.
    ///
    /// Concurrent callers wait for a single load instead of racing.
    pub async fn ensure_loaded(&self) -> Result<&LoadedModel> {
        if let Some(loaded) = self.loaded.get() {
            return Ok(loaded);
        }

        let mut pending = self.pending_load.lock().await;
        if let Some(loaded) = self.loaded.get() {
            return Ok(loaded);
        }

        let task = pending.get_or_insert_with(|| {
            tracing::info!(model = %self.model_id, "loading model");
            let loader = Arc::clone(&self.loader);
            let model_id = self.model_id.clone();
            tokio::task::spawn_blocking(move || loader.load(&model_id))
        });
        // The handle stays in `pending` until it resolves, so a dropped
        // caller hands the running load to the next one.
        let outcome = task.await;
        *pending = None;

        let loaded = outcome
            .map_err(|e| ModelError::ModelLoad(format!("loader task failed: {e}")))??;
        tracing::info!(model = %self.model_id, "model loaded");
        Ok(self.loaded.get_or_init(|| async { loaded }).await)
    }

    /// Load at startup. Failure is logged; requests will retry the load.
    pub async fn preload(&self) {
        if let Err(err) = self.ensure_loaded().await {
            tracing::error!(model = %self.model_id, error = %err, "model preload failed");
        }
    }

    /// Generate a complete reply to `prompt` given the joined history.
    pub async fn generate(
        &self,
        history_text: String,
        prompt: String,
        cancel: CancellationToken,
    ) -> Result<String> {
        let loaded = self.ensure_loaded().await?.clone();
        let config = GenerationConfig::blocking(self.max_length);
        let telemetry = Arc::clone(&self.telemetry);

        tokio::task::spawn_blocking(move || {
            generate_blocking(&loaded, &history_text, &prompt, &config, &cancel, telemetry)
        })
        .await
        .map_err(|e| ModelError::Generation(format!("generation task failed: {e}")))?
    }

    /// Start generating a reply on a background thread, returning the
    /// receiving end of the chunk channel.
    ///
    /// The channel closes when generation ends. A failure other than
    /// cancellation is delivered as a final `Err` item.
    pub async fn generate_streaming(
        &self,
        history_text: String,
        prompt: String,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<ChunkResult>> {
        let loaded = self.ensure_loaded().await?.clone();
        let config = GenerationConfig::streaming(self.max_length);
        let telemetry = Arc::clone(&self.telemetry);
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        tokio::task::spawn_blocking(move || {
            let outcome = generate_streaming(
                &loaded,
                &history_text,
                &prompt,
                &config,
                &cancel,
                telemetry,
                &tx,
            );
            match outcome {
                Ok(()) => {}
                Err(ModelError::Cancelled) => {
                    tracing::debug!("streaming generation cancelled");
                }
                Err(err) => {
                    tracing::error!(error = %err, "streaming generation failed");
                    let _ = tx.blocking_send(Err(err));
                }
            }
        });

        Ok(rx)
    }
}

fn generate_blocking(
    loaded: &LoadedModel,
    history_text: &str,
    prompt: &str,
    config: &GenerationConfig,
    cancel: &CancellationToken,
    telemetry: Arc<dyn TelemetryHook>,
) -> Result<String> {
    let input = loaded.tokenizer.encode_pair(history_text, prompt)?;
    let mut timer = GenerationTimer::start(ReplyMode::Blocking, input.len(), telemetry);

    let output = loaded.model.generate(&input, config, &mut |_: TokenId| {
        timer.record_token();
        if cancel.is_cancelled() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    timer.finish();

    if cancel.is_cancelled() {
        return Err(ModelError::Cancelled);
    }
    let reply = loaded.tokenizer.decode(&output, true)?;
    Ok(reply.trim().to_string())
}

fn generate_streaming(
    loaded: &LoadedModel,
    history_text: &str,
    prompt: &str,
    config: &GenerationConfig,
    cancel: &CancellationToken,
    telemetry: Arc<dyn TelemetryHook>,
    tx: &mpsc::Sender<ChunkResult>,
) -> Result<()> {
    let input = loaded.tokenizer.encode_pair(history_text, prompt)?;
    let mut timer = GenerationTimer::start(ReplyMode::Streaming, input.len(), telemetry);
    let mut state = DecodingState::new();
    let mut decode_error = None;

    loaded.model.generate(&input, config, &mut |token: TokenId| {
        timer.record_token();
        if cancel.is_cancelled() {
            return ControlFlow::Break(());
        }
        match loaded.tokenizer.decode_token(token, &mut state) {
            Ok(chunk) if chunk.is_empty() => ControlFlow::Continue(()),
            // A closed channel means the response stream is gone.
            Ok(chunk) => match tx.blocking_send(Ok(chunk)) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            },
            Err(err) => {
                decode_error = Some(err);
                ControlFlow::Break(())
            }
        }
    })?;
    timer.finish();

    if let Some(err) = decode_error {
        return Err(err);
    }
    if cancel.is_cancelled() || tx.is_closed() {
        return Err(ModelError::Cancelled);
    }
    Ok(())
}
