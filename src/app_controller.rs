use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::backend::{BackendClient, ModelVariant, SystemStatus, TranslateRequest, TranslateResponse};
use crate::endpoint::Endpoints;
use crate::errors::{AppError, SessionError};
use crate::language_utils;
use crate::session::{SessionClient, SessionEvent, SessionPhase, SessionSnapshot};
use crate::transport::{Connector, WebSocketConnector};

// @module: Application controller for the command-line client

/// Main application controller for translation requests
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Endpoints resolved from the configuration
    endpoints: Endpoints,
    // @field: HTTP client for status, fallback translation and model switching
    backend: BackendClient,
    // @field: Opens the streaming connections
    connector: Arc<dyn Connector>,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Self::with_connector(config, Arc::new(WebSocketConnector::new()))
    }

    /// Create a controller that streams through a custom connector
    pub fn with_connector(config: Config, connector: Arc<dyn Connector>) -> Result<Self> {
        let endpoints = config.endpoints()?;
        debug!("Resolved endpoints: {}", endpoints);
        let backend = BackendClient::new(endpoints.clone(), config.request_timeout());

        Ok(Self {
            config,
            endpoints,
            backend,
            connector,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Stream a translation of `text`, writing chunks to `out` as they arrive
    ///
    /// Ctrl-C cancels the session; the partial text is kept in the returned snapshot.
    pub async fn translate_streaming<W: Write>(
        &self,
        text: &str,
        out: &mut W,
    ) -> Result<SessionSnapshot, AppError> {
        self.warn_if_same_language();

        let client = SessionClient::new(self.endpoints.clone(), Arc::clone(&self.connector));
        let mut updates = client.subscribe();

        let start_time = Instant::now();
        let id = client.start(
            text,
            &self.config.source_language,
            &self.config.target_language,
            self.config.model,
        )?;

        let spinner = Self::connecting_spinner(&self.endpoints);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;
        let mut wrote_text = false;

        let snapshot = loop {
            let update = tokio::select! {
                update = updates.recv() => update,
                _ = &mut ctrl_c, if !interrupted => {
                    warn!("Interrupted, cancelling translation");
                    interrupted = true;
                    client.cancel();
                    continue;
                }
            };

            let Some(update) = update else {
                break client.snapshot();
            };
            if update.snapshot.session_id != id {
                continue;
            }

            match &update.event {
                SessionEvent::Streaming => spinner.finish_and_clear(),
                SessionEvent::Chunk(chunk) => {
                    write!(out, "{}", chunk)?;
                    out.flush()?;
                    wrote_text = true;
                }
                _ => {}
            }

            if update.event.ends_session() {
                break update.snapshot;
            }
        };

        spinner.finish_and_clear();
        if wrote_text {
            writeln!(out)?;
        }

        if !snapshot.phase.is_terminal() {
            if interrupted {
                warn!("Translation cancelled after {} chars", snapshot.text.chars().count());
                return Ok(snapshot);
            }
            return Err(AppError::Translation(
                "Connection closed before the translation completed".to_string(),
            ));
        }

        if let SessionPhase::Failed(failure) = &snapshot.phase {
            return Err(AppError::Translation(failure.message.clone()));
        }

        info!(
            "Translated {} chars in {}",
            snapshot.text.chars().count(),
            Self::format_duration(start_time.elapsed())
        );
        Ok(snapshot)
    }

    /// Translate `text` in one request without streaming
    pub async fn translate_once(&self, text: &str) -> Result<TranslateResponse, AppError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput.into());
        }
        self.warn_if_same_language();

        let request = TranslateRequest::text(
            text,
            &self.config.source_language,
            &self.config.target_language,
        )
        .model(self.config.model);

        self.send_translation(&request).await
    }

    /// Translate the text shown in an image file in one request
    pub async fn translate_image(&self, path: &Path) -> Result<TranslateResponse, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::File(format!("Failed to read image {}: {}", path.display(), e)))?;
        if bytes.is_empty() {
            return Err(SessionError::EmptyInput.into());
        }
        debug!("Sending image {} ({} bytes)", path.display(), bytes.len());

        let request = TranslateRequest::image(
            BASE64.encode(&bytes),
            &self.config.source_language,
            &self.config.target_language,
        )
        .model(self.config.model);

        self.send_translation(&request).await
    }

    async fn send_translation(&self, request: &TranslateRequest) -> Result<TranslateResponse, AppError> {
        let response = self.backend.translate(request).await?;
        if let Some(seconds) = response.time_taken {
            info!(
                "Translated with {} in {}",
                response.model_used,
                Self::format_duration(Duration::from_secs_f64(seconds.max(0.0)))
            );
        }
        Ok(response)
    }

    /// Backend readiness, or `None` when the backend could not be queried
    pub async fn status(&self) -> Option<SystemStatus> {
        self.backend.probe_status().await
    }

    /// Greeting of the backend root endpoint
    pub async fn ping(&self) -> Result<String, AppError> {
        Ok(self.backend.ping().await?)
    }

    /// Ask the backend to load another model variant
    pub async fn switch_model(&self, model: ModelVariant) -> Result<(), AppError> {
        info!("Switching backend model to {} ({})", model, model.model_id());
        Ok(self.backend.switch_model(model).await?)
    }

    fn warn_if_same_language(&self) {
        if language_utils::language_codes_match(&self.config.source_language, &self.config.target_language) {
            warn!(
                "Source and target language are both '{}'",
                self.config.target_language
            );
        }
    }

    fn connecting_spinner(endpoints: &Endpoints) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(format!("Connecting to {}", endpoints.stream_base()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
