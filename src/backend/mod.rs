/*!
 * Request/response access to the translation backend.
 *
 * - `models`: wire types for the HTTP API and the stream request frame
 * - `client`: reqwest client for the status probe, the non-streaming
 *   translate fallback and model switching
 */

pub mod client;
pub mod models;

pub use client::BackendClient;
pub use models::{
    ContentType, GpuStatus, ModelLoadState, ModelStatus, ModelVariant, SystemStatus,
    TranslateRequest, TranslateResponse,
};
