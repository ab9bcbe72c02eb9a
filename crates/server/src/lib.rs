//! SharkID Server - HTTP API for photo identification of individual animals
//!
//! Wraps a [`sharkid::Recognizer`] behind a small JSON API. Image and video
//! endpoints take the raw media as the request body; annotations travel as
//! query parameters.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /detect` - subject and marking-zone boxes, or `null`
//! - `POST /classify` - ranked candidates; optional `subject_x/y/w/h`,
//!   `zone_x/y/w/h` and `orientation` query parameters
//! - `POST /embeddings` - catalog an image under `individual_id`,
//!   `display_name` and `photo_id`
//! - `POST /process-video` - frames with a detected subject, base64 JPEG;
//!   `?classify=true` attaches per-frame candidates
//! - `GET /health` - liveness and catalog size
//! - `GET /metrics` - Prometheus text
//!
//! Errors are JSON `{"error": {"code", "message"}}`: `EMPTY_BODY` and
//! `BAD_REQUEST` (400), `UNREADABLE_IMAGE` (422), `INDEX_ERROR` (500).

pub mod config;
pub mod error;
pub mod telemetry;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
