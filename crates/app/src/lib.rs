//! HTTP front end for batch image matching.
//!
//! `POST /search` takes a multipart form with `indexName`, `topK` and one or
//! more `files` parts, and answers with one JSON entry per file: either the
//! decoded matches or an `{error}` object. `GET /health`, `GET /home` and
//! `GET /debug/env` are operational endpoints.

pub mod cli;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use cli::{Cli, ServerOptions};
pub use error::{ApiError, ApiResult};
pub use server::{build_router, serve};
pub use state::{azure_state, AppState, AzureState, EnvironmentReport};
