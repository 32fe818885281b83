//! HTTP surface: `/`, `/health` and `/predict`.

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{router, AppState, PredictResponse};
