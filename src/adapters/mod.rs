//! Adapters layer: Concrete implementations of ports.
//!
//! - `linear`, `forest`: classifier families read from the bundle
//! - `scaler`, `label_encoder`: fitted preprocessing steps
//! - `bundle`: on-disk artifact loading and signature verification
//! - `sanitize`: PII filtering for logs

pub mod bundle;
pub mod forest;
pub mod label_encoder;
pub mod linear;
pub mod sanitize;
pub mod scaler;

pub use bundle::integrity::{BundleManifest, BundleVerifier};
pub use bundle::{BundleError, BundleLoader};
