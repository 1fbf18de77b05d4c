//! hotel-inference: scoring hotel bookings with an XGBoost tree ensemble.
//!
//! At startup the service fetches a trained model bundle, unpacks it and
//! converts the XGBoost model inside (JSON, UBJSON or legacy binary) into a
//! native forest. Each request then carries one booking, which is encoded
//! into a fixed 17-feature vector and scored by the forest.
//!
//! # Key Types
//!
//! - [`model::BoosterModel`] - the loaded model
//! - [`features::BookingRecord`] / [`features::FeatureVector`] - request and model input
//! - [`service::PredictionService`] - booking in, score out
//! - [`artifact::ArtifactStore`] - where bundles come from
//!
//! # Loading
//!
//! ```ignore
//! use hotel_inference::artifact::{load_model, ArtifactLocation, LocalArtifactStore, MaterializeOptions};
//!
//! let store = LocalArtifactStore::new("./artifacts");
//! let location = ArtifactLocation::new("sprint4-5", "model.tar.gz");
//! let model = load_model(&store, &location, "./staging".as_ref(), &MaterializeOptions::new("./staging/model")).await?;
//! ```

pub mod artifact;
pub mod compat;
pub mod config;
pub mod encoding;
pub mod error;
pub mod features;
pub mod forest;
pub mod model;
pub mod objective;
pub mod server;
pub mod service;
pub mod testing;
pub mod trees;

pub use error::{Error, Result};
