//! Exchange configuration.
//!
//! All fields have defaults, so a JSON document only needs the keys it changes:
//!
//! ```
//! use mesh_exchange::config::ExchangeConfig;
//! let cfg = ExchangeConfig::from_json_str(r#"{ "verbosity": 3 }"#).unwrap();
//! assert_eq!(cfg.verbosity, 3);
//! assert_eq!(cfg.default_pane_id, 101);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::exchange_error::ExchangeError;
use crate::store::modules::LsqOptions;
use crate::store::PaneId;

/// Knobs shared by registration, transfer sessions and output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Pane a solver registers its mesh on.
    pub default_pane_id: PaneId,
    /// Overlay engine verbosity.
    pub verbosity: u32,
    /// Least-squares transfer tolerance.
    pub lsq_tolerance: f64,
    /// Least-squares transfer iteration cap.
    pub lsq_max_iterations: u32,
    /// Format tag of persisted overlay artifacts.
    pub overlay_format: String,
    /// Logical module providing the overlay engine.
    pub overlay_module: String,
    /// Logical module providing the mesh reader.
    pub reader_module: String,
    /// Instance name the mesh reader is loaded under.
    pub reader_instance: String,
    /// Logical module providing the window writer.
    pub writer_module: String,
    /// Instance name the window writer is loaded under.
    pub writer_instance: String,
    /// Suffix of the coordinating rank's private working windows.
    pub scratch_window_suffix: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            default_pane_id: 101,
            verbosity: 1,
            lsq_tolerance: 1.0e-6,
            lsq_max_iterations: 100,
            overlay_format: "HDF".to_string(),
            overlay_module: "SurfX".to_string(),
            reader_module: "SimIN".to_string(),
            reader_instance: "IN".to_string(),
            writer_module: "SimOUT".to_string(),
            writer_instance: "Rocout".to_string(),
            scratch_window_suffix: "tmp".to_string(),
        }
    }
}

impl ExchangeConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ExchangeError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExchangeError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Least-squares options carried by this configuration.
    pub fn lsq_options(&self) -> LsqOptions {
        LsqOptions {
            tolerance: self.lsq_tolerance,
            max_iterations: self.lsq_max_iterations,
        }
    }

    /// Reject settings no component can work with.
    pub fn validate(&self) -> Result<(), ExchangeError> {
        if self.default_pane_id <= 0 {
            return Err(ExchangeError::Config(format!(
                "default_pane_id must be positive, got {}",
                self.default_pane_id
            )));
        }
        if self.lsq_tolerance.is_nan() || self.lsq_tolerance <= 0.0 {
            return Err(ExchangeError::Config(format!(
                "lsq_tolerance must be positive, got {}",
                self.lsq_tolerance
            )));
        }
        if self.scratch_window_suffix.is_empty() {
            return Err(ExchangeError::Config(
                "scratch_window_suffix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
