use std::env;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::error::{LibError, Result};

pub const DEFAULT_NODE_WIDTH: f64 = 150.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 150.0;
pub const DEFAULT_MIN_TOP_MARGIN: f64 = 40.0;
pub const DEFAULT_ZOOM_STEP: f64 = 0.1;

/// Pixel geometry and zoom policy for the tree viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportConfig {
    /// Pixel width of one grid cell.
    pub node_width: f64,
    /// Pixel height of one grid cell.
    pub node_height: f64,
    /// Closest a centred node or tree may render to the top edge.
    pub min_top_margin: f64,
    pub zoom_step: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Upper bound for the automatic fit; the user may zoom past it up to `max_scale`.
    pub fit_max_scale: f64,
    /// Share of each viewport axis the fitted tree may occupy.
    pub fit_fraction: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            node_width: DEFAULT_NODE_WIDTH,
            node_height: DEFAULT_NODE_HEIGHT,
            min_top_margin: DEFAULT_MIN_TOP_MARGIN,
            zoom_step: DEFAULT_ZOOM_STEP,
            min_scale: 0.1,
            max_scale: 2.0,
            fit_max_scale: 1.0,
            fit_fraction: 0.9,
        }
    }
}

impl ViewportConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.node_width > 0.0 && self.node_height > 0.0) {
            return Err(LibError::invalid(
                "Node size must be positive",
                anyhow!("node size {}x{}", self.node_width, self.node_height),
            ));
        }
        if !(self.zoom_step > 0.0) {
            return Err(LibError::invalid(
                "Zoom step must be positive",
                anyhow!("zoom step {}", self.zoom_step),
            ));
        }
        if !(self.min_scale > 0.0
            && self.min_scale <= self.fit_max_scale
            && self.fit_max_scale <= self.max_scale)
        {
            return Err(LibError::invalid(
                "Zoom range is inverted",
                anyhow!(
                    "min {} fit {} max {}",
                    self.min_scale,
                    self.fit_max_scale,
                    self.max_scale
                ),
            ));
        }
        if !(self.fit_fraction > 0.0 && self.fit_fraction <= 1.0) {
            return Err(LibError::invalid(
                "Fit fraction must be within (0, 1]",
                anyhow!("fit fraction {}", self.fit_fraction),
            ));
        }
        if self.min_top_margin < 0.0 {
            return Err(LibError::invalid(
                "Top margin cannot be negative",
                anyhow!("top margin {}", self.min_top_margin),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub viewport: ViewportConfig,
}

impl EngineConfig {
    /// Defaults overridden by `KINSHIP_NODE_WIDTH`, `KINSHIP_NODE_HEIGHT`,
    /// `KINSHIP_TOP_MARGIN` and `KINSHIP_ZOOM_STEP`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut viewport = ViewportConfig::default();
        if let Some(value) = parse_var(&lookup, "KINSHIP_NODE_WIDTH")? {
            viewport.node_width = value;
        }
        if let Some(value) = parse_var(&lookup, "KINSHIP_NODE_HEIGHT")? {
            viewport.node_height = value;
        }
        if let Some(value) = parse_var(&lookup, "KINSHIP_TOP_MARGIN")? {
            viewport.min_top_margin = value;
        }
        if let Some(value) = parse_var(&lookup, "KINSHIP_ZOOM_STEP")? {
            viewport.zoom_step = value;
        }
        viewport.validate()?;
        Ok(Self { viewport })
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse::<T>().map(Some).map_err(|_| {
        LibError::invalid_with_code(
            "invalid_config",
            "Configuration value could not be parsed",
            anyhow!("invalid {} '{}'", name, raw),
        )
    })
}
