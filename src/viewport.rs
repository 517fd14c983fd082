use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::config::ViewportConfig;
use crate::error::{LibError, Result};
use crate::layout::{GridPoint, TreeLayout};
use crate::models::PersonId;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

/// Scale and translation of the rendered tree. Screen = world pixels * scale + position.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    config: ViewportConfig,
    scale: f64,
    position: ScreenPoint,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            scale: config.fit_max_scale,
            position: ScreenPoint::default(),
            config,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn position(&self) -> ScreenPoint {
        self.position
    }

    /// Largest scale within the fit range that keeps the whole canvas inside the fit
    /// fraction of both axes. A tree too large to fit even at the minimum scale gets the
    /// minimum scale.
    pub fn compute_optimal_zoom(&self, layout: &TreeLayout, viewport: ViewportSize) -> f64 {
        let config = &self.config;
        let content_width = layout.canvas_width as f64 * config.node_width;
        let content_height = layout.canvas_height as f64 * config.node_height;
        if content_width <= 0.0 || content_height <= 0.0 {
            return config.fit_max_scale;
        }
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return config.min_scale;
        }

        let by_width = viewport.width * config.fit_fraction / content_width;
        let by_height = viewport.height * config.fit_fraction / content_height;
        by_width
            .min(by_height)
            .clamp(config.min_scale, config.fit_max_scale)
    }

    /// Translation that puts `focus` (or the whole tree when `None`) at the viewport centre,
    /// pushed down when needed so its top edge stays at least `min_top_margin` from the top.
    pub fn center_on(
        &self,
        focus: Option<PersonId>,
        layout: &TreeLayout,
        viewport: ViewportSize,
        scale: f64,
    ) -> Result<ScreenPoint> {
        let config = &self.config;
        let (center, top) = match focus {
            Some(id) => {
                let node = layout.position(id).ok_or_else(|| {
                    LibError::not_found(
                        "Person is not part of the current layout",
                        anyhow!("cannot centre on {}", id),
                    )
                })?;
                let center = node.center();
                (
                    (center.x * config.node_width, center.y * config.node_height),
                    node.row as f64 * config.node_height,
                )
            }
            None => (
                (
                    layout.canvas_width as f64 * config.node_width / 2.0,
                    layout.canvas_height as f64 * config.node_height / 2.0,
                ),
                0.0,
            ),
        };

        let x = viewport.width / 2.0 - center.0 * scale;
        let mut y = viewport.height / 2.0 - center.1 * scale;
        let min_y = config.min_top_margin - top * scale;
        if y < min_y {
            y = min_y;
        }
        Ok(ScreenPoint { x, y })
    }

    /// Recomputes scale and translation for a fresh layout or root.
    pub fn fit(
        &mut self,
        layout: &TreeLayout,
        viewport: ViewportSize,
        focus: Option<PersonId>,
    ) -> Result<()> {
        let scale = self.compute_optimal_zoom(layout, viewport);
        let position = self.center_on(focus, layout, viewport, scale)?;
        self.scale = scale;
        self.position = position;
        Ok(())
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_scale(self.scale + self.config.zoom_step)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_scale(self.scale - self.config.zoom_step)
    }

    /// Clamps to the user zoom range and snaps away float drift from repeated steps.
    pub fn set_scale(&mut self, scale: f64) -> f64 {
        let snapped = (scale * 1000.0).round() / 1000.0;
        self.scale = snapped.clamp(self.config.min_scale, self.config.max_scale);
        self.scale
    }

    /// Unbounded; the user may drag the tree anywhere.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.position.x += dx;
        self.position.y += dy;
    }

    pub fn to_screen(&self, point: GridPoint) -> ScreenPoint {
        ScreenPoint {
            x: point.x * self.config.node_width * self.scale + self.position.x,
            y: point.y * self.config.node_height * self.scale + self.position.y,
        }
    }

    /// Person whose cell contains the given screen point.
    pub fn node_at(&self, layout: &TreeLayout, point: ScreenPoint) -> Option<PersonId> {
        let cell_width = self.config.node_width * self.scale;
        let cell_height = self.config.node_height * self.scale;
        if cell_width <= 0.0 || cell_height <= 0.0 {
            return None;
        }
        let col = ((point.x - self.position.x) / cell_width).floor();
        let row = ((point.y - self.position.y) / cell_height).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        layout
            .nodes
            .iter()
            .find(|node| node.col as f64 == col && node.row as f64 == row)
            .map(|node| node.id)
    }
}
