//! Plot configuration.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::color::{Color, palette_colors};
use crate::{Result, VizError};

/// Top-level plot configuration (YAML or programmatic).
///
/// Every field has a default, so a YAML file only needs to list overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VizConfig {
    /// Canvas size
    pub figure: FigureConfig,
    /// Font sizes
    pub font: FontConfig,
    /// Tick style
    pub axes: AxesConfig,
    /// Experiment header
    pub experiment: ExperimentConfig,
    /// Fixed colors
    pub colors: ColorsConfig,
    /// Palette used for processes without a color
    pub palette: String,
    /// Per-process color overrides, keyed by process name
    pub process_colors: HashMap<String, Color>,
    /// Stack plot options
    pub stack: StackConfig,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            figure: FigureConfig::default(),
            font: FontConfig::default(),
            axes: AxesConfig::default(),
            experiment: ExperimentConfig::default(),
            colors: ColorsConfig::default(),
            palette: "cms_petroff6".into(),
            process_colors: HashMap::new(),
            stack: StackConfig::default(),
        }
    }
}

impl VizConfig {
    /// Colors of the configured palette.
    pub fn palette_colors(&self) -> Vec<Color> {
        palette_colors(&self.palette)
    }

    /// Load from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        resolve_config(Some(&text))
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self { width: 576.0, height: 432.0 }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub size: f64,
    pub label_size: f64,
    pub tick_size: f64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { size: 10.0, label_size: 12.0, tick_size: 9.5 }
    }
}

/// Tick placement.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    /// `in` or `out`
    pub tick_direction: String,
    /// Mirror x ticks on the top edge
    pub show_top_ticks: bool,
    /// Mirror y ticks on the right edge
    pub show_right_ticks: bool,
    /// Major tick length (pt)
    pub tick_length: f64,
    /// Minor tick length (pt)
    pub minor_tick_length: f64,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            tick_direction: "in".into(),
            show_top_ticks: true,
            show_right_ticks: true,
            tick_length: 6.0,
            minor_tick_length: 3.0,
        }
    }
}

/// Header drawn above the plot, e.g. **CMS** *Private work*, 13.6 TeV.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Bold name; empty disables the header
    pub name: String,
    /// Italic status
    pub status: String,
    /// Centre-of-mass energy, 0 to hide
    pub sqrt_s_tev: f64,
    /// Integrated luminosity, 0 to hide
    pub lumi_fb_inv: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "CMS".into(),
            status: "Private work".into(),
            sqrt_s_tev: 13.6,
            lumi_fb_inv: 0.0,
        }
    }
}

/// Colors not tied to a process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Data markers
    pub data: Color,
    /// Data-driven estimate
    pub estimate: Color,
    /// Stack outlines
    pub outline: Color,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            data: Color::hex("#000000"),
            estimate: Color::hex("#9c9ca1"),
            outline: Color::hex("#333333"),
        }
    }
}

/// Stack plot options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Logarithmic y axis
    pub log_y: bool,
    /// Headroom factor above the highest bin
    pub y_headroom: f64,
    /// Draw the estimate on top of the stack
    pub show_estimate: bool,
    /// Legend label of the estimate
    pub estimate_label: String,
    /// Y axis title
    pub y_label: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            log_y: false,
            y_headroom: 1.4,
            show_estimate: true,
            estimate_label: "QCD (data-driven)".into(),
            y_label: "Events".into(),
        }
    }
}

/// Resolve a [`VizConfig`] from optional YAML text. Missing fields keep
/// their defaults.
pub fn resolve_config(user_yaml: Option<&str>) -> Result<VizConfig> {
    match user_yaml {
        None => Ok(VizConfig::default()),
        Some(yaml) if yaml.trim().is_empty() => Ok(VizConfig::default()),
        Some(yaml) => {
            let config: VizConfig =
                serde_yaml_ng::from_str(yaml).map_err(|e| VizError::Config(e.to_string()))?;
            if config.figure.width <= 0.0 || config.figure.height <= 0.0 {
                return Err(VizError::Config("figure size must be positive".into()));
            }
            if config.stack.y_headroom < 1.0 {
                return Err(VizError::Config("stack.y_headroom must be at least 1".into()));
            }
            Ok(config)
        }
    }
}
