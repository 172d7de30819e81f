//! Caller-facing data model: nodes, links, groups, constraint descriptors and
//! the layout option set. Descriptor types deserialize leniently: absent keys
//! take defaults and unknown keys are ignored.

use selkie_vpsc::Rectangle;
use serde::{Deserialize, Serialize};

/// A laid-out node. The engine reads and writes `x`/`y` in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Fixed nodes keep their position; free variables are pulled toward them.
    pub fixed: bool,
    /// Pinned drag position, honoured while `fixed` is set.
    pub px: Option<f64>,
    pub py: Option<f64>,
}

impl Node {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn with_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn width_or(&self, default_size: f64) -> f64 {
        self.width.unwrap_or(default_size)
    }

    pub fn height_or(&self, default_size: f64) -> f64 {
        self.height.unwrap_or(default_size)
    }

    /// Bounding box centred on the node's current position.
    pub fn bounds(&self, default_size: f64) -> Rectangle {
        let w = self.width_or(default_size) / 2.0;
        let h = self.height_or(default_size) / 2.0;
        Rectangle::new(self.x - w, self.x + w, self.y - h, self.y + h)
    }
}

/// An edge between two node indices, with an optional ideal-length override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    #[serde(default)]
    pub length: Option<f64>,
}

impl Link {
    pub fn new(source: usize, target: usize) -> Self {
        Self {
            source,
            target,
            length: None,
        }
    }
}

/// Hierarchical grouping descriptor: leaf node indices plus child group
/// indices into the same group list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSpec {
    pub leaves: Vec<usize>,
    pub groups: Vec<usize>,
    pub padding: f64,
}

impl Default for GroupSpec {
    fn default() -> Self {
        Self {
            leaves: Vec::new(),
            groups: Vec::new(),
            padding: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentOffset {
    pub node: usize,
    #[serde(default)]
    pub offset: f64,
}

/// User-declared geometric constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConstraintSpec {
    /// `left + gap <= right` on the given axis (exact when `equality`).
    Separation {
        axis: Axis,
        left: usize,
        right: usize,
        gap: f64,
        #[serde(default)]
        equality: bool,
    },
    /// Pin each listed node to a shared guideline, at its own offset.
    Alignment {
        axis: Axis,
        offsets: Vec<AlignmentOffset>,
    },
}

/// Directed-flow configuration: every edge bridging distinct strongly
/// connected components gets a separation constraint on this axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FlowSpec {
    pub axis: Axis,
    #[serde(default = "default_min_separation")]
    pub min_separation: f64,
}

fn default_min_separation() -> f64 {
    0.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    /// Relative stress-delta threshold below which a tick reports convergence.
    pub convergence_threshold: f64,
    pub avoid_overlaps: bool,
    /// Pack disconnected components after the initial layout phases.
    pub handle_disconnected: bool,
    /// Ideal length for links without a per-link override.
    pub link_distance: f64,
    /// Width and height assumed for nodes that carry no size.
    pub default_node_size: f64,
    /// Canvas size, used for centering packed components.
    pub size: [f64; 2],
    pub flow_layout: Option<FlowSpec>,
    pub initial_unconstrained_iterations: usize,
    pub initial_user_constraint_iterations: usize,
    pub initial_all_constraints_iterations: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            convergence_threshold: 0.01,
            avoid_overlaps: false,
            handle_disconnected: true,
            link_distance: 20.0,
            default_node_size: 10.0,
            size: [1.0, 1.0],
            flow_layout: None,
            initial_unconstrained_iterations: 0,
            initial_user_constraint_iterations: 0,
            initial_all_constraints_iterations: 0,
        }
    }
}
