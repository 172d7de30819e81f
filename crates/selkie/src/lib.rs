#![forbid(unsafe_code)]

//! Constraint-based graph layout.
//!
//! Positions are found by gradient descent over the stress function, with
//! each step optionally projected onto user separation and alignment
//! constraints and non-overlap constraints by a [quadratic program
//! solver](selkie_vpsc). On top of the core engine sit power-graph group
//! compression, disconnected-component packing and two edge routers (a
//! tangent visibility graph and an orthogonal grid router).
//!
//! [`Layout`] is the usual entry point; the lower layers (`descent`,
//! `projection`, `shortestpaths`) are public for callers that drive the
//! engine directly.

pub mod descent;
pub mod error;
pub mod geom;
pub mod gridrouter;
pub mod layout;
pub mod linklengths;
pub mod model;
pub mod packing;
pub mod powergraph;
pub mod projection;
pub mod shortestpaths;

pub use descent::{Descent, Locks, Project, PseudoRandom};
pub use error::{Error, Result};
pub use gridrouter::{GridNode, GridRouter};
pub use layout::Layout;
pub use model::{
    AlignmentOffset, Axis, ConstraintSpec, FlowSpec, GroupSpec, LayoutOptions, Link, Node,
};
pub use powergraph::{Configuration, PowerEdge, PowerGraph, PowerRef, get_groups};
pub use projection::Projection;
pub use selkie_vpsc::{Point, Rectangle};
