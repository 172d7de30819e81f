#![forbid(unsafe_code)]

//! One-dimensional separation-constraint solving (VPSC) and rectangle overlap
//! machinery.
//!
//! `selkie-vpsc` is the substrate crate of the `selkie` layout engine: an
//! active-set solver that places variables at minimum weighted squared
//! displacement from their desired positions subject to `left + gap <= right`
//! constraints, plus the sweep-line generators that turn rectangle overlap and
//! group containment into such constraints.

pub mod rectangle;
pub mod solver;

pub use rectangle::{
    EdgeGeometry, Group, Point, Rectangle, compute_group_bounds, generate_x_constraints,
    generate_x_group_constraints, generate_y_constraints, generate_y_group_constraints,
    make_edge_between, make_edge_to, remove_overlaps,
};
pub use solver::{Constraint, Solver, Variable};
