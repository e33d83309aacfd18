//! Reverse-mode automatic differentiation on an explicit graph of `+` and `*`.
//!
//! Gradients are graph nodes too, so differentiating a gradient gives the
//! next order derivative.
//!
//! ```
//! use hypograd::Graph;
//!
//! let graph = Graph::new();
//! let x = graph.var(3.);
//! let y = graph.var(4.);
//! let z = x * x * y;
//! assert_eq!(z.value(), 36.);
//!
//! let grads = z.backward().unwrap();
//! let dx = grads.wrt(&x).unwrap();
//! assert_eq!(dx.value(), 24.);
//!
//! let dxy = dx.backward().unwrap().wrt(&y).unwrap();
//! assert_eq!(dxy.value(), 6.);
//! ```

mod backward;
mod dot;
pub mod error;
mod finite_diff;
pub mod graph;
mod operation;

pub use backward::Gradients;
pub use dot::DotBuilder;
pub use error::{GraphError, Result};
pub use finite_diff::{finite_diff_grad, max_grad_error};
pub use graph::{Graph, GraphConfig, Node, NodeId};
/// Only `+` and `*` expand to nodes:
///
/// ```compile_fail
/// let graph = hypograd::Graph::new();
/// hypograd::hypograd!(graph, {
///     let x = 2.;
///     let f = x - x;
/// });
/// ```
///
/// ```compile_fail
/// fn sin(x: f64) -> f64 { x.sin() }
/// let graph = hypograd::Graph::new();
/// hypograd::hypograd!(graph, {
///     let x = 2.;
///     let f = sin(x);
/// });
/// ```
#[cfg(feature = "macro")]
pub use hypograd_macro::hypograd;
pub use operation::Operation;
