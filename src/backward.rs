//! Reverse-mode propagation of a derivative seed from a root node.
//!
//! Seeds and accumulated gradients are built with the same `+` and `*`
//! nodes as forward values, so every gradient is itself differentiable.

use std::collections::HashMap;

use log::debug;

use crate::{
    error::{GraphError, Result},
    graph::{Graph, Node, NodeId, NodeKind},
};

/// Gradients collected by a backward pass, keyed by node id.
///
/// Only tracked leaves reached from the root have an entry. Any other
/// query through [`Gradients::wrt`] produces a fresh zero leaf.
#[derive(Debug)]
pub struct Gradients<'a> {
    graph: &'a Graph,
    grads: HashMap<NodeId, Node<'a>>,
}

impl<'a> Gradients<'a> {
    fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            grads: HashMap::new(),
        }
    }

    /// Gradient node for `node`, or a new zero-valued leaf if the backward
    /// pass never reached it. Every miss allocates its own zero leaf.
    pub fn wrt(&self, node: &Node<'a>) -> Result<Node<'a>> {
        if !self.graph.contains(node) {
            return Err(GraphError::invalid_operand(format!(
                "node {} belongs to another graph",
                node.id()
            )));
        }
        match self.grads.get(&node.id()) {
            Some(grad) => Ok(*grad),
            None => self.graph.try_leaf(0., false),
        }
    }

    /// Numeric gradient for `node`, 0 if absent. Never allocates.
    pub fn value_wrt(&self, node: &Node<'a>) -> f64 {
        if !self.graph.contains(node) {
            return 0.;
        }
        self.get(node.id()).map_or(0., |grad| grad.value())
    }

    pub fn get(&self, id: NodeId) -> Option<Node<'a>> {
        self.grads.get(&id).copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.grads.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Node<'a>)> + '_ {
        self.grads.iter().map(|(id, grad)| (*id, *grad))
    }

    fn accumulate(&mut self, node: Node<'a>, seed: Node<'a>) -> Result<()> {
        let prev = self.wrt(&node)?;
        let sum = self.graph.add(prev, seed)?;
        self.grads.insert(node.id(), sum);
        Ok(())
    }
}

pub(crate) fn backward<'a>(graph: &'a Graph, root: Node<'a>) -> Result<Gradients<'a>> {
    if !graph.contains(&root) {
        return Err(GraphError::invalid_operand(format!(
            "root {} belongs to another graph",
            root.id()
        )));
    }
    let start = graph.len();
    debug!("backward from {} (value {})", root.id(), root.value());

    let mut grads = Gradients::new(graph);
    let seed = graph.try_leaf(1., false)?;
    propagate(graph, root, seed, &mut grads)?;

    debug!(
        "backward from {} done: {} gradients, {} nodes added",
        root.id(),
        grads.len(),
        graph.len() - start
    );
    Ok(grads)
}

fn propagate<'a>(
    graph: &'a Graph,
    node: Node<'a>,
    seed: Node<'a>,
    grads: &mut Gradients<'a>,
) -> Result<()> {
    if node.tracks_gradient() {
        grads.accumulate(node, seed)?;
    }
    match node.kind() {
        NodeKind::Leaf => Ok(()),
        NodeKind::Add(lhs, rhs) => {
            propagate(graph, graph.node(lhs), seed, grads)?;
            propagate(graph, graph.node(rhs), seed, grads)
        }
        NodeKind::Mul(lhs, rhs) => {
            let (lhs, rhs) = (graph.node(lhs), graph.node(rhs));
            propagate(graph, lhs, graph.mul(seed, rhs)?, grads)?;
            propagate(graph, rhs, graph.mul(seed, lhs)?, grads)
        }
    }
}
