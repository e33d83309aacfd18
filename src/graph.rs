//! Shared memory arena for the nodes of an expression graph, aka a tape.
//! See https://rufflewind.com/2016-12-30/reverse-mode-automatic-differentiation
//!
//! A [`Graph`] owns every node and the counter that hands out their ids.
//! A [`Node`] is a cheap `Copy` handle into it, so a node can be an operand
//! of any number of parents.

use std::{cell::RefCell, fmt::Display};

use log::{trace, warn};

use crate::{
    backward::{backward, Gradients},
    dot::DotBuilder,
    error::{GraphError, Result},
    operation::Operation,
};

/// Construction limits of a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphConfig {
    max_nodes: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: u32::MAX,
        }
    }
}

impl GraphConfig {
    /// Maximum number of nodes (and therefore ids) the graph may allocate.
    pub fn max_nodes(mut self, max_nodes: u32) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn get_max_nodes(&self) -> u32 {
        self.max_nodes
    }
}

/// Identifier of a node, unique and strictly increasing within one graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum NodeKind {
    Leaf,
    Add(u32, u32),
    Mul(u32, u32),
}

#[derive(Clone, Debug)]
pub(crate) struct GraphNode {
    pub(crate) kind: NodeKind,
    pub(crate) value: f64,
    pub(crate) tracks_grad: bool,
}

/// Arena owning every node of an expression graph and the counter for their ids.
#[derive(Default, Debug)]
pub struct Graph {
    nodes: RefCell<Vec<GraphNode>>,
    config: GraphConfig,
}

/// Handle to a node in a [`Graph`].
#[derive(Copy, Clone)]
pub struct Node<'a> {
    graph: &'a Graph,
    idx: u32,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            nodes: RefCell::new(vec![]),
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Number of nodes allocated so far, which is also the next id.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Create a leaf node. Only leaves created with `tracks_grad` show up in
    /// the result of a backward pass.
    pub fn try_leaf(&self, value: f64, tracks_grad: bool) -> Result<Node<'_>> {
        self.push(NodeKind::Leaf, value, tracks_grad)
    }

    /// Create an untracked constant leaf.
    ///
    /// # Panics
    ///
    /// Panics if the graph has run out of node ids.
    pub fn leaf(&self, value: f64) -> Node<'_> {
        or_panic(self.try_leaf(value, false))
    }

    /// Create a leaf that tracks its gradient.
    ///
    /// # Panics
    ///
    /// Panics if the graph has run out of node ids.
    pub fn var(&self, value: f64) -> Node<'_> {
        or_panic(self.try_leaf(value, true))
    }

    pub fn add<'a>(&'a self, lhs: Node<'a>, rhs: Node<'a>) -> Result<Node<'a>> {
        self.apply(Operation::Addition, lhs, rhs)
    }

    pub fn mul<'a>(&'a self, lhs: Node<'a>, rhs: Node<'a>) -> Result<Node<'a>> {
        self.apply(Operation::Multiplication, lhs, rhs)
    }

    /// Combine two nodes of this graph with `op`, computing the value eagerly.
    pub fn apply<'a>(&'a self, op: Operation, lhs: Node<'a>, rhs: Node<'a>) -> Result<Node<'a>> {
        let lhs_idx = self.check_operand(lhs)?;
        let rhs_idx = self.check_operand(rhs)?;
        let value = op.f(lhs.value(), rhs.value());
        let kind = match op {
            Operation::Addition => NodeKind::Add(lhs_idx, rhs_idx),
            Operation::Multiplication => NodeKind::Mul(lhs_idx, rhs_idx),
        };
        self.push(kind, value, false)
    }

    /// Like [`Graph::apply`], for callers whose operands may be missing.
    pub fn apply_operands<'a>(
        &'a self,
        op: Operation,
        lhs: Option<Node<'a>>,
        rhs: Option<Node<'a>>,
    ) -> Result<Node<'a>> {
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => self.apply(op, lhs, rhs),
            (None, None) => Err(GraphError::invalid_operand(format!(
                "`{op}` needs two operands, got none"
            ))),
            _ => Err(GraphError::invalid_operand(format!(
                "`{op}` needs two operands, got one"
            ))),
        }
    }

    /// Run a backward pass from `root`. See [`Node::backward`].
    pub fn backward<'a>(&'a self, root: Node<'a>) -> Result<Gradients<'a>> {
        backward(self, root)
    }

    /// Drop every node and restart ids from zero. Taking `&mut self`
    /// guarantees no [`Node`] handle outlives the reset.
    pub fn reset(&mut self) {
        let nodes = self.nodes.get_mut();
        if !nodes.is_empty() {
            warn!("resetting graph with {} nodes", nodes.len());
        }
        nodes.clear();
    }

    fn push(&self, kind: NodeKind, value: f64, tracks_grad: bool) -> Result<Node<'_>> {
        let mut nodes = self.nodes.borrow_mut();
        let limit = self.config.max_nodes;
        let idx = match u32::try_from(nodes.len()) {
            Ok(idx) if idx < limit => idx,
            _ => return Err(GraphError::IdentifierExhaustion { limit }),
        };
        trace!("push #{idx}: {kind:?} = {value} (tracks_grad: {tracks_grad})");
        nodes.push(GraphNode {
            kind,
            value,
            tracks_grad,
        });
        Ok(Node { graph: self, idx })
    }

    fn check_operand(&self, node: Node<'_>) -> Result<u32> {
        if !std::ptr::eq(self, node.graph) {
            return Err(GraphError::invalid_operand(format!(
                "node {} belongs to another graph",
                node.id()
            )));
        }
        Ok(node.idx)
    }

    pub(crate) fn node(&self, idx: u32) -> Node<'_> {
        Node { graph: self, idx }
    }

    pub(crate) fn with_nodes<T>(&self, f: impl FnOnce(&[GraphNode]) -> T) -> T {
        f(&self.nodes.borrow())
    }

    pub(crate) fn contains(&self, node: &Node<'_>) -> bool {
        std::ptr::eq(self, node.graph)
    }
}

fn or_panic<T>(res: Result<T>) -> T {
    match res {
        Ok(v) => v,
        Err(e) => panic!("{e}"),
    }
}

impl<'a> std::ops::Add for Node<'a> {
    type Output = Self;
    /// # Panics
    ///
    /// Panics if the operands live in different graphs or ids are exhausted.
    fn add(self, rhs: Self) -> Self::Output {
        or_panic(self.graph.add(self, rhs))
    }
}

impl<'a> std::ops::Mul for Node<'a> {
    type Output = Self;
    /// # Panics
    ///
    /// Panics if the operands live in different graphs or ids are exhausted.
    fn mul(self, rhs: Self) -> Self::Output {
        or_panic(self.graph.mul(self, rhs))
    }
}

impl<'a> Node<'a> {
    pub fn id(&self) -> NodeId {
        NodeId(self.idx)
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// The value computed when this node was constructed.
    pub fn value(&self) -> f64 {
        self.graph.nodes.borrow()[self.idx as usize].value
    }

    pub fn tracks_gradient(&self) -> bool {
        self.graph.nodes.borrow()[self.idx as usize].tracks_grad
    }

    pub fn is_leaf(&self) -> bool {
        self.operation().is_none()
    }

    pub fn operation(&self) -> Option<Operation> {
        match self.kind() {
            NodeKind::Leaf => None,
            NodeKind::Add(..) => Some(Operation::Addition),
            NodeKind::Mul(..) => Some(Operation::Multiplication),
        }
    }

    /// The `(left, right)` operands, or `None` for a leaf.
    pub fn operands(&self) -> Option<(Node<'a>, Node<'a>)> {
        match self.kind() {
            NodeKind::Leaf => None,
            NodeKind::Add(lhs, rhs) | NodeKind::Mul(lhs, rhs) => {
                Some((self.graph.node(lhs), self.graph.node(rhs)))
            }
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.graph.nodes.borrow()[self.idx as usize].kind
    }

    /// Compute the derivative of every tracked leaf under this node.
    ///
    /// The gradients are nodes appended to the same graph, so calling
    /// `backward` on one of them yields second derivatives.
    pub fn backward(&self) -> Result<Gradients<'a>> {
        backward(self.graph, *self)
    }

    /// One-time forward-mode derivation with respect to `wrt`.
    /// Does not add any node to the graph.
    ///
    /// A `wrt` from another graph cannot influence this node, so the
    /// derivative is `0.` rather than an error.
    pub fn derive(&self, wrt: &Self) -> f64 {
        if !std::ptr::eq(self.graph, wrt.graph) {
            return 0.;
        }
        self.graph
            .with_nodes(|nodes| derive(nodes, self.idx, wrt.idx))
    }

    pub fn dot_builder(&self) -> DotBuilder<'a> {
        DotBuilder::new(*self)
    }
}

/// wrt - The node to derive With Respect To
fn derive(nodes: &[GraphNode], idx: u32, wrt: u32) -> f64 {
    if idx == wrt {
        return 1.;
    }
    let (op, lhs, rhs) = match nodes[idx as usize].kind {
        NodeKind::Leaf => return 0.,
        NodeKind::Add(lhs, rhs) => (Operation::Addition, lhs, rhs),
        NodeKind::Mul(lhs, rhs) => (Operation::Multiplication, lhs, rhs),
    };
    let (glhs, grhs) = op.grad(nodes[lhs as usize].value, nodes[rhs as usize].value);
    glhs * derive(nodes, lhs, wrt) + grhs * derive(nodes, rhs, wrt)
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.idx)
            .field("value", &self.value())
            .field("operation", &self.operation())
            .field("tracks_grad", &self.tracks_gradient())
            .finish()
    }
}

impl Display for Node<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.operation(), self.operands()) {
            (Some(op), Some((lhs, rhs))) => {
                write!(f, "({lhs}) {op} ({rhs}); val = {}", self.value())
            }
            _ => write!(f, "{}", self.value()),
        }
    }
}
