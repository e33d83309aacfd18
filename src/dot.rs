use std::{collections::BTreeMap, io::Write};

use crate::graph::{Node, NodeId, NodeKind};

/// Writes the subtree of a node as a graphviz dot file.
pub struct DotBuilder<'a> {
    node: Node<'a>,
    show_values: bool,
    show_ids: bool,
    vertical: bool,
    highlights: Option<NodeId>,
}

impl<'a> DotBuilder<'a> {
    pub(crate) fn new(node: Node<'a>) -> Self {
        Self {
            node,
            show_values: true,
            show_ids: false,
            vertical: false,
            highlights: None,
        }
    }

    pub fn show_values(mut self, v: bool) -> Self {
        self.show_values = v;
        self
    }

    pub fn show_ids(mut self, v: bool) -> Self {
        self.show_ids = v;
        self
    }

    /// Lay out the graph top to bottom instead of left to right.
    pub fn vertical(mut self, v: bool) -> Self {
        self.vertical = v;
        self
    }

    pub fn highlights(mut self, node: NodeId) -> Self {
        self.highlights = Some(node);
        self
    }

    /// Write graphviz dot file to the given writer.
    pub fn dot(self, writer: &mut impl Write) -> std::io::Result<()> {
        let graph = self.node.graph();
        let map = graph.with_nodes(|nodes| {
            let mut map = BTreeMap::new();
            let mut stack = vec![self.node.id().index()];
            while let Some(idx) = stack.pop() {
                if map.contains_key(&idx) {
                    continue;
                }
                let node = &nodes[idx as usize];
                let (label, parents) = match node.kind {
                    NodeKind::Leaf if node.tracks_grad => ("var", vec![]),
                    NodeKind::Leaf => ("const", vec![]),
                    NodeKind::Add(lhs, rhs) => ("+", vec![lhs, rhs]),
                    NodeKind::Mul(lhs, rhs) => ("*", vec![lhs, rhs]),
                };
                stack.extend(parents.iter().copied());
                map.insert(idx, (label, node.value, parents));
            }
            map
        });

        writeln!(writer, "digraph G {{")?;
        if !self.vertical {
            writeln!(writer, "rankdir=\"LR\";")?;
        }
        for (id, (label, value, _)) in &map {
            let mut text = label.to_string();
            if self.show_ids {
                text += &format!(" #{id}");
            }
            if self.show_values {
                text += &format!("\\nvalue:{value}");
            }
            let style = if self.highlights.map(|h| h.index()) == Some(*id) {
                ", style=filled, fillcolor=\"#ffff7f\""
            } else {
                ""
            };
            writeln!(writer, "a{id} [label=\"{text}\"{style}];")?;
        }
        for (id, (_, _, parents)) in &map {
            for pid in parents {
                writeln!(writer, "a{pid} -> a{id};")?;
            }
        }
        writeln!(writer, "}}")?;
        Ok(())
    }
}
