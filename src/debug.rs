use core::ptr::NonNull;
use std::fmt::{self, Write as _};

use crate::{AaTree, Node};

// A position in one row of the dump: a node, or the numbered placeholder for a missing child.
enum Cell<K> {
    Node(NonNull<Node<K>>),
    Missing(usize),
}

impl<K: Ord + fmt::Display> AaTree<K> {
    /// Writes the tree as a Graphviz digraph with one `rank=same` row per depth. Nodes are
    /// labelled `value:level` and missing children are drawn as points.
    #[doc(hidden)]
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, mut w: W) -> fmt::Result {
        let Some(root) = self.root else {
            return write!(w, "digraph \"graph-{name}\" {{}}");
        };

        let id = |value: &K| format!("\"graph{name}-{value}\"");

        write!(w, "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{")?;

        let mut edges = String::new();
        let mut missing = 0;
        let mut row = vec![Cell::Node(root)];

        while !row.is_empty() {
            let mut below = Vec::with_capacity(2 * row.len());

            write!(w, "{{rank=same; ")?;

            for cell in row {
                let node = match cell {
                    Cell::Node(node) => node,
                    Cell::Missing(n) => {
                        write!(w, "\"graph{name}-missing{n}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let (value, links) = unsafe { (&node.as_ref().value, self.links(node)) };
                write!(w, "{} [label=\"{value}:{}\"]; ", id(value), links.level())?;

                for child in [links.left(), links.right()] {
                    let target = match child {
                        Some(child) => {
                            below.push(Cell::Node(child));
                            id(unsafe { &child.as_ref().value })
                        }
                        None => {
                            below.push(Cell::Missing(missing));
                            missing += 1;
                            format!("\"graph{name}-missing{}\"", missing - 1)
                        }
                    };

                    writeln!(edges, "{} -> {target};", id(value))?;
                }
            }

            writeln!(w, "}}")?;
            row = below;
        }

        w.write_str(&edges)?;
        w.write_str(" }\n}")
    }
}
