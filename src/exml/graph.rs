//! The merged class inheritance graph and its derived queries.
//!
//! Nodes are keyed by fully qualified name; extends/implements edges are
//! stored as names and resolved through the owning map at query time, so an
//! edge whose target never made it into the map is simply absent. The graph
//! is immutable once built; recomputation replaces it wholesale.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::error;

/// A public mutable property of a class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prop {
    pub name: String,
    pub type_name: String,
    /// Default-value literal as source text.
    pub value: String,
    /// Enumerated legal values from the property catalog; empty when the
    /// property is unconstrained.
    pub available: Vec<String>,
}

/// One type in the graph.
#[derive(Debug, Clone, Default)]
pub struct ClassNode {
    pub full_name: String,
    /// Base-class edge; present only when the target exists in the map.
    pub base: Option<String>,
    pub implements: Vec<String>,
    pub props: Vec<Prop>,
    pub in_engine: bool,
    pub in_prompt: bool,
    pub is_interface: bool,
}

#[derive(Debug, Default)]
pub struct ClassGraph {
    nodes: FxHashMap<String, ClassNode>,
}

impl ClassGraph {
    /// Build a graph from a node map, enforcing the acyclicity invariant on
    /// the extends relation: the edge closing a cycle is severed and the
    /// offense logged once per build.
    pub fn from_nodes(mut nodes: FxHashMap<String, ClassNode>) -> Self {
        let severed = sever_extends_cycles(&mut nodes);
        if !severed.is_empty() {
            error!(
                classes = severed.join(", "),
                "cyclic extends chain detected; severed at the closing edge"
            );
        }
        Self { nodes }
    }

    pub fn get(&self, name: &str) -> Option<&ClassNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when `a` is `b`, `b` is a wildcard root type, or `b` is
    /// reachable from `a` over extends and implements edges.
    pub fn is_instance_of(&self, a: &str, b: &str) -> bool {
        if b == "any" || b == "Class" {
            return true;
        }
        let mut visited = FxHashSet::default();
        self.is_instance_of_inner(a, b, &mut visited)
    }

    fn is_instance_of_inner<'a>(
        &'a self,
        a: &'a str,
        b: &str,
        visited: &mut FxHashSet<&'a str>,
    ) -> bool {
        if a == b {
            return true;
        }
        if !visited.insert(a) {
            return false;
        }
        let Some(node) = self.nodes.get(a) else {
            return false;
        };
        if let Some(base) = node.base.as_deref() {
            if self.is_instance_of_inner(base, b, visited) {
                return true;
            }
        }
        node.implements
            .iter()
            .any(|i| self.is_instance_of_inner(i, b, visited))
    }

    /// The ancestor chain starting from `name` itself, following extends
    /// edges while their targets resolve.
    pub fn extends_chain(&self, name: &str) -> Vec<&ClassNode> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = self.nodes.get(name);
        while let Some(node) = current {
            if !seen.insert(node.full_name.as_str()) {
                break;
            }
            chain.push(node);
            current = node.base.as_deref().and_then(|b| self.nodes.get(b));
        }
        chain
    }

    /// Own and inherited props of `name`, walking from the most derived
    /// class upward and stopping when `stop_at_base` is reached. The first
    /// declaration seen for a property name wins. Each entry carries the
    /// declaring class.
    pub fn props_up_to(&self, name: &str, stop_at_base: &str) -> Vec<(&str, &Prop)> {
        let mut props: Vec<(&str, &Prop)> = Vec::new();
        let mut taken = FxHashSet::default();
        for node in self.extends_chain(name) {
            if !stop_at_base.is_empty() && node.full_name == stop_at_base {
                break;
            }
            for prop in &node.props {
                if taken.insert(prop.name.as_str()) {
                    props.push((node.full_name.as_str(), prop));
                }
            }
        }
        props
    }

    pub fn props(&self, name: &str) -> Vec<(&str, &Prop)> {
        self.props_up_to(name, "")
    }

    /// Interfaces implemented anywhere along the extends chain, transitively.
    pub fn all_interfaces(&self, name: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut seen = FxHashSet::default();
        for node in self.extends_chain(name) {
            for implemented in &node.implements {
                for ancestor in self.extends_chain(implemented) {
                    if ancestor.is_interface && seen.insert(ancestor.full_name.clone()) {
                        result.push(ancestor.full_name.clone());
                    }
                }
            }
        }
        result
    }

    /// Class names offered for element completion: concrete classes that are
    /// project-local or explicitly promptable engine classes. Sorted for
    /// deterministic enumeration.
    pub fn prompt_class_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .nodes
            .values()
            .filter(|n| !n.is_interface && (!n.in_engine || n.in_prompt))
            .map(|n| n.full_name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

/// Walk every extends chain; when a chain revisits a node, drop the edge
/// that closed the cycle. Returns the classes whose edges were severed.
fn sever_extends_cycles(nodes: &mut FxHashMap<String, ClassNode>) -> Vec<String> {
    let mut severed = Vec::new();
    let names: Vec<String> = nodes.keys().cloned().collect();
    for start in names {
        let mut on_path = FxHashSet::default();
        let mut current = start.clone();
        loop {
            if !on_path.insert(current.clone()) {
                break;
            }
            let Some(base) = nodes.get(&current).and_then(|n| n.base.clone()) else {
                break;
            };
            if on_path.contains(&base) {
                if let Some(node) = nodes.get_mut(&current) {
                    node.base = None;
                }
                severed.push(current);
                break;
            }
            current = base;
        }
    }
    severed.sort_unstable();
    severed.dedup();
    severed
}
