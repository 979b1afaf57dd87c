//! Strongly connected components and simple-cycle enumeration over a small
//! adjacency map. Shared by the call-graph and type-dependency analyzers.

use crate::analysis::Checkpoint;
use crate::error::QueryResult;
use crate::types::SymbolId;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Directed graph of symbol ids with successors in insertion order.
#[derive(Debug, Default, Clone)]
pub struct Adjacency {
    successors: IndexMap<SymbolId, Vec<SymbolId>>,
}

impl Adjacency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SymbolId) {
        self.successors.entry(node).or_default();
    }

    pub fn add_edge(&mut self, from: SymbolId, to: SymbolId) {
        self.add_node(to);
        let successors = self.successors.entry(from).or_default();
        if !successors.contains(&to) {
            successors.push(to);
        }
    }

    pub fn successors(&self, node: SymbolId) -> &[SymbolId] {
        self.successors
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.successors.keys().copied()
    }

    pub fn has_self_loop(&self, node: SymbolId) -> bool {
        self.successors(node).contains(&node)
    }
}

/// Tarjan's algorithm, iterative. Components come out in reverse topological
/// order; members keep discovery order.
pub fn strongly_connected_components(
    graph: &Adjacency,
    checkpoint: Checkpoint<'_>,
) -> QueryResult<Vec<Vec<SymbolId>>> {
    struct Frame {
        node: SymbolId,
        next_child: usize,
    }

    let mut index_of: HashMap<SymbolId, usize> = HashMap::new();
    let mut lowlink: HashMap<SymbolId, usize> = HashMap::new();
    let mut on_stack: HashSet<SymbolId> = HashSet::new();
    let mut stack: Vec<SymbolId> = Vec::new();
    let mut components = Vec::new();
    let mut next_index = 0;

    for root in graph.nodes() {
        if index_of.contains_key(&root) {
            continue;
        }

        let mut frames = vec![Frame {
            node: root,
            next_child: 0,
        }];
        index_of.insert(root, next_index);
        lowlink.insert(root, next_index);
        next_index += 1;
        stack.push(root);
        on_stack.insert(root);

        while let Some(frame) = frames.last_mut() {
            let node = frame.node;
            let successors = graph.successors(node);

            if let Some(&child) = successors.get(frame.next_child) {
                frame.next_child += 1;
                if !index_of.contains_key(&child) {
                    checkpoint.check()?;
                    index_of.insert(child, next_index);
                    lowlink.insert(child, next_index);
                    next_index += 1;
                    stack.push(child);
                    on_stack.insert(child);
                    frames.push(Frame {
                        node: child,
                        next_child: 0,
                    });
                } else if on_stack.contains(&child) {
                    let low = lowlink[&node].min(index_of[&child]);
                    lowlink.insert(node, low);
                }
                continue;
            }

            frames.pop();
            if let Some(parent) = frames.last() {
                let low = lowlink[&parent.node].min(lowlink[&node]);
                lowlink.insert(parent.node, low);
            }

            if lowlink[&node] == index_of[&node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(&member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                component.reverse();
                components.push(component);
            }
        }
    }

    Ok(components)
}

/// Whether a component contains a cycle: more than one member, or a single
/// member calling itself.
pub fn is_cyclic(graph: &Adjacency, component: &[SymbolId]) -> bool {
    match component {
        [single] => graph.has_self_loop(*single),
        members => members.len() > 1,
    }
}

/// Simple cycles inside one component, each reported once and rotated to
/// start at its lowest member. Cycles longer than `max_length` are skipped.
pub fn simple_cycles(
    graph: &Adjacency,
    component: &[SymbolId],
    max_length: usize,
    checkpoint: Checkpoint<'_>,
) -> QueryResult<Vec<Vec<SymbolId>>> {
    let mut members: Vec<SymbolId> = component.to_vec();
    members.sort();
    let in_component: HashSet<SymbolId> = members.iter().copied().collect();

    let mut cycles = Vec::new();
    for &start in &members {
        let mut walk = CycleWalk {
            graph,
            start,
            floor: start,
            allowed: &in_component,
            max_length,
            path: vec![start],
            on_path: HashSet::from([start]),
            cycles: Vec::new(),
            checkpoint,
        };
        walk.extend(start)?;
        cycles.append(&mut walk.cycles);
    }
    Ok(cycles)
}

/// Cycles through `node` only, each starting at `node`.
pub fn cycles_through(
    graph: &Adjacency,
    node: SymbolId,
    max_length: usize,
    checkpoint: Checkpoint<'_>,
) -> QueryResult<Vec<Vec<SymbolId>>> {
    let components = strongly_connected_components(graph, checkpoint)?;
    let Some(component) = components.into_iter().find(|c| c.contains(&node)) else {
        return Ok(Vec::new());
    };
    if !is_cyclic(graph, &component) {
        return Ok(Vec::new());
    }

    let allowed: HashSet<SymbolId> = component.iter().copied().collect();
    let mut walk = CycleWalk {
        graph,
        start: node,
        floor: component.iter().copied().min().unwrap_or(node),
        allowed: &allowed,
        max_length,
        path: vec![node],
        on_path: HashSet::from([node]),
        cycles: Vec::new(),
        checkpoint,
    };
    walk.extend(node)?;
    Ok(walk.cycles)
}

/// Depth-first search for paths returning to `start`.
///
/// Nodes ordered below `floor` are never entered; with `floor == start` each
/// cycle is found only from its lowest member.
struct CycleWalk<'a> {
    graph: &'a Adjacency,
    start: SymbolId,
    floor: SymbolId,
    allowed: &'a HashSet<SymbolId>,
    max_length: usize,
    path: Vec<SymbolId>,
    on_path: HashSet<SymbolId>,
    cycles: Vec<Vec<SymbolId>>,
    checkpoint: Checkpoint<'a>,
}

impl CycleWalk<'_> {
    fn extend(&mut self, current: SymbolId) -> QueryResult<()> {
        self.checkpoint.check()?;
        let graph = self.graph;

        for &next in graph.successors(current) {
            if next == self.start {
                if self.path.len() <= self.max_length {
                    self.cycles.push(self.path.clone());
                }
                continue;
            }
            if next < self.floor || !self.allowed.contains(&next) || self.on_path.contains(&next) {
                continue;
            }
            if self.path.len() >= self.max_length {
                continue;
            }

            self.path.push(next);
            self.on_path.insert(next);
            let result = self.extend(next);
            self.on_path.remove(&next);
            self.path.pop();
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: u32) -> SymbolId {
        SymbolId::new(value).unwrap()
    }

    fn graph(edges: &[(u32, u32)]) -> Adjacency {
        let mut adjacency = Adjacency::new();
        for &(from, to) in edges {
            adjacency.add_edge(id(from), id(to));
        }
        adjacency
    }

    #[test]
    fn test_components() {
        let g = graph(&[(1, 2), (2, 1), (2, 3), (3, 4), (4, 4)]);
        let mut components = strongly_connected_components(&g, Checkpoint::never("test")).unwrap();
        for c in &mut components {
            c.sort();
        }
        components.sort();

        assert_eq!(components, vec![vec![id(1), id(2)], vec![id(3)], vec![id(4)]]);
        assert!(is_cyclic(&g, &[id(4)]));
        assert!(!is_cyclic(&g, &[id(3)]));
    }

    #[test]
    fn test_simple_cycles_reported_once() {
        // Two cycles sharing node 1: 1->2->1 and 1->3->2->1
        let g = graph(&[(1, 2), (2, 1), (1, 3), (3, 2)]);
        let component = vec![id(3), id(2), id(1)];

        let cycles = simple_cycles(&g, &component, 12, Checkpoint::never("test")).unwrap();

        assert_eq!(cycles, vec![vec![id(1), id(2)], vec![id(1), id(3), id(2)]]);
    }

    #[test]
    fn test_cycle_length_cap() {
        let g = graph(&[(1, 2), (2, 3), (3, 1)]);
        let component = vec![id(1), id(2), id(3)];

        assert_eq!(
            simple_cycles(&g, &component, 3, Checkpoint::never("test")).unwrap().len(),
            1
        );
        assert!(simple_cycles(&g, &component, 2, Checkpoint::never("test")).unwrap().is_empty());
    }

    #[test]
    fn test_cycles_through_node() {
        let g = graph(&[(1, 2), (2, 3), (3, 2), (3, 1)]);

        let cycles = cycles_through(&g, id(2), 12, Checkpoint::never("test")).unwrap();
        assert_eq!(cycles, vec![vec![id(2), id(3)], vec![id(2), id(3), id(1)]]);

        let g = graph(&[(1, 2)]);
        assert!(cycles_through(&g, id(1), 12, Checkpoint::never("test")).unwrap().is_empty());
    }
}
