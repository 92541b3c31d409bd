//! Fixture dependency graph.
//!
//! Directed graph over fixture keys where an edge `a -> b` means "`a` must be
//! built before `b`". Nodes live in an arena and edges are stored as index
//! lists in both directions, so sorting and ancestor queries never chase
//! pointers.
//!
//! # Examples
//!
//! ```rust
//! use fixtura_core::graph::DepGraph;
//!
//! let mut graph = DepGraph::new();
//! graph.add_edge("color", "toaster");
//! graph.add_edge("toaster", "kitchen");
//!
//! assert_eq!(graph.topo_sort().unwrap(), vec!["color", "toaster", "kitchen"]);
//! assert_eq!(graph.ancestors_of("kitchen").unwrap(), vec!["color", "toaster"]);
//! ```

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::error::{FixtureError, FixtureResult};

/// Directed graph used for dependency ordering.
///
/// Duplicate edges are tolerated: each copy is counted once in the in-degree
/// of its target and consumed once during the sort, so they never change the
/// outcome.
#[derive(Debug, Default)]
pub struct DepGraph {
	/// Key to arena index.
	index: HashMap<String, usize>,
	/// Arena of node keys, in insertion order.
	names: Vec<String>,
	/// `forward[a]` lists every `b` with an edge `a -> b`.
	forward: Vec<Vec<usize>>,
	/// `backward[b]` lists every `a` with an edge `a -> b`.
	backward: Vec<Vec<usize>>,
	/// Last computed sort, `None` when the graph changed since.
	sorted: Mutex<Option<Vec<usize>>>,
}

impl DepGraph {
	/// Creates an empty graph.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a node, returning its arena index. Adding an existing node is a
	/// no-op.
	pub fn add_node(&mut self, node: &str) -> usize {
		if let Some(&idx) = self.index.get(node) {
			return idx;
		}
		let idx = self.names.len();
		self.names.push(node.to_string());
		self.forward.push(Vec::new());
		self.backward.push(Vec::new());
		self.index.insert(node.to_string(), idx);
		*self.sorted.get_mut() = None;
		idx
	}

	/// Adds an edge meaning "`from` is required before `to`".
	///
	/// Both endpoints are inserted as nodes if needed.
	pub fn add_edge(&mut self, from: &str, to: &str) {
		let from_idx = self.add_node(from);
		let to_idx = self.add_node(to);
		self.forward[from_idx].push(to_idx);
		self.backward[to_idx].push(from_idx);
		*self.sorted.get_mut() = None;
	}

	/// Returns true if `node` is part of the graph.
	pub fn contains(&self, node: &str) -> bool {
		self.index.contains_key(node)
	}

	/// Node keys in insertion order.
	pub fn nodes(&self) -> impl Iterator<Item = &str> {
		self.names.iter().map(String::as_str)
	}

	/// Number of nodes.
	pub fn len(&self) -> usize {
		self.names.len()
	}

	/// Returns true if the graph has no nodes.
	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	/// Number of edges, duplicates included.
	pub fn edge_count(&self) -> usize {
		self.forward.iter().map(Vec::len).sum()
	}

	/// Returns true iff a direct edge `from -> to` exists.
	///
	/// This checks edges, not paths.
	pub fn has_edge_between(&self, from: &str, to: &str) -> bool {
		match (self.index.get(from), self.index.get(to)) {
			(Some(&from_idx), Some(&to_idx)) => self.forward[from_idx].contains(&to_idx),
			_ => false,
		}
	}

	/// Direct prerequisites of `node`, deduplicated, in edge insertion order.
	pub fn dependencies_of(&self, node: &str) -> Vec<&str> {
		self.neighbours(node, &self.backward)
	}

	/// Direct dependents of `node`, deduplicated, in edge insertion order.
	pub fn dependents_of(&self, node: &str) -> Vec<&str> {
		self.neighbours(node, &self.forward)
	}

	fn neighbours<'a>(&'a self, node: &str, edges: &'a [Vec<usize>]) -> Vec<&'a str> {
		let Some(&idx) = self.index.get(node) else {
			return Vec::new();
		};
		let mut seen = vec![false; self.names.len()];
		let mut result = Vec::new();
		for &other in &edges[idx] {
			if !seen[other] {
				seen[other] = true;
				result.push(self.names[other].as_str());
			}
		}
		result
	}

	/// Topologically sorts the graph with Kahn's algorithm.
	///
	/// Ready nodes are processed first-in first-out, seeded in insertion
	/// order, so the result is deterministic. The sort is cached until the
	/// next mutation.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::CycleDetected`] if edges remain once no node is
	/// ready. No partial order is returned.
	pub fn topo_sort(&self) -> FixtureResult<Vec<String>> {
		let order = self.sorted_indices()?;
		Ok(order.into_iter().map(|idx| self.names[idx].clone()).collect())
	}

	/// Returns true iff [`topo_sort`](Self::topo_sort) succeeds.
	pub fn acyclic(&self) -> bool {
		self.sorted_indices().is_ok()
	}

	/// Every node that must be built before `node`, direct or transitive.
	///
	/// The ancestors are returned in topological order, so building them in
	/// sequence respects all of their own dependencies. An unknown node has
	/// no ancestors.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::CycleDetected`] if the graph is cyclic.
	pub fn ancestors_of(&self, node: &str) -> FixtureResult<Vec<String>> {
		let Some(&start) = self.index.get(node) else {
			return Ok(Vec::new());
		};

		let mut visited = vec![false; self.names.len()];
		let mut queue = VecDeque::from([start]);
		let mut ancestors = Vec::new();
		while let Some(current) = queue.pop_front() {
			for &parent in &self.backward[current] {
				if !visited[parent] {
					visited[parent] = true;
					ancestors.push(parent);
					queue.push_back(parent);
				}
			}
		}

		if ancestors.is_empty() {
			return Ok(Vec::new());
		}

		let order = self.sorted_indices()?;
		let mut position = vec![0; self.names.len()];
		for (pos, &idx) in order.iter().enumerate() {
			position[idx] = pos;
		}
		ancestors.sort_by_key(|&idx| position[idx]);

		tracing::trace!(node, ancestors = ancestors.len(), "Computed ancestors");
		Ok(ancestors
			.into_iter()
			.map(|idx| self.names[idx].clone())
			.collect())
	}

	fn sorted_indices(&self) -> FixtureResult<Vec<usize>> {
		let mut cache = self.sorted.lock();
		if let Some(order) = cache.as_ref() {
			return Ok(order.clone());
		}
		let order = self.kahn()?;
		*cache = Some(order.clone());
		Ok(order)
	}

	fn kahn(&self) -> FixtureResult<Vec<usize>> {
		let mut in_degree: Vec<usize> = self.backward.iter().map(Vec::len).collect();

		let mut queue: VecDeque<usize> = in_degree
			.iter()
			.enumerate()
			.filter(|(_, degree)| **degree == 0)
			.map(|(idx, _)| idx)
			.collect();

		let mut sorted = Vec::with_capacity(self.names.len());
		while let Some(idx) = queue.pop_front() {
			sorted.push(idx);
			for &target in &self.forward[idx] {
				in_degree[target] -= 1;
				if in_degree[target] == 0 {
					queue.push_back(target);
				}
			}
		}

		if sorted.len() != self.names.len() {
			let nodes = in_degree
				.iter()
				.enumerate()
				.filter(|(_, degree)| **degree > 0)
				.map(|(idx, _)| self.names[idx].clone())
				.collect();
			return Err(FixtureError::CycleDetected { nodes });
		}

		Ok(sorted)
	}
}
