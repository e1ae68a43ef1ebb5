//! Residual max-flow over the two-table assignment graph
//!
//! Vertices live in two tables of `graph_size` slots each, plus the
//! source and sink sentinels. Edges are stored once, in their forward
//! direction; an [`EdgePtr`] carries a reciprocal flag, and a reciprocal
//! handle views the same edge with start/end and the two capacities
//! swapped. Augmenting-path searches walk forward edges with remaining
//! capacity and backward over in-edges with reciprocal capacity.
//!
//! The graph moves through three states: `Building` (structure may
//! change), `ResidualComputed` (after the max-flow loop) and
//! `MaxFlowComputed` (after materialisation, when every edge's capacity
//! is its realized flow).

use std::collections::VecDeque;

use crate::{Error, Result};

/// A vertex handle: one of the two tables, or a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexPtr {
    Source,
    Sink,
    Inner { table: u8, index: usize },
}

/// An edge handle; the reciprocal flag encodes direction of traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgePtr {
    index: usize,
    reciprocal: bool,
}

impl EdgePtr {
    /// The same edge, traversed against its direction.
    pub fn reciprocal(self) -> Self {
        Self {
            index: self.index,
            reciprocal: !self.reciprocal,
        }
    }

    pub fn is_reciprocal(self) -> bool {
        self.reciprocal
    }
}

/// Direction of a cross-table edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOrientation {
    /// start in table 1, end in table 0
    ForcedLeft,
    /// start in table 0, end in table 1
    ForcedRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Building,
    ResidualComputed,
    MaxFlowComputed,
}

impl GraphState {
    fn name(self) -> &'static str {
        match self {
            GraphState::Building => "Building",
            GraphState::ResidualComputed => "ResidualComputed",
            GraphState::MaxFlowComputed => "MaxFlowComputed",
        }
    }
}

#[derive(Debug, Clone)]
struct Edge {
    value_index: usize,
    capacity: usize,
    rec_capacity: usize,
    start: VertexPtr,
    end: VertexPtr,
}

#[derive(Debug, Clone, Default)]
struct Vertex {
    out_edges: Vec<EdgePtr>,
    in_edges: Vec<EdgePtr>,
}

/// Transient parent links, one slot per vertex, rebuilt for each path
/// search so the search itself can take `&self`.
struct ParentMap {
    source: Option<EdgePtr>,
    sink: Option<EdgePtr>,
    tables: [Vec<Option<EdgePtr>>; 2],
}

impl ParentMap {
    fn new(graph_size: usize) -> Self {
        Self {
            source: None,
            sink: None,
            tables: [vec![None; graph_size], vec![None; graph_size]],
        }
    }

    fn get(&self, ptr: VertexPtr) -> Option<EdgePtr> {
        match ptr {
            VertexPtr::Source => self.source,
            VertexPtr::Sink => self.sink,
            VertexPtr::Inner { table, index } => self.tables[table as usize][index],
        }
    }

    fn set(&mut self, ptr: VertexPtr, edge: EdgePtr) {
        match ptr {
            VertexPtr::Source => self.source = Some(edge),
            VertexPtr::Sink => self.sink = Some(edge),
            VertexPtr::Inner { table, index } => self.tables[table as usize][index] = Some(edge),
        }
    }
}

/// The assignment graph.
pub struct TethysGraph {
    graph_size: usize,
    state: GraphState,
    tables: [Vec<Vertex>; 2],
    source: Vertex,
    sink: Vertex,
    edges: Vec<Edge>,
}

impl TethysGraph {
    /// A graph with `graph_size` vertices per table and no edges.
    pub fn new(graph_size: usize) -> Self {
        Self {
            graph_size,
            state: GraphState::Building,
            tables: [
                vec![Vertex::default(); graph_size],
                vec![Vertex::default(); graph_size],
            ],
            source: Vertex::default(),
            sink: Vertex::default(),
            edges: Vec::new(),
        }
    }

    pub fn graph_size(&self) -> usize {
        self.graph_size
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn vertex(&self, ptr: VertexPtr) -> &Vertex {
        match ptr {
            VertexPtr::Source => &self.source,
            VertexPtr::Sink => &self.sink,
            VertexPtr::Inner { table, index } => &self.tables[table as usize][index],
        }
    }

    fn vertex_mut(&mut self, ptr: VertexPtr) -> &mut Vertex {
        match ptr {
            VertexPtr::Source => &mut self.source,
            VertexPtr::Sink => &mut self.sink,
            VertexPtr::Inner { table, index } => &mut self.tables[table as usize][index],
        }
    }

    fn check_state(&self, expected: GraphState) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState {
                expected: expected.name(),
                found: self.state.name(),
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.graph_size {
            return Err(Error::OutOfRange {
                index,
                max: self.graph_size,
            });
        }
        Ok(())
    }

    fn check_table(table: u8) -> Result<()> {
        if table > 1 {
            return Err(Error::InvalidTable(table));
        }
        Ok(())
    }

    fn push_edge(&mut self, edge: Edge) -> EdgePtr {
        let ptr = EdgePtr {
            index: self.edges.len(),
            reciprocal: false,
        };
        let (start, end) = (edge.start, edge.end);
        self.edges.push(edge);
        self.vertex_mut(start).out_edges.push(ptr);
        self.vertex_mut(end).in_edges.push(ptr);
        ptr
    }

    /// Add a cross-table edge.
    pub fn add_edge(
        &mut self,
        value_index: usize,
        capacity: usize,
        start: usize,
        end: usize,
        orientation: EdgeOrientation,
    ) -> Result<EdgePtr> {
        self.check_state(GraphState::Building)?;
        self.check_index(start)?;
        self.check_index(end)?;

        let (start, end) = match orientation {
            EdgeOrientation::ForcedLeft => (
                VertexPtr::Inner { table: 1, index: start },
                VertexPtr::Inner { table: 0, index: end },
            ),
            EdgeOrientation::ForcedRight => (
                VertexPtr::Inner { table: 0, index: start },
                VertexPtr::Inner { table: 1, index: end },
            ),
        };

        Ok(self.push_edge(Edge {
            value_index,
            capacity,
            rec_capacity: 0,
            start,
            end,
        }))
    }

    /// Add an edge from the source to `(table, end)`.
    pub fn add_edge_from_source(
        &mut self,
        value_index: usize,
        capacity: usize,
        end: usize,
        table: u8,
    ) -> Result<EdgePtr> {
        self.check_state(GraphState::Building)?;
        self.check_index(end)?;
        Self::check_table(table)?;

        Ok(self.push_edge(Edge {
            value_index,
            capacity,
            rec_capacity: 0,
            start: VertexPtr::Source,
            end: VertexPtr::Inner { table, index: end },
        }))
    }

    /// Add an edge from `(table, start)` to the sink.
    pub fn add_edge_to_sink(
        &mut self,
        value_index: usize,
        capacity: usize,
        start: usize,
        table: u8,
    ) -> Result<EdgePtr> {
        self.check_state(GraphState::Building)?;
        self.check_index(start)?;
        Self::check_table(table)?;

        Ok(self.push_edge(Edge {
            value_index,
            capacity,
            rec_capacity: 0,
            start: VertexPtr::Inner { table, index: start },
            end: VertexPtr::Sink,
        }))
    }

    /// Residual capacity seen through a (possibly reciprocal) handle
    fn residual_capacity(&self, ptr: EdgePtr) -> usize {
        let edge = &self.edges[ptr.index];
        if ptr.reciprocal {
            edge.rec_capacity
        } else {
            edge.capacity
        }
    }

    /// Origin vertex of a traversal along the handle's direction
    fn traversal_start(&self, ptr: EdgePtr) -> VertexPtr {
        let edge = &self.edges[ptr.index];
        if ptr.reciprocal {
            edge.end
        } else {
            edge.start
        }
    }

    /// Move `amount` units of residual through the handle.
    fn apply_flow(&mut self, ptr: EdgePtr, amount: usize) {
        let edge = &mut self.edges[ptr.index];
        if ptr.reciprocal {
            edge.rec_capacity -= amount;
            edge.capacity += amount;
        } else {
            edge.capacity -= amount;
            edge.rec_capacity += amount;
        }
    }

    /// Find a source-to-sink path in the residual graph.
    ///
    /// Depth-first: the frontier is a deque used push-front/pop-front, so
    /// for a fixed edge-insertion order the returned path is
    /// deterministic.
    // TODO: expose a BFS frontier option and compare allocation quality
    pub fn find_source_sink_path(&self) -> (Vec<EdgePtr>, usize) {
        let mut parents = ParentMap::new(self.graph_size);
        let mut queue = VecDeque::new();
        queue.push_front(VertexPtr::Source);

        'search: while let Some(vertex_ptr) = queue.pop_front() {
            let vertex = self.vertex(vertex_ptr);

            for &edge_ptr in &vertex.out_edges {
                let edge = &self.edges[edge_ptr.index];
                if edge.capacity > 0 {
                    let dest = edge.end;
                    if parents.get(dest).is_none() && dest != VertexPtr::Source {
                        queue.push_front(dest);
                        parents.set(dest, edge_ptr);
                        if dest == VertexPtr::Sink {
                            break 'search;
                        }
                    }
                }
            }

            // reciprocal traversal: walk in-edges against their direction
            for &edge_ptr in &vertex.in_edges {
                let edge = &self.edges[edge_ptr.index];
                if edge.rec_capacity > 0 {
                    let dest = edge.start;
                    if parents.get(dest).is_none() && dest != VertexPtr::Source {
                        queue.push_front(dest);
                        parents.set(dest, edge_ptr.reciprocal());
                        if dest == VertexPtr::Sink {
                            break 'search;
                        }
                    }
                }
            }
        }

        if parents.get(VertexPtr::Sink).is_none() {
            return (Vec::new(), 0);
        }

        // backtrack from the sink, taking the min residual along the way
        let mut capacity = usize::MAX;
        let mut path = Vec::new();
        let mut cursor = VertexPtr::Sink;
        while let Some(edge_ptr) = parents.get(cursor) {
            capacity = capacity.min(self.residual_capacity(edge_ptr));
            path.push(edge_ptr);
            cursor = self.traversal_start(edge_ptr);
        }
        path.reverse();
        (path, capacity)
    }

    /// Saturate the graph: augment along source-sink paths until none is
    /// left. Afterwards each edge's `rec_capacity` is its realized flow.
    pub fn compute_residual_maxflow(&mut self) -> Result<()> {
        self.check_state(GraphState::Building)?;

        loop {
            let (path, path_capacity) = self.find_source_sink_path();
            if path.is_empty() {
                break;
            }
            for edge_ptr in path {
                self.apply_flow(edge_ptr, path_capacity);
            }
        }

        self.state = GraphState::ResidualComputed;
        Ok(())
    }

    /// Materialise the flow: every edge's capacity becomes its realized
    /// flow and the reciprocal capacity drops to zero.
    pub fn transform_residual_to_flow(&mut self) -> Result<()> {
        self.check_state(GraphState::ResidualComputed)?;

        for edge in &mut self.edges {
            edge.capacity = edge.rec_capacity;
            edge.rec_capacity = 0;
        }

        self.state = GraphState::MaxFlowComputed;
        Ok(())
    }

    /// The input-list index attached to an edge
    pub fn edge_value_index(&self, ptr: EdgePtr) -> usize {
        self.edges[ptr.index].value_index
    }

    /// Realized flow of an edge; meaningful once the graph is in
    /// `MaxFlowComputed`.
    pub fn edge_flow(&self, ptr: EdgePtr) -> usize {
        self.edges[ptr.index].capacity
    }

    /// Total realized flow: the sum over the sink's in-edges; meaningful
    /// once the graph is in `MaxFlowComputed`.
    pub fn get_flow(&self) -> usize {
        self.sink
            .in_edges
            .iter()
            .map(|edge_ptr| self.edges[edge_ptr.index].capacity)
            .sum()
    }
}
