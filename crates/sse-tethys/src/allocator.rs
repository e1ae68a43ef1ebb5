//! Two-table assignment through max-flow
//!
//! Every inserted list contributes a source edge into its table-0 bucket
//! and a cross edge toward its table-1 bucket, both carrying the full
//! logical list length. Bucket capacity is enforced by one lazily-created
//! edge per bucket toward the sink, capped at the entries-per-page
//! budget. After the flow is materialised, a list's table-1 share is the
//! flow on its cross edge, and each table-0 bucket's realized sink flow
//! is split over its lists in insertion order.

use tracing::debug;

use crate::graph::{EdgeOrientation, EdgePtr, TethysGraph};
use crate::{Error, Result};

/// Value index attached to per-bucket edges that belong to no input list
pub const EMPTY_VALUE_INDEX: usize = usize::MAX;

/// Two hashed bucket choices for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorKey {
    pub h: [u64; 2],
}

impl AllocatorKey {
    pub fn new(h0: u64, h1: u64) -> Self {
        Self { h: [h0, h1] }
    }
}

/// Where a list ended up: `assigned0` logical entries in its table-0
/// bucket, `assigned1` in its table-1 bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListAssignment {
    pub bucket0: usize,
    pub bucket1: usize,
    pub assigned0: usize,
    pub assigned1: usize,
    pub length: usize,
}

impl ListAssignment {
    pub fn assigned_total(&self) -> usize {
        self.assigned0 + self.assigned1
    }

    pub fn is_complete(&self) -> bool {
        self.assigned_total() == self.length
    }
}

struct ListEntry {
    bucket0: usize,
    bucket1: usize,
    length: usize,
    cross_edge: EdgePtr,
}

/// The allocator: builds the graph list by list, then reads the
/// assignment off the realized flow.
pub struct TethysAllocator {
    graph: TethysGraph,
    table_size: usize,
    bucket_capacity: usize,
    lists: Vec<ListEntry>,
    sink_edges: [Vec<Option<EdgePtr>>; 2],
    assignments: Vec<ListAssignment>,
    allocated: bool,
}

impl TethysAllocator {
    /// `table_size` buckets per table, `bucket_capacity` entries per
    /// bucket.
    pub fn new(table_size: usize, bucket_capacity: usize) -> Self {
        Self {
            graph: TethysGraph::new(table_size),
            table_size,
            bucket_capacity,
            lists: Vec::new(),
            sink_edges: [vec![None; table_size], vec![None; table_size]],
            assignments: Vec::new(),
            allocated: false,
        }
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    fn check_building(&self) -> Result<()> {
        if self.allocated {
            return Err(Error::InvalidState {
                expected: "Building",
                found: "Allocated",
            });
        }
        Ok(())
    }

    fn bucket_sink_edge(&mut self, table: u8, bucket: usize) -> Result<()> {
        if self.sink_edges[table as usize][bucket].is_none() {
            let edge = self.graph.add_edge_to_sink(
                EMPTY_VALUE_INDEX,
                self.bucket_capacity,
                bucket,
                table,
            )?;
            self.sink_edges[table as usize][bucket] = Some(edge);
        }
        Ok(())
    }

    /// Insert a list of `length` logical entries under the two hashed
    /// bucket choices. Returns the list's value index.
    pub fn insert(&mut self, key: AllocatorKey, length: usize) -> Result<usize> {
        self.check_building()?;

        let bucket0 = (key.h[0] % self.table_size as u64) as usize;
        let bucket1 = (key.h[1] % self.table_size as u64) as usize;
        let index = self.lists.len();

        self.graph.add_edge_from_source(index, length, bucket0, 0)?;
        let cross_edge =
            self.graph
                .add_edge(index, length, bucket0, bucket1, EdgeOrientation::ForcedRight)?;
        self.bucket_sink_edge(0, bucket0)?;
        self.bucket_sink_edge(1, bucket1)?;

        self.lists.push(ListEntry {
            bucket0,
            bucket1,
            length,
            cross_edge,
        });
        Ok(index)
    }

    /// Solve the assignment and read it back per list.
    pub fn allocate(&mut self) -> Result<&[ListAssignment]> {
        self.check_building()?;

        self.graph.compute_residual_maxflow()?;
        self.graph.transform_residual_to_flow()?;

        self.assignments = self
            .lists
            .iter()
            .map(|list| ListAssignment {
                bucket0: list.bucket0,
                bucket1: list.bucket1,
                assigned0: 0,
                assigned1: self.graph.edge_flow(list.cross_edge),
                length: list.length,
            })
            .collect();

        // split each table-0 bucket's realized sink flow over its lists,
        // bounded per list by what the table-1 side did not take
        let mut remaining: Vec<usize> = (0..self.table_size)
            .map(|bucket| {
                self.sink_edges[0][bucket]
                    .map(|edge| self.graph.edge_flow(edge))
                    .unwrap_or(0)
            })
            .collect();

        for (list, assignment) in self.lists.iter().zip(self.assignments.iter_mut()) {
            let headroom = assignment.length - assignment.assigned1;
            let taken = headroom.min(remaining[list.bucket0]);
            assignment.assigned0 = taken;
            remaining[list.bucket0] -= taken;
        }

        self.allocated = true;
        debug!(
            lists = self.lists.len(),
            flow = self.graph.get_flow(),
            "assignment computed"
        );
        Ok(&self.assignments)
    }

    /// Assignments computed by [`allocate`](Self::allocate)
    pub fn assignments(&self) -> &[ListAssignment] {
        &self.assignments
    }

    /// Total realized flow (= logical entries placed)
    pub fn flow(&self) -> usize {
        self.graph.get_flow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_list_fits_one_bucket() {
        let mut allocator = TethysAllocator::new(8, 100);
        allocator.insert(AllocatorKey::new(0, 1), 40).unwrap();
        let assignments = allocator.allocate().unwrap();

        assert_eq!(assignments.len(), 1);
        assert!(assignments[0].is_complete());
        assert_eq!(assignments[0].assigned_total(), 40);
        assert_eq!(allocator.flow(), 40);
    }

    #[test]
    fn test_oversized_list_splits_across_buckets() {
        let mut allocator = TethysAllocator::new(4, 100);
        allocator.insert(AllocatorKey::new(0, 1), 150).unwrap();
        let assignments = allocator.allocate().unwrap();

        let a = assignments[0];
        assert!(a.is_complete());
        assert!(a.assigned0 <= 100);
        assert!(a.assigned1 <= 100);
        assert_eq!(a.assigned0 + a.assigned1, 150);
    }

    #[test]
    fn test_colliding_lists_share_capacity() {
        // both lists hash to the same pair of buckets: 2 * 100 entries of
        // capacity for 160 entries of load
        let mut allocator = TethysAllocator::new(4, 100);
        allocator.insert(AllocatorKey::new(2, 3), 80).unwrap();
        allocator.insert(AllocatorKey::new(2, 3), 80).unwrap();
        let assignments = allocator.allocate().unwrap();

        assert!(assignments.iter().all(|a| a.is_complete()));
        let bucket0_load: usize = assignments.iter().map(|a| a.assigned0).sum();
        let bucket1_load: usize = assignments.iter().map(|a| a.assigned1).sum();
        assert!(bucket0_load <= 100);
        assert!(bucket1_load <= 100);
        assert_eq!(allocator.flow(), 160);
    }

    #[test]
    fn test_overflow_is_visible_in_assignments() {
        // 250 entries against 2 buckets of 100
        let mut allocator = TethysAllocator::new(1, 100);
        allocator.insert(AllocatorKey::new(0, 0), 250).unwrap();
        let assignments = allocator.allocate().unwrap();

        let a = assignments[0];
        assert!(!a.is_complete());
        assert_eq!(a.assigned_total(), 200);
        assert_eq!(allocator.flow(), 200);
    }

    #[test]
    fn test_flow_equals_total_minus_unassigned() {
        let mut allocator = TethysAllocator::new(2, 50);
        let lengths = [40usize, 40, 40, 40, 40];
        for (i, &len) in lengths.iter().enumerate() {
            allocator
                .insert(AllocatorKey::new(i as u64, (i + 1) as u64), len)
                .unwrap();
        }
        let assignments = allocator.allocate().unwrap();

        let total: usize = lengths.iter().sum();
        let unassigned: usize = assignments
            .iter()
            .map(|a| a.length - a.assigned_total())
            .sum();
        assert_eq!(allocator.flow(), total - unassigned);
    }

    #[test]
    fn test_insert_after_allocate_fails() {
        let mut allocator = TethysAllocator::new(2, 10);
        allocator.insert(AllocatorKey::new(0, 1), 5).unwrap();
        allocator.allocate().unwrap();

        assert!(matches!(
            allocator.insert(AllocatorKey::new(1, 0), 5),
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(allocator.allocate(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_bucket_indices_are_reduced_modulo_table_size() {
        let mut allocator = TethysAllocator::new(4, 100);
        allocator.insert(AllocatorKey::new(7, 13), 10).unwrap();
        let assignments = allocator.allocate().unwrap();
        assert_eq!(assignments[0].bucket0, 3);
        assert_eq!(assignments[0].bucket1, 1);
        assert!(assignments[0].is_complete());
    }
}
