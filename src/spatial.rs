//! Nearest-trace lookup by ground coordinates

use rstar::primitives::GeomWithData;
use rstar::RTree;
use std::time::Instant;
use tracing::info;

type IndexedPoint = GeomWithData<[f64; 2], (i32, i32)>;

/// A trace returned by a spatial query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub inline: i32,
    pub crossline: i32,
    pub x: f64,
    pub y: f64,
    /// Euclidean distance from the query point
    pub distance: f64,
}

enum IndexState {
    Uninitialized {
        points: Vec<[f64; 2]>,
        lines: Vec<(i32, i32)>,
    },
    Ready(RTree<IndexedPoint>),
}

/// R-tree over trace ground coordinates, built on first use
pub struct SpatialIndex {
    state: IndexState,
}

impl SpatialIndex {
    /// `points[i]` is the (cdp-x, cdp-y) of the trace at `lines[i]`
    pub fn new(points: Vec<[f64; 2]>, lines: Vec<(i32, i32)>) -> Self {
        Self {
            state: IndexState::Uninitialized { points, lines },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, IndexState::Ready(_))
    }

    /// Build the tree if it is not built yet
    pub fn ensure_built(&mut self) {
        if let IndexState::Uninitialized { points, lines } = &mut self.state {
            let started = Instant::now();
            let entries: Vec<IndexedPoint> = std::mem::take(points)
                .into_iter()
                .zip(std::mem::take(lines))
                .filter(|(p, _)| p[0].is_finite() && p[1].is_finite())
                .map(|(p, l)| GeomWithData::new(p, l))
                .collect();
            let count = entries.len();
            self.state = IndexState::Ready(RTree::bulk_load(entries));
            info!(
                points = count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "spatial index built"
            );
        }
    }

    /// The `k` traces nearest to `point`, nearest first
    pub fn query(&mut self, point: [f64; 2], k: usize) -> Vec<Neighbor> {
        self.ensure_built();
        let IndexState::Ready(tree) = &self.state else {
            return Vec::new();
        };
        tree.nearest_neighbor_iter_with_distance_2(&point)
            .take(k)
            .map(|(entry, d2)| {
                let [x, y] = *entry.geom();
                let (inline, crossline) = entry.data;
                Neighbor {
                    inline,
                    crossline,
                    x,
                    y,
                    distance: d2.sqrt(),
                }
            })
            .collect()
    }

    /// Indexed trace count; zero before the first build
    pub fn len(&self) -> usize {
        match &self.state {
            IndexState::Ready(tree) => tree.size(),
            IndexState::Uninitialized { .. } => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SpatialIndex {
        let mut points = Vec::new();
        let mut lines = Vec::new();
        for il in 1..=3 {
            for xl in 10..=12 {
                points.push([il as f64 * 25.0, xl as f64 * 12.5]);
                lines.push((il, xl));
            }
        }
        SpatialIndex::new(points, lines)
    }

    #[test]
    fn test_builds_lazily() {
        let mut index = grid();
        assert!(!index.is_ready());
        assert!(index.is_empty());
        index.query([0.0, 0.0], 1);
        assert!(index.is_ready());
        assert_eq!(index.len(), 9);
        index.ensure_built();
        assert_eq!(index.len(), 9);
    }

    #[test]
    fn test_nearest_first() {
        let mut index = grid();
        let hits = index.query([51.0, 137.5], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!((hits[0].inline, hits[0].crossline), (2, 11));
        assert!((hits[0].distance - 1.0).abs() < 1e-9);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_k_larger_than_index() {
        let mut index = grid();
        assert_eq!(index.query([0.0, 0.0], 100).len(), 9);
        assert!(index.query([0.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_skips_non_finite_points() {
        let mut index = SpatialIndex::new(
            vec![[0.0, 0.0], [f64::NAN, 1.0]],
            vec![(1, 1), (1, 2)],
        );
        assert_eq!(index.query([5.0, 5.0], 5).len(), 1);
    }
}
