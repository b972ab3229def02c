//! Neighbor finder facade.
//!
//! The original plugs in whichever `IBasicFinder` the run is configured
//! with (k-d tree, uniform grid, ...); this crate specifies only the trait
//! boundary plus a linear-scan reference implementation, leaving a spatial
//! index as a pluggable upgrade rather than something the solver itself
//! needs to own.

use crate::math::Vector;

/// Finds particles within a search radius of a query point or another
/// particle, ranked to avoid double-counting symmetric pairs.
pub trait NeighborFinder {
    /// Rebuilds any internal index from the current particle positions.
    fn build_with_rank(&mut self, positions: &[Vector], rank: &[usize]);

    /// Appends indices of particles within `radius` of particle `idx`
    /// *and* with a strictly lower rank than `idx`, per the ranking passed
    /// to [`NeighborFinder::build_with_rank`]. Used by the initial
    /// trajectory-intersection sweep to test each unordered pair once.
    fn find_lower_rank(&self, idx: usize, radius: f64, out: &mut Vec<usize>);

    /// Appends indices of every particle within `radius` of particle `idx`,
    /// excluding `idx` itself.
    fn find_all(&self, idx: usize, radius: f64, out: &mut Vec<usize>);

    /// Appends indices of every particle within `radius` of an arbitrary
    /// point not tied to a particle (used when re-testing a rewound pair).
    fn find_all_at(&self, point: Vector, radius: f64, out: &mut Vec<usize>);
}

/// `O(n)` per query reference finder: no spatial index, just a linear scan
/// over cached positions and ranks.
#[derive(Debug, Clone, Default)]
pub struct NaiveNeighborFinder {
    positions: Vec<Vector>,
    rank: Vec<usize>,
}

impl NeighborFinder for NaiveNeighborFinder {
    fn build_with_rank(&mut self, positions: &[Vector], rank: &[usize]) {
        debug_assert_eq!(positions.len(), rank.len());
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        self.rank.clear();
        self.rank.extend_from_slice(rank);
    }

    fn find_lower_rank(&self, idx: usize, radius: f64, out: &mut Vec<usize>) {
        let center = self.positions[idx];
        let my_rank = self.rank[idx];
        let radius_sq = radius * radius;
        for (j, &pos) in self.positions.iter().enumerate() {
            if j == idx || self.rank[j] >= my_rank {
                continue;
            }
            if (pos - center).length_squared() <= radius_sq {
                out.push(j);
            }
        }
    }

    fn find_all(&self, idx: usize, radius: f64, out: &mut Vec<usize>) {
        let center = self.positions[idx];
        self.find_all_excluding(center, radius, Some(idx), out);
    }

    fn find_all_at(&self, point: Vector, radius: f64, out: &mut Vec<usize>) {
        self.find_all_excluding(point, radius, None, out);
    }
}

impl NaiveNeighborFinder {
    fn find_all_excluding(&self, center: Vector, radius: f64, exclude: Option<usize>, out: &mut Vec<usize>) {
        let radius_sq = radius * radius;
        for (j, &pos) in self.positions.iter().enumerate() {
            if Some(j) == exclude {
                continue;
            }
            if (pos - center).length_squared() <= radius_sq {
                out.push(j);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_lower_rank_only_returns_strictly_lower_ranked_neighbors() {
        let positions = vec![Vector::ZERO, Vector::new(1.0, 0.0, 0.0), Vector::new(2.0, 0.0, 0.0)];
        let rank = vec![0, 1, 2];
        let mut finder = NaiveNeighborFinder::default();
        finder.build_with_rank(&positions, &rank);

        let mut out = Vec::new();
        finder.find_lower_rank(1, 5.0, &mut out);
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn find_all_excludes_self_and_respects_radius() {
        let positions = vec![Vector::ZERO, Vector::new(1.0, 0.0, 0.0), Vector::new(10.0, 0.0, 0.0)];
        let rank = vec![0, 1, 2];
        let mut finder = NaiveNeighborFinder::default();
        finder.build_with_rank(&positions, &rank);

        let mut out = Vec::new();
        finder.find_all(0, 2.0, &mut out);
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn find_all_at_queries_an_arbitrary_point() {
        let positions = vec![Vector::ZERO, Vector::new(1.0, 0.0, 0.0)];
        let rank = vec![0, 1];
        let mut finder = NaiveNeighborFinder::default();
        finder.build_with_rank(&positions, &rank);

        let mut out = Vec::new();
        finder.find_all_at(Vector::new(0.9, 0.0, 0.0), 0.2, &mut out);
        assert_eq!(out, vec![1]);
    }
}
