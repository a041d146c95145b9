use eframe::egui::{Vec2, vec2};

const QUADTREE_LEAF_CAPACITY: usize = 12;
const QUADTREE_MAX_DEPTH: usize = 10;

/// Square cell of the tree. Quadrants are numbered by bit: bit 0 set for the right
/// half, bit 1 set for the lower half.
#[derive(Clone, Copy, Debug)]
pub(super) struct QuadBounds {
    pub(super) center: Vec2,
    pub(super) half_extent: f32,
}

impl QuadBounds {
    /// Smallest padded square around `points`; `None` when empty or any point is not finite.
    fn from_points(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        if !points.iter().all(|point| point.is_finite()) {
            return None;
        }

        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(min, max), &point| (min.min(point), max.max(point)));
        let span = (max - min).max(vec2(1.0, 1.0));
        Some(Self {
            center: (min + max) * 0.5,
            half_extent: span.max_elem() * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        let offset = point - self.center;
        offset.x.abs() <= self.half_extent && offset.y.abs() <= self.half_extent
    }

    fn child(self, quadrant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let sign = |bit: usize| if quadrant & bit == 0 { -1.0 } else { 1.0 };
        Self {
            center: self.center + vec2(sign(1), sign(2)) * quarter,
            half_extent: quarter,
        }
    }

    fn quadrant_for(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    /// Squared gap between two cells; zero when they touch or overlap.
    pub(super) fn distance_sq_to(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap = ((self.center - other.center).abs() - vec2(reach, reach)).max(Vec2::ZERO);
        gap.length_sq()
    }
}

pub(super) struct QuadNode {
    pub(super) bounds: QuadBounds,
    /// Charge-weighted center; the plain centroid when the cell carries no charge.
    pub(super) center: Vec2,
    /// Sum of the charges of every point in the cell.
    pub(super) charge: f32,
    pub(super) len: usize,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

/// Flattened cell outline, exposed for the viewer's debug overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadtreeCell {
    pub center: Vec2,
    pub half_extent: f32,
    pub depth: usize,
    pub is_leaf: bool,
}

impl QuadNode {
    pub(super) fn build(positions: &[Vec2]) -> Option<Self> {
        Self::build_charged(positions, None)
    }

    pub(super) fn build_charged(positions: &[Vec2], charges: Option<&[f32]>) -> Option<Self> {
        let bounds = QuadBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, charges, 0))
    }

    fn build_node(
        bounds: QuadBounds,
        indices: Vec<usize>,
        positions: &[Vec2],
        charges: Option<&[f32]>,
        depth: usize,
    ) -> Self {
        let mut centroid = Vec2::ZERO;
        let mut weighted = Vec2::ZERO;
        let mut weight = 0.0;
        let mut charge = 0.0;
        for &index in &indices {
            let value = charges
                .and_then(|charges| charges.get(index).copied())
                .unwrap_or(0.0);
            centroid += positions[index];
            weighted += positions[index] * value.abs();
            weight += value.abs();
            charge += value;
        }

        let len = indices.len();
        let center = if weight > 0.0 {
            weighted / weight
        } else if len > 0 {
            centroid / len as f32
        } else {
            bounds.center
        };

        let mut node = Self {
            bounds,
            center,
            charge,
            len,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= QUADTREE_MAX_DEPTH || len <= QUADTREE_LEAF_CAPACITY {
            return node;
        }

        let mut buckets: [Vec<usize>; 4] = Default::default();
        for &index in &node.indices {
            buckets[bounds.quadrant_for(positions[index])].push(index);
        }
        // Stop when a split would put every point in the same child.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() < 2 {
            return node;
        }

        node.indices = Vec::new();
        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                let child = Self::build_node(bounds.child(quadrant), bucket, positions, charges, depth + 1);
                node.children[quadrant] = Some(Box::new(child));
            }
        }
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }
}

pub(super) fn collect_quadtree_cells(node: &QuadNode, depth: usize, cells: &mut Vec<QuadtreeCell>) {
    cells.push(QuadtreeCell {
        center: node.bounds.center,
        half_extent: node.bounds.half_extent,
        depth,
        is_leaf: node.is_leaf(),
    });

    for child in node.children.iter().flatten() {
        collect_quadtree_cells(child, depth + 1, cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(side: usize) -> Vec<Vec2> {
        (0..side * side)
            .map(|index| vec2((index % side) as f32 * 10.0, (index / side) as f32 * 10.0))
            .collect()
    }

    fn count_points(node: &QuadNode) -> usize {
        node.indices.len()
            + node
                .children
                .iter()
                .flatten()
                .map(|child| count_points(child))
                .sum::<usize>()
    }

    #[test]
    fn every_point_lands_in_exactly_one_leaf() {
        let points = grid(8);
        let tree = QuadNode::build(&points).unwrap();
        assert!(!tree.is_leaf());
        assert_eq!(count_points(&tree), points.len());
        assert_eq!(tree.len, points.len());
    }

    #[test]
    fn charged_center_follows_the_heavier_point() {
        let points = [vec2(0.0, 0.0), vec2(10.0, 0.0)];
        let tree = QuadNode::build_charged(&points, Some(&[-3.0, -1.0])).unwrap();
        assert!((tree.charge + 4.0).abs() < 1e-6);
        assert!((tree.center.x - 2.5).abs() < 1e-5);
    }

    #[test]
    fn coincident_points_stop_at_a_leaf() {
        let points = vec![vec2(5.0, 5.0); 40];
        let tree = QuadNode::build(&points).unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.indices.len(), 40);
    }

    #[test]
    fn non_finite_points_build_nothing() {
        assert!(QuadNode::build(&[vec2(f32::NAN, 0.0)]).is_none());
        assert!(QuadNode::build(&[]).is_none());
    }

    #[test]
    fn cells_cover_the_tree() {
        let tree = QuadNode::build(&grid(6)).unwrap();
        let mut cells = Vec::new();
        collect_quadtree_cells(&tree, 0, &mut cells);
        assert_eq!(cells[0].depth, 0);
        assert!(cells.iter().any(|cell| cell.is_leaf));
    }
}
