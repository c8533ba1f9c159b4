use crate::Tile;

/// A position in a [`SortedTileList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Link {
    /// Rank 0 is the worst tile.
    rank: usize,
}

/// All tiles of an image ranked by their error, worst first.
///
/// Entries are tile indexes into the image's tile array. Tiles that are done
/// are ranked behind all tiles that can still improve, so the first
/// [`unfinished_count`](SortedTileList::unfinished_count) entries are exactly
/// the tiles worth iterating.
#[derive(Debug, Clone, Default)]
pub(crate) struct SortedTileList {
    order: Vec<Entry>,
    unfinished: usize,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    tile: usize,
    /// Position in insertion order, used to break ties.
    sequence: usize,
}

impl SortedTileList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            unfinished: 0,
        }
    }

    /// Appends a tile. Ranks are only updated by [`sort`](Self::sort).
    pub fn add(&mut self, tile: usize) {
        let sequence = self.order.len();
        self.order.push(Entry { tile, sequence });
        self.unfinished += 1;
    }

    /// Re-ranks all entries: unfinished tiles first, then by error
    /// descending. Ties are ranked in insertion order.
    pub fn sort(&mut self, tiles: &[Tile]) {
        self.sort_by_state(|i| (tiles[i].is_done(), tiles[i].error()));
    }

    /// Same as [`sort`](Self::sort), with `(done, error)` given per tile index.
    fn sort_by_state(&mut self, state: impl Fn(usize) -> (bool, f32)) {
        self.order.sort_by(|a, b| {
            let (a_done, a_error) = state(a.tile);
            let (b_done, b_error) = state(b.tile);
            a_done
                .cmp(&b_done)
                .then_with(|| b_error.total_cmp(&a_error))
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        self.unfinished = self.order.iter().filter(|e| !state(e.tile).0).count();
    }

    /// The number of tiles that were not done at the last sort.
    pub fn unfinished_count(&self) -> usize {
        self.unfinished
    }

    pub fn first_link(&self) -> Option<Link> {
        self.link(0)
    }
    /// Moves `k` ranks further. Returns `None` past the end.
    pub fn advance(&self, link: Link, k: usize) -> Option<Link> {
        self.link(link.rank.checked_add(k)?)
    }
    fn link(&self, rank: usize) -> Option<Link> {
        (rank < self.order.len()).then_some(Link { rank })
    }

    /// The index of the tile at the given position.
    pub fn tile(&self, link: Link) -> usize {
        self.order[link.rank].tile
    }

    /// The tiles at ranks `offset, offset + stride, ...` below `limit`.
    pub fn walk(&self, offset: usize, stride: usize, limit: usize) -> impl Iterator<Item = usize> + '_ {
        debug_assert!(stride > 0);
        let limit = limit.min(self.order.len());
        std::iter::successors(self.first_link().and_then(|l| self.advance(l, offset)), move |&l| {
            self.advance(l, stride)
        })
        .take_while(move |l| l.rank < limit)
        .map(|l| self.tile(l))
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::{ErrorMetric, Format};

    fn tiles(values: &[f32]) -> Vec<Tile> {
        values
            .iter()
            .map(|&v| {
                // a gradient in red, so the error of the initial block is
                // larger the steeper the gradient
                let pixels = std::array::from_fn(|i| Vec4::new(v * (i as f32 / 15.0), 0.0, 0.0, 1.0));
                Tile::new((0, 0), pixels, 0, Format::R11, ErrorMetric::Rgba).unwrap()
            })
            .collect()
    }

    #[test]
    fn sorts_worst_first_and_stable() {
        let tiles = tiles(&[0.0, 1.0, 0.0, 0.5]);
        let mut list = SortedTileList::with_capacity(tiles.len());
        for i in 0..tiles.len() {
            list.add(i);
        }
        assert_eq!(list.unfinished_count(), 4);

        list.sort(&tiles);
        let order: Vec<usize> = list.walk(0, 1, usize::MAX).collect();
        // flat tiles are done right away and go last, in insertion order
        assert_eq!(order[2..], [0, 2]);
        assert_eq!(list.unfinished_count(), 2);
        assert!(order[..2].contains(&1) && order[..2].contains(&3));
        assert!(tiles[order[0]].error() >= tiles[order[1]].error());
    }

    #[test]
    fn ties_follow_insertion_order_after_resorting() {
        let mut list = SortedTileList::default();
        for i in 0..4 {
            list.add(i);
        }

        let errors = [1.0, 2.0, 3.0, 0.5];
        list.sort_by_state(|i| (false, errors[i]));
        assert_eq!(list.walk(0, 1, usize::MAX).collect::<Vec<_>>(), [2, 1, 0, 3]);

        // the previous ranking does not matter for ties
        let errors = [3.0, 3.0, 3.0, 3.0];
        list.sort_by_state(|i| (false, errors[i]));
        assert_eq!(list.walk(0, 1, usize::MAX).collect::<Vec<_>>(), [0, 1, 2, 3]);

        let done = [true, false, true, false];
        list.sort_by_state(|i| (done[i], 1.0));
        assert_eq!(list.walk(0, 1, usize::MAX).collect::<Vec<_>>(), [1, 3, 0, 2]);
        assert_eq!(list.unfinished_count(), 2);
    }

    #[test]
    fn strided_walks_are_disjoint() {
        let mut list = SortedTileList::default();
        for i in 0..10 {
            list.add(i);
        }
        let mut seen = Vec::new();
        for offset in 0..3 {
            seen.extend(list.walk(offset, 3, 8));
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());

        assert_eq!(list.walk(5, 3, 100).collect::<Vec<_>>(), [5, 8]);
        assert_eq!(list.walk(12, 3, 100).count(), 0);
    }

    #[test]
    fn links() {
        let mut list = SortedTileList::default();
        assert_eq!(list.first_link(), None);
        list.add(7);
        list.add(9);
        let first = list.first_link().unwrap();
        assert_eq!(list.tile(first), 7);
        let second = list.advance(first, 1).unwrap();
        assert_eq!((second.rank, list.tile(second)), (1, 9));
        assert_eq!(list.advance(second, 1), None);
        assert_eq!(list.advance(second, usize::MAX), None);
    }
}
