//! Bounded, round-robin cache of recently built [`StreetGraphTile`]s.
//!
//! Grounded in `navigate_graph.c`'s `SquareGraphCache`/`MAX_GRAPH_CACHE`: no
//! LRU bookkeeping, just insertion-order eviction of the oldest slot once the
//! ring is full. Search locality in practice makes this as effective as a
//! precise LRU without the extra bookkeeping.

use tracing::debug;

use crate::graph::tile::StreetGraphTile;
use crate::MapQuery;

/// Default number of tiles kept resident, per the spec's suggested capacity.
pub const DEFAULT_CAPACITY: usize = 75;

#[derive(Debug, Clone, Copy)]
pub struct GraphCacheConfig {
    pub capacity: usize,
}

impl Default for GraphCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

struct Slot<G: MapQuery> {
    square: G::SquareId,
    tile: StreetGraphTile<G>,
}

/// Cache private to the core; only the router reads it.
pub struct GraphCache<G: MapQuery> {
    capacity: usize,
    slots: Vec<Slot<G>>,
    head: usize,
}

impl<G: MapQuery> GraphCache<G> {
    pub fn new(config: GraphCacheConfig) -> Self {
        Self {
            capacity: config.capacity.max(1),
            slots: Vec::with_capacity(config.capacity.max(1)),
            head: 0,
        }
    }

    /// Gets the tile for `square`, building and caching it on a miss.
    pub fn get(&mut self, graph: &G, square: G::SquareId) -> Result<&StreetGraphTile<G>, G::Error> {
        if let Some(index) = self.slots.iter().position(|slot| slot.square == square) {
            return Ok(&self.slots[index].tile);
        }

        debug!(?square, "building street graph tile");
        let tile = StreetGraphTile::build(graph, square)?;

        if self.slots.len() < self.capacity {
            self.slots.push(Slot { square, tile });
            Ok(&self.slots.last().unwrap().tile)
        } else {
            let slot = &mut self.slots[self.head];
            slot.square = square;
            slot.tile = tile;
            let index = self.head;
            self.head = (self.head + 1) % self.capacity;
            Ok(&self.slots[index].tile)
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
