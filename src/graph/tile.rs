//! Per-square adjacency cache (C2): [`StreetGraphTile`] and [`successors`].
//!
//! Grounded in `navigate_graph.c`'s `SquareGraphItem`/`get_connected_segments`:
//! a flat arena of directed edges per square, a head-index per node and a
//! singly-linked chain of same-node entries. The only deliberate deviation
//! is the head-index lookup: the original keys `nodes_index` by the low 16
//! bits of a concrete point id packed into a square-local array. Since
//! `MapQuery::PointId` is an opaque associated type here, we key the head
//! index by the point id itself through a hash map instead of a bit-masked
//! array index; the arena (`lines`) and the chain (`lines_index`) keep the
//! original flat, index-linked shape.

use rustc_hash::FxHashMap;

use crate::model::{DirectedEdge, VehicleKind};
use crate::MapQuery;

/// A single square's directed-edge arena, built once and cached by
/// [`super::cache::GraphCache`].
#[derive(Debug, Clone)]
pub struct StreetGraphTile<G: MapQuery> {
    /// Directed-edge arena: `lines[i]` is the i-th inserted entry, in stable
    /// insertion order (the order turn-restriction bitmasks are indexed by).
    lines: Vec<DirectedEdge<G::LineId>>,
    /// `node -> index of its first entry in `lines`, if any.
    nodes_index: FxHashMap<G::PointId, u32>,
    /// `lines_index[i] = Some(j)` chains entry `i` to the next entry sharing
    /// the same node; `None` terminates the chain.
    lines_index: Vec<Option<u32>>,
}

impl<G: MapQuery> StreetGraphTile<G> {
    pub fn build(graph: &G, square: G::SquareId) -> Result<Self, G::Error> {
        let mut tile = Self {
            lines: Vec::new(),
            nodes_index: FxHashMap::default(),
            lines_index: Vec::new(),
        };

        for layer in graph.navigable_layers(VehicleKind::Car)? {
            for line in graph.lines_in_square(square, layer)? {
                let (from_point, to_point) = graph.line_endpoints(line)?;
                tile.insert(from_point, DirectedEdge::new(line, false));

                if graph.point_square(to_point)? == square {
                    tile.insert(to_point, DirectedEdge::new(line, true));
                }
            }

            for line in graph.lines_in_square_incoming(square, layer)? {
                let (_, to_point) = graph.line_endpoints(line)?;
                tile.insert(to_point, DirectedEdge::new(line, true));
            }
        }

        Ok(tile)
    }

    fn insert(&mut self, node: G::PointId, edge: DirectedEdge<G::LineId>) {
        let index = self.lines.len() as u32;
        self.lines.push(edge);
        self.lines_index.push(None);

        match self.nodes_index.get(&node) {
            None => {
                self.nodes_index.insert(node, index);
            }
            Some(&head) => {
                let mut i = head;
                while let Some(next) = self.lines_index[i as usize] {
                    i = next;
                }
                self.lines_index[i as usize] = Some(index);
            }
        }
    }

    /// Iterates every directed edge entry at `node`, in stable chain order.
    pub fn entries_at(&self, node: G::PointId) -> impl Iterator<Item = DirectedEdge<G::LineId>> + '_ {
        let mut next = self.nodes_index.get(&node).copied();
        std::iter::from_fn(move || {
            let i = next?;
            next = self.lines_index[i as usize];
            Some(self.lines[i as usize])
        })
    }
}

/// `successors(via, node)`: allowed continuations from `via` through `node`,
/// honoring the per-direction traffic flags and turn restrictions.
///
/// Mirrors `get_connected_segments`: the via edge itself still consumes an
/// enumeration slot as the chain is walked (it just never yields a
/// successor), which is why [`StreetGraphTile`]'s enumeration order at a
/// node must be stable — a host map database that stores restrictions as a
/// compact per-node bitmask (as the original does) can rely on that order
/// lining up with its own bit indices when answering
/// [`MapQuery::turn_restricted`].
pub fn successors<G: MapQuery>(
    graph: &G,
    tile: &StreetGraphTile<G>,
    via: DirectedEdge<G::LineId>,
    node: G::PointId,
) -> Result<Vec<(DirectedEdge<G::LineId>, G::PointId)>, G::Error> {
    let mut out = Vec::new();

    for candidate in tile.entries_at(node) {
        if candidate.line == via.line {
            continue;
        }

        let direction = graph.line_direction(candidate.line, VehicleKind::Car)?;
        if !direction.allows(candidate.reversed) {
            continue;
        }

        if graph.turn_restricted(node, via.line, candidate.line)? {
            continue;
        }

        let (from, to) = graph.line_endpoints(candidate.line)?;
        let head = if candidate.reversed { from } else { to };
        out.push((candidate, head));
    }

    Ok(out)
}
