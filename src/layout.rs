//! Box layout engine.
//!
//! Algorithm
//! ---------
//!
//! Nodes are sized from their text, grouped into connected components, and
//! each component is layered by a topological traversal of its directed
//! edges. Layers become columns, stacked left to right; nodes within a
//! layer stack top to bottom; layers are vertically centered against the
//! tallest one.
//!
//! ```svgbob
//!                 +--------+
//!  +-------+      | parse  |      +--------+
//!  | input |      +--------+      | output |
//!  +-------+                      +--------+
//!                 +--------+
//!                 | lint   |
//!                 +--------+
//! ```
//!
//! Cycles are broken before layering: a depth-first sweep marks every edge
//! that closes back onto the traversal stack, and those back-edges are
//! ignored by the layering (they are still routed as connections later).
//! A component dominated by a single node skips the layering and renders
//! as a hub with its spokes stacked beside it.
//!
//! The engine never mutates its input; it hands back fresh geometry keyed
//! by node id.
use crate::config::LayoutOptions;
use crate::diagram::{Diagram, NodeId};
use crate::error::RenderError;
use crate::geometry::{Point, Rect, Size};
use crate::width::display_width;
use fixedbitset::FixedBitSet;
use log::debug;
use petgraph::unionfind::UnionFind;
use std::collections::BTreeMap;

pub trait LayoutEngine {
    /// Assign a rectangle to every node of the diagram.
    ///
    /// The returned map covers every node; rectangles of distinct nodes
    /// never overlap.
    fn place_nodes(&self, diagram: &Diagram) -> Result<BTreeMap<NodeId, Rect>, RenderError>;
}

#[derive(Debug, Clone, Default)]
pub struct BoxLayoutEngine {
    options: LayoutOptions,
}

// Hub-spoke detection thresholds: a node qualifies as a hub when its
// incident-edge count is at least this multiple of the component average
// and at least these fractions of the other nodes attach to it.
const HUB_DEGREE_FACTOR: f64 = 3.0;
const HUB_ATTACHMENT_FRACTION: f64 = 0.6;
const HUB_ADJACENCY_FRACTION: f64 = 0.7;

impl BoxLayoutEngine {
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    /// Node size derived from its text: two cells of border plus one line
    /// per text element vertically, and the longest line plus borders and
    /// padding horizontally. Text wider than `max_node_width` is clipped at
    /// render time, never wrapped here.
    fn node_size(&self, lines: &[String]) -> Size {
        let height = (lines.len() as i32 + 2).max(self.options.min_node_height);
        let longest = lines.iter().map(|l| display_width(l) as i32).max().unwrap_or(0);
        let width = (longest + 4).clamp(self.options.min_node_width, self.options.max_node_width);

        Size::new(width, height)
    }
}

impl LayoutEngine for BoxLayoutEngine {
    fn place_nodes(&self, diagram: &Diagram) -> Result<BTreeMap<NodeId, Rect>, RenderError> {
        diagram.check_references()?;

        // Work on indices into the id-sorted node list; ids only come back
        // at the very end.
        let mut ids: Vec<NodeId> = diagram.nodes().map(|n| n.id).collect();
        ids.sort();

        let index_of = |id: NodeId| ids.binary_search(&id).unwrap();
        let sizes: Vec<Size> = ids
            .iter()
            .map(|id| self.node_size(&diagram.get_node(*id).unwrap().text))
            .collect();

        // Directed edge list, self-loops excluded; they affect neither
        // layering nor components.
        let mut edges: Vec<(usize, usize)> = diagram
            .connections()
            .filter(|c| !c.is_self_loop())
            .map(|c| (index_of(c.from), index_of(c.to)))
            .collect();
        edges.sort();

        // Undirected connected components.
        let mut union = UnionFind::<usize>::new(ids.len());
        for &(u, v) in &edges {
            union.union(u, v);
        }

        let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..ids.len() {
            components.entry(union.find(i)).or_default().push(i);
        }

        // Lay out each component at the origin, then concatenate them left
        // to right.
        let mut placements: BTreeMap<NodeId, Rect> = BTreeMap::new();
        let mut offset_x = 0;

        for members in components.values() {
            let local = self.place_component(members, &edges, &sizes);

            let mut width = 0;
            for (i, rect) in &local {
                let rect = Rect::new(
                    Point::new(rect.origin.x + offset_x, rect.origin.y),
                    rect.size,
                );
                width = width.max(rect.max_x() + 1 - offset_x);
                placements.insert(ids[*i], rect);
            }

            offset_x += width + self.options.horizontal_spacing;
        }

        Ok(placements)
    }
}

impl BoxLayoutEngine {
    /// Lays out one component with its own origin at `(0, 0)`.
    fn place_component(
        &self,
        members: &[usize],
        edges: &[(usize, usize)],
        sizes: &[Size],
    ) -> Vec<(usize, Rect)> {
        let component_edges: Vec<(usize, usize)> = edges
            .iter()
            .copied()
            .filter(|(u, v)| members.contains(u) && members.contains(v))
            .collect();

        if let Some(hub) = self.detect_hub(members, &component_edges) {
            return self.place_hub_and_spokes(hub, members, sizes);
        }

        let layers = self.layer(members, &component_edges);
        let columns = self.split_wide_layers(layers);

        // Column heights decide the vertical centering baseline.
        let heights: Vec<i32> = columns
            .iter()
            .map(|column| {
                let total: i32 = column.iter().map(|&i| sizes[i].height).sum();
                total + (column.len().saturating_sub(1) as i32) * self.options.vertical_spacing
            })
            .collect();
        let tallest = heights.iter().copied().max().unwrap_or(0);

        let mut placed = vec![];
        let mut x = 0;

        for (column, height) in columns.iter().zip(&heights) {
            let width = column.iter().map(|&i| sizes[i].width).max().unwrap_or(0);
            let mut y = (tallest - height) / 2;

            for &i in column {
                placed.push((i, Rect::new(Point::new(x, y), sizes[i])));
                y += sizes[i].height + self.options.vertical_spacing;
            }

            x += width + self.options.horizontal_spacing;
        }

        placed
    }

    /// A component qualifies for the hub-spoke arrangement when one node
    /// carries at least three times the average incident-edge count and
    /// most of the remaining nodes hang directly off it.
    fn detect_hub(&self, members: &[usize], edges: &[(usize, usize)]) -> Option<usize> {
        if members.len() < 3 || edges.is_empty() {
            return None;
        }

        let mut incident: BTreeMap<usize, usize> = members.iter().map(|&i| (i, 0)).collect();
        for &(u, v) in edges {
            *incident.get_mut(&u).unwrap() += 1;
            *incident.get_mut(&v).unwrap() += 1;
        }

        // Ties go to the lower index, which the BTreeMap order provides.
        let (&hub, &hub_incident) = incident.iter().max_by_key(|(i, count)| {
            (**count, std::cmp::Reverse(**i))
        })?;

        let average = (edges.len() * 2) as f64 / members.len() as f64;
        if (hub_incident as f64) < HUB_DEGREE_FACTOR * average {
            return None;
        }

        let attached = members
            .iter()
            .filter(|&&i| {
                i != hub
                    && edges
                        .iter()
                        .any(|&(u, v)| (u == hub && v == i) || (v == hub && u == i))
            })
            .count();
        let others = (members.len() - 1) as f64;

        if (attached as f64) < HUB_ATTACHMENT_FRACTION * others {
            return None;
        }
        if (attached as f64) < HUB_ADJACENCY_FRACTION * others {
            return None;
        }

        Some(hub)
    }

    /// The hub sits in its own center column; every spoke stacks in a
    /// single column to its right, separated by a double gap so the spoke
    /// fan has room.
    fn place_hub_and_spokes(
        &self,
        hub: usize,
        members: &[usize],
        sizes: &[Size],
    ) -> Vec<(usize, Rect)> {
        let spokes: Vec<usize> = members.iter().copied().filter(|&i| i != hub).collect();

        let stack_height: i32 = spokes.iter().map(|&i| sizes[i].height).sum::<i32>()
            + (spokes.len().saturating_sub(1) as i32) * self.options.vertical_spacing;
        let spoke_x = sizes[hub].width + 2 * self.options.horizontal_spacing;

        let mut placed = vec![];

        let hub_y = (stack_height - sizes[hub].height).max(0) / 2;
        placed.push((hub, Rect::new(Point::new(0, hub_y), sizes[hub])));

        let mut y = 0;
        for &i in &spokes {
            placed.push((i, Rect::new(Point::new(spoke_x, y), sizes[i])));
            y += sizes[i].height + self.options.vertical_spacing;
        }

        placed
    }

    /// Kahn-style layering after back-edge removal. Every zero-in-degree
    /// set, sorted by index, becomes one layer.
    fn layer(&self, members: &[usize], edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
        let keep = self.forward_edges(members, edges);

        let mut in_degree: BTreeMap<usize, usize> = members.iter().map(|&i| (i, 0)).collect();
        for (e, &(_, v)) in edges.iter().enumerate() {
            if keep[e] {
                *in_degree.get_mut(&v).unwrap() += 1;
            }
        }

        let mut layers: Vec<Vec<usize>> = vec![];
        let mut placed = FixedBitSet::with_capacity(
            members.iter().copied().max().map_or(0, |m| m + 1),
        );
        let mut remaining = members.len();

        while remaining > 0 {
            // BTreeMap iteration yields candidates in ascending index
            // order, which is ascending id order.
            let layer: Vec<usize> = in_degree
                .iter()
                .filter(|(i, d)| !placed.contains(**i) && **d == 0)
                .map(|(i, _)| *i)
                .collect();

            if layer.is_empty() {
                break;
            }

            for &i in &layer {
                placed.insert(i);
                for (e, &(u, v)) in edges.iter().enumerate() {
                    if keep[e] && u == i {
                        *in_degree.get_mut(&v).unwrap() -= 1;
                    }
                }
            }

            remaining -= layer.len();
            layers.push(layer);
        }

        if remaining > 0 {
            // Only reachable for pathological inputs; place the leftovers
            // next to the most-connected layer.
            let leftovers: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&i| !placed.contains(i))
                .collect();
            self.place_leftovers(leftovers, edges, &mut layers);
        }

        layers
    }

    /// Marks the edges that survive cycle breaking: an edge is a back-edge
    /// iff its target is on the depth-first stack when the edge is
    /// examined.
    fn forward_edges(&self, members: &[usize], edges: &[(usize, usize)]) -> Vec<bool> {
        let bound = members.iter().copied().max().map_or(0, |m| m + 1);
        let mut visited = FixedBitSet::with_capacity(bound);
        let mut on_stack = FixedBitSet::with_capacity(bound);
        let mut keep = vec![true; edges.len()];
        let mut removed = 0usize;

        // Outgoing edge indices per node, in sorted edge order.
        let outgoing = |u: usize| {
            edges
                .iter()
                .enumerate()
                .filter(move |(_, &(a, _))| a == u)
                .map(|(e, _)| e)
        };

        for &start in members {
            if visited.contains(start) {
                continue;
            }

            // Iterative depth-first traversal; each frame tracks how many
            // outgoing edges it has already examined.
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            visited.insert(start);
            on_stack.insert(start);

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = (frame.0, frame.1);
                frame.1 += 1;

                match outgoing(node).nth(cursor) {
                    Some(e) => {
                        let (_, v) = edges[e];
                        if on_stack.contains(v) {
                            keep[e] = false;
                            removed += 1;
                        } else if !visited.contains(v) {
                            visited.insert(v);
                            on_stack.insert(v);
                            stack.push((v, 0));
                        }
                    }
                    None => {
                        on_stack.set(node, false);
                        stack.pop();
                    }
                }
            }
        }

        if removed > 0 {
            // Cycles are expected input, not an error; the layering just
            // ignores the closing edges.
            debug!("layout: removed {} back-edge(s) to break cycles", removed);
        }

        keep
    }

    /// Greedy fallback for nodes the topological pass could not place:
    /// join the layer holding the most neighbours, or the middle layer
    /// when no neighbour is placed yet.
    fn place_leftovers(
        &self,
        leftovers: Vec<usize>,
        edges: &[(usize, usize)],
        layers: &mut Vec<Vec<usize>>,
    ) {
        for i in leftovers {
            let mut best: Option<(usize, usize)> = None;

            for (l, layer) in layers.iter().enumerate() {
                let neighbours = layer
                    .iter()
                    .filter(|&&j| {
                        edges
                            .iter()
                            .any(|&(u, v)| (u == i && v == j) || (u == j && v == i))
                    })
                    .count();

                if neighbours > 0 && best.map_or(true, |(_, n)| neighbours > n) {
                    best = Some((l, neighbours));
                }
            }

            match best {
                Some((l, _)) => layers[l].push(i),
                None if layers.is_empty() => layers.push(vec![i]),
                None => {
                    let middle = layers.len() / 2;
                    layers[middle].push(i);
                }
            }
        }
    }

    /// A layer wider than `max_nodes_per_column` splits into chunks, each
    /// placed as its own column.
    fn split_wide_layers(&self, layers: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
        let limit = self.options.max_nodes_per_column.max(1);
        let mut columns = vec![];

        for layer in layers {
            if layer.len() <= limit {
                columns.push(layer);
            } else {
                for chunk in layer.chunks(limit) {
                    columns.push(chunk.to_vec());
                }
            }
        }

        columns
    }
}
