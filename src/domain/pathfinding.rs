/// A* pathfinding over the TileMap.
///
/// 4-connected, unit step cost, Manhattan heuristic. The heuristic is
/// consistent on this grid, so a cell is final once popped and stale heap
/// entries are skipped lazily instead of being decreased in place.
///
/// Result convention:
///   - `start == goal`  → `[start]`
///   - reachable goal   → `[start, …, goal]`, every step 4-adjacent and walkable
///   - unreachable goal → `[]` ("unreachable now", never an error)

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::geom::Cell;
use super::map::TileMap;

const DIRS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Frontier entry. Ordered as a min-heap on `f`, then `h`, then insertion.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct OpenNode {
    f: u32,
    h: u32,
    seq: u32,
    cell: Cell,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-search scratch, indexed by `y * width + x`.
struct Scratch {
    width: usize,
    g: Vec<u32>,
    parent: Vec<Option<Cell>>,
    closed: Vec<bool>,
}

impl Scratch {
    fn new(width: usize, height: usize) -> Self {
        let n = width * height;
        Scratch {
            width,
            g: vec![u32::MAX; n],
            parent: vec![None; n],
            closed: vec![false; n],
        }
    }

    #[inline]
    fn idx(&self, c: Cell) -> usize {
        c.y as usize * self.width + c.x as usize
    }
}

fn heuristic(a: Cell, b: Cell) -> u32 {
    a.manhattan(b) as u32
}

/// Find a shortest 4-connected path from `start` to `goal`.
pub fn find_path(map: &TileMap, start: Cell, goal: Cell) -> Vec<Cell> {
    if start == goal { return vec![start]; }
    if !map.in_bounds(start.x, start.y) || !map.in_bounds(goal.x, goal.y) {
        return Vec::new();
    }

    let mut s = Scratch::new(map.width(), map.height());
    let mut open = BinaryHeap::with_capacity(64);
    let mut seq = 0u32;

    let si = s.idx(start);
    s.g[si] = 0;
    let h0 = heuristic(start, goal);
    open.push(OpenNode { f: h0, h: h0, seq, cell: start });

    while let Some(node) = open.pop() {
        let ci = s.idx(node.cell);
        if s.closed[ci] { continue; }
        if node.cell == goal {
            return reconstruct(&s, goal);
        }
        s.closed[ci] = true;

        let g_here = s.g[ci];
        for &(dx, dy) in &DIRS {
            let next = Cell::new(node.cell.x + dx, node.cell.y + dy);
            if !map.is_walkable_cell(next) { continue; }
            let ni = s.idx(next);
            if s.closed[ni] { continue; }

            let tentative = g_here + 1;
            if tentative < s.g[ni] {
                s.g[ni] = tentative;
                s.parent[ni] = Some(node.cell);
                let h = heuristic(next, goal);
                seq += 1;
                open.push(OpenNode { f: tentative + h, h, seq, cell: next });
            }
        }
    }

    Vec::new()
}

fn reconstruct(s: &Scratch, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut cur = goal;
    while let Some(p) = s.parent[s.idx(cur)] {
        path.push(p);
        cur = p;
    }
    path.reverse();
    path
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
