//! Bin packing of disconnected components: golden-section search over the
//! packing width, aiming the aspect ratio of the result at the canvas.

use crate::model::{Link, Node};

const PADDING: f64 = 10.0;
const GOLDEN_SECTION: f64 = 1.618_033_988_749_895;
const FLOAT_EPSILON: f64 = 1e-4;
const MAX_ITERATIONS: usize = 100;

/// Connected components of the node set, each a list of node indices.
pub fn separate_graphs(n: usize, links: &[Link]) -> Vec<Vec<usize>> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for l in links {
        adjacency[l.source].push(l.target);
        adjacency[l.target].push(l.source);
    }
    let mut component = vec![usize::MAX; n];
    let mut components: Vec<Vec<usize>> = Vec::new();
    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        let ci = components.len();
        components.push(Vec::new());
        let mut stack = vec![start];
        component[start] = ci;
        while let Some(v) = stack.pop() {
            components[ci].push(v);
            for &u in &adjacency[v] {
                if component[u] == usize::MAX {
                    component[u] = ci;
                    stack.push(u);
                }
            }
        }
    }
    components
}

#[derive(Debug, Clone)]
struct ComponentBox {
    nodes: Vec<usize>,
    width: f64,
    height: f64,
    x: f64,
    y: f64,
    bottom: f64,
    space_left: f64,
}

/// Pack the components into rows, then translate each component's nodes to
/// its packed slot and recentre everything over the canvas. Packing quality
/// is a heuristic, not a contract.
pub fn apply_packing(
    components: &[Vec<usize>],
    nodes: &mut [Node],
    svg_width: f64,
    svg_height: f64,
    node_size: f64,
    desired_ratio: f64,
) {
    if components.is_empty() {
        return;
    }
    let mut boxes: Vec<ComponentBox> = components
        .iter()
        .map(|c| {
            let mut min_x = f64::MAX;
            let mut min_y = f64::MAX;
            let mut max_x = 0.0f64;
            let mut max_y = 0.0f64;
            for &i in c {
                let hw = nodes[i].width_or(node_size) / 2.0;
                let hh = nodes[i].height_or(node_size) / 2.0;
                min_x = min_x.min(nodes[i].x - hw);
                max_x = max_x.max(nodes[i].x + hw);
                min_y = min_y.min(nodes[i].y - hh);
                max_y = max_y.max(nodes[i].y + hh);
            }
            ComponentBox {
                nodes: c.clone(),
                width: max_x - min_x,
                height: max_y - min_y,
                x: 0.0,
                y: 0.0,
                bottom: 0.0,
                space_left: 0.0,
            }
        })
        .collect();

    boxes.sort_by(|a, b| b.height.total_cmp(&a.height));
    let min_width = boxes
        .iter()
        .map(|b| b.width)
        .fold(f64::MAX, f64::min);
    let total_width: f64 = boxes.iter().map(|b| b.width + PADDING).sum();

    // Golden-section search over the pack width for the best aspect ratio.
    let mut lo = min_width;
    let mut hi = total_width;
    let mut best_cost = f64::INFINITY;
    let mut best_width = hi;
    let mut x1 = lo;
    let mut x2 = hi;
    let mut f1 = 0.0f64;
    let mut f2 = 10.0f64;
    let mut iterations = 0;
    while (x1 - x2).abs() > min_width || (f1 - f2).abs() > FLOAT_EPSILON {
        x1 = hi - (hi - lo) / GOLDEN_SECTION;
        x2 = lo + (hi - lo) / GOLDEN_SECTION;
        f1 = measure(&mut boxes, x1, desired_ratio);
        f2 = measure(&mut boxes, x2, desired_ratio);
        if f1 > f2 {
            lo = x1;
        } else {
            hi = x2;
        }
        if f1 < best_cost {
            best_cost = f1;
            best_width = x1;
        }
        if f2 < best_cost {
            best_cost = f2;
            best_width = x2;
        }
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            tracing::debug!(iterations, "packing width search hit iteration cap");
            break;
        }
    }
    let (real_width, real_height) = pack(&mut boxes, best_width);

    // Move each component from its layout centroid to its packed slot.
    for b in &boxes {
        let mut cx = 0.0;
        let mut cy = 0.0;
        for &i in &b.nodes {
            cx += nodes[i].x;
            cy += nodes[i].y;
        }
        cx /= b.nodes.len() as f64;
        cy /= b.nodes.len() as f64;
        let dx = b.x - (cx - b.width / 2.0);
        let dy = b.y - (cy - b.height / 2.0);
        for &i in &b.nodes {
            nodes[i].x += dx + svg_width / 2.0 - real_width / 2.0;
            nodes[i].y += dy + svg_height / 2.0 - real_height / 2.0;
        }
    }
}

fn measure(boxes: &mut [ComponentBox], width: f64, desired_ratio: f64) -> f64 {
    let (real_width, real_height) = pack(boxes, width);
    (real_width / real_height - desired_ratio).abs()
}

/// Shelf-pack the component boxes into a column of rows no wider than
/// `width`; returns the bounding extent of the result.
fn pack(boxes: &mut [ComponentBox], width: f64) -> (f64, f64) {
    let mut lines: Vec<usize> = Vec::new();
    let mut real_width = 0.0f64;
    let mut real_height = 0.0f64;
    let mut global_bottom = 0.0;
    for i in 0..boxes.len() {
        let mut host: Option<usize> = None;
        for &li in &lines {
            if boxes[li].space_left >= boxes[i].height
                && boxes[li].x + boxes[li].width + boxes[i].width + PADDING - width
                    <= FLOAT_EPSILON
            {
                host = Some(li);
                break;
            }
        }
        lines.push(i);
        if let Some(li) = host {
            boxes[i].x = boxes[li].x + boxes[li].width + PADDING;
            boxes[i].y = boxes[li].bottom;
            boxes[i].space_left = boxes[i].height;
            boxes[i].bottom = boxes[i].y;
            boxes[li].space_left -= boxes[i].height + PADDING;
            boxes[li].bottom += boxes[i].height + PADDING;
        } else {
            boxes[i].y = global_bottom;
            global_bottom += boxes[i].height + PADDING;
            boxes[i].x = 0.0;
            boxes[i].bottom = boxes[i].y;
            boxes[i].space_left = boxes[i].height;
        }
        real_height = real_height.max(boxes[i].y + boxes[i].height);
        real_width = real_width.max(boxes[i].x + boxes[i].width);
    }
    (real_width, real_height)
}
