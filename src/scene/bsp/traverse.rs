//! CPU ray queries over a [`FlatTree`], mirroring `shaders/bsp.wgsl`.

use crate::geometry::Mesh;
use crate::scene::bsp::FlatTree;
use glam::Vec3;

const EPSILON: f32 = 1e-7;

/// Deepest tree the traversal stack in `bsp.wgsl` (`MAX_STACK`) can walk
/// without dropping far children.
pub const MAX_TRAVERSAL_DEPTH: u32 = 32;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    pub t: f32,
    pub triangle: u32,
    pub u: f32,
    pub v: f32,
}

/// Möller–Trumbore. Returns `(t, u, v)` for hits in front of the origin.
pub fn intersect_triangle(origin: Vec3, dir: Vec3, [a, b, c]: [Vec3; 3]) -> Option<(f32, f32, f32)> {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t > EPSILON).then_some((t, u, v))
}

fn nearest<'a>(
    mesh: &Mesh,
    origin: Vec3,
    dir: Vec3,
    triangles: impl Iterator<Item = &'a u32>,
    mut best: Option<Hit>,
) -> Option<Hit> {
    for &triangle in triangles {
        if let Some((t, u, v)) = intersect_triangle(origin, dir, mesh.triangle(triangle as usize)) {
            if best.map_or(true, |b| t < b.t) {
                best = Some(Hit { t, triangle, u, v });
            }
        }
    }
    best
}

/// Tests every triangle of the mesh. Reference for [`FlatTree::closest_hit`].
pub fn brute_force_hit(mesh: &Mesh, origin: Vec3, dir: Vec3) -> Option<Hit> {
    let all: Vec<u32> = (0..mesh.triangle_count() as u32).collect();
    nearest(mesh, origin, dir, all.iter(), None)
}

impl FlatTree {
    /// Nearest triangle hit along the ray, visiting cells front to back.
    /// Holds at most [`MAX_TRAVERSAL_DEPTH`] pending cells, like the shader.
    pub fn closest_hit(&self, mesh: &Mesh, origin: Vec3, dir: Vec3) -> Option<Hit> {
        let (t_enter, t_exit) = self.bounds.ray_interval(origin, dir.recip())?;
        let mut best: Option<Hit> = None;
        let mut stack = Vec::with_capacity(MAX_TRAVERSAL_DEPTH as usize);
        stack.push((0u32, t_enter, t_exit));
        while let Some((mut id, t_min, mut t_max)) = stack.pop() {
            if best.is_some_and(|b| b.t < t_min) {
                break;
            }
            loop {
                let node = self.nodes[id as usize];
                let Some(axis) = node.axis() else {
                    break;
                };
                let axis = axis.index();
                let plane = self.planes[id as usize];
                let o = origin[axis];
                let d = dir[axis];
                let (near, far) = if o < plane || (o == plane && d <= 0.0) {
                    (node.left, node.right)
                } else {
                    (node.right, node.left)
                };
                if d == 0.0 {
                    id = near;
                    continue;
                }
                let t_split = (plane - o) / d;
                if t_split > t_max || t_split <= 0.0 {
                    id = near;
                } else if t_split < t_min {
                    id = far;
                } else {
                    if stack.len() < MAX_TRAVERSAL_DEPTH as usize {
                        stack.push((far, t_split, t_max));
                    }
                    id = near;
                    t_max = t_split;
                }
            }
            let leaf = &self.nodes[id as usize];
            best = nearest(mesh, origin, dir, self.leaf_slice(leaf).iter(), best);
            if best.is_some_and(|b| b.t <= t_max) {
                break;
            }
        }
        best
    }
}
