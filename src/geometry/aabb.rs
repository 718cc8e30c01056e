use crate::geometry::Mesh;
use glam::Vec3;

/// Axis-aligned bounding box. `Aabb::empty()` is the only box with `min > max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Overlap of two boxes; empty when they are disjoint.
    pub fn intersection(&self, other: &Aabb) -> Aabb {
        let ret = Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        };
        if ret.is_empty() {
            Aabb::empty()
        } else {
            ret
        }
    }

    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Index of the widest axis. Exact ties go to x, then y, then z.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    /// Parametric entry/exit of a ray against the box, clamped to `t >= 0`.
    pub fn ray_interval(&self, origin: Vec3, inv_dir: Vec3) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }
        let mut t_enter = 0.0f32;
        let mut t_exit = f32::INFINITY;
        for axis in 0..3 {
            let t0 = (self.min[axis] - origin[axis]) * inv_dir[axis];
            let t1 = (self.max[axis] - origin[axis]) * inv_dir[axis];
            // 0 * inf: the ray runs along a face of this slab
            if t0.is_nan() || t1.is_nan() {
                continue;
            }
            t_enter = t_enter.max(t0.min(t1));
            t_exit = t_exit.min(t0.max(t1));
        }
        (t_enter <= t_exit).then_some((t_enter, t_exit))
    }
}

/// Tight box around every vertex of the given triangles.
pub fn compute_aabb(triangles: &[u32], mesh: &Mesh) -> Aabb {
    triangles.iter().fold(Aabb::empty(), |acc, &t| {
        acc.union(&mesh.triangle_bounds(t as usize))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_is_invalid() {
        let b = Aabb::empty();
        assert!(b.is_empty());
        assert_eq!(b.extent(), Vec3::ZERO);
        assert!(!b.contains(Vec3::ZERO));
    }

    #[test]
    fn flat_box_is_valid() {
        let mut b = Aabb::empty();
        b.grow(Vec3::new(0.0, 0.0, 1.0));
        b.grow(Vec3::new(2.0, 3.0, 1.0));
        assert!(!b.is_empty());
        assert_eq!(b.extent(), Vec3::new(2.0, 3.0, 0.0));
        assert_eq!(b.longest_axis(), 1);
    }

    #[test]
    fn longest_axis_ties_prefer_lower_axis() {
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::ONE).longest_axis(), 0);
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 2.0, 2.0)).longest_axis(), 1);
        assert_eq!(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 2.0)).longest_axis(), 2);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(a.intersection(&b).is_empty());
        let c = Aabb::new(Vec3::splat(0.5), Vec3::splat(3.0));
        assert_eq!(a.intersection(&c), Aabb::new(Vec3::splat(0.5), Vec3::ONE));
    }

    #[test]
    fn ray_interval_hits_and_misses() {
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let origin = Vec3::new(0.0, 0.0, 5.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);
        let (t0, t1) = b.ray_interval(origin, dir.recip()).unwrap();
        assert!((t0 - 4.0).abs() < 1e-6);
        assert!((t1 - 6.0).abs() < 1e-6);
        let miss = Vec3::new(3.0, 0.0, 5.0);
        assert!(b.ray_interval(miss, dir.recip()).is_none());
        assert!(Aabb::empty().ray_interval(origin, dir.recip()).is_none());
    }

    #[test]
    fn ray_interval_near_parallel_axes() {
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        // on the x = 1 face, parallel to it
        let on_face = Vec3::new(1.0, 0.0, 5.0);
        let (t0, t1) = b.ray_interval(on_face, Vec3::NEG_Z.recip()).unwrap();
        assert!((t0 - 4.0).abs() < 1e-6);
        assert!((t1 - 6.0).abs() < 1e-6);
        // a tiny negative component keeps its sign
        let dir = Vec3::new(-1e-8, 0.0, -1.0);
        let (t0, t1) = b.ray_interval(Vec3::new(0.99, 0.0, 5.0), dir.recip()).unwrap();
        assert!((t0 - 4.0).abs() < 1e-6);
        assert!((t1 - 6.0).abs() < 1e-6);
        assert!(b.ray_interval(Vec3::new(1.5, 0.0, 5.0), dir.recip()).is_none());
    }
}
