//! Bounding volume hierarchies and ray/triangle intersection.

use glam::Vec3;
use raystage_assets::MeshData;
use raystage_common::{Aabb, Ray};
use std::sync::Arc;

const LEAF_SIZE: usize = 4;
const EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, Copy)]
struct Node {
    bounds: Aabb,
    /// First primitive slot for leaves, left child index for interior nodes.
    first: u32,
    /// Primitive count; 0 marks an interior node whose children are `first`
    /// and `first + 1`.
    count: u32,
}

/// Binary BVH over a set of primitive bounds, median split on the longest
/// centroid axis.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
    indices: Vec<u32>,
}

impl Bvh {
    pub fn build(prim_bounds: &[Aabb]) -> Self {
        let mut bvh = Self {
            nodes: Vec::with_capacity(prim_bounds.len() * 2),
            indices: (0..prim_bounds.len() as u32).collect(),
        };
        if prim_bounds.is_empty() {
            return bvh;
        }
        let centroids: Vec<Vec3> = prim_bounds.iter().map(Aabb::centroid).collect();
        bvh.nodes.push(Node {
            bounds: Aabb::EMPTY,
            first: 0,
            count: 0,
        });
        bvh.subdivide(0, 0, prim_bounds.len(), prim_bounds, &centroids);
        bvh
    }

    fn subdivide(
        &mut self,
        node: usize,
        start: usize,
        end: usize,
        prim_bounds: &[Aabb],
        centroids: &[Vec3],
    ) {
        let slots = &mut self.indices[start..end];
        self.nodes[node].bounds = slots
            .iter()
            .fold(Aabb::EMPTY, |b, &i| b.union(prim_bounds[i as usize]));

        let count = end - start;
        let spread = Aabb::from_points(slots.iter().map(|&i| centroids[i as usize]));
        let axis = spread.longest_axis();
        if count <= LEAF_SIZE || spread.extent()[axis] <= 0.0 {
            self.nodes[node].first = start as u32;
            self.nodes[node].count = count as u32;
            return;
        }

        let half = count / 2;
        slots.select_nth_unstable_by(half, |&a, &b| {
            centroids[a as usize][axis].total_cmp(&centroids[b as usize][axis])
        });

        let left = self.nodes.len();
        let placeholder = Node {
            bounds: Aabb::EMPTY,
            first: 0,
            count: 0,
        };
        self.nodes.push(placeholder);
        self.nodes.push(placeholder);
        self.nodes[node].first = left as u32;
        self.subdivide(left, start, start + half, prim_bounds, centroids);
        self.subdivide(left + 1, start + half, end, prim_bounds, centroids);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map_or(Aabb::EMPTY, |n| n.bounds)
    }

    /// Number of nodes in the hierarchy.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Visit primitives along `ray` front to back.
    ///
    /// `hit` receives the primitive index and the ray clipped to the closest
    /// hit so far, and returns the hit distance when the primitive is hit
    /// closer than that. Returns the closest distance found.
    pub fn closest(
        &self,
        ray: &Ray,
        mut hit: impl FnMut(usize, &Ray) -> Option<f32>,
    ) -> Option<f32> {
        let mut ray = *ray;
        let mut closest = None;
        self.walk(&mut ray, |prim, ray| {
            if let Some(t) = hit(prim, ray) {
                if t < ray.tmax {
                    ray.tmax = t;
                    closest = Some(t);
                }
            }
            false
        });
        closest
    }

    /// Whether any primitive accepted by `hit` lies along `ray`.
    pub fn any(&self, ray: &Ray, mut hit: impl FnMut(usize, &Ray) -> bool) -> bool {
        let mut ray = *ray;
        self.walk(&mut ray, |prim, ray| hit(prim, ray))
    }

    /// Stack traversal. `visit` may shorten the ray; returning true stops
    /// the walk.
    fn walk(&self, ray: &mut Ray, mut visit: impl FnMut(usize, &mut Ray) -> bool) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let inv_dir = ray.direction.recip();
        let mut stack = Vec::with_capacity(64);
        stack.push(0u32);
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.bounds.intersect(ray, inv_dir).is_none() {
                continue;
            }
            if node.count > 0 {
                let start = node.first as usize;
                for &prim in &self.indices[start..start + node.count as usize] {
                    if visit(prim as usize, ray) {
                        return true;
                    }
                }
                continue;
            }
            let (left, right) = (node.first, node.first + 1);
            let near_left = self.nodes[left as usize].bounds.intersect(ray, inv_dir);
            let near_right = self.nodes[right as usize].bounds.intersect(ray, inv_dir);
            match (near_left, near_right) {
                (Some((l, _)), Some((r, _))) => {
                    // nearer child is popped first
                    if l <= r {
                        stack.push(right);
                        stack.push(left);
                    } else {
                        stack.push(left);
                        stack.push(right);
                    }
                }
                (Some(_), None) => stack.push(left),
                (None, Some(_)) => stack.push(right),
                (None, None) => {}
            }
        }
        false
    }
}

/// Ray/triangle hit: distance and barycentric coordinates of corners 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// Möller–Trumbore intersection, both faces, within the ray's range.
pub fn intersect_triangle(ray: &Ray, [p0, p1, p2]: [Vec3; 3]) -> Option<TriangleHit> {
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let p = ray.direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - p0;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t > ray.tmin && t < ray.tmax).then_some(TriangleHit { t, u, v })
}

/// A closest hit against one mesh, in the mesh's object space.
#[derive(Debug, Clone, Copy)]
pub struct MeshHit {
    pub t: f32,
    pub triangle: usize,
    pub u: f32,
    pub v: f32,
}

/// Mesh geometry with its triangle BVH. Shared by every instance of the mesh.
#[derive(Debug)]
pub struct MeshAccel {
    mesh: Arc<MeshData>,
    bvh: Bvh,
}

impl MeshAccel {
    pub fn build(mesh: Arc<MeshData>) -> Self {
        let bounds: Vec<Aabb> = (0..mesh.triangle_count())
            .map(|i| Aabb::from_points(mesh.triangle(i)))
            .collect();
        let bvh = Bvh::build(&bounds);
        Self { mesh, bvh }
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn bounds(&self) -> Aabb {
        self.bvh.bounds()
    }

    pub fn intersect(&self, ray: &Ray) -> Option<MeshHit> {
        let mut best = None;
        self.bvh.closest(ray, |tri, ray| {
            let hit = intersect_triangle(ray, self.mesh.triangle(tri))?;
            best = Some(MeshHit {
                t: hit.t,
                triangle: tri,
                u: hit.u,
                v: hit.v,
            });
            Some(hit.t)
        });
        best
    }

    pub fn occludes(&self, ray: &Ray) -> bool {
        self.bvh
            .any(ray, |tri, ray| intersect_triangle(ray, self.mesh.triangle(tri)).is_some())
    }

    /// Geometric normal and interpolated shading normal of a hit, object space.
    pub fn normals(&self, hit: &MeshHit) -> (Vec3, Vec3) {
        let [p0, p1, p2] = self.mesh.triangle(hit.triangle);
        let geometric = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        let shading = self
            .mesh
            .triangle_normals(hit.triangle)
            .map(|[n0, n1, n2]| {
                (n0 * (1.0 - hit.u - hit.v) + n1 * hit.u + n2 * hit.v).normalize_or_zero()
            })
            .filter(|n| *n != Vec3::ZERO)
            .unwrap_or(geometric);
        (geometric, shading)
    }
}
