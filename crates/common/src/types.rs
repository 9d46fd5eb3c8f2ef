use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Linear RGB color or radiance.
pub type Color = Vec3;

/// Order in which scale (S), rotate (R) and translate (T) are applied.
/// The first letter is applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransformOrder {
    #[default]
    Srt,
    Str,
    Rst,
    Rts,
    Trs,
    Tsr,
}

impl TransformOrder {
    pub const ALL: [Self; 6] = [
        Self::Srt,
        Self::Str,
        Self::Rst,
        Self::Rts,
        Self::Trs,
        Self::Tsr,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Order in which the Euler rotations are applied. The first axis is applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RotateOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl RotateOrder {
    pub const ALL: [Self; 6] = [
        Self::Xyz,
        Self::Xzy,
        Self::Yxz,
        Self::Yzx,
        Self::Zxy,
        Self::Zyx,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Spatial transform: translate, Euler rotate (degrees), scale, plus the
/// orders they compose in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translate: Vec3,
    pub rotate: Vec3,
    pub scale: Vec3,
    pub transform_order: TransformOrder,
    pub rotate_order: RotateOrder,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translate: Vec3::ZERO,
            rotate: Vec3::ZERO,
            scale: Vec3::ONE,
            transform_order: TransformOrder::default(),
            rotate_order: RotateOrder::default(),
        }
    }
}

impl Transform {
    /// Object-to-world matrix.
    pub fn matrix(&self) -> Mat4 {
        let t = Mat4::from_translation(self.translate);
        let r = self.rotation_matrix();
        let s = Mat4::from_scale(self.scale);
        // Column vectors: the operation applied first sits rightmost.
        match self.transform_order {
            TransformOrder::Srt => t * r * s,
            TransformOrder::Str => r * t * s,
            TransformOrder::Rst => t * s * r,
            TransformOrder::Rts => s * t * r,
            TransformOrder::Trs => s * r * t,
            TransformOrder::Tsr => r * s * t,
        }
    }

    fn rotation_matrix(&self) -> Mat4 {
        let rx = Mat4::from_rotation_x(self.rotate.x.to_radians());
        let ry = Mat4::from_rotation_y(self.rotate.y.to_radians());
        let rz = Mat4::from_rotation_z(self.rotate.z.to_radians());
        match self.rotate_order {
            RotateOrder::Xyz => rz * ry * rx,
            RotateOrder::Xzy => ry * rz * rx,
            RotateOrder::Yxz => rz * rx * ry,
            RotateOrder::Yzx => rx * rz * ry,
            RotateOrder::Zxy => ry * rx * rz,
            RotateOrder::Zyx => rx * ry * rz,
        }
    }
}

/// A half-open ray segment `origin + t * direction` for `t` in `[tmin, tmax)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub tmin: f32,
    pub tmax: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            tmin: 0.0,
            tmax: f32::INFINITY,
        }
    }

    pub fn with_range(origin: Vec3, direction: Vec3, tmin: f32, tmax: f32) -> Self {
        Self {
            origin,
            direction,
            tmin,
            tmax,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The same ray expressed in another space. The direction is not
    /// renormalized so `t` stays comparable across spaces.
    pub fn transformed(&self, m: &Mat4) -> Self {
        Self {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3(self.direction),
            tmin: self.tmin,
            tmax: self.tmax,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(-f32::MAX),
    };

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |b, p| b.with_point(p))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn with_point(self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Index of the longest axis (0 = x, 1 = y, 2 = z).
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

    /// Bounds of this box after transformation by `m`.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let (lo, hi) = (self.min, self.max);
        Self::from_points((0..8).map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            m.transform_point3(corner)
        }))
    }

    /// Slab test. Returns the entry and exit distances clipped to the ray range.
    pub fn intersect(&self, ray: &Ray, inv_dir: Vec3) -> Option<(f32, f32)> {
        let t0 = (self.min - ray.origin) * inv_dir;
        let t1 = (self.max - ray.origin) * inv_dir;
        let near = t0.min(t1).max_element().max(ray.tmin);
        let far = t0.max(t1).min_element().min(ray.tmax);
        (near <= far).then_some((near, far))
    }
}
