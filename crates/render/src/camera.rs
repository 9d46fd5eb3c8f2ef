use glam::{Mat4, Vec3};
use raystage_common::{PropertyStore, Ray, Transform};

/// Pinhole camera looking down its local −Z axis with +Y up.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    to_world: Mat4,
    /// Half extents of the image plane at distance 1.
    half_width: f32,
    half_height: f32,
    znear: f32,
    zfar: f32,
}

impl Camera {
    /// Build from a `PerspectiveCamera` property store. `fov` is the vertical
    /// field of view in degrees.
    pub fn from_properties(props: &PropertyStore, aspect: f32) -> Self {
        let transform = Transform {
            translate: props.vec3_or("translate", Vec3::ZERO),
            rotate: props.vec3_or("rotate", Vec3::ZERO),
            ..Transform::default()
        };
        let fov = props.scalar_or("fov", 30.0).clamp(1e-3, 179.0);
        let half_height = (fov.to_radians() * 0.5).tan();
        Self {
            to_world: transform.matrix(),
            half_width: half_height * aspect,
            half_height,
            znear: props.scalar_or("znear", 0.01).max(0.0),
            zfar: props.scalar_or("zfar", 1000.0),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.to_world.transform_point3(Vec3::ZERO)
    }

    /// Camera ray through the image-plane point (`x`, `y`) in [-1, 1],
    /// +x right and +y up. The direction is unit length so `t` is distance.
    pub fn ray(&self, x: f32, y: f32) -> Ray {
        let local = Vec3::new(x * self.half_width, y * self.half_height, -1.0);
        let direction = self.to_world.transform_vector3(local).normalize();
        Ray::with_range(self.position(), direction, self.znear, self.zfar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raystage_common::PropertyValue;
    use raystage_kernel::schema::{PERSPECTIVE_CAMERA, camera_schema};

    fn props(entries: &[(&str, PropertyValue)]) -> PropertyStore {
        let schema = camera_schema(PERSPECTIVE_CAMERA).unwrap();
        let mut store = schema.defaults();
        for (key, value) in entries {
            schema.apply(&mut store, key, *value).unwrap();
        }
        store
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let cam = Camera::from_properties(&PropertyStore::new(), 1.0);
        let ray = cam.ray(0.0, 0.0);
        assert_eq!(ray.origin, Vec3::ZERO);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(ray.tmin, 0.01);
    }

    #[test]
    fn translated_and_turned_camera() {
        let store = props(&[
            ("translate", PropertyValue::vec3(0.0, 1.5, 7.0)),
            ("rotate", PropertyValue::vec3(0.0, 90.0, 0.0)),
        ]);
        let cam = Camera::from_properties(&store, 1.0);
        let ray = cam.ray(0.0, 0.0);
        assert!((ray.origin - Vec3::new(0.0, 1.5, 7.0)).length() < 1e-5);
        // yaw of +90 degrees turns -Z towards -X
        assert!((ray.direction - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn image_corners_follow_fov_and_aspect() {
        let store = props(&[("fov", PropertyValue::scalar(90.0))]);
        let cam = Camera::from_properties(&store, 2.0);
        let corner = cam.ray(1.0, 1.0).direction;
        let expected = Vec3::new(2.0, 1.0, -1.0).normalize();
        assert!((corner - expected).length() < 1e-5);
    }
}
