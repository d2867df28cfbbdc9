use nalgebra::Vector3;

use super::Ray;

/// Fraction of the remaining distance covered per frame while flying.
pub const FLY_DAMPING: f64 = 0.08;
/// Flight ends once the camera is this close to its target.
pub const FLY_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyTarget {
    pub position: Vector3<f64>,
    pub look_at: Vector3<f64>,
}

impl FlyTarget {
    /// Hover `offset` away from `subject`, looking at it.
    pub fn facing(subject: Vector3<f64>, offset: Vector3<f64>) -> Self {
        Self {
            position: subject + offset,
            look_at: subject,
        }
    }
}

/// Perspective camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vector3<f64>,
    pub look_at: Vector3<f64>,
    pub up: Vector3<f64>,
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 120.0),
            look_at: Vector3::zeros(),
            up: Vector3::y(),
            fov_deg: 75.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 10_000.0,
        }
    }
}

impl Camera {
    /// Move a damped step toward `target` and face its look point.
    /// Returns the distance left to the target position.
    pub fn step_toward(&mut self, target: &FlyTarget, damping: f64) -> f64 {
        self.position += (target.position - self.position) * damping;
        self.look_at = target.look_at;
        (target.position - self.position).norm()
    }

    fn basis(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let forward = (self.look_at - self.position)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| -Vector3::z());
        let right = forward
            .cross(&self.up)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::x);
        let up = right.cross(&forward);
        (forward, right, up)
    }

    /// Ray from the eye through a point in normalized device coordinates
    /// (x right, y up, both in [-1, 1]).
    pub fn ray_through(&self, ndc_x: f64, ndc_y: f64) -> Ray {
        let (forward, right, up) = self.basis();
        let half_h = (self.fov_deg.to_radians() * 0.5).tan();
        let half_w = half_h * self.aspect;
        let dir = forward + right * (ndc_x * half_w) + up * (ndc_y * half_h);
        Ray::new(self.position, dir)
    }
}

/// Output surface size in CSS pixels plus the device pixel density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            device_pixel_ratio: 1.0,
        }
    }
}

impl Viewport {
    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn to_ndc(&self, x: f64, y: f64) -> (f64, f64) {
        let w = self.width.max(1.0);
        let h = self.height.max(1.0);
        ((x / w) * 2.0 - 1.0, -(y / h) * 2.0 + 1.0)
    }

    pub fn to_pixels(&self, ndc_x: f64, ndc_y: f64) -> (f64, f64) {
        (
            (ndc_x + 1.0) * 0.5 * self.width,
            (-ndc_y + 1.0) * 0.5 * self.height,
        )
    }
}
