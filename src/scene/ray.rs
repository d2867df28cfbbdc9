use nalgebra::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f64>,
    /// Unit length.
    pub direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Vector3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            origin,
            direction: direction
                .try_normalize(f64::EPSILON)
                .unwrap_or_else(|| -Vector3::z()),
        }
    }

    /// Distance along the ray to the first hit on a sphere, if any.
    /// A ray starting inside the sphere hits at its exit point.
    pub fn intersect_sphere(&self, center: &Vector3<f64>, radius: f64) -> Option<f64> {
        let oc = self.origin - center;
        let b = oc.dot(&self.direction);
        let c = oc.norm_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let near = -b - sqrt_disc;
        let far = -b + sqrt_disc;
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            Some(far)
        } else {
            None
        }
    }
}
