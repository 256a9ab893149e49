//! Externally owned regions of interest. The scheduler only observes them
//! through weak references and tolerates their disappearance.

use std::sync::RwLock;

use strata_geom::{Aabb, Vec3};

pub struct ViewSphere {
    center: RwLock<Vec3>,
    radius: f32,
}

impl ViewSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        debug_assert!(radius >= 0.0);
        Self {
            center: RwLock::new(center),
            radius,
        }
    }

    pub fn center(&self) -> Vec3 {
        *self.center.read().unwrap()
    }

    /// Moves the sphere; takes effect on the scheduler's next pass.
    pub fn set_center(&self, center: Vec3) {
        *self.center.write().unwrap() = center;
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::of_sphere(self.center(), self.radius)
    }
}
