use glam::Vec3;

pub const ATTENUATION_CONSTANT: f32 = 1.0;
pub const ATTENUATION_LINEAR: f32 = 0.09;
pub const ATTENUATION_QUADRATIC: f32 = 0.032;

/// Position, color and a direction that is kept unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    position: Vec3,
    color: Vec3,
    direction: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            direction: Vec3::NEG_Y,
        }
    }
}

impl Light {
    pub fn new(position: Vec3, color: Vec3, direction: Vec3) -> Self {
        let mut light = Self {
            position,
            color,
            ..Default::default()
        };
        light.set_direction(direction);
        light
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// A zero or non-finite vector has no direction, the previous one is kept.
    pub fn set_direction(&mut self, direction: Vec3) {
        if let Some(direction) = direction.try_normalize() {
            self.direction = direction;
        }
    }

    pub fn calculate_attenuation(&self, distance: f32) -> f32 {
        1.0 / (ATTENUATION_CONSTANT
            + ATTENUATION_LINEAR * distance
            + ATTENUATION_QUADRATIC * distance * distance)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn direction_is_normalized_on_construction() {
        let light = Light::new(Vec3::ZERO, Vec3::ONE, Vec3::new(0.0, -4.0, 0.0));
        assert_eq!(light.direction(), Vec3::NEG_Y);
    }

    #[test]
    fn set_direction_keeps_orientation_not_magnitude() {
        let mut light = Light::default();
        for dir in [
            Vec3::new(3.0, 4.0, 0.0),
            Vec3::new(-0.2, -1.0, -0.3),
            Vec3::new(1e-3, 0.0, 2e-3),
            Vec3::new(100.0, -250.0, 12.0),
        ] {
            light.set_direction(dir);
            let got = light.direction();
            assert_relative_eq!(got.length(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(got.dot(dir.normalize()), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn zero_direction_is_ignored() {
        let mut light = Light::default();
        light.set_direction(Vec3::X);
        light.set_direction(Vec3::ZERO);
        assert_eq!(light.direction(), Vec3::X);

        let light = Light::new(Vec3::ZERO, Vec3::ONE, Vec3::ZERO);
        assert_eq!(light.direction(), Vec3::NEG_Y);
    }

    #[test]
    fn attenuation_starts_at_inverse_constant() {
        let light = Light::default();
        assert_eq!(light.calculate_attenuation(0.0), 1.0 / ATTENUATION_CONSTANT);
    }

    #[test]
    fn attenuation_strictly_decreases_with_distance() {
        let light = Light::default();
        let mut previous = light.calculate_attenuation(0.0);
        for step in 1..500 {
            let current = light.calculate_attenuation(step as f32 * 0.25);
            assert!(current < previous);
            previous = current;
        }
        assert_relative_eq!(
            light.calculate_attenuation(10.0),
            1.0 / (1.0 + 0.9 + 3.2),
            epsilon = 1e-6
        );
    }
}
