use egui::{Pos2, Vec2};

/// Affine transform stored as a row-major 3x3 matrix (last row `0 0 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2 {
    matrix: [[f32; 3]; 3],
}

impl Default for Transform2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform2 {
    pub const IDENTITY: Transform2 = Transform2 {
        matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translation(offset: Vec2) -> Self {
        Self {
            matrix: [[1.0, 0.0, offset.x], [0.0, 1.0, offset.y], [0.0, 0.0, 1.0]],
        }
    }

    pub fn scale(factor: f32) -> Self {
        Self {
            matrix: [[factor, 0.0, 0.0], [0.0, factor, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Clockwise rotation in screen space (y down) about `center`.
    pub fn rotation_about(center: Pos2, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let to_origin = Self::translation(-center.to_vec2());
        let rotate = Self {
            matrix: [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]],
        };
        let back = Self::translation(center.to_vec2());
        to_origin.then(&rotate).then(&back)
    }

    /// Compose: the result applies `self` first, then `next`.
    pub fn then(&self, next: &Transform2) -> Transform2 {
        Transform2 {
            matrix: multiply_matrices(&next.matrix, &self.matrix),
        }
    }

    pub fn apply(&self, p: Pos2) -> Pos2 {
        let m = &self.matrix;
        Pos2::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2],
            m[1][0] * p.x + m[1][1] * p.y + m[1][2],
        )
    }

    /// Rotation component, assuming no shear
    pub fn rotation_radians(&self) -> f32 {
        self.matrix[1][0].atan2(self.matrix[0][0])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Transform2> {
        let m = &self.matrix;
        let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
        if det.abs() <= f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = m[1][1] * inv_det;
        let b = -m[0][1] * inv_det;
        let c = -m[1][0] * inv_det;
        let d = m[0][0] * inv_det;
        Some(Transform2 {
            matrix: [
                [a, b, -(a * m[0][2] + b * m[1][2])],
                [c, d, -(c * m[0][2] + d * m[1][2])],
                [0.0, 0.0, 1.0],
            ],
        })
    }
}

fn multiply_matrices(a: &[[f32; 3]; 3], b: &[[f32; 3]; 3]) -> [[f32; 3]; 3] {
    let mut result = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            for k in 0..3 {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    result
}

pub fn rotate_point(p: Pos2, center: Pos2, degrees: f32) -> Pos2 {
    if degrees == 0.0 {
        return p;
    }
    Transform2::rotation_about(center, degrees).apply(p)
}

/// Maps a point from the rotated frame back into the object's local frame.
pub fn unrotate_point(p: Pos2, center: Pos2, degrees: f32) -> Pos2 {
    rotate_point(p, center, -degrees)
}
