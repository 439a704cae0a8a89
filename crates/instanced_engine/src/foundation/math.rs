//! Math utilities and types
//!
//! Provides the math types used for instance transforms. Matrices are
//! column-major `f32`, matching the layout shaders read from a uniform buffer.

pub use nalgebra::{
    Vector3, Vector4,
    Matrix4,
    Rotation3,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Size in bytes of one column-major 4x4 `f32` matrix
pub const MAT4_SIZE: u64 = std::mem::size_of::<[f32; 16]>() as u64;

/// Round `value` up to the next multiple of `alignment`
///
/// Works for any non-zero alignment, not only powers of two. An alignment
/// of zero is treated as one.
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    let alignment = if alignment == 0 { 1 } else { alignment };
    value.div_ceil(alignment) * alignment
}

/// Column-major float array for a matrix, as laid out in GPU memory
pub fn mat4_to_columns(matrix: &Mat4) -> [f32; 16] {
    let mut columns = [0.0; 16];
    columns.copy_from_slice(matrix.as_slice());
    columns
}

/// Build a matrix from a column-major float array
pub fn mat4_from_columns(columns: &[f32; 16]) -> Mat4 {
    Mat4::from_column_slice(columns)
}

/// Translation part of an affine transform
pub fn translation_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)])
}

/// Right-multiply `matrix` by a translation
pub fn compose_translation(matrix: &Mat4, offset: &Vec3) -> Mat4 {
    matrix * Mat4::new_translation(offset)
}

/// Right-multiply `matrix` by a non-uniform scale
pub fn compose_scale(matrix: &Mat4, factors: &Vec3) -> Mat4 {
    matrix * Mat4::new_nonuniform_scaling(factors)
}

/// Right-multiply `matrix` by a rotation of `angle` radians about `axis`
///
/// Returns `None` when the axis has no usable direction.
pub fn compose_rotation(matrix: &Mat4, axis: &Vec3, angle: f32) -> Option<Mat4> {
    let axis = Unit::try_new(*axis, f32::EPSILON)?;
    Some(matrix * Rotation3::from_axis_angle(&axis, angle).to_homogeneous())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_align_up_rounds_to_alignment_not_max() {
        assert_eq!(align_up(64, 64), 64);
        assert_eq!(align_up(64, 256), 256);
        assert_eq!(align_up(65, 64), 128);
        assert_eq!(align_up(64, 48), 96);
        assert_eq!(align_up(64, 0), 64);
    }

    #[test]
    fn test_translation_survives_rotation() {
        let placed = compose_translation(&Mat4::identity(), &Vec3::new(7.5, 0.0, -2.0));
        let spun = compose_rotation(&placed, &Vec3::y(), 1.2).expect("rotation");

        assert_relative_eq!(translation_of(&spun), Vec3::new(7.5, 0.0, -2.0));
        assert_eq!(translation_of(&Mat4::identity()), Vec3::zeros());
    }

    #[test]
    fn test_column_major_layout() {
        let matrix = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let columns = mat4_to_columns(&matrix);

        // Translation lives in the last column
        assert_eq!(&columns[12..16], &[1.0, 2.0, 3.0, 1.0]);
        assert_eq!(mat4_from_columns(&columns), matrix);
    }

    #[test]
    fn test_composition_is_right_multiplication() {
        let scaled = compose_scale(&Mat4::identity(), &Vec3::new(2.0, 2.0, 2.0));
        let moved = compose_translation(&scaled, &Vec3::new(1.0, 0.0, 0.0));

        // Translation happens in the scaled local frame
        let origin = moved.transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(origin.x, 2.0);
    }

    #[test]
    fn test_rotation_rejects_zero_axis() {
        assert!(compose_rotation(&Mat4::identity(), &Vec3::zeros(), 1.0).is_none());

        let quarter = compose_rotation(&Mat4::identity(), &Vec3::z(), std::f32::consts::FRAC_PI_2)
            .expect("unit axis");
        let x = quarter.transform_vector(&Vec3::x());
        assert_relative_eq!(x, Vec3::y(), epsilon = 1e-6);
    }
}
