/// a complex number
pub type Complex = nalgebra::Complex<f32>;
/// 3-dimensional column vector.
pub type Vector3 = nalgebra::Vector3<f32>;
/// 3-dimensional unit vector.
pub type UnitVector3 = nalgebra::UnitVector3<f32>;
/// 3-dimensional point.
pub type Point3 = nalgebra::Point3<f32>;

/// Rounds every coordinate of `p` to `decimals` decimal places.
#[must_use]
pub fn round_point(p: &Point3, decimals: i32) -> Point3 {
    let scale = 10f32.powi(decimals);
    p.map(|v| (v * scale).round() / scale)
}
