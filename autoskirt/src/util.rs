use glam::{Mat3, Quat, Vec3};

/// Directions shorter than this (squared) are treated as zero and never normalised
pub const MIN_DIRECTION_LENGTH_SQUARED: f32 = 1e-4;

/// The rotation that takes local `primary_axis` onto `primary` and local `secondary_axis` as close
/// to `secondary` as possible.
///
/// If `primary` and `secondary` are parallel the roll about `primary` is undefined, and the
/// shortest arc from `primary_axis` to `primary` is used instead.
pub fn aim_rotation(
    primary_axis: Vec3,
    secondary_axis: Vec3,
    primary: Vec3,
    secondary: Vec3,
) -> Quat {
    let Some(target) = frame(primary, secondary) else {
        return Quat::from_rotation_arc(primary_axis.normalize(), primary.normalize());
    };
    let Some(local) = frame(primary_axis, secondary_axis) else {
        return Quat::from_rotation_arc(primary_axis.normalize(), primary.normalize());
    };

    (Quat::from_mat3(&target) * Quat::from_mat3(&local).inverse()).normalize()
}

/// Rotation whose local +Z points along `forward` with local +Y as close to `up` as possible
#[inline]
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    aim_rotation(Vec3::Z, Vec3::Y, forward, up)
}

fn frame(primary: Vec3, secondary: Vec3) -> Option<Mat3> {
    let primary = primary.try_normalize()?;
    let secondary = (secondary - primary * secondary.dot(primary)).try_normalize()?;
    Some(Mat3::from_cols(primary, secondary, primary.cross(secondary)))
}
