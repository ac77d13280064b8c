//! Conversions between OpenXR pose types and `glam` linear algebra.

use glam::{Mat4, Quat, Vec3};
use openxr as xr;

pub const IDENTITY_POSE: xr::Posef = xr::Posef {
    orientation: xr::Quaternionf {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    },
    position: xr::Vector3f {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    },
};

pub fn quat_from_xr(q: xr::Quaternionf) -> Quat {
    Quat::from_xyzw(q.x, q.y, q.z, q.w)
}

pub fn quat_to_xr(q: Quat) -> xr::Quaternionf {
    xr::Quaternionf {
        x: q.x,
        y: q.y,
        z: q.z,
        w: q.w,
    }
}

pub fn vec3_from_xr(v: xr::Vector3f) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn vec3_to_xr(v: Vec3) -> xr::Vector3f {
    xr::Vector3f {
        x: v.x,
        y: v.y,
        z: v.z,
    }
}

/// Rigid transform matrix of a runtime pose.
pub fn pose_to_mat4(pose: &xr::Posef) -> Mat4 {
    Mat4::from_rotation_translation(quat_from_xr(pose.orientation), vec3_from_xr(pose.position))
}

/// Decompose a world transform back into a runtime pose.
pub fn mat4_to_pose(mat: &Mat4) -> xr::Posef {
    let (_, rotation, translation) = mat.to_scale_rotation_translation();
    xr::Posef {
        orientation: quat_to_xr(rotation.normalize()),
        position: vec3_to_xr(translation),
    }
}

/// Rotate an orientation half a turn about its local Y axis.
///
/// Panel content is authored facing the opposite winding, so the quad's
/// orientation gets this fixed correction before submission.
pub fn yaw_flip(orientation: xr::Quaternionf) -> xr::Quaternionf {
    let flipped = quat_from_xr(orientation) * Quat::from_rotation_y(std::f32::consts::PI);
    quat_to_xr(flipped.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_round_trip() {
        let pose = xr::Posef {
            orientation: quat_to_xr(Quat::from_rotation_y(1.1)),
            position: xr::Vector3f {
                x: 0.5,
                y: 1.5,
                z: -2.0,
            },
        };
        let back = mat4_to_pose(&pose_to_mat4(&pose));
        assert!((back.position.x - pose.position.x).abs() < 1e-5);
        assert!((back.position.y - pose.position.y).abs() < 1e-5);
        assert!((back.position.z - pose.position.z).abs() < 1e-5);
        let a = quat_from_xr(pose.orientation);
        let b = quat_from_xr(back.orientation);
        assert!(a.angle_between(b) < 1e-4);
    }

    #[test]
    fn yaw_flip_reverses_forward() {
        let flipped = yaw_flip(IDENTITY_POSE.orientation);
        let forward = quat_from_xr(flipped) * Vec3::NEG_Z;
        assert!((forward - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn double_yaw_flip_is_identity() {
        let base = quat_to_xr(Quat::from_rotation_y(0.4));
        let twice = yaw_flip(yaw_flip(base));
        let a = quat_from_xr(base);
        let b = quat_from_xr(twice);
        assert!(a.angle_between(b) < 1e-4);
    }
}
