use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A rigid pose: position plus an xyzw quaternion orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl Pose {
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(
            Quat::from_xyzw(
                self.orientation[0],
                self.orientation[1],
                self.orientation[2],
                self.orientation[3],
            ),
            Vec3::from(self.position),
        )
    }

    pub fn from_mat4(mat: &Mat4) -> Self {
        let (_, rotation, translation) = mat.to_scale_rotation_translation();
        Self {
            position: translation.to_array(),
            orientation: rotation.to_array(),
        }
    }
}

/// Identity the application presents to the runtime at instance creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub name: String,
    pub version: u32,
    pub engine_name: String,
    pub engine_version: u32,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "slate".to_string(),
            version: 1,
            engine_name: "slate".to_string(),
            engine_version: 1,
        }
    }
}

/// Physical and backing-texture dimensions of the UI panel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Physical width of the quad in meters.
    pub width_meters: f32,
    /// Physical height of the quad in meters.
    pub height_meters: f32,
    /// Backing texture width in pixels.
    pub texture_width: u32,
    /// Backing texture height in pixels.
    pub texture_height: u32,
    /// Target content refresh rate in Hz.
    pub refresh_rate_hz: f32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width_meters: 1.6,
            height_meters: 1.0,
            texture_width: 1280,
            texture_height: 800,
            refresh_rate_hz: 120.0,
        }
    }
}

impl PanelConfig {
    /// Target interval between content redraws, in microseconds.
    pub fn frame_interval_us(&self) -> u64 {
        if self.refresh_rate_hz <= 0.0 {
            return u64::MAX;
        }
        (1_000_000.0 / self.refresh_rate_hz) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_mat4_round_trip() {
        let pose = Pose {
            position: [1.0, 2.0, -3.0],
            orientation: Quat::from_rotation_y(0.7).to_array(),
        };
        let back = Pose::from_mat4(&pose.to_mat4());
        for i in 0..3 {
            assert!((pose.position[i] - back.position[i]).abs() < 1e-5);
        }
        for i in 0..4 {
            assert!((pose.orientation[i] - back.orientation[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn frame_interval_matches_refresh_rate() {
        let config = PanelConfig {
            refresh_rate_hz: 120.0,
            ..Default::default()
        };
        assert_eq!(config.frame_interval_us(), 8_333);

        let stopped = PanelConfig {
            refresh_rate_hz: 0.0,
            ..Default::default()
        };
        assert_eq!(stopped.frame_interval_us(), u64::MAX);
    }
}
