//! Panel positioning strategies: compute the panel's world transform from
//! the current head transform.

use std::f32::consts::PI;
use std::time::Duration;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Computes the panel's world transform from the head transform and the
/// wall-clock delta since the previous update.
pub trait PanelPositioner: Send {
    fn locate(&mut self, head: &Mat4, dt: Duration) -> Mat4;
}

/// Rigid HUD attachment: a fixed offset from the head.
pub struct HudPositioner {
    offset: Mat4,
}

impl HudPositioner {
    pub fn new(offset: Mat4) -> Self {
        Self { offset }
    }
}

impl PanelPositioner for HudPositioner {
    fn locate(&mut self, head: &Mat4, _dt: Duration) -> Mat4 {
        *head * self.offset
    }
}

/// A fixed point in the world, independent of the head.
pub struct FixedPointPositioner {
    transform: Mat4,
}

impl FixedPointPositioner {
    pub fn new(point: Vec3) -> Self {
        Self {
            transform: Mat4::from_translation(point),
        }
    }
}

impl PanelPositioner for FixedPointPositioner {
    fn locate(&mut self, _head: &Mat4, _dt: Duration) -> Mat4 {
        self.transform
    }
}

/// Tuning for [`SlowTurnPositioner`].
///
/// The defaults are the empirically tuned values from the reference panel;
/// they are parameters rather than constants because the exact numbers are
/// feel-tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowTurnConfig {
    /// Head yaw past this angle (radians) since the last retarget starts a
    /// new turn.
    pub retarget_threshold_rad: f32,
    /// While a turn is in progress, keep tracking the head until the panel
    /// is within this angle (radians) of its target.
    pub hysteresis_rad: f32,
    /// Exponential decay rate of the approach, per millisecond.
    pub decay_per_ms: f32,
}

impl Default for SlowTurnConfig {
    fn default() -> Self {
        Self {
            retarget_threshold_rad: 40.0_f32.to_radians(),
            hysteresis_rad: 10.0_f32.to_radians(),
            decay_per_ms: 0.005,
        }
    }
}

/// Follows the head's yaw with hysteresis: the panel holds still for small
/// head movements, and glides to re-center once the head has turned far
/// enough, easing in with an exponential time decay.
pub struct SlowTurnPositioner {
    distance_m: f32,
    config: SlowTurnConfig,
    current: Quat,
    target: Quat,
    anchor_yaw: f32,
    turning: bool,
}

/// Angular gap below which a turn counts as converged.
const CONVERGED_EPS_RAD: f32 = 1e-3;

impl SlowTurnPositioner {
    pub fn new(distance_m: f32, config: SlowTurnConfig) -> Self {
        Self {
            distance_m,
            config,
            current: Quat::IDENTITY,
            target: Quat::IDENTITY,
            anchor_yaw: 0.0,
            turning: false,
        }
    }

    /// Yaw of the head's forward axis projected onto the horizontal plane.
    fn head_yaw(head: &Mat4) -> f32 {
        let forward = head.transform_vector3(Vec3::NEG_Z);
        if forward.x.abs() < f32::EPSILON && forward.z.abs() < f32::EPSILON {
            // Looking straight up or down; keep the previous heading.
            return f32::NAN;
        }
        (-forward.x).atan2(-forward.z)
    }

    /// Current angular distance between the panel and its target, radians.
    pub fn angle_to_target(&self) -> f32 {
        self.current.angle_between(self.target)
    }

    pub fn target(&self) -> Quat {
        self.target
    }
}

impl PanelPositioner for SlowTurnPositioner {
    fn locate(&mut self, head: &Mat4, dt: Duration) -> Mat4 {
        let yaw = Self::head_yaw(head);
        if !yaw.is_nan() {
            let turned = wrap_angle(yaw - self.anchor_yaw).abs();
            let mid_turn = self.turning && self.angle_to_target() > self.config.hysteresis_rad;
            if turned > self.config.retarget_threshold_rad || mid_turn {
                self.target = Quat::from_rotation_y(yaw);
                self.anchor_yaw = yaw;
                self.turning = true;
            }
        }

        if self.angle_to_target() < CONVERGED_EPS_RAD {
            self.current = self.target;
            self.turning = false;
        }

        let decay = (-(dt.as_secs_f32() * 1000.0) * self.config.decay_per_ms).exp();
        self.current = self.target.slerp(self.current, decay).normalize();

        let head_position = head.w_axis.truncate();
        let position = head_position + self.current * Vec3::new(0.0, 0.0, -self.distance_m);
        Mat4::from_rotation_translation(self.current, position)
    }
}

/// Wrap an angle into (-PI, PI].
fn wrap_angle(mut angle: f32) -> f32 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: Duration = Duration::from_millis(16);

    fn head_at_yaw(yaw_deg: f32) -> Mat4 {
        Mat4::from_rotation_y(yaw_deg.to_radians())
    }

    #[test]
    fn hud_follows_head_rigidly() {
        let offset = Mat4::from_translation(Vec3::new(0.0, -0.2, -1.0));
        let mut positioner = HudPositioner::new(offset);
        let head = Mat4::from_translation(Vec3::new(1.0, 1.5, 0.0));
        let result = positioner.locate(&head, DT);
        assert_eq!(result, head * offset);
    }

    #[test]
    fn fixed_point_ignores_head() {
        let mut positioner = FixedPointPositioner::new(Vec3::new(0.0, 1.0, -2.0));
        let a = positioner.locate(&head_at_yaw(0.0), DT);
        let b = positioner.locate(&head_at_yaw(170.0), DT);
        assert_eq!(a, b);
        assert_eq!(a.w_axis.truncate(), Vec3::new(0.0, 1.0, -2.0));
    }

    #[test]
    fn sub_threshold_yaw_never_retargets() {
        let mut positioner = SlowTurnPositioner::new(1.5, SlowTurnConfig::default());
        let initial_target = positioner.target();
        for yaw in [5.0, 15.0, 30.0, 39.0, 10.0, -35.0] {
            positioner.locate(&head_at_yaw(yaw), DT);
            assert_eq!(positioner.target(), initial_target);
        }
    }

    #[test]
    fn single_jump_past_threshold_retargets_once() {
        let mut positioner = SlowTurnPositioner::new(1.5, SlowTurnConfig::default());
        let initial_target = positioner.target();

        positioner.locate(&head_at_yaw(60.0), DT);
        let new_target = positioner.target();
        assert!(new_target.angle_between(initial_target) > 0.5);

        // Holding the head still keeps the same target while the panel
        // glides in.
        for _ in 0..50 {
            positioner.locate(&head_at_yaw(60.0), DT);
            assert!(positioner.target().angle_between(new_target) < 1e-6);
        }
    }

    #[test]
    fn panel_converges_monotonically() {
        let mut positioner = SlowTurnPositioner::new(1.5, SlowTurnConfig::default());
        positioner.locate(&head_at_yaw(90.0), DT);

        let mut last_gap = positioner.angle_to_target();
        for _ in 0..200 {
            positioner.locate(&head_at_yaw(90.0), DT);
            let gap = positioner.angle_to_target();
            assert!(gap <= last_gap + 1e-6);
            last_gap = gap;
        }
        assert!(last_gap < 1e-2);
    }

    #[test]
    fn panel_sits_forward_of_head() {
        let mut positioner = SlowTurnPositioner::new(2.0, SlowTurnConfig::default());
        let placed = positioner.locate(&Mat4::IDENTITY, DT);
        let position = placed.w_axis.truncate();
        assert!((position - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-4);
    }

    #[test]
    fn straight_up_head_keeps_previous_heading() {
        let mut positioner = SlowTurnPositioner::new(1.5, SlowTurnConfig::default());
        let target = positioner.target();
        let up = Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2);
        positioner.locate(&up, DT);
        assert_eq!(positioner.target(), target);
    }

    #[test]
    fn wrap_angle_stays_in_range() {
        for angle in [-7.0, -3.2, 0.0, 3.2, 7.0, 12.0] {
            let wrapped = wrap_angle(angle);
            assert!(wrapped > -PI - 1e-6 && wrapped <= PI + 1e-6);
        }
    }
}
