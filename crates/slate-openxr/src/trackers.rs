//! Optional tracking subsystems: hands, social eye tracking, face tracking.
//!
//! Each is gated by a negotiated capability; creation failures downgrade
//! the capability rather than aborting the session. Hand tracker
//! create/destroy may be driven from a different control path than the
//! render tick, so it is guarded by its own mutex and idempotent in both
//! directions.

use std::sync::{Mutex, MutexGuard};

use openxr as xr;
use openxr::sys::Handle;
use openxr::{raw, sys};
use slate_core::{Pose, ShellError, ShellResult};
use tracing::{info, warn};

use crate::context::cvt;

/// Left = index 0, right = index 1. Other code relies on this mapping when
/// indexing tracker storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandSide {
    Left = 0,
    Right = 1,
}

impl HandSide {
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Default)]
pub struct Trackers {
    pub hands: HandTrackers,
    eye: Option<EyeTrackerFb>,
    face: Option<FaceTrackerFb>,
}

impl Trackers {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn create_eye_tracker(
        &mut self,
        instance: &xr::Instance,
        session: &xr::Session<xr::OpenGL>,
    ) -> ShellResult<()> {
        if self.eye.is_some() {
            warn!("eye tracker already created");
            return Ok(());
        }
        self.eye = Some(EyeTrackerFb::create(instance, session)?);
        info!("created social eye tracker");
        Ok(())
    }

    pub(crate) fn create_face_tracker(
        &mut self,
        instance: &xr::Instance,
        session: &xr::Session<xr::OpenGL>,
    ) -> ShellResult<()> {
        if self.face.is_some() {
            warn!("face tracker already created");
            return Ok(());
        }
        self.face = Some(FaceTrackerFb::create(instance, session)?);
        info!("created face tracker");
        Ok(())
    }

    pub fn eye_tracker(&self) -> Option<&EyeTrackerFb> {
        self.eye.as_ref()
    }

    pub fn face_tracker(&self) -> Option<&FaceTrackerFb> {
        self.face.as_ref()
    }

    /// Destroy all trackers. Idempotent.
    pub fn destroy(&mut self) {
        self.hands.destroy();
        if self.eye.take().is_some() {
            info!("destroyed eye tracker");
        }
        if self.face.take().is_some() {
            info!("destroyed face tracker");
        }
    }
}

/// The pair of hand trackers, behind a dedicated mutex.
#[derive(Default)]
pub struct HandTrackers {
    inner: Mutex<Option<[xr::HandTracker; 2]>>,
}

impl HandTrackers {
    fn lock(&self) -> MutexGuard<'_, Option<[xr::HandTracker; 2]>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Create both hand trackers. A second call is a warned no-op.
    pub fn create<G>(&self, session: &xr::Session<G>) -> ShellResult<()> {
        let mut guard = self.lock();
        if guard.is_some() {
            warn!("hand trackers already created, not re-creating");
            return Ok(());
        }

        let left = session
            .create_hand_tracker(xr::Hand::LEFT)
            .map_err(|e| ShellError::Runtime(format!("xrCreateHandTrackerEXT (left): {e:?}")))?;
        let right = session
            .create_hand_tracker(xr::Hand::RIGHT)
            .map_err(|e| ShellError::Runtime(format!("xrCreateHandTrackerEXT (right): {e:?}")))?;

        *guard = Some([left, right]);
        info!("created hand trackers");
        Ok(())
    }

    /// Destroy both hand trackers. Destroying when absent is a warned
    /// no-op.
    pub fn destroy(&self) {
        let mut guard = self.lock();
        if guard.take().is_none() {
            warn!("hand trackers were not created, nothing to destroy");
            return;
        }
        info!("destroyed hand trackers");
    }

    pub fn is_created(&self) -> bool {
        self.lock().is_some()
    }

    /// Palm pose of one hand in the given base space, if tracked.
    pub fn palm_pose(
        &self,
        side: HandSide,
        base_space: &xr::Space,
        time: xr::Time,
    ) -> Option<Pose> {
        let guard = self.lock();
        let trackers = guard.as_ref()?;
        let tracker = &trackers[side.index()];

        let (locations, _velocities) = base_space.relate_hand_joints(tracker, time).ok()??;
        let palm = locations[xr::HandJoint::PALM];
        let flags = palm.location_flags;
        if !flags.contains(xr::SpaceLocationFlags::ORIENTATION_VALID)
            || !flags.contains(xr::SpaceLocationFlags::POSITION_VALID)
        {
            return None;
        }

        Some(Pose {
            position: [palm.pose.position.x, palm.pose.position.y, palm.pose.position.z],
            orientation: [
                palm.pose.orientation.x,
                palm.pose.orientation.y,
                palm.pose.orientation.z,
                palm.pose.orientation.w,
            ],
        })
    }
}

/// Social eye tracker, created through the FB extension function table.
pub struct EyeTrackerFb {
    handle: sys::EyeTrackerFB,
    fns: raw::EyeTrackingSocialFB,
}

impl EyeTrackerFb {
    fn create(instance: &xr::Instance, session: &xr::Session<xr::OpenGL>) -> ShellResult<Self> {
        let fns = instance.exts().fb_eye_tracking_social.ok_or_else(|| {
            ShellError::Unavailable("XR_FB_eye_tracking_social not enabled".to_string())
        })?;

        let create_info = sys::EyeTrackerCreateInfoFB {
            ty: sys::EyeTrackerCreateInfoFB::TYPE,
            next: std::ptr::null(),
        };
        let mut handle = sys::EyeTrackerFB::NULL;
        cvt("xrCreateEyeTrackerFB", unsafe {
            (fns.create_eye_tracker)(session.as_raw(), &create_info, &mut handle)
        })?;

        Ok(Self { handle, fns })
    }

    pub fn handle(&self) -> sys::EyeTrackerFB {
        self.handle
    }
}

impl Drop for EyeTrackerFb {
    fn drop(&mut self) {
        if self.handle != sys::EyeTrackerFB::NULL {
            let result = unsafe { (self.fns.destroy_eye_tracker)(self.handle) };
            if result.into_raw() < 0 {
                warn!("xrDestroyEyeTrackerFB: {result:?}");
            }
            self.handle = sys::EyeTrackerFB::NULL;
        }
    }
}

/// Visual face tracker, created through the FB extension function table.
pub struct FaceTrackerFb {
    handle: sys::FaceTracker2FB,
    fns: raw::FaceTracking2FB,
}

impl FaceTrackerFb {
    fn create(instance: &xr::Instance, session: &xr::Session<xr::OpenGL>) -> ShellResult<Self> {
        let fns = instance.exts().fb_face_tracking2.ok_or_else(|| {
            ShellError::Unavailable("XR_FB_face_tracking2 not enabled".to_string())
        })?;

        let mut sources = [sys::FaceTrackingDataSource2FB::VISUAL];
        let create_info = sys::FaceTrackerCreateInfo2FB {
            ty: sys::FaceTrackerCreateInfo2FB::TYPE,
            next: std::ptr::null(),
            face_expression_set: sys::FaceExpressionSet2FB::DEFAULT,
            requested_data_source_count: sources.len() as u32,
            requested_data_sources: sources.as_mut_ptr(),
        };
        let mut handle = sys::FaceTracker2FB::NULL;
        cvt("xrCreateFaceTracker2FB", unsafe {
            (fns.create_face_tracker2)(session.as_raw(), &create_info, &mut handle)
        })?;

        Ok(Self { handle, fns })
    }

    pub fn handle(&self) -> sys::FaceTracker2FB {
        self.handle
    }
}

impl Drop for FaceTrackerFb {
    fn drop(&mut self) {
        if self.handle != sys::FaceTracker2FB::NULL {
            let result = unsafe { (self.fns.destroy_face_tracker2)(self.handle) };
            if result.into_raw() < 0 {
                warn!("xrDestroyFaceTracker2FB: {result:?}");
            }
            self.handle = sys::FaceTracker2FB::NULL;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_when_absent_is_a_no_op() {
        let hands = HandTrackers::default();
        assert!(!hands.is_created());
        hands.destroy();
        hands.destroy();
        assert!(!hands.is_created());
    }

    #[test]
    fn hand_side_indices_are_stable() {
        assert_eq!(HandSide::Left.index(), 0);
        assert_eq!(HandSide::Right.index(), 1);
    }
}
