//! Optional runtime capabilities and their negotiation.
//!
//! The shell asks for a set of capabilities; the runtime advertises what it
//! has. The enabled set is the intersection, and every requested-but-missing
//! capability is a warning, never a failure.

use openxr as xr;

/// The optional extension-backed capabilities slate understands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    pub hand_tracking: bool,
    pub eye_tracking_social: bool,
    pub face_tracking2: bool,
    pub display_refresh_rate: bool,
    pub color_space: bool,
}

impl CapabilitySet {
    pub fn all() -> Self {
        Self {
            hand_tracking: true,
            eye_tracking_social: true,
            face_tracking2: true,
            display_refresh_rate: true,
            color_space: true,
        }
    }

    /// Capabilities the runtime advertises.
    pub fn from_advertised(exts: &xr::ExtensionSet) -> Self {
        Self {
            hand_tracking: exts.ext_hand_tracking,
            eye_tracking_social: exts.fb_eye_tracking_social,
            face_tracking2: exts.fb_face_tracking2,
            display_refresh_rate: exts.fb_display_refresh_rate,
            color_space: exts.fb_color_space,
        }
    }

    /// Enable the corresponding extensions on an instance-creation set.
    pub fn apply_to(&self, exts: &mut xr::ExtensionSet) {
        exts.ext_hand_tracking = self.hand_tracking;
        exts.fb_eye_tracking_social = self.eye_tracking_social;
        exts.fb_face_tracking2 = self.face_tracking2;
        exts.fb_display_refresh_rate = self.display_refresh_rate;
        exts.fb_color_space = self.color_space;
    }

    /// Extension names of the capabilities present in this set.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.hand_tracking {
            names.push("XR_EXT_hand_tracking");
        }
        if self.eye_tracking_social {
            names.push("XR_FB_eye_tracking_social");
        }
        if self.face_tracking2 {
            names.push("XR_FB_face_tracking2");
        }
        if self.display_refresh_rate {
            names.push("XR_FB_display_refresh_rate");
        }
        if self.color_space {
            names.push("XR_FB_color_space");
        }
        names
    }
}

/// Intersect the requested set with what the runtime advertises.
///
/// Returns the enabled set and the names of requested capabilities the
/// runtime does not have. Advertised-but-unrequested capabilities are
/// simply left disabled.
pub fn negotiate(
    requested: CapabilitySet,
    available: CapabilitySet,
) -> (CapabilitySet, Vec<&'static str>) {
    let enabled = CapabilitySet {
        hand_tracking: requested.hand_tracking && available.hand_tracking,
        eye_tracking_social: requested.eye_tracking_social && available.eye_tracking_social,
        face_tracking2: requested.face_tracking2 && available.face_tracking2,
        display_refresh_rate: requested.display_refresh_rate && available.display_refresh_rate,
        color_space: requested.color_space && available.color_space,
    };
    let missing = CapabilitySet {
        hand_tracking: requested.hand_tracking && !available.hand_tracking,
        eye_tracking_social: requested.eye_tracking_social && !available.eye_tracking_social,
        face_tracking2: requested.face_tracking2 && !available.face_tracking2,
        display_refresh_rate: requested.display_refresh_rate && !available.display_refresh_rate,
        color_space: requested.color_space && !available.color_space,
    };
    (enabled, missing.names())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_is_the_intersection() {
        let requested = CapabilitySet {
            hand_tracking: true,
            display_refresh_rate: true,
            ..Default::default()
        };
        let available = CapabilitySet {
            hand_tracking: true,
            color_space: true,
            ..Default::default()
        };

        let (enabled, missing) = negotiate(requested, available);

        assert!(enabled.hand_tracking);
        assert!(!enabled.display_refresh_rate);
        // Advertised but unrequested stays off, and produces no warning.
        assert!(!enabled.color_space);
        assert_eq!(missing, vec!["XR_FB_display_refresh_rate"]);
    }

    #[test]
    fn full_match_misses_nothing() {
        let (enabled, missing) = negotiate(CapabilitySet::all(), CapabilitySet::all());
        assert_eq!(enabled, CapabilitySet::all());
        assert!(missing.is_empty());
    }

    #[test]
    fn empty_runtime_misses_everything_requested() {
        let (enabled, missing) = negotiate(CapabilitySet::all(), CapabilitySet::default());
        assert_eq!(enabled, CapabilitySet::default());
        assert_eq!(missing.len(), 5);
    }
}
