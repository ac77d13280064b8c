//! The XR shell context: runtime instance, session, reference spaces,
//! capability negotiation, and frame-protocol wrappers.
//!
//! The context is owned by the render/XR thread and passed by reference
//! through the frame loop and panel compositor; there is no ambient global
//! state.

use openxr as xr;
use slate_core::{AppInfo, ShellError, ShellResult};
use tracing::{debug, info, warn};

use crate::caps::{self, CapabilitySet};
use crate::math::IDENTITY_POSE;
use crate::state::SessionFlags;
use crate::trackers::Trackers;

/// GLX objects the session is bound to. The GL context must be current on
/// the calling thread for the lifetime of the session.
pub struct GlBinding {
    pub x_display: *mut std::ffi::c_void,
    pub visualid: u32,
    pub glx_fb_config: *mut std::ffi::c_void,
    pub glx_drawable: u64,
    pub glx_context: *mut std::ffi::c_void,
}

/// Everything whose lifetime is tied to the session handle. Dropping this
/// struct destroys the session once the last internal reference goes away.
pub(crate) struct SessionObjects {
    pub(crate) handle: xr::Session<xr::OpenGL>,
    pub(crate) waiter: xr::FrameWaiter,
    pub(crate) stream: xr::FrameStream<xr::OpenGL>,
    pub(crate) spaces: SpaceTable<xr::Space>,
}

/// Reference spaces by kind, created lazily and at most once per kind.
pub(crate) struct SpaceTable<S> {
    entries: Vec<(xr::ReferenceSpaceType, S)>,
}

impl<S> SpaceTable<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the space of this kind, creating it on first use. A second
    /// call for the same kind returns the existing space without touching
    /// the runtime.
    pub(crate) fn ensure(
        &mut self,
        kind: xr::ReferenceSpaceType,
        create: impl FnOnce() -> ShellResult<S>,
    ) -> ShellResult<&S> {
        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == kind) {
            debug!(?kind, "reference space already created");
            return Ok(&self.entries[pos].1);
        }
        let space = create()?;
        let index = self.entries.len();
        self.entries.push((kind, space));
        Ok(&self.entries[index].1)
    }

    pub(crate) fn get(&self, kind: xr::ReferenceSpaceType) -> Option<&S> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| s)
    }
}

/// The application-lifetime XR context.
pub struct XrShell {
    instance: Option<xr::Instance>,
    system: xr::SystemId,
    pub(crate) session: Option<SessionObjects>,
    /// Capabilities negotiated at instance creation, possibly downgraded
    /// further if a tracker could not be created.
    pub caps: CapabilitySet,
    pub(crate) view_config: Vec<xr::ViewConfigurationView>,
    pub(crate) play_space: xr::ReferenceSpaceType,
    pub flags: SessionFlags,
    pub(crate) frame_state: Option<xr::FrameState>,
    pub trackers: Trackers,
}

fn no_session() -> ShellError {
    ShellError::Unavailable("no active session".to_string())
}

fn no_instance() -> ShellError {
    ShellError::Unavailable("no active instance".to_string())
}

pub(crate) fn cvt(call: &'static str, result: xr::sys::Result) -> ShellResult<()> {
    if result.into_raw() >= 0 {
        Ok(())
    } else {
        Err(ShellError::Runtime(format!("{call}: {result:?}")))
    }
}

impl XrShell {
    /// Load the runtime, negotiate capabilities, and create the instance
    /// and HMD system.
    pub fn create_instance(app: &AppInfo, requested: CapabilitySet) -> ShellResult<Self> {
        let entry = unsafe { xr::Entry::load() }
            .map_err(|e| ShellError::Unavailable(format!("OpenXR loader: {e:?}")))?;

        let advertised = entry.enumerate_extensions().map_err(|e| {
            ShellError::Runtime(format!("xrEnumerateInstanceExtensionProperties: {e:?}"))
        })?;
        if !advertised.khr_opengl_enable {
            return Err(ShellError::Unavailable(
                "XR_KHR_opengl_enable not available".to_string(),
            ));
        }

        let available = CapabilitySet::from_advertised(&advertised);
        let (enabled, missing) = caps::negotiate(requested, available);
        for name in &missing {
            warn!("requested extension {name} was not available");
        }
        for name in enabled.names() {
            info!("enabled extension {name}");
        }

        let mut exts = xr::ExtensionSet::default();
        exts.khr_opengl_enable = true;
        enabled.apply_to(&mut exts);

        let instance = entry
            .create_instance(
                &xr::ApplicationInfo {
                    application_name: &app.name,
                    application_version: app.version,
                    engine_name: &app.engine_name,
                    engine_version: app.engine_version,
                    api_version: xr::Version::new(1, 0, 0),
                },
                &exts,
                &[],
            )
            .map_err(|e| ShellError::Runtime(format!("xrCreateInstance: {e:?}")))?;

        if let Ok(props) = instance.properties() {
            info!(
                runtime = %props.runtime_name,
                "created OpenXR instance"
            );
        }

        let system = instance
            .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
            .map_err(|e| ShellError::Runtime(format!("xrGetSystem: {e:?}")))?;

        Ok(Self {
            instance: Some(instance),
            system,
            session: None,
            caps: enabled,
            view_config: Vec::new(),
            play_space: xr::ReferenceSpaceType::LOCAL,
            flags: SessionFlags::default(),
            frame_state: None,
            trackers: Trackers::new(),
        })
    }

    /// Create the session bound to the given GL context, the standard
    /// reference spaces, and any supported trackers.
    pub fn create_session(&mut self, binding: &GlBinding) -> ShellResult<()> {
        let instance = self.instance.as_ref().ok_or_else(no_instance)?;

        self.view_config = instance
            .enumerate_view_configuration_views(
                self.system,
                xr::ViewConfigurationType::PRIMARY_STEREO,
            )
            .map_err(|e| {
                ShellError::Runtime(format!("xrEnumerateViewConfigurationViews: {e:?}"))
            })?;

        let requirements = instance
            .graphics_requirements::<xr::OpenGL>(self.system)
            .map_err(|e| ShellError::Runtime(format!("xrGetOpenGLGraphicsRequirementsKHR: {e:?}")))?;
        debug!(
            min = ?requirements.min_api_version_supported,
            max = ?requirements.max_api_version_supported,
            "OpenGL requirements"
        );

        let create_info = xr::opengl::SessionCreateInfo::Xlib {
            x_display: binding.x_display as *mut _,
            visualid: binding.visualid,
            glx_fb_config: binding.glx_fb_config as *mut _,
            glx_drawable: binding.glx_drawable as _,
            glx_context: binding.glx_context as *mut _,
        };

        let (handle, waiter, stream) = unsafe {
            instance
                .create_session::<xr::OpenGL>(self.system, &create_info)
                .map_err(|e| ShellError::Runtime(format!("xrCreateSession: {e:?}")))?
        };

        self.session = Some(SessionObjects {
            handle,
            waiter,
            stream,
            spaces: SpaceTable::new(),
        });

        for kind in [
            xr::ReferenceSpaceType::STAGE,
            xr::ReferenceSpaceType::VIEW,
            xr::ReferenceSpaceType::LOCAL,
        ] {
            self.ensure_reference_space(kind)?;
        }

        self.setup_trackers();

        info!("created session");
        Ok(())
    }

    /// Best-effort tracker creation: a failure downgrades the capability
    /// with a warning instead of aborting session setup.
    fn setup_trackers(&mut self) {
        let Some(so) = self.session.as_ref() else {
            return;
        };

        if self.caps.hand_tracking {
            if let Err(e) = self.trackers.hands.create(&so.handle) {
                warn!("unable to set up hand tracking: {e}");
                self.caps.hand_tracking = false;
            }
        }
        if self.caps.eye_tracking_social {
            if let Some(instance) = self.instance.as_ref() {
                if let Err(e) = self.trackers.create_eye_tracker(instance, &so.handle) {
                    warn!("unable to set up social eye tracking: {e}");
                    self.caps.eye_tracking_social = false;
                }
            }
        }
        if self.caps.face_tracking2 {
            if let Some(instance) = self.instance.as_ref() {
                if let Err(e) = self.trackers.create_face_tracker(instance, &so.handle) {
                    warn!("unable to set up face tracking: {e}");
                    self.caps.face_tracking2 = false;
                }
            }
        }
    }

    /// Create the reference space of this kind if it does not exist yet.
    pub fn ensure_reference_space(&mut self, kind: xr::ReferenceSpaceType) -> ShellResult<()> {
        let so = self.session.as_mut().ok_or_else(no_session)?;
        let SessionObjects { handle, spaces, .. } = so;
        spaces.ensure(kind, || {
            handle
                .create_reference_space(kind, IDENTITY_POSE)
                .map_err(|e| ShellError::Runtime(format!("xrCreateReferenceSpace: {e:?}")))
        })?;
        Ok(())
    }

    /// Select the play space used for rendering and panel placement,
    /// creating it if needed.
    pub fn set_play_space(&mut self, kind: xr::ReferenceSpaceType) -> ShellResult<()> {
        self.ensure_reference_space(kind)?;
        self.play_space = kind;
        Ok(())
    }

    pub fn play_space(&self) -> xr::ReferenceSpaceType {
        self.play_space
    }

    pub fn view_config(&self) -> &[xr::ViewConfigurationView] {
        &self.view_config
    }

    pub fn instance(&self) -> Option<&xr::Instance> {
        self.instance.as_ref()
    }

    pub(crate) fn session_handle(&self) -> ShellResult<&xr::Session<xr::OpenGL>> {
        self.session
            .as_ref()
            .map(|so| &so.handle)
            .ok_or_else(no_session)
    }

    pub(crate) fn begin_session(&mut self) -> ShellResult<()> {
        self.session_handle()?
            .begin(xr::ViewConfigurationType::PRIMARY_STEREO)
            .map(|_| ())
            .map_err(|e| ShellError::Runtime(format!("xrBeginSession: {e:?}")))
    }

    pub(crate) fn end_session(&mut self) -> ShellResult<()> {
        self.session_handle()?
            .end()
            .map(|_| ())
            .map_err(|e| ShellError::Runtime(format!("xrEndSession: {e:?}")))
    }

    /// Drop the session while keeping the instance alive (session loss).
    pub(crate) fn destroy_session(&mut self) {
        self.trackers.destroy();
        if self.session.take().is_some() {
            info!("destroyed session, instance retained");
        }
        self.frame_state = None;
    }

    /// Block until the runtime is ready for a new frame and record the
    /// predicted display state.
    pub fn wait_frame(&mut self) -> ShellResult<xr::FrameState> {
        let so = self.session.as_mut().ok_or_else(no_session)?;
        let state = so
            .waiter
            .wait()
            .map_err(|e| ShellError::Runtime(format!("xrWaitFrame: {e:?}")))?;
        self.frame_state = Some(state);
        Ok(state)
    }

    pub fn begin_frame(&mut self) -> ShellResult<()> {
        let so = self.session.as_mut().ok_or_else(no_session)?;
        so.stream
            .begin()
            .map_err(|e| ShellError::Runtime(format!("xrBeginFrame: {e:?}")))
    }

    /// Predicted display time of the frame most recently waited on.
    pub fn predicted_display_time(&self) -> ShellResult<xr::Time> {
        self.frame_state
            .map(|s| s.predicted_display_time)
            .ok_or_else(|| ShellError::Unavailable("no frame in flight".to_string()))
    }

    /// Locate both eye views in the play space at the predicted display
    /// time of the current frame.
    pub fn locate_frame_views(&self) -> ShellResult<Vec<xr::View>> {
        let time = self.predicted_display_time()?;
        let so = self.session.as_ref().ok_or_else(no_session)?;
        let space = so
            .spaces
            .get(self.play_space)
            .ok_or_else(|| {
                ShellError::Unavailable(format!("play space {:?} not created", self.play_space))
            })?;
        let (_flags, views) = so
            .handle
            .locate_views(xr::ViewConfigurationType::PRIMARY_STEREO, time, space)
            .map_err(|e| ShellError::Runtime(format!("xrLocateViews: {e:?}")))?;
        Ok(views)
    }

    /// Locate one reference space relative to another at the given time.
    pub fn locate_space(
        &self,
        kind: xr::ReferenceSpaceType,
        base: xr::ReferenceSpaceType,
        time: xr::Time,
    ) -> ShellResult<xr::SpaceLocation> {
        let so = self.session.as_ref().ok_or_else(no_session)?;
        let target = so
            .spaces
            .get(kind)
            .ok_or_else(|| ShellError::Unavailable(format!("space {kind:?} not created")))?;
        let base = so
            .spaces
            .get(base)
            .ok_or_else(|| ShellError::Unavailable(format!("space {base:?} not created")))?;
        target
            .locate(base, time)
            .map_err(|e| ShellError::Runtime(format!("xrLocateSpace: {e:?}")))
    }

    /// Locate a reference space relative to the play space.
    pub fn locate_in_play_space(
        &self,
        kind: xr::ReferenceSpaceType,
        time: xr::Time,
    ) -> ShellResult<xr::SpaceLocation> {
        self.locate_space(kind, self.play_space, time)
    }

    /// Supported display refresh rates, ascending.
    pub fn enumerate_refresh_rates(&self) -> ShellResult<Vec<f32>> {
        let instance = self.instance.as_ref().ok_or_else(no_instance)?;
        let fns = instance
            .exts()
            .fb_display_refresh_rate
            .ok_or_else(|| {
                ShellError::Unavailable("XR_FB_display_refresh_rate not enabled".to_string())
            })?;
        let session = self.session_handle()?.as_raw();

        unsafe {
            let mut count = 0u32;
            cvt(
                "xrEnumerateDisplayRefreshRatesFB",
                (fns.enumerate_display_refresh_rates)(session, 0, &mut count, std::ptr::null_mut()),
            )?;
            let mut rates = vec![0f32; count as usize];
            cvt(
                "xrEnumerateDisplayRefreshRatesFB",
                (fns.enumerate_display_refresh_rates)(session, count, &mut count, rates.as_mut_ptr()),
            )?;
            rates.truncate(count as usize);
            Ok(rates)
        }
    }

    pub fn request_refresh_rate(&self, rate_hz: f32) -> ShellResult<()> {
        let instance = self.instance.as_ref().ok_or_else(no_instance)?;
        let fns = instance
            .exts()
            .fb_display_refresh_rate
            .ok_or_else(|| {
                ShellError::Unavailable("XR_FB_display_refresh_rate not enabled".to_string())
            })?;
        let session = self.session_handle()?.as_raw();

        cvt("xrRequestDisplayRefreshRateFB", unsafe {
            (fns.request_display_refresh_rate)(session, rate_hz)
        })?;
        info!("requested display refresh rate {rate_hz:.1} Hz");
        Ok(())
    }

    /// Ask for the fastest refresh rate the runtime supports.
    pub fn request_highest_refresh_rate(&self) -> ShellResult<()> {
        let rates = self.enumerate_refresh_rates()?;
        match rates.last() {
            Some(&rate) => self.request_refresh_rate(rate),
            None => {
                warn!("runtime returned no supported refresh rates");
                Ok(())
            }
        }
    }

    /// Color spaces the runtime compositor supports.
    pub fn enumerate_color_spaces(&self) -> ShellResult<Vec<xr::sys::ColorSpaceFB>> {
        let instance = self.instance.as_ref().ok_or_else(no_instance)?;
        let fns = instance
            .exts()
            .fb_color_space
            .ok_or_else(|| ShellError::Unavailable("XR_FB_color_space not enabled".to_string()))?;
        let session = self.session_handle()?.as_raw();

        unsafe {
            let mut count = 0u32;
            cvt(
                "xrEnumerateColorSpacesFB",
                (fns.enumerate_color_spaces)(session, 0, &mut count, std::ptr::null_mut()),
            )?;
            let mut spaces = vec![xr::sys::ColorSpaceFB::UNMANAGED; count as usize];
            cvt(
                "xrEnumerateColorSpacesFB",
                (fns.enumerate_color_spaces)(session, count, &mut count, spaces.as_mut_ptr()),
            )?;
            spaces.truncate(count as usize);
            Ok(spaces)
        }
    }

    pub fn set_color_space(&self, color_space: xr::sys::ColorSpaceFB) -> ShellResult<()> {
        let instance = self.instance.as_ref().ok_or_else(no_instance)?;
        let fns = instance
            .exts()
            .fb_color_space
            .ok_or_else(|| ShellError::Unavailable("XR_FB_color_space not enabled".to_string()))?;
        let session = self.session_handle()?.as_raw();

        cvt("xrSetColorSpaceFB", unsafe {
            (fns.set_color_space)(session, color_space)
        })
    }

    /// Physical bounds of the play area, if the runtime reports them.
    pub fn play_area_bounds(&self) -> ShellResult<Option<xr::Extent2Df>> {
        self.session_handle()?
            .reference_space_bounds_rect(self.play_space)
            .map_err(|e| {
                ShellError::Runtime(format!("xrGetReferenceSpaceBoundsRect: {e:?}"))
            })
    }

    /// Politely ask the runtime to wind the session down; the STOPPING and
    /// EXITING states arrive through the event pump.
    pub fn request_exit(&self) -> ShellResult<()> {
        self.session_handle()?
            .request_exit()
            .map_err(|e| ShellError::Runtime(format!("xrRequestExitSession: {e:?}")))
    }

    /// Tear the context down, in order, tolerating partial setup. Safe to
    /// call more than once; the second call does nothing.
    pub fn teardown(&mut self) {
        info!(
            session_running = self.flags.session_running,
            "tearing down XR shell"
        );

        self.trackers.destroy();
        if self.session.take().is_some() {
            info!("destroyed session");
        }
        if self.instance.take().is_some() {
            info!("destroyed instance");
        }

        self.view_config.clear();
        self.frame_state = None;
        self.flags = SessionFlags::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_table_creates_once_per_kind() {
        let mut table = SpaceTable::new();
        let mut creations = 0;

        let first = *table
            .ensure(xr::ReferenceSpaceType::STAGE, || {
                creations += 1;
                Ok(creations)
            })
            .unwrap();
        let second = *table
            .ensure(xr::ReferenceSpaceType::STAGE, || {
                creations += 1;
                Ok(creations)
            })
            .unwrap();

        assert_eq!(creations, 1);
        assert_eq!(first, second);
        assert_eq!(table.get(xr::ReferenceSpaceType::STAGE), Some(&1));
    }

    #[test]
    fn space_table_tracks_kinds_independently() {
        let mut table = SpaceTable::new();
        table
            .ensure(xr::ReferenceSpaceType::STAGE, || Ok("stage"))
            .unwrap();
        table
            .ensure(xr::ReferenceSpaceType::VIEW, || Ok("view"))
            .unwrap();

        assert_eq!(table.get(xr::ReferenceSpaceType::STAGE), Some(&"stage"));
        assert_eq!(table.get(xr::ReferenceSpaceType::VIEW), Some(&"view"));
        assert_eq!(table.get(xr::ReferenceSpaceType::LOCAL), None);
    }

    #[test]
    fn space_table_failed_creation_is_not_recorded() {
        let mut table: SpaceTable<u32> = SpaceTable::new();
        let result = table.ensure(xr::ReferenceSpaceType::STAGE, || {
            Err(ShellError::Runtime("xrCreateReferenceSpace: TEST".into()))
        });
        assert!(result.is_err());
        assert_eq!(table.get(xr::ReferenceSpaceType::STAGE), None);

        // The next attempt may create it.
        table
            .ensure(xr::ReferenceSpaceType::STAGE, || Ok(7))
            .unwrap();
        assert_eq!(table.get(xr::ReferenceSpaceType::STAGE), Some(&7));
    }
}
