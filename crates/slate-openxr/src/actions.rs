//! Controller input bindings: action-set creation, per-profile suggested
//! bindings, and per-frame sync.
//!
//! Slate only needs a select and a menu action per hand; the registration
//! machinery is the supporting capability here, not deep input semantics.

use openxr as xr;
use slate_core::{ShellError, ShellResult};
use tracing::warn;

pub struct InputBindings {
    action_set: xr::ActionSet,
    pub select: xr::Action<bool>,
    pub menu: xr::Action<bool>,
    pub left: xr::Path,
    pub right: xr::Path,
}

impl InputBindings {
    /// Create the action set, suggest bindings for the common interaction
    /// profiles, and attach the set to the session.
    ///
    /// A rejected suggestion for one profile is logged and skipped; other
    /// profiles still register.
    pub fn new<G>(instance: &xr::Instance, session: &xr::Session<G>) -> ShellResult<Self> {
        let action_set = instance
            .create_action_set("slate", "Slate", 0)
            .map_err(|e| ShellError::Runtime(format!("xrCreateActionSet: {e:?}")))?;

        let left = instance
            .string_to_path("/user/hand/left")
            .map_err(|e| ShellError::Runtime(format!("xrStringToPath: {e:?}")))?;
        let right = instance
            .string_to_path("/user/hand/right")
            .map_err(|e| ShellError::Runtime(format!("xrStringToPath: {e:?}")))?;
        let subaction_paths = [left, right];

        let select = action_set
            .create_action("select", "Select", &subaction_paths)
            .map_err(|e| ShellError::Runtime(format!("xrCreateAction (select): {e:?}")))?;
        let menu = action_set
            .create_action("menu", "Menu", &subaction_paths)
            .map_err(|e| ShellError::Runtime(format!("xrCreateAction (menu): {e:?}")))?;

        let profiles: [(&str, [&str; 4]); 2] = [
            (
                "/interaction_profiles/khr/simple_controller",
                [
                    "/user/hand/left/input/select/click",
                    "/user/hand/right/input/select/click",
                    "/user/hand/left/input/menu/click",
                    "/user/hand/right/input/menu/click",
                ],
            ),
            (
                "/interaction_profiles/oculus/touch_controller",
                [
                    "/user/hand/left/input/x/click",
                    "/user/hand/right/input/a/click",
                    "/user/hand/left/input/y/click",
                    "/user/hand/right/input/b/click",
                ],
            ),
        ];

        for (profile, [select_l, select_r, menu_l, menu_r]) in profiles {
            let profile_path = instance
                .string_to_path(profile)
                .map_err(|e| ShellError::Runtime(format!("xrStringToPath: {e:?}")))?;

            let mut bindings = Vec::with_capacity(4);
            for (action, path) in [
                (&select, select_l),
                (&select, select_r),
                (&menu, menu_l),
                (&menu, menu_r),
            ] {
                if let Ok(path) = instance.string_to_path(path) {
                    bindings.push(xr::Binding::new(action, path));
                }
            }

            if let Err(e) = instance.suggest_interaction_profile_bindings(profile_path, &bindings)
            {
                warn!("binding suggestion rejected for {profile}: {e:?}");
            }
        }

        session
            .attach_action_sets(&[&action_set])
            .map_err(|e| ShellError::Runtime(format!("xrAttachSessionActionSets: {e:?}")))?;

        Ok(Self {
            action_set,
            select,
            menu,
            left,
            right,
        })
    }

    /// Sync the action set; call once per frame while the session runs.
    pub fn sync<G>(&self, session: &xr::Session<G>) -> ShellResult<()> {
        session
            .sync_actions(&[xr::ActiveActionSet::new(&self.action_set)])
            .map_err(|e| ShellError::Runtime(format!("xrSyncActions: {e:?}")))
    }

    /// Current select state for one hand subaction path.
    pub fn select_pressed<G>(&self, session: &xr::Session<G>, hand: xr::Path) -> bool {
        self.select
            .state(session, hand)
            .map(|s| s.is_active && s.current_state)
            .unwrap_or(false)
    }
}
