//! Reducer actions, side-effect intents, and transition logic for the window manager.

use std::sync::Arc;

use platform_host::next_monotonic_timestamp_ms;

use crate::{
    apps::AppDescriptor,
    model::{DesktopState, LayoutMode, Viewport, WindowId, WindowPosition, WindowRecord},
    window_manager::{self, bring_to_front, clamp_size, force_maximized, maximize, restore},
};

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_desktop`] to mutate [`DesktopState`].
pub enum DesktopAction {
    /// Open a window for an app unless one is already open.
    OpenApp {
        /// App to open.
        app: Arc<AppDescriptor>,
        /// Creation time used to build the window id.
        timestamp_ms: u64,
    },
    /// Close a window by id.
    CloseWindow {
        /// Window to close.
        window_id: WindowId,
    },
    /// Replace a window record wholesale, matched by id.
    UpdateWindow(Box<WindowRecord>),
    /// Raise a window above all others.
    BringToFront {
        /// Window to raise.
        window_id: WindowId,
    },
    /// Commit a drag to a new pixel position.
    MoveWindow {
        /// Window being dragged.
        window_id: WindowId,
        /// New left edge.
        x: i32,
        /// New top edge.
        y: i32,
    },
    /// Commit a resize, clamped to the app minimum.
    ResizeWindow {
        /// Window being resized.
        window_id: WindowId,
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// Flip the minimized flag.
    ToggleMinimize {
        /// Target window.
        window_id: WindowId,
    },
    /// Maximize, or restore a maximized window.
    ToggleMaximize {
        /// Target window.
        window_id: WindowId,
    },
    /// Taskbar click: un-minimize if needed, then raise.
    ToggleTaskbarWindow {
        /// Window associated with the taskbar button.
        window_id: WindowId,
    },
    /// Close every window belonging to an app.
    RemoveApp {
        /// App whose windows are closed.
        app_id: String,
    },
    /// Report the current viewport size and re-evaluate the layout mode.
    SetViewport(Viewport),
}

impl DesktopAction {
    /// Builds an [`DesktopAction::OpenApp`] stamped with the host clock.
    pub fn open_app(app: Arc<AppDescriptor>) -> Self {
        Self::OpenApp {
            app,
            timestamp_ms: next_monotonic_timestamp_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Side-effect intents emitted by [`reduce_desktop`] for the shell to execute.
pub enum RuntimeEffect {
    /// A window was created.
    WindowOpened(WindowId),
    /// A window was removed.
    WindowClosed(WindowId),
    /// Move keyboard focus into a window's content.
    FocusWindowInput(WindowId),
    /// The viewport crossed the mobile breakpoint.
    LayoutModeChanged(LayoutMode),
}

/// Applies `action` to `state` and returns the effects the shell should run.
///
/// None of the transitions fail; unknown ids and redundant requests leave `state` untouched.
pub fn reduce_desktop(state: &mut DesktopState, action: DesktopAction) -> Vec<RuntimeEffect> {
    let mut effects = Vec::new();

    match action {
        DesktopAction::OpenApp { app, timestamp_ms } => {
            if state.is_open(&app.id) {
                return effects;
            }
            window_manager::ensure_z_headroom(state);
            let mut window = window_manager::new_window(state, app, timestamp_ms);
            if state.is_mobile() {
                maximize(&mut window);
            }
            let window_id = window.id.clone();
            state.windows.push(window);
            effects.push(RuntimeEffect::WindowOpened(window_id.clone()));
            effects.push(RuntimeEffect::FocusWindowInput(window_id));
        }
        DesktopAction::CloseWindow { window_id } => {
            let before = state.windows.len();
            state.windows.retain(|window| window.id != window_id);
            if state.windows.len() != before {
                effects.push(RuntimeEffect::WindowClosed(window_id));
            }
        }
        DesktopAction::UpdateWindow(window) => {
            let mobile = state.is_mobile();
            if let Some(slot) = state.windows.iter_mut().find(|w| w.id == window.id) {
                *slot = *window;
                if mobile {
                    maximize(slot);
                }
            }
        }
        DesktopAction::BringToFront { window_id } => {
            if bring_to_front(state, &window_id) {
                effects.push(RuntimeEffect::FocusWindowInput(window_id));
            }
        }
        DesktopAction::MoveWindow { window_id, x, y } => {
            if !can_reposition(state, &window_id) {
                return effects;
            }
            if let Some(window) = find_window_mut(state, &window_id) {
                window.position = WindowPosition::px(x, y);
            }
        }
        DesktopAction::ResizeWindow {
            window_id,
            width,
            height,
        } => {
            if !can_reposition(state, &window_id) {
                return effects;
            }
            let policy = state.policy;
            if let Some(window) = find_window_mut(state, &window_id) {
                window.size = clamp_size(&policy, &window.app, width, height);
            }
        }
        DesktopAction::ToggleMinimize { window_id } => {
            if let Some(window) = find_window_mut(state, &window_id) {
                window.is_minimized = !window.is_minimized;
            }
        }
        DesktopAction::ToggleMaximize { window_id } => {
            if state.is_mobile() {
                return effects;
            }
            let policy = state.policy;
            if let Some(window) = find_window_mut(state, &window_id) {
                if window.is_maximized {
                    restore(window, &policy);
                } else {
                    maximize(window);
                }
            }
        }
        DesktopAction::ToggleTaskbarWindow { window_id } => {
            let Some(window) = find_window_mut(state, &window_id) else {
                return effects;
            };
            window.is_minimized = false;
            if bring_to_front(state, &window_id) {
                effects.push(RuntimeEffect::FocusWindowInput(window_id));
            }
        }
        DesktopAction::RemoveApp { app_id } => {
            let (closed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.windows)
                .into_iter()
                .partition(|window| window.app_id() == app_id);
            state.windows = kept;
            effects.extend(
                closed
                    .into_iter()
                    .map(|window| RuntimeEffect::WindowClosed(window.id)),
            );
        }
        DesktopAction::SetViewport(viewport) => {
            state.viewport = Some(viewport);
            let mode = state.policy.classify(viewport);
            if mode != state.layout_mode {
                state.layout_mode = mode;
                effects.push(RuntimeEffect::LayoutModeChanged(mode));
            }
            if state.is_mobile() {
                force_maximized(state);
            }
        }
    }

    effects
}

fn find_window_mut<'a>(
    state: &'a mut DesktopState,
    window_id: &WindowId,
) -> Option<&'a mut WindowRecord> {
    state.windows.iter_mut().find(|window| &window.id == window_id)
}

fn can_reposition(state: &DesktopState, window_id: &WindowId) -> bool {
    state
        .interaction_policy(window_id)
        .is_some_and(|policy| policy.can_drag && policy.can_resize)
}

#[cfg(test)]
mod tests {
    use platform_host::CatalogAppRecord;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Dimension, WindowSize};

    fn app(id: &str) -> Arc<AppDescriptor> {
        Arc::new(AppDescriptor::from_catalog(CatalogAppRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            icon: "app".to_string(),
            ..CatalogAppRecord::default()
        }))
    }

    fn open(state: &mut DesktopState, app_id: &str, timestamp_ms: u64) -> WindowId {
        reduce_desktop(
            state,
            DesktopAction::OpenApp {
                app: app(app_id),
                timestamp_ms,
            },
        );
        state.window_for_app(app_id).expect("window").id.clone()
    }

    fn window<'a>(state: &'a DesktopState, id: &WindowId) -> &'a WindowRecord {
        state.window(id).expect("window")
    }

    #[test]
    fn open_cascades_and_stacks_new_windows() {
        let mut state = DesktopState::default();
        let first = open(&mut state, "calc", 100);
        let second = open(&mut state, "notes", 101);

        assert_eq!(first, WindowId("calc-100".to_string()));
        assert_eq!(window(&state, &first).position, WindowPosition::px(50, 50));
        assert_eq!(window(&state, &second).position, WindowPosition::px(70, 70));
        assert_eq!(window(&state, &second).size, WindowSize::px(800, 600));
        assert_eq!(window(&state, &first).z_index, 1);
        assert_eq!(window(&state, &second).z_index, 2);
    }

    #[test]
    fn opening_an_open_app_is_a_noop() {
        let mut state = DesktopState::default();
        open(&mut state, "calc", 100);
        let before = state.clone();

        let effects = reduce_desktop(
            &mut state,
            DesktopAction::OpenApp {
                app: app("calc"),
                timestamp_ms: 200,
            },
        );

        assert!(effects.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn new_window_lands_above_raised_windows() {
        let mut state = DesktopState::default();
        let first = open(&mut state, "a", 1);
        open(&mut state, "b", 2);
        reduce_desktop(&mut state, DesktopAction::BringToFront { window_id: first.clone() });
        reduce_desktop(&mut state, DesktopAction::CloseWindow { window_id: first });

        let third = open(&mut state, "c", 3);
        assert_eq!(state.top_window().map(|w| &w.id), Some(&third));
    }

    #[test]
    fn close_removes_only_the_named_window() {
        let mut state = DesktopState::default();
        let first = open(&mut state, "a", 1);
        let second = open(&mut state, "b", 2);

        let effects = reduce_desktop(
            &mut state,
            DesktopAction::CloseWindow {
                window_id: first.clone(),
            },
        );
        assert_eq!(effects, vec![RuntimeEffect::WindowClosed(first)]);
        assert_eq!(state.windows.len(), 1);
        assert_eq!(state.windows[0].id, second);

        let effects = reduce_desktop(
            &mut state,
            DesktopAction::CloseWindow {
                window_id: WindowId("ghost".to_string()),
            },
        );
        assert!(effects.is_empty());
        assert_eq!(state.windows.len(), 1);
    }

    #[test]
    fn bring_to_front_gives_strict_maximum() {
        let mut state = DesktopState::default();
        let first = open(&mut state, "a", 1);
        open(&mut state, "b", 2);
        open(&mut state, "c", 3);

        let effects = reduce_desktop(
            &mut state,
            DesktopAction::BringToFront {
                window_id: first.clone(),
            },
        );

        assert_eq!(effects, vec![RuntimeEffect::FocusWindowInput(first.clone())]);
        assert_eq!(window(&state, &first).z_index, 4);
        assert!(state
            .windows
            .iter()
            .filter(|w| w.id != first)
            .all(|w| w.z_index < 4));
    }

    #[test]
    fn bring_to_front_compacts_stack_at_z_ceiling() {
        let mut state = DesktopState::default();
        let first = open(&mut state, "a", 1);
        let second = open(&mut state, "b", 2);
        let mut raised = window(&state, &first).clone();
        raised.z_index = u32::MAX;
        reduce_desktop(&mut state, DesktopAction::UpdateWindow(Box::new(raised)));

        let effects = reduce_desktop(
            &mut state,
            DesktopAction::BringToFront {
                window_id: second.clone(),
            },
        );

        assert_eq!(effects, vec![RuntimeEffect::FocusWindowInput(second.clone())]);
        assert!(window(&state, &second).z_index > window(&state, &first).z_index);
        assert_eq!(window(&state, &first).z_index, 2);
        assert_eq!(window(&state, &second).z_index, 3);

        let third = open(&mut state, "c", 3);
        assert_eq!(state.top_window().map(|w| &w.id), Some(&third));
    }

    #[test]
    fn open_compacts_stack_at_z_ceiling() {
        let mut state = DesktopState::default();
        let first = open(&mut state, "a", 1);
        let mut raised = window(&state, &first).clone();
        raised.z_index = u32::MAX;
        reduce_desktop(&mut state, DesktopAction::UpdateWindow(Box::new(raised)));

        let second = open(&mut state, "b", 2);

        assert_eq!(window(&state, &first).z_index, 1);
        assert_eq!(window(&state, &second).z_index, 2);
    }

    #[test]
    fn bring_to_front_on_empty_set_is_noop() {
        let mut state = DesktopState::default();
        let effects = reduce_desktop(
            &mut state,
            DesktopAction::BringToFront {
                window_id: WindowId("a-1".to_string()),
            },
        );
        assert!(effects.is_empty());
        assert!(state.windows.is_empty());
    }

    #[test]
    fn update_replaces_by_id_and_ignores_unknown_ids() {
        let mut state = DesktopState::default();
        let id = open(&mut state, "a", 1);
        let mut edited = window(&state, &id).clone();
        edited.position = WindowPosition::px(300, 120);
        edited.is_minimized = true;

        reduce_desktop(&mut state, DesktopAction::UpdateWindow(Box::new(edited.clone())));
        assert_eq!(window(&state, &id), &edited);

        let mut stray = edited;
        stray.id = WindowId("other-9".to_string());
        let before = state.clone();
        reduce_desktop(&mut state, DesktopAction::UpdateWindow(Box::new(stray)));
        assert_eq!(state, before);
    }

    #[test]
    fn taskbar_toggle_restores_minimized_window_and_raises_it() {
        let mut state = DesktopState::default();
        let first = open(&mut state, "a", 1);
        open(&mut state, "b", 2);
        reduce_desktop(
            &mut state,
            DesktopAction::ToggleMinimize {
                window_id: first.clone(),
            },
        );
        assert!(window(&state, &first).is_minimized);

        let effects = reduce_desktop(
            &mut state,
            DesktopAction::ToggleTaskbarWindow {
                window_id: first.clone(),
            },
        );

        assert!(!window(&state, &first).is_minimized);
        assert_eq!(state.top_window().map(|w| &w.id), Some(&first));
        assert_eq!(effects, vec![RuntimeEffect::FocusWindowInput(first)]);
    }

    #[test]
    fn maximized_windows_ignore_move_and_resize() {
        let mut state = DesktopState::default();
        let id = open(&mut state, "a", 1);
        reduce_desktop(
            &mut state,
            DesktopAction::ToggleMaximize {
                window_id: id.clone(),
            },
        );
        reduce_desktop(
            &mut state,
            DesktopAction::MoveWindow {
                window_id: id.clone(),
                x: 500,
                y: 500,
            },
        );
        assert_eq!(window(&state, &id).position, WindowPosition::px(0, 0));
        assert_eq!(window(&state, &id).size, WindowSize::full());

        reduce_desktop(
            &mut state,
            DesktopAction::ToggleMaximize {
                window_id: id.clone(),
            },
        );
        assert_eq!(window(&state, &id).position, WindowPosition::px(50, 50));

        reduce_desktop(
            &mut state,
            DesktopAction::ResizeWindow {
                window_id: id.clone(),
                width: 100,
                height: 700,
            },
        );
        assert_eq!(window(&state, &id).size, WindowSize::px(400, 700));
    }

    #[test]
    fn mobile_viewport_forces_maximize_and_disables_drag() {
        let mut state = DesktopState::default();
        let id = open(&mut state, "a", 1);

        let effects = reduce_desktop(
            &mut state,
            DesktopAction::SetViewport(Viewport {
                width: 390,
                height: 844,
            }),
        );
        assert_eq!(effects, vec![RuntimeEffect::LayoutModeChanged(LayoutMode::Mobile)]);
        assert!(window(&state, &id).is_maximized);

        let policy = state.interaction_policy(&id).expect("policy");
        assert!(!policy.can_drag);
        assert!(!policy.can_resize);
        assert_eq!(policy.min_width, Dimension::full());

        let late = open(&mut state, "b", 2);
        assert!(window(&state, &late).is_maximized);

        reduce_desktop(
            &mut state,
            DesktopAction::ToggleMaximize {
                window_id: late.clone(),
            },
        );
        assert!(window(&state, &late).is_maximized);

        let mut edited = window(&state, &late).clone();
        edited.is_maximized = false;
        edited.size = WindowSize::px(300, 300);
        reduce_desktop(&mut state, DesktopAction::UpdateWindow(Box::new(edited)));
        assert!(window(&state, &late).is_maximized);
    }

    #[test]
    fn leaving_mobile_keeps_windows_maximized() {
        let mut state = DesktopState::default();
        let id = open(&mut state, "a", 1);
        reduce_desktop(
            &mut state,
            DesktopAction::SetViewport(Viewport {
                width: 640,
                height: 900,
            }),
        );
        let effects = reduce_desktop(
            &mut state,
            DesktopAction::SetViewport(Viewport {
                width: 1280,
                height: 900,
            }),
        );

        assert_eq!(effects, vec![RuntimeEffect::LayoutModeChanged(LayoutMode::Desktop)]);
        assert!(window(&state, &id).is_maximized);
        let policy = state.interaction_policy(&id).expect("policy");
        assert!(!policy.can_drag);
        assert_eq!(policy.min_width, Dimension::Px(400));
    }

    #[test]
    fn remove_app_closes_its_windows() {
        let mut state = DesktopState::default();
        let doomed = open(&mut state, "a", 1);
        let kept = open(&mut state, "b", 2);

        let effects = reduce_desktop(
            &mut state,
            DesktopAction::RemoveApp {
                app_id: "a".to_string(),
            },
        );

        assert_eq!(effects, vec![RuntimeEffect::WindowClosed(doomed)]);
        assert_eq!(
            state.windows.iter().map(|w| w.id.clone()).collect::<Vec<_>>(),
            vec![kept]
        );
    }
}
