//! Shared window-manager transition helpers used by the desktop reducer.

use std::sync::Arc;

use crate::{
    apps::AppDescriptor,
    model::{
        DesktopState, LayoutPolicy, WindowBounds, WindowId, WindowPosition, WindowRecord,
        WindowSize,
    },
};

/// Preferred size of `app`, falling back to the policy default per axis.
pub fn preferred_size(policy: &LayoutPolicy, app: &AppDescriptor) -> (u32, u32) {
    (
        app.preferred_width.unwrap_or(policy.default_width),
        app.preferred_height.unwrap_or(policy.default_height),
    )
}

/// Desktop minimum size of `app`, falling back to the policy minimum per axis.
pub fn min_size(policy: &LayoutPolicy, app: &AppDescriptor) -> (u32, u32) {
    (
        app.min_width.unwrap_or(policy.min_width),
        app.min_height.unwrap_or(policy.min_height),
    )
}

/// Bounds of the `index`-th window in the cascade.
pub fn cascade_bounds(policy: &LayoutPolicy, app: &AppDescriptor, index: usize) -> WindowBounds {
    let offset = policy.cascade_origin
        + policy
            .cascade_step
            .saturating_mul(i32::try_from(index).unwrap_or(i32::MAX));
    let (width, height) = preferred_size(policy, app);
    WindowBounds {
        position: WindowPosition::px(offset, offset),
        size: WindowSize::px(width, height),
    }
}

/// Bounds a maximized window without captured bounds returns to.
pub fn default_restore_bounds(policy: &LayoutPolicy, app: &AppDescriptor) -> WindowBounds {
    let (width, height) = preferred_size(policy, app);
    WindowBounds {
        position: WindowPosition::px(policy.cascade_origin, policy.cascade_origin),
        size: WindowSize::px(width, height),
    }
}

/// Z-index strictly above every open window.
pub fn next_z_index(state: &DesktopState) -> u32 {
    state
        .windows
        .iter()
        .map(|window| window.z_index)
        .max()
        .unwrap_or(0)
        .saturating_add(1)
}

/// Renumbers z-indexes to `1..=n`, keeping the current stacking order.
pub fn normalize_window_stack(state: &mut DesktopState) {
    let mut order = (0..state.windows.len()).collect::<Vec<_>>();
    order.sort_by_key(|&index| state.windows[index].z_index);
    for (rank, index) in order.into_iter().enumerate() {
        state.windows[index].z_index = u32::try_from(rank + 1).unwrap_or(u32::MAX);
    }
}

/// Compacts the stack when the top z-index has reached `u32::MAX`.
pub fn ensure_z_headroom(state: &mut DesktopState) {
    if state.windows.iter().any(|window| window.z_index == u32::MAX) {
        normalize_window_stack(state);
    }
}

/// Builds the record for a newly opened app window.
pub fn new_window(state: &DesktopState, app: Arc<AppDescriptor>, timestamp_ms: u64) -> WindowRecord {
    let count = state.windows.len();
    let bounds = cascade_bounds(&state.policy, &app, count);
    let stacked = u32::try_from(count).unwrap_or(u32::MAX).saturating_add(1);
    WindowRecord {
        id: WindowId::for_app(&app.id, timestamp_ms),
        z_index: stacked.max(next_z_index(state)),
        is_minimized: false,
        is_maximized: false,
        position: bounds.position,
        size: bounds.size,
        restore_bounds: None,
        app,
    }
}

/// Fills the viewport, remembering the current bounds once.
pub fn maximize(window: &mut WindowRecord) {
    if !window.is_maximized {
        window.restore_bounds = Some(window.bounds());
    }
    window.is_maximized = true;
    window.position = WindowPosition::px(0, 0);
    window.size = WindowSize::full();
}

/// Leaves maximized state, reapplying captured bounds when present.
pub fn restore(window: &mut WindowRecord, policy: &LayoutPolicy) {
    let bounds = window
        .restore_bounds
        .take()
        .unwrap_or_else(|| default_restore_bounds(policy, &window.app));
    window.is_maximized = false;
    window.position = bounds.position;
    window.size = bounds.size;
}

/// Raises `window_id` above every other window.
///
/// Returns `false` for an empty set or unknown id.
pub fn bring_to_front(state: &mut DesktopState, window_id: &WindowId) -> bool {
    let Some(current) = state.window(window_id).map(|w| w.z_index) else {
        return false;
    };
    let already_top = state
        .windows
        .iter()
        .filter(|w| &w.id != window_id)
        .all(|w| w.z_index < current);
    if already_top {
        return true;
    }

    ensure_z_headroom(state);
    let next = next_z_index(state);
    if let Some(window) = state.windows.iter_mut().find(|w| &w.id == window_id) {
        window.z_index = next;
    }
    true
}

/// Forces every window maximized; used while the layout is mobile.
pub fn force_maximized(state: &mut DesktopState) {
    for window in &mut state.windows {
        maximize(window);
    }
}

/// Clamps a requested desktop size to the app minimum.
pub fn clamp_size(policy: &LayoutPolicy, app: &AppDescriptor, width: u32, height: u32) -> WindowSize {
    let (min_width, min_height) = min_size(policy, app);
    WindowSize::px(width.max(min_width), height.max(min_height))
}
