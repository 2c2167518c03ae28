use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::apps::AppDescriptor;

pub const FULL_EXTENT: &str = "100%";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowId(pub String);

impl WindowId {
    /// Builds the `{app_id}-{timestamp}` token used for new windows.
    pub fn for_app(app_id: &str, timestamp_ms: u64) -> Self {
        Self(format!("{app_id}-{timestamp_ms}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One axis of a window's placement: pixels or a relative extent such as `"100%"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Px(i32),
    Relative(String),
}

impl Dimension {
    pub fn full() -> Self {
        Self::Relative(FULL_EXTENT.to_string())
    }

    pub fn px(&self) -> Option<i32> {
        match self {
            Self::Px(value) => Some(*value),
            Self::Relative(_) => None,
        }
    }
}

impl From<i32> for Dimension {
    fn from(value: i32) -> Self {
        Self::Px(value)
    }
}

impl From<u32> for Dimension {
    fn from(value: u32) -> Self {
        Self::Px(i32::try_from(value).unwrap_or(i32::MAX))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowPosition {
    pub x: Dimension,
    pub y: Dimension,
}

impl WindowPosition {
    pub fn px(x: i32, y: i32) -> Self {
        Self {
            x: Dimension::Px(x),
            y: Dimension::Px(y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: Dimension,
    pub height: Dimension,
}

impl WindowSize {
    pub fn px(width: u32, height: u32) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
        }
    }

    pub fn full() -> Self {
        Self {
            width: Dimension::full(),
            height: Dimension::full(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub position: WindowPosition,
    pub size: WindowSize,
}

/// Placement and state of one open app.
///
/// At most one record exists per app id. The most recently focused record holds the strict
/// maximum `z_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRecord {
    pub id: WindowId,
    pub app: Arc<AppDescriptor>,
    pub is_minimized: bool,
    pub is_maximized: bool,
    pub z_index: u32,
    pub position: WindowPosition,
    pub size: WindowSize,
    /// Bounds captured on maximize and reapplied on restore.
    pub restore_bounds: Option<WindowBounds>,
}

impl WindowRecord {
    pub fn app_id(&self) -> &str {
        &self.app.id
    }

    pub fn bounds(&self) -> WindowBounds {
        WindowBounds {
            position: self.position.clone(),
            size: self.size.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Desktop,
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Tunables for window placement and the responsive breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPolicy {
    /// Viewports at most this wide use [`LayoutMode::Mobile`].
    pub mobile_breakpoint: u32,
    pub cascade_origin: i32,
    pub cascade_step: i32,
    pub default_width: u32,
    pub default_height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            mobile_breakpoint: 640,
            cascade_origin: 50,
            cascade_step: 20,
            default_width: 800,
            default_height: 600,
            min_width: 400,
            min_height: 300,
        }
    }
}

impl LayoutPolicy {
    pub fn classify(&self, viewport: Viewport) -> LayoutMode {
        if viewport.width <= self.mobile_breakpoint {
            LayoutMode::Mobile
        } else {
            LayoutMode::Desktop
        }
    }
}

/// What the pointer layer may do with one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionPolicy {
    pub can_drag: bool,
    pub can_resize: bool,
    pub min_width: Dimension,
    pub min_height: Dimension,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DesktopState {
    pub windows: Vec<WindowRecord>,
    pub layout_mode: LayoutMode,
    pub viewport: Option<Viewport>,
    pub policy: LayoutPolicy,
}

impl DesktopState {
    pub fn with_policy(policy: LayoutPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn is_open(&self, app_id: &str) -> bool {
        self.windows.iter().any(|window| window.app_id() == app_id)
    }

    pub fn window(&self, window_id: &WindowId) -> Option<&WindowRecord> {
        self.windows.iter().find(|window| &window.id == window_id)
    }

    pub fn window_for_app(&self, app_id: &str) -> Option<&WindowRecord> {
        self.windows.iter().find(|window| window.app_id() == app_id)
    }

    /// Returns the window holding the highest z-index.
    pub fn top_window(&self) -> Option<&WindowRecord> {
        self.windows.iter().max_by_key(|window| window.z_index)
    }

    pub fn is_mobile(&self) -> bool {
        self.layout_mode == LayoutMode::Mobile
    }

    /// Drag/resize capabilities and minimum size for `window_id` under the current layout.
    pub fn interaction_policy(&self, window_id: &WindowId) -> Option<InteractionPolicy> {
        let window = self.window(window_id)?;
        if self.is_mobile() {
            return Some(InteractionPolicy {
                can_drag: false,
                can_resize: false,
                min_width: Dimension::full(),
                min_height: Dimension::full(),
            });
        }

        let (min_width, min_height) = crate::window_manager::min_size(&self.policy, &window.app);
        Some(InteractionPolicy {
            can_drag: !window.is_maximized,
            can_resize: !window.is_maximized,
            min_width: min_width.into(),
            min_height: min_height.into(),
        })
    }
}
