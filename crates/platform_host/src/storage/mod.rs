//! Persistence contracts: versioned app-state blobs and lightweight typed preferences.

pub mod app_state;
pub mod prefs;
