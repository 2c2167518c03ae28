use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WindowDefaults {
    width: u32,
    height: u32,
    #[serde(default)]
    min_width: Option<u32>,
    #[serde(default)]
    min_height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppManifest {
    schema_version: u32,
    app_id: String,
    display_name: String,
    icon: String,
    category: String,
    description: String,
    mount: String,
    #[serde(default)]
    component_key: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    protected: bool,
    #[serde(default)]
    screenshots: Vec<String>,
    #[serde(default)]
    features: Vec<String>,
    window_defaults: WindowDefaults,
}

fn app_manifest_paths(root: &Path) -> Vec<PathBuf> {
    let mut paths = vec![root
        .join("..")
        .join("apps")
        .join("chat")
        .join("app.manifest.toml")];
    paths.extend(
        ["appstore", "settings"]
            .iter()
            .map(|name| root.join("manifests").join(format!("{name}.manifest.toml"))),
    );
    paths
}

fn main() {
    let crate_root = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let mut manifests = Vec::<AppManifest>::new();

    for path in app_manifest_paths(&crate_root) {
        println!("cargo:rerun-if-changed={}", path.display());
        let raw = fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
        let manifest: AppManifest = toml::from_str(&raw)
            .unwrap_or_else(|err| panic!("failed to parse {}: {err}", path.display()));
        if manifest.schema_version != 1 {
            panic!(
                "manifest schema mismatch in {}: expected 1 found {}",
                path.display(),
                manifest.schema_version
            );
        }
        let target = match manifest.mount.as_str() {
            "component" => manifest.component_key.as_deref(),
            "url" => manifest.url.as_deref(),
            other => panic!("unknown mount kind `{other}` in {}", path.display()),
        };
        if target.map_or(true, |value| value.trim().is_empty()) {
            panic!(
                "manifest {} declares mount `{}` without a target",
                path.display(),
                manifest.mount
            );
        }
        manifests.push(manifest);
    }

    manifests.sort_by(|a, b| a.app_id.cmp(&b.app_id));
    let json = serde_json::to_string_pretty(&manifests).expect("serialize app manifest catalog");
    let generated = format!(
        "/// Build-time generated app manifest catalog JSON.\n\
pub const APP_MANIFEST_CATALOG_JSON: &str = r##\"{}\"##;\n",
        json
    );

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR"));
    let out_file = out_dir.join("app_catalog_generated.rs");
    fs::write(&out_file, generated)
        .unwrap_or_else(|err| panic!("failed to write {}: {err}", out_file.display()));
}
