// src/components.rs

//! Install component conventions shared by the packager and the installer.

use std::path::{Path, PathBuf};

/// Directories merged from an extracted archive into the install prefix,
/// in no particular order. The tail entries cover Qt-style payloads.
pub const INSTALL_COMPONENTS: &[&str] = &[
    "include",
    "lib",
    "share",
    "bin",
    "sbin",
    "doc",
    "mkspecs",
    "openharmony",
    "plugins",
    "qml",
    "translations",
];

/// Basenames excluded from the archive at packaging time
pub const INSTALL_EXCLUDED: &[&str] = &["libexec"];

/// Post-install hook filename, looked up at the extracted tree root
pub const POSTINST_SCRIPT: &str = "postinst";

/// A missing optional component is silent; missing `include`/`lib` warns.
pub fn is_optional_component(component: &str) -> bool {
    !matches!(component, "include" | "lib")
}

/// Path of the post-install hook under `dir`, if one exists
pub fn postinst_path(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(POSTINST_SCRIPT);
    path.is_file().then_some(path)
}
