//! Display enumeration via DRM sysfs
//!
//! Walks `/sys/class/drm` for connected connectors, reads their EDID blocks
//! and classifies each as built-in panel or external monitor. EDID bytes are
//! treated purely as an identity fingerprint, never parsed semantically.

use crate::HalError;
use std::fs;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};

/// Opaque per-display identifier, stable for the session.
pub type DisplayId = u32;

/// Connector types that indicate an internal panel.
const BUILTIN_CONNECTORS: [&str; 3] = ["eDP", "LVDS", "DSI"];

/// A physical display as reported by the display subsystem.
#[derive(Debug, Clone)]
pub struct DisplayInfo {
    pub id: DisplayId,
    /// DRM connector name, e.g. `card0-HDMI-A-1`.
    pub connector: String,
    /// Raw EDID identity block, if the connector exposes one.
    pub edid: Option<Vec<u8>>,
    /// True for internal panels (eDP/LVDS/DSI connectors).
    pub builtin: bool,
}

/// Compare two identity blocks over their first `min(128, len(a), len(b))`
/// bytes. The first 128 bytes carry the vendor/product identity; anything
/// beyond (extension blocks) is ignored.
pub fn identity_matches(a: &[u8], b: &[u8]) -> bool {
    let len = 128.min(a.len()).min(b.len());
    if len == 0 {
        return false;
    }
    a[..len] == b[..len]
}

/// Source of the active display list.
pub trait DisplayEnumerator: Send {
    fn enumerate(&self) -> Result<Vec<DisplayInfo>, HalError>;
}

/// Enumerates displays from `/sys/class/drm`.
pub struct DrmEnumerator {
    drm_dir: PathBuf,
}

impl DrmEnumerator {
    pub fn new() -> Self {
        Self {
            drm_dir: PathBuf::from("/sys/class/drm"),
        }
    }

    /// Use an alternate sysfs root (for tests).
    pub fn with_root(drm_dir: impl Into<PathBuf>) -> Self {
        Self {
            drm_dir: drm_dir.into(),
        }
    }

    fn connector_is_builtin(name: &str) -> bool {
        BUILTIN_CONNECTORS.iter().any(|t| name.contains(t))
    }

    fn read_edid(path: &Path) -> Option<Vec<u8>> {
        match fs::read(path.join("edid")) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            _ => None,
        }
    }

    fn is_connected(path: &Path) -> bool {
        fs::read_to_string(path.join("status"))
            .map(|s| s.trim() == "connected")
            .unwrap_or(false)
    }
}

impl Default for DrmEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a session-stable id from the connector name.
pub fn display_id_for(connector: &str) -> DisplayId {
    let mut hasher = DefaultHasher::new();
    connector.hash(&mut hasher);
    hasher.finish() as DisplayId
}

impl DisplayEnumerator for DrmEnumerator {
    fn enumerate(&self) -> Result<Vec<DisplayInfo>, HalError> {
        let mut displays = Vec::new();

        if !self.drm_dir.exists() {
            tracing::warn!("DRM sysfs not available at {}", self.drm_dir.display());
            return Ok(displays);
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&self.drm_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            // Connectors look like card0-HDMI-A-1; bare card0 is the device node
            .filter(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().contains('-'))
                    .unwrap_or(false)
                    && p.join("status").exists()
            })
            .collect();
        entries.sort();

        for path in entries {
            if !Self::is_connected(&path) {
                continue;
            }

            let connector = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let edid = Self::read_edid(&path);
            if edid.is_none() {
                tracing::debug!("No EDID for connector {}", connector);
            }

            displays.push(DisplayInfo {
                id: display_id_for(&connector),
                builtin: Self::connector_is_builtin(&connector),
                connector,
                edid,
            });
        }

        tracing::debug!("Found {} connected display(s)", displays.len());
        Ok(displays)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_connector(root: &Path, name: &str, status: &str, edid: Option<&[u8]>) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("status"), status).unwrap();
        if let Some(bytes) = edid {
            fs::write(dir.join("edid"), bytes).unwrap();
        }
    }

    #[test]
    fn test_identity_match_prefix() {
        // Agreeing on the first 128 bytes, differing beyond, is a match
        let mut a = vec![0xAAu8; 256];
        let mut b = a.clone();
        b[200] = 0x01;
        assert!(identity_matches(&a, &b));

        // Any difference inside the first 128 bytes is a mismatch
        a[5] = 0x00;
        assert!(!identity_matches(&a, &b));
    }

    #[test]
    fn test_identity_match_short_blocks() {
        // Shorter blocks compare over their common length
        let a = vec![0x11u8; 64];
        let b = vec![0x11u8; 300];
        assert!(identity_matches(&a, &b));

        let c = vec![0x12u8; 64];
        assert!(!identity_matches(&a, &c));
    }

    #[test]
    fn test_identity_match_empty() {
        assert!(!identity_matches(&[], &[0x11]));
        assert!(!identity_matches(&[], &[]));
    }

    #[test]
    fn test_display_id_stable() {
        assert_eq!(
            display_id_for("card0-HDMI-A-1"),
            display_id_for("card0-HDMI-A-1")
        );
        assert_ne!(
            display_id_for("card0-HDMI-A-1"),
            display_id_for("card0-eDP-1")
        );
    }

    #[test]
    fn test_enumerate_connected_only() {
        let tmp = tempfile::tempdir().unwrap();
        make_connector(tmp.path(), "card0-eDP-1", "connected", Some(&[0x00; 128]));
        make_connector(tmp.path(), "card0-HDMI-A-1", "connected", Some(&[0x01; 128]));
        make_connector(tmp.path(), "card0-DP-1", "disconnected", None);

        let displays = DrmEnumerator::with_root(tmp.path()).enumerate().unwrap();
        assert_eq!(displays.len(), 2);

        let edp = displays.iter().find(|d| d.connector.contains("eDP")).unwrap();
        assert!(edp.builtin);
        assert!(edp.edid.is_some());

        let hdmi = displays
            .iter()
            .find(|d| d.connector.contains("HDMI"))
            .unwrap();
        assert!(!hdmi.builtin);
    }

    #[test]
    fn test_enumerate_missing_root() {
        let displays = DrmEnumerator::with_root("/nonexistent/drm")
            .enumerate()
            .unwrap();
        assert!(displays.is_empty());
    }

    #[test]
    fn test_missing_edid_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        make_connector(tmp.path(), "card0-DP-2", "connected", None);

        let displays = DrmEnumerator::with_root(tmp.path()).enumerate().unwrap();
        assert_eq!(displays.len(), 1);
        assert!(displays[0].edid.is_none());
    }
}
