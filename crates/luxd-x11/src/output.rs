//! Matching luxd displays to RandR outputs
//!
//! The primary key is the EDID identity block exposed as an output
//! property; connector-name comparison is only a fallback for outputs
//! without one.

use luxd_hal::{DisplayInfo, identity_matches};
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{ConnectionExt as _, Window};
use x11rb::rust_connection::RustConnection;

/// Geometry and CRTC of a matched output.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputTarget {
    pub crtc: x11rb::protocol::randr::Crtc,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// Split an output/connector name into its type letters and trailing index,
/// e.g. `HDMI-1` -> ("HDMI", "1"), `card0-HDMI-A-1` -> ("CARD HDMI A", "1").
fn name_parts(name: &str) -> (Vec<String>, String) {
    let mut letters = Vec::new();
    let mut current = String::new();
    let mut index = String::new();

    for c in name.chars() {
        if c.is_ascii_alphabetic() {
            current.push(c.to_ascii_uppercase());
        } else {
            if !current.is_empty() {
                letters.push(std::mem::take(&mut current));
            }
            if c.is_ascii_digit() {
                index.clear();
                index.push(c);
            }
        }
    }
    if !current.is_empty() {
        letters.push(current);
    }
    if let Some(last) = name.chars().last() {
        if last.is_ascii_digit() {
            // Multi-digit trailing index
            index = name
                .chars()
                .rev()
                .take_while(|c| c.is_ascii_digit())
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
        }
    }

    (letters, index)
}

/// Whether a DRM connector name and a RandR output name plausibly refer to
/// the same physical connector (same connector type, same index).
pub(crate) fn connector_matches(connector: &str, output_name: &str) -> bool {
    let (conn_types, conn_idx) = name_parts(connector);
    let (out_types, out_idx) = name_parts(output_name);

    if conn_idx.is_empty() || conn_idx != out_idx {
        return false;
    }
    out_types
        .iter()
        .any(|t| t.len() > 1 && conn_types.contains(t))
}

/// Find the CRTC currently driving `display`.
pub(crate) fn find_target(
    conn: &RustConnection,
    root: Window,
    display: &DisplayInfo,
) -> Result<OutputTarget, String> {
    let resources = conn
        .randr_get_screen_resources_current(root)
        .map_err(|e| e.to_string())?
        .reply()
        .map_err(|e| e.to_string())?;

    let edid_atom = conn
        .intern_atom(false, b"EDID")
        .map_err(|e| e.to_string())?
        .reply()
        .map_err(|e| e.to_string())?
        .atom;

    let mut fallback = None;

    for output in resources.outputs {
        let info = conn
            .randr_get_output_info(output, resources.config_timestamp)
            .map_err(|e| e.to_string())?
            .reply()
            .map_err(|e| e.to_string())?;

        if info.connection != x11rb::protocol::randr::Connection::CONNECTED || info.crtc == 0 {
            continue;
        }

        let name = String::from_utf8_lossy(&info.name).to_string();

        let edid_match = display.edid.as_deref().is_some_and(|target| {
            conn.randr_get_output_property(output, edid_atom, x11rb::NONE, 0, u32::MAX, false, false)
                .ok()
                .and_then(|c| c.reply().ok())
                .map(|prop| prop.format == 8 && identity_matches(target, &prop.data))
                .unwrap_or(false)
        });

        if edid_match {
            return target_for(conn, info.crtc, resources.config_timestamp);
        }
        if fallback.is_none() && connector_matches(&display.connector, &name) {
            fallback = Some(info.crtc);
        }
    }

    match fallback {
        Some(crtc) => {
            let display_id = display.id;
            tracing::debug!(
                "Display {}: matched RandR output by connector name only",
                display_id
            );
            target_for(conn, crtc, resources.config_timestamp)
        }
        None => Err(format!("no RandR output for connector {}", display.connector)),
    }
}

fn target_for(
    conn: &RustConnection,
    crtc: x11rb::protocol::randr::Crtc,
    timestamp: x11rb::protocol::xproto::Timestamp,
) -> Result<OutputTarget, String> {
    let info = conn
        .randr_get_crtc_info(crtc, timestamp)
        .map_err(|e| e.to_string())?
        .reply()
        .map_err(|e| e.to_string())?;

    Ok(OutputTarget {
        crtc,
        x: info.x,
        y: info.y,
        width: info.width,
        height: info.height,
    })
}
