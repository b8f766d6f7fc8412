//! Store paths and small conversion helpers

use crate::error::{Result, RssError};
use crate::layout::ELEMENT_SIZE;
use crate::types::SortOrder;
use byteorder::{ByteOrder, LittleEndian};

/// Survey-wide metadata (text header, reel header, field layout)
pub const SURVEY_PATH: &str = "survey.json";

/// Inline/crossline bounds shared by both sort orders
pub const BOUNDS_PATH: &str = "bounds";

/// Per-trace coordinate arrays
pub const COORDS_INLINE: &str = "coords/inline";
pub const COORDS_CROSSLINE: &str = "coords/crossline";
pub const COORDS_CDPX: &str = "coords/cdpx";
pub const COORDS_CDPY: &str = "coords/cdpy";

/// Per-line scale table of a sort order
pub fn scalers_path(order: SortOrder) -> String {
    format!("{}/scalers", order)
}

/// Array metadata of a sort order's seismic volume
pub fn seismic_metadata_path(order: SortOrder) -> String {
    format!("{}/seismic/metadata.json", order)
}

/// Store key of one chunk
pub fn chunk_path(order: SortOrder, coords: &[usize; 3]) -> String {
    format!("{}/seismic/c/{}.{}.{}", order, coords[0], coords[1], coords[2])
}

/// Encode stored values as little-endian bytes
pub fn u16s_to_le_bytes(values: &[u16]) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * ELEMENT_SIZE];
    LittleEndian::write_u16_into(values, &mut bytes);
    bytes
}

/// Decode little-endian bytes into stored values
pub fn le_bytes_to_u16s(bytes: &[u8]) -> Result<Vec<u16>> {
    if bytes.len() % ELEMENT_SIZE != 0 {
        return Err(RssError::InvalidVolume(
            "Byte length not aligned with element size".to_string(),
        ));
    }
    let mut values = vec![0u16; bytes.len() / ELEMENT_SIZE];
    LittleEndian::read_u16_into(bytes, &mut values);
    Ok(values)
}

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
