//! Name Sanitizer
//!
//! Maps logical table names and partition keys to file-system names.
//!
//! ## Encoding
//! Each UTF-8 byte outside `[A-Za-z0-9._-]` (including `%` itself) is written
//! as `%XX` with upper-case hex. The mapping is deterministic and injective:
//! two distinct logical names never share a physical name, and listing can
//! decode directory entries back to logical names.
//!
//! ```text
//! "Orders"        → "Orders.table"
//! "eu/west"       → "eu%2Fwest.partition.csv"
//! "100%"          → "100%25.partition.csv"
//! ```
//!
//! ## Long names
//! Escaping triples every non-ASCII byte, so a stem longer than
//! `MAX_STEM_LEN` is cut and tagged with a SHA-256 digest of the full logical
//! name: `<encoded prefix>~<32 hex>`. `~` never appears in an encoded name,
//! so digest stems cannot collide with plain ones. A digest stem cannot be
//! decoded; the store keeps the logical name in a name file next to it.
//!
//! Names that differ only by letter case still alias on case-insensitive
//! filesystems.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Suffix of every table directory
pub const TABLE_SUFFIX: &str = ".table";

/// Suffix (and extension) of every partition file
pub const PARTITION_SUFFIX: &str = ".partition.csv";

/// Extension appended to an in-flight partition rewrite
pub const TEMP_SUFFIX: &str = ".tmp";

/// Extension of the file holding the logical name behind a digest stem
pub const NAME_SUFFIX: &str = ".name";

/// Name file of a table whose directory uses a digest stem
pub const TABLE_NAME_FILE: &str = "table.name";

/// Longest stem handed to the filesystem
///
/// Leaves room for the partition suffix and a temp tag under the common
/// 255-byte file name limit.
pub const MAX_STEM_LEN: usize = 160;

const DIGEST_MARK: char = '~';
const DIGEST_HEX_LEN: usize = 32;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// A directory entry decoded back to a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryName {
    /// The stem decodes to this logical name
    Logical(String),
    /// Digest stem; the logical name is in its name file
    Digest(String),
}

/// Encode a logical name into a safe file-system name component
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for &byte in name.as_bytes() {
        if is_safe(byte) {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(HEX[(byte >> 4) as usize] as char);
            out.push(HEX[(byte & 0x0F) as usize] as char);
        }
    }
    out
}

/// Decode a sanitized component back to its logical name
///
/// Returns `None` for anything `sanitize` could not have produced.
pub fn restore(sanitized: &str) -> Option<String> {
    let bytes = sanitized.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0;

    while pos < bytes.len() {
        let byte = bytes[pos];
        if byte == b'%' {
            let hi = hex_value(*bytes.get(pos + 1)?)?;
            let lo = hex_value(*bytes.get(pos + 2)?)?;
            let decoded = (hi << 4) | lo;
            // A safe byte is never escaped
            if is_safe(decoded) {
                return None;
            }
            out.push(decoded);
            pos += 3;
        } else if is_safe(byte) {
            out.push(byte);
            pos += 1;
        } else {
            return None;
        }
    }

    String::from_utf8(out).ok()
}

/// Bounded file-system stem for a logical name
///
/// Equal to `sanitize(name)` unless that exceeds `MAX_STEM_LEN`.
pub fn stem(name: &str) -> String {
    let encoded = sanitize(name);
    if encoded.len() <= MAX_STEM_LEN {
        return encoded;
    }

    let mut cut = MAX_STEM_LEN - 1 - DIGEST_HEX_LEN;
    // Never split an escape
    if let Some(pos) = encoded[..cut].rfind('%') {
        if pos + 3 > cut {
            cut = pos;
        }
    }

    let mut out = String::with_capacity(MAX_STEM_LEN);
    out.push_str(&encoded[..cut]);
    out.push(DIGEST_MARK);
    for &byte in &Sha256::digest(name.as_bytes())[..DIGEST_HEX_LEN / 2] {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0F) as usize] as char);
    }
    out
}

/// True if `stem` was cut and tagged with a digest
pub fn is_digest_stem(stem: &str) -> bool {
    let Some((prefix, digest)) = stem.rsplit_once(DIGEST_MARK) else {
        return false;
    };
    digest.len() == DIGEST_HEX_LEN
        && digest.bytes().all(|b| hex_value(b).is_some())
        && prefix.bytes().all(|b| is_safe(b) || b == b'%')
}

/// Directory name for a table: "Orders" → "Orders.table"
pub fn table_dir_name(table: &str) -> String {
    format!("{}{}", stem(table), TABLE_SUFFIX)
}

/// File name for a partition: "eu" → "eu.partition.csv"
pub fn partition_file_name(partition_key: &str) -> String {
    format!("{}{}", stem(partition_key), PARTITION_SUFFIX)
}

/// Name file kept beside a partition file with a digest stem
pub fn partition_name_file(partition_key: &str) -> String {
    format!("{}{}", stem(partition_key), NAME_SUFFIX)
}

/// Parse a table directory path
/// "…/Orders.table" → Some(Logical("Orders"))
pub fn parse_table_dir_name(path: &Path) -> Option<EntryName> {
    parse_with_suffix(path, TABLE_SUFFIX)
}

/// Parse a partition file path
/// "…/eu.partition.csv" → Some(Logical("eu"))
pub fn parse_partition_file_name(path: &Path) -> Option<EntryName> {
    parse_with_suffix(path, PARTITION_SUFFIX)
}

fn parse_with_suffix(path: &Path, suffix: &str) -> Option<EntryName> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(suffix)?;
    if stem.is_empty() {
        return None;
    }
    if is_digest_stem(stem) {
        return Some(EntryName::Digest(stem.to_string()));
    }
    restore(stem).map(EntryName::Logical)
}

fn is_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}
