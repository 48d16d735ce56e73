//! Extended-attribute read, write and removal.
//!
//! Attributes are typed name/value pairs attached to a file outside its
//! byte stream. The host xattr store carries no per-attribute type
//! field, so every attribute lives in a `user.haiku.`-namespaced xattr
//! whose value is a 4-byte big-endian type code followed by the
//! payload. Foreign xattrs outside the namespace are left alone and
//! never reported.
//!
//! All three operations are single blocking calls; writes and removes
//! are visible to the next read. Consistency under concurrent callers
//! is the host store's business, not this layer's.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::LazyLock;

use bitflags::bitflags;
use xattr::FileExt;

use crate::enums::EnumTable;
use crate::error::{Result, StorageError};
use crate::types::{self, check_payload_width};

/// Namespace prefix for attributes this store owns.
const XATTR_PREFIX: &str = "user.haiku.";

/// Native limit on attribute name length.
pub const B_ATTR_NAME_LENGTH: usize = 255;

bitflags! {
    /// Behavior flags for attribute operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AttrFlags: u32 {
        /// Operate on a symlink itself instead of its target.
        const SYMLINK = 0x0000_0001;
        /// Caller-side payloads are big-endian for fixed-width types.
        const BIG_ENDIAN = 0x0000_0002;
        /// Caller-side payloads are little-endian for fixed-width types.
        const LITTLE_ENDIAN = 0x0000_0004;
    }
}

/// The process-wide `attr` flag table.
pub static ATTR: LazyLock<EnumTable> = LazyLock::new(|| {
    EnumTable::build(
        "attr",
        [
            ("SYMLINK", AttrFlags::SYMLINK.bits() as i32),
            ("BIG_ENDIAN", AttrFlags::BIG_ENDIAN.bits() as i32),
            ("LITTLE_ENDIAN", AttrFlags::LITTLE_ENDIAN.bits() as i32),
        ],
    )
    .expect("attr flag names are unique")
});

fn validate_flags(flags: AttrFlags) -> Result<()> {
    if flags.contains(AttrFlags::BIG_ENDIAN | AttrFlags::LITTLE_ENDIAN) {
        return Err(StorageError::InvalidArgument(
            "BIG_ENDIAN and LITTLE_ENDIAN are mutually exclusive".to_string(),
        ));
    }
    Ok(())
}

/// The byte-reversal unit for endian conversion of a payload, if any.
///
/// Scalar numerics swap as a whole; point and rect payloads are arrays
/// of 32-bit floats and swap per element; single-byte and
/// variable-width payloads have no byte order.
fn swap_unit(type_code: i32) -> Option<usize> {
    match type_code {
        types::B_INT16_TYPE | types::B_UINT16_TYPE => Some(2),
        types::B_INT32_TYPE
        | types::B_UINT32_TYPE
        | types::B_SIZE_T_TYPE
        | types::B_SSIZE_T_TYPE
        | types::B_TIME_TYPE
        | types::B_FLOAT_TYPE
        | types::B_POINT_TYPE
        | types::B_RECT_TYPE => Some(4),
        types::B_INT64_TYPE | types::B_UINT64_TYPE | types::B_OFF_T_TYPE
        | types::B_DOUBLE_TYPE => Some(8),
        _ => None,
    }
}

/// Converts a payload between caller byte order and native order.
///
/// The conversion is its own inverse, so the same routine serves reads
/// and writes. Native order is little-endian; only a `BIG_ENDIAN`
/// caller view requires work.
fn convert_endianness(flags: AttrFlags, type_code: i32, payload: &mut [u8]) {
    if !flags.contains(AttrFlags::BIG_ENDIAN) {
        return;
    }
    if let Some(unit) = swap_unit(type_code) {
        for chunk in payload.chunks_exact_mut(unit) {
            chunk.reverse();
        }
    }
}

/// Either an open file handle or a no-traverse path, per the SYMLINK flag.
enum AttrTarget<'a> {
    File(File),
    Symlink(&'a Path),
}

impl<'a> AttrTarget<'a> {
    fn open(path: &'a Path, flags: AttrFlags) -> Result<Self> {
        if flags.contains(AttrFlags::SYMLINK) {
            // Path-based xattr calls do not traverse symlinks.
            path.symlink_metadata()
                .map_err(|source| StorageError::from_io(path, source))?;
            Ok(Self::Symlink(path))
        } else {
            File::open(path)
                .map(Self::File)
                .map_err(|source| StorageError::from_io(path, source))
        }
    }

    fn list(&self) -> std::io::Result<Vec<std::ffi::OsString>> {
        match self {
            Self::File(file) => Ok(file.list_xattr()?.collect()),
            Self::Symlink(path) => Ok(xattr::list(path)?.collect()),
        }
    }

    fn get(&self, name: &str) -> std::io::Result<Option<Vec<u8>>> {
        match self {
            Self::File(file) => file.get_xattr(name),
            Self::Symlink(path) => xattr::get(path, name),
        }
    }

    fn set(&self, name: &str, value: &[u8]) -> std::io::Result<()> {
        match self {
            Self::File(file) => file.set_xattr(name, value),
            Self::Symlink(path) => xattr::set(path, name, value),
        }
    }

    fn remove(&self, name: &str) -> std::io::Result<()> {
        match self {
            Self::File(file) => file.remove_xattr(name),
            Self::Symlink(path) => xattr::remove(path, name),
        }
    }
}

fn namespaced(name: &str) -> String {
    format!("{XATTR_PREFIX}{name}")
}

/// Splits a stored xattr value into (type code, payload).
///
/// A namespaced value too short for the header was not written by this
/// store's codec; it reads back as raw bytes rather than failing the
/// whole enumeration.
fn decode_stored(value: Vec<u8>) -> (i32, Vec<u8>) {
    if value.len() >= 4 {
        let code = i32::from_be_bytes([value[0], value[1], value[2], value[3]]);
        (code, value[4..].to_vec())
    } else {
        (types::B_RAW_TYPE, value)
    }
}

fn encode_stored(type_code: i32, payload: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(4 + payload.len());
    value.extend_from_slice(&type_code.to_be_bytes());
    value.extend_from_slice(payload);
    value
}

/// Reads every attribute of `path` as name → (type code, payload).
///
/// A file with no attributes yields an empty map; a missing file fails
/// with `NotFound`. Enumeration order is filesystem-defined and not a
/// contract.
pub fn read_attrs(path: &Path, flags: AttrFlags) -> Result<BTreeMap<String, (i32, Vec<u8>)>> {
    validate_flags(flags)?;
    let target = AttrTarget::open(path, flags)?;

    let names = target
        .list()
        .map_err(|source| StorageError::from_io(path, source))?;

    let mut attributes = BTreeMap::new();
    for raw_name in names {
        let Some(name) = raw_name
            .to_str()
            .and_then(|n| n.strip_prefix(XATTR_PREFIX))
        else {
            continue;
        };
        // Racing removals surface as a missing value; skip, not fail.
        let Some(value) = target
            .get(&namespaced(name))
            .map_err(|source| StorageError::from_io(path, source))?
        else {
            continue;
        };
        let (type_code, mut payload) = decode_stored(value);
        convert_endianness(flags, type_code, &mut payload);
        attributes.insert(name.to_string(), (type_code, payload));
    }
    Ok(attributes)
}

/// Reads a single attribute, `Ok(None)` when the file has no such attribute.
pub fn read_attr(path: &Path, name: &str, flags: AttrFlags) -> Result<Option<(i32, Vec<u8>)>> {
    validate_flags(flags)?;
    let target = AttrTarget::open(path, flags)?;
    let value = target
        .get(&namespaced(name))
        .map_err(|source| StorageError::from_io(path, source))?;
    Ok(value.map(|value| {
        let (type_code, mut payload) = decode_stored(value);
        convert_endianness(flags, type_code, &mut payload);
        (type_code, payload)
    }))
}

/// Writes one attribute, overwriting any existing attribute of the name.
///
/// `type_code` must come from the `types` table and the payload length
/// must agree with the code's fixed width where one exists.
pub fn write_attr(
    path: &Path,
    name: &str,
    type_code: i32,
    payload: &[u8],
    flags: AttrFlags,
) -> Result<()> {
    validate_flags(flags)?;
    if name.is_empty() || name.len() > B_ATTR_NAME_LENGTH {
        return Err(StorageError::InvalidArgument(format!(
            "attribute name length {} outside 1..={B_ATTR_NAME_LENGTH}",
            name.len()
        )));
    }
    if !types::TYPES.contains_code(type_code) {
        return Err(StorageError::InvalidArgument(format!(
            "unknown attribute type code 0x{type_code:08x}"
        )));
    }
    check_payload_width(type_code, payload)?;

    let mut native = payload.to_vec();
    convert_endianness(flags, type_code, &mut native);

    let target = AttrTarget::open(path, flags)?;
    target
        .set(&namespaced(name), &encode_stored(type_code, &native))
        .map_err(|source| StorageError::from_io(path, source))
}

/// Convenience over [`write_attr`] for typed values.
pub fn write_attr_value(
    path: &Path,
    name: &str,
    value: &crate::types::AttrValue,
    flags: AttrFlags,
) -> Result<()> {
    write_attr(path, name, value.type_code(), &value.to_bytes(), flags)
}

/// Removes one attribute.
///
/// Removing an attribute the file does not have succeeds; only a
/// missing file is an error.
pub fn remove_attr(path: &Path, name: &str, flags: AttrFlags) -> Result<()> {
    validate_flags(flags)?;
    let target = AttrTarget::open(path, flags)?;
    match target.remove(&namespaced(name)) {
        Ok(()) => Ok(()),
        Err(source) if is_missing_attr(&source) => Ok(()),
        Err(source) => Err(StorageError::from_io(path, source)),
    }
}

/// Whether an xattr failure means "no such attribute" on this platform.
fn is_missing_attr(err: &std::io::Error) -> bool {
    #[cfg(target_os = "linux")]
    const ENOATTR: i32 = 61; // ENODATA
    #[cfg(any(target_os = "macos", target_os = "freebsd"))]
    const ENOATTR: i32 = 93;
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "freebsd")))]
    const ENOATTR: i32 = -1;

    err.raw_os_error() == Some(ENOATTR) || err.kind() == std::io::ErrorKind::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttrValue, B_INT32_TYPE, B_MIME_STRING_TYPE, B_RAW_TYPE, B_STRING_TYPE};
    use tempfile::NamedTempFile;

    #[test]
    fn attr_table_matches_flags() {
        assert_eq!(ATTR.lookup("SYMLINK").unwrap(), 1);
        assert_eq!(ATTR.lookup("BIG_ENDIAN").unwrap(), 2);
        assert_eq!(ATTR.lookup("LITTLE_ENDIAN").unwrap(), 4);
        assert_eq!(ATTR.len(), 3);
    }

    #[test]
    fn write_then_read_round_trips() {
        let file = NamedTempFile::new().expect("create temp file");
        write_attr(
            file.path(),
            "BEOS:TYPE",
            B_MIME_STRING_TYPE,
            b"text/plain",
            AttrFlags::empty(),
        )
        .unwrap();

        let attrs = read_attrs(file.path(), AttrFlags::empty()).unwrap();
        assert_eq!(
            attrs.get("BEOS:TYPE"),
            Some(&(B_MIME_STRING_TYPE, b"text/plain".to_vec()))
        );
    }

    #[test]
    fn file_with_no_attributes_reads_empty() {
        let file = NamedTempFile::new().expect("create temp file");
        let attrs = read_attrs(file.path(), AttrFlags::empty()).unwrap();
        assert!(attrs.is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = Path::new("/no/such/file/here");
        assert!(matches!(
            read_attrs(path, AttrFlags::empty()),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            write_attr(path, "a", B_RAW_TYPE, b"x", AttrFlags::empty()),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            remove_attr(path, "a", AttrFlags::empty()),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn overwrite_replaces_value_and_type() {
        let file = NamedTempFile::new().expect("create temp file");
        write_attr_value(
            file.path(),
            "version",
            &AttrValue::Int32(1),
            AttrFlags::empty(),
        )
        .unwrap();
        write_attr_value(
            file.path(),
            "version",
            &AttrValue::Str("two".into()),
            AttrFlags::empty(),
        )
        .unwrap();

        let attrs = read_attrs(file.path(), AttrFlags::empty()).unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("version"), Some(&(B_STRING_TYPE, b"two".to_vec())));
    }

    #[test]
    fn remove_is_idempotent() {
        let file = NamedTempFile::new().expect("create temp file");
        write_attr(file.path(), "tag", B_RAW_TYPE, &[1, 2], AttrFlags::empty()).unwrap();

        remove_attr(file.path(), "tag", AttrFlags::empty()).unwrap();
        assert!(read_attrs(file.path(), AttrFlags::empty())
            .unwrap()
            .is_empty());
        // Second removal of the now-absent attribute still succeeds.
        remove_attr(file.path(), "tag", AttrFlags::empty()).unwrap();
        remove_attr(file.path(), "never-existed", AttrFlags::empty()).unwrap();
    }

    #[test]
    fn fixed_width_mismatch_is_type_mismatch() {
        let file = NamedTempFile::new().expect("create temp file");
        let err = write_attr(
            file.path(),
            "count",
            B_INT32_TYPE,
            &[0, 1],
            AttrFlags::empty(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StorageError::TypeMismatch {
                expected: 4,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn unknown_type_code_rejected() {
        let file = NamedTempFile::new().expect("create temp file");
        let err = write_attr(file.path(), "x", 0x0102_0304, b"data", AttrFlags::empty())
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn name_length_enforced() {
        let file = NamedTempFile::new().expect("create temp file");
        let long = "n".repeat(B_ATTR_NAME_LENGTH + 1);
        let err =
            write_attr(file.path(), &long, B_RAW_TYPE, b"x", AttrFlags::empty()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
        let err = write_attr(file.path(), "", B_RAW_TYPE, b"x", AttrFlags::empty()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn both_endian_flags_rejected() {
        let file = NamedTempFile::new().expect("create temp file");
        let both = AttrFlags::BIG_ENDIAN | AttrFlags::LITTLE_ENDIAN;
        assert!(matches!(
            read_attrs(file.path(), both),
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn big_endian_payload_round_trips() {
        let file = NamedTempFile::new().expect("create temp file");
        // 0x01020304 presented in big-endian byte order.
        write_attr(
            file.path(),
            "count",
            B_INT32_TYPE,
            &[0x01, 0x02, 0x03, 0x04],
            AttrFlags::BIG_ENDIAN,
        )
        .unwrap();

        // Read back through the same caller view: identical bytes.
        let (_, be_payload) = read_attr(file.path(), "count", AttrFlags::BIG_ENDIAN)
            .unwrap()
            .unwrap();
        assert_eq!(be_payload, vec![0x01, 0x02, 0x03, 0x04]);

        // Native view decodes to the same integer.
        let (code, native) = read_attr(file.path(), "count", AttrFlags::empty())
            .unwrap()
            .unwrap();
        assert_eq!(AttrValue::from_bytes(code, &native).unwrap(), AttrValue::Int32(0x0102_0304));
    }

    #[test]
    fn read_attr_missing_is_none() {
        let file = NamedTempFile::new().expect("create temp file");
        assert!(read_attr(file.path(), "nope", AttrFlags::empty())
            .unwrap()
            .is_none());
    }

    #[test]
    fn foreign_xattrs_are_not_reported() {
        let file = NamedTempFile::new().expect("create temp file");
        xattr::set(file.path(), "user.other.tool", b"raw").expect("write foreign xattr");
        write_attr(file.path(), "mine", B_RAW_TYPE, &[7], AttrFlags::empty()).unwrap();

        let attrs = read_attrs(file.path(), AttrFlags::empty()).unwrap();
        assert_eq!(attrs.len(), 1);
        assert!(attrs.contains_key("mine"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_flag_targets_the_link() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let target = dir.path().join("target");
        std::fs::write(&target, b"data").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        write_attr(&link, "on-target", B_RAW_TYPE, &[1], AttrFlags::empty()).unwrap();

        // Through the link (traversing), the target's attribute shows.
        let through = read_attrs(&link, AttrFlags::empty()).unwrap();
        assert!(through.contains_key("on-target"));

        // The link itself has none. Some filesystems refuse user xattrs
        // on symlinks entirely; either way nothing leaks from the target.
        if let Ok(on_link) = read_attrs(&link, AttrFlags::SYMLINK) {
            assert!(on_link.is_empty());
        }
    }
}
