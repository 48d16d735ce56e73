//! Native attribute type codes and typed attribute values.
//!
//! The native layer tags every attribute payload with a type code. The
//! codes are four-character constants (`'LONG'`, `'CSTR'`, ...) computed
//! here rather than written as magic numbers, so this module is the
//! single definition the `types` table and the attribute store share.
//!
//! Raw (code, bytes) pairs are the wire shape; `AttrValue` is the typed
//! layer over them, with explicit per-variant byte codecs.

use std::sync::LazyLock;

use crate::enums::EnumTable;
use crate::error::{Result, StorageError};

/// Packs a four-character constant the way the native headers do.
pub const fn four_cc(code: &[u8; 4]) -> i32 {
    ((code[0] as i32) << 24) | ((code[1] as i32) << 16) | ((code[2] as i32) << 8) | (code[3] as i32)
}

pub const B_BOOL_TYPE: i32 = four_cc(b"BOOL");
pub const B_CHAR_TYPE: i32 = four_cc(b"CHAR");
pub const B_INT8_TYPE: i32 = four_cc(b"BYTE");
pub const B_UINT8_TYPE: i32 = four_cc(b"UBYT");
pub const B_INT16_TYPE: i32 = four_cc(b"SHRT");
pub const B_UINT16_TYPE: i32 = four_cc(b"USHT");
pub const B_INT32_TYPE: i32 = four_cc(b"LONG");
pub const B_UINT32_TYPE: i32 = four_cc(b"ULNG");
pub const B_INT64_TYPE: i32 = four_cc(b"LLNG");
pub const B_UINT64_TYPE: i32 = four_cc(b"ULLG");
pub const B_FLOAT_TYPE: i32 = four_cc(b"FLOT");
pub const B_DOUBLE_TYPE: i32 = four_cc(b"DBLE");
pub const B_STRING_TYPE: i32 = four_cc(b"CSTR");
pub const B_ASCII_TYPE: i32 = four_cc(b"TEXT");
pub const B_MIME_STRING_TYPE: i32 = four_cc(b"MIMS");
pub const B_MIME_TYPE: i32 = four_cc(b"MIME");
pub const B_RAW_TYPE: i32 = four_cc(b"RAWT");
pub const B_TIME_TYPE: i32 = four_cc(b"TIME");
pub const B_OFF_T_TYPE: i32 = four_cc(b"OFFT");
pub const B_SIZE_T_TYPE: i32 = four_cc(b"SIZT");
pub const B_SSIZE_T_TYPE: i32 = four_cc(b"SSZT");
pub const B_POINT_TYPE: i32 = four_cc(b"BPNT");
pub const B_RECT_TYPE: i32 = four_cc(b"RECT");
pub const B_RGB_COLOR_TYPE: i32 = four_cc(b"RGBC");
pub const B_REF_TYPE: i32 = four_cc(b"RREF");

const TYPE_PAIRS: &[(&str, i32)] = &[
    ("B_BOOL_TYPE", B_BOOL_TYPE),
    ("B_CHAR_TYPE", B_CHAR_TYPE),
    ("B_INT8_TYPE", B_INT8_TYPE),
    ("B_UINT8_TYPE", B_UINT8_TYPE),
    ("B_INT16_TYPE", B_INT16_TYPE),
    ("B_UINT16_TYPE", B_UINT16_TYPE),
    ("B_INT32_TYPE", B_INT32_TYPE),
    ("B_UINT32_TYPE", B_UINT32_TYPE),
    ("B_INT64_TYPE", B_INT64_TYPE),
    ("B_UINT64_TYPE", B_UINT64_TYPE),
    ("B_FLOAT_TYPE", B_FLOAT_TYPE),
    ("B_DOUBLE_TYPE", B_DOUBLE_TYPE),
    ("B_STRING_TYPE", B_STRING_TYPE),
    ("B_ASCII_TYPE", B_ASCII_TYPE),
    ("B_MIME_STRING_TYPE", B_MIME_STRING_TYPE),
    ("B_MIME_TYPE", B_MIME_TYPE),
    ("B_RAW_TYPE", B_RAW_TYPE),
    ("B_TIME_TYPE", B_TIME_TYPE),
    ("B_OFF_T_TYPE", B_OFF_T_TYPE),
    ("B_SIZE_T_TYPE", B_SIZE_T_TYPE),
    ("B_SSIZE_T_TYPE", B_SSIZE_T_TYPE),
    ("B_POINT_TYPE", B_POINT_TYPE),
    ("B_RECT_TYPE", B_RECT_TYPE),
    ("B_RGB_COLOR_TYPE", B_RGB_COLOR_TYPE),
    ("B_REF_TYPE", B_REF_TYPE),
];

/// The process-wide `types` table: symbolic `B_*_TYPE` names to codes.
pub static TYPES: LazyLock<EnumTable> = LazyLock::new(|| {
    EnumTable::build("types", TYPE_PAIRS.iter().copied()).expect("native type names are unique")
});

/// Payload width for fixed-width type codes, `None` for variable-width ones.
///
/// Shared by write validation and typed decoding so the two can't drift.
pub fn fixed_width(type_code: i32) -> Option<usize> {
    match type_code {
        B_BOOL_TYPE | B_CHAR_TYPE | B_INT8_TYPE | B_UINT8_TYPE => Some(1),
        B_INT16_TYPE | B_UINT16_TYPE => Some(2),
        B_INT32_TYPE | B_UINT32_TYPE | B_SIZE_T_TYPE | B_SSIZE_T_TYPE | B_TIME_TYPE
        | B_FLOAT_TYPE | B_RGB_COLOR_TYPE => Some(4),
        B_INT64_TYPE | B_UINT64_TYPE | B_OFF_T_TYPE | B_DOUBLE_TYPE | B_POINT_TYPE => Some(8),
        B_RECT_TYPE => Some(16),
        _ => None,
    }
}

/// The symbolic name for a type code, when the table knows it.
pub fn type_name(type_code: i32) -> Option<&'static str> {
    TYPES.entries().find(|&(_, c)| c == type_code).map(|(n, _)| n)
}

fn width_error(type_code: i32, expected: usize, actual: usize) -> StorageError {
    StorageError::TypeMismatch {
        type_name: type_name(type_code)
            .map(str::to_string)
            .unwrap_or_else(|| format!("type 0x{type_code:08x}")),
        expected,
        actual,
    }
}

/// Rejects payloads whose length contradicts a fixed-width type code.
pub fn check_payload_width(type_code: i32, payload: &[u8]) -> Result<()> {
    match fixed_width(type_code) {
        Some(expected) if payload.len() != expected => {
            Err(width_error(type_code, expected, payload.len()))
        }
        _ => Ok(()),
    }
}

/// A decoded attribute value, tagged with its native type.
///
/// Payloads use the native (little-endian host) byte order; the
/// attribute store applies endian conversion before these codecs see
/// the bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    /// Seconds since the epoch; the native time type is 32-bit.
    Time(i32),
    Str(String),
    Mime(String),
    Raw(Vec<u8>),
}

impl AttrValue {
    /// The native type code this value is written under.
    pub fn type_code(&self) -> i32 {
        match self {
            Self::Bool(_) => B_BOOL_TYPE,
            Self::Int8(_) => B_INT8_TYPE,
            Self::UInt8(_) => B_UINT8_TYPE,
            Self::Int16(_) => B_INT16_TYPE,
            Self::UInt16(_) => B_UINT16_TYPE,
            Self::Int32(_) => B_INT32_TYPE,
            Self::UInt32(_) => B_UINT32_TYPE,
            Self::Int64(_) => B_INT64_TYPE,
            Self::UInt64(_) => B_UINT64_TYPE,
            Self::Float(_) => B_FLOAT_TYPE,
            Self::Double(_) => B_DOUBLE_TYPE,
            Self::Time(_) => B_TIME_TYPE,
            Self::Str(_) => B_STRING_TYPE,
            Self::Mime(_) => B_MIME_STRING_TYPE,
            Self::Raw(_) => B_RAW_TYPE,
        }
    }

    /// Encodes the value as the payload bytes the native store expects.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bool(v) => vec![u8::from(*v)],
            Self::Int8(v) => v.to_le_bytes().to_vec(),
            Self::UInt8(v) => v.to_le_bytes().to_vec(),
            Self::Int16(v) => v.to_le_bytes().to_vec(),
            Self::UInt16(v) => v.to_le_bytes().to_vec(),
            Self::Int32(v) => v.to_le_bytes().to_vec(),
            Self::UInt32(v) => v.to_le_bytes().to_vec(),
            Self::Int64(v) => v.to_le_bytes().to_vec(),
            Self::UInt64(v) => v.to_le_bytes().to_vec(),
            Self::Float(v) => v.to_le_bytes().to_vec(),
            Self::Double(v) => v.to_le_bytes().to_vec(),
            Self::Time(v) => v.to_le_bytes().to_vec(),
            Self::Str(v) => v.as_bytes().to_vec(),
            Self::Mime(v) => v.as_bytes().to_vec(),
            Self::Raw(v) => v.clone(),
        }
    }

    /// Decodes a (type code, payload) pair into a typed value.
    ///
    /// Fixed-width codes are length-checked (`TypeMismatch` on
    /// disagreement). Codes without a typed representation here fail
    /// with `Unsupported`; the raw pair remains available to callers.
    pub fn from_bytes(type_code: i32, payload: &[u8]) -> Result<Self> {
        check_payload_width(type_code, payload)?;
        let value = match type_code {
            B_BOOL_TYPE => Self::Bool(payload[0] != 0),
            B_INT8_TYPE => Self::Int8(payload[0] as i8),
            B_UINT8_TYPE | B_CHAR_TYPE => Self::UInt8(payload[0]),
            B_INT16_TYPE => Self::Int16(i16::from_le_bytes(fixed(type_code, payload)?)),
            B_UINT16_TYPE => Self::UInt16(u16::from_le_bytes(fixed(type_code, payload)?)),
            B_INT32_TYPE | B_SSIZE_T_TYPE => Self::Int32(i32::from_le_bytes(fixed(type_code, payload)?)),
            B_UINT32_TYPE | B_SIZE_T_TYPE => Self::UInt32(u32::from_le_bytes(fixed(type_code, payload)?)),
            B_INT64_TYPE | B_OFF_T_TYPE => Self::Int64(i64::from_le_bytes(fixed(type_code, payload)?)),
            B_UINT64_TYPE => Self::UInt64(u64::from_le_bytes(fixed(type_code, payload)?)),
            B_FLOAT_TYPE => Self::Float(f32::from_le_bytes(fixed(type_code, payload)?)),
            B_DOUBLE_TYPE => Self::Double(f64::from_le_bytes(fixed(type_code, payload)?)),
            B_TIME_TYPE => Self::Time(i32::from_le_bytes(fixed(type_code, payload)?)),
            B_STRING_TYPE | B_ASCII_TYPE => Self::Str(decode_text(payload)),
            B_MIME_STRING_TYPE | B_MIME_TYPE => Self::Mime(decode_text(payload)),
            B_RAW_TYPE => Self::Raw(payload.to_vec()),
            other => {
                return Err(StorageError::Unsupported(format!(
                    "no typed decoding for attribute type 0x{other:08x}"
                )))
            }
        };
        Ok(value)
    }

    /// A best-effort integer view, used by query comparisons.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Bool(v) => Some(i64::from(*v)),
            Self::Int8(v) => Some(i64::from(*v)),
            Self::UInt8(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::UInt16(v) => Some(i64::from(*v)),
            Self::Int32(v) | Self::Time(v) => Some(i64::from(*v)),
            Self::UInt32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// A textual view for string-valued variants.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) | Self::Mime(v) => Some(v),
            _ => None,
        }
    }
}

/// Text payloads may or may not carry a trailing NUL; strip it either way.
fn decode_text(payload: &[u8]) -> String {
    let bytes = match payload.last() {
        Some(0) => &payload[..payload.len() - 1],
        _ => payload,
    };
    String::from_utf8_lossy(bytes).into_owned()
}

fn fixed<const N: usize>(type_code: i32, payload: &[u8]) -> Result<[u8; N]> {
    payload
        .try_into()
        .map_err(|_| width_error(type_code, N, payload.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_cc_matches_native_packing() {
        assert_eq!(B_INT32_TYPE, 0x4c4f_4e47); // 'LONG'
        assert_eq!(B_STRING_TYPE, 0x4353_5452); // 'CSTR'
        assert_eq!(B_MIME_STRING_TYPE, 0x4d49_4d53); // 'MIMS'
    }

    #[test]
    fn types_table_round_trips() {
        assert_eq!(TYPES.lookup("B_INT32_TYPE").unwrap(), B_INT32_TYPE);
        assert_eq!(TYPES.lookup("B_STRING_TYPE").unwrap(), B_STRING_TYPE);
        assert_eq!(TYPES.len(), TYPE_PAIRS.len());
        assert_eq!(type_name(B_TIME_TYPE), Some("B_TIME_TYPE"));
        assert_eq!(type_name(0x7fff_0001), None);
    }

    #[test]
    fn fixed_width_table() {
        assert_eq!(fixed_width(B_BOOL_TYPE), Some(1));
        assert_eq!(fixed_width(B_INT16_TYPE), Some(2));
        assert_eq!(fixed_width(B_INT32_TYPE), Some(4));
        assert_eq!(fixed_width(B_TIME_TYPE), Some(4));
        assert_eq!(fixed_width(B_DOUBLE_TYPE), Some(8));
        assert_eq!(fixed_width(B_RECT_TYPE), Some(16));
        assert_eq!(fixed_width(B_STRING_TYPE), None);
        assert_eq!(fixed_width(B_RAW_TYPE), None);
    }

    #[test]
    fn check_payload_width_rejects_mismatch() {
        assert!(check_payload_width(B_INT32_TYPE, &[0, 0, 0, 0]).is_ok());
        let err = check_payload_width(B_INT32_TYPE, &[0, 0]).unwrap_err();
        assert!(matches!(
            err,
            StorageError::TypeMismatch {
                expected: 4,
                actual: 2,
                ..
            }
        ));
        // Variable-width types take any length.
        assert!(check_payload_width(B_STRING_TYPE, b"").is_ok());
        assert!(check_payload_width(B_RAW_TYPE, &[1, 2, 3]).is_ok());
    }

    #[test]
    fn numeric_round_trip() {
        for value in [
            AttrValue::Bool(true),
            AttrValue::Int8(-5),
            AttrValue::UInt8(200),
            AttrValue::Int16(-3000),
            AttrValue::UInt16(65000),
            AttrValue::Int32(-123_456),
            AttrValue::UInt32(4_000_000_000),
            AttrValue::Int64(-1_000_000_000_000),
            AttrValue::UInt64(18_000_000_000_000_000_000),
            AttrValue::Float(1.5),
            AttrValue::Double(-2.25),
            AttrValue::Time(1_700_000_000),
        ] {
            let bytes = value.to_bytes();
            let decoded = AttrValue::from_bytes(value.type_code(), &bytes).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn text_round_trip_strips_trailing_nul() {
        let value = AttrValue::Str("text/plain".to_string());
        let decoded = AttrValue::from_bytes(B_STRING_TYPE, &value.to_bytes()).unwrap();
        assert_eq!(decoded, value);

        let with_nul = b"text/plain\0";
        let decoded = AttrValue::from_bytes(B_MIME_STRING_TYPE, with_nul).unwrap();
        assert_eq!(decoded, AttrValue::Mime("text/plain".to_string()));
    }

    #[test]
    fn unmodeled_code_is_unsupported() {
        let err = AttrValue::from_bytes(B_REF_TYPE, b"whatever").unwrap_err();
        assert!(matches!(err, StorageError::Unsupported(_)));
    }

    #[test]
    fn as_i64_views() {
        assert_eq!(AttrValue::Int32(-7).as_i64(), Some(-7));
        assert_eq!(AttrValue::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(AttrValue::Str("x".into()).as_i64(), None);
        assert_eq!(AttrValue::Mime("a/b".into()).as_str(), Some("a/b"));
    }
}
