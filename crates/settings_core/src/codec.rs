//! Storage codec for setting values.
//!
//! # Responsibility
//! - Turn `SettingValue` into storage-safe text and back.
//!
//! # Invariants
//! - `decode(encode(v)) == v` for every value the codec accepts.
//! - `Null` encodes to `None` so explicit nulls are stored as SQL `NULL`.
//! - Malformed text is an error, never silently read as `Null`.

use crate::model::value::SettingValue;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CodecResult<T> = Result<T, CodecError>;

/// Codec failures.
#[derive(Debug)]
pub enum CodecError {
    /// JSON floats cannot carry NaN or infinity.
    NonFiniteFloat(f64),
    /// Stored text is not a valid encoded value.
    Malformed(serde_json::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteFloat(value) => write!(f, "cannot encode non-finite float `{value}`"),
            Self::Malformed(err) => write!(f, "malformed encoded setting value: {err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NonFiniteFloat(_) => None,
            Self::Malformed(err) => Some(err),
        }
    }
}

/// Encodes one value for storage.
pub fn encode(value: &SettingValue) -> CodecResult<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    ensure_finite(value)?;
    serde_json::to_string(value)
        .map(Some)
        .map_err(CodecError::Malformed)
}

/// Decodes stored text; `None` reads back as `Null`.
pub fn decode(text: Option<&str>) -> CodecResult<SettingValue> {
    match text {
        None => Ok(SettingValue::Null),
        Some(text) => serde_json::from_str(text).map_err(CodecError::Malformed),
    }
}

fn ensure_finite(value: &SettingValue) -> CodecResult<()> {
    match value {
        SettingValue::Float(number) if !number.is_finite() => {
            Err(CodecError::NonFiniteFloat(*number))
        }
        SettingValue::List(items) => items.iter().try_for_each(ensure_finite),
        SettingValue::Map(map) => map.values().try_for_each(ensure_finite),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, encode, CodecError};
    use crate::model::value::{SettingMap, SettingValue};

    fn roundtrip(value: SettingValue) -> SettingValue {
        let encoded = encode(&value).expect("value should encode");
        decode(encoded.as_deref()).expect("encoded value should decode")
    }

    #[test]
    fn null_is_stored_as_none() {
        assert_eq!(encode(&SettingValue::Null).unwrap(), None);
        assert_eq!(decode(None).unwrap(), SettingValue::Null);
    }

    #[test]
    fn integer_and_numeric_text_stay_distinct() {
        let number = encode(&SettingValue::Integer(42)).unwrap();
        let text = encode(&SettingValue::from("42")).unwrap();
        assert_ne!(number, text);
        assert_eq!(roundtrip(SettingValue::Integer(42)), SettingValue::Integer(42));
        assert_eq!(roundtrip(SettingValue::from("42")), SettingValue::from("42"));
    }

    #[test]
    fn whole_float_reads_back_as_float() {
        assert_eq!(roundtrip(SettingValue::Float(3.0)), SettingValue::Float(3.0));
    }

    #[test]
    fn nested_structures_roundtrip() {
        let mut map = SettingMap::new();
        map.insert("name".to_string(), SettingValue::from("Foo bar"));
        map.insert(
            "items".to_string(),
            SettingValue::List(vec![
                SettingValue::Integer(1),
                SettingValue::Integer(3),
                SettingValue::Null,
                SettingValue::from("as"),
            ]),
        );
        map.insert("seen_at".to_string(), SettingValue::Timestamp(1_700_000_000_123));
        let value = SettingValue::Map(map);

        assert_eq!(roundtrip(value.clone()), value);
    }

    fn float_bits(value: SettingValue) -> u64 {
        match value {
            SettingValue::Float(float) => float.to_bits(),
            other => panic!("expected float, got {other}"),
        }
    }

    #[test]
    fn full_precision_floats_roundtrip_exactly() {
        for float in [
            1.0715660391465826e-75,
            -1.81996730402717e-179,
            -1.603964615428183e143,
            -9.643915712060553e-234,
            0.1 + 0.2,
            f64::MIN_POSITIVE,
            f64::MIN_POSITIVE / 8.0,
            f64::from_bits(1),
            f64::MAX,
            f64::MIN,
            -0.0,
        ] {
            assert_eq!(
                float_bits(roundtrip(SettingValue::Float(float))),
                float.to_bits(),
                "{float:e} changed after storage"
            );
        }
    }

    #[test]
    fn float_bit_patterns_roundtrip_exactly() {
        let mut state = 0x9E37_79B9_7F4A_7C15_u64;
        for _ in 0..2_000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let float = f64::from_bits(state);
            if !float.is_finite() {
                continue;
            }
            assert_eq!(
                float_bits(roundtrip(SettingValue::Float(float))),
                state,
                "{float:e} changed after storage"
            );
        }
    }

    #[test]
    fn edge_values_roundtrip() {
        let mut keyed = SettingMap::new();
        keyed.insert("grüße".to_string(), SettingValue::from("日本語 ✓"));
        keyed.insert(String::new(), SettingValue::Null);
        keyed.insert("nested".to_string(), SettingValue::List(vec![SettingValue::Null]));

        for value in [
            SettingValue::Integer(i64::MIN),
            SettingValue::Integer(i64::MAX),
            SettingValue::Integer(0),
            SettingValue::Timestamp(i64::MIN),
            SettingValue::Timestamp(i64::MAX),
            SettingValue::Bool(false),
            SettingValue::from(""),
            SettingValue::from("null"),
            SettingValue::from("\"quoted\"\n\u{0}"),
            SettingValue::List(Vec::new()),
            SettingValue::Map(SettingMap::new()),
            SettingValue::List(vec![SettingValue::Null, SettingValue::Null]),
            SettingValue::Map(keyed),
        ] {
            assert_eq!(roundtrip(value.clone()), value);
        }
    }

    #[test]
    fn non_finite_float_is_rejected() {
        let value = SettingValue::List(vec![SettingValue::Float(f64::INFINITY)]);
        assert!(matches!(encode(&value), Err(CodecError::NonFiniteFloat(_))));
    }

    #[test]
    fn malformed_text_is_an_error() {
        let err = decode(Some("--- not json")).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
        assert!(err.to_string().contains("malformed"));
    }
}
