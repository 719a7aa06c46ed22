#![forbid(unsafe_code)]

#[cfg(test)]
pub mod proptest_strategies;

pub mod case_value;
pub mod solution;

pub use case_value::{CaseValue, record_field};
pub use solution::{
    CaseArgs, CaseOutputs, IntoSolution, InvokeError, Invoker, Signature, Solution,
};

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A dynamically-typed case value. Arguments and results cross the
/// invocation boundary in this form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Named fields in declaration order.
    Record(Vec<(String, Value)>),
}

impl Value {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:?}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Record(fields) => {
                write!(f, "{{")?;
                for (idx, (name, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::UInt(value) => serializer.serialize_u64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::Str(value) => serializer.serialize_str(value),
            Self::List(items) => serializer.collect_seq(items),
            Self::Map(entries) => serializer.collect_map(entries),
            Self::Record(fields) => {
                serializer.collect_map(fields.iter().map(|(name, value)| (name, value)))
            }
        }
    }
}

/// Renders a tuple of values as `[a, b, ...]`.
#[must_use]
pub fn display_tuple(values: &[Value]) -> String {
    Value::List(values.to_vec()).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: String,
    pub ty: TypeDesc,
}

/// Target type for decoding one persisted element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDesc {
    Bool,
    Int { bits: u8 },
    UInt { bits: u8 },
    Float { bits: u8 },
    Str,
    Option { inner: Box<TypeDesc> },
    List { element: Box<TypeDesc> },
    Map { value: Box<TypeDesc> },
    Record { name: String, fields: Vec<FieldDesc> },
}

impl TypeDesc {
    #[must_use]
    pub fn option(inner: TypeDesc) -> Self {
        Self::Option {
            inner: Box::new(inner),
        }
    }

    #[must_use]
    pub fn list(element: TypeDesc) -> Self {
        Self::List {
            element: Box::new(element),
        }
    }

    #[must_use]
    pub fn map(value: TypeDesc) -> Self {
        Self::Map {
            value: Box::new(value),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int { bits } => write!(f, "i{bits}"),
            Self::UInt { bits } => write!(f, "u{bits}"),
            Self::Float { bits } => write!(f, "f{bits}"),
            Self::Str => write!(f, "str"),
            Self::Option { inner } => write!(f, "option<{inner}>"),
            Self::List { element } => write!(f, "list<{element}>"),
            Self::Map { value } => write!(f, "map<str, {value}>"),
            Self::Record { name, fields } => {
                write!(f, "{name}{{")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: &'static str,
    },
    #[error("{path}: {value} is out of range for {target}")]
    OutOfRange {
        path: String,
        value: String,
        target: String,
    },
    #[error("{path}: record `{record}` is missing field `{field}`")]
    MissingField {
        path: String,
        record: String,
        field: String,
    },
    #[error("{path}: record `{record}` has no field `{field}`")]
    UnknownField {
        path: String,
        record: String,
        field: String,
    },
    #[error("{path}: non-finite float {value} has no interchange encoding")]
    NonFiniteFloat { path: String, value: f64 },
    #[error("sequence arity mismatch: expected {expected} elements, found {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("malformed interchange record: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
    #[error("interchange encoding failed: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

/// Encodes an ordered sequence of values as a compact JSON array.
///
/// Record fields keep declaration order and map keys are sorted, so equal
/// inputs always produce identical bytes.
pub fn encode_sequence(values: &[Value]) -> Result<Vec<u8>, ValueError> {
    for (idx, value) in values.iter().enumerate() {
        check_encodable(value, &format!("$[{idx}]"))?;
    }
    serde_json::to_vec(values).map_err(|source| ValueError::Encode { source })
}

// serde_json silently writes non-finite floats as `null`, which would not
// decode back to the same value.
fn check_encodable(value: &Value, path: &str) -> Result<(), ValueError> {
    match value {
        Value::Float(float) if !float.is_finite() => Err(ValueError::NonFiniteFloat {
            path: path.to_owned(),
            value: *float,
        }),
        Value::List(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(idx, item)| check_encodable(item, &format!("{path}[{idx}]"))),
        Value::Map(entries) => entries
            .iter()
            .try_for_each(|(key, item)| check_encodable(item, &format!("{path}[{key:?}]"))),
        Value::Record(fields) => fields
            .iter()
            .try_for_each(|(name, item)| check_encodable(item, &format!("{path}.{name}"))),
        _ => Ok(()),
    }
}

pub fn decode(raw: &JsonValue, desc: &TypeDesc) -> Result<Value, ValueError> {
    decode_at(raw, desc, "$")
}

/// Parses one opaque persisted record, then decodes it against `desc`.
pub fn decode_raw(raw: &RawValue, desc: &TypeDesc) -> Result<Value, ValueError> {
    decode_raw_at(raw, desc, "$")
}

fn decode_raw_at(raw: &RawValue, desc: &TypeDesc, path: &str) -> Result<Value, ValueError> {
    let parsed = serde_json::from_str::<JsonValue>(raw.get())
        .map_err(|source| ValueError::Malformed { source })?;
    decode_at(&parsed, desc, path)
}

/// Decodes a persisted record sequence element-by-element against the
/// descriptors at the same positions.
pub fn decode_sequence(raws: &[Box<RawValue>], descs: &[TypeDesc]) -> Result<Vec<Value>, ValueError> {
    if raws.len() != descs.len() {
        return Err(ValueError::ArityMismatch {
            expected: descs.len(),
            actual: raws.len(),
        });
    }

    raws.iter()
        .zip(descs)
        .enumerate()
        .map(|(idx, (raw, desc))| decode_raw_at(raw, desc, &format!("$[{idx}]")))
        .collect()
}

fn decode_at(raw: &JsonValue, desc: &TypeDesc, path: &str) -> Result<Value, ValueError> {
    match desc {
        TypeDesc::Bool => raw
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch(raw, desc, path)),
        TypeDesc::Int { bits } => match raw.as_i64() {
            Some(value) if fits_signed(value, *bits) => Ok(Value::Int(value)),
            Some(_) => Err(out_of_range(raw, desc, path)),
            None if raw.is_u64() => Err(out_of_range(raw, desc, path)),
            None => Err(mismatch(raw, desc, path)),
        },
        TypeDesc::UInt { bits } => match raw.as_u64() {
            Some(value) if fits_unsigned(value, *bits) => Ok(Value::UInt(value)),
            Some(_) => Err(out_of_range(raw, desc, path)),
            None if raw.is_i64() => Err(out_of_range(raw, desc, path)),
            None => Err(mismatch(raw, desc, path)),
        },
        TypeDesc::Float { bits } => {
            let value = raw.as_f64().ok_or_else(|| mismatch(raw, desc, path))?;
            if *bits == 32 {
                let narrowed = value as f32;
                if !narrowed.is_finite() {
                    return Err(out_of_range(raw, desc, path));
                }
                return Ok(Value::Float(f64::from(narrowed)));
            }
            Ok(Value::Float(value))
        }
        TypeDesc::Str => raw
            .as_str()
            .map(|value| Value::Str(value.to_owned()))
            .ok_or_else(|| mismatch(raw, desc, path)),
        TypeDesc::Option { inner } => {
            if raw.is_null() {
                Ok(Value::Null)
            } else {
                decode_at(raw, inner, path)
            }
        }
        TypeDesc::List { element } => match raw {
            // a nil collection encodes as null
            JsonValue::Null => Ok(Value::List(Vec::new())),
            JsonValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| decode_at(item, element, &format!("{path}[{idx}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            _ => Err(mismatch(raw, desc, path)),
        },
        TypeDesc::Map { value } => match raw {
            JsonValue::Null => Ok(Value::Map(BTreeMap::new())),
            JsonValue::Object(entries) => entries
                .iter()
                .map(|(key, item)| {
                    decode_at(item, value, &format!("{path}[{key:?}]"))
                        .map(|decoded| (key.clone(), decoded))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Value::Map),
            _ => Err(mismatch(raw, desc, path)),
        },
        TypeDesc::Record { name, fields } => {
            let JsonValue::Object(entries) = raw else {
                return Err(mismatch(raw, desc, path));
            };

            if let Some(unknown) = entries
                .keys()
                .find(|key| !fields.iter().any(|field| &field.name == *key))
            {
                return Err(ValueError::UnknownField {
                    path: path.to_owned(),
                    record: name.clone(),
                    field: unknown.clone(),
                });
            }

            let mut decoded = Vec::with_capacity(fields.len());
            for field in fields {
                let field_path = format!("{path}.{}", field.name);
                let value = match (entries.get(&field.name), &field.ty) {
                    (Some(item), ty) => decode_at(item, ty, &field_path)?,
                    (None, TypeDesc::Option { .. }) => Value::Null,
                    (None, _) => {
                        return Err(ValueError::MissingField {
                            path: path.to_owned(),
                            record: name.clone(),
                            field: field.name.clone(),
                        });
                    }
                };
                decoded.push((field.name.clone(), value));
            }
            Ok(Value::Record(decoded))
        }
    }
}

/// Checks an already-built value against `desc`, normalizing it to the
/// representation decoding would produce. Integers take the signedness of
/// the descriptor and widen into float slots, `f32` slots are narrowed and
/// null collections become empty.
///
/// Non-finite floats pass through untouched; encoding rejects them.
pub fn conform(value: Value, desc: &TypeDesc) -> Result<Value, ValueError> {
    conform_at(value, desc, "$")
}

fn conform_at(value: Value, desc: &TypeDesc, path: &str) -> Result<Value, ValueError> {
    let range_error = |value: &Value| ValueError::OutOfRange {
        path: path.to_owned(),
        value: value.to_string(),
        target: desc.to_string(),
    };
    match (desc, value) {
        (TypeDesc::Bool, value @ Value::Bool(_)) | (TypeDesc::Str, value @ Value::Str(_)) => {
            Ok(value)
        }
        (TypeDesc::Int { bits }, Value::Int(int)) => {
            if fits_signed(int, *bits) {
                Ok(Value::Int(int))
            } else {
                Err(range_error(&Value::Int(int)))
            }
        }
        (TypeDesc::Int { bits }, Value::UInt(uint)) => match i64::try_from(uint) {
            Ok(int) if fits_signed(int, *bits) => Ok(Value::Int(int)),
            _ => Err(range_error(&Value::UInt(uint))),
        },
        (TypeDesc::UInt { bits }, Value::UInt(uint)) => {
            if fits_unsigned(uint, *bits) {
                Ok(Value::UInt(uint))
            } else {
                Err(range_error(&Value::UInt(uint)))
            }
        }
        (TypeDesc::UInt { bits }, Value::Int(int)) => match u64::try_from(int) {
            Ok(uint) if fits_unsigned(uint, *bits) => Ok(Value::UInt(uint)),
            _ => Err(range_error(&Value::Int(int))),
        },
        (TypeDesc::Float { bits }, Value::Float(float)) => Ok(Value::Float(if *bits == 32 {
            f64::from(float as f32)
        } else {
            float
        })),
        (TypeDesc::Float { .. }, Value::Int(int)) => Ok(Value::Float(int as f64)),
        (TypeDesc::Float { .. }, Value::UInt(uint)) => Ok(Value::Float(uint as f64)),
        (TypeDesc::Option { .. }, Value::Null) => Ok(Value::Null),
        (TypeDesc::Option { inner }, value) => conform_at(value, inner, path),
        (TypeDesc::List { .. }, Value::Null) => Ok(Value::List(Vec::new())),
        (TypeDesc::List { element }, Value::List(items)) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| conform_at(item, element, &format!("{path}[{idx}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (TypeDesc::Map { .. }, Value::Null) => Ok(Value::Map(BTreeMap::new())),
        (TypeDesc::Map { value }, Value::Map(entries)) => entries
            .into_iter()
            .map(|(key, item)| {
                conform_at(item, value, &format!("{path}[{key:?}]")).map(|item| (key, item))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Value::Map),
        (TypeDesc::Record { name, fields }, Value::Record(mut entries)) => {
            if let Some((unknown, _)) = entries
                .iter()
                .find(|(key, _)| !fields.iter().any(|field| &field.name == key))
            {
                return Err(ValueError::UnknownField {
                    path: path.to_owned(),
                    record: name.clone(),
                    field: unknown.clone(),
                });
            }
            let mut conformed = Vec::with_capacity(fields.len());
            for field in fields {
                let field_path = format!("{path}.{}", field.name);
                let position = entries.iter().position(|(key, _)| key == &field.name);
                let item = match (position, &field.ty) {
                    (Some(position), ty) => {
                        conform_at(entries.swap_remove(position).1, ty, &field_path)?
                    }
                    (None, TypeDesc::Option { .. }) => Value::Null,
                    (None, _) => {
                        return Err(ValueError::MissingField {
                            path: path.to_owned(),
                            record: name.clone(),
                            field: field.name.clone(),
                        });
                    }
                };
                conformed.push((field.name.clone(), item));
            }
            Ok(Value::Record(conformed))
        }
        (desc, other) => Err(ValueError::TypeMismatch {
            path: path.to_owned(),
            expected: desc.to_string(),
            found: other.kind(),
        }),
    }
}

// A zero-width integer holds no value at all.
fn fits_signed(value: i64, bits: u8) -> bool {
    match bits {
        0 => false,
        64.. => true,
        _ => {
            let bound = 1_i64 << (bits - 1);
            (-bound..bound).contains(&value)
        }
    }
}

fn fits_unsigned(value: u64, bits: u8) -> bool {
    match bits {
        0 => false,
        64.. => true,
        _ => value < (1_u64 << bits),
    }
}

fn json_kind(raw: &JsonValue) -> &'static str {
    match raw {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(number) if number.is_f64() => "float",
        JsonValue::Number(_) => "integer",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn mismatch(raw: &JsonValue, desc: &TypeDesc, path: &str) -> ValueError {
    ValueError::TypeMismatch {
        path: path.to_owned(),
        expected: desc.to_string(),
        found: json_kind(raw),
    }
}

fn out_of_range(raw: &JsonValue, desc: &TypeDesc, path: &str) -> ValueError {
    ValueError::OutOfRange {
        path: path.to_owned(),
        value: raw.to_string(),
        target: desc.to_string(),
    }
}
