#![forbid(unsafe_code)]

//! Conversions between concrete Rust types and [`Value`].
//!
//! A type's [`CaseValue::describe`] descriptor is what the verifier decodes
//! persisted records against, so `from_value` only needs to accept values
//! shaped like that descriptor.

use crate::{FieldDesc, TypeDesc, Value, ValueError};
use std::collections::BTreeMap;

pub trait CaseValue: Sized {
    fn describe() -> TypeDesc;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

fn expected<T: CaseValue>(value: &Value) -> ValueError {
    ValueError::TypeMismatch {
        path: "$".to_owned(),
        expected: T::describe().to_string(),
        found: value.kind(),
    }
}

impl CaseValue for bool {
    fn describe() -> TypeDesc {
        TypeDesc::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(inner) => Ok(inner),
            other => Err(expected::<Self>(&other)),
        }
    }
}

macro_rules! impl_signed {
    ($($ty:ty => $bits:expr),* $(,)?) => {
        $(
            impl CaseValue for $ty {
                fn describe() -> TypeDesc {
                    TypeDesc::Int { bits: $bits }
                }

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Int(inner) => <$ty>::try_from(inner).map_err(|_| ValueError::OutOfRange {
                            path: "$".to_owned(),
                            value: inner.to_string(),
                            target: Self::describe().to_string(),
                        }),
                        other => Err(expected::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($ty:ty => $bits:expr),* $(,)?) => {
        $(
            impl CaseValue for $ty {
                fn describe() -> TypeDesc {
                    TypeDesc::UInt { bits: $bits }
                }

                fn to_value(&self) -> Value {
                    Value::UInt(u64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::UInt(inner) => <$ty>::try_from(inner).map_err(|_| ValueError::OutOfRange {
                            path: "$".to_owned(),
                            value: inner.to_string(),
                            target: Self::describe().to_string(),
                        }),
                        other => Err(expected::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

impl_signed!(i8 => 8, i16 => 16, i32 => 32, i64 => 64);
impl_unsigned!(u8 => 8, u16 => 16, u32 => 32, u64 => 64);

impl CaseValue for isize {
    fn describe() -> TypeDesc {
        TypeDesc::Int { bits: 64 }
    }

    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(inner) => Self::try_from(inner).map_err(|_| ValueError::OutOfRange {
                path: "$".to_owned(),
                value: inner.to_string(),
                target: "isize".to_owned(),
            }),
            other => Err(expected::<Self>(&other)),
        }
    }
}

impl CaseValue for usize {
    fn describe() -> TypeDesc {
        TypeDesc::UInt { bits: 64 }
    }

    fn to_value(&self) -> Value {
        Value::UInt(*self as u64)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::UInt(inner) => Self::try_from(inner).map_err(|_| ValueError::OutOfRange {
                path: "$".to_owned(),
                value: inner.to_string(),
                target: "usize".to_owned(),
            }),
            other => Err(expected::<Self>(&other)),
        }
    }
}

impl CaseValue for f64 {
    fn describe() -> TypeDesc {
        TypeDesc::Float { bits: 64 }
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(inner) => Ok(inner),
            other => Err(expected::<Self>(&other)),
        }
    }
}

impl CaseValue for f32 {
    fn describe() -> TypeDesc {
        TypeDesc::Float { bits: 32 }
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(inner) => Ok(inner as f32),
            other => Err(expected::<Self>(&other)),
        }
    }
}

impl CaseValue for String {
    fn describe() -> TypeDesc {
        TypeDesc::Str
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Str(inner) => Ok(inner),
            other => Err(expected::<Self>(&other)),
        }
    }
}

impl<T: CaseValue> CaseValue for Option<T> {
    fn describe() -> TypeDesc {
        TypeDesc::option(T::describe())
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: CaseValue> CaseValue for Vec<T> {
    fn describe() -> TypeDesc {
        TypeDesc::list(T::describe())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(CaseValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(expected::<Self>(&other)),
        }
    }
}

impl<T: CaseValue> CaseValue for BTreeMap<String, T> {
    fn describe() -> TypeDesc {
        TypeDesc::map(T::describe())
    }

    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(key, item)| (key.clone(), item.to_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(key, item)| T::from_value(item).map(|decoded| (key, decoded)))
                .collect(),
            other => Err(expected::<Self>(&other)),
        }
    }
}

/// Removes field `name` from a decoded record's field list.
///
/// Used by [`case_record!`](crate::case_record) to rebuild structs from
/// [`Value::Record`].
pub fn record_field(
    fields: &mut Vec<(String, Value)>,
    record: &str,
    name: &str,
) -> Result<Value, ValueError> {
    let position = fields
        .iter()
        .position(|(field, _)| field == name)
        .ok_or_else(|| ValueError::MissingField {
            path: "$".to_owned(),
            record: record.to_owned(),
            field: name.to_owned(),
        })?;
    Ok(fields.swap_remove(position).1)
}

#[doc(hidden)]
#[must_use]
pub fn field_desc(name: &str, ty: TypeDesc) -> FieldDesc {
    FieldDesc {
        name: name.to_owned(),
        ty,
    }
}

#[doc(hidden)]
pub fn record_mismatch(record: &str, value: &Value) -> ValueError {
    ValueError::TypeMismatch {
        path: "$".to_owned(),
        expected: format!("record {record}"),
        found: value.kind(),
    }
}

/// Declares a struct usable as a case argument or result.
///
/// ```
/// tc_core::case_record! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Interval {
///         pub start: i64,
///         pub end: i64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! case_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::CaseValue for $name {
            fn describe() -> $crate::TypeDesc {
                $crate::TypeDesc::Record {
                    name: stringify!($name).to_owned(),
                    fields: vec![
                        $(
                            $crate::case_value::field_desc(
                                stringify!($field),
                                <$ty as $crate::CaseValue>::describe(),
                            ),
                        )*
                    ],
                }
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Record(vec![
                    $(
                        (
                            stringify!($field).to_owned(),
                            $crate::CaseValue::to_value(&self.$field),
                        ),
                    )*
                ])
            }

            #[allow(unused_mut)]
            fn from_value(value: $crate::Value) -> Result<Self, $crate::ValueError> {
                let mut fields = match value {
                    $crate::Value::Record(fields) => fields,
                    other => {
                        return Err($crate::case_value::record_mismatch(stringify!($name), &other));
                    }
                };
                Ok(Self {
                    $(
                        $field: <$ty as $crate::CaseValue>::from_value(
                            $crate::record_field(&mut fields, stringify!($name), stringify!($field))?,
                        )?,
                    )*
                })
            }
        }

        impl $crate::CaseOutputs for $name {
            fn describe_outputs() -> $crate::solution::OutputDescs {
                $crate::solution::single_output::<Self>()
            }

            fn into_values(self) -> Vec<$crate::Value> {
                vec![$crate::CaseValue::to_value(&self)]
            }
        }
    };
}
