use crate::{FieldDesc, TypeDesc, Value};
use proptest::prelude::*;

pub fn arb_leaf_desc() -> impl Strategy<Value = TypeDesc> {
    prop_oneof![
        Just(TypeDesc::Bool),
        Just(TypeDesc::Int { bits: 64 }),
        Just(TypeDesc::Int { bits: 32 }),
        Just(TypeDesc::UInt { bits: 64 }),
        Just(TypeDesc::UInt { bits: 8 }),
        Just(TypeDesc::Float { bits: 64 }),
        Just(TypeDesc::Float { bits: 32 }),
        Just(TypeDesc::Str),
    ]
}

pub fn arb_desc() -> impl Strategy<Value = TypeDesc> {
    arb_leaf_desc().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(TypeDesc::list),
            inner.clone().prop_map(TypeDesc::option),
            inner.clone().prop_map(TypeDesc::map),
            prop::collection::vec(inner, 1..4).prop_map(|tys| TypeDesc::Record {
                name: "Rec".to_owned(),
                fields: tys
                    .into_iter()
                    .enumerate()
                    .map(|(idx, ty)| FieldDesc {
                        name: format!("f{idx}"),
                        ty,
                    })
                    .collect(),
            }),
        ]
    })
}

/// Values shaped exactly like `desc`.
pub fn arb_value_for(desc: &TypeDesc) -> BoxedStrategy<Value> {
    match desc {
        TypeDesc::Bool => any::<bool>().prop_map(Value::Bool).boxed(),
        TypeDesc::Int { bits } if *bits >= 64 => any::<i64>().prop_map(Value::Int).boxed(),
        TypeDesc::Int { bits } => {
            let bound = 1_i64 << (bits - 1);
            (-bound..bound).prop_map(Value::Int).boxed()
        }
        TypeDesc::UInt { bits } if *bits >= 64 => any::<u64>().prop_map(Value::UInt).boxed(),
        TypeDesc::UInt { bits } => (0..(1_u64 << bits)).prop_map(Value::UInt).boxed(),
        TypeDesc::Float { bits } if *bits == 32 => prop::num::f32::NORMAL
            .prop_map(|value| Value::Float(f64::from(value)))
            .boxed(),
        TypeDesc::Float { .. } => prop::num::f64::NORMAL.prop_map(Value::Float).boxed(),
        TypeDesc::Str => ".{0,12}".prop_map(Value::Str).boxed(),
        TypeDesc::Option { inner } => {
            prop_oneof![Just(Value::Null), arb_value_for(inner)].boxed()
        }
        TypeDesc::List { element } => prop::collection::vec(arb_value_for(element), 0..4)
            .prop_map(Value::List)
            .boxed(),
        TypeDesc::Map { value } => {
            prop::collection::btree_map("[a-z]{1,4}", arb_value_for(value), 0..4)
                .prop_map(Value::Map)
                .boxed()
        }
        TypeDesc::Record { fields, .. } => fields
            .iter()
            .map(|field| {
                let name = field.name.clone();
                arb_value_for(&field.ty)
                    .prop_map(move |value| (name.clone(), value))
                    .boxed()
            })
            .collect::<Vec<_>>()
            .prop_map(Value::Record)
            .boxed(),
    }
}

pub fn arb_typed_value() -> impl Strategy<Value = (TypeDesc, Value)> {
    arb_desc().prop_flat_map(|desc| {
        let values = arb_value_for(&desc);
        (Just(desc), values)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_sequence, encode_sequence};
    use serde_json::value::RawValue;

    proptest! {
        #[test]
        fn encode_then_decode_restores_value((desc, value) in arb_typed_value()) {
            let bytes = encode_sequence(std::slice::from_ref(&value)).expect("encodable");
            let raws: Vec<Box<RawValue>> = serde_json::from_slice(&bytes).expect("json array");
            let decoded = decode_sequence(&raws, std::slice::from_ref(&desc)).expect("decodable");
            prop_assert_eq!(decoded, vec![value]);
        }

        #[test]
        fn multi_element_tuples_restore_positionally(
            pairs in prop::collection::vec(arb_typed_value(), 0..5)
        ) {
            let (descs, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
            let bytes = encode_sequence(&values).expect("encodable");
            let raws: Vec<Box<RawValue>> = serde_json::from_slice(&bytes).expect("json array");
            let decoded = decode_sequence(&raws, &descs).expect("decodable");
            prop_assert_eq!(decoded, values);
        }

        #[test]
        fn encoding_is_byte_deterministic((_desc, value) in arb_typed_value()) {
            let first = encode_sequence(std::slice::from_ref(&value)).expect("encodable");
            let second = encode_sequence(std::slice::from_ref(&value.clone())).expect("encodable");
            prop_assert_eq!(first, second);
        }
    }
}
