#![forbid(unsafe_code)]

//! Type-erased solution functions.
//!
//! A [`Solution`] pairs a boxed invoker taking and returning [`Value`]
//! tuples with the [`Signature`] of the typed function it wraps. The
//! signature is what the verifier uses to pick a decode target for each
//! persisted element.

use crate::{CaseValue, TypeDesc, Value, ValueError, conform};
use smallvec::{SmallVec, smallvec};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub type ParamDescs = SmallVec<[TypeDesc; 4]>;
pub type OutputDescs = SmallVec<[TypeDesc; 2]>;

pub type Invoker = Box<dyn Fn(Vec<Value>) -> Result<Vec<Value>, InvokeError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: ParamDescs,
    pub returns: OutputDescs,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, param) in self.params.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> (")?;
        for (idx, ret) in self.returns.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ret}")?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("arity mismatch: function takes {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("function declares {expected} results but returned {actual}")]
    ResultArity { expected: usize, actual: usize },
    #[error("result {position} does not match the declared return type: {source}")]
    ResultShape {
        position: usize,
        #[source]
        source: ValueError,
    },
    #[error("argument {position} cannot be passed: {source}")]
    Argument {
        position: usize,
        #[source]
        source: ValueError,
    },
}

/// How a return type flattens into an ordered result tuple.
///
/// `()` yields no values, a single [`CaseValue`] yields one, and tuples
/// yield one value per element.
pub trait CaseOutputs {
    fn describe_outputs() -> OutputDescs;

    fn into_values(self) -> Vec<Value>;
}

#[doc(hidden)]
#[must_use]
pub fn single_output<T: CaseValue>() -> OutputDescs {
    smallvec![T::describe()]
}

impl CaseOutputs for () {
    fn describe_outputs() -> OutputDescs {
        SmallVec::new()
    }

    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

macro_rules! impl_single_output {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CaseOutputs for $ty {
                fn describe_outputs() -> OutputDescs {
                    single_output::<Self>()
                }

                fn into_values(self) -> Vec<Value> {
                    vec![self.to_value()]
                }
            }
        )*
    };
}

impl_single_output!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String
);

impl<T: CaseValue> CaseOutputs for Vec<T> {
    fn describe_outputs() -> OutputDescs {
        single_output::<Self>()
    }

    fn into_values(self) -> Vec<Value> {
        vec![self.to_value()]
    }
}

impl<T: CaseValue> CaseOutputs for Option<T> {
    fn describe_outputs() -> OutputDescs {
        single_output::<Self>()
    }

    fn into_values(self) -> Vec<Value> {
        vec![self.to_value()]
    }
}

impl<T: CaseValue> CaseOutputs for BTreeMap<String, T> {
    fn describe_outputs() -> OutputDescs {
        single_output::<Self>()
    }

    fn into_values(self) -> Vec<Value> {
        vec![self.to_value()]
    }
}

macro_rules! impl_tuple_output {
    ($($ty:ident),+) => {
        impl<$($ty: CaseValue),+> CaseOutputs for ($($ty,)+) {
            fn describe_outputs() -> OutputDescs {
                smallvec![$($ty::describe()),+]
            }

            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($ty,)+) = self;
                vec![$($ty.to_value()),+]
            }
        }
    };
}

impl_tuple_output!(A);
impl_tuple_output!(A, B);
impl_tuple_output!(A, B, C);
impl_tuple_output!(A, B, C, D);
impl_tuple_output!(A, B, C, D, E);
impl_tuple_output!(A, B, C, D, E, F);

/// An argument tuple accepted at case registration.
pub trait CaseArgs {
    fn into_args(self) -> Vec<Value>;
}

impl CaseArgs for Vec<Value> {
    fn into_args(self) -> Vec<Value> {
        self
    }
}

macro_rules! impl_case_args {
    ($($ty:ident),*) => {
        impl<$($ty: CaseValue),*> CaseArgs for ($($ty,)*) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<Value> {
                let ($($ty,)*) = self;
                vec![$($ty.to_value()),*]
            }
        }
    };
}

impl_case_args!();
impl_case_args!(A);
impl_case_args!(A, B);
impl_case_args!(A, B, C);
impl_case_args!(A, B, C, D);
impl_case_args!(A, B, C, D, E);
impl_case_args!(A, B, C, D, E, F);

/// Typed functions convertible into a [`Solution`].
///
/// `Args` is the parameter tuple; it only exists to keep the per-arity
/// impls apart.
pub trait IntoSolution<Args> {
    fn signature() -> Signature;

    fn into_invoker(self) -> Invoker;
}

fn convert_arg<T: CaseValue>(value: Value, position: &mut usize) -> Result<T, InvokeError> {
    let current = *position;
    *position += 1;
    T::from_value(value).map_err(|source| InvokeError::Argument {
        position: current,
        source,
    })
}

macro_rules! count_idents {
    () => { 0_usize };
    ($head:ident $($tail:ident)*) => { 1_usize + count_idents!($($tail)*) };
}

macro_rules! impl_into_solution {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg),*> IntoSolution<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + 'static,
            Out: CaseOutputs,
            $($arg: CaseValue,)*
        {
            fn signature() -> Signature {
                Signature {
                    params: smallvec![$($arg::describe()),*],
                    returns: Out::describe_outputs(),
                }
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_invoker(self) -> Invoker {
                const ARITY: usize = count_idents!($($arg)*);
                Box::new(move |args: Vec<Value>| {
                    let actual = args.len();
                    let [$($arg),*]: [Value; ARITY] = args
                        .try_into()
                        .map_err(|_| InvokeError::ArityMismatch {
                            expected: ARITY,
                            actual,
                        })?;
                    let mut position = 0_usize;
                    $(
                        let $arg: $arg = convert_arg($arg, &mut position)?;
                    )*
                    Ok((self)($($arg),*).into_values())
                })
            }
        }
    };
}

impl_into_solution!();
impl_into_solution!(A);
impl_into_solution!(A, B);
impl_into_solution!(A, B, C);
impl_into_solution!(A, B, C, D);
impl_into_solution!(A, B, C, D, E);
impl_into_solution!(A, B, C, D, E, F);

/// A named, type-erased reference or candidate function.
pub struct Solution {
    name: String,
    signature: Signature,
    invoker: Invoker,
}

impl Solution {
    pub fn new<Args, F>(name: impl Into<String>, func: F) -> Self
    where
        F: IntoSolution<Args>,
    {
        Self {
            name: name.into(),
            signature: F::signature(),
            invoker: func.into_invoker(),
        }
    }

    /// Builds a solution from a hand-written dynamic callable. The invoker
    /// must accept and produce tuples shaped like `signature`.
    pub fn from_parts(name: impl Into<String>, signature: Signature, invoker: Invoker) -> Self {
        Self {
            name: name.into(),
            signature,
            invoker,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invokes the function and conforms each result to its declared return
    /// descriptor, so results compare equal to decoded persisted outputs.
    pub fn call(&self, args: Vec<Value>) -> Result<Vec<Value>, InvokeError> {
        let results = (self.invoker)(args)?;
        if results.len() != self.signature.returns.len() {
            return Err(InvokeError::ResultArity {
                expected: self.signature.returns.len(),
                actual: results.len(),
            });
        }
        results
            .into_iter()
            .zip(&self.signature.returns)
            .enumerate()
            .map(|(position, (value, desc))| {
                conform(value, desc)
                    .map_err(|source| InvokeError::ResultShape { position, source })
            })
            .collect()
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solution")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{CaseArgs, InvokeError, Signature, Solution};
    use crate::{TypeDesc, Value};
    use smallvec::smallvec;

    fn add(a: i64, b: i64) -> i64 {
        a + b
    }

    fn div_mod(a: i64, b: i64) -> (i64, i64) {
        (a / b, a % b)
    }

    #[test]
    fn signature_is_derived_from_static_types() {
        let solution = Solution::new("add", add);
        assert_eq!(
            solution.signature(),
            &Signature {
                params: smallvec![TypeDesc::Int { bits: 64 }, TypeDesc::Int { bits: 64 }],
                returns: smallvec![TypeDesc::Int { bits: 64 }],
            }
        );
        assert_eq!(solution.signature().to_string(), "(i64, i64) -> (i64)");
    }

    #[test]
    fn calls_with_dynamic_arguments() {
        let solution = Solution::new("add", add);
        let out = solution
            .call(vec![Value::Int(3), Value::Int(4)])
            .expect("add should run");
        assert_eq!(out, vec![Value::Int(7)]);
    }

    #[test]
    fn tuple_return_yields_multiple_values() {
        let solution = Solution::new("div_mod", div_mod);
        assert_eq!(solution.signature().returns.len(), 2);
        let out = solution
            .call((17_i64, 5_i64).into_args())
            .expect("div_mod should run");
        assert_eq!(out, vec![Value::Int(3), Value::Int(2)]);
    }

    #[test]
    fn unit_return_yields_no_values() {
        let solution = Solution::new("noop", |_flag: bool| {});
        assert!(solution.signature().returns.is_empty());
        let out = solution.call(vec![Value::Bool(true)]).expect("noop");
        assert!(out.is_empty());
    }

    #[test]
    fn zero_arity_closure_is_supported() {
        let solution = Solution::new("constant", || String::from("fixed"));
        assert!(solution.signature().params.is_empty());
        let out = solution.call(Vec::new()).expect("constant");
        assert_eq!(out, vec![Value::Str("fixed".to_owned())]);
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let solution = Solution::new("add", add);
        let err = solution
            .call(vec![Value::Int(1)])
            .expect_err("one argument is not enough");
        assert!(matches!(
            err,
            InvokeError::ArityMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn argument_conversion_failure_names_position() {
        let solution = Solution::new("add", add);
        let err = solution
            .call(vec![Value::Int(1), Value::Str("two".to_owned())])
            .expect_err("string is not an i64");
        assert!(matches!(err, InvokeError::Argument { position: 1, .. }));
    }

    #[test]
    fn from_parts_uses_explicit_signature() {
        let signature = Signature {
            params: smallvec![TypeDesc::Str],
            returns: smallvec![TypeDesc::UInt { bits: 64 }],
        };
        let solution = Solution::from_parts(
            "len",
            signature.clone(),
            Box::new(|args: Vec<Value>| -> Result<Vec<Value>, InvokeError> {
                let len = args.first().and_then(Value::as_str).map_or(0, str::len);
                Ok(vec![Value::UInt(len as u64)])
            }),
        );
        assert_eq!(solution.signature(), &signature);
        let out = solution
            .call(vec![Value::Str("abcd".to_owned())])
            .expect("len");
        assert_eq!(out, vec![Value::UInt(4)]);
    }

    #[test]
    fn undeclared_results_are_rejected() {
        let signature = Signature {
            params: smallvec![],
            returns: smallvec![TypeDesc::Bool],
        };
        let solution = Solution::from_parts(
            "two_results",
            signature,
            Box::new(|_args: Vec<Value>| -> Result<Vec<Value>, InvokeError> {
                Ok(vec![Value::Bool(true), Value::Bool(false)])
            }),
        );
        let err = solution.call(Vec::new()).expect_err("declared one result");
        assert!(matches!(
            err,
            InvokeError::ResultArity {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn results_take_declared_representation() {
        let signature = Signature {
            params: smallvec![],
            returns: smallvec![TypeDesc::UInt { bits: 64 }],
        };
        let solution = Solution::from_parts(
            "four",
            signature,
            Box::new(|_args: Vec<Value>| -> Result<Vec<Value>, InvokeError> {
                Ok(vec![Value::Int(4)])
            }),
        );
        assert_eq!(solution.call(Vec::new()).expect("four"), vec![Value::UInt(4)]);
    }

    #[test]
    fn results_of_the_wrong_kind_are_rejected() {
        let signature = Signature {
            params: smallvec![],
            returns: smallvec![TypeDesc::Bool, TypeDesc::Str],
        };
        let solution = Solution::from_parts(
            "mixed",
            signature,
            Box::new(|_args: Vec<Value>| -> Result<Vec<Value>, InvokeError> {
                Ok(vec![Value::Bool(true), Value::Int(1)])
            }),
        );
        let err = solution.call(Vec::new()).expect_err("int is not str");
        assert!(matches!(err, InvokeError::ResultShape { position: 1, .. }));
    }

    #[test]
    fn single_and_wide_tuples_flatten() {
        let single = Solution::new("wrapped", |x: i64| (x,));
        assert_eq!(single.signature().returns.len(), 1);
        assert_eq!(single.call(vec![Value::Int(2)]).expect("single"), vec![Value::Int(2)]);

        let spread = Solution::new("spread", |x: i64| (x, x + 1, x + 2, x + 3, x + 4, x + 5));
        assert_eq!(spread.signature().to_string(), "(i64) -> (i64, i64, i64, i64, i64, i64)");
        let out = spread.call(vec![Value::Int(0)]).expect("spread");
        assert_eq!(out, (0..6).map(Value::Int).collect::<Vec<_>>());
    }

    #[test]
    fn case_args_flatten_tuples() {
        let args = (1_i32, String::from("x"), vec![true]).into_args();
        assert_eq!(
            args,
            vec![
                Value::Int(1),
                Value::Str("x".to_owned()),
                Value::List(vec![Value::Bool(true)]),
            ]
        );
    }
}
