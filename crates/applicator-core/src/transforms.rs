//! Built-in transforms
//!
//! Every transform takes the field's current value plus the directive
//! argument and returns the replacement value. None of the built-ins use the
//! argument.
//!
//! # Built-in Transforms
//!
//! - `trim` - Strip leading and trailing whitespace from a string or `*string`
//! - `lower` - Lowercase a string or `*string`
//! - `fillDefault` (alias `fillNil`) - Replace a nil pointer, map or sequence
//!   with a fresh zero value of the same type
//!
//! # Example
//!
//! ```rust
//! use applicator_core::{transforms, Value};
//!
//! let out = transforms::trim(Value::string("  padded  "), "").unwrap();
//! assert_eq!(out, Value::string("padded"));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::value::Value;

/// Registered name of [`trim`]
pub const TRIM: &str = "trim";
/// Registered name of [`lower`]
pub const LOWER: &str = "lower";
/// Registered name of [`fill_default`]
pub const FILL_DEFAULT: &str = "fillDefault";
/// Alternate registered name of [`fill_default`]
pub const FILL_NIL: &str = "fillNil";

/// Trim whitespace from a string or a non-nil pointer to string
pub fn trim(value: Value, _argument: &str) -> Result<Value> {
    map_string(TRIM, value, |s| s.trim().to_string())
}

/// Lowercase a string or a non-nil pointer to string
pub fn lower(value: Value, _argument: &str) -> Result<Value> {
    map_string(LOWER, value, str::to_lowercase)
}

/// Replace a nil pointer, map or sequence with a fresh zero value of its type
pub fn fill_default(value: Value, _argument: &str) -> Result<Value> {
    match value {
        Value::Pointer { elem, target: None } => {
            let zero = elem.zero_value();
            Ok(Value::Pointer {
                elem,
                target: Some(Rc::new(RefCell::new(zero))),
            })
        }
        Value::Map {
            key,
            elem,
            entries: None,
        } => Ok(Value::Map {
            key,
            elem,
            entries: Some(HashMap::new()),
        }),
        Value::Seq { elem, items: None } => Ok(Value::Seq {
            elem,
            items: Some(Vec::with_capacity(1)),
        }),
        value @ (Value::Pointer { .. } | Value::Map { .. } | Value::Seq { .. }) => Ok(value),
        other => Err(unsupported(FILL_DEFAULT, &other)),
    }
}

/// Apply `f` to a string, or to the string behind a pointer.
///
/// A nil pointer passes through whatever its target type. A non-nil pointer
/// yields a new pointer; the original target is left as it was.
fn map_string(name: &str, value: Value, f: impl Fn(&str) -> String) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        Value::Pointer { target: None, .. } => Ok(value),
        Value::Pointer {
            elem,
            target: Some(target),
        } => {
            // A target borrowed elsewhere is a struct the engine is inside of
            let current = target.try_borrow().map_err(|_| Error::Unsupported {
                transform: name.to_string(),
                found: elem.clone(),
            })?;
            let mapped = match &*current {
                Value::String(s) => f(s),
                other => return Err(unsupported(name, other)),
            };
            drop(current);
            Ok(Value::Pointer {
                elem,
                target: Some(Rc::new(RefCell::new(Value::String(mapped)))),
            })
        }
        other => Err(unsupported(name, &other)),
    }
}

fn unsupported(name: &str, value: &Value) -> Error {
    Error::Unsupported {
        transform: name.to_string(),
        found: value.type_of(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Field, StructType, Type};
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(" 123 ", "123")]
    #[case("\t\nabc\r\n", "abc")]
    #[case("a b", "a b")]
    #[case("", "")]
    fn test_trim_string(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(trim(Value::string(input), "").unwrap(), Value::string(expected));
    }

    #[test]
    fn test_trim_pointer_returns_new_pointer() {
        let original = Value::pointer_to(Value::string(" 234 "));
        let out = trim(original.clone(), "").unwrap();

        assert_eq!(*out.pointee().unwrap(), Value::string("234"));
        assert!(!Rc::ptr_eq(out.target().unwrap(), original.target().unwrap()));
        assert_eq!(*original.pointee().unwrap(), Value::string(" 234 "));
        assert_eq!(out.type_of(), Type::pointer(Type::String));
    }

    #[test]
    fn test_trim_nil_pointer_passes_through() {
        let out = trim(Value::nil_pointer(Type::String), "").unwrap();
        assert_eq!(out, Value::nil_pointer(Type::String));
    }

    #[rstest]
    #[case(Value::Int(1))]
    #[case(Value::seq(Type::String, [Value::string(" a ")]))]
    #[case(Value::pointer_to(Value::Int(1)))]
    #[case(Value::boxed(Value::string(" a ")))]
    fn test_trim_rejects_non_strings(#[case] input: Value) {
        let err = trim(input, "").unwrap_err();
        assert!(matches!(err, Error::Unsupported { ref transform, .. } if transform == "trim"));
    }

    #[test]
    fn test_lower() {
        assert_eq!(lower(Value::string("AAA"), "").unwrap(), Value::string("aaa"));

        let out = lower(Value::pointer_to(Value::string("BBB")), "").unwrap();
        assert_eq!(*out.pointee().unwrap(), Value::string("bbb"));

        let nil = lower(Value::nil_pointer(Type::String), "").unwrap();
        assert!(nil.is_nil());

        assert!(matches!(lower(Value::Bool(true), ""), Err(Error::Unsupported { .. })));
    }

    #[test]
    fn test_fill_default_nil_pointer() {
        let user = StructType::new(
            "User",
            [Field::new("name", Type::String), Field::new("age", Type::Int)],
        );
        let out = fill_default(Value::nil_pointer(Type::Struct(user.clone())), "").unwrap();

        let pointee = out.pointee().unwrap();
        assert_eq!(pointee.field("name"), Some(&Value::string("")));
        assert_eq!(pointee.field("age"), Some(&Value::Int(0)));
        assert_eq!(out.type_of(), Type::pointer(Type::Struct(user)));
    }

    #[test]
    fn test_fill_default_nil_string_pointer() {
        let out = fill_default(Value::nil_pointer(Type::String), "").unwrap();
        assert_eq!(*out.pointee().unwrap(), Value::string(""));
    }

    #[test]
    fn test_fill_default_keeps_existing_pointer() {
        let original = Value::pointer_to(Value::string("A"));
        let out = fill_default(original.clone(), "").unwrap();
        assert!(Rc::ptr_eq(out.target().unwrap(), original.target().unwrap()));
    }

    #[test]
    fn test_fill_default_nil_map_and_seq() {
        let map = fill_default(Value::nil_map(Type::String, Type::String), "").unwrap();
        assert_eq!(map.entries().map(HashMap::len), Some(0));
        assert_eq!(map.type_of(), Type::map(Type::String, Type::String));

        let seq = fill_default(Value::nil_seq(Type::String), "").unwrap();
        assert_eq!(seq.items().map(<[Value]>::len), Some(0));
        assert!(!seq.is_nil());
    }

    #[test]
    fn test_fill_default_keeps_populated_containers() {
        let seq = Value::seq(Type::Int, [Value::Int(1)]);
        assert_eq!(fill_default(seq.clone(), "").unwrap(), seq);
    }

    #[rstest]
    #[case(Value::string(""))]
    #[case(Value::Int(0))]
    #[case(Value::empty_box())]
    #[case(Value::array(Type::Int, [Value::Int(0)]))]
    fn test_fill_default_rejects_other_kinds(#[case] input: Value) {
        assert!(matches!(fill_default(input, ""), Err(Error::Unsupported { .. })));
    }

    fn trimmed(s: &str) -> String {
        trim(Value::string(s), "").unwrap().as_str().unwrap().to_string()
    }

    fn lowered(s: &str) -> String {
        lower(Value::string(s), "").unwrap().as_str().unwrap().to_string()
    }

    proptest! {
        #[test]
        fn test_trim_is_idempotent(s in any::<String>()) {
            let once = trimmed(&s);
            prop_assert_eq!(trimmed(&once), once.clone());
            prop_assert_eq!(once.trim(), once.as_str());
        }

        #[test]
        fn test_lower_is_idempotent(s in any::<String>()) {
            let once = lowered(&s);
            prop_assert_eq!(lowered(&once), once);
        }
    }
}
