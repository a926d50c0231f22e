//! Bridge between Rust types and the dynamic value model
//!
//! [`Reflect`] converts a Rust value into a [`Value`] and back, and exposes
//! the type's static descriptor. `#[derive(Reflect)]` generates it for
//! structs; the standard types map as follows:
//!
//! | Rust                         | Value shape                 |
//! |------------------------------|-----------------------------|
//! | `bool`, integers, floats     | scalar                      |
//! | `String`                     | scalar                      |
//! | `Option<T>`                  | pointer (`None` is nil)     |
//! | `Box<T>`                     | same as `T`                 |
//! | `Vec<T>`                     | sequence                    |
//! | `[T; N]`                     | fixed array                 |
//! | `HashMap<K, V>`, `BTreeMap`  | map                         |
//! | [`Dynamic`]                  | boxed                       |

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::value::{MapKey, Type, Value};

/// A Rust type that can be walked by the [`Applicator`](crate::Applicator)
pub trait Reflect: Sized {
    /// Static type descriptor
    fn static_type() -> Type;

    /// Convert into a dynamic value
    fn to_value(&self) -> Value;

    /// Rebuild from a dynamic value
    fn from_value(value: Value) -> Result<Self>;
}

/// A Rust type usable as a map key
pub trait ReflectKey: Reflect + Eq {
    /// Convert into a map key
    fn to_key(&self) -> MapKey;

    /// Rebuild from a map key
    fn from_key(key: MapKey) -> Result<Self>;
}

/// A boxed value of any type; `Dynamic(None)` is an empty box
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dynamic(pub Option<Value>);

impl Dynamic {
    /// Box `value`
    pub fn new(value: Value) -> Self {
        Self(Some(value))
    }
}

fn mismatch(expected: impl Into<String>, value: &Value) -> Error {
    Error::conversion(expected, value.type_of())
}

impl Reflect for bool {
    fn static_type() -> Type {
        Type::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl Reflect for String {
    fn static_type() -> Type {
        Type::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(v) => Ok(v),
            other => Err(mismatch("string", &other)),
        }
    }
}

macro_rules! reflect_int {
    ($variant:ident, $wide:ty, $($ty:ty),+) => {$(
        impl Reflect for $ty {
            fn static_type() -> Type {
                Type::$variant
            }

            fn to_value(&self) -> Value {
                Value::$variant(<$wide>::from(*self))
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => <$ty>::try_from(v)
                        .map_err(|_| Error::conversion(stringify!($ty), v)),
                    other => Err(mismatch(stringify!($ty), &other)),
                }
            }
        }

        impl ReflectKey for $ty {
            fn to_key(&self) -> MapKey {
                MapKey::$variant(<$wide>::from(*self))
            }

            fn from_key(key: MapKey) -> Result<Self> {
                Self::from_value(key.into())
            }
        }
    )+};
}

reflect_int!(Int, i64, i8, i16, i32, i64);
reflect_int!(Uint, u64, u8, u16, u32, u64);

impl Reflect for f64 {
    fn static_type() -> Type {
        Type::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl Reflect for f32 {
    fn static_type() -> Type {
        Type::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(v) => Ok(v as f32),
            other => Err(mismatch("f32", &other)),
        }
    }
}

impl ReflectKey for bool {
    fn to_key(&self) -> MapKey {
        MapKey::Bool(*self)
    }

    fn from_key(key: MapKey) -> Result<Self> {
        Self::from_value(key.into())
    }
}

impl ReflectKey for String {
    fn to_key(&self) -> MapKey {
        MapKey::String(self.clone())
    }

    fn from_key(key: MapKey) -> Result<Self> {
        Self::from_value(key.into())
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn static_type() -> Type {
        T::static_type()
    }

    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn static_type() -> Type {
        Type::pointer(T::static_type())
    }

    fn to_value(&self) -> Value {
        Value::Pointer {
            elem: T::static_type(),
            target: self
                .as_ref()
                .map(|inner| Rc::new(RefCell::new(inner.to_value()))),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Pointer { target: None, .. } => Ok(None),
            Value::Pointer {
                target: Some(target),
                ..
            } => {
                let inner = Rc::try_unwrap(target)
                    .map_or_else(|shared| shared.borrow().clone(), RefCell::into_inner);
                T::from_value(inner).map(Some)
            }
            other => Err(mismatch(Self::static_type().to_string(), &other)),
        }
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn static_type() -> Type {
        Type::seq(T::static_type())
    }

    fn to_value(&self) -> Value {
        Value::seq(T::static_type(), self.iter().map(Reflect::to_value))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Seq { items, .. } => items
                .unwrap_or_default()
                .into_iter()
                .map(T::from_value)
                .collect(),
            other => Err(mismatch(Self::static_type().to_string(), &other)),
        }
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn static_type() -> Type {
        Type::array(T::static_type(), N)
    }

    fn to_value(&self) -> Value {
        Value::array(T::static_type(), self.iter().map(Reflect::to_value))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array { items, .. } if items.len() == N => {
                let items = items
                    .into_iter()
                    .map(T::from_value)
                    .collect::<Result<Vec<_>>>()?;
                items
                    .try_into()
                    .map_err(|_| Error::conversion(Self::static_type().to_string(), "array"))
            }
            other => Err(mismatch(Self::static_type().to_string(), &other)),
        }
    }
}

impl<K: ReflectKey + Hash, V: Reflect> Reflect for HashMap<K, V> {
    fn static_type() -> Type {
        Type::map(K::static_type(), V::static_type())
    }

    fn to_value(&self) -> Value {
        Value::map(
            K::static_type(),
            V::static_type(),
            self.iter().map(|(k, v)| (k.to_key(), v.to_value())),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map { entries, .. } => entries
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| Ok((K::from_key(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(mismatch(Self::static_type().to_string(), &other)),
        }
    }
}

impl<K: ReflectKey + Ord, V: Reflect> Reflect for BTreeMap<K, V> {
    fn static_type() -> Type {
        Type::map(K::static_type(), V::static_type())
    }

    fn to_value(&self) -> Value {
        Value::map(
            K::static_type(),
            V::static_type(),
            self.iter().map(|(k, v)| (k.to_key(), v.to_value())),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map { entries, .. } => entries
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| Ok((K::from_key(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(mismatch(Self::static_type().to_string(), &other)),
        }
    }
}

impl Reflect for Dynamic {
    fn static_type() -> Type {
        Type::Boxed
    }

    fn to_value(&self) -> Value {
        Value::Boxed(self.0.clone().map(Box::new))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boxed(inner) => Ok(Self(inner.map(|v| *v))),
            other => Err(mismatch("dynamic", &other)),
        }
    }
}

/// Support code for `#[derive(Reflect)]`
#[doc(hidden)]
pub mod __private {
    use super::*;
    use crate::value::StructValue;

    /// Pack field values into a struct value of `T`'s descriptor
    pub fn struct_value<T: Reflect>(values: Vec<Value>) -> Value {
        match T::static_type() {
            Type::Struct(ty) => Value::Struct(StructValue::new_unchecked(ty, values)),
            other => unreachable!("derived Reflect impls describe structs, found {other}"),
        }
    }

    /// Unpack a struct value of `T`'s descriptor into its field values
    pub fn struct_fields<T: Reflect>(value: Value) -> Result<std::vec::IntoIter<Value>> {
        let expected = T::static_type();
        match (value, &expected) {
            (Value::Struct(value), Type::Struct(ty)) if value.struct_type() == ty => {
                Ok(value.into_values().into_iter())
            }
            (other, _) => Err(mismatch(expected.to_string(), &other)),
        }
    }

    /// Convert the next field value
    pub fn next_field<T: Reflect>(fields: &mut std::vec::IntoIter<Value>, name: &str) -> Result<T> {
        let value = fields
            .next()
            .ok_or_else(|| Error::conversion(format!("value for field '{name}'"), "nothing"))?;
        T::from_value(value)
    }
}
