//! Dynamic value model
//!
//! Every value the engine walks is a [`Value`]: a closed set of shapes
//! (struct, sequence, fixed array, map, pointer, boxed, scalar) that carries
//! its own static [`Type`]. Struct types hold the per-field descriptor table
//! (name, type and raw annotation tags) that drives the transforms.
//!
//! Pointer targets live in `Rc<RefCell<Value>>`, so two pointers may alias the
//! same storage, exactly like a pointer kept both in a map and in a field.
//!
//! # Example
//!
//! ```rust
//! use applicator_core::{Field, StructType, StructValue, Type, Value};
//!
//! let user = StructType::new("User", [
//!     Field::new("name", Type::String).with_tag("apply", "trim,lower"),
//! ]);
//! let value = StructValue::new(user, vec![Value::string(" ADA ")]).unwrap();
//! let root = Value::pointer_to(Value::Struct(value));
//! assert_eq!(root.shape(), applicator_core::Shape::Pointer);
//! ```

use std::borrow::Cow;
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Closed classification of values and types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Record with named fields
    Struct,
    /// Variable-length ordered container
    Sequence,
    /// Fixed-length ordered container
    FixedArray,
    /// Keyed, unordered container
    Map,
    /// Single-owner indirection, may be nil
    Pointer,
    /// Dynamically typed container holding one concrete value, may be empty
    Boxed,
    /// Anything else
    Scalar,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Struct => "struct",
            Self::Sequence => "sequence",
            Self::FixedArray => "fixed array",
            Self::Map => "map",
            Self::Pointer => "pointer",
            Self::Boxed => "boxed",
            Self::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

/// Static type of a value
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Unsigned integer
    Uint,
    /// Floating point number
    Float,
    /// UTF-8 string
    String,
    /// Struct with a descriptor table
    Struct(StructType),
    /// Sequence of the element type
    Seq(Box<Type>),
    /// Fixed array of the element type and length
    Array(Box<Type>, usize),
    /// Map from key type to element type
    Map(Box<Type>, Box<Type>),
    /// Nilable pointer to the target type
    Pointer(Box<Type>),
    /// Box holding a value of any type
    Boxed,
}

impl Type {
    /// Sequence of `elem`
    pub fn seq(elem: Type) -> Self {
        Self::Seq(Box::new(elem))
    }

    /// Fixed array of `len` elements of `elem`
    pub fn array(elem: Type, len: usize) -> Self {
        Self::Array(Box::new(elem), len)
    }

    /// Map from `key` to `elem`
    pub fn map(key: Type, elem: Type) -> Self {
        Self::Map(Box::new(key), Box::new(elem))
    }

    /// Pointer to `elem`
    pub fn pointer(elem: Type) -> Self {
        Self::Pointer(Box::new(elem))
    }

    /// Shape of values of this type
    pub fn shape(&self) -> Shape {
        match self {
            Self::Struct(_) => Shape::Struct,
            Self::Seq(_) => Shape::Sequence,
            Self::Array(..) => Shape::FixedArray,
            Self::Map(..) => Shape::Map,
            Self::Pointer(_) => Shape::Pointer,
            Self::Boxed => Shape::Boxed,
            Self::Bool | Self::Int | Self::Uint | Self::Float | Self::String => Shape::Scalar,
        }
    }

    /// Whether values of this type are eligible for recursive descent.
    ///
    /// A pointer is eligible when its target type is.
    pub fn is_composite(&self) -> bool {
        match self {
            Self::Struct(_) | Self::Seq(_) | Self::Array(..) | Self::Map(..) | Self::Boxed => true,
            Self::Pointer(target) => target.is_composite(),
            _ => false,
        }
    }

    /// Whether mutating a value of this type needs addressable storage of its own.
    ///
    /// True for structs and for fixed arrays whose elements need an address.
    pub fn requires_address(&self) -> bool {
        match self {
            Self::Struct(_) => true,
            Self::Array(elem, _) => elem.requires_address(),
            _ => false,
        }
    }

    /// Zero value of this type: nil for pointers, sequences, maps and boxes.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Uint => Value::Uint(0),
            Self::Float => Value::Float(0.0),
            Self::String => Value::String(String::new()),
            Self::Struct(ty) => Value::Struct(StructValue::zero(ty)),
            Self::Seq(elem) => Value::nil_seq((**elem).clone()),
            Self::Array(elem, len) => Value::Array {
                elem: (**elem).clone(),
                items: (0..*len).map(|_| elem.zero_value()).collect(),
            },
            Self::Map(key, elem) => Value::nil_map((**key).clone(), (**elem).clone()),
            Self::Pointer(elem) => Value::nil_pointer((**elem).clone()),
            Self::Boxed => Value::Boxed(None),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Uint => f.write_str("uint"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::Struct(ty) => f.write_str(ty.name()),
            Self::Seq(elem) => write!(f, "[]{elem}"),
            Self::Array(elem, len) => write!(f, "[{len}]{elem}"),
            Self::Map(key, elem) => write!(f, "map[{key}]{elem}"),
            Self::Pointer(elem) => write!(f, "*{elem}"),
            Self::Boxed => f.write_str("dynamic"),
        }
    }
}

/// Struct type: a name plus the ordered field descriptor table
#[derive(Clone)]
pub struct StructType {
    name: Cow<'static, str>,
    fields: FieldTable,
}

#[derive(Clone)]
enum FieldTable {
    Eager(Arc<[Field]>),
    // Built on demand so self-referential types never recurse at construction
    Lazy(fn() -> Vec<Field>),
}

impl StructType {
    /// Create a struct type from a field list
    pub fn new(name: impl Into<Cow<'static, str>>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            fields: FieldTable::Eager(fields.into_iter().collect()),
        }
    }

    /// Create a struct type whose field table is produced by `fields` on each access
    pub const fn lazy(name: &'static str, fields: fn() -> Vec<Field>) -> Self {
        Self {
            name: Cow::Borrowed(name),
            fields: FieldTable::Lazy(fields),
        }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field descriptors in declaration order
    pub fn fields(&self) -> Cow<'_, [Field]> {
        match &self.fields {
            FieldTable::Eager(fields) => Cow::Borrowed(fields),
            FieldTable::Lazy(build) => Cow::Owned(build()),
        }
    }

    /// Position of the field called `name`
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().position(|field| field.name() == name)
    }
}

// Struct types are nominal
impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructType")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One entry of a struct's descriptor table
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: Cow<'static, str>,
    ty: Type,
    tags: Vec<(Cow<'static, str>, Cow<'static, str>)>,
}

impl Field {
    /// Create an untagged field
    pub fn new(name: impl Into<Cow<'static, str>>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            tags: Vec::new(),
        }
    }

    /// Attach a raw annotation under `key`, replacing any previous one
    pub fn with_tag(
        mut self,
        key: impl Into<Cow<'static, str>>,
        annotation: impl Into<Cow<'static, str>>,
    ) -> Self {
        let key = key.into();
        let annotation = annotation.into();
        match self.tags.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = annotation,
            None => self.tags.push((key, annotation)),
        }
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared static type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Raw annotation stored under `key`, or `""` when there is none
    pub fn tag(&self, key: &str) -> &str {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, annotation)| annotation)
    }
}

/// Hashable map key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    /// Boolean key
    Bool(bool),
    /// Signed integer key
    Int(i64),
    /// Unsigned integer key
    Uint(u64),
    /// String key
    String(String),
}

impl MapKey {
    /// Static type of the key
    pub fn type_of(&self) -> Type {
        match self {
            Self::Bool(_) => Type::Bool,
            Self::Int(_) => Type::Int,
            Self::Uint(_) => Type::Uint,
            Self::String(_) => Type::String,
        }
    }
}

impl From<&str> for MapKey {
    fn from(key: &str) -> Self {
        Self::String(key.to_string())
    }
}

impl From<String> for MapKey {
    fn from(key: String) -> Self {
        Self::String(key)
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// A struct instance: its type plus one value per field
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    ty: StructType,
    values: Vec<Value>,
}

impl StructValue {
    /// Create a struct value, checking each value against its field type
    pub fn new(ty: StructType, values: Vec<Value>) -> Result<Self> {
        let fields = ty.fields();
        if fields.len() != values.len() {
            return Err(Error::conversion(
                format!("{} fields for {}", fields.len(), ty.name()),
                format!("{} values", values.len()),
            ));
        }
        for (field, value) in fields.iter().zip(&values) {
            let found = value.type_of();
            if &found != field.ty() {
                return Err(Error::conversion(
                    format!("{} for field '{}'", field.ty(), field.name()),
                    found,
                ));
            }
        }
        drop(fields);
        Ok(Self { ty, values })
    }

    /// Create a struct value from values already known to match the field table
    #[doc(hidden)]
    pub fn new_unchecked(ty: StructType, values: Vec<Value>) -> Self {
        Self { ty, values }
    }

    /// Zero value of `ty`
    pub fn zero(ty: &StructType) -> Self {
        let values = ty.fields().iter().map(|f| f.ty().zero_value()).collect();
        Self {
            ty: ty.clone(),
            values,
        }
    }

    /// The struct's type
    pub fn struct_type(&self) -> &StructType {
        &self.ty
    }

    /// Field values in declaration order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    /// Value of the field called `name`
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).and_then(|i| self.values.get(i))
    }

    /// Mutable value of the field called `name`
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.ty.field_index(name).and_then(|i| self.values.get_mut(i))
    }

    /// Consume the struct, returning its field values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// A dynamically shaped value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Struct instance
    Struct(StructValue),
    /// Sequence; `None` is a nil sequence
    Seq {
        /// Element type
        elem: Type,
        /// Elements
        items: Option<Vec<Value>>,
    },
    /// Fixed array
    Array {
        /// Element type
        elem: Type,
        /// Elements; the length is part of the type
        items: Vec<Value>,
    },
    /// Map; `None` is a nil map
    Map {
        /// Key type
        key: Type,
        /// Element type
        elem: Type,
        /// Entries
        entries: Option<HashMap<MapKey, Value>>,
    },
    /// Pointer; `None` is nil
    Pointer {
        /// Target type
        elem: Type,
        /// Shared target storage
        target: Option<Rc<RefCell<Value>>>,
    },
    /// Box holding any value; `None` is empty
    Boxed(Option<Box<Value>>),
}

impl Value {
    /// String value
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Pointer to fresh storage holding `value`
    pub fn pointer_to(value: Value) -> Self {
        Self::Pointer {
            elem: value.type_of(),
            target: Some(Rc::new(RefCell::new(value))),
        }
    }

    /// Pointer to existing shared storage
    pub fn pointer_at(elem: Type, target: Rc<RefCell<Value>>) -> Self {
        Self::Pointer {
            elem,
            target: Some(target),
        }
    }

    /// Nil pointer to `elem`
    pub fn nil_pointer(elem: Type) -> Self {
        Self::Pointer { elem, target: None }
    }

    /// Sequence of `elem`
    pub fn seq(elem: Type, items: impl IntoIterator<Item = Value>) -> Self {
        Self::Seq {
            elem,
            items: Some(items.into_iter().collect()),
        }
    }

    /// Nil sequence of `elem`
    pub fn nil_seq(elem: Type) -> Self {
        Self::Seq { elem, items: None }
    }

    /// Fixed array of `elem`
    pub fn array(elem: Type, items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array {
            elem,
            items: items.into_iter().collect(),
        }
    }

    /// Map from `key` to `elem`
    pub fn map(key: Type, elem: Type, entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Self::Map {
            key,
            elem,
            entries: Some(entries.into_iter().collect()),
        }
    }

    /// Nil map from `key` to `elem`
    pub fn nil_map(key: Type, elem: Type) -> Self {
        Self::Map {
            key,
            elem,
            entries: None,
        }
    }

    /// Box holding `value`
    pub fn boxed(value: Value) -> Self {
        Self::Boxed(Some(Box::new(value)))
    }

    /// Empty box
    pub fn empty_box() -> Self {
        Self::Boxed(None)
    }

    /// Static type of this value. Boxes report [`Type::Boxed`] whatever they hold.
    pub fn type_of(&self) -> Type {
        match self {
            Self::Bool(_) => Type::Bool,
            Self::Int(_) => Type::Int,
            Self::Uint(_) => Type::Uint,
            Self::Float(_) => Type::Float,
            Self::String(_) => Type::String,
            Self::Struct(value) => Type::Struct(value.struct_type().clone()),
            Self::Seq { elem, .. } => Type::seq(elem.clone()),
            Self::Array { elem, items } => Type::array(elem.clone(), items.len()),
            Self::Map { key, elem, .. } => Type::map(key.clone(), elem.clone()),
            Self::Pointer { elem, .. } => Type::pointer(elem.clone()),
            Self::Boxed(_) => Type::Boxed,
        }
    }

    /// Shape of this value
    pub fn shape(&self) -> Shape {
        match self {
            Self::Struct(_) => Shape::Struct,
            Self::Seq { .. } => Shape::Sequence,
            Self::Array { .. } => Shape::FixedArray,
            Self::Map { .. } => Shape::Map,
            Self::Pointer { .. } => Shape::Pointer,
            Self::Boxed(_) => Shape::Boxed,
            _ => Shape::Scalar,
        }
    }

    /// Whether this is a nil pointer, sequence or map, or an empty box
    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Self::Seq { items: None, .. }
                | Self::Map { entries: None, .. }
                | Self::Pointer { target: None, .. }
                | Self::Boxed(None)
        )
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Struct contents, if this is a struct
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Self::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// Mutable struct contents, if this is a struct
    pub fn as_struct_mut(&mut self) -> Option<&mut StructValue> {
        match self {
            Self::Struct(value) => Some(value),
            _ => None,
        }
    }

    /// Field `name` of a struct value
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_struct().and_then(|value| value.field(name))
    }

    /// Shared storage behind a non-nil pointer
    pub fn target(&self) -> Option<&Rc<RefCell<Value>>> {
        match self {
            Self::Pointer { target, .. } => target.as_ref(),
            _ => None,
        }
    }

    /// Borrow the value behind a non-nil pointer
    pub fn pointee(&self) -> Option<Ref<'_, Value>> {
        self.target().map(|target| target.borrow())
    }

    /// Contents of a non-empty box
    pub fn unboxed(&self) -> Option<&Value> {
        match self {
            Self::Boxed(inner) => inner.as_deref(),
            _ => None,
        }
    }

    /// Elements of a non-nil sequence or of an array
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Self::Seq { items, .. } => items.as_deref(),
            Self::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Entries of a non-nil map
    pub fn entries(&self) -> Option<&HashMap<MapKey, Value>> {
        match self {
            Self::Map { entries, .. } => entries.as_ref(),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Bool(v) => Self::Bool(v),
            MapKey::Int(v) => Self::Int(v),
            MapKey::Uint(v) => Self::Uint(v),
            MapKey::String(v) => Self::String(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_type() -> StructType {
        StructType::lazy("Node", || {
            vec![
                Field::new("label", Type::String).with_tag("apply", "trim"),
                Field::new("next", Type::pointer(Type::Struct(node_type()))),
            ]
        })
    }

    #[test]
    fn test_composite_eligibility() {
        let user = Type::Struct(StructType::new("User", Vec::<Field>::new()));
        assert!(user.is_composite());
        assert!(Type::seq(Type::String).is_composite());
        assert!(Type::Boxed.is_composite());
        assert!(Type::pointer(user.clone()).is_composite());
        assert!(Type::pointer(Type::pointer(user)).is_composite());
        assert!(!Type::String.is_composite());
        assert!(!Type::pointer(Type::String).is_composite());
    }

    #[test]
    fn test_requires_address() {
        let user = Type::Struct(StructType::new("User", Vec::<Field>::new()));
        assert!(user.requires_address());
        assert!(Type::array(user.clone(), 2).requires_address());
        assert!(Type::array(Type::array(user.clone(), 2), 2).requires_address());
        assert!(!Type::array(Type::pointer(user.clone()), 2).requires_address());
        assert!(!Type::seq(user).requires_address());
        assert!(!Type::Boxed.requires_address());
    }

    #[test]
    fn test_zero_value_of_recursive_type() {
        let zero = Type::Struct(node_type()).zero_value();
        let node = zero.as_struct().unwrap();
        assert_eq!(node.field("label"), Some(&Value::string("")));
        assert!(node.field("next").unwrap().is_nil());
    }

    #[test]
    fn test_zero_value_of_array_fills_every_slot() {
        let zero = Type::array(Type::Int, 3).zero_value();
        assert_eq!(zero.items().unwrap(), &[Value::Int(0), Value::Int(0), Value::Int(0)]);
    }

    #[test]
    fn test_type_display() {
        let ty = Type::map(Type::String, Type::pointer(Type::Struct(node_type())));
        assert_eq!(ty.to_string(), "map[string]*Node");
        assert_eq!(Type::array(Type::seq(Type::Boxed), 2).to_string(), "[2][]dynamic");
    }

    #[test]
    fn test_struct_value_rejects_mismatched_fields() {
        let ty = StructType::new("User", [Field::new("name", Type::String)]);
        assert!(StructValue::new(ty.clone(), vec![Value::Int(1)]).is_err());
        assert!(StructValue::new(ty.clone(), vec![]).is_err());
        assert!(StructValue::new(ty, vec![Value::string("ok")]).is_ok());
    }

    #[test]
    fn test_field_tag_lookup() {
        let field = Field::new("name", Type::String)
            .with_tag("apply", "trim")
            .with_tag("apply", "lower")
            .with_tag("mold", "-");
        assert_eq!(field.tag("apply"), "lower");
        assert_eq!(field.tag("mold"), "-");
        assert_eq!(field.tag("missing"), "");
    }

    #[test]
    fn test_pointer_clones_share_storage() {
        let ptr = Value::pointer_to(Value::string("a"));
        let alias = ptr.clone();
        *ptr.target().unwrap().borrow_mut() = Value::string("b");
        assert_eq!(*alias.pointee().unwrap(), Value::string("b"));
    }
}
