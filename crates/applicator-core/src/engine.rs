//! Traversal engine
//!
//! Walks a [`Value`] graph and runs each annotated struct field through its
//! transform chain.
//!
//! Whether a location may be written depends on how it was reached:
//!
//! | Location                         | Writable                          |
//! |----------------------------------|-----------------------------------|
//! | target of a non-nil pointer      | yes                               |
//! | field of a writable struct       | yes                               |
//! | sequence element                 | yes                               |
//! | fixed array element              | when the array is writable        |
//! | map element                      | never                             |
//! | contents of a box                | when the box is writable          |
//! | the top-level value              | no                                |
//!
//! Structs can only be mutated at writable locations. Members that cannot be
//! entered are skipped inside structs, sequences and arrays, while the
//! top-level call reports them as [`Error::CannotApply`]. Maps skip nothing:
//! an element type that needs an address of its own (structs, arrays of
//! structs) rejects the map before any entry is visited, and an entry that
//! cannot be entered (nil pointer, empty box, struct held in a box) fails it.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::annotation::Annotation;
use crate::config::ApplicatorConfig;
use crate::error::{Error, Result};
use crate::reflect::Reflect;
use crate::registry::Registry;
use crate::value::{MapKey, Shape, StructValue, Type, Value};

/// Applies registered transforms to annotated fields
#[derive(Debug, Clone)]
pub struct Applicator {
    config: ApplicatorConfig,
    registry: Registry,
}

impl Default for Applicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Applicator {
    /// Create an applicator with the default config and the built-in transforms
    pub fn new() -> Self {
        Self::with_config(ApplicatorConfig::default())
    }

    /// Create an applicator with `config` and the built-in transforms
    pub fn with_config(config: ApplicatorConfig) -> Self {
        Self::with_registry(config, Registry::with_builtins())
    }

    /// Create an applicator from explicit parts
    pub fn with_registry(config: ApplicatorConfig, registry: Registry) -> Self {
        Self { config, registry }
    }

    /// Active configuration
    pub fn config(&self) -> &ApplicatorConfig {
        &self.config
    }

    /// Registered transforms
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Add or replace a transform
    pub fn register_function<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(Value, &str) -> Result<Value> + Send + Sync + 'static,
    {
        self.registry.register(name, func);
    }

    /// Run every annotated field reachable from `value` through its transforms.
    ///
    /// Accepts a pointer to a struct, a sequence, a pointer to a fixed array,
    /// a map, or a box holding any of these. Fails fast; fields changed before
    /// the failure stay changed.
    pub fn apply(&self, value: &mut Value) -> Result<()> {
        let outcome = self.visit(value, false, 0);
        if let Err(err) = &outcome {
            tracing::debug!(shape = %value.shape(), "apply failed: {}", err);
        }
        outcome
    }

    /// Apply to a typed value as if through a pointer to it.
    ///
    /// The converted value is written back even when the call fails, so
    /// partial changes are kept as they are for [`Applicator::apply`].
    pub fn apply_to<T: Reflect>(&self, target: &mut T) -> Result<()> {
        let storage = Rc::new(RefCell::new(target.to_value()));
        let mut root = Value::pointer_at(T::static_type(), Rc::clone(&storage));
        let outcome = self.apply(&mut root);
        drop(root);

        let value = Rc::try_unwrap(storage)
            .map_or_else(|shared| shared.borrow().clone(), RefCell::into_inner);
        *target = T::from_value(value)?;
        outcome
    }

    fn visit(&self, slot: &mut Value, addressable: bool, depth: usize) -> Result<()> {
        if let Some(limit) = self.config.max_depth
            && depth > limit
        {
            return Err(Error::DepthExceeded { limit });
        }

        match slot {
            Value::Pointer { target: None, .. } => {
                Err(Error::cannot_apply(Shape::Pointer, "pointer is nil"))
            }
            Value::Pointer {
                target: Some(target),
                ..
            } => {
                let target = Rc::clone(target);
                // A target that is already borrowed is on the current path: a cycle
                let mut pointee = target.try_borrow_mut().map_err(|_| {
                    Error::cannot_apply(Shape::Pointer, "pointer target is already being visited")
                })?;
                self.visit(&mut pointee, true, depth + 1)
            }
            Value::Boxed(None) => Err(Error::cannot_apply(Shape::Boxed, "box is empty")),
            Value::Boxed(Some(inner)) => {
                if !addressable {
                    return self.visit(inner, false, depth + 1);
                }
                let mut concrete = (**inner).clone();
                self.visit(&mut concrete, true, depth + 1)?;
                **inner = concrete;
                Ok(())
            }
            Value::Struct(value) => {
                if !addressable {
                    return Err(Error::cannot_apply(
                        Shape::Struct,
                        "struct is not reachable through a pointer",
                    ));
                }
                self.visit_struct(value, depth)
            }
            Value::Seq { elem, items } => self.visit_sequence(elem, items.as_mut(), depth),
            Value::Array { elem, items } => self.visit_array(elem, items, addressable, depth),
            Value::Map { elem, entries, .. } => self.visit_map(elem, entries.as_mut(), depth),
            scalar => Err(Error::cannot_apply(
                scalar.shape(),
                "value has no fields to apply to",
            )),
        }
    }

    /// Visit a member of a composite, skipping it when it cannot be entered
    fn visit_member(&self, slot: &mut Value, addressable: bool, depth: usize) -> Result<()> {
        match self.visit(slot, addressable, depth + 1) {
            Err(Error::CannotApply { shape, reason }) => {
                tracing::trace!(%shape, reason, "skipping member");
                Ok(())
            }
            outcome => outcome,
        }
    }

    fn visit_struct(&self, value: &mut StructValue, depth: usize) -> Result<()> {
        let ty = value.struct_type().clone();
        let fields = ty.fields();

        for (field, slot) in fields.iter().zip(value.values_mut()) {
            let annotation = Annotation::parse(field.tag(&self.config.tag_name));
            if annotation.is_skip() {
                tracing::trace!(field = field.name(), "skipping opted-out field");
                continue;
            }

            if field.ty().is_composite() {
                self.visit_member(slot, true, depth)?;
            }

            let directives = annotation.directives();
            if directives.is_empty() {
                continue;
            }

            let mut current = slot.clone();
            for directive in directives {
                let transform = self.registry.resolve(&directive.name)?;
                tracing::trace!(
                    field = field.name(),
                    transform = %directive.name,
                    argument = %directive.argument,
                    "applying transform"
                );
                current = transform(current, &directive.argument)?;
            }

            let found = current.type_of();
            if &found != field.ty() {
                return Err(Error::InvalidSet {
                    field: field.name().to_string(),
                    expected: field.ty().clone(),
                    found,
                });
            }
            *slot = current;
        }
        Ok(())
    }

    fn visit_sequence(
        &self,
        elem: &Type,
        items: Option<&mut Vec<Value>>,
        depth: usize,
    ) -> Result<()> {
        if !elem.is_composite() {
            return Err(Error::cannot_apply(
                Shape::Sequence,
                "element type has no fields to apply to",
            ));
        }
        for item in items.into_iter().flatten() {
            self.visit_member(item, true, depth)?;
        }
        Ok(())
    }

    fn visit_array(
        &self,
        elem: &Type,
        items: &mut [Value],
        addressable: bool,
        depth: usize,
    ) -> Result<()> {
        if !elem.is_composite() {
            return Err(Error::cannot_apply(
                Shape::FixedArray,
                "element type has no fields to apply to",
            ));
        }
        if matches!(elem.shape(), Shape::Struct | Shape::FixedArray) && !addressable {
            return Err(Error::cannot_apply(
                Shape::FixedArray,
                "array elements are not reachable through a pointer",
            ));
        }
        for item in items {
            self.visit_member(item, addressable, depth)?;
        }
        Ok(())
    }

    fn visit_map(
        &self,
        elem: &Type,
        entries: Option<&mut HashMap<MapKey, Value>>,
        depth: usize,
    ) -> Result<()> {
        if !elem.is_composite() {
            return Err(Error::cannot_apply(
                Shape::Map,
                "element type has no fields to apply to",
            ));
        }
        if elem.requires_address() {
            return Err(Error::cannot_apply(
                Shape::Map,
                "map elements can never be mutated in place",
            ));
        }
        // Unlike sequences, an entry that cannot be entered fails the whole map
        for item in entries.into_iter().flat_map(HashMap::values_mut) {
            self.visit(item, false, depth + 1)?;
        }
        Ok(())
    }
}

static DEFAULT_APPLICATOR: Lazy<RwLock<Applicator>> = Lazy::new(|| RwLock::new(Applicator::new()));

/// [`Applicator::apply`] on the shared default applicator.
///
/// The default is guarded by a lock: a transform that calls back into the
/// default applicator while a registration is waiting will deadlock.
pub fn apply(value: &mut Value) -> Result<()> {
    DEFAULT_APPLICATOR.read().apply(value)
}

/// [`Applicator::apply_to`] on the shared default applicator
pub fn apply_to<T: Reflect>(target: &mut T) -> Result<()> {
    DEFAULT_APPLICATOR.read().apply_to(target)
}

/// [`Applicator::register_function`] on the shared default applicator
pub fn register_function<F>(name: impl Into<String>, func: F)
where
    F: Fn(Value, &str) -> Result<Value> + Send + Sync + 'static,
{
    DEFAULT_APPLICATOR.write().register_function(name, func);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Field, StructType};

    fn item_type() -> StructType {
        StructType::new(
            "Item",
            [Field::new("name", Type::String).with_tag("apply", "trim,lower")],
        )
    }

    fn item(name: &str) -> Value {
        Value::Struct(StructValue::new(item_type(), vec![Value::string(name)]).unwrap())
    }

    fn name_of(value: &Value) -> String {
        value.field("name").and_then(Value::as_str).unwrap().to_string()
    }

    #[test]
    fn test_pointer_to_struct() {
        let mut root = Value::pointer_to(item(" ABC "));
        Applicator::new().apply(&mut root).unwrap();
        assert_eq!(name_of(&root.pointee().unwrap()), "abc");
    }

    #[test]
    fn test_struct_by_value_is_rejected_untouched() {
        let mut root = item(" ABC ");
        let err = Applicator::new().apply(&mut root).unwrap_err();
        assert!(err.is_cannot_apply());
        assert_eq!(name_of(&root), " ABC ");
    }

    #[test]
    fn test_nil_and_empty_top_level() {
        let applicator = Applicator::new();
        let mut nil = Value::nil_pointer(Type::Struct(item_type()));
        assert!(applicator.apply(&mut nil).unwrap_err().is_cannot_apply());

        let mut empty = Value::empty_box();
        assert!(applicator.apply(&mut empty).unwrap_err().is_cannot_apply());

        let mut boxed_empty = Value::pointer_to(Value::empty_box());
        assert!(applicator.apply(&mut boxed_empty).unwrap_err().is_cannot_apply());
    }

    #[test]
    fn test_scalars_are_rejected() {
        let applicator = Applicator::new();
        for mut value in [
            Value::string(" abc"),
            Value::pointer_to(Value::string(" abc")),
            Value::boxed(Value::pointer_to(Value::string(" abc"))),
            Value::pointer_to(Value::boxed(Value::string(" abc"))),
        ] {
            assert!(applicator.apply(&mut value).unwrap_err().is_cannot_apply());
        }
    }

    #[test]
    fn test_sequence_of_scalars_is_rejected() {
        let mut seq = Value::seq(Type::String, [Value::string(" a ")]);
        assert!(Applicator::new().apply(&mut seq).unwrap_err().is_cannot_apply());
    }

    #[test]
    fn test_sequence_elements_are_writable() {
        let mut seq = Value::seq(Type::Struct(item_type()), [item(" abc "), item("ABC")]);
        Applicator::new().apply(&mut seq).unwrap();
        let names: Vec<_> = seq.items().unwrap().iter().map(name_of).collect();
        assert_eq!(names, ["abc", "abc"]);
    }

    #[test]
    fn test_nil_sequence_is_a_no_op() {
        let mut seq = Value::nil_seq(Type::Struct(item_type()));
        Applicator::new().apply(&mut seq).unwrap();
        assert!(seq.is_nil());
    }

    #[test]
    fn test_cycle_terminates() {
        fn node_type() -> StructType {
            StructType::lazy("Node", || {
                vec![
                    Field::new("label", Type::String).with_tag("apply", "trim"),
                    Field::new("next", Type::pointer(Type::Struct(node_type()))),
                ]
            })
        }
        let node = node_type();

        let value = StructValue::new(
            node.clone(),
            vec![Value::string(" a "), Value::nil_pointer(Type::Struct(node))],
        )
        .unwrap();
        let storage = Rc::new(RefCell::new(Value::Struct(value)));
        let mut root = Value::pointer_at(Type::Struct(node_type()), Rc::clone(&storage));
        // Close the loop: node.next points back at node
        *storage
            .borrow_mut()
            .as_struct_mut()
            .unwrap()
            .field_mut("next")
            .unwrap() = root.clone();

        Applicator::new().apply(&mut root).unwrap();
        assert_eq!(storage.borrow().field("label"), Some(&Value::string("a")));

        // Break the cycle so the storage is released
        *storage.borrow_mut().as_struct_mut().unwrap().field_mut("next").unwrap() =
            Value::nil_pointer(Type::Struct(node_type()));
    }

    #[test]
    fn test_string_transform_on_pointer_to_enclosing_struct() {
        fn node_type() -> StructType {
            StructType::lazy("SelfRef", || {
                vec![
                    Field::new("label", Type::String).with_tag("apply", "trim"),
                    Field::new("me", Type::pointer(Type::Struct(node_type())))
                        .with_tag("apply", "trim"),
                ]
            })
        }

        let value = StructValue::new(
            node_type(),
            vec![Value::string(" a "), Value::nil_pointer(Type::Struct(node_type()))],
        )
        .unwrap();
        let storage = Rc::new(RefCell::new(Value::Struct(value)));
        let mut root = Value::pointer_at(Type::Struct(node_type()), Rc::clone(&storage));
        *storage.borrow_mut().as_struct_mut().unwrap().field_mut("me").unwrap() = root.clone();

        let err = Applicator::new().apply(&mut root).unwrap_err();
        assert!(
            matches!(&err, Error::Unsupported { transform, found: Type::Struct(_) } if transform == "trim"),
            "{err}"
        );
        assert_eq!(storage.borrow().field("label"), Some(&Value::string("a")));

        *storage.borrow_mut().as_struct_mut().unwrap().field_mut("me").unwrap() =
            Value::nil_pointer(Type::Struct(node_type()));
    }

    #[test]
    fn test_depth_limit() {
        let config = ApplicatorConfig::default().with_max_depth(2);
        let applicator = Applicator::with_config(config);
        let mut deep = Value::pointer_to(Value::pointer_to(Value::pointer_to(item(" a "))));
        let err = applicator.apply(&mut deep).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { limit: 2 }));
    }

    #[test]
    fn test_custom_tag_name() {
        let ty = StructType::new(
            "Tagged",
            [
                Field::new("a", Type::String).with_tag("mold", "trim"),
                Field::new("b", Type::String).with_tag("apply", "trim"),
            ],
        );
        let value = StructValue::new(ty, vec![Value::string(" a "), Value::string(" b ")]).unwrap();
        let mut root = Value::pointer_to(Value::Struct(value));

        let applicator = Applicator::with_config(ApplicatorConfig::default().with_tag_name("mold"));
        applicator.apply(&mut root).unwrap();

        let pointee = root.pointee().unwrap();
        assert_eq!(pointee.field("a"), Some(&Value::string("a")));
        assert_eq!(pointee.field("b"), Some(&Value::string(" b ")));
    }
}
