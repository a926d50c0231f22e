//! Intermediate representation of a struct's descriptor table
//!
//! The parser fills this in from the `syn` AST; the generator turns it into
//! the `Reflect` impl.

use proc_macro2::Span;
use syn::{Ident, Member};

/// How the struct declares its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStyle {
    /// `struct S { a: T }`
    Named,
    /// `struct S(T);`
    Tuple,
    /// `struct S;`
    Unit,
}

/// A struct deriving `Reflect`
#[derive(Clone)]
pub struct StructIR {
    /// Struct name
    pub ident: Ident,
    /// Field declaration style
    pub style: FieldStyle,
    /// Fields in declaration order
    pub fields: Vec<FieldIR>,
}

/// One field of the descriptor table
#[derive(Clone)]
pub struct FieldIR {
    /// Accessor (`self.name` or `self.0`)
    pub member: Member,
    /// Name recorded in the descriptor
    pub name: String,
    /// Declared type
    pub ty: syn::Type,
    /// Annotations by tag key, in first-seen key order
    pub tags: Vec<Tag>,
}

/// A raw annotation stored under a tag key
#[derive(Debug, Clone)]
pub struct Tag {
    /// Tag key, e.g. `apply`
    pub key: String,
    /// Raw annotation, e.g. `trim,lower`
    pub annotation: String,
    /// Where the annotation was written
    pub span: Span,
}

impl FieldIR {
    /// Record `annotation` under `key`; a later annotation for the same key wins
    pub fn set_tag(&mut self, key: String, annotation: String, span: Span) {
        match self.tags.iter_mut().find(|tag| tag.key == key) {
            Some(tag) => {
                tag.annotation = annotation;
                tag.span = span;
            }
            None => self.tags.push(Tag {
                key,
                annotation,
                span,
            }),
        }
    }

    /// Annotation stored under `key`
    #[cfg(test)]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.key == key)
            .map(|tag| tag.annotation.as_str())
    }
}
