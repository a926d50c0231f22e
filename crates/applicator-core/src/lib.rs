//! Applicator Core Library
//!
//! This crate applies named transforms to the fields of arbitrarily nested
//! values, driven by per-field annotations:
//! - Dynamic value model with struct descriptor tables
//! - Annotation parsing (`"trim,lower"`, `"name=argument"`, `"-"`)
//! - Transform registry with the built-in `trim`, `lower` and `fillDefault`
//! - Traversal engine that respects which locations are writable
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Annotation  │────▶│  Traversal  │────▶│  Registry   │
//! │  (Parser)   │     │   Engine    │     │ (Transforms)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use applicator_core::Reflect;
//!
//! #[derive(Reflect)]
//! struct Signup {
//!     #[apply("trim,lower")]
//!     email: String,
//!     #[apply("trim")]
//!     display_name: Option<String>,
//! }
//!
//! let mut signup = Signup {
//!     email: "  Ada@Example.COM ".to_string(),
//!     display_name: Some(" Ada ".to_string()),
//! };
//! applicator_core::apply_to(&mut signup)?;
//! assert_eq!(signup.email, "ada@example.com");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod annotation;
pub mod config;
pub mod engine;
pub mod error;
pub mod reflect;
pub mod registry;
pub mod transforms;
pub mod value;

pub use annotation::{Annotation, Directive};
pub use config::ApplicatorConfig;
pub use engine::{Applicator, apply, apply_to, register_function};
pub use error::{Error, Result};
pub use reflect::{Dynamic, Reflect, ReflectKey};
pub use registry::{Registry, TransformFn};
pub use value::{Field, MapKey, Shape, StructType, StructValue, Type, Value};

#[cfg(feature = "derive")]
pub use applicator_derive::Reflect;
