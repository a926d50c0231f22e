//! # Applicator Derive
//!
//! `#[derive(Reflect)]` for structs, generating the descriptor table and
//! value conversions that `applicator-core` walks.
//!
//! Field annotations:
//! - `#[apply("trim,lower")]` or `#[apply = "trim,lower"]` records the
//!   annotation under the default `apply` tag key.
//! - `#[tag(mold = "trim")]` records it under any other key, for
//!   applicators configured with a different `tag_name`.
//!
//! Enums, unions and generic structs are rejected at compile time.
//!
//! Consumers use the re-export from `applicator-core` (the `derive` feature):
//! ```rust,ignore
//! use applicator_core::Reflect;
//!
//! #[derive(Reflect)]
//! struct Signup {
//!     #[apply("trim,lower")]
//!     email: String,
//!     #[apply("-")]
//!     password: String,
//! }
//! ```

mod generator;
mod ir;
mod parser;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

use crate::generator::ReflectCodegen;

/// Derive `applicator_core::Reflect` for a struct.
///
/// The generated descriptor is named after the struct's module path, so two
/// structs with the same identifier in different modules are distinct types.
/// Field types may refer to `Self` (e.g. `Option<Box<Self>>`).
#[proc_macro_derive(Reflect, attributes(apply, tag))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match parser::parse(&input) {
        Ok(ir) => ReflectCodegen::generate(&ir).into(),
        Err(err) => err.to_compile_error().into(),
    }
}
