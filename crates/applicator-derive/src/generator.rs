//! `Reflect` impl codegen

use proc_macro2::TokenStream;
use quote::quote;
use syn::LitStr;

use crate::ir::{FieldIR, FieldStyle, StructIR};

/// Helper for generating `Reflect` impls
pub struct ReflectCodegen;

impl ReflectCodegen {
    /// Generate the full `impl Reflect` block
    pub fn generate(ir: &StructIR) -> TokenStream {
        let ident = &ir.ident;
        let static_type = Self::generate_static_type(ir);
        let to_value = Self::generate_to_value(ir);
        let from_value = Self::generate_from_value(ir);

        quote! {
            #[automatically_derived]
            impl ::applicator_core::Reflect for #ident {
                fn static_type() -> ::applicator_core::Type {
                    #static_type
                }

                fn to_value(&self) -> ::applicator_core::Value {
                    #to_value
                }

                fn from_value(
                    value: ::applicator_core::Value,
                ) -> ::applicator_core::Result<Self> {
                    #from_value
                }
            }
        }
    }

    /// Descriptor with a lazily built field table, so recursive types resolve
    fn generate_static_type(ir: &StructIR) -> TokenStream {
        let ident = &ir.ident;
        let fields = ir.fields.iter().map(Self::generate_field_descriptor);

        quote! {
            ::applicator_core::Type::Struct(::applicator_core::StructType::lazy(
                concat!(module_path!(), "::", stringify!(#ident)),
                || vec![#(#fields),*],
            ))
        }
    }

    /// Generate one `Field` entry with its tags
    pub fn generate_field_descriptor(field: &FieldIR) -> TokenStream {
        let name = &field.name;
        let ty = &field.ty;
        let tags = field.tags.iter().map(|tag| {
            let key = &tag.key;
            let annotation = LitStr::new(&tag.annotation, tag.span);
            quote! { .with_tag(#key, #annotation) }
        });

        quote! {
            ::applicator_core::Field::new(
                #name,
                <#ty as ::applicator_core::Reflect>::static_type(),
            )
            #(#tags)*
        }
    }

    fn generate_to_value(ir: &StructIR) -> TokenStream {
        let values = ir.fields.iter().map(|field| {
            let member = &field.member;
            quote! { ::applicator_core::Reflect::to_value(&self.#member) }
        });

        quote! {
            ::applicator_core::reflect::__private::struct_value::<Self>(vec![#(#values),*])
        }
    }

    fn generate_from_value(ir: &StructIR) -> TokenStream {
        let unpack = quote! {
            ::applicator_core::reflect::__private::struct_fields::<Self>(value)?
        };

        let next = |field: &FieldIR| {
            let name = &field.name;
            quote! {
                ::applicator_core::reflect::__private::next_field(&mut __fields, #name)?
            }
        };

        match ir.style {
            FieldStyle::Unit => quote! {
                #unpack;
                Ok(Self)
            },
            FieldStyle::Tuple => {
                let values = ir.fields.iter().map(next);
                quote! {
                    let mut __fields = #unpack;
                    Ok(Self(#(#values),*))
                }
            }
            FieldStyle::Named => {
                let values = ir.fields.iter().map(|field| {
                    let member = &field.member;
                    let value = next(field);
                    quote! { #member: #value }
                });
                quote! {
                    let mut __fields = #unpack;
                    Ok(Self { #(#values),* })
                }
            }
        }
    }
}
