//! Derive input to IR parser
//!
//! Reads the struct's fields and their annotation attributes:
//!
//! - `#[apply("trim,lower")]` or `#[apply = "trim,lower"]` stores the
//!   annotation under the `apply` tag key.
//! - `#[tag(mold = "trim", audit = "-")]` stores annotations under arbitrary
//!   tag keys, for applicators configured with another `tag_name`.

use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Expr, ExprLit, Fields, Index, Lit, LitStr, Member, Meta};

use crate::ir::{FieldIR, FieldStyle, StructIR};

/// Tag key written by `#[apply(...)]`
pub const APPLY_TAG: &str = "apply";

/// Parse a derive input into IR
pub fn parse(input: &DeriveInput) -> syn::Result<StructIR> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic structs",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Reflect can only be derived for structs",
        ));
    };

    let style = match &data.fields {
        Fields::Named(_) => FieldStyle::Named,
        Fields::Unnamed(_) => FieldStyle::Tuple,
        Fields::Unit => FieldStyle::Unit,
    };

    let fields = data
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| parse_field(index, field))
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(StructIR {
        ident: input.ident.clone(),
        style,
        fields,
    })
}

fn parse_field(index: usize, field: &syn::Field) -> syn::Result<FieldIR> {
    let (member, name) = match &field.ident {
        Some(ident) => (Member::Named(ident.clone()), ident.unraw().to_string()),
        None => (Member::Unnamed(Index::from(index)), index.to_string()),
    };

    let mut ir = FieldIR {
        member,
        name,
        ty: field.ty.clone(),
        tags: Vec::new(),
    };

    for attr in &field.attrs {
        if attr.path().is_ident("apply") {
            let annotation = parse_apply(attr)?;
            ir.set_tag(APPLY_TAG.to_string(), annotation.value(), annotation.span());
        } else if attr.path().is_ident("tag") {
            parse_tags(attr, &mut ir)?;
        }
    }

    Ok(ir)
}

fn parse_apply(attr: &Attribute) -> syn::Result<LitStr> {
    match &attr.meta {
        Meta::List(_) => attr.parse_args::<LitStr>(),
        Meta::NameValue(name_value) => match &name_value.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(lit), ..
            }) => Ok(lit.clone()),
            other => Err(syn::Error::new_spanned(
                other,
                "expected a string literal annotation",
            )),
        },
        Meta::Path(path) => Err(syn::Error::new_spanned(
            path,
            r#"expected #[apply("...")] or #[apply = "..."]"#,
        )),
    }
}

fn parse_tags(attr: &Attribute, ir: &mut FieldIR) -> syn::Result<()> {
    attr.parse_nested_meta(|meta| {
        let key = meta
            .path
            .get_ident()
            .ok_or_else(|| meta.error("expected a tag key"))?
            .unraw()
            .to_string();
        let annotation: LitStr = meta.value()?.parse()?;
        ir.set_tag(key, annotation.value(), annotation.span());
        Ok(())
    })
}
