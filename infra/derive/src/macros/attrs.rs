use proc_macro2::TokenStream;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Attribute, Expr, Lit, LitStr, Meta, MetaNameValue, Token, Type};

/// Helper attribute shared by every configuration macro.
pub const HELPER: &str = "config";

pub fn parse_args(args: TokenStream) -> syn::Result<Punctuated<Meta, Token![,]>> {
    Punctuated::<Meta, Token![,]>::parse_terminated.parse2(args)
}

/// Flattens every `#[config(...)]` attribute into its individual metas.
pub fn helper_metas(attrs: &[Attribute]) -> syn::Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident(HELPER)) {
        let nested = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        metas.extend(nested);
    }
    Ok(metas)
}

pub fn strip_helpers(attrs: &mut Vec<Attribute>) {
    attrs.retain(|attr| !attr.path().is_ident(HELPER));
}

pub fn expect_name_value(meta: Meta) -> syn::Result<MetaNameValue> {
    match meta {
        Meta::NameValue(name_value) => Ok(name_value),
        other => Err(syn::Error::new_spanned(
            other,
            "Expected name-value arguments like `name = \"...\"`",
        )),
    }
}

pub fn string_literal(name_value: &MetaNameValue, label: &str) -> syn::Result<LitStr> {
    match &name_value.value {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(lit) => Ok(lit.clone()),
            _ => Err(syn::Error::new_spanned(
                &name_value.value,
                format!("{label} must be a string literal"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &name_value.value,
            format!("{label} must be a string literal"),
        )),
    }
}

pub fn set_once<T>(slot: &mut Option<T>, spanned: &impl quote::ToTokens, value: T) -> syn::Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new_spanned(spanned, "Duplicate argument"));
    }
    *slot = Some(value);
    Ok(())
}

/// Returns `T` when `ty` is `<wrapper><T>` (matched on the last path segment).
pub fn single_generic<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

pub fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}
