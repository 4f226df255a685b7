use crate::macros::attrs::{
    expect_name_value, helper_metas, is_unit, parse_args, set_once, single_generic, string_literal,
    strip_helpers,
};
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    Expr, FnArg, Ident, ItemTrait, Lit, LitStr, Meta, Pat, PatIdent, ReturnType, Signature,
    TraitItem, TraitItemFn, Type,
};

struct InterfaceArgs {
    name: LitStr,
    comment: Option<LitStr>,
}

#[derive(Default)]
struct AccessorAttrs {
    default: Option<Expr>,
    comment: Option<LitStr>,
    path: Option<LitStr>,
    post: Option<Expr>,
}

/// Declared shape of a parameter or return value.
enum Shape<'a> {
    Unit,
    Required(&'a Type),
    Optional(&'a Type),
}

impl<'a> Shape<'a> {
    fn of(ty: &'a Type) -> Self {
        if is_unit(ty) {
            Self::Unit
        } else if let Some(inner) = single_generic(ty, "Option") {
            Self::Optional(inner)
        } else {
            Self::Required(ty)
        }
    }

    const fn value_type(&self) -> Option<&'a Type> {
        match self {
            Self::Unit => None,
            Self::Required(ty) | Self::Optional(ty) => Some(ty),
        }
    }

    fn spec(&self) -> TokenStream {
        match self {
            Self::Unit => quote! { ::bindery::Shape::unit() },
            Self::Required(ty) => quote! { ::bindery::Shape::required::<#ty>() },
            Self::Optional(ty) => quote! { ::bindery::Shape::optional::<#ty>() },
        }
    }
}

pub fn expand(args: TokenStream, mut item: ItemTrait) -> TokenStream {
    let args = match parse_interface_args(args) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error(),
    };
    if !item.generics.params.is_empty() {
        return syn::Error::new_spanned(&item.generics, "configuration interfaces cannot be generic")
            .to_compile_error();
    }

    let mut impls = Vec::new();
    let mut specs = Vec::new();
    for trait_item in &mut item.items {
        let TraitItem::Fn(method) = trait_item else {
            return syn::Error::new_spanned(
                trait_item,
                "configuration interfaces may only declare accessor methods",
            )
            .to_compile_error();
        };
        match expand_accessor(method) {
            Ok((body, spec)) => {
                impls.push(body);
                specs.push(spec);
            },
            Err(err) => return err.to_compile_error(),
        }
        strip_helpers(&mut method.attrs);
    }

    let vis = &item.vis;
    let trait_ident = &item.ident;
    let bound = format_ident!("Bound{}", trait_ident);
    let name = &args.name;
    let comment = args.comment.as_ref().map_or_else(|| quote! { None }, |c| quote! { Some(#c) });
    let describe_comment = args.comment.as_ref().map(|c| quote! { .comment(#c) });
    let doc = format!("Accessor bound to the `{}` configuration file.", name.value());

    quote! {
        #item

        #[doc = #doc]
        #[derive(Debug, Clone)]
        #vis struct #bound {
            handle: ::bindery::ConfigHandle,
        }

        #[automatically_derived]
        impl #trait_ident for #bound {
            #(#impls)*
        }

        #[automatically_derived]
        impl ::bindery::ConfigInterface for #bound {
            const NAME: &'static str = #name;
            const COMMENT: Option<&'static str> = #comment;

            fn describe() -> ::bindery::InterfaceDescription {
                ::bindery::InterfaceDescription::new(#name)
                    #describe_comment
                    #(.accessor(#specs))*
            }

            fn from_handle(handle: ::bindery::ConfigHandle) -> Self {
                Self { handle }
            }

            fn handle(&self) -> &::bindery::ConfigHandle {
                &self.handle
            }
        }
    }
}

fn parse_interface_args(args: TokenStream) -> syn::Result<InterfaceArgs> {
    let mut name = None;
    let mut comment = None;
    for meta in parse_args(args)? {
        let name_value = expect_name_value(meta)?;
        if name_value.path.is_ident("name") {
            let value = string_literal(&name_value, "name")?;
            set_once(&mut name, &name_value, value)?;
        } else if name_value.path.is_ident("comment") {
            let value = string_literal(&name_value, "comment")?;
            set_once(&mut comment, &name_value, value)?;
        } else {
            return Err(syn::Error::new_spanned(
                name_value.path,
                "Unsupported argument; expected name or comment",
            ));
        }
    }
    let name = name.ok_or_else(|| {
        syn::Error::new(Span::call_site(), "missing `name = \"...\"` with the file name")
    })?;
    Ok(InterfaceArgs { name, comment })
}

fn parse_accessor_attrs(method: &TraitItemFn) -> syn::Result<AccessorAttrs> {
    let mut attrs = AccessorAttrs::default();
    for meta in helper_metas(&method.attrs)? {
        let Meta::NameValue(name_value) = meta else {
            return Err(syn::Error::new_spanned(meta, "Expected `key = value` arguments"));
        };
        if name_value.path.is_ident("default") {
            set_once(&mut attrs.default, &name_value, name_value.value.clone())?;
        } else if name_value.path.is_ident("comment") {
            let value = string_literal(&name_value, "comment")?;
            set_once(&mut attrs.comment, &name_value, value)?;
        } else if name_value.path.is_ident("path") {
            let value = string_literal(&name_value, "path")?;
            set_once(&mut attrs.path, &name_value, value)?;
        } else if name_value.path.is_ident("post") {
            set_once(&mut attrs.post, &name_value, name_value.value.clone())?;
        } else {
            return Err(syn::Error::new_spanned(
                name_value.path,
                "Unsupported argument; expected default, comment, path or post",
            ));
        }
    }
    Ok(attrs)
}

/// Builds the trait impl body and the `AccessorSpec` expression for one method.
fn expand_accessor(method: &TraitItemFn) -> syn::Result<(TokenStream, TokenStream)> {
    if let Some(body) = &method.default {
        return Err(syn::Error::new_spanned(
            body,
            "accessors cannot have bodies; declare defaults with #[config(default = ...)]",
        ));
    }
    if !method.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&method.sig.generics, "accessors cannot be generic"));
    }
    match method.sig.inputs.first() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {},
        _ => {
            return Err(syn::Error::new_spanned(&method.sig, "accessors must take `&self`"));
        },
    }
    let ReturnType::Type(_, output) = &method.sig.output else {
        return Err(syn::Error::new_spanned(&method.sig, "accessors must return bindery::Result"));
    };
    let Some(returned) = single_generic(output, "Result") else {
        return Err(syn::Error::new_spanned(output, "accessors must return bindery::Result"));
    };

    let attrs = parse_accessor_attrs(method)?;
    let params: Vec<&Type> = method
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(typed) => Some(&*typed.ty),
            FnArg::Receiver(_) => None,
        })
        .collect();
    let returns = Shape::of(returned);

    let method_name = method.sig.ident.to_string();
    let sig = renamed_signature(&method.sig);
    let args: Vec<Ident> = (0..params.len()).map(|i| format_ident!("__arg{}", i)).collect();
    let body = accessor_body(&method_name, &params, &returns, &args);
    let spec = accessor_spec(&method_name, &params, &returns, &attrs)?;

    Ok((quote! { #sig { #body } }, spec))
}

fn renamed_signature(sig: &Signature) -> Signature {
    let mut sig = sig.clone();
    let mut index = 0usize;
    for input in &mut sig.inputs {
        if let FnArg::Typed(typed) = input {
            typed.pat = Box::new(Pat::Ident(PatIdent {
                attrs: Vec::new(),
                by_ref: None,
                mutability: None,
                ident: format_ident!("__arg{}", index),
                subpat: None,
            }));
            index += 1;
        }
    }
    sig
}

fn accessor_body(method: &str, params: &[&Type], returns: &Shape<'_>, args: &[Ident]) -> TokenStream {
    if let Some(field) = method.strip_prefix("set_") {
        if let ([param], Shape::Unit) = (params, returns) {
            let arg = &args[0];
            return match Shape::of(param) {
                Shape::Optional(inner) => {
                    quote! { self.handle.set_optional::<#inner>(#field, #arg) }
                },
                _ => quote! { self.handle.set::<#param>(#field, #arg) },
            };
        }
    } else if params.is_empty() {
        let field = method.strip_prefix("get_").unwrap_or(method);
        match returns {
            Shape::Required(ty) => return quote! { self.handle.get::<#ty>(#field) },
            Shape::Optional(ty) => return quote! { self.handle.get_optional::<#ty>(#field) },
            Shape::Unit => {},
        }
    }

    let message = format!("accessor `{method}` is neither a getter nor a setter");
    quote! {
        let _ = (#(#args,)*);
        Err(::bindery::BindError::InvalidSchema {
            message: ::std::borrow::Cow::Borrowed(#message),
            context: None,
        })
    }
}

fn accessor_spec(
    method: &str,
    params: &[&Type],
    returns: &Shape<'_>,
    attrs: &AccessorAttrs,
) -> syn::Result<TokenStream> {
    let param_specs = params.iter().map(|ty| Shape::of(ty).spec());
    let returns_spec = match returns {
        Shape::Unit => None,
        shape => {
            let spec = shape.spec();
            Some(quote! { .returns(#spec) })
        },
    };

    // Getter-side value type, falling back to the single setter parameter.
    let value_type = returns
        .value_type()
        .or_else(|| params.first().and_then(|ty| Shape::of(ty).value_type()));

    let default = match (&attrs.default, value_type) {
        (None, _) => None,
        (Some(expr), Some(ty)) => {
            let typed = typed_default(expr, ty);
            Some(quote! { .default_value(|| ::bindery::Bindable::into_value(#typed)) })
        },
        (Some(expr), None) => {
            return Err(syn::Error::new_spanned(expr, "default requires a typed accessor"));
        },
    };
    let post = match (&attrs.post, value_type) {
        (None, _) => None,
        (Some(expr), Some(ty)) => {
            Some(quote! { .post_process(::bindery::PostProcess::typed::<#ty>(#expr)) })
        },
        (Some(expr), None) => {
            return Err(syn::Error::new_spanned(expr, "post requires a typed accessor"));
        },
    };
    let comment = attrs.comment.as_ref().map(|c| quote! { .comment(#c) });
    let path = attrs.path.as_ref().map(|p| quote! { .path(#p) });

    Ok(quote! {
        ::bindery::AccessorSpec::new(#method)
            #(.param(#param_specs))*
            #returns_spec
            #default
            #post
            #comment
            #path
    })
}

/// String literals go through `Into`, everything else is bound to the declared type.
fn typed_default(expr: &Expr, ty: &Type) -> TokenStream {
    if let Expr::Lit(lit) = expr
        && let Lit::Str(text) = &lit.lit
    {
        return quote! { ::core::convert::Into::<#ty>::into(#text) };
    }
    quote! {{ let value: #ty = #expr; value }}
}
