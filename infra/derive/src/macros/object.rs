use crate::macros::attrs::{expect_name_value, helper_metas, set_once, single_generic, string_literal};
use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Meta};

#[derive(Default)]
struct ItemAttrs {
    type_name: Option<LitStr>,
}

#[derive(Default)]
struct MemberAttrs {
    skip: bool,
    rename: Option<LitStr>,
}

fn item_attrs(attrs: &[Attribute]) -> syn::Result<ItemAttrs> {
    let mut parsed = ItemAttrs::default();
    for meta in helper_metas(attrs)? {
        let name_value = expect_name_value(meta)?;
        if !name_value.path.is_ident("type_name") {
            return Err(syn::Error::new_spanned(
                name_value.path,
                "Unsupported argument; expected type_name",
            ));
        }
        let value = string_literal(&name_value, "type_name")?;
        set_once(&mut parsed.type_name, &name_value, value)?;
    }
    Ok(parsed)
}

fn member_attrs(attrs: &[Attribute]) -> syn::Result<MemberAttrs> {
    let mut parsed = MemberAttrs::default();
    for meta in helper_metas(attrs)? {
        match meta {
            Meta::Path(path) if path.is_ident("skip") => parsed.skip = true,
            Meta::NameValue(name_value) if name_value.path.is_ident("rename") => {
                let value = string_literal(&name_value, "rename")?;
                set_once(&mut parsed.rename, &name_value, value)?;
            },
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Unsupported argument; expected skip or rename = \"...\"",
                ));
            },
        }
    }
    Ok(parsed)
}

fn type_name(input: &DeriveInput, attrs: &ItemAttrs) -> LitStr {
    attrs.type_name.clone().unwrap_or_else(|| LitStr::new(&input.ident.to_string(), input.ident.span()))
}

pub fn expand_object(input: DeriveInput) -> TokenStream {
    match object_impl(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

pub fn expand_enum(input: DeriveInput) -> TokenStream {
    match enum_impl(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn object_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&input.generics, "ConfigObject cannot be generic"));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input.ident, "ConfigObject only supports structs"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "ConfigObject only supports structs with named fields",
        ));
    };

    let ident = &input.ident;
    let type_name = type_name(input, &item_attrs(&input.attrs)?);

    let mut infos = Vec::new();
    let mut writes = Vec::new();
    let mut reads = Vec::new();
    let mut keys = FxHashSet::default();

    for field in &fields.named {
        let Some(member) = &field.ident else { continue };
        let attrs = member_attrs(&field.attrs)?;
        if attrs.skip {
            reads.push(quote! { #member: ::core::default::Default::default() });
            continue;
        }

        let key = attrs.rename.map_or_else(|| member.to_string(), |lit| lit.value());
        if !keys.insert(key.clone()) {
            return Err(syn::Error::new_spanned(member, format!("duplicate field key `{key}`")));
        }

        if let Some(inner) = single_generic(&field.ty, "Option") {
            infos.push(quote! { ::bindery::FieldInfo::optional::<#inner>(#key) });
            writes.push(quote! { object.optional_field(#key, self.#member); });
            reads.push(quote! { #member: object.optional(#key)? });
        } else {
            let ty = &field.ty;
            infos.push(quote! { ::bindery::FieldInfo::required::<#ty>(#key) });
            writes.push(quote! { object.field(#key, self.#member); });
            reads.push(quote! { #member: object.required(#key)? });
        }
    }

    Ok(quote! {
        #[automatically_derived]
        impl ::bindery::Bindable for #ident {
            fn type_info() -> ::bindery::TypeInfo {
                fn fields() -> ::std::vec::Vec<::bindery::FieldInfo> {
                    ::std::vec![#(#infos),*]
                }
                ::bindery::TypeInfo::Object(::bindery::ObjectInfo::new(#type_name, fields))
            }

            #[allow(unused_mut)]
            fn into_value(self) -> ::bindery::Value {
                let mut object = ::bindery::ObjectBuilder::new(#type_name);
                #(#writes)*
                object.build()
            }

            #[allow(unused_mut)]
            fn from_value(value: ::bindery::Value) -> ::bindery::Result<Self> {
                let mut object = ::bindery::ObjectFields::from_value(value, #type_name)?;
                Ok(Self { #(#reads),* })
            }
        }
    })
}

fn enum_impl(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&input.generics, "ConfigEnum cannot be generic"));
    }
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input.ident, "ConfigEnum only supports enums"));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(&input.ident, "ConfigEnum needs at least one variant"));
    }

    let ident = &input.ident;
    let type_name = type_name(input, &item_attrs(&input.attrs)?);

    let mut names = Vec::new();
    let mut to_name = Vec::new();
    let mut from_name = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(variant, "ConfigEnum only supports unit variants"));
        }
        let attrs = member_attrs(&variant.attrs)?;
        if attrs.skip {
            return Err(syn::Error::new_spanned(variant, "enum variants cannot be skipped"));
        }
        let name = attrs.rename.map_or_else(|| variant.ident.to_string(), |lit| lit.value());
        let variant_ident = &variant.ident;
        to_name.push(quote! { Self::#variant_ident => #name });
        from_name.push(quote! { #name => Ok(Self::#variant_ident) });
        names.push(name);
    }

    Ok(quote! {
        #[automatically_derived]
        impl ::bindery::Bindable for #ident {
            fn type_info() -> ::bindery::TypeInfo {
                ::bindery::TypeInfo::Enum(::bindery::EnumInfo::new(#type_name, &[#(#names),*]))
            }

            fn into_value(self) -> ::bindery::Value {
                let variant = match self {
                    #(#to_name,)*
                };
                ::bindery::Value::Enum {
                    type_name: ::std::string::String::from(#type_name),
                    variant: ::std::string::String::from(variant),
                }
            }

            fn from_value(value: ::bindery::Value) -> ::bindery::Result<Self> {
                let variant = value.into_variant(#type_name)?;
                match variant.as_str() {
                    #(#from_name,)*
                    other => Err(::bindery::BindError::InvalidData {
                        message: ::std::format!("unknown variant `{other}` for {}", #type_name).into(),
                        context: None,
                    }),
                }
            }
        }
    })
}
