//! Derive macros for the yamlbind settings library
//!
//! This crate provides `#[derive(Bindable)]` for automatically generating
//! field binding declarations.
//!
//! # Usage
//!
//! ```text
//! use yamlbind::Bindable;
//!
//! #[derive(Bindable)]
//! #[settings(root = "server")]
//! struct ServerSettings {
//!     #[setting(default = 8080)]
//!     port: u16,
//!
//!     #[setting(env = "APP_HOST", default = "localhost")]
//!     host: String,
//! }
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Lit, Meta};

/// Derive macro for generating `Bindable` implementations.
///
/// Every named field is bound unless marked with `skip`. The binding path
/// defaults to the field name, prefixed by the container root when one is
/// declared.
///
/// # Attributes
///
/// ## Container attributes (`#[settings(...)]`)
/// - `root = "prefix"` - Path prefix for all fields without an explicit path
///
/// ## Field attributes (`#[setting(...)]`)
/// - `path = "a.b.c"` - Explicit document path (overrides the root prefix)
/// - `default` - Default from the struct's `Default` impl (requires `Default`)
/// - `default = <expr>` - Default from an expression
/// - `validator = <fn>` - Validation function `fn(&T) -> Result<(), String>`
/// - `env = "NAME"` - Explicit environment variable name for overrides
/// - `skip` - Do not bind this field
#[proc_macro_derive(Bindable, attributes(settings, setting))]
pub fn derive_bindable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let container_attrs = parse_container_attrs(&input.attrs);

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return syn::Error::new_spanned(
                    &input,
                    "Bindable can only be derived for structs with named fields.\n\nExample:\n  #[derive(Bindable)]\n  struct MySettings {\n      field: Type,\n  }"
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(
                &input,
                "Bindable can only be derived for structs.\n\nTry: #[derive(Bindable)] on a struct, not an enum or union."
            )
            .to_compile_error()
            .into();
        }
    };

    let mut entries = Vec::new();

    for field in fields {
        let field_ident = field.ident.as_ref().unwrap();
        let field_type = &field.ty;
        let attrs = parse_field_attrs(&field.attrs);

        // Skip fields marked with #[setting(skip)]
        if attrs.skip {
            continue;
        }

        let field_str = field_ident.to_string();
        let path = attrs.path.clone().unwrap_or_else(|| {
            match &container_attrs.root {
                Some(root) => format!("{root}.{field_str}"),
                None => field_str.clone(),
            }
        });

        // Build the binding with chainable modifiers
        let mut modifiers = Vec::new();

        match &attrs.default {
            Some(DefaultKind::FromImpl) => {
                modifiers.push(quote! {
                    .default_with(|| <#name as ::std::default::Default>::default().#field_ident)
                });
            }
            Some(DefaultKind::Str(lit)) => {
                modifiers.push(quote! {
                    .default_with(|| ::std::convert::Into::into(#lit))
                });
            }
            Some(DefaultKind::Expr(expr)) => {
                modifiers.push(quote! {
                    .default_with(|| {
                        let value: #field_type = #expr;
                        value
                    })
                });
            }
            None => {}
        }

        if let Some(validator) = &attrs.validator {
            modifiers.push(quote! { .validate_with(#validator) });
        }
        if let Some(env) = &attrs.env {
            modifiers.push(quote! { .env_var(#env) });
        }

        entries.push(quote! {
            ::yamlbind::FieldBinding::new(
                #field_str,
                #path,
                |owner: &#name| owner.#field_ident.clone(),
                |owner: &mut #name, value: #field_type| owner.#field_ident = value,
            )
            #(#modifiers)*
            .build()
        });
    }

    let expanded = quote! {
        impl ::yamlbind::Bindable for #name {
            fn type_name(&self) -> &'static str {
                stringify!(#name)
            }

            fn bindings(&self) -> ::std::vec::Vec<::yamlbind::FieldBinding> {
                ::std::vec![#(#entries),*]
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    };

    TokenStream::from(expanded)
}

/// Default value form from #[setting(default...)]
enum DefaultKind {
    /// Bare `default` flag, pulls from the struct's `Default` impl
    FromImpl,
    /// String literal, converted with `Into`
    Str(syn::LitStr),
    /// Any other expression, type-ascribed to the field type
    Expr(Expr),
}

/// Container-level attributes from #[settings(...)]
#[derive(Default)]
struct ContainerAttrs {
    root: Option<String>,
}

/// Field-level attributes from #[setting(...)]
#[derive(Default)]
struct FieldAttrs {
    path: Option<String>,
    default: Option<DefaultKind>,
    validator: Option<Expr>,
    env: Option<String>,
    skip: bool,
}

fn parse_container_attrs(attrs: &[Attribute]) -> ContainerAttrs {
    let mut result = ContainerAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("settings") {
            if let Ok(nested) = attr.parse_args_with(
                syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
            ) {
                for meta in nested {
                    if let Meta::NameValue(nv) = meta {
                        if nv.path.is_ident("root") {
                            if let Expr::Lit(lit) = &nv.value {
                                if let Lit::Str(s) = &lit.lit {
                                    result.root = Some(s.value());
                                    continue;
                                }
                            }
                            panic!("#[settings(root)] must be a string literal.\n\nExample: #[settings(root = \"server\")]");
                        }
                    }
                }
            }
        }
    }

    result
}

fn parse_field_attrs(attrs: &[Attribute]) -> FieldAttrs {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("setting") {
            if let Ok(nested) = attr.parse_args_with(
                syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
            ) {
                for meta in nested {
                    match meta {
                        Meta::Path(path) => {
                            if path.is_ident("skip") {
                                result.skip = true;
                            } else if path.is_ident("default") {
                                result.default = Some(DefaultKind::FromImpl);
                            }
                        }
                        Meta::NameValue(nv) => {
                            let value = &nv.value;
                            if nv.path.is_ident("path") {
                                if let Expr::Lit(lit) = value {
                                    if let Lit::Str(s) = &lit.lit {
                                        result.path = Some(s.value());
                                        continue;
                                    }
                                }
                                panic!("#[setting(path)] must be a string literal.\n\nExample: #[setting(path = \"server.port\")]");
                            } else if nv.path.is_ident("env") {
                                if let Expr::Lit(lit) = value {
                                    if let Lit::Str(s) = &lit.lit {
                                        result.env = Some(s.value());
                                        continue;
                                    }
                                }
                                panic!("#[setting(env)] must be a string literal.\n\nExample: #[setting(env = \"APP_PORT\")]");
                            } else if nv.path.is_ident("default") {
                                if let Expr::Lit(lit) = value {
                                    if let Lit::Str(s) = &lit.lit {
                                        result.default = Some(DefaultKind::Str(s.clone()));
                                        continue;
                                    }
                                }
                                result.default = Some(DefaultKind::Expr(value.clone()));
                            } else if nv.path.is_ident("validator") {
                                result.validator = Some(value.clone());
                            }
                        }
                        Meta::List(_) => {}
                    }
                }
            }
        }
    }

    result
}
