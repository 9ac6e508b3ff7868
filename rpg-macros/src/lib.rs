//! Proc macros for combat engine tools.
//!
//! `#[derive(Tool)]` turns an argument struct into a self-describing tool:
//! the struct's doc comment becomes the tool description and its fields
//! become a JSON schema the agent can call against.
//!
//! # Example
//!
//! ```ignore
//! /// Resolve a weapon attack between two combatants
//! #[derive(Tool, Deserialize)]
//! #[tool(name = "execute_attack")]
//! struct ExecuteAttack {
//!     /// Id of the attacking combatant
//!     attacker_id: String,
//!     /// Id of the combatant being attacked
//!     target_id: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, DeriveInput, Expr, Field, Lit, Type};

/// Derive macro generating tool metadata.
///
/// # Attributes
///
/// - `#[tool(name = "...")]` on the struct overrides the tool name (default: snake_case struct name)
/// - `#[tool(optional)]` on a field keeps it out of `required`
/// - `#[tool(rename = "...")]` on a field overrides its schema key
///
/// `Option<T>` fields are never required.
#[proc_macro_derive(Tool, attributes(tool))]
pub fn derive_tool(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

#[derive(Default)]
struct ToolAttrs {
    name: Option<String>,
    rename: Option<String>,
    optional: bool,
}

impl ToolAttrs {
    fn from_attributes(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = ToolAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("tool")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    parsed.name = Some(meta.value()?.parse::<syn::LitStr>()?.value());
                } else if meta.path.is_ident("rename") {
                    parsed.rename = Some(meta.value()?.parse::<syn::LitStr>()?.value());
                } else if meta.path.is_ident("optional") {
                    parsed.optional = true;
                } else {
                    return Err(meta.error("unknown tool attribute"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let attrs = ToolAttrs::from_attributes(&input.attrs)?;
    let tool_name = attrs
        .name
        .unwrap_or_else(|| to_snake_case(&ident.to_string()));
    let description = doc_string(&input.attrs);

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
            syn::Fields::Unit => Vec::new(),
            syn::Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Tool can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Tool can only be derived for structs",
            ))
        }
    };

    let mut properties = Vec::with_capacity(fields.len());
    let mut required = Vec::new();
    for field in fields {
        let (key, property, is_required) = field_schema(field)?;
        properties.push(quote! {
            properties.insert(#key.to_string(), #property);
        });
        if is_required {
            required.push(key);
        }
    }

    Ok(quote! {
        impl #ident {
            /// Name the agent calls this tool by.
            pub fn tool_name() -> &'static str {
                #tool_name
            }

            /// Human readable description shown to the agent.
            pub fn tool_description() -> &'static str {
                #description
            }

            /// JSON schema of the tool input.
            pub fn input_schema() -> serde_json::Value {
                #[allow(unused_mut)]
                let mut properties = serde_json::Map::new();
                #(#properties)*
                #[allow(clippy::useless_vec)]
                let required: Vec<&str> = vec![#(#required),*];
                serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                })
            }

            /// Complete tool definition: name, description and input schema.
            pub fn definition() -> serde_json::Value {
                serde_json::json!({
                    "name": Self::tool_name(),
                    "description": Self::tool_description(),
                    "input_schema": Self::input_schema(),
                })
            }
        }
    })
}

fn field_schema(field: &Field) -> syn::Result<(String, TokenStream2, bool)> {
    let attrs = ToolAttrs::from_attributes(&field.attrs)?;
    let key = match (&attrs.rename, &field.ident) {
        (Some(rename), _) => rename.clone(),
        (None, Some(ident)) => ident.to_string(),
        (None, None) => return Err(syn::Error::new_spanned(field, "field must be named")),
    };

    let schema = schema_for(&field.ty);
    let description = doc_string(&field.attrs);
    let property = if description.is_empty() {
        quote! { #schema }
    } else {
        quote! {{
            let mut property = #schema;
            property["description"] = serde_json::json!(#description);
            property
        }}
    };

    let is_required = !attrs.optional && option_inner(&field.ty).is_none();
    Ok((key, property, is_required))
}

fn doc_string(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(expr) => match &expr.lit {
                    Lit::Str(s) => Some(s.value().trim().to_string()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns the `T` of an `Option<T>` or `Vec<T>` style path segment.
fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}

fn schema_for(ty: &Type) -> TokenStream2 {
    if let Some(inner) = option_inner(ty) {
        return schema_for(inner);
    }
    if let Some(inner) = generic_inner(ty, "Vec") {
        let items = schema_for(inner);
        return quote! { serde_json::json!({ "type": "array", "items": #items }) };
    }

    let Type::Path(path) = ty else {
        return quote! { serde_json::json!({}) };
    };
    let Some(segment) = path.path.segments.last() else {
        return quote! { serde_json::json!({}) };
    };

    match segment.ident.to_string().as_str() {
        "String" | "str" => quote! { serde_json::json!({ "type": "string" }) },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { serde_json::json!({ "type": "integer" }) }
        }
        "f32" | "f64" => quote! { serde_json::json!({ "type": "number" }) },
        "bool" => quote! { serde_json::json!({ "type": "boolean" }) },
        _ => quote! { serde_json::json!({ "type": "object" }) },
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
