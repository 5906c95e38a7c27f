//! Proc macros for gadget tool generation.
//!
//! Provides `#[derive(Tool)]`, which turns an argument struct into a tool
//! name, description, JSON input schema and `claude::Tool` definition.
//!
//! # Example
//!
//! ```ignore
//! /// Decrypt a Caesar-cipher encoded message.
//! #[derive(Tool, Deserialize)]
//! #[tool(name = "decrypt_message")]
//! struct DecryptMessage {
//!     /// The intercepted ciphertext
//!     ciphertext: String,
//!     /// Caesar shift to undo
//!     #[tool(min = 1, max = 5)]
//!     shift: i64,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Field, Lit, LitInt, LitStr, Meta, Type};

/// Derive macro for generating Tool implementations.
///
/// # Attributes
///
/// - `#[tool(name = "...")]` - Override the tool name (defaults to snake_case struct name)
/// - `#[tool(optional)]` on fields - Leave the field out of `required`
/// - `#[tool(rename = "...")]` on fields - Override field name in schema
/// - `#[tool(one_of = "a|b|c")]` on fields - Restrict a string to listed values
/// - `#[tool(min = N, max = M)]` on fields - Bound an integer
#[proc_macro_derive(Tool, attributes(tool))]
pub fn derive_tool(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_tool(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Per-field `#[tool(...)]` settings.
#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    optional: bool,
    one_of: Vec<String>,
    min: Option<i64>,
    max: Option<i64>,
}

fn expand_tool(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let tool_name = get_tool_name(&input)?;
    let description = get_doc_comment(&input.attrs);

    if description.is_empty() {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Tool derive needs a doc comment to use as the tool description",
        ));
    }

    let fields = match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Tool derive only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(&input, "Tool derive only supports structs")),
    };

    let mut property_tokens = Vec::new();
    let mut required_fields = Vec::new();

    for field in fields {
        let attrs = get_field_attrs(field)?;
        let field_name = match &attrs.rename {
            Some(name) => name.clone(),
            None => field
                .ident
                .as_ref()
                .map(|ident| ident.to_string())
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?,
        };
        let field_desc = get_doc_comment(&field.attrs);
        let type_schema = type_to_schema(&field.ty);

        let desc_token = if field_desc.is_empty() {
            quote! {}
        } else {
            quote! { property["description"] = serde_json::json!(#field_desc); }
        };

        let enum_token = if attrs.one_of.is_empty() {
            quote! {}
        } else {
            let values = &attrs.one_of;
            quote! { property["enum"] = serde_json::json!([#(#values),*]); }
        };

        let min_token = match attrs.min {
            Some(min) => quote! { property["minimum"] = serde_json::json!(#min); },
            None => quote! {},
        };
        let max_token = match attrs.max {
            Some(max) => quote! { property["maximum"] = serde_json::json!(#max); },
            None => quote! {},
        };

        property_tokens.push(quote! {
            {
                let mut property = #type_schema;
                #desc_token
                #enum_token
                #min_token
                #max_token
                properties.insert(#field_name.to_string(), property);
            }
        });

        if !attrs.optional && !is_option_type(&field.ty) {
            required_fields.push(field_name);
        }
    }

    Ok(quote! {
        impl #struct_name {
            /// Get the tool name.
            pub fn tool_name() -> &'static str {
                #tool_name
            }

            /// Get the tool description.
            pub fn tool_description() -> &'static str {
                #description
            }

            /// Generate the JSON schema for this tool's input.
            pub fn input_schema() -> serde_json::Value {
                let mut properties = serde_json::Map::new();
                #(#property_tokens)*

                let required: Vec<&str> = vec![#(#required_fields),*];

                serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required
                })
            }

            /// Create a Tool definition for use with the Claude API.
            pub fn as_tool() -> claude::Tool {
                claude::Tool {
                    name: Self::tool_name().to_string(),
                    description: Self::tool_description().to_string(),
                    input_schema: Self::input_schema(),
                }
            }

            /// Deserialize the arguments of a tool call addressed to this tool.
            pub fn from_input(input: &serde_json::Value) -> Result<Self, serde_json::Error>
            where
                Self: serde::de::DeserializeOwned,
            {
                serde_json::from_value(input.clone())
            }
        }
    })
}

fn get_tool_name(input: &DeriveInput) -> syn::Result<String> {
    let mut name = None;
    for attr in &input.attrs {
        if attr.path().is_ident("tool") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    name = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"`"))
                }
            })?;
        }
    }

    Ok(name.unwrap_or_else(|| to_snake_case(&input.ident.to_string())))
}

fn get_field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("tool") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("optional") {
                attrs.optional = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.rename = Some(value.value());
            } else if meta.path.is_ident("one_of") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.one_of = value
                    .value()
                    .split('|')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
            } else if meta.path.is_ident("min") {
                let value: LitInt = meta.value()?.parse()?;
                attrs.min = Some(value.base10_parse()?);
            } else if meta.path.is_ident("max") {
                let value: LitInt = meta.value()?.parse()?;
                attrs.max = Some(value.base10_parse()?);
            } else {
                return Err(meta.error("unsupported tool field attribute"));
            }
            Ok(())
        })?;
    }

    if let (Some(min), Some(max)) = (attrs.min, attrs.max) {
        if min > max {
            return Err(syn::Error::new_spanned(field, "`min` is greater than `max`"));
        }
    }

    Ok(attrs)
}

fn get_doc_comment(attrs: &[syn::Attribute]) -> String {
    let mut docs = Vec::new();
    for attr in attrs {
        if attr.path().is_ident("doc") {
            if let Meta::NameValue(nv) = &attr.meta {
                if let syn::Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Str(s) = &expr_lit.lit {
                        docs.push(s.value().trim().to_string());
                    }
                }
            }
        }
    }
    docs.join(" ")
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

fn type_to_schema(ty: &Type) -> TokenStream2 {
    let Type::Path(type_path) = ty else {
        return quote! { serde_json::json!({}) };
    };
    let Some(segment) = type_path.path.segments.last() else {
        return quote! { serde_json::json!({}) };
    };

    match segment.ident.to_string().as_str() {
        "String" | "str" => quote! { serde_json::json!({"type": "string"}) },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { serde_json::json!({"type": "integer"}) }
        }
        "f32" | "f64" => quote! { serde_json::json!({"type": "number"}) },
        "bool" => quote! { serde_json::json!({"type": "boolean"}) },
        "Option" => match first_generic(segment) {
            Some(inner) => type_to_schema(inner),
            None => quote! { serde_json::json!({}) },
        },
        "Vec" => match first_generic(segment) {
            Some(inner) => {
                let inner_schema = type_to_schema(inner);
                quote! {
                    serde_json::json!({
                        "type": "array",
                        "items": #inner_schema
                    })
                }
            }
            None => quote! { serde_json::json!({"type": "array"}) },
        },
        _ => quote! { serde_json::json!({"type": "object"}) },
    }
}

fn first_generic(segment: &syn::PathSegment) -> Option<&Type> {
    if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
        if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
            return Some(inner);
        }
    }
    None
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}
