use std::collections::HashMap;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{braced, Attribute, Expr, Ident, Lit, LitBool, LitStr, Result, Token, Type, Visibility};

use proc_macro_crate::{crate_name, FoundCrate};

/// Unsigned storage types a bitflag family may use.
const BITFLAG_STORAGE: &[&str] = &["u8", "u16", "u32", "u64", "usize"];

/// Format attributes on a definition: #[separator = "|"], #[case_insensitive = false]
#[derive(Clone, Default)]
struct FormatAttrs {
    separator: Option<LitStr>,
    case_insensitive: Option<LitBool>,
}

impl FormatAttrs {
    fn is_empty(&self) -> bool {
        self.separator.is_none() && self.case_insensitive.is_none()
    }
}

struct MemberInput {
    /// Passed through to the accessor (#[doc], #[deprecated])
    attrs: Vec<Attribute>,
    name: Ident,
    value: Expr,
}

/// What the definition's accessors return.
enum Target {
    /// enumeration!: `=> ValueType`
    Enum { value_ty: Type },
    /// bitflag_enum!: `=> Alias: u16`
    Bitflags { alias: Ident, bits: Type },
}

struct DefinitionInput {
    /// Passed through to the definition struct
    attrs: Vec<Attribute>,
    format: FormatAttrs,
    vis: Visibility,
    ident: Ident,
    target: Target,
    members: Vec<MemberInput>,
}

struct EnumInput(DefinitionInput);
struct BitflagInput(DefinitionInput);

impl Parse for EnumInput {
    fn parse(input: ParseStream) -> Result<Self> {
        DefinitionInput::parse_header(input, |input| {
            Ok(Target::Enum {
                value_ty: input.parse()?,
            })
        })
        .map(Self)
    }
}

impl Parse for BitflagInput {
    fn parse(input: ParseStream) -> Result<Self> {
        DefinitionInput::parse_header(input, |input| {
            let alias: Ident = input.parse()?;
            input.parse::<Token![:]>()?;
            let bits: Type = input.parse()?;
            validate_bits_type(&bits)?;
            Ok(Target::Bitflags { alias, bits })
        })
        .map(Self)
    }
}

impl DefinitionInput {
    fn parse_header(
        input: ParseStream,
        parse_target: impl FnOnce(ParseStream) -> Result<Target>,
    ) -> Result<Self> {
        let (attrs, format) = parse_definition_attrs(input)?;
        let vis: Visibility = input.parse()?;
        input.parse::<Token![struct]>()?;
        let ident: Ident = input.parse()?;
        input.parse::<Token![=>]>()?;
        let target = parse_target(input)?;

        let content;
        braced!(content in input);
        let members = parse_members(&content)?;
        validate_member_names(&members)?;

        Ok(Self {
            attrs,
            format,
            vis,
            ident,
            target,
            members,
        })
    }
}

/// Split definition attributes into format overrides and pass-through attributes.
fn parse_definition_attrs(input: ParseStream) -> Result<(Vec<Attribute>, FormatAttrs)> {
    let mut passthrough = Vec::new();
    let mut format = FormatAttrs::default();

    for attr in input.call(Attribute::parse_outer)? {
        if attr.path().is_ident("separator") {
            let value = &attr.meta.require_name_value()?.value;
            let Expr::Lit(syn::ExprLit {
                lit: Lit::Str(lit), ..
            }) = value
            else {
                return Err(syn::Error::new_spanned(value, "separator must be a string literal"));
            };
            if lit.value().trim().is_empty() {
                return Err(syn::Error::new_spanned(lit, "separator cannot be empty"));
            }
            format.separator = Some(lit.clone());
        } else if attr.path().is_ident("case_insensitive") {
            let value = &attr.meta.require_name_value()?.value;
            let Expr::Lit(syn::ExprLit {
                lit: Lit::Bool(lit), ..
            }) = value
            else {
                return Err(syn::Error::new_spanned(
                    value,
                    "case_insensitive must be `true` or `false`",
                ));
            };
            format.case_insensitive = Some(lit.clone());
        } else {
            passthrough.push(attr);
        }
    }

    Ok((passthrough, format))
}

fn parse_members(input: ParseStream) -> Result<Vec<MemberInput>> {
    let mut members = Vec::new();
    while !input.is_empty() {
        let attrs = input.call(Attribute::parse_outer)?;
        for attr in &attrs {
            if !(attr.path().is_ident("doc") || attr.path().is_ident("deprecated")) {
                return Err(syn::Error::new_spanned(
                    attr,
                    "only #[doc] and #[deprecated] are supported on members",
                ));
            }
        }

        let name: Ident = input.parse()?;
        input.parse::<Token![=]>()?;
        let value: Expr = input.parse()?;
        input.parse::<Token![;]>()?;

        members.push(MemberInput { attrs, name, value });
    }
    Ok(members)
}

/// Names are parse keys once lower-cased, so they must stay distinct that way.
fn validate_member_names(members: &[MemberInput]) -> Result<()> {
    let mut seen: HashMap<String, &Ident> = HashMap::new();
    for member in members {
        let key = member.name.to_string().to_lowercase();
        if let Some(existing) = seen.get(&key) {
            return Err(syn::Error::new_spanned(
                &member.name,
                format!(
                    "member `{}` collides with `{}` (names are matched case-insensitively)",
                    member.name, existing
                ),
            ));
        }
        seen.insert(key, &member.name);
    }
    Ok(())
}

fn validate_bits_type(ty: &Type) -> Result<()> {
    if let Type::Path(path) = ty
        && path.qself.is_none()
        && let Some(ident) = path.path.get_ident()
        && BITFLAG_STORAGE.iter().any(|s| ident == s)
    {
        return Ok(());
    }
    Err(syn::Error::new_spanned(
        ty,
        "bitflag storage must be an unsigned integer type (u8, u16, u32, u64 or usize)",
    ))
}

// =============================================================================
// Crate path resolution
// =============================================================================

fn registry_crate_path() -> TokenStream2 {
    match crate_name("enum-registry") {
        Ok(FoundCrate::Itself) => {
            quote!(::enum_registry)
        }
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::enum_registry),
    }
}

// =============================================================================
// Code generation
// =============================================================================

/// Generate a definition type with one accessor per member.
///
/// ```ignore
/// bitflag_enum! {
///     #[separator = "|"]
///     pub struct Permissions => Permission: u16 {
///         Read = 1 << 0;
///         Write = 1 << 1;
///     }
/// }
///
/// // Generates:
/// #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
/// pub struct Permissions;
///
/// pub type Permission = ::enum_registry::Bitflag<Permissions>;
///
/// #[allow(non_snake_case)]
/// impl Permissions {
///     pub const MEMBER_COUNT: usize = 2;
///     pub const NAMES: &'static [&'static str] = &["Read", "Write"];
///     pub const fn Read(self) -> Permission { Bitflag::from_bits(1 << 0) }
///     pub const fn Write(self) -> Permission { Bitflag::from_bits(1 << 1) }
/// }
///
/// impl ::enum_registry::BitflagDefinition for Permissions {
///     type Bits = u16;
///     fn members() -> Vec<Member<u16>> {
///         vec![Member::new("Read", Permissions.Read().bits()), ...]
///     }
///     fn registry() -> &'static Registry<u16> {
///         static REGISTRY: Registry<u16> = Registry::new();
///         &REGISTRY
///     }
///     fn format_override() -> FormatOverride {
///         FormatOverride::new(Some("|"), None)
///     }
/// }
///
/// // Usage:
/// Permissions.Read()                 // Bitflag<Permissions>
/// Permissions.Read() | Permissions.Write()
/// Permissions::parse("read|write", true)
/// ```
fn generate_definition(input: &DefinitionInput, krate: &TokenStream2) -> TokenStream2 {
    let DefinitionInput {
        attrs,
        format,
        vis,
        ident,
        target,
        members,
    } = input;

    let count = members.len();
    let name_lits: Vec<LitStr> = members
        .iter()
        .map(|m| LitStr::new(&m.name.to_string(), m.name.span()))
        .collect();
    let format_override = generate_format_override(format, krate);

    let (accessors, alias_decl, definition_impl) = match target {
        Target::Enum { value_ty } => {
            let accessors = members.iter().map(|m| {
                let MemberInput { attrs, name, value } = m;
                quote! {
                    #(#attrs)*
                    #[inline]
                    pub fn #name(self) -> #value_ty {
                        #value
                    }
                }
            });
            let entries = members.iter().zip(&name_lits).map(|(m, lit)| {
                let name = &m.name;
                quote! { #krate::Member::new(#lit, #ident.#name()), }
            });

            let definition_impl = quote! {
                impl #krate::EnumDefinition for #ident {
                    type Value = #value_ty;

                    #[allow(deprecated)]
                    fn members() -> ::std::vec::Vec<#krate::Member<#value_ty>> {
                        ::std::vec![#(#entries)*]
                    }

                    fn registry() -> &'static #krate::Registry<#value_ty> {
                        static REGISTRY: #krate::Registry<#value_ty> = #krate::Registry::new();
                        &REGISTRY
                    }

                    #format_override
                }
            };

            (quote! { #(#accessors)* }, quote! {}, definition_impl)
        }
        Target::Bitflags { alias, bits } => {
            let accessors = members.iter().map(|m| {
                let MemberInput { attrs, name, value } = m;
                quote! {
                    #(#attrs)*
                    #[inline]
                    pub const fn #name(self) -> #alias {
                        #krate::Bitflag::from_bits(#value)
                    }
                }
            });
            let entries = members.iter().zip(&name_lits).map(|(m, lit)| {
                let name = &m.name;
                quote! { #krate::Member::new(#lit, #ident.#name().bits()), }
            });

            let alias_doc = format!("A set of [`{}`] members.", ident);
            let alias_decl = quote! {
                #[doc = #alias_doc]
                #vis type #alias = #krate::Bitflag<#ident>;
            };

            let definition_impl = quote! {
                impl #krate::BitflagDefinition for #ident {
                    type Bits = #bits;

                    #[allow(deprecated)]
                    fn members() -> ::std::vec::Vec<#krate::Member<#bits>> {
                        ::std::vec![#(#entries)*]
                    }

                    fn registry() -> &'static #krate::Registry<#bits> {
                        static REGISTRY: #krate::Registry<#bits> = #krate::Registry::new();
                        &REGISTRY
                    }

                    #format_override
                }
            };

            (quote! { #(#accessors)* }, alias_decl, definition_impl)
        }
    };

    quote! {
        #(#attrs)*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        #vis struct #ident;

        #alias_decl

        #[allow(non_snake_case)]
        impl #ident {
            /// Number of declared members.
            pub const MEMBER_COUNT: usize = #count;

            /// Member names in declaration order.
            pub const NAMES: &'static [&'static str] = &[#(#name_lits),*];

            #accessors
        }

        #definition_impl
    }
}

/// Generate `format_override()` when the definition carries format attributes.
fn generate_format_override(format: &FormatAttrs, krate: &TokenStream2) -> TokenStream2 {
    if format.is_empty() {
        return quote! {};
    }

    let separator = match &format.separator {
        Some(lit) => quote!(::core::option::Option::Some(#lit)),
        None => quote!(::core::option::Option::None),
    };
    let case_insensitive = match &format.case_insensitive {
        Some(lit) => quote!(::core::option::Option::Some(#lit)),
        None => quote!(::core::option::Option::None),
    };

    quote! {
        fn format_override() -> #krate::FormatOverride {
            #krate::FormatOverride::new(#separator, #case_insensitive)
        }
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Declare a plain enumeration definition.
///
/// ```ignore
/// enumeration! {
///     pub struct Colors => Color {
///         Red = Color(1);
///         Green = Color(2);
///     }
/// }
///
/// assert_eq!(Colors::stringify(&Colors.Red()), "Red");
/// ```
#[proc_macro]
pub fn enumeration(input: TokenStream) -> TokenStream {
    let EnumInput(input) = syn::parse_macro_input!(input as EnumInput);
    generate_definition(&input, &registry_crate_path()).into()
}

/// Declare a bitflag family over an unsigned integer.
///
/// ```ignore
/// bitflag_enum! {
///     #[separator = "|"]
///     pub struct Permissions => Permission: u16 {
///         Read = 1 << 0;
///         Write = 1 << 1;
///     }
/// }
///
/// let rw: Permission = Permissions.Read() | Permissions.Write();
/// ```
#[proc_macro]
pub fn bitflag_enum(input: TokenStream) -> TokenStream {
    let BitflagInput(input) = syn::parse_macro_input!(input as BitflagInput);
    generate_definition(&input, &registry_crate_path()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_bitflags(src: &str) -> String {
        let BitflagInput(input) = syn::parse_str(src).unwrap();
        generate_definition(&input, &quote!(::enum_registry)).to_string()
    }

    fn expand_enum(src: &str) -> String {
        let EnumInput(input) = syn::parse_str(src).unwrap();
        generate_definition(&input, &quote!(::enum_registry)).to_string()
    }

    fn bitflags_error(src: &str) -> String {
        match syn::parse_str::<BitflagInput>(src) {
            Ok(_) => panic!("expected a parse error for: {}", src),
            Err(err) => err.to_string(),
        }
    }

    #[test]
    fn bitflags_generate_accessors_and_alias() {
        let code = expand_bitflags(
            "pub struct Perms => Perm: u16 { Read = 1; Write = 1 << 1; }",
        );

        assert!(code.contains("pub struct Perms"));
        assert!(code.contains("pub type Perm ="));
        assert!(code.contains("Bitflag < Perms >"));
        assert!(code.contains("pub const fn Read (self) -> Perm"));
        assert!(code.contains("pub const fn Write (self) -> Perm"));
        assert!(code.contains("type Bits = u16"));
        assert!(code.contains("\"Read\""));
        assert!(code.contains("\"Write\""));
        assert!(code.contains("MEMBER_COUNT : usize = 2usize"));
    }

    #[test]
    fn enum_generates_value_accessors() {
        let code = expand_enum("pub struct Colors => Color { Red = Color(1); Green = Color(2); }");

        assert!(code.contains("pub fn Red (self) -> Color"));
        assert!(code.contains("type Value = Color"));
        assert!(code.contains("EnumDefinition for Colors"));
        // No bitflag alias for plain enumerations.
        assert!(!code.contains("pub type"));
    }

    #[test]
    fn format_attributes_become_override() {
        let code = expand_bitflags(
            r#"#[separator = "|"] #[case_insensitive = false] struct F => Flag: u8 { A = 1; }"#,
        );

        assert!(code.contains("fn format_override"));
        assert!(code.contains("Some (\"|\")"));
        assert!(code.contains("Some (false)"));
        // Format attributes are consumed, not passed through.
        assert!(!code.contains("# [separator"));
    }

    #[test]
    fn no_override_without_format_attributes() {
        let code = expand_bitflags("/// Docs.\nstruct F => Flag: u8 { A = 1; }");
        assert!(!code.contains("format_override"));
        assert!(code.contains("Docs."));
    }

    #[test]
    fn deprecated_members_pass_through() {
        let code = expand_bitflags(
            r#"struct F => Flag: u8 { A = 1; #[deprecated(note = "gone")] B = 2; }"#,
        );
        assert!(code.contains("# [deprecated (note = \"gone\")]"));
        assert!(code.contains("# [allow (deprecated)]"));
    }

    #[test]
    fn rejects_signed_storage() {
        let err = bitflags_error("struct F => Flag: i32 { A = 1; }");
        assert!(err.contains("unsigned integer"));
    }

    #[test]
    fn rejects_empty_separator() {
        let err = bitflags_error(r#"#[separator = "  "] struct F => Flag: u8 { A = 1; }"#);
        assert!(err.contains("separator cannot be empty"));
    }

    #[test]
    fn rejects_case_colliding_members() {
        let err = bitflags_error("struct F => Flag: u8 { Foo = 1; FOO = 2; }");
        assert!(err.contains("collides with `Foo`"));
    }

    #[test]
    fn rejects_unsupported_member_attributes() {
        let err = bitflags_error("struct F => Flag: u8 { #[cfg(test)] A = 1; }");
        assert!(err.contains("only #[doc] and #[deprecated]"));
    }

    #[test]
    fn empty_definition_is_allowed() {
        let code = expand_bitflags("struct F => Flag: u64 {}");
        assert!(code.contains("MEMBER_COUNT : usize = 0usize"));
    }
}
