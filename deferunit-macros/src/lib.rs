//! Procedural macros for deferunit
//!
//! This crate provides the `#[deferunit::suite]` attribute, which turns the
//! `test*` methods of an inherent impl block into the static method list a
//! test class registers with the loader.
//!
//! # Example
//!
//! ```rust,ignore
//! use deferunit::prelude::*;
//!
//! #[deferunit::suite]
//! impl Arithmetic {
//!     fn test_sum(&mut self) -> Result<(), Failure> {
//!         deferunit::ensure_eq!(1 + 1, 2);
//!         Ok(())
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, Lit, Token,
};

/// Name of the method used when a class has no prefixed methods.
const FALLBACK_METHOD: &str = "run_test";

/// Configuration options for the suite macro.
#[derive(Default)]
struct SuiteConfig {
    /// Method-name prefix to collect (default: "test")
    prefix: Option<String>,
}

impl Parse for SuiteConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = SuiteConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "prefix" => {
                    let lit: Lit = input.parse()?;
                    match lit {
                        Lit::Str(s) => config.prefix = Some(s.value()),
                        other => {
                            return Err(syn::Error::new_spanned(other, "prefix must be a string"));
                        }
                    }
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

/// How a collected method is called.
enum Receiver {
    /// `&self` or `&mut self`
    Reference,
    /// No receiver
    Static,
}

/// Classifies a candidate method, rejecting signatures that cannot be a test.
fn receiver_of(method: &ImplItemFn) -> syn::Result<Receiver> {
    let sig = &method.sig;
    let mut inputs = sig.inputs.iter();
    let receiver = match inputs.next() {
        None => return Ok(Receiver::Static),
        Some(FnArg::Receiver(recv)) if recv.reference.is_some() => Receiver::Reference,
        Some(FnArg::Receiver(recv)) => {
            return Err(syn::Error::new_spanned(
                recv,
                "test methods must borrow the fixture: use `&self` or `&mut self`",
            ));
        }
        Some(FnArg::Typed(arg)) => {
            return Err(syn::Error::new_spanned(arg, "test methods take no arguments"));
        }
    };
    if let Some(extra) = inputs.next() {
        return Err(syn::Error::new_spanned(extra, "test methods take no arguments"));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "test methods are not `async`; return a `Deferred<()>` instead",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&sig.generics, "test methods cannot be generic"));
    }
    Ok(receiver)
}

/// Generates the `TestMethods` implementation for a test class.
///
/// Every method whose name starts with the prefix (`test` by default), plus a
/// method named `run_test`, is registered. A method may take `&self`,
/// `&mut self` or no receiver, and return anything implementing
/// `deferunit::case::IntoBody`: `()`, `Result<(), Failure>`, `Deferred<()>`
/// or `Result<Deferred<()>, Failure>`.
///
/// ```rust,ignore
/// #[deferunit::suite]
/// impl Network {
///     fn test_connect(&mut self) -> Deferred<()> {
///         self.ctx.later(Duration::from_millis(10), ())
///     }
///
///     fn helper(&self) -> u32 {
///         7
///     }
/// }
///
/// #[deferunit::suite(prefix = "check")]
/// impl Legacy {
///     fn check_values(&self) -> Result<(), Failure> {
///         Ok(())
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn suite(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as SuiteConfig);
    let input = parse_macro_input!(item as ItemImpl);

    expand_suite(&config, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_suite(config: &SuiteConfig, input: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[deferunit::suite] goes on an inherent impl block",
        ));
    }
    let prefix = config.prefix.as_deref().unwrap_or("test");

    let mut entries = Vec::new();
    for item in &input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let ident = &method.sig.ident;
        let name = ident.to_string();
        if !name.starts_with(prefix) && name != FALLBACK_METHOD {
            continue;
        }
        let call = match receiver_of(method)? {
            Receiver::Reference => quote! { Self::#ident(case) },
            Receiver::Static => quote! { { let _ = case; Self::#ident() } },
        };
        entries.push(quote! {
            (
                #name,
                (|case: &mut Self| ::deferunit::case::IntoBody::into_body(#call))
                    as ::deferunit::case::TestMethod<Self>,
            )
        });
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #input

        impl #impl_generics ::deferunit::case::TestMethods for #self_ty #where_clause {
            fn test_methods() -> ::std::vec::Vec<(
                &'static str,
                ::deferunit::case::TestMethod<Self>,
            )> {
                ::std::vec![#(#entries),*]
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{expand_suite, SuiteConfig};

    fn expand(attr: &str, item: &str) -> syn::Result<String> {
        let config: SuiteConfig = syn::parse_str(attr)?;
        expand_suite(&config, syn::parse_str(item)?).map(|tokens| tokens.to_string())
    }

    #[test]
    fn test_config_parse_empty() {
        let config: SuiteConfig = syn::parse_str("").unwrap();
        assert!(config.prefix.is_none());
    }

    #[test]
    fn test_config_parse_prefix() {
        let config: SuiteConfig = syn::parse_str("prefix = \"check\"").unwrap();
        assert_eq!(config.prefix, Some("check".to_string()));
    }

    #[test]
    fn test_config_rejects_unknown() {
        assert!(syn::parse_str::<SuiteConfig>("runtime = \"tokio\"").is_err());
    }

    #[test]
    fn test_collects_prefixed_methods_only() {
        let out = expand(
            "",
            "impl Sample {
                fn test_a(&mut self) {}
                fn helper(&self) -> u32 { 1 }
                fn run_test(&self) {}
                fn test_static() {}
            }",
        )
        .unwrap();
        assert!(out.contains("\"test_a\""));
        assert!(out.contains("\"run_test\""));
        assert!(out.contains("\"test_static\""));
        assert!(!out.contains("\"helper\""));
        assert!(out.contains("TestMethods for Sample"));
    }

    #[test]
    fn test_rejects_extra_arguments() {
        let err = expand("", "impl Sample { fn test_a(&mut self, n: u32) {} }").unwrap_err();
        assert!(err.to_string().contains("take no arguments"));
    }

    #[test]
    fn test_rejects_by_value_receiver() {
        assert!(expand("", "impl Sample { fn test_a(self) {} }").is_err());
    }

    #[test]
    fn test_rejects_trait_impl() {
        assert!(expand("", "impl Clone for Sample { fn clone(&self) -> Self { Sample } }").is_err());
    }
}
