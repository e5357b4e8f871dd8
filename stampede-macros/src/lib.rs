use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Ident, ItemFn};

/// Proc macro to denote a Transaction
///
/// A transaction is one timed request. The function must return a `Result<T, E>`: `Ok` counts as
/// a success, `Err` as a failure, and the latency is recorded either way.
///
/// # Example
/// ```ignore
/// use stampede::prelude::*;
///
/// #[transaction]
/// async fn post_endpoint(client: &Client, url: &str) -> Result<(), reqwest::Error> {
///     client.post(url).send().await?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn transaction(attr: TokenStream, item: TokenStream) -> TokenStream {
    match transaction_internal(attr, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn transaction_internal(_attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream2> {
    let input = syn::parse::<ItemFn>(item)?;

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    if sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            sig.fn_token,
            "#[transaction] only works on async functions",
        ));
    }

    let stmts = &block.stmts;
    let name = &sig.ident;

    Ok(quote! {
        #(#attrs)* #vis #sig {
            ::stampede::transaction::transaction_hook(
                ::stampede::core::generate_labels!(#name),
                async move {
                    #(#stmts)*
                },
            ).await
        }
    })
}

/// Proc macro to denote a Scenario
///
/// NOTE: Currently this macro only works on async functions which take no arguments and return
/// nothing. Use `Scenario::new` directly for closures that capture state.
///
/// See the `Scenario` struct for more information on the methods this macro provides on functions.
///
/// # Example
/// ```ignore
/// use stampede::prelude::*;
///
/// #[scenario]
/// async fn my_scenario() {
/// }
/// ```
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    match scenario_internal(attr, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn scenario_internal(_attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream2> {
    let input = syn::parse::<ItemFn>(item)?;

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    if !sig.inputs.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "#[scenario] functions cannot take arguments",
        ));
    }

    let stmts = &block.stmts;

    let new_name = Ident::new(&format!("__stampede_{}", sig.ident), Span::call_site());
    let mut new_sig = sig.clone();
    new_sig.ident = new_name.clone();

    let mut scen_sig = sig.clone();
    let scen_name = sig.ident.clone();
    scen_sig.asyncness = None;
    scen_sig.output = syn::parse(
        quote! {
            -> impl ::stampede::scenario::ConfigurableScenario<::stampede::scenario::RunReport>
        }
        .into(),
    )?;

    Ok(quote! {
        #(#attrs)* #vis #scen_sig {
            ::stampede::scenario::Scenario::new(stringify!(#scen_name), #new_name)
        }

        #(#attrs)* #vis #new_sig {
            #(#stmts)*
        }
    })
}
