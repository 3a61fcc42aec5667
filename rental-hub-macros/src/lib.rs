//! Proc macro for generating wire tag tables for rental-hub ontologies.

use darling::FromDeriveInput;
use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod codegen;
mod helpers;
mod validation;

/// Derives the tag table of a closed wire vocabulary.
///
/// Generates `ALL`, `tag()` and `from_tag()` for a fieldless enum. Tags default
/// to the lower camel case variant name and can be overridden per variant:
///
/// ```ignore
/// #[derive(Ontology)]
/// pub enum Kind {
///     RegisterStation,                    // "registerStation"
///     #[ontology(tag = "noOtherStations")]
///     NoOtherStations,
/// }
/// ```
#[proc_macro_derive(Ontology, attributes(ontology))]
pub fn derive_ontology(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let args = match attrs::OntologyArgs::from_derive_input(&input) {
        Ok(args) => args,
        Err(e) => return e.write_errors().into(),
    };

    match generate_ontology(args) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn generate_ontology(args: attrs::OntologyArgs) -> syn::Result<proc_macro2::TokenStream> {
    // Resolve tags and reject collisions
    let ontology = validation::OntologyStructure::parse(args)?;

    Ok(codegen::generate(&ontology))
}
