//! Code generation for ontology tag tables.

use proc_macro2::TokenStream;
use quote::quote;

use crate::validation::OntologyStructure;

/// Generate the inherent impl carrying the tag table.
pub fn generate(ontology: &OntologyStructure) -> TokenStream {
    let name = &ontology.name;
    let variants: Vec<_> = ontology.entries.iter().map(|e| &e.variant).collect();
    let tags: Vec<_> = ontology.entries.iter().map(|e| e.tag.as_str()).collect();

    quote! {
        impl #name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [#name] = &[#(#name::#variants,)*];

            /// Returns the wire tag of this variant.
            pub const fn tag(&self) -> &'static str {
                match self {
                    #(#name::#variants => #tags,)*
                }
            }

            /// Resolves a wire tag back into its variant.
            pub fn from_tag(tag: &str) -> ::core::option::Option<Self> {
                match tag {
                    #(#tags => ::core::option::Option::Some(#name::#variants),)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    }
}
