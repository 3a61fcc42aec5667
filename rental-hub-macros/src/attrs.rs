//! Attribute parsing for the ontology derive.

use darling::{FromDeriveInput, FromMeta, FromVariant};
use syn::Ident;

/// Container arguments for `#[derive(Ontology)]`.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(ontology), supports(enum_unit))]
pub struct OntologyArgs {
    pub ident: Ident,
    pub data: darling::ast::Data<VariantArgs, ()>,

    /// Case convention applied to variant names (default: camelCase).
    #[darling(default)]
    pub rename_all: RenameRule,
}

/// Arguments for `#[ontology(tag = "...")]` on a variant.
#[derive(Debug, FromVariant)]
#[darling(attributes(ontology))]
pub struct VariantArgs {
    pub ident: Ident,

    /// Explicit wire tag, bypassing `rename_all`.
    #[darling(default)]
    pub tag: Option<String>,
}

/// Supported `rename_all` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenameRule {
    #[default]
    CamelCase,
    SnakeCase,
    Lowercase,
}

impl FromMeta for RenameRule {
    fn from_string(value: &str) -> darling::Result<Self> {
        match value {
            "camelCase" => Ok(Self::CamelCase),
            "snake_case" => Ok(Self::SnakeCase),
            "lowercase" => Ok(Self::Lowercase),
            other => Err(darling::Error::unknown_value(other)),
        }
    }
}
