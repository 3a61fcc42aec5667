//! Validation logic for ontology enums.

use std::collections::HashMap;

use syn::{Error, Ident};

use crate::attrs::OntologyArgs;
use crate::helpers;

/// A variant together with its resolved wire tag.
#[derive(Debug, Clone)]
pub struct Entry {
    pub variant: Ident,
    pub tag: String,
}

/// Represents the complete ontology after tag resolution.
#[derive(Debug)]
pub struct OntologyStructure {
    pub name: Ident,
    pub entries: Vec<Entry>,
}

impl OntologyStructure {
    pub fn parse(args: OntologyArgs) -> syn::Result<Self> {
        let variants = args
            .data
            .take_enum()
            .ok_or_else(|| Error::new_spanned(&args.ident, "Ontology can only be derived for enums"))?;

        if variants.is_empty() {
            return Err(Error::new_spanned(
                &args.ident,
                "Ontology requires at least one variant",
            ));
        }

        let mut seen: HashMap<String, Ident> = HashMap::new();
        let mut entries = Vec::with_capacity(variants.len());

        for variant in variants {
            let tag = match variant.tag {
                Some(tag) => tag,
                None => helpers::rename(&variant.ident.to_string(), args.rename_all),
            };

            if tag.is_empty() {
                return Err(Error::new_spanned(&variant.ident, "Ontology tag must not be empty"));
            }
            if let Some(previous) = seen.get(&tag) {
                return Err(Error::new_spanned(
                    &variant.ident,
                    format!("Duplicate ontology tag \"{tag}\" (already used by {previous})"),
                ));
            }

            seen.insert(tag.clone(), variant.ident.clone());
            entries.push(Entry {
                variant: variant.ident,
                tag,
            });
        }

        Ok(Self {
            name: args.ident,
            entries,
        })
    }
}
