use crate::attrs::RenameRule;

/// Applies a rename rule to a `PascalCase` variant name.
pub fn rename(variant: &str, rule: RenameRule) -> String {
    match rule {
        RenameRule::CamelCase => {
            let mut chars = variant.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        RenameRule::SnakeCase => {
            let mut out = String::with_capacity(variant.len() + 4);
            for (i, c) in variant.chars().enumerate() {
                if c.is_uppercase() {
                    if i > 0 {
                        out.push('_');
                    }
                    out.extend(c.to_lowercase());
                } else {
                    out.push(c);
                }
            }
            out
        }
        RenameRule::Lowercase => variant.to_lowercase(),
    }
}
