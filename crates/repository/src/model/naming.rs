//! Naming conventions - repository names and conventional foreign keys

use serde::{Deserialize, Serialize};

/// Suffix appended to a model name to form its repository name
pub const REPOSITORY_SUFFIX: &str = "Repository";

/// Foreign key naming conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyConvention {
    /// customer_id
    Underscore,
    /// customerId
    Camel,
}

impl std::str::FromStr for KeyConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "underscore" | "snake" | "snake_case" => Ok(KeyConvention::Underscore),
            "camel" | "camelcase" => Ok(KeyConvention::Camel),
            _ => Err(format!("Unsupported key convention: {}", s)),
        }
    }
}

/// Repository name for a model: `Customer` -> `CustomerRepository`
pub fn repository_name(model_name: &str) -> String {
    format!("{}{}", model_name, REPOSITORY_SUFFIX)
}

/// Conventional foreign key referencing `model_name`
pub fn foreign_key_name(model_name: &str, convention: KeyConvention) -> String {
    match convention {
        KeyConvention::Underscore => format!("{}_id", to_snake_case(model_name)),
        KeyConvention::Camel => format!("{}Id", to_camel_case(model_name)),
    }
}

/// Relation name implied by a belongsTo key: `parentId` / `parent_id` -> `parent`
pub fn relation_name_from_key(key: &str) -> String {
    for suffix in ["_id", "Id", "ID"] {
        if let Some(stripped) = key.strip_suffix(suffix) {
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    key.to_string()
}

/// Convert `OrderLine` to `order_line`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 && !result.ends_with('_') {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Convert `OrderLine` or `order_line` to `orderLine`
pub fn to_camel_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut upper_next = false;
    for (i, ch) in s.chars().enumerate() {
        if ch == '_' {
            upper_next = !result.is_empty();
        } else if i == 0 || result.is_empty() {
            result.extend(ch.to_lowercase());
        } else if upper_next {
            result.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}
