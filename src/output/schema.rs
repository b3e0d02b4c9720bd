//! Column groups of the exported table
//!
//! The groups partition the record field catalogue: every known field sits
//! in exactly one group and no group names an unknown field.

use crate::config::FieldGroupEntry;
use crate::record::known_fields;
use std::collections::HashSet;
use thiserror::Error;

/// Schema errors, raised before any output is written
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("fields missing from the field groups: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("field groups name unknown fields: {}", .0.join(", "))]
    UnknownFields(Vec<String>),

    #[error("field '{0}' appears in more than one group")]
    DuplicateField(String),

    #[error("records produced fields outside the schema: {}", .0.join(", "))]
    UnexpectedFields(Vec<String>),
}

/// Ordered named groups of field names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroups {
    groups: Vec<(String, Vec<String>)>,
}

impl FieldGroups {
    pub fn new(groups: Vec<(String, Vec<String>)>) -> Self {
        Self { groups }
    }

    /// The built-in grouping
    pub fn default_groups() -> Self {
        let group = |name: &str, fields: &[&str]| {
            (
                name.to_string(),
                fields.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
            )
        };

        Self::new(vec![
            group("General", &["title", "description", "author", "copyright"]),
            group("eCommerce", &["cart_software", "has_card", "payment_systems"]),
            group("Marketing", &["phone_numbers", "social_links"]),
            group(
                "Hosting",
                &["ip_address", "ssl_certificate", "protocol", "reverse_dns_lookup"],
            ),
            group(
                "PageDetails",
                &["url", "level", "referer", "status_code", "page_type"],
            ),
            group("Other", &["wayback_url", "wayback_timestamp"]),
        ])
    }

    /// Groups from the config file; an empty list means the built-in grouping
    pub fn from_config(entries: &[FieldGroupEntry]) -> Self {
        if entries.is_empty() {
            return Self::default_groups();
        }
        Self::new(
            entries
                .iter()
                .map(|entry| (entry.name.clone(), entry.fields.clone()))
                .collect(),
        )
    }

    /// Checks that the groups partition `catalogue` exactly
    pub fn validate(&self, catalogue: &[&str]) -> Result<(), SchemaError> {
        let mut grouped = HashSet::new();
        for field in self.fields() {
            if !grouped.insert(field) {
                return Err(SchemaError::DuplicateField(field.to_string()));
            }
        }

        let known: HashSet<&str> = catalogue.iter().copied().collect();

        let unknown: Vec<String> = self
            .fields()
            .filter(|f| !known.contains(f))
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(SchemaError::UnknownFields(unknown));
        }

        let missing: Vec<String> = catalogue
            .iter()
            .filter(|f| !grouped.contains(*f))
            .map(|f| f.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingFields(missing));
        }

        Ok(())
    }

    /// Checks against the record field catalogue
    pub fn validate_catalogue(&self) -> Result<(), SchemaError> {
        self.validate(&known_fields())
    }

    /// All field names, group by group
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|(_, fields)| fields.iter().map(String::as_str))
    }

    /// `(group, field)` for every column, in output order
    pub fn columns(&self) -> Vec<(&str, &str)> {
        self.groups
            .iter()
            .flat_map(|(group, fields)| fields.iter().map(move |f| (group.as_str(), f.as_str())))
            .collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields().any(|f| f == field)
    }
}
