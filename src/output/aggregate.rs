//! Record aggregation
//!
//! Collapses per-page records into one row per requested domain.

use super::schema::{FieldGroups, SchemaError};
use crate::domains::RequestedDomain;
use crate::record::{PageKind, PageRecord};
use crate::url::website_identity;
use std::collections::{BTreeMap, HashMap, HashSet};

/// One output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebsiteAggregate {
    /// Source line of the requested domain
    pub line: usize,

    /// Website identity the row was joined on
    pub website: String,

    /// Per field: non-empty values, deduplicated in first-seen order
    pub fields: BTreeMap<String, Vec<String>>,
}

impl WebsiteAggregate {
    fn empty(line: usize, website: String) -> Self {
        Self {
            line,
            website,
            fields: BTreeMap::new(),
        }
    }

    /// True when no field has a value
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Vec::is_empty)
    }

    pub fn values(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Groups records by website and reindexes them over the requested domains
#[derive(Debug, Clone)]
pub struct Aggregator {
    groups: FieldGroups,
}

impl Aggregator {
    /// Validates the schema against the record field catalogue
    ///
    /// # Returns
    ///
    /// * `Ok(Aggregator)` - The groups partition the catalogue
    /// * `Err(SchemaError)` - A field is missing, unknown or grouped twice
    pub fn new(groups: FieldGroups) -> Result<Self, SchemaError> {
        groups.validate_catalogue()?;
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &FieldGroups {
        &self.groups
    }

    /// Builds one row per requested domain, in list order
    ///
    /// Records are grouped by `website`; within a group the homepage comes
    /// first, then records by URL. Requested domains without records get an
    /// empty row. Groups for websites outside the request are logged and
    /// dropped.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<WebsiteAggregate>)` - Exactly one row per requested domain
    /// * `Err(SchemaError)` - A record produced a field the schema lacks
    pub fn aggregate(
        &self,
        records: &[PageRecord],
        requested: &[RequestedDomain],
    ) -> Result<Vec<WebsiteAggregate>, SchemaError> {
        let mut by_website: HashMap<&str, Vec<&PageRecord>> = HashMap::new();
        for record in records {
            by_website.entry(record.website.as_str()).or_default().push(record);
        }

        let mut collapsed: HashMap<&str, BTreeMap<String, Vec<String>>> = HashMap::new();
        for (website, mut group) in by_website {
            group.sort_by(|a, b| {
                (a.kind() != PageKind::Homepage, a.url.as_str())
                    .cmp(&(b.kind() != PageKind::Homepage, b.url.as_str()))
            });
            collapsed.insert(website, self.collapse(&group)?);
        }

        let requested_websites: HashSet<String> = requested
            .iter()
            .map(|r| website_identity(&r.domain))
            .collect();
        for website in collapsed.keys() {
            if !requested_websites.contains(*website) {
                tracing::warn!("Dropping records for unrequested website {}", website);
            }
        }

        let rows = requested
            .iter()
            .map(|r| {
                let website = website_identity(&r.domain);
                match collapsed.get(website.as_str()) {
                    Some(fields) => WebsiteAggregate {
                        line: r.line,
                        website,
                        fields: fields.clone(),
                    },
                    None => {
                        tracing::debug!("No records for line {} ({})", r.line, r.domain);
                        WebsiteAggregate::empty(r.line, website)
                    }
                }
            })
            .collect();

        Ok(rows)
    }

    fn collapse(&self, group: &[&PageRecord]) -> Result<BTreeMap<String, Vec<String>>, SchemaError> {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut unexpected = Vec::new();

        for record in group {
            for (name, values) in record.field_values() {
                if !self.groups.contains(name) {
                    if !unexpected.iter().any(|u| u == name) {
                        unexpected.push(name.to_string());
                    }
                    continue;
                }

                let collected = fields.entry(name.to_string()).or_default();
                for value in values {
                    if !collected.contains(&value) {
                        collected.push(value);
                    }
                }
            }
        }

        if !unexpected.is_empty() {
            return Err(SchemaError::UnexpectedFields(unexpected));
        }
        Ok(fields)
    }
}
