use super::{ListingSource, RawRowSet, SourceUnavailable};
use crate::listings::PropertyDomain;
use async_trait::async_trait;
use std::collections::HashMap;

/// Fixed row sets keyed by domain. A domain without rows is unavailable.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: HashMap<PropertyDomain, RawRowSet>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: PropertyDomain, rows: RawRowSet) -> Self {
        self.tables.insert(domain, rows);
        self
    }

    pub fn insert(&mut self, domain: PropertyDomain, rows: RawRowSet) {
        self.tables.insert(domain, rows);
    }
}

#[async_trait]
impl ListingSource for InMemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read(&self, domain: PropertyDomain) -> Result<RawRowSet, SourceUnavailable> {
        self.tables.get(&domain).cloned().ok_or_else(|| {
            SourceUnavailable::new(
                domain,
                format!("relation \"{}\" does not exist", domain.table_name()),
            )
        })
    }
}
