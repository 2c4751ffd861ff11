use super::domain::PropertyDomain;
use super::record::{ApartmentListing, HouseListing, LandListing};
use serde::{Deserialize, Serialize};

/// Canonical table for one domain.
///
/// Tables are built once by a preprocessor and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "rows", rename_all = "snake_case")]
pub enum DomainTable {
    Lands(Vec<LandListing>),
    Houses(Vec<HouseListing>),
    Apartments(Vec<ApartmentListing>),
}

impl DomainTable {
    pub fn empty(domain: PropertyDomain) -> Self {
        match domain {
            PropertyDomain::Lands => Self::Lands(Vec::new()),
            PropertyDomain::Houses => Self::Houses(Vec::new()),
            PropertyDomain::Apartments => Self::Apartments(Vec::new()),
        }
    }

    pub fn domain(&self) -> PropertyDomain {
        match self {
            Self::Lands(_) => PropertyDomain::Lands,
            Self::Houses(_) => PropertyDomain::Houses,
            Self::Apartments(_) => PropertyDomain::Apartments,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Lands(rows) => rows.len(),
            Self::Houses(rows) => rows.len(),
            Self::Apartments(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.domain().canonical_columns()
    }

    pub fn lands(&self) -> Option<&[LandListing]> {
        match self {
            Self::Lands(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn houses(&self) -> Option<&[HouseListing]> {
        match self {
            Self::Houses(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn apartments(&self) -> Option<&[ApartmentListing]> {
        match self {
            Self::Apartments(rows) => Some(rows),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_reports_its_domain_and_schema() {
        for domain in PropertyDomain::ordered() {
            let table = DomainTable::empty(domain);
            assert_eq!(table.domain(), domain);
            assert!(table.is_empty());
            assert_eq!(table.columns(), domain.canonical_columns());
        }
    }

    #[test]
    fn table_serializes_with_domain_tag() {
        let value = serde_json::to_value(DomainTable::empty(PropertyDomain::Houses))
            .expect("serialize table");
        assert_eq!(value["domain"], "houses");
        assert!(value["rows"].as_array().expect("rows array").is_empty());
    }
}
