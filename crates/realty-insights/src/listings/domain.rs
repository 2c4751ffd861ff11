use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three listing categories served by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyDomain {
    Lands,
    Houses,
    Apartments,
}

impl PropertyDomain {
    pub const fn ordered() -> [Self; 3] {
        [Self::Lands, Self::Houses, Self::Apartments]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lands => "lands",
            Self::Houses => "houses",
            Self::Apartments => "apartments",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Lands => "Lands",
            Self::Houses => "Houses",
            Self::Apartments => "Apartments",
        }
    }

    /// Backing table scraped for this domain.
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Lands => "otodom_lands",
            Self::Houses => "otodom_houses",
            Self::Apartments => "otodom_apartments",
        }
    }

    /// Fixed read-everything query issued by the sources.
    pub const fn query(self) -> &'static str {
        match self {
            Self::Lands => "SELECT * FROM otodom_lands",
            Self::Houses => "SELECT * FROM otodom_houses",
            Self::Apartments => "SELECT * FROM otodom_apartments",
        }
    }

    /// Raw column holding the area used for `price_per_m2`.
    pub const fn area_column(self) -> &'static str {
        match self {
            Self::Lands => "land_area",
            Self::Houses => "house_area",
            Self::Apartments => "apartment_area",
        }
    }

    /// Column names of the canonical table, in output order.
    pub const fn canonical_columns(self) -> &'static [&'static str] {
        match self {
            Self::Lands => &[
                "url",
                "price",
                "created_at",
                "province",
                "location",
                "latitude",
                "longitude",
                "land_area",
                "price_per_m2",
            ],
            Self::Houses => &[
                "url",
                "price",
                "created_at",
                "province",
                "location",
                "latitude",
                "longitude",
                "house_area",
                "build_year",
                "market",
                "lot_area",
                "price_per_m2",
            ],
            Self::Apartments => &[
                "url",
                "price",
                "created_at",
                "province",
                "location",
                "latitude",
                "longitude",
                "apartment_area",
                "price_per_m2",
            ],
        }
    }
}

impl fmt::Display for PropertyDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown property domain '{0}', expected one of lands, houses, apartments")]
pub struct UnknownDomain(pub String);

impl FromStr for PropertyDomain {
    type Err = UnknownDomain;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lands" | "land" | "lots" => Ok(Self::Lands),
            "houses" | "house" => Ok(Self::Houses),
            "apartments" | "apartment" => Ok(Self::Apartments),
            _ => Err(UnknownDomain(value.to_string())),
        }
    }
}

/// Where the property sits relative to a town.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Location {
    Suburbs,
    Country,
    City,
    #[serde(rename = "<no data>")]
    NoData,
}

impl Location {
    pub const fn ordered() -> [Self; 4] {
        [Self::Suburbs, Self::Country, Self::City, Self::NoData]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Suburbs => "Suburbs",
            Self::Country => "Country",
            Self::City => "City",
            Self::NoData => "<no data>",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Location {
    type Err = String;

    /// Accepts canonical labels and the raw scraped values.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "suburbs" | "suburban" => Ok(Self::Suburbs),
            "country" => Ok(Self::Country),
            "city" => Ok(Self::City),
            "<no data>" | "no-data" | "none" => Ok(Self::NoData),
            other => Err(format!("unknown location '{other}'")),
        }
    }
}

/// Primary (developer) or secondary (resale) market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Market {
    Primary,
    Secondary,
}

impl Market {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Secondary => "Secondary",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            other => Err(format!("unknown market '{other}'")),
        }
    }
}
