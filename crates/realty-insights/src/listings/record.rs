use super::domain::{Location, Market, PropertyDomain};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Columns shared by every canonical listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingCommon {
    pub url: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub province: Option<String>,
    pub location: Location,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandListing {
    #[serde(flatten)]
    pub common: ListingCommon,
    pub land_area: f64,
    pub price_per_m2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseListing {
    #[serde(flatten)]
    pub common: ListingCommon,
    pub house_area: f64,
    pub build_year: i32,
    pub market: Option<Market>,
    pub lot_area: Option<f64>,
    pub price_per_m2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentListing {
    #[serde(flatten)]
    pub common: ListingCommon,
    pub apartment_area: f64,
    pub price_per_m2: Option<f64>,
}

/// Read access shared by the filter engine and the report aggregations.
///
/// Dimensions a domain does not carry report `None`.
pub trait Listing {
    const DOMAIN: PropertyDomain;

    fn common(&self) -> &ListingCommon;
    fn area(&self) -> f64;
    fn price_per_m2(&self) -> Option<f64>;

    fn build_year(&self) -> Option<i32> {
        None
    }

    fn market(&self) -> Option<Market> {
        None
    }

    fn price(&self) -> f64 {
        self.common().price
    }

    fn created_on(&self) -> NaiveDate {
        self.common().created_at.date_naive()
    }
}

impl Listing for LandListing {
    const DOMAIN: PropertyDomain = PropertyDomain::Lands;

    fn common(&self) -> &ListingCommon {
        &self.common
    }

    fn area(&self) -> f64 {
        self.land_area
    }

    fn price_per_m2(&self) -> Option<f64> {
        self.price_per_m2
    }
}

impl Listing for HouseListing {
    const DOMAIN: PropertyDomain = PropertyDomain::Houses;

    fn common(&self) -> &ListingCommon {
        &self.common
    }

    fn area(&self) -> f64 {
        self.house_area
    }

    fn price_per_m2(&self) -> Option<f64> {
        self.price_per_m2
    }

    fn build_year(&self) -> Option<i32> {
        Some(self.build_year)
    }

    fn market(&self) -> Option<Market> {
        self.market
    }
}

impl Listing for ApartmentListing {
    const DOMAIN: PropertyDomain = PropertyDomain::Apartments;

    fn common(&self) -> &ListingCommon {
        &self.common
    }

    fn area(&self) -> f64 {
        self.apartment_area
    }

    fn price_per_m2(&self) -> Option<f64> {
        self.price_per_m2
    }
}

/// Price per square metre as plain division; non-positive areas yield `None`.
pub fn price_per_m2(price: f64, area: f64) -> Option<f64> {
    if area > 0.0 {
        Some(price / area)
    } else {
        None
    }
}
