pub mod domain;
pub mod record;
mod table;

pub use domain::{Location, Market, PropertyDomain, UnknownDomain};
pub use record::{
    price_per_m2, ApartmentListing, HouseListing, LandListing, Listing, ListingCommon,
};
pub use table::DomainTable;
