use super::columns::Projection;
use super::{common_fields, is_incomplete, log_dropped, Preprocess, SchemaMismatch};
use crate::listings::{price_per_m2, ApartmentListing, PropertyDomain};
use crate::source::RawRowSet;

pub struct ApartmentsPreprocessor;

impl Preprocess for ApartmentsPreprocessor {
    type Record = ApartmentListing;

    const DOMAIN: PropertyDomain = PropertyDomain::Apartments;

    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "url",
        "price",
        "utc_created_at",
        "province",
        "location",
        "latitude",
        "longitude",
        "apartment_area",
    ];

    fn transform(rows: &RawRowSet) -> Result<Vec<ApartmentListing>, SchemaMismatch> {
        let projection = Projection::resolve(Self::DOMAIN, rows, Self::REQUIRED_COLUMNS)?;

        let records = projection
            .rows()
            .filter(|row| !is_incomplete(row, "apartment_area"))
            .map(|row| {
                let common = common_fields(&row)?;
                let apartment_area = row.number("apartment_area")?;
                Ok(ApartmentListing {
                    price_per_m2: price_per_m2(common.price, apartment_area),
                    common,
                    apartment_area,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        log_dropped(Self::DOMAIN, rows.len(), records.len(), "missing price, area or url");
        Ok(records)
    }
}
