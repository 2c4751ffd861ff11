use super::columns::Projection;
use super::{common_fields, is_incomplete, log_dropped, Preprocess, SchemaMismatch};
use crate::listings::{price_per_m2, LandListing, PropertyDomain};
use crate::source::RawRowSet;

pub struct LandsPreprocessor;

impl Preprocess for LandsPreprocessor {
    type Record = LandListing;

    const DOMAIN: PropertyDomain = PropertyDomain::Lands;

    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "price",
        "land_area",
        "utc_created_at",
        "province",
        "location",
        "latitude",
        "longitude",
        "url",
    ];

    fn transform(rows: &RawRowSet) -> Result<Vec<LandListing>, SchemaMismatch> {
        let projection = Projection::resolve(Self::DOMAIN, rows, Self::REQUIRED_COLUMNS)?;

        let records = projection
            .rows()
            .filter(|row| !is_incomplete(row, "land_area"))
            .map(|row| {
                let common = common_fields(&row)?;
                let land_area = row.number("land_area")?;
                Ok(LandListing {
                    price_per_m2: price_per_m2(common.price, land_area),
                    common,
                    land_area,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        log_dropped(Self::DOMAIN, rows.len(), records.len(), "missing price, area or url");
        Ok(records)
    }
}
