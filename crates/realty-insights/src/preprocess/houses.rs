use super::columns::Projection;
use super::normalizer::remap_market;
use super::{common_fields, is_incomplete, Preprocess, SchemaMismatch};
use crate::listings::{price_per_m2, HouseListing, PropertyDomain};
use crate::source::RawRowSet;
use tracing::debug;

pub struct HousesPreprocessor;

impl Preprocess for HousesPreprocessor {
    type Record = HouseListing;

    const DOMAIN: PropertyDomain = PropertyDomain::Houses;

    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "url",
        "price",
        "utc_created_at",
        "province",
        "location",
        "latitude",
        "longitude",
        "house_area",
        "build_year",
        "market",
        "lot_area",
    ];

    /// Rows without a build year, price, area or url are dropped.
    fn transform(rows: &RawRowSet) -> Result<Vec<HouseListing>, SchemaMismatch> {
        let projection = Projection::resolve(Self::DOMAIN, rows, Self::REQUIRED_COLUMNS)?;
        let mut houses = Vec::with_capacity(rows.len());

        let (mut incomplete, mut undated) = (0usize, 0usize);
        for row in projection.rows() {
            if is_incomplete(&row, "house_area") {
                incomplete += 1;
                continue;
            }
            let Some(build_year) = row.optional_year("build_year")? else {
                undated += 1;
                continue;
            };

            let common = common_fields(&row)?;
            let house_area = row.number("house_area")?;
            houses.push(HouseListing {
                price_per_m2: price_per_m2(common.price, house_area),
                common,
                house_area,
                build_year,
                market: remap_market(row.raw("market")),
                lot_area: row.optional_number("lot_area")?,
            });
        }

        if incomplete + undated > 0 {
            debug!(
                domain = %Self::DOMAIN,
                incomplete,
                undated,
                "dropped houses without price, area, url or build year"
            );
        }

        Ok(houses)
    }
}
