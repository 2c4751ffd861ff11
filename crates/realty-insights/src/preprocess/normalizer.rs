use crate::listings::{Location, Market};
use crate::source::RawValue;

pub(crate) fn normalize_category(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_ascii_lowercase()
}

/// Total mapping: anything other than the three scraped labels is `<no data>`.
pub(crate) fn remap_location(value: &RawValue) -> Location {
    let RawValue::Text(raw) = value else {
        return Location::NoData;
    };

    match normalize_category(raw).as_str() {
        "suburban" => Location::Suburbs,
        "country" => Location::Country,
        "city" => Location::City,
        _ => Location::NoData,
    }
}

pub(crate) fn remap_market(value: &RawValue) -> Option<Market> {
    let RawValue::Text(raw) = value else {
        return None;
    };

    match normalize_category(raw).as_str() {
        "primary" => Some(Market::Primary),
        "secondary" => Some(Market::Secondary),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_remap_is_total() {
        let cases = [
            (RawValue::from("suburban"), Location::Suburbs),
            (RawValue::from("country"), Location::Country),
            (RawValue::from(" City "), Location::City),
            (RawValue::from("mountains"), Location::NoData),
            (RawValue::from(""), Location::NoData),
            (RawValue::Null, Location::NoData),
            (RawValue::Int(3), Location::NoData),
        ];

        for (raw, expected) in cases {
            assert_eq!(remap_location(&raw), expected, "remapping {raw:?}");
        }
    }

    #[test]
    fn market_remap_recognizes_scraped_labels() {
        assert_eq!(remap_market(&RawValue::from("PRIMARY")), Some(Market::Primary));
        assert_eq!(remap_market(&RawValue::from("SECONDARY")), Some(Market::Secondary));
        assert_eq!(remap_market(&RawValue::from("auction")), None);
        assert_eq!(remap_market(&RawValue::Null), None);
    }

    #[test]
    fn normalize_category_strips_invisible_characters() {
        assert_eq!(normalize_category("\u{feff}Sub  urban "), "sub urban");
    }
}
