//! URL query-string codec for [`FilterState`].
//!
//! Owned parameters: `page`, `minPrice`, `maxPrice`, `brand` (comma-joined;
//! repeated values are also accepted on decode), `category`, `sort` and
//! `type=rost`. A parameter is emitted only when it differs from its default,
//! and min/max price stay out when equal to the server-supplied bounds, so a
//! pristine state encodes to an empty string.

use url::form_urlencoded;

use super::state::{FilterState, PriceBounds, SortKey};

/// Encode only the non-default axes of a state as a query string (no `?`).
pub fn encode(state: &FilterState, bounds: Option<PriceBounds>) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());

    if state.page > 1 {
        ser.append_pair("page", &state.page.to_string());
    }
    if let Some(min) = state.min_price {
        if bounds.map_or(true, |b| min != b.min) {
            ser.append_pair("minPrice", &min.to_string());
        }
    }
    if let Some(max) = state.max_price {
        if bounds.map_or(true, |b| max != b.max) {
            ser.append_pair("maxPrice", &max.to_string());
        }
    }
    if !state.brands.is_empty() {
        ser.append_pair("brand", &state.brands.join(","));
    }
    if !state.categories.is_empty() {
        ser.append_pair("category", &state.categories.join(","));
    }
    if state.sort != SortKey::Default {
        ser.append_pair("sort", state.sort.as_str());
    }
    if state.rost {
        ser.append_pair("type", "rost");
    }
    ser.finish()
}

/// Decode a query string (with or without the leading `?`) into a state.
/// Unknown parameters are ignored; a missing parameter means "default" for
/// that axis.
pub fn decode(raw: &str) -> FilterState {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut state = FilterState::default();

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "page" => {
                if let Ok(page) = value.parse::<u32>() {
                    state.page = page.max(1);
                }
            }
            "minPrice" => state.min_price = value.parse().ok(),
            "maxPrice" => state.max_price = value.parse().ok(),
            "brand" => push_ids(&mut state.brands, &value),
            // The two legacy filter UIs spelled this axis differently.
            "category" | "nomenclature" => push_ids(&mut state.categories, &value),
            "sort" => {
                if let Some(sort) = SortKey::parse(&value) {
                    state.sort = sort;
                }
            }
            "type" => state.rost = value == "rost",
            _ => {}
        }
    }
    state
}

fn push_ids(target: &mut Vec<String>, value: &str) {
    for id in value.split(',').filter(|s| !s.is_empty()) {
        if !target.iter().any(|existing| existing == id) {
            target.push(id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_encodes_to_empty_query() {
        assert_eq!(encode(&FilterState::default(), None), "");
    }

    #[test]
    fn round_trips_brands_and_min_price() {
        let state = FilterState {
            brands: vec!["b1".into(), "b2".into()],
            min_price: Some(100),
            ..FilterState::default()
        };
        let raw = encode(&state, None);
        let back = decode(&raw);
        assert_eq!(back.brands, vec!["b1", "b2"]);
        assert_eq!(back.min_price, Some(100));
        assert_eq!(back, state);
    }

    #[test]
    fn prices_equal_to_server_bounds_stay_out_of_the_url() {
        let state = FilterState {
            min_price: Some(50),
            max_price: Some(5000),
            ..FilterState::default()
        };
        let bounds = PriceBounds { min: 50, max: 5000 };
        assert_eq!(encode(&state, Some(bounds)), "");

        let narrowed = FilterState {
            min_price: Some(100),
            max_price: Some(5000),
            ..FilterState::default()
        };
        assert_eq!(encode(&narrowed, Some(bounds)), "minPrice=100");
    }

    #[test]
    fn decode_accepts_repeated_and_comma_joined_brands() {
        let state = decode("brand=b1,b2&brand=b3&brand=b2");
        assert_eq!(state.brands, vec!["b1", "b2", "b3"]);
    }

    #[test]
    fn decode_tolerates_junk() {
        let state = decode("?page=zero&sort=upside-down&utm_source=mail");
        assert_eq!(state, FilterState::default());
    }

    #[test]
    fn rost_source_selector_round_trips() {
        let state = FilterState {
            rost: true,
            ..FilterState::default()
        };
        let raw = encode(&state, None);
        assert_eq!(raw, "type=rost");
        assert!(decode(&raw).rost);
    }

    #[test]
    fn page_is_emitted_only_past_the_first() {
        let state = FilterState {
            page: 3,
            ..FilterState::default()
        };
        assert_eq!(encode(&state, None), "page=3");
        assert_eq!(decode("page=3").page, 3);
        assert_eq!(decode("").page, 1);
    }

    #[test]
    fn nomenclature_is_an_alias_for_category() {
        let state = decode("nomenclature=7&category=9");
        assert_eq!(state.categories, vec!["7", "9"]);
    }
}
