use std::collections::HashMap;

use serde::Deserialize;

use crate::types::{ListingCandidate, PageResult};

/// Marker attribute of the script tag carrying the page's embedded JSON.
const DATA_BLOCK_MARKER: &str = "id=\"__NEXT_DATA__\"";

/// Feature key under which the advert price is published.
const PRICE_FEATURE: &str = "/price";

/// Decode one fetched result page into listing candidates.
///
/// A page without the embedded data block means pagination walked past the
/// last page of results; that is a stop signal, not an error. A block that
/// is present but undecodable is reported as such so the caller can log it.
pub fn extract_listings(body: &str) -> PageResult {
    let Some(json) = data_block_json(body) else {
        return PageResult::EndOfResults;
    };
    let data: PageData = match serde_json::from_str(json) {
        Ok(d) => d,
        Err(e) => return PageResult::DecodeError(e.to_string()),
    };
    let candidates = data
        .props
        .page_props
        .initial_state
        .items
        .list
        .into_iter()
        .filter_map(|wrapper| wrapper.item)
        .filter_map(|value| serde_json::from_value::<RawItem>(value).ok())
        .filter_map(decode_item)
        .collect();
    PageResult::Page(candidates)
}

/// Slice the JSON text out of the data-block script tag.
fn data_block_json(body: &str) -> Option<&str> {
    let marker = body.find(DATA_BLOCK_MARKER)?;
    let tail = &body[marker..];
    let start = tail.find('>')? + 1;
    let end = tail.find("</script>")?;
    if start >= end {
        return None;
    }
    Some(&tail[start..end])
}

// ---------------------------------------------------------------------------
// Payload shape: only the paths we actually walk
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PageData {
    props: Props,
}

#[derive(Deserialize)]
struct Props {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Deserialize)]
struct PageProps {
    #[serde(rename = "initialState")]
    initial_state: InitialState,
}

#[derive(Deserialize)]
struct InitialState {
    #[serde(default)]
    items: ItemsBlock,
}

#[derive(Deserialize, Default)]
struct ItemsBlock {
    #[serde(default)]
    list: Vec<ItemWrapper>,
}

/// Items are decoded individually from raw JSON so one malformed advert
/// skips that advert, not the whole page.
#[derive(Deserialize)]
struct ItemWrapper {
    #[serde(default)]
    item: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    sold: bool,
    #[serde(default)]
    urls: ItemUrls,
    #[serde(default)]
    geo: ItemGeo,
    #[serde(default)]
    features: HashMap<String, Feature>,
}

#[derive(Deserialize, Default)]
struct ItemUrls {
    #[serde(rename = "default")]
    default_url: Option<String>,
}

#[derive(Deserialize, Default)]
struct ItemGeo {
    #[serde(default)]
    town: Option<Town>,
}

#[derive(Deserialize, Default)]
struct Town {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize, Default)]
struct Feature {
    #[serde(default)]
    values: Vec<FeatureValue>,
}

#[derive(Deserialize, Default)]
struct FeatureValue {
    /// Published as a string on most adverts, occasionally as a number.
    #[serde(default)]
    key: Option<serde_json::Value>,
}

/// Defaulting rules for one advert. The link is the identity key, so an
/// advert without one is dropped entirely.
fn decode_item(item: RawItem) -> Option<ListingCandidate> {
    let link = item.urls.default_url.filter(|l| !l.is_empty())?;
    Some(ListingCandidate {
        link,
        title: item.subject.unwrap_or_else(|| "No Title".to_string()),
        price: decode_price(&item.features),
        sold: item.sold,
        location: item
            .geo
            .town
            .and_then(|t| t.value)
            .unwrap_or_else(|| "Unknown".to_string()),
    })
}

/// Price of an advert in whole euros. Anything missing or malformed
/// decodes to 0 rather than dropping the advert.
fn decode_price(features: &HashMap<String, Feature>) -> i64 {
    let Some(key) = features
        .get(PRICE_FEATURE)
        .and_then(|f| f.values.first())
        .and_then(|v| v.key.as_ref())
    else {
        return 0;
    };
    match key {
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_body(list: serde_json::Value) -> String {
        let payload = json!({
            "props": { "pageProps": { "initialState": { "items": { "list": list } } } }
        });
        format!(
            "<html><head></head><body><script id=\"__NEXT_DATA__\" type=\"application/json\">{payload}</script></body></html>"
        )
    }

    fn candidates(result: PageResult) -> Vec<ListingCandidate> {
        match result {
            PageResult::Page(c) => c,
            other => panic!("expected a decoded page, got {other:?}"),
        }
    }

    #[test]
    fn complete_item_decodes() {
        let body = page_body(json!([{
            "item": {
                "subject": "Bici da corsa",
                "sold": false,
                "urls": { "default": "https://www.subito.it/sport/bici-1.htm" },
                "geo": { "town": { "value": "Milano" } },
                "features": { "/price": { "values": [{ "key": "250" }] } }
            }
        }]));
        let items = candidates(extract_listings(&body));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Bici da corsa");
        assert_eq!(items[0].price, 250);
        assert_eq!(items[0].location, "Milano");
        assert!(!items[0].sold);
    }

    #[test]
    fn numeric_price_key_decodes() {
        let body = page_body(json!([{
            "item": {
                "urls": { "default": "https://example.org/a" },
                "features": { "/price": { "values": [{ "key": 180 }] } }
            }
        }]));
        let items = candidates(extract_listings(&body));
        assert_eq!(items[0].price, 180);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let body = page_body(json!([{
            "item": { "urls": { "default": "https://example.org/a" } }
        }]));
        let items = candidates(extract_listings(&body));
        assert_eq!(items[0].title, "No Title");
        assert_eq!(items[0].location, "Unknown");
        assert_eq!(items[0].price, 0);
        assert!(!items[0].sold);
    }

    #[test]
    fn malformed_price_becomes_zero() {
        let body = page_body(json!([{
            "item": {
                "urls": { "default": "https://example.org/a" },
                "features": { "/price": { "values": [{ "key": "su richiesta" }] } }
            }
        }]));
        let items = candidates(extract_listings(&body));
        assert_eq!(items[0].price, 0);
    }

    #[test]
    fn linkless_item_is_dropped() {
        let body = page_body(json!([
            { "item": { "subject": "ghost" } },
            { "item": { "urls": { "default": "https://example.org/kept" } } }
        ]));
        let items = candidates(extract_listings(&body));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.org/kept");
    }

    #[test]
    fn malformed_item_skips_only_itself() {
        let body = page_body(json!([
            { "item": { "urls": "not-an-object" } },
            { "item": null },
            { "item": { "urls": { "default": "https://example.org/kept" } } }
        ]));
        let items = candidates(extract_listings(&body));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn sold_flag_is_carried() {
        let body = page_body(json!([{
            "item": { "sold": true, "urls": { "default": "https://example.org/a" } }
        }]));
        let items = candidates(extract_listings(&body));
        assert!(items[0].sold);
    }

    #[test]
    fn page_without_data_block_ends_pagination() {
        let body = "<html><body><p>normal page, nothing embedded</p></body></html>";
        assert!(matches!(extract_listings(body), PageResult::EndOfResults));
    }

    #[test]
    fn broken_payload_reports_decode_error() {
        let body =
            "<html><script id=\"__NEXT_DATA__\" type=\"application/json\">{not json}</script></html>";
        assert!(matches!(
            extract_listings(body),
            PageResult::DecodeError(_)
        ));
    }

    #[test]
    fn empty_list_decodes_to_empty_page() {
        let body = page_body(json!([]));
        let items = candidates(extract_listings(&body));
        assert!(items.is_empty());
    }
}
