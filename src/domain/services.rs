//! Reshapes the free-form JSON stored in `sales.description` into service
//! line items.
//!
//! Descriptions come from several upstream tools, each spelling its fields
//! differently (Portuguese or English, with or without accents). Field lookup
//! therefore compares keys after stripping diacritics and lowercasing, and
//! tries the candidate spellings below in order. The first candidate present
//! on the item wins, even when its value turns out to be unusable.
//!
//! | field    | candidates, in priority order                                          |
//! |----------|------------------------------------------------------------------------|
//! | name     | name, title, description, descricao, servico, serviço, produto, product |
//! | quantity | quantity, qty, qtd, quantidade, qtde, qtdade, amount                    |
//! | price    | price, valor, value, total, preco, preço                                |
//!
//! Line items are taken from the description itself when it is an array,
//! otherwise from its `services` array, otherwise from its `items` array.

use crate::domain::model::SaleService;
use serde_json::{Map, Value};
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const NAME_KEYS: &[&str] = &[
    "name",
    "title",
    "description",
    "descricao",
    "servico",
    "serviço",
    "produto",
    "product",
];
const QUANTITY_KEYS: &[&str] = &[
    "quantity",
    "qty",
    "qtd",
    "quantidade",
    "qtde",
    "qtdade",
    "amount",
];
const PRICE_KEYS: &[&str] = &["price", "valor", "value", "total", "preco", "preço"];

pub fn normalize_services(description: Option<&Value>) -> Vec<SaleService> {
    let parsed = match description {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(_) => return Vec::new(),
        },
        Some(value) => value.clone(),
    };

    candidate_items(&parsed)
        .iter()
        .filter_map(normalize_item)
        .collect()
}

fn candidate_items(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Object(record) => ["services", "items"]
            .iter()
            .find_map(|key| record.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

fn normalize_item(item: &Value) -> Option<SaleService> {
    let record = item.as_object()?;
    let normalized = normalized_entries(record);

    let name = pick_value(&normalized, NAME_KEYS).and_then(as_text);
    let quantity = pick_value(&normalized, QUANTITY_KEYS).and_then(as_number);
    let price = pick_value(&normalized, PRICE_KEYS).and_then(as_number);

    if name.is_none() && quantity.is_none() && price.is_none() {
        return None;
    }
    Some(SaleService {
        name,
        quantity,
        price,
    })
}

/// Lowercase with diacritics removed: `Serviço` -> `servico`.
pub fn normalize_key(key: &str) -> String {
    key.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn normalized_entries(record: &Map<String, Value>) -> HashMap<String, &Value> {
    record
        .iter()
        .map(|(key, value)| (normalize_key(key), value))
        .collect()
}

fn pick_value<'a>(entries: &HashMap<String, &'a Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| entries.get(&normalize_key(key)).copied())
}

fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => parse_locale_number(text),
        _ => None,
    }
}

/// Parses `"R$ 1.234,56"`, `"1234.5"` or `"12"`. A comma after the last dot
/// is the decimal separator and dots before it are grouping. Strings without
/// any digit yield `None`.
pub fn parse_locale_number(text: &str) -> Option<f64> {
    let sanitized: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if !sanitized.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let comma_is_decimal = match (sanitized.rfind(','), sanitized.rfind('.')) {
        (Some(comma), Some(dot)) => comma >= dot,
        (Some(_), None) => true,
        _ => false,
    };
    let normalized = if comma_is_decimal {
        sanitized.replace('.', "").replacen(',', ".", 1)
    } else {
        sanitized
    };

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}
