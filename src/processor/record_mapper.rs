use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::models::{RawProductRecord, Retailer};

const NAME_FIELDS: &[&str] = &["nome_produto", "name", "productName", "title"];
const PRICE_FIELDS: &[&str] = &["preco", "price", "Price", "sellingPrice"];
const EAN_FIELDS: &[&str] = &["ean", "gtin"];
const BRAND_FIELDS: &[&str] = &["marca", "brand", "brandName"];
const IMAGE_FIELDS: &[&str] = &["imagem_url", "image_url", "imageUrl", "image"];
const CATEGORY_FIELDS: &[&str] = &["categorias", "category", "categories"];

/// Turns loosely-typed source records into `RawProductRecord`s.
pub struct RecordMapper;

impl RecordMapper {
    pub fn new() -> Self {
        RecordMapper
    }

    pub fn map_all(&self, source: Retailer, items: &[Value]) -> Vec<RawProductRecord> {
        let mut records = Vec::with_capacity(items.len());
        let mut failed_count = 0;

        for (index, item) in items.iter().enumerate() {
            match self.map_record(source, item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    failed_count += 1;
                    warn!("Skipping {} record at index {}: {}", source, index, e);
                }
            }
        }

        info!(
            "Field extraction summary for {}: {} mapped, {} skipped out of {} total",
            source,
            records.len(),
            failed_count,
            items.len()
        );

        records
    }

    /// Missing or unusable fields become `None`; only a non-object record is
    /// an error.
    pub fn map_record(&self, source: Retailer, item: &Value) -> Result<RawProductRecord> {
        let object = item
            .as_object()
            .ok_or_else(|| anyhow!("expected a JSON object, got {}", type_name(item)))?;

        Ok(RawProductRecord {
            name: first_text(object, NAME_FIELDS),
            price: PRICE_FIELDS
                .iter()
                .filter_map(|field| object.get(*field))
                .find_map(|v| self.parse_price(v)),
            ean: first_text(object, EAN_FIELDS),
            brand: first_text(object, BRAND_FIELDS),
            image_url: first_text(object, IMAGE_FIELDS),
            category: first_text(object, CATEGORY_FIELDS),
            source,
        })
    }

    /// Accepts numbers and strings such as `"R$ 5,99"` or `"1.299,90"`.
    pub fn parse_price(&self, value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let cleaned: String = s
                    .chars()
                    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
                    .collect();
                let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
                    // Whichever separator comes last is the decimal one
                    (Some(comma), Some(dot)) if comma > dot => {
                        cleaned.replace('.', "").replace(',', ".")
                    }
                    (Some(_), Some(_)) => cleaned.replace(',', ""),
                    (Some(_), None) => cleaned.replace(',', "."),
                    (None, Some(_)) if cleaned.matches('.').count() > 1 => {
                        cleaned.replace('.', "")
                    }
                    _ => cleaned,
                };
                normalized.parse::<f64>().ok().filter(|p| p.is_finite())
            }
            Value::Array(items) => items.iter().find_map(|v| self.parse_price(v)),
            _ => None,
        }
    }
}

impl Default for RecordMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// First alias present in `object` that yields usable text.
fn first_text(object: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| object.get(*field))
        .find_map(text)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items
            .iter()
            .filter_map(text)
            .find(|s| !s.trim().is_empty()),
        Value::Object(map) => ["name", "brandName", "url"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(text),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
