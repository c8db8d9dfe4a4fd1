use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Retailers we know how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retailer {
    SamsClub,
    Atacadao,
    Carrefour,
    Bretas,
}

impl Retailer {
    pub fn display_name(&self) -> &'static str {
        match self {
            Retailer::SamsClub => "Sams Club",
            Retailer::Atacadao => "Atacadão",
            Retailer::Carrefour => "Carrefour",
            Retailer::Bretas => "Bretas",
        }
    }

    pub fn all() -> [Retailer; 4] {
        [
            Retailer::SamsClub,
            Retailer::Atacadao,
            Retailer::Carrefour,
            Retailer::Bretas,
        ]
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// The front end filters on the human-readable store name.
impl Serialize for Retailer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

/// One product listing as returned by a single retailer.
///
/// `None` means the source did not provide the field; `Some("")` means the
/// source provided it and it was blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawProductRecord {
    #[serde(rename = "nome_produto")]
    pub name: Option<String>,
    #[serde(rename = "preco")]
    pub price: Option<f64>,
    pub ean: Option<String>,
    #[serde(rename = "marca")]
    pub brand: Option<String>,
    #[serde(rename = "imagem_url")]
    pub image_url: Option<String>,
    #[serde(rename = "categorias")]
    pub category: Option<String>,
    #[serde(rename = "site")]
    pub source: Retailer,
}

impl RawProductRecord {
    /// Record with only the source tag set.
    pub fn empty(source: Retailer) -> Self {
        Self {
            name: None,
            price: None,
            ean: None,
            brand: None,
            image_url: None,
            category: None,
            source,
        }
    }

    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Weight or volume on a unified grams-or-millilitres scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    Known(f64),
    Unknown,
}

impl Quantity {
    pub fn value(&self) -> Option<f64> {
        match self {
            Quantity::Known(v) => Some(*v),
            Quantity::Unknown => None,
        }
    }

    /// Key rendering: integral values keep a trailing `.0` (`5000.0`).
    pub fn render(&self, unknown_label: &str) -> String {
        match self {
            Quantity::Known(v) => format!("{:?}", v),
            Quantity::Unknown => unknown_label.to_string(),
        }
    }
}

/// Grouping identity derived from a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn compose(normalized_name: &str, category: &str, quantity: &str) -> Self {
        CanonicalKey(format!(
            "{}_{}_{}g",
            normalized_name,
            category.to_lowercase(),
            quantity
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductGroup {
    /// Key of the record that opened the group.
    pub key: CanonicalKey,
    pub records: Vec<RawProductRecord>,
}

/// Groups in creation order.
pub type ProductGroups = Vec<ProductGroup>;
