use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, warn};
use wreq::{Client, Response, Url};
use wreq_util::Emulation;

use crate::config::SourceConfig;
use crate::fetcher::ProductSource;
use crate::fetcher::json_path::lookup;
use crate::models::Retailer;
use crate::processor::clean_search_term;

/// Retailer search endpoint described entirely by a `SourceConfig`.
pub struct HttpSource {
    client: Client,
    config: SourceConfig,
}

impl HttpSource {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .emulation(Emulation::Firefox136)
            .build()?;

        Ok(HttpSource { client, config })
    }

    async fn send(&self, term: &str) -> Result<Response> {
        let mut request = if self.config.is_post() {
            let body = self
                .config
                .build_request_body(term)
                .ok_or_else(|| anyhow!("POST source {} has no request body", self.config.source.id))?;
            self.client
                .post(&self.config.source.endpoint)
                .header("Content-Type", "application/json")
                .json(&body)
        } else if self.config.request.method.eq_ignore_ascii_case("GET") {
            let url = match self.config.request.search_param {
                Some(ref param) => {
                    Url::parse_with_params(&self.config.source.endpoint, &[(param.as_str(), term)])?
                }
                None => Url::parse(&self.config.source.endpoint)?,
            };
            self.client.get(url)
        } else {
            return Err(anyhow!("Unsupported HTTP method: {}", self.config.request.method));
        };

        for (key, value) in &self.config.request.headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        Ok(response)
    }

    /// Product nodes under `data_path`, each projected onto the record
    /// field names. Fields whose path doesn't resolve are left out and
    /// category labels are cleaned like search terms.
    pub fn extract_products(&self, data: &Value) -> Vec<Value> {
        let Some(nodes) = lookup(data, &self.config.response.data_path).and_then(|v| v.as_array())
        else {
            warn!(
                "No product array at '{}' in {} response",
                self.config.response.data_path, self.config.source.id
            );
            return Vec::new();
        };

        nodes.iter().map(|node| self.project(node)).collect()
    }

    fn project(&self, node: &Value) -> Value {
        let fields = &self.config.fields;
        let mut record = Map::new();

        let paths = [
            ("nome_produto", Some(&fields.name)),
            ("preco", fields.price.as_ref()),
            ("ean", fields.ean.as_ref()),
            ("marca", fields.brand.as_ref()),
            ("imagem_url", fields.image_url.as_ref()),
            ("categorias", fields.category.as_ref()),
        ];

        for (key, path) in paths {
            let Some(value) = path.and_then(|p| lookup(node, p)) else {
                continue;
            };
            match value {
                Value::Null => {}
                // Category labels come back as breadcrumbs like "/Mercearia/Grãos/"
                Value::String(label) if key == "categorias" => {
                    record.insert(key.to_string(), Value::String(clean_search_term(label)));
                }
                _ => {
                    record.insert(key.to_string(), value.clone());
                }
            }
        }

        Value::Object(record)
    }
}

#[async_trait]
impl ProductSource for HttpSource {
    fn id(&self) -> Retailer {
        self.config.source.id
    }

    async fn fetch(&self, term: &str) -> Result<Vec<Value>> {
        let term = clean_search_term(term);
        info!("Searching {} for '{}'", self.config.source.id, term);

        let response = self.send(&term).await?;
        let data: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", self.config.source.id))?;

        let products = self.extract_products(&data);
        info!("Found {} products at {}", products.len(), self.config.source.id);

        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ATACADAO: &str = r#"
        [source]
        id = "atacadao"
        endpoint = "https://www.atacadao.com.br/api/graphql"

        [request]
        method = "POST"

        [request.body.variables]
        term = "{term}"

        [response]
        data_path = "data.search.products.edges"

        [fields]
        name = "node.name"
        price = "node.offers.offers.0.price"
        ean = "node.gtin"
        brand = "node.brand.brandName"
        image_url = "node.image.0.url"
        category = "node.breadcrumbList.itemListElement.0.name"
    "#;

    fn source() -> HttpSource {
        HttpSource::new(SourceConfig::from_toml_str(ATACADAO).unwrap()).unwrap()
    }

    #[test]
    fn test_extract_products_projects_fields() {
        let data = json!({
            "data": { "search": { "products": { "edges": [
                {
                    "node": {
                        "name": "Arroz Agulhinha Tipo 1 5kg",
                        "gtin": "7896079900012",
                        "brand": { "brandName": "Camil" },
                        "image": [{ "url": "https://img/arroz.jpg" }],
                        "offers": { "offers": [{ "price": 24.9 }] },
                        "breadcrumbList": { "itemListElement": [{ "name": "Mercearia" }] }
                    }
                },
                { "node": { "name": "Arroz sem oferta", "gtin": null } }
            ] } } }
        });

        let products = source().extract_products(&data);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0]["nome_produto"], "Arroz Agulhinha Tipo 1 5kg");
        assert_eq!(products[0]["preco"], 24.9);
        assert_eq!(products[0]["marca"], "Camil");
        assert_eq!(products[0]["imagem_url"], "https://img/arroz.jpg");
        assert_eq!(products[0]["categorias"], "mercearia");
        assert!(products[1].get("preco").is_none());
        assert!(products[1].get("ean").is_none());
    }

    #[test]
    fn test_unexpected_shape_yields_nothing() {
        assert!(source().extract_products(&json!({ "errors": ["boom"] })).is_empty());
        assert!(source().extract_products(&json!([])).is_empty());
    }

    #[test]
    fn test_reports_its_retailer() {
        assert_eq!(source().id(), Retailer::Atacadao);
    }
}
