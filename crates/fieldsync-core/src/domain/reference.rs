//! Reference-cache entities
//!
//! Read-only mirrors of slowly-changing backend data (customers and
//! products) kept locally for offline lookups. These structs carry the wire
//! field names directly: they are what the backend serves, what the cache
//! tables store, and what the repository façades hand back to callers.
//! The backend is inconsistent about product field spellings and sometimes
//! serializes codes as bare numbers, so deserialization is deliberately
//! tolerant.

use serde::{Deserialize, Deserializer, Serialize};

/// Accept a JSON string or number, normalizing to a string
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

fn default_company() -> String {
    "1".to_string()
}

/// A customer row mirrored from the backend
///
/// Natural key: (`enti_clie`, `enti_empr`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer code within the tenant
    #[serde(deserialize_with = "string_or_number")]
    pub enti_clie: String,
    /// Owning company
    #[serde(deserialize_with = "string_or_number", default = "default_company")]
    pub enti_empr: String,
    /// Display name
    pub enti_nome: String,
    /// Customer type discriminator
    #[serde(default)]
    pub enti_tipo_enti: Option<String>,
    /// Natural-person tax id
    #[serde(default)]
    pub enti_cpf: Option<String>,
    /// Legal-entity tax id
    #[serde(default)]
    pub enti_cnpj: Option<String>,
    /// City name
    #[serde(default)]
    pub enti_cida: Option<String>,
}

impl Customer {
    /// Composite cache key, also used as the local row id
    #[must_use]
    pub fn natural_key(&self) -> String {
        format!("{}-{}", self.enti_clie, self.enti_empr)
    }
}

/// A product row mirrored from the backend
///
/// Natural key: (`prod_codi`, `prod_empr`). Aliases cover the alternate
/// spellings some endpoints use (`codigo`, `nome`, `prod_preco_vista`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product code within the tenant
    #[serde(alias = "codigo", deserialize_with = "string_or_number")]
    pub prod_codi: String,
    /// Owning company, defaulting to the main one when omitted
    #[serde(
        alias = "empr",
        deserialize_with = "string_or_number",
        default = "default_company"
    )]
    pub prod_empr: String,
    /// Display name
    #[serde(alias = "nome")]
    pub prod_nome: String,
    /// Cash price
    #[serde(alias = "prod_preco_vista", default)]
    pub preco_vista: f64,
    /// Stock balance
    #[serde(default)]
    pub saldo: f64,
    /// Brand name
    #[serde(default)]
    pub marca_nome: Option<String>,
    /// Product image, base64-encoded
    #[serde(default)]
    pub imagem_base64: Option<String>,
}

impl Product {
    /// Composite cache key, also used as the local row id
    #[must_use]
    pub fn natural_key(&self) -> String {
        format!("{}-{}", self.prod_codi, self.prod_empr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_deserializes_canonical_shape() {
        let customer: Customer = serde_json::from_value(json!({
            "enti_clie": "123",
            "enti_empr": "1",
            "enti_nome": "ACME LTDA",
            "enti_tipo_enti": "J",
            "enti_cnpj": "00.000.000/0001-00"
        }))
        .unwrap();
        assert_eq!(customer.enti_clie, "123");
        assert_eq!(customer.enti_nome, "ACME LTDA");
        assert_eq!(customer.enti_cpf, None);
        assert_eq!(customer.natural_key(), "123-1");
    }

    #[test]
    fn test_customer_tolerates_numeric_codes() {
        let customer: Customer = serde_json::from_value(json!({
            "enti_clie": 123,
            "enti_empr": 2,
            "enti_nome": "ACME LTDA"
        }))
        .unwrap();
        assert_eq!(customer.enti_clie, "123");
        assert_eq!(customer.enti_empr, "2");
    }

    #[test]
    fn test_product_deserializes_canonical_shape() {
        let product: Product = serde_json::from_value(json!({
            "prod_codi": "P-10",
            "prod_empr": "1",
            "prod_nome": "Filtro de oleo",
            "preco_vista": 35.9,
            "saldo": 12.0,
            "marca_nome": "Bosch"
        }))
        .unwrap();
        assert_eq!(product.prod_codi, "P-10");
        assert_eq!(product.preco_vista, 35.9);
        assert_eq!(product.natural_key(), "P-10-1");
    }

    #[test]
    fn test_product_accepts_alternate_spellings() {
        let product: Product = serde_json::from_value(json!({
            "codigo": 77,
            "nome": "Correia dentada",
            "prod_preco_vista": 120.0
        }))
        .unwrap();
        assert_eq!(product.prod_codi, "77");
        assert_eq!(product.prod_empr, "1");
        assert_eq!(product.prod_nome, "Correia dentada");
        assert_eq!(product.preco_vista, 120.0);
        assert_eq!(product.saldo, 0.0);
    }
}
