//! Decoding of search-result titles into catalog fields.
//!
//! Each index encodes business identifiers in the image title with its own
//! layout. [`IndexPattern`] is the closed set of layouts we know about; any
//! other index name decodes to the raw title.

use serde::Serialize;
use std::fmt;

pub const UNKNOWN_FIELD: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogTier {
    Standard,
    Pro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductLine {
    Part,
    Used,
    Packaging,
}

impl ProductLine {
    fn as_str(self) -> &'static str {
        match self {
            ProductLine::Part => "part",
            ProductLine::Used => "used",
            ProductLine::Packaging => "packaging",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexPattern {
    /// `product-type-code-<line>` and `product-pro-type-code-<line>`; title is `type-code-...`.
    ProductTypeCode { tier: CatalogTier, line: ProductLine },
    /// `product-carmodelclean`; title is `model-...`.
    CarModelClean,
    /// `product-carmodel-type-code-used`; title is `model.type.code...`.
    CarModelTypeCode,
    Other(String),
}

impl IndexPattern {
    pub fn parse(index_name: &str) -> Self {
        let (tier, rest) = match index_name.strip_prefix("product-pro-") {
            Some(rest) => (CatalogTier::Pro, rest),
            None => match index_name.strip_prefix("product-") {
                Some(rest) => (CatalogTier::Standard, rest),
                None => return IndexPattern::Other(index_name.to_string()),
            },
        };

        let line = match rest {
            "type-code-part" => Some(ProductLine::Part),
            "type-code-used" => Some(ProductLine::Used),
            "type-code-packaging" => Some(ProductLine::Packaging),
            _ => None,
        };

        match (tier, line, rest) {
            (_, Some(line), _) => IndexPattern::ProductTypeCode { tier, line },
            (CatalogTier::Standard, None, "carmodelclean") => IndexPattern::CarModelClean,
            (CatalogTier::Standard, None, "carmodel-type-code-used") => {
                IndexPattern::CarModelTypeCode
            }
            _ => IndexPattern::Other(index_name.to_string()),
        }
    }

    pub fn decode(&self, title: &str) -> DecodedFields {
        match self {
            IndexPattern::ProductTypeCode { .. } => {
                let parts: Vec<&str> = title.split('-').collect();
                DecodedFields::Product {
                    product_type: segment(&parts, 0),
                    product_code: segment(&parts, 1),
                }
            }
            IndexPattern::CarModelClean => {
                let parts: Vec<&str> = title.split('-').collect();
                DecodedFields::CarModel {
                    model_cars: segment(&parts, 0),
                }
            }
            IndexPattern::CarModelTypeCode => {
                let parts: Vec<&str> = title.split('.').collect();
                DecodedFields::CarModelProduct {
                    model_cars: segment(&parts, 0),
                    product_type: segment(&parts, 1),
                    product_code: segment(&parts, 2),
                }
            }
            IndexPattern::Other(_) => DecodedFields::Fallback {
                title: title.to_string(),
                fallback_decoding: true,
            },
        }
    }
}

impl fmt::Display for IndexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexPattern::ProductTypeCode { tier, line } => {
                let prefix = match tier {
                    CatalogTier::Standard => "product",
                    CatalogTier::Pro => "product-pro",
                };
                write!(f, "{prefix}-type-code-{}", line.as_str())
            }
            IndexPattern::CarModelClean => f.write_str("product-carmodelclean"),
            IndexPattern::CarModelTypeCode => f.write_str("product-carmodel-type-code-used"),
            IndexPattern::Other(name) => f.write_str(name),
        }
    }
}

/// Business fields extracted from one title. Never partially filled:
/// absent segments carry [`UNKNOWN_FIELD`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedFields {
    #[serde(rename_all = "camelCase")]
    Product {
        product_type: String,
        product_code: String,
    },
    #[serde(rename_all = "camelCase")]
    CarModel { model_cars: String },
    #[serde(rename_all = "camelCase")]
    CarModelProduct {
        model_cars: String,
        product_type: String,
        product_code: String,
    },
    #[serde(rename_all = "camelCase")]
    Fallback {
        title: String,
        fallback_decoding: bool,
    },
}

pub fn decode_title(title: &str, index_name: &str) -> DecodedFields {
    IndexPattern::parse(index_name).decode(title)
}

fn segment(parts: &[&str], position: usize) -> String {
    parts
        .get(position)
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| UNKNOWN_FIELD.to_string())
}
