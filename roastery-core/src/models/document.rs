//! The editable content document and its on-disk representation.
//!
//! A document is persisted as three JSON files:
//! ```text
//! content/site.json        { "site": {...}, "hero": {...}, <sections> }
//! content/navigation.json  { "links": [ {name, href}, ... ] }
//! content/products.json    { "products": [ Product, ... ] }
//! ```
//!
//! In memory the navigation links and products are lifted to the top level,
//! so the tree that paths address looks like
//! `{ "site": {...}, "navigation": [...], "products": [...] }`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use super::navigation::NavLink;
use super::product::Product;
use super::site::SiteContent;

const BUNDLED_SITE: &str = include_str!("../../content/site.json");
const BUNDLED_NAVIGATION: &str = include_str!("../../content/navigation.json");
const BUNDLED_PRODUCTS: &str = include_str!("../../content/products.json");

/// One of the three files a document is split across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentFile {
    Site,
    Navigation,
    Products,
}

impl ContentFile {
    pub const ALL: [ContentFile; 3] = [
        ContentFile::Site,
        ContentFile::Navigation,
        ContentFile::Products,
    ];

    /// Repository-relative path of the file.
    pub fn path(&self) -> &'static str {
        match self {
            ContentFile::Site => "content/site.json",
            ContentFile::Navigation => "content/navigation.json",
            ContentFile::Products => "content/products.json",
        }
    }
}

impl fmt::Display for ContentFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Errors from decoding, encoding or validating a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{file} is not valid content: {source}")]
    Decode {
        file: ContentFile,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {file}: {source}")]
    Encode {
        file: ContentFile,
        #[source]
        source: serde_json::Error,
    },

    #[error("document does not match the content shape: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("duplicate product id: {0}")]
    DuplicateProductId(String),

    #[error("product id must not be empty")]
    EmptyProductId,
}

#[derive(Debug, Serialize, Deserialize)]
struct NavigationFile {
    links: Vec<NavLink>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProductsFile {
    products: Vec<Product>,
}

#[derive(Serialize)]
struct NavigationFileRef<'a> {
    links: &'a [NavLink],
}

#[derive(Serialize)]
struct ProductsFileRef<'a> {
    products: &'a [Product],
}

/// The full editable configuration: site copy, navigation and catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentDocument {
    pub site: SiteContent,
    pub navigation: Vec<NavLink>,
    pub products: Vec<Product>,
}

impl ContentDocument {
    /// The content shipped with the crate, used when nothing else can be loaded.
    pub fn bundled() -> Self {
        // The bundled files are checked by `test_bundled_content_decodes`.
        Self::from_files(BUNDLED_SITE, BUNDLED_NAVIGATION, BUNDLED_PRODUCTS)
            .unwrap_or_else(|e| panic!("bundled content is invalid: {}", e))
    }

    /// Decodes a document from the text of its three files.
    pub fn from_files(site: &str, navigation: &str, products: &str) -> Result<Self, DocumentError> {
        let site: SiteContent = serde_json::from_str(site).map_err(|source| {
            DocumentError::Decode {
                file: ContentFile::Site,
                source,
            }
        })?;
        let navigation: NavigationFile =
            serde_json::from_str(navigation).map_err(|source| DocumentError::Decode {
                file: ContentFile::Navigation,
                source,
            })?;
        let products: ProductsFile =
            serde_json::from_str(products).map_err(|source| DocumentError::Decode {
                file: ContentFile::Products,
                source,
            })?;

        Ok(Self {
            site,
            navigation: navigation.links,
            products: products.products,
        })
    }

    /// Encodes one file as pretty-printed JSON with a trailing newline.
    pub fn encode_file(&self, file: ContentFile) -> Result<String, DocumentError> {
        let encoded = match file {
            ContentFile::Site => serde_json::to_string_pretty(&self.site),
            ContentFile::Navigation => serde_json::to_string_pretty(&NavigationFileRef {
                links: &self.navigation,
            }),
            ContentFile::Products => serde_json::to_string_pretty(&ProductsFileRef {
                products: &self.products,
            }),
        };
        encoded
            .map(|mut text| {
                text.push('\n');
                text
            })
            .map_err(|source| DocumentError::Encode { file, source })
    }

    /// Encodes all three files, in [`ContentFile::ALL`] order.
    pub fn encode_files(&self) -> Result<Vec<(ContentFile, String)>, DocumentError> {
        ContentFile::ALL
            .iter()
            .map(|file| Ok((*file, self.encode_file(*file)?)))
            .collect()
    }

    /// The JSON tree that paths are resolved against.
    pub fn to_tree(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Rebuilds a document from an edited tree, failing if the shape changed.
    pub fn from_tree(tree: Value) -> Result<Self, DocumentError> {
        serde_json::from_value(tree).map_err(DocumentError::Shape)
    }

    /// Checks the invariants a document must satisfy to be saved.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut seen = HashSet::new();
        for product in &self.products {
            if product.id.trim().is_empty() {
                return Err(DocumentError::EmptyProductId);
            }
            if !seen.insert(product.id.as_str()) {
                return Err(DocumentError::DuplicateProductId(product.id.clone()));
            }
        }
        Ok(())
    }

    pub fn find_product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[test]
    fn test_bundled_content_decodes() {
        let doc = ContentDocument::from_files(BUNDLED_SITE, BUNDLED_NAVIGATION, BUNDLED_PRODUCTS)
            .unwrap();
        assert!(!doc.products.is_empty());
        assert!(!doc.navigation.is_empty());
        assert!(doc.validate().is_ok());
        assert!(doc.site.sections.contains_key("footer"));
    }

    #[test]
    fn test_file_paths() {
        assert_eq!(ContentFile::Site.path(), "content/site.json");
        assert_eq!(ContentFile::Navigation.path(), "content/navigation.json");
        assert_eq!(ContentFile::Products.path(), "content/products.json");
    }

    #[test]
    fn test_encode_keeps_file_envelopes() {
        let doc = ContentDocument::bundled();

        let nav: Value = serde_json::from_str(&doc.encode_file(ContentFile::Navigation).unwrap())
            .unwrap();
        let keys: Vec<_> = nav.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["links"]);

        let products: Value =
            serde_json::from_str(&doc.encode_file(ContentFile::Products).unwrap()).unwrap();
        let keys: Vec<_> = products.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["products"]);
    }

    #[test]
    fn test_encode_decode_preserves_site_keys() {
        let doc = ContentDocument::bundled();
        let files = doc.encode_files().unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|(_, text)| text.ends_with('\n')));

        let decoded =
            ContentDocument::from_files(&files[0].1, &files[1].1, &files[2].1).unwrap();
        assert_eq!(decoded, doc);

        let site: Value = serde_json::from_str(&files[0].1).unwrap();
        let original: Value = serde_json::from_str(BUNDLED_SITE).unwrap();
        let mut got: Vec<_> = site.as_object().unwrap().keys().collect();
        let mut want: Vec<_> = original.as_object().unwrap().keys().collect();
        got.sort();
        want.sort();
        assert_eq!(got, want);
    }

    #[test]
    fn test_decode_error_names_file() {
        let err = ContentDocument::from_files(BUNDLED_SITE, "{\"links\": 3}", BUNDLED_PRODUCTS)
            .unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Decode {
                file: ContentFile::Navigation,
                ..
            }
        ));
        assert!(err.to_string().contains("content/navigation.json"));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = ContentDocument::from_files("{", BUNDLED_NAVIGATION, BUNDLED_PRODUCTS).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::Decode {
                file: ContentFile::Site,
                ..
            }
        ));
    }

    #[test]
    fn test_tree_roundtrip() {
        let doc = ContentDocument::bundled();
        let tree = doc.to_tree();
        assert!(tree["navigation"].is_array());
        assert!(tree["products"].is_array());
        assert_eq!(ContentDocument::from_tree(tree).unwrap(), doc);
    }

    #[test]
    fn test_from_tree_rejects_wrong_shape() {
        let mut tree = ContentDocument::bundled().to_tree();
        tree["products"][0]["price"] = Value::String("free".to_string());
        assert!(matches!(
            ContentDocument::from_tree(tree),
            Err(DocumentError::Shape(_))
        ));
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let mut doc = ContentDocument::bundled();
        let mut copy = doc.products[0].clone();
        copy.name = "Copy".to_string();
        doc.products.push(copy);

        let err = doc.validate().unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateProductId(id) if id == doc.products[0].id));
    }

    #[test]
    fn test_validate_empty_id() {
        let mut doc = ContentDocument::bundled();
        doc.products[0].id = " ".to_string();
        assert!(matches!(doc.validate(), Err(DocumentError::EmptyProductId)));
    }

    #[test]
    fn test_find_product() {
        let doc = ContentDocument::bundled();
        let first = doc.products[0].clone();
        assert_eq!(doc.find_product(&first.id), Some(&first));
        assert!(doc.find_product("missing").is_none());
        assert!(doc
            .products
            .iter()
            .any(|p| p.category == Category::Coffee));
    }
}
