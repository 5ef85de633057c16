//! Seed the catalog from a YAML file.
//!
//! The file holds a `products:` list whose entries use the same fields as
//! `POST /api/products`. Every entry is validated before connecting, so a
//! typo never leaves a half-seeded catalog behind.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use riffhouse_storefront::db::Repositories;
use riffhouse_storefront::services::{CatalogError, CatalogService, ProductDraft};

/// Top-level layout of a catalog seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<ProductDraft>,
}

/// Validation problems, one line per bad entry.
fn validate(file: &CatalogFile) -> Vec<String> {
    file.products
        .iter()
        .enumerate()
        .filter_map(|(index, draft)| {
            draft.clone().into_new_product().err().map(|e| {
                let code = draft.code.as_deref().unwrap_or("<no code>");
                format!("entry {} ({code}): {e}", index + 1)
            })
        })
        .collect()
}

/// Insert the products listed in `file_path`. Existing codes are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or the database is unreachable.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;
    info!(products = file.products.len(), "Parsed catalog");

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let repos = Repositories::postgres(super::connect().await?);
    let catalog = CatalogService::new(repos.products.as_ref());

    let (mut inserted, mut skipped) = (0_usize, 0_usize);
    for draft in file.products {
        let code = draft.code.clone().unwrap_or_default();
        match catalog.create(draft).await {
            Ok(product) => {
                info!(id = %product.id, code = %product.code, "Inserted");
                inserted += 1;
            }
            Err(CatalogError::Conflict(_)) => {
                info!(code = %code, "Already exists, skipped");
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_catalog_is_valid() {
        let file: CatalogFile =
            serde_yaml::from_str(include_str!("../../fixtures/catalog.yaml")).unwrap();
        assert!(!file.products.is_empty());
        assert!(validate(&file).is_empty(), "{:?}", validate(&file));
    }

    #[test]
    fn test_validation_names_the_entry() {
        let file: CatalogFile = serde_yaml::from_str(
            r#"
products:
  - title: Nameless
    code: BAD-1
    price: "-5"
"#,
        )
        .unwrap();
        let errors = validate(&file);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("entry 1 (BAD-1)"), "{}", errors[0]);
    }
}
