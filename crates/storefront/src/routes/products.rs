//! Product route handlers.
//!
//! Reads are public; writes require a staff token. The list is paginated and
//! accepts `collection_id`, `title__icontains` and `ordering` query
//! parameters.

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use storefront_core::{CollectionId, ProductId, UnitPrice};

use crate::db::products::{ProductFilter, ProductInput, ProductOrdering};
use crate::db::{CollectionRepository, ProductRepository};
use crate::error::{AppError, NOT_FOUND, Result};
use crate::middleware::RequireStaff;
use crate::models::Product;
use crate::pagination::{Page, PageRequest};
use crate::routes::extract::{JsonBody, PathParams, QueryParams};
use crate::state::AppState;
use crate::validation::{ValidationErrors, check_text};

const MAX_TITLE_LENGTH: usize = 255;
const MAX_SLUG_LENGTH: usize = 50;
const DEFAULT_SLUG: &str = "-";

/// A product as returned by the API.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    pub slug: String,
    pub inventory: i32,
    pub price: UnitPrice,
    pub price_with_tax: Decimal,
    pub collection: CollectionId,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            price_with_tax: product.price_with_tax(),
            id: product.id,
            title: product.title,
            description: product.description,
            slug: product.slug,
            inventory: product.inventory,
            price: product.price,
            collection: product.collection_id,
        }
    }
}

/// List query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub page: Option<String>,
    pub collection_id: Option<String>,
    #[serde(rename = "title__icontains")]
    pub title_icontains: Option<String>,
    pub ordering: Option<String>,
}

impl ProductQuery {
    fn filter(&self) -> std::result::Result<ProductFilter, ValidationErrors> {
        let collection_id = match self.collection_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map(CollectionId::new)
                    .map_err(|_| ValidationErrors::single("collection_id", "Enter a number."))?,
            ),
        };

        Ok(ProductFilter {
            collection_id,
            title_contains: self.title_icontains.clone(),
            ordering: self
                .ordering
                .as_deref()
                .map(ProductOrdering::parse_list)
                .unwrap_or_default(),
        })
    }
}

/// Product create/replace/patch body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductPayload {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub inventory: Option<i64>,
    pub collection: Option<CollectionId>,
}

impl ProductPayload {
    /// Fill absent fields from the stored product (partial update).
    fn merged_with(self, existing: &Product) -> Self {
        Self {
            title: self.title.or_else(|| Some(existing.title.clone())),
            slug: self.slug.or_else(|| Some(existing.slug.clone())),
            description: self.description.or_else(|| existing.description.clone()),
            price: self.price.or(Some(existing.price.amount())),
            inventory: self.inventory.or(Some(i64::from(existing.inventory))),
            collection: self.collection.or(Some(existing.collection_id)),
        }
    }
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Field checks that need no database access.
fn check_fields(errors: &mut ValidationErrors, payload: ProductPayload) -> Option<ProductInput> {
    let title = check_text(errors, "title", payload.title, MAX_TITLE_LENGTH);

    let slug = payload
        .slug
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SLUG.to_owned());
    let slug = if slug.len() > MAX_SLUG_LENGTH {
        errors.add(
            "slug",
            format!("Ensure this field has no more than {MAX_SLUG_LENGTH} characters."),
        );
        None
    } else if is_valid_slug(&slug) {
        Some(slug)
    } else {
        errors.add(
            "slug",
            "Enter a valid \u{201c}slug\u{201d} consisting of lowercase letters, numbers, underscores or hyphens.",
        );
        None
    };

    let price = errors
        .require("price", payload.price)
        .and_then(|p| errors.check("price", UnitPrice::parse(p)));

    let inventory = errors
        .require("inventory", payload.inventory)
        .and_then(|n| {
            if n < 0 {
                errors.add("inventory", "Ensure this value is greater than or equal to 0.");
                return None;
            }
            errors.check(
                "inventory",
                i32::try_from(n).map_err(|_| "Ensure this value is less than or equal to 2147483647."),
            )
        });

    let collection_id = errors.require("collection", payload.collection);

    Some(ProductInput {
        title: title?,
        slug: slug?,
        description: payload
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty()),
        price: price?,
        inventory: inventory?,
        collection_id: collection_id?,
    })
}

/// Validate a full payload, including that the collection exists.
async fn validate(state: &AppState, payload: ProductPayload) -> Result<ProductInput> {
    let mut errors = ValidationErrors::new();
    let collection = payload.collection;
    let input = check_fields(&mut errors, payload);

    if let Some(collection_id) = collection {
        if !CollectionRepository::new(state.pool())
            .exists(collection_id)
            .await?
        {
            errors.add(
                "collection",
                format!("Invalid pk \"{collection_id}\" - object does not exist."),
            );
        }
    }

    errors.finish()?;
    Ok(input.ok_or_else(ValidationErrors::new)?)
}

async fn load(state: &AppState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_owned()))
}

/// `GET /store/products`
///
/// Page links are built from the original URI: inside the `/store` nest the
/// plain `Uri` has the prefix stripped.
#[instrument(skip(state, uri))]
pub async fn index(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProductQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Page<ProductResponse>>> {
    let filter = query.filter()?;
    let page = PageRequest::parse(query.page.as_deref(), state.config().page_size)?;

    let repo = ProductRepository::new(state.pool());
    let count = repo.count(&filter).await?;
    page.ensure_exists(count)?;

    let products = repo.list(&filter, page.limit(), page.offset()).await?;
    let results = products.into_iter().map(ProductResponse::from).collect();

    Ok(Json(Page::new(
        results,
        count,
        page,
        &state.config().base_url,
        &uri,
    )))
}

/// `POST /store/products`
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    JsonBody(payload): JsonBody<ProductPayload>,
) -> Result<impl IntoResponse> {
    let input = validate(&state, payload).await?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;

    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

/// `GET /store/products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    PathParams(id): PathParams<ProductId>,
) -> Result<Json<ProductResponse>> {
    Ok(Json(load(&state, id).await?.into()))
}

/// `PUT /store/products/{id}`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<ProductId>,
    JsonBody(payload): JsonBody<ProductPayload>,
) -> Result<Json<ProductResponse>> {
    load(&state, id).await?;

    let input = validate(&state, payload).await?;
    let product = ProductRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(product.into()))
}

/// `PATCH /store/products/{id}`
#[instrument(skip(state))]
pub async fn partial_update(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<ProductId>,
    JsonBody(payload): JsonBody<ProductPayload>,
) -> Result<Json<ProductResponse>> {
    let existing = load(&state, id).await?;

    let input = validate(&state, payload.merged_with(&existing)).await?;
    let product = ProductRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(product.into()))
}

/// `DELETE /store/products/{id}`
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    PathParams(id): PathParams<ProductId>,
) -> Result<StatusCode> {
    let images = ProductRepository::new(state.pool()).delete(id).await?;

    for path in &images {
        if let Err(e) = state.media().delete(path).await {
            tracing::warn!(error = %e, path = %path, "Failed to remove product image file");
        }
    }

    tracing::info!(product_id = %id, images = images.len(), "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn payload() -> ProductPayload {
        ProductPayload {
            title: Some("Mug".to_owned()),
            slug: Some("mug".to_owned()),
            description: Some("  ".to_owned()),
            price: Some(Decimal::new(1999, 2)),
            inventory: Some(5),
            collection: Some(CollectionId::new(1)),
        }
    }

    #[test]
    fn test_valid_payload() {
        let mut errors = ValidationErrors::new();
        let input = check_fields(&mut errors, payload()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(input.slug, "mug");
        assert_eq!(input.description, None);
        assert_eq!(input.price.amount(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_slug_defaults_to_dash() {
        let mut errors = ValidationErrors::new();
        let input = check_fields(
            &mut errors,
            ProductPayload {
                slug: None,
                ..payload()
            },
        )
        .unwrap();
        assert_eq!(input.slug, "-");
    }

    #[test]
    fn test_invalid_slug() {
        let mut errors = ValidationErrors::new();
        let input = check_fields(
            &mut errors,
            ProductPayload {
                slug: Some("Coffee Mug".to_owned()),
                ..payload()
            },
        );
        assert!(input.is_none());
        assert!(errors.get("slug").is_some());
    }

    #[test]
    fn test_price_messages() {
        let mut errors = ValidationErrors::new();
        check_fields(
            &mut errors,
            ProductPayload {
                price: Some(Decimal::new(-5, 0)),
                ..payload()
            },
        );
        assert_eq!(errors.get("price").unwrap(), ["Price must be positive"]);

        let mut errors = ValidationErrors::new();
        check_fields(
            &mut errors,
            ProductPayload {
                price: Some(Decimal::new(50, 2)),
                ..payload()
            },
        );
        assert_eq!(
            errors.get("price").unwrap(),
            ["Ensure this value is greater than or equal to 1."]
        );
    }

    #[test]
    fn test_missing_fields_all_reported() {
        let mut errors = ValidationErrors::new();
        assert!(check_fields(&mut errors, ProductPayload::default()).is_none());
        for field in ["title", "price", "inventory", "collection"] {
            assert!(errors.get(field).is_some(), "{field} should be required");
        }
        assert!(errors.get("slug").is_none());
    }

    #[test]
    fn test_negative_inventory() {
        let mut errors = ValidationErrors::new();
        check_fields(
            &mut errors,
            ProductPayload {
                inventory: Some(-1),
                ..payload()
            },
        );
        assert_eq!(
            errors.get("inventory").unwrap(),
            ["Ensure this value is greater than or equal to 0."]
        );
    }

    #[test]
    fn test_collection_id_filter_must_be_numeric() {
        let query = ProductQuery {
            collection_id: Some("abc".to_owned()),
            ..ProductQuery::default()
        };
        assert!(query.filter().is_err());

        let query = ProductQuery {
            collection_id: Some("4".to_owned()),
            ordering: Some("-price".to_owned()),
            ..ProductQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.collection_id, Some(CollectionId::new(4)));
        assert_eq!(filter.ordering, vec![ProductOrdering::PriceDesc]);
    }
}
