//! Seed the catalog with demo data.
//!
//! Every record is looked up by its natural key first, so running the
//! command twice leaves the database unchanged.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use storefront::config::database_url_from_env;
use storefront::db::products::ProductInput;
use storefront::db::{
    self, CollectionRepository, ProductRepository, PromotionRepository, RepositoryError,
    TagRepository,
};
use storefront::models::{Collection, Product, Promotion, Tag};
use storefront_core::{ContentType, UnitPrice};

type SeedResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Demo product: title, slug, price in cents, inventory, collection title.
struct DemoProduct {
    title: &'static str,
    slug: &'static str,
    price_cents: i64,
    inventory: i32,
    collection: &'static str,
}

const COLLECTIONS: &[&str] = &["Beverages", "Snacks", "Pantry"];

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        title: "Cold Brew Coffee",
        slug: "cold-brew-coffee",
        price_cents: 499,
        inventory: 40,
        collection: "Beverages",
    },
    DemoProduct {
        title: "Sparkling Water",
        slug: "sparkling-water",
        price_cents: 150,
        inventory: 120,
        collection: "Beverages",
    },
    DemoProduct {
        title: "Sea Salt Crisps",
        slug: "sea-salt-crisps",
        price_cents: 275,
        inventory: 60,
        collection: "Snacks",
    },
    DemoProduct {
        title: "Dark Chocolate Bar",
        slug: "dark-chocolate-bar",
        price_cents: 350,
        inventory: 0,
        collection: "Snacks",
    },
    DemoProduct {
        title: "Olive Oil",
        slug: "olive-oil",
        price_cents: 1299,
        inventory: 15,
        collection: "Pantry",
    },
];

/// Promotion description, discount and the slugs it applies to.
const PROMOTIONS: &[(&str, f64, &[&str])] = &[
    ("Summer drinks", 0.15, &["cold-brew-coffee", "sparkling-water"]),
    ("Snack attack", 0.1, &["sea-salt-crisps"]),
];

/// Tag label and the product slugs it is attached to.
const TAGS: &[(&str, &[&str])] = &[
    ("organic", &["olive-oil", "dark-chocolate-bar"]),
    ("bestseller", &["cold-brew-coffee"]),
];

/// Insert the demo catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a write fails.
pub async fn run() -> SeedResult<()> {
    let database_url = database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    for title in COLLECTIONS {
        collection(&pool, title).await?;
    }

    for demo in PRODUCTS {
        product(&pool, demo).await?;
    }

    let products = ProductRepository::new(&pool);
    for (description, discount, slugs) in PROMOTIONS {
        let promotion = promotion(&pool, description, *discount).await?;
        let promotions = PromotionRepository::new(&pool);
        for slug in *slugs {
            if let Some(p) = products.find_by_slug(slug).await? {
                promotions.attach(p.id, promotion.id).await?;
            }
        }
    }

    for (label, slugs) in TAGS {
        let tag = tag(&pool, label).await?;
        for slug in *slugs {
            if let Some(p) = products.find_by_slug(slug).await? {
                tag_product(&pool, &tag, &p).await?;
            }
        }
    }

    info!("Seeding complete");
    Ok(())
}

async fn collection(pool: &PgPool, title: &str) -> Result<Collection, RepositoryError> {
    let repo = CollectionRepository::new(pool);
    if let Some(existing) = repo.find_by_title(title).await? {
        return Ok(existing);
    }
    let created = repo.create(title, None).await?;
    info!(collection_id = %created.id, title, "Collection created");
    Ok(created)
}

async fn product(pool: &PgPool, demo: &DemoProduct) -> SeedResult<Product> {
    let repo = ProductRepository::new(pool);
    if let Some(existing) = repo.find_by_slug(demo.slug).await? {
        return Ok(existing);
    }

    let collection = collection(pool, demo.collection).await?;
    let created = repo
        .create(&ProductInput {
            title: demo.title.to_owned(),
            slug: demo.slug.to_owned(),
            description: None,
            price: UnitPrice::parse(Decimal::new(demo.price_cents, 2))?,
            inventory: demo.inventory,
            collection_id: collection.id,
        })
        .await?;

    info!(product_id = %created.id, slug = demo.slug, "Product created");
    Ok(created)
}

async fn promotion(
    pool: &PgPool,
    description: &str,
    discount: f64,
) -> Result<Promotion, RepositoryError> {
    let repo = PromotionRepository::new(pool);
    if let Some(existing) = repo.find_by_description(description).await? {
        return Ok(existing);
    }
    let created = repo.create(description, discount).await?;
    info!(promotion_id = %created.id, description, "Promotion created");
    Ok(created)
}

async fn tag(pool: &PgPool, label: &str) -> Result<Tag, RepositoryError> {
    let repo = TagRepository::new(pool);
    if let Some(existing) = repo.find_by_label(label).await? {
        return Ok(existing);
    }
    let created = repo.create(label).await?;
    info!(tag_id = %created.id, label, "Tag created");
    Ok(created)
}

async fn tag_product(pool: &PgPool, tag: &Tag, product: &Product) -> Result<(), RepositoryError> {
    let repo = TagRepository::new(pool);
    let object_id = product.id.as_i64();
    let attached = repo.get_by_model(ContentType::Product, object_id).await?;
    if attached.iter().any(|item| item.tag.id == tag.id) {
        return Ok(());
    }
    repo.attach(tag.id, ContentType::Product, object_id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_prices_are_valid() {
        for demo in PRODUCTS {
            assert!(
                UnitPrice::parse(Decimal::new(demo.price_cents, 2)).is_ok(),
                "{} has an invalid price",
                demo.slug
            );
        }
    }

    #[test]
    fn test_demo_products_reference_known_collections() {
        for demo in PRODUCTS {
            assert!(COLLECTIONS.contains(&demo.collection), "{}", demo.slug);
        }
    }

    #[test]
    fn test_relations_reference_known_slugs() {
        let slugs: Vec<&str> = PRODUCTS.iter().map(|p| p.slug).collect();
        for (_, _, targets) in PROMOTIONS {
            assert!(targets.iter().all(|s| slugs.contains(s)));
        }
        for (_, targets) in TAGS {
            assert!(targets.iter().all(|s| slugs.contains(s)));
        }
    }
}
