use async_trait::async_trait;
use bazaar_catalog::{Dimensions, Product};
use bazaar_core::repository::ProductRepository;
use bazaar_core::RepoError;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const PRODUCT_COLUMNS: &str =
    "id, name, slug, description, price, sale_price, image, is_active, height_cm, width_cm, depth_cm";

pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    sale_price: Option<Decimal>,
    image: Option<String>,
    is_active: bool,
    height_cm: Option<f64>,
    width_cm: Option<f64>,
    depth_cm: Option<f64>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let dimensions = match (row.height_cm, row.width_cm, row.depth_cm) {
            (None, None, None) => None,
            (height_cm, width_cm, depth_cm) => Some(Dimensions {
                height_cm,
                width_cm,
                depth_cm,
            }),
        };
        Product {
            id: row.id,
            name: row.name,
            slug: row.slug,
            description: row.description,
            price: row.price,
            sale_price: row.sale_price,
            image: row.image,
            is_active: row.is_active,
            dimensions,
        }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create_product(&self, product: &Product) -> Result<Uuid, RepoError> {
        let dims = product.dimensions.unwrap_or_default();
        sqlx::query(
            r#"
            INSERT INTO products (id, name, slug, description, price, sale_price, image, is_active,
                height_cm, width_cm, depth_cm)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.sale_price)
        .bind(product.image.as_deref())
        .bind(product.is_active)
        .bind(dims.height_cm)
        .bind(dims.width_cm)
        .bind(dims.depth_cm)
        .execute(&self.pool)
        .await?;

        Ok(product.id)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, RepoError> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let row: Option<ProductRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
        let rows: Vec<ProductRow> = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn update_product(&self, product: &Product) -> Result<bool, RepoError> {
        let dims = product.dimensions.unwrap_or_default();
        let result = sqlx::query(
            r#"
            UPDATE products SET name = $2, slug = $3, description = $4, price = $5, sale_price = $6,
                image = $7, is_active = $8, height_cm = $9, width_cm = $10, depth_cm = $11,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.sale_price)
        .bind(product.image.as_deref())
        .bind(product.is_active)
        .bind(dims.height_cm)
        .bind(dims.width_cm)
        .bind(dims.depth_cm)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
