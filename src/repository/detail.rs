//! Product detail repository (one row per product).

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::ProductDetailRecord;
use super::pool::{DbError, DbPool};
use super::util::{format_datetime, parse_datetime};
use crate::models::ProductDetail;
use crate::schema::product_detail;
use crate::with_conn;

impl From<ProductDetailRecord> for ProductDetail {
    fn from(record: ProductDetailRecord) -> Self {
        ProductDetail {
            id: record.id,
            product_id: record.product_id,
            description: record.description,
            specs: serde_json::from_str(&record.specs).unwrap_or_default(),
            ratings_avg: record.ratings_avg,
            reviews_count: record.reviews_count.map(|n| n.max(0) as u32),
            recommendations: serde_json::from_str(&record.recommendations).unwrap_or_default(),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct ProductDetailRepository {
    pool: DbPool,
}

impl ProductDetailRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_product(&self, product_id: &str) -> Result<Option<ProductDetail>, DbError> {
        with_conn!(self.pool, conn => {
            product_detail::table
                .filter(product_detail::product_id.eq(product_id))
                .first::<ProductDetailRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(ProductDetail::from))
        })
    }

    pub async fn insert(&self, detail: &ProductDetail) -> Result<(), DbError> {
        let specs = serde_json::to_string(&detail.specs).unwrap_or_else(|_| "{}".to_string());
        let recommendations =
            serde_json::to_string(&detail.recommendations).unwrap_or_else(|_| "[]".to_string());
        let reviews_count = detail.reviews_count.map(|n| n as i32);
        let created_at = format_datetime(&detail.created_at);
        let updated_at = format_datetime(&detail.updated_at);

        with_conn!(self.pool, conn => {
            diesel::insert_into(product_detail::table)
                .values((
                    product_detail::id.eq(&detail.id),
                    product_detail::product_id.eq(&detail.product_id),
                    product_detail::description.eq(&detail.description),
                    product_detail::specs.eq(&specs),
                    product_detail::ratings_avg.eq(detail.ratings_avg),
                    product_detail::reviews_count.eq(reviews_count),
                    product_detail::recommendations.eq(&recommendations),
                    product_detail::created_at.eq(&created_at),
                    product_detail::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing row.
    pub async fn update(&self, detail: &ProductDetail) -> Result<(), DbError> {
        let specs = serde_json::to_string(&detail.specs).unwrap_or_else(|_| "{}".to_string());
        let recommendations =
            serde_json::to_string(&detail.recommendations).unwrap_or_else(|_| "[]".to_string());
        let reviews_count = detail.reviews_count.map(|n| n as i32);
        let updated_at = format_datetime(&detail.updated_at);

        with_conn!(self.pool, conn => {
            diesel::update(product_detail::table.find(&detail.id))
                .set((
                    product_detail::description.eq(&detail.description),
                    product_detail::specs.eq(&specs),
                    product_detail::ratings_avg.eq(detail.ratings_avg),
                    product_detail::reviews_count.eq(reviews_count),
                    product_detail::recommendations.eq(&recommendations),
                    product_detail::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use crate::repository::test_support::{insert_product, test_context};

    use super::*;

    #[tokio::test]
    async fn test_detail_json_columns() {
        let (ctx, _dir) = test_context().await;
        let product = insert_product(&ctx, "https://example.com/p/dune").await;
        let repo = ctx.details();

        let now = Utc::now();
        let mut specs = BTreeMap::new();
        specs.insert("ISBN".to_string(), "9780441013593".to_string());
        let detail = ProductDetail {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            description: Some("Spice.".to_string()),
            specs,
            ratings_avg: Some(4.5),
            reviews_count: Some(12),
            recommendations: vec!["https://example.com/p/children-of-dune".to_string()],
            created_at: now,
            updated_at: now,
        };
        repo.insert(&detail).await.unwrap();

        let fetched = repo.get_by_product(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, detail.id);
        assert_eq!(fetched.specs.get("ISBN").map(String::as_str), Some("9780441013593"));
        assert_eq!(fetched.recommendations.len(), 1);
        assert_eq!(fetched.reviews_count, Some(12));

        let mut changed = fetched.clone();
        changed.description = None;
        changed.specs.clear();
        repo.update(&changed).await.unwrap();

        let fetched = repo.get_by_product(&product.id).await.unwrap().unwrap();
        assert!(fetched.description.is_none());
        assert!(fetched.specs.is_empty());
    }
}
