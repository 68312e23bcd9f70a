//! Product repository, keyed by source URL.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::ProductRecord;
use super::pool::{DbError, DbPool};
use super::util::{format_datetime, format_datetime_opt, parse_datetime, parse_datetime_opt};
use crate::models::Product;
use crate::schema::product;
use crate::with_conn;

impl From<ProductRecord> for Product {
    fn from(record: ProductRecord) -> Self {
        Product {
            id: record.id,
            source_id: record.source_id,
            category_id: record.category_id,
            title: record.title,
            author: record.author,
            price: record.price,
            currency: record.currency,
            image_url: record.image_url,
            source_url: record.source_url,
            last_scraped_at: parse_datetime_opt(record.last_scraped_at.as_deref()),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct ProductRepository {
    pool: DbPool,
}

impl ProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Product>, DbError> {
        with_conn!(self.pool, conn => {
            product::table
                .find(id)
                .first::<ProductRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Product::from))
        })
    }

    pub async fn get_by_source_url(&self, source_url: &str) -> Result<Option<Product>, DbError> {
        with_conn!(self.pool, conn => {
            product::table
                .filter(product::source_url.eq(source_url))
                .first::<ProductRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Product::from))
        })
    }

    /// List one page of products, newest first, optionally restricted to a category.
    pub async fn list(
        &self,
        page: u32,
        limit: u32,
        category_id: Option<&str>,
    ) -> Result<(Vec<Product>, u64), DbError> {
        use diesel::dsl::count_star;

        let offset = i64::from(page.max(1) - 1) * i64::from(limit);
        let (records, total): (Vec<ProductRecord>, i64) = with_conn!(self.pool, conn => {
            match category_id {
                Some(cat) => {
                    let records = product::table
                        .filter(product::category_id.eq(cat))
                        .order((product::created_at.desc(), product::id.asc()))
                        .limit(i64::from(limit))
                        .offset(offset)
                        .load::<ProductRecord>(&mut conn)
                        .await?;
                    let total: i64 = product::table
                        .filter(product::category_id.eq(cat))
                        .select(count_star())
                        .first(&mut conn)
                        .await?;
                    Ok::<_, DbError>((records, total))
                }
                None => {
                    let records = product::table
                        .order((product::created_at.desc(), product::id.asc()))
                        .limit(i64::from(limit))
                        .offset(offset)
                        .load::<ProductRecord>(&mut conn)
                        .await?;
                    let total: i64 = product::table
                        .select(count_star())
                        .first(&mut conn)
                        .await?;
                    Ok::<_, DbError>((records, total))
                }
            }
        })?;

        Ok((
            records.into_iter().map(Product::from).collect(),
            total as u64,
        ))
    }

    /// All products tagged with a category, newest first.
    pub async fn for_category(&self, category_id: &str) -> Result<Vec<Product>, DbError> {
        with_conn!(self.pool, conn => {
            product::table
                .filter(product::category_id.eq(category_id))
                .order(product::created_at.desc())
                .load::<ProductRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Product::from).collect())
        })
    }

    pub async fn insert(&self, p: &Product) -> Result<(), DbError> {
        let last_scraped_at = format_datetime_opt(p.last_scraped_at.as_ref());
        let created_at = format_datetime(&p.created_at);
        let updated_at = format_datetime(&p.updated_at);

        with_conn!(self.pool, conn => {
            diesel::insert_into(product::table)
                .values((
                    product::id.eq(&p.id),
                    product::source_id.eq(&p.source_id),
                    product::category_id.eq(&p.category_id),
                    product::title.eq(&p.title),
                    product::author.eq(&p.author),
                    product::price.eq(p.price),
                    product::currency.eq(&p.currency),
                    product::image_url.eq(&p.image_url),
                    product::source_url.eq(&p.source_url),
                    product::last_scraped_at.eq(&last_scraped_at),
                    product::created_at.eq(&created_at),
                    product::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing row.
    pub async fn update(&self, p: &Product) -> Result<(), DbError> {
        let last_scraped_at = format_datetime_opt(p.last_scraped_at.as_ref());
        let updated_at = format_datetime(&p.updated_at);

        with_conn!(self.pool, conn => {
            diesel::update(product::table.find(&p.id))
                .set((
                    product::source_id.eq(&p.source_id),
                    product::category_id.eq(&p.category_id),
                    product::title.eq(&p.title),
                    product::author.eq(&p.author),
                    product::price.eq(p.price),
                    product::currency.eq(&p.currency),
                    product::image_url.eq(&p.image_url),
                    product::source_url.eq(&p.source_url),
                    product::last_scraped_at.eq(&last_scraped_at),
                    product::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    /// Stamp a product as freshly scraped.
    pub async fn touch_scraped(&self, id: &str, at: DateTime<Utc>) -> Result<(), DbError> {
        let ts = format_datetime(&at);

        with_conn!(self.pool, conn => {
            diesel::update(product::table.find(id))
                .set((
                    product::last_scraped_at.eq(Some(&ts)),
                    product::updated_at.eq(&ts),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::test_context;

    use super::*;

    fn product(n: u32, category_id: Option<&str>) -> Product {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: format!("book-{n}"),
            category_id: category_id.map(str::to_string),
            title: format!("Book {n}"),
            author: None,
            price: None,
            currency: "GBP".to_string(),
            image_url: None,
            source_url: format!("https://example.com/products/book-{n}"),
            last_scraped_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_product_crud() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.products();

        let mut p = product(1, None);
        p.price = Some(4.99);
        repo.insert(&p).await.unwrap();

        let fetched = repo
            .get_by_source_url(&p.source_url)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, p.id);
        assert_eq!(fetched.price, Some(4.99));
        assert!(fetched.last_scraped_at.is_none());

        repo.touch_scraped(&p.id, Utc::now()).await.unwrap();
        let fetched = repo.get(&p.id).await.unwrap().unwrap();
        assert!(fetched.last_scraped_at.is_some());
    }

    #[tokio::test]
    async fn test_product_list_filters_by_category() {
        let (ctx, _dir) = test_context().await;
        let now = Utc::now();
        let cat = crate::models::Category {
            id: "cat-1".to_string(),
            navigation_id: None,
            parent_id: None,
            title: "Fiction".to_string(),
            slug: "fiction".to_string(),
            url: "https://example.com/c/fiction".to_string(),
            product_count: 0,
            last_scraped_at: None,
            created_at: now,
            updated_at: now,
        };
        ctx.categories().insert(&cat).await.unwrap();

        let repo = ctx.products();
        repo.insert(&product(1, Some("cat-1"))).await.unwrap();
        repo.insert(&product(2, Some("cat-1"))).await.unwrap();
        repo.insert(&product(3, None)).await.unwrap();

        let (all, total) = repo.list(1, 10, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(total, 3);

        let (filtered, total) = repo.list(1, 10, Some("cat-1")).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(total, 2);

        assert_eq!(repo.for_category("cat-1").await.unwrap().len(), 2);
    }
}
