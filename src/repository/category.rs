//! Category repository.
//!
//! Categories are keyed by source URL. Slugs are derived from titles and may
//! collide, so slug lookups return the earliest match.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::CategoryRecord;
use super::pool::{DbError, DbPool};
use super::util::{format_datetime, format_datetime_opt, parse_datetime, parse_datetime_opt};
use crate::models::Category;
use crate::schema::category;
use crate::with_conn;

impl From<CategoryRecord> for Category {
    fn from(record: CategoryRecord) -> Self {
        Category {
            id: record.id,
            navigation_id: record.navigation_id,
            parent_id: record.parent_id,
            title: record.title,
            slug: record.slug,
            url: record.url,
            product_count: record.product_count.max(0) as u32,
            last_scraped_at: parse_datetime_opt(record.last_scraped_at.as_deref()),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct CategoryRepository {
    pool: DbPool,
}

impl CategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Category>, DbError> {
        with_conn!(self.pool, conn => {
            category::table
                .find(id)
                .first::<CategoryRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Category::from))
        })
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<Category>, DbError> {
        with_conn!(self.pool, conn => {
            category::table
                .filter(category::url.eq(url))
                .first::<CategoryRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Category::from))
        })
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, DbError> {
        with_conn!(self.pool, conn => {
            category::table
                .filter(category::slug.eq(slug))
                .order(category::created_at.asc())
                .first::<CategoryRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(Category::from))
        })
    }

    /// List one page of categories (1-based page) together with the total count.
    pub async fn list(&self, page: u32, limit: u32) -> Result<(Vec<Category>, u64), DbError> {
        use diesel::dsl::count_star;

        let offset = i64::from(page.max(1) - 1) * i64::from(limit);
        let (records, total): (Vec<CategoryRecord>, i64) = with_conn!(self.pool, conn => {
            let records = category::table
                .order((category::created_at.asc(), category::id.asc()))
                .limit(i64::from(limit))
                .offset(offset)
                .load::<CategoryRecord>(&mut conn)
                .await?;
            let total: i64 = category::table
                .select(count_star())
                .first(&mut conn)
                .await?;
            Ok::<_, DbError>((records, total))
        })?;

        Ok((
            records.into_iter().map(Category::from).collect(),
            total as u64,
        ))
    }

    /// Direct children of a category.
    pub async fn children(&self, parent_id: &str) -> Result<Vec<Category>, DbError> {
        with_conn!(self.pool, conn => {
            category::table
                .filter(category::parent_id.eq(parent_id))
                .order(category::title.asc())
                .load::<CategoryRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Category::from).collect())
        })
    }

    /// Categories discovered under a navigation heading.
    pub async fn for_navigation(&self, navigation_id: &str) -> Result<Vec<Category>, DbError> {
        with_conn!(self.pool, conn => {
            category::table
                .filter(category::navigation_id.eq(navigation_id))
                .order(category::title.asc())
                .load::<CategoryRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Category::from).collect())
        })
    }

    pub async fn insert(&self, cat: &Category) -> Result<(), DbError> {
        let last_scraped_at = format_datetime_opt(cat.last_scraped_at.as_ref());
        let created_at = format_datetime(&cat.created_at);
        let updated_at = format_datetime(&cat.updated_at);
        let product_count = cat.product_count as i32;

        with_conn!(self.pool, conn => {
            diesel::insert_into(category::table)
                .values((
                    category::id.eq(&cat.id),
                    category::navigation_id.eq(&cat.navigation_id),
                    category::parent_id.eq(&cat.parent_id),
                    category::title.eq(&cat.title),
                    category::slug.eq(&cat.slug),
                    category::url.eq(&cat.url),
                    category::product_count.eq(product_count),
                    category::last_scraped_at.eq(&last_scraped_at),
                    category::created_at.eq(&created_at),
                    category::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing row.
    pub async fn update(&self, cat: &Category) -> Result<(), DbError> {
        let last_scraped_at = format_datetime_opt(cat.last_scraped_at.as_ref());
        let updated_at = format_datetime(&cat.updated_at);
        let product_count = cat.product_count as i32;

        with_conn!(self.pool, conn => {
            diesel::update(category::table.find(&cat.id))
                .set((
                    category::navigation_id.eq(&cat.navigation_id),
                    category::parent_id.eq(&cat.parent_id),
                    category::title.eq(&cat.title),
                    category::slug.eq(&cat.slug),
                    category::url.eq(&cat.url),
                    category::product_count.eq(product_count),
                    category::last_scraped_at.eq(&last_scraped_at),
                    category::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }
}
