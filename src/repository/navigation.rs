//! Navigation heading repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::models::NavigationRecord;
use super::pool::{DbError, DbPool};
use super::util::{format_datetime, format_datetime_opt, parse_datetime, parse_datetime_opt};
use crate::models::NavigationNode;
use crate::schema::navigation;
use crate::with_conn;

impl From<NavigationRecord> for NavigationNode {
    fn from(record: NavigationRecord) -> Self {
        NavigationNode {
            id: record.id,
            title: record.title,
            slug: record.slug,
            url: record.url,
            last_scraped_at: parse_datetime_opt(record.last_scraped_at.as_deref()),
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// Repository for navigation headings, keyed by slug.
#[derive(Clone)]
pub struct NavigationRepository {
    pool: DbPool,
}

impl NavigationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get all headings in the order they were first discovered.
    pub async fn get_all(&self) -> Result<Vec<NavigationNode>, DbError> {
        with_conn!(self.pool, conn => {
            navigation::table
                .order((navigation::created_at.asc(), navigation::slug.asc()))
                .load::<NavigationRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(NavigationNode::from).collect())
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<NavigationNode>, DbError> {
        with_conn!(self.pool, conn => {
            navigation::table
                .find(id)
                .first::<NavigationRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(NavigationNode::from))
        })
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<NavigationNode>, DbError> {
        with_conn!(self.pool, conn => {
            navigation::table
                .filter(navigation::slug.eq(slug))
                .first::<NavigationRecord>(&mut conn)
                .await
                .optional()
                .map(|opt| opt.map(NavigationNode::from))
        })
    }

    /// Count stored headings.
    pub async fn count(&self) -> Result<u64, DbError> {
        use diesel::dsl::count_star;
        let count: i64 = with_conn!(self.pool, conn => {
            navigation::table
                .select(count_star())
                .first(&mut conn)
                .await
        })?;
        Ok(count as u64)
    }

    pub async fn insert(&self, node: &NavigationNode) -> Result<(), DbError> {
        let last_scraped_at = format_datetime_opt(node.last_scraped_at.as_ref());
        let created_at = format_datetime(&node.created_at);
        let updated_at = format_datetime(&node.updated_at);

        with_conn!(self.pool, conn => {
            diesel::insert_into(navigation::table)
                .values((
                    navigation::id.eq(&node.id),
                    navigation::title.eq(&node.title),
                    navigation::slug.eq(&node.slug),
                    navigation::url.eq(&node.url),
                    navigation::last_scraped_at.eq(&last_scraped_at),
                    navigation::created_at.eq(&created_at),
                    navigation::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    /// Overwrite every mutable column of an existing row.
    pub async fn update(&self, node: &NavigationNode) -> Result<(), DbError> {
        let last_scraped_at = format_datetime_opt(node.last_scraped_at.as_ref());
        let updated_at = format_datetime(&node.updated_at);

        with_conn!(self.pool, conn => {
            diesel::update(navigation::table.find(&node.id))
                .set((
                    navigation::title.eq(&node.title),
                    navigation::slug.eq(&node.slug),
                    navigation::url.eq(&node.url),
                    navigation::last_scraped_at.eq(&last_scraped_at),
                    navigation::updated_at.eq(&updated_at),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::repository::test_support::test_context;

    use super::*;

    fn node(slug: &str, title: &str) -> NavigationNode {
        let now = Utc::now();
        NavigationNode {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            slug: slug.to_string(),
            url: format!("https://example.com/{slug}"),
            last_scraped_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_navigation_crud() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.navigation();

        let fiction = node("fiction", "Fiction");
        repo.insert(&fiction).await.unwrap();
        repo.insert(&node("history", "History")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);

        let fetched = repo.get_by_slug("fiction").await.unwrap().unwrap();
        assert_eq!(fetched.id, fiction.id);
        assert_eq!(fetched.title, "Fiction");

        let mut renamed = fetched.clone();
        renamed.title = "Fiction Books".to_string();
        repo.update(&renamed).await.unwrap();

        let fetched = repo.get(&fiction.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Fiction Books");
        assert_eq!(repo.count().await.unwrap(), 2);

        assert!(repo.get_by_slug("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let (ctx, _dir) = test_context().await;
        let repo = ctx.navigation();

        repo.insert(&node("fiction", "Fiction")).await.unwrap();
        assert!(repo.insert(&node("fiction", "Fiction")).await.is_err());
    }
}
