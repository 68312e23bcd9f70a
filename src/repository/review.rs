//! Review repository.

use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::ReviewRecord;
use super::pool::{DbError, DbPool};
use super::util::{format_datetime, format_datetime_opt, parse_datetime, parse_datetime_opt};
use crate::models::Review;
use crate::schema::review;
use crate::with_conn;

impl From<ReviewRecord> for Review {
    fn from(record: ReviewRecord) -> Self {
        Review {
            id: record.id,
            product_id: record.product_id,
            author: record.author,
            rating: record
                .rating
                .and_then(|r| u8::try_from(r).ok())
                .filter(|r| (1..=5).contains(r)),
            text: record.text,
            review_date: parse_datetime_opt(record.review_date.as_deref()),
            created_at: parse_datetime(&record.created_at),
        }
    }
}

#[derive(Clone)]
pub struct ReviewRepository {
    pool: DbPool,
}

impl ReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn for_product(&self, product_id: &str) -> Result<Vec<Review>, DbError> {
        with_conn!(self.pool, conn => {
            review::table
                .filter(review::product_id.eq(product_id))
                .order((review::created_at.asc(), review::id.asc()))
                .load::<ReviewRecord>(&mut conn)
                .await
                .map(|records| records.into_iter().map(Review::from).collect())
        })
    }

    pub async fn count_for_product(&self, product_id: &str) -> Result<u64, DbError> {
        use diesel::dsl::count_star;
        let count: i64 = with_conn!(self.pool, conn => {
            review::table
                .filter(review::product_id.eq(product_id))
                .select(count_star())
                .first(&mut conn)
                .await
        })?;
        Ok(count as u64)
    }

    /// Delete every review of a product and insert the given set, in one
    /// transaction.
    pub async fn replace(&self, product_id: &str, reviews: &[Review]) -> Result<usize, DbError> {
        with_conn!(self.pool, conn => {
            conn.transaction::<_, DbError, _>(|conn| {
                Box::pin(async move {
                    diesel::delete(review::table.filter(review::product_id.eq(product_id)))
                        .execute(conn)
                        .await?;

                    let mut inserted = 0;
                    for r in reviews {
                        let rating = r.rating.map(i32::from);
                        let review_date = format_datetime_opt(r.review_date.as_ref());
                        let created_at = format_datetime(&r.created_at);

                        inserted += diesel::insert_into(review::table)
                            .values((
                                review::id.eq(&r.id),
                                review::product_id.eq(product_id),
                                review::author.eq(&r.author),
                                review::rating.eq(rating),
                                review::text.eq(&r.text),
                                review::review_date.eq(&review_date),
                                review::created_at.eq(&created_at),
                            ))
                            .execute(conn)
                            .await?;
                    }
                    Ok(inserted)
                })
            })
            .await
        })
    }
}
