//! Postgres-backed repository implementations.

mod favorites;
mod listings;
mod recommendations;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::filter::{Constraint, FilterDescriptor, FilterField, FilterValue};
use crate::application::repos::RepoError;

/// Listing columns selected through the `l` alias, in `ListingRow` order.
const LISTING_COLUMNS: &str = "l.id, l.title, l.kind, l.price, l.state, l.city, l.area_sq_ft, \
    l.bedrooms, l.bathrooms, l.amenities, l.furnished, l.available_from, l.listed_by, l.tags, \
    l.color_theme, l.rating, l.is_verified, l.listing_type, l.created_by, l.created_at, \
    l.updated_at";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Append one `AND` predicate per constraint. Callers start the clause with `WHERE TRUE`.
    fn apply_listing_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, filter: &'q FilterDescriptor) {
        for (field, constraint) in filter.constraints() {
            let column = listing_column(*field);
            match constraint {
                Constraint::Eq { value } => {
                    qb.push(" AND l.").push(column).push(" = ");
                    match value {
                        FilterValue::Text(text) => qb.push_bind(text.as_str()),
                        FilterValue::Integer(number) => qb.push_bind(*number),
                        FilterValue::Flag(flag) => qb.push_bind(*flag),
                    };
                }
                Constraint::Range { min, max } => {
                    if let Some(min) = min {
                        qb.push(" AND l.").push(column).push(" >= ").push_bind(*min);
                    }
                    if let Some(max) = max {
                        qb.push(" AND l.").push(column).push(" <= ").push_bind(*max);
                    }
                }
                Constraint::AnyOf { values } => {
                    qb.push(" AND l.")
                        .push(column)
                        .push(" && ")
                        .push_bind(values.clone());
                }
            }
        }
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}

fn listing_column(field: FilterField) -> &'static str {
    match field {
        FilterField::AreaSqFt => "area_sq_ft",
        FilterField::Bathrooms => "bathrooms",
        FilterField::Bedrooms => "bedrooms",
        FilterField::City => "city",
        FilterField::Furnished => "furnished",
        FilterField::IsVerified => "is_verified",
        FilterField::ListingType => "listing_type",
        FilterField::Price => "price",
        FilterField::State => "state",
        FilterField::Tags => "tags",
        FilterField::Type => "kind",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::filter::normalize;

    fn where_clause(filter: &FilterDescriptor) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM listings l WHERE TRUE");
        PostgresRepositories::apply_listing_filter(&mut qb, filter);
        qb.sql().to_string()
    }

    #[test]
    fn constraints_become_bound_predicates() {
        let filter = normalize([
            ("city", "Lagos"),
            ("minPrice", "1000"),
            ("maxPrice", "5000"),
            ("tags", "pool,gym"),
            ("furnished", "true"),
        ])
        .unwrap();

        assert_eq!(
            where_clause(&filter),
            "SELECT 1 FROM listings l WHERE TRUE AND l.city = $1 AND l.furnished = $2 \
             AND l.price >= $3 AND l.price <= $4 AND l.tags && $5"
        );
    }

    #[test]
    fn one_sided_range_binds_one_value() {
        let filter = normalize([("minArea", "500")]).unwrap();
        assert_eq!(
            where_clause(&filter),
            "SELECT 1 FROM listings l WHERE TRUE AND l.area_sq_ft >= $1"
        );
    }

    #[test]
    fn empty_filter_adds_nothing() {
        assert_eq!(
            where_clause(&FilterDescriptor::default()),
            "SELECT 1 FROM listings l WHERE TRUE"
        );
    }
}
