//! Postgres adapter over the `documents` JSONB table.
//!
//! Equality conditions become `body @> ...` containment tests, which the GIN
//! index on `body` answers. When every condition translates and no sort is
//! requested, paging runs in SQL too. Everything else (range operators,
//! sorting, projection, pipelines) runs in-process through the same evaluator
//! as [`crate::MemoryStore`] over the narrowed rows.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use tourbook_core::aggregation::{run_pipeline, Pipeline, Stage};
use tourbook_core::query::{Condition, FilterSpec};
use tourbook_core::store::{DocumentStore, FindQuery, StoreError};
use tourbook_core::types::Document;
use tourbook_core::value::{number, parse_instant};

use crate::document::{document_id, merge_patch, prepare_insert};
use crate::DbPool;

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: DbPool,
}

/// `LIMIT`/`OFFSET` applied in SQL.
#[derive(Debug, Clone, Copy)]
struct Page {
    skip: u64,
    limit: Option<u64>,
}

impl PgDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Rows of `collection` passing `pushdown`, in insertion order.
    async fn select(
        &self,
        collection: &str,
        pushdown: &Pushdown,
        page: Option<Page>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT body FROM documents");
        pushdown.push_where(&mut builder, collection);
        builder.push(" ORDER BY created_at, id");
        if let Some(page) = page {
            if let Some(limit) = page.limit {
                builder.push(" LIMIT ").push_bind(to_i64(limit));
            }
            if page.skip > 0 {
                builder.push(" OFFSET ").push_bind(to_i64(page.skip));
            }
        }

        let rows: Vec<(Json<Document>,)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(|(Json(body),)| body).collect())
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// The part of a filter Postgres decides on its own.
///
/// Each clause is one equality condition, held by a row whose body contains
/// any of the clause's documents.
#[derive(Debug, Default)]
struct Pushdown {
    clauses: Vec<Vec<Value>>,
    /// Every condition translated: the SQL result is the filter result.
    exact: bool,
}

impl Pushdown {
    fn from_filter(filter: &FilterSpec) -> Self {
        let mut clauses = Vec::new();
        let mut exact = true;
        for (field, condition) in filter.iter() {
            match equality_literal(condition).and_then(|literal| containment(field, literal)) {
                Some(alternatives) => clauses.push(alternatives),
                None => exact = false,
            }
        }
        Self { clauses, exact }
    }

    fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>, collection: &str) {
        builder.push(" WHERE collection = ").push_bind(collection.to_string());
        for alternatives in &self.clauses {
            builder.push(" AND (");
            let mut any = builder.separated(" OR ");
            for doc in alternatives {
                any.push("body @> ").push_bind_unseparated(Json(doc.clone()));
            }
            builder.push(")");
        }
    }
}

fn equality_literal(condition: &Condition) -> Option<&Value> {
    match condition {
        Condition::Equals(literal) => Some(literal),
        Condition::Operators(ops) if ops.len() == 1 => ops.get("$eq"),
        _ => None,
    }
}

/// Containment documents matching `field == literal` under the evaluator's
/// loose equality, or `None` when containment cannot express it exactly.
///
/// A string literal also matches the number or boolean it spells. Instants
/// compare chronologically across spellings, so they stay in-process, as do
/// array-index paths and `null`.
fn containment(field: &str, literal: &Value) -> Option<Vec<Value>> {
    let segments: Vec<&str> = field.split('.').collect();
    let indexed = |s: &&str| s.is_empty() || s.bytes().all(|b| b.is_ascii_digit());
    if segments.iter().any(indexed) {
        return None;
    }

    let candidates = match literal {
        Value::String(text) if parse_instant(text).is_some() => return None,
        Value::String(text) => {
            let mut spelled = vec![literal.clone()];
            if let Ok(n) = text.trim().parse::<f64>() {
                if n.is_finite() {
                    spelled.push(number(n));
                }
            }
            match text.as_str() {
                "true" => spelled.push(Value::Bool(true)),
                "false" => spelled.push(Value::Bool(false)),
                _ => {}
            }
            spelled
        }
        Value::Number(_) | Value::Bool(_) => vec![literal.clone()],
        _ => return None,
    };

    // Nested containment does not look inside arrays, so each candidate is
    // offered both bare and as a one-element array.
    Some(
        candidates
            .into_iter()
            .flat_map(|c| [nest(&segments, c.clone()), nest(&segments, Value::Array(vec![c]))])
            .collect(),
    )
}

fn nest(segments: &[&str], leaf: Value) -> Value {
    segments.iter().rev().fold(leaf, |inner, segment| {
        let mut map = Map::new();
        map.insert((*segment).to_string(), inner);
        Value::Object(map)
    })
}

/// Unique-index violations become [`StoreError::Duplicate`]; everything else is a backend failure.
fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique index").to_string();
            return StoreError::Duplicate(constraint);
        }
    }
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        query.filter.validate()?;
        let pushdown = Pushdown::from_filter(&query.filter);
        tracing::debug!(
            collection,
            pushed = pushdown.clauses.len(),
            exact = pushdown.exact,
            "Document find"
        );

        if pushdown.exact && query.sort.is_empty() {
            let page = Page {
                skip: query.skip,
                limit: query.limit,
            };
            let rows = self.select(collection, &pushdown, Some(page)).await?;
            let project = FindQuery {
                projection: query.projection.clone(),
                ..FindQuery::default()
            };
            return project.apply(rows);
        }
        query.apply(self.select(collection, &pushdown, None).await?)
    }

    async fn count(&self, collection: &str, filter: &FilterSpec) -> Result<u64, StoreError> {
        filter.validate()?;
        let pushdown = Pushdown::from_filter(filter);
        if pushdown.exact {
            let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents");
            pushdown.push_where(&mut builder, collection);
            let total: i64 = builder
                .build_query_scalar()
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;
            return Ok(u64::try_from(total).unwrap_or(0));
        }

        let mut total = 0;
        for doc in self.select(collection, &pushdown, None).await? {
            if filter.matches(&doc)? {
                total += 1;
            }
        }
        Ok(total)
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError> {
        // A leading match narrows the rows; the pipeline still re-checks it.
        let pushdown = match pipeline.stages().first() {
            Some(Stage::Match(filter)) => {
                filter.validate()?;
                Pushdown::from_filter(filter)
            }
            _ => Pushdown::default(),
        };
        run_pipeline(self.select(collection, &pushdown, None).await?, pipeline)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(Json<Document>,)> =
            sqlx::query_as("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(row.map(|(Json(body),)| body))
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, StoreError> {
        let doc = prepare_insert(doc);
        let id = document_id(&doc)
            .ok_or_else(|| StoreError::Backend("document without _id".into()))?
            .to_string();

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&doc))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let row: Option<(Json<Document>,)> = sqlx::query_as(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        let Some((Json(mut doc),)) = row else {
            return Ok(None);
        };

        merge_patch(&mut doc, patch);
        sqlx::query(
            "UPDATE documents SET body = $3, updated_at = NOW() WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&doc))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(Some(doc))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(Json<Document>,)> = sqlx::query_as(
            "DELETE FROM documents WHERE collection = $1 AND id = $2 RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(|(Json(body),)| body))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(map_sqlx)
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn text_literal_matches_the_number_it_spells() {
        let filter = FilterSpec::new().eq("price", "100");
        let pushdown = Pushdown::from_filter(&filter);
        assert!(pushdown.exact);
        assert_eq!(
            pushdown.clauses,
            vec![vec![
                json!({ "price": "100" }),
                json!({ "price": ["100"] }),
                json!({ "price": 100.0 }),
                json!({ "price": [100.0] }),
            ]]
        );
    }

    #[test]
    fn dotted_paths_nest_and_booleans_are_spelled() {
        let clauses = containment("guide.active", &json!("true")).unwrap();
        assert!(clauses.contains(&json!({ "guide": { "active": true } })));
        assert!(clauses.contains(&json!({ "guide": { "active": [true] } })));
    }

    #[test]
    fn untranslatable_conditions_stay_in_process() {
        let filter = FilterSpec::new()
            .eq("email", "ada@example.com")
            .eq("startDate", "2021-06-01")
            .eq("locations.0.day", 1)
            .op("price", "$gte", "100");
        let pushdown = Pushdown::from_filter(&filter);
        assert!(!pushdown.exact);
        assert_eq!(pushdown.clauses.len(), 1);
        assert_eq!(pushdown.clauses[0][0], json!({ "email": "ada@example.com" }));
    }

    #[test]
    fn single_eq_operator_is_an_equality() {
        let filter = FilterSpec::new().op("active", "$eq", false);
        let pushdown = Pushdown::from_filter(&filter);
        assert!(pushdown.exact);
        assert_eq!(
            pushdown.clauses,
            vec![vec![json!({ "active": false }), json!({ "active": [false] })]]
        );
    }
}
