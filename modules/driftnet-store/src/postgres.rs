// Postgres-backed record store. Search-bar terms are pushed down to SQL with
// the same matching rules the in-process stores use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use driftnet_common::{GeoPoint, RecordId, WebPage};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::query::{word_start_pattern, Combine, Field, Query, Term};
use crate::store::{validate_index, RecordStore};

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS driftnet_records (
        index_name   TEXT        NOT NULL,
        id           TEXT        NOT NULL,
        url          TEXT        NOT NULL,
        domain       TEXT        NOT NULL,
        text         TEXT        NOT NULL,
        html         TEXT        NOT NULL,
        labels       TEXT[]      NOT NULL DEFAULT '{}',
        captured_at  TIMESTAMPTZ NOT NULL,
        geo          JSONB       NOT NULL DEFAULT '[]',
        saved_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (index_name, id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_driftnet_records_domain ON driftnet_records (index_name, lower(domain))",
    "CREATE INDEX IF NOT EXISTS idx_driftnet_records_labels ON driftnet_records USING GIN (labels)",
];

const COLUMNS: &str = "id, url, domain, text, html, labels, captured_at, geo";

pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct PageRow {
    id: String,
    url: String,
    domain: String,
    text: String,
    html: String,
    labels: Vec<String>,
    captured_at: DateTime<Utc>,
    geo: Json<Vec<GeoPoint>>,
}

impl PageRow {
    fn into_page(self, index: &str) -> StoreResult<WebPage> {
        let id = RecordId::parse(&self.id).map_err(|e| StoreError::Corrupt {
            index: index.to_string(),
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(WebPage {
            id,
            url: self.url,
            domain: self.domain,
            text: self.text,
            html: self.html,
            labels: self.labels,
            captured_at: self.captured_at,
            geo: self.geo.0,
        })
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the records table and its indexes if missing.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("driftnet_records schema ready");
        Ok(())
    }

    fn push_term(builder: &mut QueryBuilder<'_, Postgres>, term: &Term) {
        let v = term.value.clone();
        match term.field {
            Some(Field::Url) => {
                builder.push("url = ").push_bind(v);
            }
            Some(Field::Domain) => {
                builder.push("lower(domain) = lower(").push_bind(v).push(")");
            }
            Some(Field::Text) => {
                builder.push("text ~* ").push_bind(word_start_pattern(&v));
            }
            Some(Field::Labels) => {
                builder.push_bind(v).push(" = ANY(labels)");
            }
            None => {
                builder
                    .push("text ~* ")
                    .push_bind(word_start_pattern(&v))
                    .push(" OR lower(domain) = lower(")
                    .push_bind(v.clone())
                    .push(") OR ")
                    .push_bind(v.clone())
                    .push(" = ANY(labels) OR url = ")
                    .push_bind(v);
            }
        }
    }

    async fn search(&self, index: &str, query: &Query) -> StoreResult<Vec<WebPage>> {
        validate_index(index)?;

        let joiner = match query.combine {
            Combine::All => " AND ",
            Combine::Any => " OR ",
        };

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM driftnet_records WHERE index_name = "
        ));
        builder.push_bind(index).push(" AND (");
        for (i, term) in query.terms.iter().enumerate() {
            if i > 0 {
                builder.push(joiner);
            }
            builder.push("(");
            Self::push_term(&mut builder, term);
            builder.push(")");
        }
        builder.push(") ORDER BY id COLLATE \"C\"");

        let rows: Vec<PageRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        debug!(index, hits = rows.len(), "Search executed");
        rows.into_iter().map(|r| r.into_page(index)).collect()
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn exists(&self, index: &str, id: &RecordId) -> StoreResult<bool> {
        validate_index(index)?;
        let found = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM driftnet_records WHERE index_name = $1 AND id = $2)",
        )
        .bind(index)
        .bind(id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn save(&self, index: &str, page: &WebPage) -> StoreResult<()> {
        validate_index(index)?;
        sqlx::query(
            r#"
            INSERT INTO driftnet_records
                (index_name, id, url, domain, text, html, labels, captured_at, geo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (index_name, id) DO UPDATE
               SET url         = EXCLUDED.url,
                   domain      = EXCLUDED.domain,
                   text        = EXCLUDED.text,
                   html        = EXCLUDED.html,
                   labels      = EXCLUDED.labels,
                   captured_at = EXCLUDED.captured_at,
                   geo         = EXCLUDED.geo,
                   saved_at    = now()
            "#,
        )
        .bind(index)
        .bind(page.id.as_str())
        .bind(&page.url)
        .bind(&page.domain)
        .bind(&page.text)
        .bind(&page.html)
        .bind(&page.labels)
        .bind(page.captured_at)
        .bind(Json(&page.geo))
        .execute(&self.pool)
        .await?;

        debug!(index, id = %page.id, "Saved record to Postgres");
        Ok(())
    }

    async fn get(&self, index: &str, id: &RecordId) -> StoreResult<Option<WebPage>> {
        validate_index(index)?;
        let row = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {COLUMNS} FROM driftnet_records WHERE index_name = $1 AND id = $2"
        ))
        .bind(index)
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_page(index)).transpose()
    }

    async fn delete(&self, index: &str, id: &RecordId) -> StoreResult<bool> {
        validate_index(index)?;
        let result = sqlx::query("DELETE FROM driftnet_records WHERE index_name = $1 AND id = $2")
            .bind(index)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, index: &str) -> StoreResult<Vec<RecordId>> {
        validate_index(index)?;
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM driftnet_records WHERE index_name = $1 ORDER BY id COLLATE \"C\"",
        )
        .bind(index)
        .fetch_all(&self.pool)
        .await?;

        ids.into_iter()
            .map(|id| {
                RecordId::parse(&id).map_err(|e| StoreError::Corrupt {
                    index: index.to_string(),
                    id,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    async fn count(&self, index: &str) -> StoreResult<usize> {
        validate_index(index)?;
        let n = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM driftnet_records WHERE index_name = $1",
        )
        .bind(index)
        .fetch_one(&self.pool)
        .await?;
        Ok(n as usize)
    }

    async fn get_all(&self, index: &str) -> StoreResult<Vec<WebPage>> {
        validate_index(index)?;
        let rows = sqlx::query_as::<_, PageRow>(&format!(
            "SELECT {COLUMNS} FROM driftnet_records WHERE index_name = $1 ORDER BY id COLLATE \"C\""
        ))
        .bind(index)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_page(index)).collect()
    }

    async fn search_bar(&self, index: &str, query: &str) -> StoreResult<Vec<WebPage>> {
        let query = Query::parse(query)?;
        self.search(index, &query).await
    }

    async fn search_any(&self, index: &str, text: &str) -> StoreResult<Vec<WebPage>> {
        let query = Query::parse_any(text)?;
        self.search(index, &query).await
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
