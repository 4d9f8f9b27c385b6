use anyhow::{anyhow, Result};
use duckdb::Error;

use better_analytics_core::filter::QueryFilter;
use better_analytics_core::funnel::{CreateFunnelRequest, Funnel};

use crate::DuckDbBackend;

fn generate_funnel_id() -> String {
    format!("fun_{}", uuid::Uuid::new_v4().simple())
}

type FunnelRow = (String, String, String, bool, String);

fn load_query_filters(conn: &duckdb::Connection, funnel_id: &str) -> Result<Vec<QueryFilter>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT filter_column, filter_operator, filter_value
        FROM funnel_steps
        WHERE funnel_id = ?1
        ORDER BY step_order ASC
        "#,
    )?;

    let rows = stmt.query_map(duckdb::params![funnel_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut filters = Vec::new();
    for row in rows {
        let (column, operator, value) = row?;
        let filter = QueryFilter::parse(&column, &operator, value)
            .map_err(|e| anyhow!("corrupt funnel step for {funnel_id}: {e}"))?;
        filters.push(filter);
    }
    Ok(filters)
}

fn into_funnel(conn: &duckdb::Connection, row: FunnelRow) -> Result<Funnel> {
    let (id, dashboard_id, name, is_strict, created_at) = row;
    let query_filters = load_query_filters(conn, &id)?;
    Ok(Funnel {
        id,
        dashboard_id,
        name,
        is_strict,
        query_filters,
        created_at,
    })
}

fn get_funnel_with_conn(
    conn: &duckdb::Connection,
    dashboard_id: &str,
    funnel_id: &str,
) -> Result<Option<Funnel>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, dashboard_id, name, is_strict, CAST(created_at AS VARCHAR)
        FROM funnels
        WHERE dashboard_id = ?1 AND id = ?2
        "#,
    )?;

    let row = match stmt.query_row(duckdb::params![dashboard_id, funnel_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
            row.get::<_, String>(4)?,
        ))
    }) {
        Ok(row) => row,
        Err(Error::QueryReturnedNoRows) => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    into_funnel(conn, row).map(Some)
}

pub async fn list_funnels_inner(db: &DuckDbBackend, dashboard_id: &str) -> Result<Vec<Funnel>> {
    let conn = db.conn.lock().await;
    let mut stmt = conn.prepare(
        r#"
        SELECT id, dashboard_id, name, is_strict, CAST(created_at AS VARCHAR)
        FROM funnels
        WHERE dashboard_id = ?1
        ORDER BY created_at DESC, id DESC
        "#,
    )?;

    let rows = stmt.query_map(duckdb::params![dashboard_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut funnel_rows = Vec::new();
    for row in rows {
        funnel_rows.push(row?);
    }

    funnel_rows
        .into_iter()
        .map(|row| into_funnel(&conn, row))
        .collect()
}

pub async fn get_funnel_inner(
    db: &DuckDbBackend,
    dashboard_id: &str,
    funnel_id: &str,
) -> Result<Option<Funnel>> {
    let conn = db.conn.lock().await;
    get_funnel_with_conn(&conn, dashboard_id, funnel_id)
}

pub async fn create_funnel_inner(
    db: &DuckDbBackend,
    dashboard_id: &str,
    req: CreateFunnelRequest,
) -> Result<Funnel> {
    req.validate()?;

    let mut conn = db.conn.lock().await;
    let funnel_id = generate_funnel_id();
    let tx = conn.transaction()?;

    tx.execute(
        r#"
        INSERT INTO funnels (id, dashboard_id, name, is_strict, created_at)
        VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
        "#,
        duckdb::params![&funnel_id, dashboard_id, req.name.trim(), req.is_strict],
    )?;

    for (idx, filter) in req.query_filters.iter().enumerate() {
        tx.execute(
            r#"
            INSERT INTO funnel_steps (
                funnel_id,
                step_order,
                filter_column,
                filter_operator,
                filter_value
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            duckdb::params![
                &funnel_id,
                (idx + 1) as i64,
                filter.column.as_str(),
                filter.operator.as_str(),
                &filter.value,
            ],
        )?;
    }

    tx.commit()?;

    get_funnel_with_conn(&conn, dashboard_id, &funnel_id)?
        .ok_or_else(|| anyhow!("failed to load created funnel"))
}
