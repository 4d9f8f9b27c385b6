use anyhow::Result;
use duckdb::Error;

use better_analytics_metadata::Dashboard;

use crate::DuckDbBackend;

pub async fn get_dashboard_inner(
    db: &DuckDbBackend,
    dashboard_id: &str,
) -> Result<Option<Dashboard>> {
    let conn = db.conn.lock().await;
    let mut stmt = conn.prepare(
        r#"
        SELECT id, site_id, name, CAST(created_at AS VARCHAR)
        FROM dashboards
        WHERE id = ?1
        "#,
    )?;

    match stmt.query_row(duckdb::params![dashboard_id], |row| {
        Ok(Dashboard {
            id: row.get(0)?,
            site_id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }) {
        Ok(dashboard) => Ok(Some(dashboard)),
        Err(Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}
