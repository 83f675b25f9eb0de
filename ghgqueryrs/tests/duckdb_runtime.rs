//! End-to-end tests against real DuckDB files.

#![cfg(feature = "duckdb")]

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ghgquery::backends::{BackendConnection, ConnectionManager, DuckDbConnection};
use ghgquery::config::GhgQueryConfig;
use ghgquery::models::{BuiltQuery, FilterOutcome, FilterRequest};
use ghgquery::registry::{DatasetRegistry, SEEG, SIRENE};
use ghgquery::runtime::{filter_data, unique_values};
use serde_json::json;

fn bootstrap_seeg(db_path: &Path) -> anyhow::Result<()> {
    let conn = duckdb::Connection::open(db_path)?;
    conn.execute_batch(
        r#"
        CREATE TABLE "SEEG-12-dados-nacionais" (
            "Emissão/Remoção/Bunker" VARCHAR,
            "Gás" VARCHAR,
            "Setor de emissão" VARCHAR,
            "Estado" VARCHAR,
            "Categoria emissora" VARCHAR,
            "Sub-categoria emissora" VARCHAR,
            "Atividade geral" VARCHAR,
            "Recorte" VARCHAR,
            "Produto ou sistema" VARCHAR,
            "Detalhamento" VARCHAR,
            "Bioma" VARCHAR,
            "1970" DOUBLE,
            "1971" DOUBLE,
            "2023" DOUBLE
        );
        INSERT INTO "SEEG-12-dados-nacionais" VALUES
            ('Emissão', 'CO2e (t) GWP-AR5', 'Energia', 'Bahia', 'c1', 's1', 'a1', 'r1', 'p1', 'd1', 'Caatinga', 10.0, 11.0, 23.0),
            ('Emissão', 'CO2e (t) GWP-AR5', 'Energia', 'Pará', 'c1', 's1', 'a1', 'r1', 'p1', 'd1', 'Amazônia', 20.0, 21.0, 33.0),
            ('Emissão', 'CH4 (t)', 'Agropecuária', 'Bahia', 'c2', 's2', 'a2', 'r2', 'p2', 'd2', NULL, 1.0, NULL, 3.0),
            ('Remoção', 'CO2e (t) GWP-AR5', 'Mudança de Uso da Terra e Floresta', 'Bahia', 'c3', 's3', 'a3', 'r3', 'p3', 'd3', NULL, -5.0, -6.0, -7.0);
        "#,
    )?;
    Ok(())
}

fn bootstrap_sirene(db_path: &Path) -> anyhow::Result<()> {
    let conn = duckdb::Connection::open(db_path)?;
    conn.execute_batch(
        r#"
        CREATE TABLE "SIRENE-dados-nacionais" (
            "Código NFR" VARCHAR,
            "Setor" VARCHAR,
            "Categoria" VARCHAR,
            "Sub-categoria" VARCHAR,
            "Gás" VARCHAR,
            "Unidade" VARCHAR,
            "1990" DOUBLE,
            "1991" DOUBLE
        );
        INSERT INTO "SIRENE-dados-nacionais" VALUES
            ('1A1a', 'Energia', 'Geração', 'Pública', 'CO2', 'Gg', 100.0, 110.0),
            ('3A1', 'Agropecuária', 'Fermentação entérica', 'Bovinos', 'CH4', 'Gg', 50.0, 51.0);
        "#,
    )?;
    Ok(())
}

async fn setup(dir: &Path) -> anyhow::Result<(DatasetRegistry, ConnectionManager)> {
    let seeg_db = dir.join("seeg.duckdb");
    let sirene_db = dir.join("sirene.duckdb");
    bootstrap_seeg(&seeg_db)?;
    bootstrap_sirene(&sirene_db)?;

    let config = GhgQueryConfig::from_toml(&format!(
        "[datasets.seeg]\ndatabase = {:?}\n\n[datasets.sirene]\ndatabase = {:?}\n",
        seeg_db.display().to_string(),
        sirene_db.display().to_string()
    ))?;
    let registry = DatasetRegistry::builtin();
    let connections = ghgquery::connect_datasets(&registry, config).await?;
    Ok((registry, connections))
}

#[tokio::test]
async fn filter_data_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (registry, connections) = setup(dir.path()).await?;

    let request = FilterRequest::new(1970, 1975).with_value("estado", "Bahia");
    let FilterOutcome::Rows(rows) = filter_data(&registry, &connections, SEEG, &request).await?
    else {
        panic!("expected rows");
    };

    // Default gas plus Bahia: the emission row and the removal row.
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row["Estado"], json!("Bahia"));
        assert_eq!(row["Gás"], json!("CO2e (t) GWP-AR5"));
        assert!(row.contains_key("1970"));
        assert!(row.contains_key("1971"));
        assert!(!row.contains_key("2023"));
    }
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys.first(), Some(&"Emissão/Remoção/Bunker"));
    assert_eq!(keys.last(), Some(&"1971"));
    Ok(())
}

#[tokio::test]
async fn filter_data_honours_limit_and_disabled_default() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (registry, connections) = setup(dir.path()).await?;

    let request = FilterRequest::new(2023, 2023)
        .with_value("gas", "")
        .with_limit(3);
    let FilterOutcome::Rows(rows) = filter_data(&registry, &connections, SEEG, &request).await?
    else {
        panic!("expected rows");
    };
    assert_eq!(rows.len(), 3);
    Ok(())
}

#[tokio::test]
async fn query_years_missing_from_table_surface_engine_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (registry, connections) = setup(dir.path()).await?;

    // 1972 is inside the dataset span but absent from this fixture table.
    let request = FilterRequest::new(1972, 1972);
    let err = filter_data(&registry, &connections, SEEG, &request)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("1972"), "{err}");

    // The failure does not poison the connection for later requests.
    let ok = filter_data(&registry, &connections, SEEG, &FilterRequest::new(1970, 1970)).await?;
    assert!(matches!(ok, FilterOutcome::Rows(rows) if rows.len() == 3));
    Ok(())
}

#[tokio::test]
async fn unique_values_sorted_with_null_placeholder() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (registry, connections) = setup(dir.path()).await?;

    let gases = unique_values(&registry, &connections, SEEG, "Gás").await?;
    assert_eq!(
        gases.unique_values,
        vec![json!("CH4 (t)"), json!("CO2e (t) GWP-AR5")]
    );

    let biomes = unique_values(&registry, &connections, SEEG, "Bioma").await?;
    assert_eq!(
        biomes.unique_values.iter().filter(|v| **v == json!("N/A")).count(),
        1
    );
    assert!(biomes.unique_values.contains(&json!("Amazônia")));
    assert!(biomes.unique_values.contains(&json!("Caatinga")));

    let sectors = unique_values(&registry, &connections, SIRENE, "Setor").await?;
    assert_eq!(
        sectors.unique_values,
        vec![json!("Agropecuária"), json!("Energia")]
    );
    Ok(())
}

#[tokio::test]
async fn concurrent_reads_share_one_connection() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("seeg.duckdb");
    bootstrap_seeg(&db_path)?;
    let conn = Arc::new(DuckDbConnection::new(&db_path).with_max_concurrency(2));

    let query = BuiltQuery::new(
        "SELECT \"Estado\" FROM \"SEEG-12-dados-nacionais\" WHERE \"Gás\" = ?".to_string(),
        vec!["CH4 (t)".to_string()],
    );
    let mut handles = Vec::new();
    for _ in 0..8 {
        let conn = conn.clone();
        let query = query.clone();
        handles.push(tokio::spawn(async move { conn.execute(&query).await }));
    }
    for handle in handles {
        let result = handle.await??;
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["Estado"], json!("Bahia"));
    }
    Ok(())
}

#[tokio::test]
async fn abandoned_query_is_interrupted_before_its_slot_is_reused() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("seeg.duckdb");
    bootstrap_seeg(&db_path)?;
    let conn = DuckDbConnection::new(&db_path).with_max_concurrency(1);

    let started = Instant::now();
    let slow = BuiltQuery::unparameterized(
        "SELECT count(*) AS n FROM range(100000000000)".to_string(),
    );
    let timed_out = tokio::time::timeout(Duration::from_millis(100), conn.execute(&slow)).await;
    assert!(timed_out.is_err());

    // The only slot is released once the interrupted scan unwinds, not after it completes.
    let fast = BuiltQuery::unparameterized("SELECT 1 AS one".to_string());
    let result = conn.execute(&fast).await?;
    assert_eq!(result.rows[0]["one"], json!(1));
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "slot held for {:?}",
        started.elapsed()
    );
    assert_eq!(conn.available_slots(), 1);
    Ok(())
}

#[tokio::test]
async fn read_only_connection_rejects_writes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("seeg.duckdb");
    bootstrap_seeg(&db_path)?;
    let conn = DuckDbConnection::new(&db_path);

    let err = conn
        .execute(&BuiltQuery::unparameterized(
            "DELETE FROM \"SEEG-12-dados-nacionais\"".to_string(),
        ))
        .await
        .unwrap_err();
    assert!(err.to_string().to_lowercase().contains("read-only"), "{err}");
    Ok(())
}

#[tokio::test]
async fn missing_database_fails_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let config = GhgQueryConfig::from_toml(&format!(
        "[datasets.seeg]\ndatabase = {:?}\n",
        dir.path().join("missing.duckdb").display().to_string()
    ))
    .unwrap();
    let registry = DatasetRegistry::builtin();
    assert!(ghgquery::connect_datasets(&registry, config).await.is_err());
}
