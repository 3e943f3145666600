//! End-to-end run of the loader sequence against in-memory SQLite.

use prodload_infra::{AppConfig, BatchSize, DbConfig, LoadSettings};

fn config(rows: usize, batch_size: usize, streaming: bool) -> AppConfig {
    AppConfig {
        database: DbConfig::sqlite(":memory:"),
        load: LoadSettings {
            rows,
            batch_size: BatchSize::new(batch_size).unwrap(),
            streaming,
        },
    }
}

async fn run_to_string(config: &AppConfig) -> anyhow::Result<String> {
    let mut out = Vec::new();
    prodload_app::run(config, &mut out).await?;
    Ok(String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn prints_every_step_in_order() {
    let output = run_to_string(&config(250, 100, false)).await.unwrap();
    let lines: Vec<&str> = output.lines().filter(|l| !l.is_empty()).collect();

    assert_eq!(lines[0], "Success clear products.");
    assert_eq!(lines[1], "Success insert 250 products in 3 batches");
    assert_eq!(lines[2], "Success insert with Id 251");

    // 250 generated rows plus the named one.
    let listed = &lines[3..3 + 251];
    assert!(listed[0].starts_with("ID: 1, Name: Product 0, Price "));
    assert_eq!(listed[250], "ID: 251, Name: Test Name, Price 1000.00");

    assert!(lines[254].starts_with("Product found: ID: 1, Name: Product 0, Price: "));
    assert_eq!(lines[255], "Deleted product by Id: 1");
    assert_eq!(lines.len(), 256);
}

#[tokio::test]
async fn streaming_run_prints_same_summary() {
    let output = run_to_string(&config(10, 3, true)).await.unwrap();
    assert!(output.contains("Success insert 10 products in 4 batches"));
    assert!(output.contains("Success insert with Id 11"));
    assert!(output.contains("Deleted product by Id: 1"));
}

#[tokio::test]
async fn empty_load_fetches_the_named_record() {
    // Nothing loaded, so id 1 is the named record.
    let output = run_to_string(&config(0, 100, false)).await.unwrap();
    assert!(output.contains("Success insert 0 products in 0 batches"));
    assert!(output.contains("Product found: ID: 1, Name: Test Name, Price: 1000.00"));
}

#[tokio::test]
async fn unreachable_store_is_reported_with_context() {
    let mut config = config(1, 1, false);
    config.database = DbConfig::sqlite("/nonexistent-dir/products.db");

    let err = run_to_string(&config).await.unwrap_err();
    assert_eq!(err.to_string(), "failed to connect to products store");
    assert!(format!("{err:#}").contains("sqlite:/nonexistent-dir/products.db"));
}

#[tokio::test]
async fn failure_is_reported_on_a_single_line() {
    let mut config = config(1, 1, false);
    config.database = DbConfig::sqlite("/nonexistent-dir/products.db");
    let err = run_to_string(&config).await.unwrap_err();

    let mut report = Vec::new();
    prodload_app::report_failure(&err, &mut report).unwrap();
    let report = String::from_utf8(report).unwrap();

    assert_eq!(report.lines().count(), 1);
    assert!(report.starts_with("error: failed to connect to products store: "));
    assert!(report.ends_with('\n'));
}
