use schemars::schema_for;

use balance_scan::config::ScanConfig;

/// Generate and print the JSON Schema for scan files.
pub fn run() -> anyhow::Result<()> {
    let schema = schema_for!(ScanConfig);
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{json}");
    Ok(())
}
