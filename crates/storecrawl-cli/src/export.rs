//! `export` command: rewrite a JSON array of store records as CSV or JSON.

use std::path::Path;

use anyhow::Context;
use storecrawl_core::{save_to_csv, save_to_json, Retailer, StoreRecord, DEFAULT_FIELDNAMES};

const RETAILER_FIELD: &str = "retailer";

pub(crate) fn run_export(
    input: &Path,
    output: &Path,
    retailer: Option<Retailer>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let mut records: Vec<StoreRecord> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of store records", input.display()))?;

    if let Some(retailer) = retailer {
        tag_records(&mut records, retailer);
    }

    let written = if is_csv(output) {
        let mut fieldnames = DEFAULT_FIELDNAMES.to_vec();
        if retailer.is_some() {
            fieldnames.push(RETAILER_FIELD);
        }
        save_to_csv(&records, output, Some(fieldnames.as_slice()))?
    } else {
        save_to_json(&records, output)?
    };

    let missing_coords = records.iter().filter(|r| !r.has_coordinates()).count();
    if missing_coords > 0 {
        tracing::warn!(missing_coords, "records without valid coordinates");
    }
    tracing::info!(written, path = %output.display(), "export complete");
    Ok(())
}

fn tag_records(records: &mut [StoreRecord], retailer: Retailer) {
    for record in records {
        record.extra.insert(
            RETAILER_FIELD.to_string(),
            serde_json::Value::String(retailer.to_string()),
        );
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
