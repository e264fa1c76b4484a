//! Request a prediction from the service

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, PredictRequest};
use crate::output::{format_value, print_json, OutputFormat};

/// Label keys all share this prefix
const LABEL_KEY_PREFIX: &str = "Predict 'Cover_type' value";

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Integers select by id, anything else by name
pub fn option_value(option: &str) -> serde_json::Value {
    match option.parse::<u64>() {
        Ok(id) => serde_json::Value::from(id),
        Err(_) => serde_json::Value::from(option),
    }
}

/// Parse a comma or whitespace separated list of numbers
pub fn parse_features(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(idx, token)| {
            token
                .parse::<f64>()
                .with_context(|| format!("Value {} ('{}') is not a number", idx + 1, token))
        })
        .collect()
}

pub fn read_features(input: Option<String>, input_file: Option<&Path>) -> Result<Vec<f64>> {
    let text = match (input, input_file) {
        (Some(text), None) => text,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (Some(_), Some(_)) => bail!("Use either --input or --input-file, not both"),
        (None, None) => bail!("A feature vector is required (--input or --input-file)"),
    };

    let values = parse_features(&text)?;
    if values.is_empty() {
        bail!("Feature vector is empty");
    }
    Ok(values)
}

pub async fn predict(
    client: &ApiClient,
    option: &str,
    features: Vec<f64>,
    format: OutputFormat,
) -> Result<()> {
    let request = PredictRequest {
        option: option_value(option),
        pred_input: features,
    };
    let prediction = client.predict(&request).await?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            let (labels, metrics): (Vec<_>, Vec<_>) = prediction
                .iter()
                .partition(|(key, _)| key.starts_with(LABEL_KEY_PREFIX));

            for (key, value) in labels {
                println!("{}: {}", key.bold(), value.to_string().green().bold());
            }

            if metrics.is_empty() {
                return Ok(());
            }
            let rows: Vec<FieldRow> = metrics
                .into_iter()
                .map(|(key, value)| FieldRow {
                    field: key.clone(),
                    value: format_value(value),
                })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }
    Ok(())
}
