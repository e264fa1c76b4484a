//! List the strategies the service offers

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, OutputFormat};

#[derive(Tabled)]
struct OptionRow {
    #[tabled(rename = "Id")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

pub async fn list_options(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let options = client.options().await?;

    match format {
        OutputFormat::Json => print_json(&options)?,
        OutputFormat::Table => {
            let rows: Vec<OptionRow> = options
                .into_iter()
                .map(|o| OptionRow {
                    id: o.id,
                    name: o.name,
                    description: o.description,
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
