use super::ui;
use crate::core::{FundDataProvider, FundSummary};
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::info;

pub fn display_search_results(query: &str, funds: &[FundSummary], limit: usize) -> String {
    if funds.is_empty() {
        return format!("No funds found for '{query}'.");
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Scheme Code"),
        ui::header_cell("Scheme Name"),
    ]);
    for fund in funds.iter().take(limit) {
        table.add_row(vec![
            Cell::new(&fund.scheme_code),
            Cell::new(&fund.scheme_name),
        ]);
    }

    let mut output = table.to_string();
    if funds.len() > limit {
        output.push_str(&format!(
            "\n{}",
            ui::style_text(
                &format!("Showing {} of {} funds", limit, funds.len()),
                ui::StyleType::Subtle
            )
        ));
    }
    output
}

pub async fn run(provider: &dyn FundDataProvider, query: &str, limit: usize) -> Result<()> {
    info!(query, "Searching funds");
    let pb = ui::new_spinner("Searching funds...");
    let result = provider.search(query).await;
    pb.finish_and_clear();

    let funds = result.context("Failed to search funds")?;
    println!("{}", display_search_results(query, &funds, limit));
    Ok(())
}
