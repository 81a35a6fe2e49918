use super::ui;
use crate::core::{FundDataProvider, FundDetails, HistoricalPeriod, nav};
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::{debug, info};

impl FundDetails {
    pub fn display_as_table(&self, history_rows: usize) -> String {
        let meta = &self.meta;
        let mut output = format!(
            "{}\nScheme Code: {}\n\n",
            ui::style_text(&meta.scheme_name, ui::StyleType::Title),
            meta.scheme_code
        );

        let mut info_table = ui::new_styled_table();
        let latest = self.latest();
        info_table.add_row(vec![
            ui::header_cell("Latest NAV"),
            ui::format_optional_cell(latest.map(|p| p.nav), ui::format_nav),
        ]);
        info_table.add_row(vec![
            ui::header_cell("As Of"),
            ui::format_optional_cell(latest.map(|p| p.date), |d| {
                d.format("%d-%m-%Y").to_string()
            }),
        ]);
        for (label, value) in [
            ("Fund House", &meta.fund_house),
            ("Scheme Type", &meta.scheme_type),
            ("Category", &meta.scheme_category),
        ] {
            info_table.add_row(vec![
                ui::header_cell(label),
                ui::format_optional_cell(value.as_deref(), str::to_string),
            ]);
        }
        output.push_str(&info_table.to_string());

        let returns = match nav::trailing_returns(&self.history) {
            Ok(r) => Some(r),
            Err(e) => {
                debug!("No trailing returns for {}: {}", meta.scheme_code, e);
                None
            }
        };
        let mut returns_table = ui::new_styled_table();
        returns_table.set_header(
            HistoricalPeriod::ALL
                .iter()
                .map(|p| ui::header_cell(&p.to_string()))
                .collect::<Vec<_>>(),
        );
        returns_table.add_row(
            HistoricalPeriod::ALL
                .iter()
                .map(|p| match returns.as_ref().and_then(|r| r.get(p)) {
                    Some(cagr) => ui::change_cell(*cagr),
                    None => ui::na_cell(returns.is_none()),
                })
                .collect::<Vec<_>>(),
        );
        output.push_str(&format!(
            "\n\n{}\n{}",
            ui::style_text("Returns (CAGR)", ui::StyleType::Label),
            returns_table
        ));

        let mut history_table = ui::new_styled_table();
        history_table.set_header(vec![ui::header_cell("Date"), ui::header_cell("NAV")]);
        for point in self.history.iter().take(history_rows) {
            history_table.add_row(vec![
                Cell::new(point.date.format("%d-%m-%Y")),
                Cell::new(ui::format_nav(point.nav)),
            ]);
        }
        output.push_str(&format!(
            "\n\n{}\n{}",
            ui::style_text("NAV History", ui::StyleType::Label),
            history_table
        ));

        output
    }
}

pub async fn run(
    provider: &dyn FundDataProvider,
    scheme_code: &str,
    history_rows: usize,
) -> Result<()> {
    info!(scheme_code, "Fetching fund details");
    let pb = ui::new_spinner("Fetching fund details...");
    let result = provider.details(scheme_code).await;
    pb.finish_and_clear();

    let details = result.context("Failed to load fund details")?;
    println!("{}", details.display_as_table(history_rows));
    Ok(())
}
