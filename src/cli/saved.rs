use super::ui;
use crate::core::{FundDataProvider, FundDetails, SavedFund, SavedFundsError};
use crate::service::{SaveFundRequest, SavedFundsService};
use anyhow::{Context, Result};
use comfy_table::Cell;
use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, info};

/// Attaches the message a user should see to a domain error.
fn describe(err: SavedFundsError, action: &'static str) -> anyhow::Error {
    let message = match &err {
        SavedFundsError::Unauthenticated => {
            "Not logged in. Pass --token or set MFBOOK_TOKEN".to_string()
        }
        SavedFundsError::NotFound => "User not found".to_string(),
        SavedFundsError::Conflict { .. } => "Fund already saved".to_string(),
        SavedFundsError::UsernameTaken { username } => format!("Username '{username}' is taken"),
        SavedFundsError::Unavailable(_) => format!("Failed to {action}"),
    };
    anyhow::Error::new(err).context(message)
}

pub fn display_saved_funds(
    funds: &[SavedFund],
    navs: Option<&HashMap<String, Result<FundDetails>>>,
) -> String {
    if funds.is_empty() {
        return "You haven't saved any funds yet.".to_string();
    }

    let mut table = ui::new_styled_table();
    let mut header = vec![
        ui::header_cell("Fund Id"),
        ui::header_cell("Scheme Name"),
        ui::header_cell("Scheme Code"),
    ];
    if navs.is_some() {
        header.push(ui::header_cell("Latest NAV"));
        header.push(ui::header_cell("As Of"));
    }
    table.set_header(header);

    for fund in funds {
        let mut row = vec![
            Cell::new(&fund.fund_id),
            Cell::new(&fund.scheme_name),
            Cell::new(&fund.scheme_code),
        ];
        if let Some(navs) = navs {
            match navs.get(&fund.scheme_code) {
                Some(Ok(details)) => {
                    let latest = details.latest();
                    row.push(ui::format_optional_cell(latest.map(|p| p.nav), ui::format_nav));
                    row.push(ui::format_optional_cell(latest.map(|p| p.date), |d| {
                        d.format("%d-%m-%Y").to_string()
                    }));
                }
                Some(Err(_)) | None => {
                    row.push(ui::na_cell(true));
                    row.push(ui::na_cell(true));
                }
            }
        }
        table.add_row(row);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Saved Funds", ui::StyleType::Title),
        table
    )
}

/// Saves a fund, taking its name and code from the fund data provider.
pub async fn save(
    service: &SavedFundsService,
    provider: &dyn FundDataProvider,
    credential: Option<&str>,
    scheme_code: &str,
    fund_id: Option<&str>,
) -> Result<()> {
    if credential.is_none() {
        return Err(describe(SavedFundsError::Unauthenticated, "save fund"));
    }

    let pb = ui::new_spinner("Fetching fund details...");
    let details = provider.details(scheme_code).await;
    pb.finish_and_clear();
    let details = details.context("Failed to load fund details")?;

    let request = SaveFundRequest {
        fund_id: fund_id.unwrap_or(scheme_code).to_string(),
        scheme_name: details.meta.scheme_name,
        scheme_code: details.meta.scheme_code,
    };
    let fund = service
        .add(credential, &request)
        .await
        .map_err(|e| describe(e, "save fund"))?;

    info!(fund_id = %fund.fund_id, "Saved fund");
    println!(
        "{} {} ({})",
        ui::style_text("Fund saved successfully!", ui::StyleType::Success),
        fund.scheme_name,
        fund.scheme_code
    );
    Ok(())
}

pub async fn list(
    service: &SavedFundsService,
    provider: &dyn FundDataProvider,
    credential: Option<&str>,
    with_nav: bool,
) -> Result<()> {
    let funds = service
        .list(credential)
        .await
        .map_err(|e| describe(e, "load saved funds"))?;
    debug!("Loaded {} saved funds", funds.len());

    if !with_nav || funds.is_empty() {
        println!("{}", display_saved_funds(&funds, None));
        return Ok(());
    }

    let mut codes: Vec<&str> = funds.iter().map(|f| f.scheme_code.as_str()).collect();
    codes.sort_unstable();
    codes.dedup();

    let pb = ui::new_progress_bar(codes.len() as u64);
    pb.set_message("Fetching NAVs...");
    let futures = codes.into_iter().map(|code| {
        let pb = pb.clone();
        async move {
            let result = provider.details(code).await;
            pb.inc(1);
            (code.to_string(), result)
        }
    });
    let navs: HashMap<String, Result<FundDetails>> = join_all(futures).await.into_iter().collect();
    pb.finish_and_clear();

    for (code, result) in &navs {
        if let Err(e) = result {
            debug!("Failed to fetch NAV for {}: {}", code, e);
        }
    }

    println!("{}", display_saved_funds(&funds, Some(&navs)));
    Ok(())
}

pub async fn remove(
    service: &SavedFundsService,
    credential: Option<&str>,
    fund_id: &str,
) -> Result<()> {
    service
        .remove(credential, fund_id)
        .await
        .map_err(|e| describe(e, "remove fund"))?;

    info!(fund_id, "Removed fund");
    println!(
        "{}",
        ui::style_text("Fund removed successfully", ui::StyleType::Success)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FundMeta, NavPoint};
    use anyhow::anyhow;
    use chrono::NaiveDate;

    fn funds() -> Vec<SavedFund> {
        vec![
            SavedFund::new("120465", "Axis Bluechip Fund", "120465"),
            SavedFund::new("mine", "Axis Small Cap Fund", "125354"),
        ]
    }

    #[test]
    fn empty_list_has_friendly_message() {
        assert_eq!(
            display_saved_funds(&[], None),
            "You haven't saved any funds yet."
        );
    }

    #[test]
    fn lists_funds_in_order() {
        let output = display_saved_funds(&funds(), None);

        let first = output.find("Axis Bluechip Fund").unwrap();
        let second = output.find("Axis Small Cap Fund").unwrap();
        assert!(first < second);
        assert!(!output.contains("Latest NAV"));
    }

    #[test]
    fn shows_latest_nav_when_available() {
        let mut navs = HashMap::new();
        navs.insert(
            "120465".to_string(),
            Ok(FundDetails {
                meta: FundMeta {
                    scheme_code: "120465".to_string(),
                    scheme_name: "Axis Bluechip Fund".to_string(),
                    fund_house: None,
                    scheme_type: None,
                    scheme_category: None,
                },
                history: vec![NavPoint {
                    date: NaiveDate::from_ymd_opt(2024, 10, 28).unwrap(),
                    nav: 61.23,
                }],
            }),
        );
        navs.insert("125354".to_string(), Err(anyhow!("timeout")));

        let output = display_saved_funds(&funds(), Some(&navs));

        assert!(output.contains("Latest NAV"));
        assert!(output.contains("₹61.2300"));
        assert!(output.contains("28-10-2024"));
        assert!(output.contains("N/A"));
    }

    #[test]
    fn duplicate_error_reads_fund_already_saved() {
        let err = describe(SavedFundsError::duplicate_fund("120465"), "save fund");

        assert_eq!(err.to_string(), "Fund already saved");
        assert!(matches!(
            err.downcast_ref::<SavedFundsError>(),
            Some(SavedFundsError::Conflict { .. })
        ));
    }

    #[test]
    fn storage_error_names_the_action() {
        let err = describe(
            SavedFundsError::Unavailable(anyhow!("disk full")),
            "load saved funds",
        );
        assert_eq!(err.to_string(), "Failed to load saved funds");
    }
}
