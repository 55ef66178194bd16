//! Edisco Report - print one dashboard view as JSON
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin edisco_report -- top-edited --period 7d --limit 25
//! cargo run --release --bin edisco_report -- recent --sort size_desc --anon
//! cargo run --release --bin edisco_report -- search --query נמר --period 24h
//! cargo run --release --bin edisco_report -- diff --revid 39000000
//! ```
//!
//! Views: `recent`, `top-edited`, `top-editors`, `top-talk-pages`,
//! `new-articles`, `top-viewed`, `search`, `diff`.
//!
//! Options:
//! - `--period 1h|24h|7d|all` (default: 24h; `all` for recent)
//! - `--limit N` (default: 25; 50 for recent)
//! - `--anon` - anonymous edits only
//! - `--user NAME`, `--title TITLE`
//! - `--sort` - `date|size_desc|size_asc` for recent, `count|date` for top-edited
//! - `--query TEXT` - search text
//! - `--revid N` - revision for `diff`
//!
//! ## Environment Variables
//!
//! See `EdiscoConfig::from_env`. `RUST_LOG` sets the log level (default: info).

use edisco::aggregate::{ActivitySort, RecentSort};
use edisco::types::Period;
use edisco::upstream::HttpGateway;
use edisco::{Dashboard, EdiscoConfig, ViewFilters};
use serde::Serialize;
use std::env;
use std::sync::Arc;

/// Value following `flag`, if present
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).map(|s| s.as_str())
}

fn parse_period(args: &[String], default: Period) -> Result<Period, Box<dyn std::error::Error>> {
    match flag_value(args, "--period") {
        Some(raw) => Period::from_str(raw).ok_or_else(|| format!("unknown period: {}", raw).into()),
        None => Ok(default),
    }
}

fn parse_number<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> Result<T, Box<dyn std::error::Error>> {
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("{} expects a number, got {}", flag, raw).into()),
        None => Ok(default),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let view = args
        .first()
        .cloned()
        .ok_or("usage: edisco_report <view> [options]")?;

    let config = EdiscoConfig::from_env();
    log::info!("🚀 Edisco report: {} against {}", view, config.api_url);

    let gateway = HttpGateway::new(&config)?;
    let dashboard = Dashboard::new(&config, Arc::new(gateway));

    let filters = ViewFilters {
        anon_only: args.iter().any(|a| a == "--anon"),
        user: flag_value(&args, "--user").map(str::to_string),
        title: flag_value(&args, "--title").map(str::to_string),
    };

    match view.as_str() {
        "recent" => {
            let sort = match flag_value(&args, "--sort") {
                Some(raw) => RecentSort::from_str(raw).ok_or_else(|| format!("unknown sort: {}", raw))?,
                None => RecentSort::default(),
            };
            let records = dashboard
                .recent_edits(
                    parse_number(&args, "--limit", 50)?,
                    parse_period(&args, Period::Unbounded)?,
                    &filters,
                    sort,
                )
                .await;
            print_json(&records)
        }
        "top-edited" => {
            let sort = match flag_value(&args, "--sort") {
                Some(raw) => ActivitySort::from_str(raw).ok_or_else(|| format!("unknown sort: {}", raw))?,
                None => ActivitySort::default(),
            };
            let pages = dashboard
                .top_edited(
                    parse_number(&args, "--limit", 25)?,
                    parse_period(&args, Period::Day1)?,
                    &filters,
                    sort,
                )
                .await;
            print_json(pages.as_slice())
        }
        "top-editors" => {
            let editors = dashboard
                .top_editors(
                    parse_number(&args, "--limit", 25)?,
                    parse_period(&args, Period::Day1)?,
                    &filters,
                )
                .await;
            print_json(editors.as_slice())
        }
        "top-talk-pages" => {
            let pages = dashboard
                .top_talk_pages(
                    parse_number(&args, "--limit", 25)?,
                    parse_period(&args, Period::Day1)?,
                    &filters,
                )
                .await;
            print_json(pages.as_slice())
        }
        "new-articles" => {
            let records = dashboard
                .new_articles(
                    parse_number(&args, "--limit", 25)?,
                    parse_period(&args, Period::Day1)?,
                    &filters,
                )
                .await;
            print_json(records.as_slice())
        }
        "top-viewed" => {
            let rows = dashboard
                .top_viewed(
                    parse_number(&args, "--limit", 25)?,
                    parse_period(&args, Period::Day1)?,
                    &filters,
                )
                .await;
            print_json(rows.as_slice())
        }
        "search" => {
            let query = flag_value(&args, "--query").ok_or("search requires --query")?;
            let hits = dashboard
                .search(query, parse_period(&args, Period::Week1)?)
                .await;
            print_json(&hits)
        }
        "diff" => {
            let rev_id: u64 = parse_number(&args, "--revid", 0)?;
            if rev_id == 0 {
                return Err("diff requires --revid".into());
            }
            match dashboard.revision_diff(rev_id).await {
                Some(html) => {
                    println!("{}", html);
                    Ok(())
                }
                None => Err(format!("no diff available for revision {}", rev_id).into()),
            }
        }
        other => Err(format!("unknown view: {}", other).into()),
    }
}
