//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `guidebook_core` linkage (`ping`, version).
//! - `render <guide.json>` prints the visible text of a stored guide row.
//! - `list <db> [config.json]` prints the newest guides of a local store.

use guidebook_core::db::open_db;
use guidebook_core::{
    init_logging_from, plain_text, render_sections, GuideListQuery, GuideRecord, GuideService,
    GuidebookConfig, SqliteGateway,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.as_slice() {
        [] => {
            println!("guidebook_core ping={}", guidebook_core::ping());
            println!("guidebook_core version={}", guidebook_core::core_version());
            return ExitCode::SUCCESS;
        }
        [command, path] if command == "render" => render_file(path),
        [command, db_path] if command == "list" => list_guides(db_path, None),
        [command, db_path, config_path] if command == "list" => {
            list_guides(db_path, Some(config_path))
        }
        _ => {
            eprintln!("usage: guidebook_cli [render <guide.json> | list <db> [config.json]]");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn render_file(path: &str) -> Result<String, String> {
    let json =
        std::fs::read_to_string(path).map_err(|err| format!("cannot read `{path}`: {err}"))?;
    let record: GuideRecord =
        serde_json::from_str(&json).map_err(|err| format!("invalid guide row: {err}"))?;
    let body = plain_text(&render_sections(&record.content.sections));
    Ok(format!("# {}\n{}\n\n{body}", record.name, record.description))
}

fn list_guides(db_path: &str, config_path: Option<&String>) -> Result<String, String> {
    let config = match config_path {
        Some(path) => GuidebookConfig::load(path).map_err(|err| err.to_string())?,
        None => GuidebookConfig::default(),
    };
    init_logging_from(&config).map_err(|err| err.to_string())?;

    let conn = open_db(db_path).map_err(|err| err.to_string())?;
    let gateway = SqliteGateway::try_new(&conn, config.public_base_url.as_str())
        .map_err(|err| err.to_string())?;
    let service = GuideService::new(&gateway, config);
    let guides = service
        .list_guides(&GuideListQuery::default())
        .map_err(|err| err.to_string())?;

    Ok(guides
        .iter()
        .map(|guide| {
            format!(
                "{}\t{}\t{}\tlikes={}\tviews={}",
                guide.id,
                guide.category,
                guide.name,
                guide.like_count(),
                guide.view
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}
