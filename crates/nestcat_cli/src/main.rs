//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the tree store described by `NESTCAT_*` environment variables.
//! - Print the core version, the category tree and any integrity violations.

use nestcat_core::{
    core_version, init_logging_from_config, open_db_with_config, CategoryService, CoreConfig,
    SqliteTreeStore, ROOT_CATEGORY_ID,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(message) => {
            eprintln!("nestcat: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the tree fails verification.
fn run() -> Result<bool, String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    init_logging_from_config(&config)?;

    println!("nestcat_core version={}", core_version());

    let conn = open_db_with_config(&config).map_err(|err| err.to_string())?;
    let store = SqliteTreeStore::try_new(&conn).map_err(|err| err.to_string())?;
    let service = CategoryService::new(store);

    let hierarchy = service
        .get_hierarchy(ROOT_CATEGORY_ID)
        .map_err(|err| err.to_string())?;
    let rendered = serde_json::to_string_pretty(&hierarchy).map_err(|err| err.to_string())?;
    println!("{rendered}");

    let violations = service.verify_tree().map_err(|err| err.to_string())?;
    for violation in &violations {
        println!(
            "violation category_id={} {}",
            violation.category_id, violation.message
        );
    }
    println!("tree_ok={}", violations.is_empty());
    Ok(violations.is_empty())
}
