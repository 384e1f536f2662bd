use anyhow::{Context, bail};
use category_tree::db::RepoError;
use category_tree::{CategoryTree, Config, DbService, TreeError, TreeResult, init_logger_with_file};
use shared::error::AppError;
use std::sync::Arc;

const USAGE: &str = "usage: category-tree <verify | repair | tree>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(
        Some(&config.log_level),
        config.log_json,
        config.log_dir.as_deref(),
    );
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    let command = std::env::args().nth(1).unwrap_or_default();
    if !matches!(command.as_str(), "verify" | "repair" | "tree") {
        bail!(USAGE);
    }

    let db = DbService::new(&config)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
    let tree = CategoryTree::new(Arc::new(db.category_store()), config.tree_options());

    if let Err(err) = run(&tree, &command).await {
        let err = AppError::from(err);
        tracing::error!(
            code = err.code.code(),
            category = err.code.category().name(),
            details = ?err.details,
            "{}: {}",
            err.code.message(),
            err.message
        );
        bail!("{} (code {})", err.message, err.code);
    }
    Ok(())
}

async fn run(tree: &CategoryTree, command: &str) -> TreeResult<()> {
    match command {
        "verify" => {
            let faults = tree.verify().await?;
            for fault in &faults {
                println!("{fault}");
            }
            if !faults.is_empty() {
                return Err(TreeError::Consistency(format!(
                    "{} consistency faults found",
                    faults.len()
                )));
            }
            println!("category tree is consistent");
        }
        "repair" => {
            let report = tree.repair().await?;
            let json = serde_json::to_string_pretty(&report).map_err(RepoError::from)?;
            println!("{json}");
        }
        _ => {
            for category in tree.get_tree().await? {
                let indent = "  ".repeat(category.level.max(0) as usize);
                println!("{indent}{} ({}) [{}]", category.name, category.slug, category.id);
            }
        }
    }
    Ok(())
}
