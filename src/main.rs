// ==========================================
// 罐区资产台账系统 - 命令行入口
// ==========================================
// 用法:
//   asset-warehouse import-csv <file.csv> [--target assets|farms|events]
//                              [--clear-existing] [--db <path>]
//   asset-warehouse migrate-legacy <legacy.db> [--clear-existing] [--db <path>]
// ==========================================

use asset_warehouse::config::ConfigManager;
use asset_warehouse::db::{get_default_db_path, open_sqlite_connection};
use asset_warehouse::domain::import::{ImportOptions, ImportTarget, RunSummary};
use asset_warehouse::importer::{AssetImporter, ImportDriver};
use asset_warehouse::repository::init_schema;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

struct CliArgs {
    command: String,
    source_path: PathBuf,
    target: ImportTarget,
    clear_existing: bool,
    db_path: String,
}

fn print_usage() {
    eprintln!("用法:");
    eprintln!("  asset-warehouse import-csv <file.csv> [--target assets|farms|events] [--clear-existing] [--db <path>]");
    eprintln!("  asset-warehouse migrate-legacy <legacy.db> [--clear-existing] [--db <path>]");
}

fn parse_args() -> Result<CliArgs, String> {
    let mut args = std::env::args().skip(1);

    let command = args.next().ok_or("缺少子命令")?;
    if command != "import-csv" && command != "migrate-legacy" {
        return Err(format!("未知子命令: {}", command));
    }

    let source_path = PathBuf::from(args.next().ok_or("缺少来源路径")?);

    let mut target = ImportTarget::Assets;
    let mut clear_existing = false;
    let mut db_path = get_default_db_path();

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--target" => {
                let value = args.next().ok_or("--target 缺少参数")?;
                target = match value.as_str() {
                    "assets" => ImportTarget::Assets,
                    "farms" => ImportTarget::Farms,
                    "events" => ImportTarget::Events,
                    other => return Err(format!("未知导入目标: {}", other)),
                };
            }
            "--clear-existing" => clear_existing = true,
            "--db" => {
                db_path = args.next().ok_or("--db 缺少参数")?;
            }
            other => return Err(format!("未知参数: {}", other)),
        }
    }

    Ok(CliArgs {
        command,
        source_path,
        target,
        clear_existing,
        db_path,
    })
}

fn log_summary(summary: &RunSummary) {
    tracing::info!(
        total = summary.total_rows,
        created = summary.created,
        updated = summary.updated,
        skipped = summary.skipped,
        failed = summary.failed,
        elapsed_ms = summary.elapsed_ms,
        "运行汇总"
    );
    for error in &summary.errors {
        tracing::warn!(identifier = %error.identifier, reason = %error.reason, "失败行");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    asset_warehouse::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", asset_warehouse::APP_NAME, asset_warehouse::VERSION);
    tracing::info!("==================================================");

    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("参数错误: {}", message);
            print_usage();
            return ExitCode::from(2);
        }
    };

    tracing::info!("使用数据库: {}", cli.db_path);

    let conn = match open_sqlite_connection(&cli.db_path) {
        Ok(conn) => Arc::new(Mutex::new(conn)),
        Err(err) => {
            tracing::error!(error = %err, "数据库打开失败");
            return ExitCode::FAILURE;
        }
    };

    {
        let guard = match conn.lock() {
            Ok(guard) => guard,
            Err(err) => {
                tracing::error!(error = %err, "锁获取失败");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = init_schema(&guard) {
            tracing::error!(error = %err, "Schema 初始化失败");
            return ExitCode::FAILURE;
        }
    }

    let config = match ConfigManager::from_connection(conn.clone()) {
        Ok(manager) => Arc::new(manager),
        Err(err) => {
            tracing::error!(error = %err, "配置管理器初始化失败");
            return ExitCode::FAILURE;
        }
    };

    let driver = ImportDriver::new(conn, config);
    let options = ImportOptions {
        clear_existing: cli.clear_existing,
    };

    let result = match cli.command.as_str() {
        "import-csv" => {
            driver
                .import_csv(&cli.source_path, cli.target, options)
                .await
        }
        _ => driver.migrate_legacy(&cli.source_path, options).await,
    };

    match result {
        Ok(summary) => {
            log_summary(&summary);
            // stdout 输出机器可读汇总,日志走 stderr/tracing
            if let Ok(json) = serde_json::to_string_pretty(&summary) {
                println!("{}", json);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "导入运行终止");
            ExitCode::FAILURE
        }
    }
}
