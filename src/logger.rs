use anyhow::Result;
use anyhow::anyhow;
use ftail::Ftail;
use log::LevelFilter;
use log::info;
use std::env;
use std::fs;

const LOGS_DIR: &str = ".logs";
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Console shows warnings (debug with `verbose`), the log file keeps info.
pub fn init_logger(verbose: bool) -> Result<()> {
    let home_folder = match env::home_dir() {
        Some(h) => h,
        None => return Err(anyhow!("Could not determine $HOME")),
    };

    // ~/.logs/sportsfeed/sportsfeed.log
    let logs_path = home_folder.join(LOGS_DIR).join(PKG_NAME);
    let logs_file = logs_path.join(format!("{PKG_NAME}.log"));

    // Idempotent, safe on every start
    if let Err(e) = fs::create_dir_all(&logs_path) {
        return Err(anyhow!("Could not create logs dir at {:#?}: {}", &logs_path, e));
    }

    // Initialize the logger
    match Ftail::new()
        .console(console_level(verbose))
        .single_file(&logs_file, true, LevelFilter::Info)
        .init()
    {
        Ok(_) => {
            info!("Logger initialized, writing to {}", logs_file.display());
            Ok(())
        }
        Err(e) => Err(anyhow!("Could not initialize logger: {}", e)),
    }
}

/// Console stays quiet unless asked; the file always gets info.
fn console_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}
