//! CLI configuration: global flags, environment fallbacks and the saved session.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use tablefire_core::default_log_level;

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// SQLite database file.
    #[arg(long, env = "TABLEFIRE_DB", default_value = "tablefire.db", global = true)]
    pub db: PathBuf,
    /// Directory for rolling log files; defaults to `logs/` next to the database.
    #[arg(long, env = "TABLEFIRE_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error; defaults by build mode.
    #[arg(long, env = "TABLEFIRE_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub json: bool,
}

impl Config {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot resolve current directory")?;
        let db_path = absolutize(&cwd, &args.db);
        let log_dir = match &args.log_dir {
            Some(dir) => absolutize(&cwd, dir),
            None => db_path
                .parent()
                .map(|parent| parent.join("logs"))
                .unwrap_or_else(|| cwd.join("logs")),
        };

        Ok(Self {
            db_path,
            log_dir,
            log_level: args
                .log_level
                .clone()
                .unwrap_or_else(|| default_log_level().to_string()),
            json: args.json,
        })
    }

    /// `<db>.session`, holding the token of the signed-in user.
    pub fn session_path(&self) -> PathBuf {
        let mut name = self.db_path.clone().into_os_string();
        name.push(".session");
        PathBuf::from(name)
    }

    pub fn read_session_token(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let token = fs::read_to_string(&path)
            .with_context(|| format!("cannot read session file {}", path.display()))?;
        let token = token.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    pub fn write_session_token(&self, token: &str) -> Result<()> {
        let path = self.session_path();
        fs::write(&path, token)
            .with_context(|| format!("cannot write session file {}", path.display()))
    }

    pub fn clear_session_token(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("cannot remove session file {}", path.display()))?;
        }
        Ok(())
    }
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
