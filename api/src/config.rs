use axum::http::HeaderValue;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human readable output.
    #[default]
    Pretty,

    /// One JSON object per event.
    Json,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "slotd", version, about = "License-gated device registry")]
pub struct SlotdConfig {
    #[clap(
        short,
        long,
        env = "SLOTD_BIND_ADDR",
        default_value = "0.0.0.0:8081"
    )]
    pub bind_addr: SocketAddr,

    /// Ceiling applied to admissions while no active license record exists.
    ///
    /// License status still reports a zero ceiling in that case.
    #[clap(long, env = "SLOTD_MAX_AGENTS", default_value_t = 50)]
    pub max_agents: i64,

    /// Job name written into admission labels and the discovery feed.
    #[clap(long, env = "SLOTD_JOB_NAME", default_value = "windows-agents")]
    pub job_name: String,

    /// Location of the SQLite database. The parent directory is created on
    /// startup. Use `:memory:` for a throwaway database.
    #[clap(long, env = "SLOTD_DATABASE_PATH", default_value = "./data/slotd.db")]
    pub database_path: String,

    /// Origin allowed to make cross-origin requests. Any origin is allowed
    /// when unset.
    #[clap(long, env = "SLOTD_CORS_ORIGIN")]
    pub cors_origin: Option<HeaderValue>,

    #[clap(long, env = "SLOTD_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[clap(long, default_value_t = false)]
    pub dump_openapi: bool,
}

impl SlotdConfig {
    /// Configuration with every default applied, ignoring the process
    /// arguments and environment.
    pub fn defaults() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            max_agents: 50,
            job_name: "windows-agents".into(),
            database_path: "./data/slotd.db".into(),
            cors_origin: None,
            log_format: LogFormat::Pretty,
            dump_openapi: false,
        }
    }
}
