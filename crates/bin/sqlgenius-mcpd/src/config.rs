use clap::{Parser, builder::BoolishValueParser};
use sqlgenius_vertex::{DEFAULT_LOCATION, DEFAULT_MODEL};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;

const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4030";

#[derive(Parser, Debug)]
#[command(name = "sqlgenius-mcpd", version, about = "sqlgenius MCP daemon.")]
struct CliArgs {
    #[arg(long, env = "PROJECT_ID")]
    project_id: Option<String>,

    #[arg(long, env = "DATASET_ID")]
    dataset_id: Option<String>,

    #[arg(long, env = "VERTEX_AI_LOCATION", default_value = DEFAULT_LOCATION)]
    location: String,

    #[arg(long, env = "VERTEX_AI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[arg(
        long = "stdio",
        env = "SQLGENIUS_ENABLE_STDIO",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(
        long,
        env = "SQLGENIUS_HTTP_SERVE",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    http_serve: bool,

    #[arg(long, env = "SQLGENIUS_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone)]
pub struct GeniusConfig {
    pub project_id: String,
    pub dataset_id: String,
    pub location: String,
    pub model: String,
    pub access_token: String,
    pub enable_stdio: bool,
    pub http_serve: bool,
    pub mcp_http_addr: SocketAddr,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl GeniusConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

impl TryFrom<CliArgs> for GeniusConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let project_id = args
            .project_id
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("PROJECT_ID"))?;
        let dataset_id = args
            .dataset_id
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("DATASET_ID"))?;
        let access_token = args
            .access_token
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("GOOGLE_ACCESS_TOKEN"))?;

        if args.location.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "VERTEX_AI_LOCATION",
                value: args.location,
            });
        }
        if args.model.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "VERTEX_AI_MODEL",
                value: args.model,
            });
        }
        if !args.enable_stdio && !args.http_serve {
            return Err(ConfigError::InvalidSetting {
                name: "SQLGENIUS_ENABLE_STDIO",
                value: "no transport enabled".to_string(),
            });
        }

        Ok(Self {
            project_id,
            dataset_id,
            location: args.location,
            model: args.model,
            access_token,
            enable_stdio: args.enable_stdio,
            http_serve: args.http_serve,
            mcp_http_addr: args.mcp_http_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            project_id: Some("acme-analytics".to_string()),
            dataset_id: Some("sales".to_string()),
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            access_token: Some("token".to_string()),
            enable_stdio: true,
            http_serve: false,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
        }
    }

    #[test]
    fn defaults_parse() {
        let config = GeniusConfig::try_from(base_args()).expect("config should parse");
        assert_eq!(config.location, "us-central1");
        assert_eq!(config.model, "gemini-1.0-pro");
        assert!(config.enable_stdio);
        assert!(!config.http_serve);
    }

    #[test]
    fn missing_project_is_rejected() {
        let mut args = base_args();
        args.project_id = None;
        assert!(matches!(
            GeniusConfig::try_from(args),
            Err(ConfigError::MissingSetting("PROJECT_ID"))
        ));
    }

    #[test]
    fn blank_dataset_is_rejected() {
        let mut args = base_args();
        args.dataset_id = Some("  ".to_string());
        assert!(matches!(
            GeniusConfig::try_from(args),
            Err(ConfigError::MissingSetting("DATASET_ID"))
        ));
    }

    #[test]
    fn at_least_one_transport_is_required() {
        let mut args = base_args();
        args.enable_stdio = false;
        args.http_serve = false;
        assert!(GeniusConfig::try_from(args).is_err());
    }
}
