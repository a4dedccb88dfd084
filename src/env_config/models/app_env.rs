use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Env {
    Local,
    Dev,
    Prod,
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Dev => write!(f, "dev"),
            Env::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for Env {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Env::Local),
            "dev" => Ok(Env::Dev),
            "prod" => Ok(Env::Prod),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppEnv {
    pub env: Env,
    pub server_port: u16,
    pub server_address: String,
    /// Базовый URL REST бэкенда, например http://localhost:8000
    pub backend_url: String,
}

impl AppEnv {
    pub fn is_local(&self) -> bool {
        self.env == Env::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_from_str() {
        assert_eq!(Env::from_str("local"), Ok(Env::Local));
        assert_eq!(Env::from_str("PROD"), Ok(Env::Prod));
        assert!(Env::from_str("staging").is_err());
    }

    #[test]
    fn test_env_display_matches_config_file_names() {
        assert_eq!(Env::Local.to_string(), "local");
        assert_eq!(Env::Dev.to_string(), "dev");
        assert_eq!(Env::Prod.to_string(), "prod");
    }
}
