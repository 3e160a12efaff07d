use std::env;
use std::path::PathBuf;

use chess_coach_core::coach::DEFAULT_MODEL;
use chess_coach_core::DEFAULT_MIN_PATTERN_GAMES;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub stockfish_path: String,
    pub books_dir: PathBuf,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub min_pattern_games: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or unparsable values
    /// fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: non_empty("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            stockfish_path: non_empty("STOCKFISH_PATH").unwrap_or_else(|| "stockfish".to_string()),
            books_dir: non_empty("BOOKS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/books")),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            anthropic_model: non_empty("ANTHROPIC_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            min_pattern_games: non_empty("MIN_PATTERN_GAMES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MIN_PATTERN_GAMES),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.stockfish_path, "stockfish");
        assert_eq!(config.books_dir, PathBuf::from("data/books"));
        assert_eq!(config.anthropic_api_key, None);
        assert_eq!(config.min_pattern_games, 5);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let vars: HashMap<&str, &str> = [
            ("PORT", "not-a-port"),
            ("STOCKFISH_PATH", "/usr/games/stockfish"),
            ("ANTHROPIC_API_KEY", "  "),
            ("MIN_PATTERN_GAMES", "3"),
        ]
        .into_iter()
        .collect();
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.port, 8000);
        assert_eq!(config.stockfish_path, "/usr/games/stockfish");
        assert_eq!(config.anthropic_api_key, None);
        assert_eq!(config.min_pattern_games, 3);
    }
}
