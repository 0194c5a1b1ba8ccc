use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub game: Game,
    #[serde(default)]
    pub spotify: Spotify,
}
impl Config {
    pub const FILENAME: &str = "config.toml";

    pub fn load() -> Self {
        match std::fs::read_to_string(Self::FILENAME) {
            Ok(contents) => {
                // Config exists, try to parse it
                match toml::from_str(&contents) {
                    Ok(config) => config,
                    Err(e) => panic!("Failed to parse {}: {e}", Self::FILENAME),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // No config exists, create default
                tracing::info!("no config file found, creating default config");
                Config::default()
            }
            Err(e) => {
                // Some other IO error occurred while reading
                panic!("Failed to read {}: {e}", Self::FILENAME)
            }
        }
    }

    pub fn save(&self) {
        std::fs::write(Self::FILENAME, toml::to_string(self).unwrap()).unwrap();
        tracing::info!("saved config to {}", Self::FILENAME);
    }
}

/// Game defaults used when an invocation doesn't override them.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Game {
    /// Tracks per game.
    pub length: usize,
    /// Playlist reference to play when none is given.
    pub default_playlist: String,
}
impl Default for Game {
    fn default() -> Self {
        Self {
            length: 15,
            default_playlist: String::new(),
        }
    }
}

/// Credentials for the catalog's client-credentials exchange.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Spotify {
    pub client_id: String,
    pub client_secret: String,
}
impl Default for Spotify {
    fn default() -> Self {
        Self {
            client_id: "YOUR_CLIENT_ID".to_string(),
            client_secret: "YOUR_CLIENT_SECRET".to_string(),
        }
    }
}
