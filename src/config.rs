//! Engine configuration, deserializable from TOML.

use serde::Deserialize;

use crate::generator::ChunkGenerator;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of resident chunks.
    pub cache_capacity: usize,
    /// Worker thread count; `None` picks hardware parallelism minus one.
    pub workers: Option<usize>,
    pub generator: ChunkGenerator,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 4096,
            workers: None,
            generator: ChunkGenerator::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.cache_capacity, 4096);
        assert_eq!(cfg.workers, None);
        assert_eq!(cfg.generator, ChunkGenerator::default());
    }

    #[test]
    fn parses_full_config() {
        let cfg = EngineConfig::from_toml_str(
            r#"
cache_capacity = 128
workers = 3

[generator]
kind = "sine"
amplitude = 12.0
period = 40.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.cache_capacity, 128);
        assert_eq!(cfg.workers, Some(3));
        assert_eq!(
            cfg.generator,
            ChunkGenerator::Sine {
                amplitude: 12.0,
                period: 40.0
            }
        );
    }
}
