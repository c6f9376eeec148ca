//! INI file configuration adapter.

use crate::domain::error::QuantscreenError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, QuantscreenError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| QuantscreenError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, QuantscreenError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| QuantscreenError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config_validation::max_depth;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[data]
dir = /var/quotes

[backtest]
symbols = bhp, cba
strategy = strategies/breakout.json
max_depth = 32

[logging]
level = debug
"#;

    #[test]
    fn reads_all_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "dir"), Some("/var/quotes".to_string()));
        assert_eq!(adapter.get_string("backtest", "symbols"), Some("bhp, cba".to_string()));
        assert_eq!(adapter.get_int("backtest", "max_depth", 64), 32);
        assert_eq!(adapter.get_string("logging", "level"), Some("debug".to_string()));
    }

    #[test]
    fn missing_keys_fall_back() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("backtest", "max_depth", 64), 64);
    }

    #[test]
    fn non_numeric_values_fall_back() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nmax_depth = abc\n").unwrap();
        assert_eq!(adapter.get_int("backtest", "max_depth", 42), 42);
    }

    #[test]
    fn max_depth_reads_through_typed_getter() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(max_depth(&adapter).unwrap(), 32);

        let adapter = FileConfigAdapter::from_string("[backtest]\nmax_depth = 4096\n").unwrap();
        assert!(matches!(
            max_depth(&adapter),
            Err(QuantscreenError::ConfigInvalid { ref key, .. }) if key == "max_depth"
        ));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "strategy"),
            Some("strategies/breakout.json".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, QuantscreenError::ConfigParse { .. }));
    }
}
