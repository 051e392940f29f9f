//! Settings document reader
//!
//! Reads one YAML file and resolves two tags on the way:
//!
//! - `!include other.yaml` replaces the value with another document, resolved
//!   relative to the file holding the tag
//! - `!env_var NAME` or `!env_var NAME default` substitutes an environment
//!   variable; booleans and numbers keep their YAML type
//!
//! Any other tag is rejected. Mapping keys are taken as written.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

const INCLUDE_TAG: &str = "!include";
const ENV_VAR_TAG: &str = "!env_var";

/// Read the settings document at `path` with its includes resolved
pub fn read_settings(path: &Path) -> ConfigResult<Value> {
    DocumentReader::default().read(path)
}

#[derive(Default)]
struct DocumentReader {
    /// Files currently being read, outermost first
    open: Vec<PathBuf>,
}

impl DocumentReader {
    fn read(&mut self, path: &Path) -> ConfigResult<Value> {
        if self.open.iter().any(|open| open == path) {
            let mut chain = self.open.clone();
            chain.push(path.to_path_buf());
            return Err(ConfigError::IncludeCycle { chain });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Value =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), depth = self.open.len(), "Read settings document");

        self.open.push(path.to_path_buf());
        let resolved = self.resolve(document, path, "");
        self.open.pop();
        resolved
    }

    fn resolve(&mut self, value: Value, origin: &Path, key: &str) -> ConfigResult<Value> {
        match value {
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (k, v) in map {
                    let child = child_key(key, &key_text(&k));
                    resolved.insert(k, self.resolve(v, origin, &child)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| self.resolve(item, origin, &format!("{}[{}]", key_label(key), i)))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            Value::Tagged(tagged) => self.resolve_tag(*tagged, origin, key),
            other => Ok(other),
        }
    }

    fn resolve_tag(&mut self, tagged: TaggedValue, origin: &Path, key: &str) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        match tag.as_str() {
            INCLUDE_TAG => {
                let target = tag_argument(&tag, tagged.value, key)?;
                let base = origin.parent().unwrap_or_else(|| Path::new(""));
                debug!(key = %key_label(key), target = %target, "Following include");
                self.read(&base.join(target))
            }
            ENV_VAR_TAG => {
                let argument = tag_argument(&tag, tagged.value, key)?;
                env_var_value(&argument, key)
            }
            _ => Err(ConfigError::UnsupportedTag {
                key: key_label(key).to_string(),
                tag,
            }),
        }
    }
}

/// The string a tag was applied to
fn tag_argument(tag: &str, value: Value, key: &str) -> ConfigResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ConfigError::BadTagValue {
            key: key_label(key).to_string(),
            tag: tag.to_string(),
            found: serde_yaml::to_string(&other)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "a non-string value".to_string()),
        }),
    }
}

fn env_var_value(argument: &str, key: &str) -> ConfigResult<Value> {
    let (var, default) = match argument.split_once(' ') {
        Some((var, default)) => (var, Some(default.trim())),
        None => (argument, None),
    };

    let raw = match (std::env::var(var), default) {
        (Ok(value), _) => value,
        (Err(_), Some(default)) => default.to_string(),
        (Err(_), None) => {
            return Err(ConfigError::EnvVarNotFound {
                key: key_label(key).to_string(),
                var: var.to_string(),
            })
        }
    };
    debug!(key = %key_label(key), var, "Substituted environment variable");

    match serde_yaml::from_str::<Value>(&raw) {
        Ok(scalar @ (Value::Bool(_) | Value::Number(_))) => Ok(scalar),
        _ => Ok(Value::String(raw)),
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => "?".to_string(),
    }
}

fn child_key(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

fn key_label(key: &str) -> &str {
    if key.is_empty() {
        "(root)"
    } else {
        key
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    pub(crate) fn write_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn read_inline(content: &str) -> ConfigResult<Value> {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "inline.yaml", content);
        read_settings(&dir.path().join("inline.yaml"))
    }

    fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
        path.iter().try_fold(value, |v, k| v.get(*k))
    }

    #[test]
    fn test_reads_plain_document() {
        let value = read_inline("enabled_features:\n  humidity_control: true\n").unwrap();
        assert_eq!(
            lookup(&value, &["enabled_features", "humidity_control"]),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "extras/devices.yaml", "\"32:153289\": [humidity_control]\n");
        write_file(
            dir.path(),
            "extras/main.yaml",
            "device_features: !include devices.yaml\n",
        );

        let value = read_settings(&dir.path().join("extras/main.yaml")).unwrap();
        let devices = lookup(&value, &["device_features"])
            .and_then(Value::as_mapping)
            .unwrap();
        assert!(devices.contains_key("32:153289"));
    }

    #[test]
    fn test_include_cycle_reports_chain() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "a.yaml", "features: !include b.yaml\n");
        write_file(dir.path(), "b.yaml", "boost: !include a.yaml\n");

        let err = read_settings(&dir.path().join("a.yaml")).unwrap_err();
        let ConfigError::IncludeCycle { chain } = err else {
            panic!("expected an include cycle");
        };
        let names: Vec<_> = chain
            .iter()
            .filter_map(|p| p.file_name()?.to_str())
            .collect();
        assert_eq!(names, ["a.yaml", "b.yaml", "a.yaml"]);
    }

    #[test]
    fn test_missing_include_names_the_file() {
        let err = read_inline("features: !include missing.yaml\n").unwrap_err();
        assert!(
            matches!(err, ConfigError::ReadFile { ref path, .. } if path.ends_with("missing.yaml"))
        );
    }

    #[test]
    fn test_include_needs_a_file_name() {
        let err = read_inline("device_features: !include [a, b]\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BadTagValue { ref key, ref tag, .. }
                if key == "device_features" && tag == "!include"
        ));
    }

    #[test]
    fn test_env_var_keeps_yaml_type() {
        std::env::set_var("RX_CONFIG_TEST_FLAG", "true");
        std::env::set_var("RX_CONFIG_TEST_CLASS", "HvacVentilator");
        let value = read_inline(
            "enabled_features:\n  hello_world: !env_var RX_CONFIG_TEST_FLAG\n\
             features:\n  boost:\n    allowed_device_classes: [!env_var RX_CONFIG_TEST_CLASS]\n",
        )
        .unwrap();
        std::env::remove_var("RX_CONFIG_TEST_FLAG");
        std::env::remove_var("RX_CONFIG_TEST_CLASS");

        assert_eq!(
            lookup(&value, &["enabled_features", "hello_world"]),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            lookup(&value, &["features", "boost", "allowed_device_classes"])
                .and_then(|classes| classes.get(0)),
            Some(&Value::String("HvacVentilator".into()))
        );
    }

    #[test]
    fn test_env_var_default_and_missing_key() {
        let value = read_inline("enabled_features:\n  hello_world: !env_var RX_CONFIG_TEST_UNSET false\n")
            .unwrap();
        assert_eq!(
            lookup(&value, &["enabled_features", "hello_world"]),
            Some(&Value::Bool(false))
        );

        let err = read_inline("device_features:\n  \"32:153289\": [!env_var RX_CONFIG_TEST_UNSET]\n")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvVarNotFound { ref key, ref var }
                if key == "device_features.32:153289[0]" && var == "RX_CONFIG_TEST_UNSET"
        ));
    }

    #[test]
    fn test_unsupported_tag_names_the_key() {
        let err = read_inline("features:\n  boost: !secret boost_feature\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnsupportedTag { ref key, ref tag } if key == "features.boost" && tag == "!secret"
        ));

        let err = read_inline("!secret settings\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedTag { ref key, .. } if key == "(root)"));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = read_inline("key: [unclosed\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml { .. }));
    }
}
