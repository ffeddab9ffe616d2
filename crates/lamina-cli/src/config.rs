use std::path::{Path, PathBuf};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "LAMINA_CONFIG";

/// Config file location and whether it must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    pub required: bool,
}

/// Resolve the config path with priority: explicit flag > `LAMINA_CONFIG` > default.
///
/// Explicitly named files must exist; the default location is optional.
/// Returns `None` when no location applies (no flag, no env, no config dir).
pub fn resolve_config_path(
    explicit: Option<&Path>,
    env_value: Option<String>,
) -> Option<ConfigLocation> {
    if let Some(path) = explicit {
        return Some(ConfigLocation {
            path: expand_tilde(&path.to_string_lossy()),
            required: true,
        });
    }

    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return Some(ConfigLocation {
            path: expand_tilde(&value),
            required: true,
        });
    }

    default_config_path().map(|path| ConfigLocation {
        path,
        required: false,
    })
}

/// `<config_dir>/lamina/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lamina").join("config.toml"))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins_and_is_required() {
        let location = resolve_config_path(
            Some(Path::new("/tmp/flag.toml")),
            Some("/tmp/env.toml".to_string()),
        )
        .expect("location");
        assert_eq!(location.path, PathBuf::from("/tmp/flag.toml"));
        assert!(location.required);
    }

    #[test]
    fn test_env_path_beats_default() {
        let location =
            resolve_config_path(None, Some("/tmp/env.toml".to_string())).expect("location");
        assert_eq!(location.path, PathBuf::from("/tmp/env.toml"));
        assert!(location.required);
    }

    #[test]
    fn test_empty_env_falls_back_to_default() {
        let location = resolve_config_path(None, Some(String::new()));
        assert_eq!(
            location.map(|l| (l.path, l.required)),
            default_config_path().map(|p| (p, false))
        );
    }

    #[test]
    fn test_plain_path_is_untouched() {
        assert_eq!(expand_tilde("relative/config.toml"), PathBuf::from("relative/config.toml"));
    }
}
