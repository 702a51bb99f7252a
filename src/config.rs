//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent a `quack.yaml`
//! project configuration, as well as the logic for loading and validating
//! it.
//!
//! ## Key Components
//!
//! - **`ProjectConfig`**: The whole document; project metadata, the module
//!   mapping, and the profile mapping. A valid config always contains an
//!   `init` profile, which is the default when no profile is named.
//!
//! - **`ModuleSpec`**: One vendored module; repository URL, optional
//!   sub-path, reference selectors (branch/tag/hexsha) and the `isfile`
//!   flag.
//!
//! - **`ProfileSpec`**: A named, ordered pipeline of task tokens plus its
//!   dependency list.
//!
//! ## Parsing
//!
//! Configs are hand-authored YAML, so parsing is deliberately permissive:
//! `modules:` and `profiles:` may be explicit nulls (the scaffolded
//! starter file writes an empty `modules:`), and a profile's
//! `dependencies` accepts both a mapping form
//! (`dependencies: {quack: 'pyanalytic/build.yaml:update'}`) and a
//! sequence form. Both are normalized into an ordered list of
//! [`Dependency`] entries.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default config file name when `-y/--yaml` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "quack.yaml";

/// Default profile name when `-p/--profile` is not given.
pub const DEFAULT_PROFILE: &str = "init";

/// One vendored module declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// URL of the source repository. Required for a module to be syncable;
    /// kept optional here so a config with one broken module still loads
    /// and the resolver can report `InvalidModuleSpec` with the module key.
    #[serde(default)]
    pub repository: Option<String>,
    /// Sub-path within the repository to extract. Defaults to the
    /// repository root.
    #[serde(default)]
    pub path: Option<String>,
    /// Branch selector. Lowest precedence of the three.
    #[serde(default)]
    pub branch: Option<String>,
    /// Tag selector.
    #[serde(default)]
    pub tag: Option<String>,
    /// Commit hexsha selector. Highest precedence.
    #[serde(default)]
    pub hexsha: Option<String>,
    /// When true, the extracted target is copied as a single file rather
    /// than materialized as a directory tree.
    #[serde(default)]
    pub isfile: bool,
}

/// A normalized profile dependency: a kind (currently only `quack` is
/// understood) and its descriptor string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub kind: String,
    pub descriptor: String,
}

/// Raw dependency list as it appears in YAML.
///
/// Usually a mapping; a sequence of tokens or single-entry mappings is
/// also accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependencies {
    /// `dependencies: {quack: 'pyanalytic/build.yaml:update'}`
    Map(serde_yaml::Mapping),
    /// `dependencies: ['quack:pyanalytic/build.yaml:update']`
    Seq(Vec<DependencyEntry>),
}

/// One entry of the sequence form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyEntry {
    /// `- quack: 'pyanalytic/build.yaml:update'`
    Tagged(serde_yaml::Mapping),
    /// `- 'quack:pyanalytic/build.yaml:update'`
    Token(String),
}

/// A named, ordered pipeline of tasks plus its preconditions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSpec {
    /// Task tokens, executed in listed order.
    #[serde(default)]
    pub tasks: Vec<String>,
    /// Dependencies, resolved and executed before any task runs.
    #[serde(default)]
    pub dependencies: Option<Dependencies>,
    /// When true, a failed shell task aborts the remaining task list.
    /// Sync failures always abort regardless of this flag.
    #[serde(default, rename = "fail-fast")]
    pub fail_fast: bool,
}

impl ProfileSpec {
    /// Normalize the raw dependency list into ordered [`Dependency`]
    /// entries. Mapping and sequence forms are flattened identically;
    /// plain string tokens split on the first colon into kind and
    /// descriptor.
    pub fn dependency_list(&self) -> Result<Vec<Dependency>> {
        let mut out = Vec::new();
        let Some(raw) = &self.dependencies else {
            return Ok(out);
        };
        match raw {
            Dependencies::Map(map) => {
                for (key, value) in map {
                    out.push(dependency_from_pair(key, value)?);
                }
            }
            Dependencies::Seq(entries) => {
                for entry in entries {
                    match entry {
                        DependencyEntry::Tagged(map) => {
                            for (key, value) in map {
                                out.push(dependency_from_pair(key, value)?);
                            }
                        }
                        DependencyEntry::Token(token) => {
                            let (kind, descriptor) =
                                token.split_once(':').ok_or_else(|| Error::Config {
                                    message: format!("invalid dependency token '{}'", token),
                                    hint: Some(
                                        "dependency tokens look like 'quack:<config-path>:<profile>'"
                                            .to_string(),
                                    ),
                                })?;
                            out.push(Dependency {
                                kind: kind.to_string(),
                                descriptor: descriptor.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}

fn dependency_from_pair(key: &serde_yaml::Value, value: &serde_yaml::Value) -> Result<Dependency> {
    let kind = key.as_str().ok_or_else(|| Error::Config {
        message: "dependency kind must be a string".to_string(),
        hint: None,
    })?;
    let descriptor = value.as_str().ok_or_else(|| Error::Config {
        message: format!("dependency '{}' descriptor must be a string", kind),
        hint: Some("e.g. quack: 'pyanalytic/build.yaml:update'".to_string()),
    })?;
    Ok(Dependency {
        kind: kind.to_string(),
        descriptor: descriptor.to_string(),
    })
}

/// A loaded project configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name.
    pub name: String,
    /// Free-form description, informational only.
    #[serde(default)]
    pub description: Option<String>,
    /// Version string, informational only.
    #[serde(default)]
    pub version: Option<String>,
    /// Whether synced module paths are maintained in `.gitignore`.
    #[serde(default = "default_gitignore")]
    pub gitignore: bool,
    /// Module key -> declaration.
    #[serde(default, deserialize_with = "null_to_default")]
    pub modules: BTreeMap<String, ModuleSpec>,
    /// Profile name -> pipeline. Must contain `init`.
    #[serde(default, deserialize_with = "null_to_default")]
    pub profiles: BTreeMap<String, ProfileSpec>,
}

fn default_gitignore() -> bool {
    true
}

/// Accept explicit YAML nulls where a mapping is expected, e.g. the
/// scaffolded `modules:` line with no entries.
fn null_to_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProjectConfig {
    /// Structural validation, run once at load time before anything
    /// executes.
    pub fn validate(&self) -> Result<()> {
        if !self.profiles.contains_key(DEFAULT_PROFILE) {
            return Err(Error::Config {
                message: format!("no '{}' profile defined", DEFAULT_PROFILE),
                hint: Some(
                    "every quack config needs an 'init' profile; add\n\
                     profiles:\n  init:\n    tasks: ['modules']"
                        .to_string(),
                ),
            });
        }
        Ok(())
    }
}

/// Parse a YAML string into a validated [`ProjectConfig`].
pub fn parse(yaml_content: &str) -> Result<ProjectConfig> {
    let config: ProjectConfig = serde_yaml::from_str(yaml_content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a configuration file.
pub fn from_file(path: &Path) -> Result<ProjectConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}

/// Starter configuration written by the scaffold prompt.
pub fn starter_template(project_name: &str) -> String {
    format!(
        "name: {}\n\
         modules:\n\
         profiles:\n  \
           init:\n    \
             tasks: ['modules']\n",
        project_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
name: example
description: Example project
version: 1.0.2
gitignore: true
modules:
  pyanalytic:
    repository: 'https://github.com/test/pyanalytic.git'
    branch: master
  subscribe:
    repository: 'https://github.com/test/subscribe.git'
    path: src/subscribe
    hexsha: 1e32c6e5a8f9c4d2b7a0e3f16c9d8b5a4f7e2c1d
  toggleicon:
    repository: 'https://github.com/test/toggleicon.git'
    tag: v0.2.0
profiles:
  init:
    tasks: ['modules']
  update:
    dependencies:
      quack: 'pyanalytic/build.yaml:update'
    tasks: ['modules:subscribe']
  clean:
    tasks: ['-modules']
"#;

    #[test]
    fn test_parse_example_config() {
        let config = parse(EXAMPLE).unwrap();
        assert_eq!(config.name, "example");
        assert_eq!(config.version.as_deref(), Some("1.0.2"));
        assert!(config.gitignore);
        assert_eq!(config.modules.len(), 3);
        assert_eq!(config.profiles.len(), 3);

        let subscribe = &config.modules["subscribe"];
        assert_eq!(subscribe.path.as_deref(), Some("src/subscribe"));
        assert!(subscribe.hexsha.is_some());
        assert!(!subscribe.isfile);

        let clean = &config.profiles["clean"];
        assert_eq!(clean.tasks, vec!["-modules"]);
    }

    #[test]
    fn test_gitignore_defaults_true() {
        let config = parse(
            "name: p\nprofiles:\n  init:\n    tasks: ['modules']\n",
        )
        .unwrap();
        assert!(config.gitignore);
    }

    #[test]
    fn test_missing_init_profile_fails_validation() {
        let err = parse(
            "name: p\nprofiles:\n  update:\n    tasks: ['modules']\n",
        )
        .unwrap_err();
        let display = format!("{}", err);
        assert!(display.contains("Configuration error"));
        assert!(display.contains("init"));
    }

    #[test]
    fn test_empty_profiles_fails_validation() {
        let err = parse("name: p\nprofiles:\n").unwrap_err();
        assert!(format!("{}", err).contains("init"));
    }

    #[test]
    fn test_null_modules_mapping_is_empty() {
        let config = parse(
            "name: p\nmodules:\nprofiles:\n  init:\n    tasks: ['modules']\n",
        )
        .unwrap();
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_dependency_mapping_form() {
        let config = parse(EXAMPLE).unwrap();
        let deps = config.profiles["update"].dependency_list().unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].kind, "quack");
        assert_eq!(deps[0].descriptor, "pyanalytic/build.yaml:update");
    }

    #[test]
    fn test_dependency_sequence_form() {
        let yaml = r#"
name: p
profiles:
  init:
    dependencies:
      - 'quack:lib/quack.yaml:init'
      - quack: 'tools/quack.yaml'
    tasks: ['modules']
"#;
        let config = parse(yaml).unwrap();
        let deps = config.profiles["init"].dependency_list().unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].descriptor, "lib/quack.yaml:init");
        assert_eq!(deps[1].descriptor, "tools/quack.yaml");
    }

    #[test]
    fn test_dependency_non_string_descriptor_fails() {
        let yaml = r#"
name: p
profiles:
  init:
    dependencies:
      quack: [1, 2]
    tasks: ['modules']
"#;
        let config = parse(yaml).unwrap();
        assert!(config.profiles["init"].dependency_list().is_err());
    }

    #[test]
    fn test_fail_fast_flag() {
        let yaml = r#"
name: p
profiles:
  init:
    fail-fast: true
    tasks: ['cmd:false']
"#;
        let config = parse(yaml).unwrap();
        assert!(config.profiles["init"].fail_fast);
        assert!(!ProfileSpec::default().fail_fast);
    }

    #[test]
    fn test_starter_template_parses() {
        let config = parse(&starter_template("demo")).unwrap();
        assert_eq!(config.name, "demo");
        assert!(config.modules.is_empty());
        assert_eq!(config.profiles["init"].tasks, vec!["modules"]);
    }
}
