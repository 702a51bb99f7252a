//! # Error Suggestions
//!
//! Helper functions for generating CLI errors with hints. An error should
//! tell the user what went wrong AND how to fix it.

use std::path::Path;

/// Generate an error for when the configuration file is not found.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Run quack in a terminal to scaffold a starter quack.yaml\n\
         hint: Use -y/--yaml to specify a different path\n\
         hint: Set the QUACK_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for a profile name that is not defined, listing the
/// profiles that are.
pub fn unknown_profile<'a>(
    profile: &str,
    available: impl Iterator<Item = &'a str>,
) -> anyhow::Error {
    let mut names: Vec<&str> = available.collect();
    names.sort_unstable();
    anyhow::anyhow!(
        "Profile '{profile}' is not defined\n\n\
         hint: Available profiles: {names}\n\
         hint: Omit -p/--profile to run 'init'",
        profile = profile,
        names = names.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_not_found_mentions_flag_and_env() {
        let err = config_not_found(&PathBuf::from("missing.yaml"));
        let message = format!("{}", err);
        assert!(message.contains("missing.yaml"));
        assert!(message.contains("-y/--yaml"));
        assert!(message.contains("QUACK_CONFIG"));
    }

    #[test]
    fn test_unknown_profile_lists_alternatives() {
        let err = unknown_profile("updaet", ["init", "update", "clean"].into_iter());
        let message = format!("{}", err);
        assert!(message.contains("'updaet'"));
        assert!(message.contains("clean, init, update"));
    }
}
