//! Preset records and per-field merge rules

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One configured post-step command, gated by an optional marker and a
/// lifecycle stage name.
///
/// `command` is kept as a raw TOML value so that a malformed entry (missing
/// or non-list command) surfaces as a runtime warning on the one entry
/// instead of failing the whole document parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraCommand {
    /// The argument vector to execute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<toml::Value>,
    /// Marker expression gating execution (e.g. `odoo_version <= '13.0'`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    /// Lifecycle stage name; unset means the default stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Per-command environment variable overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, toml::Value>>,
}

impl ExtraCommand {
    /// The command as an argument vector, or `None` when the field is
    /// missing or not a list of strings.
    pub fn argv(&self) -> Option<Vec<String>> {
        let toml::Value::Array(items) = self.command.as_ref()? else {
            return None;
        };
        if items.is_empty() {
            return None;
        }
        items
            .iter()
            .map(|item| item.as_str().map(String::from))
            .collect()
    }

    /// Environment overrides with scalar values converted to text.
    pub fn env_strings(&self) -> BTreeMap<String, String> {
        let Some(env) = &self.env else {
            return BTreeMap::new();
        };
        env.iter()
            .map(|(key, value)| (key.clone(), value_to_string(value)))
            .collect()
    }
}

fn value_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A named bag of optional provisioning options.
///
/// Every field is optional: an unset field means "not specified here", so
/// presets can be layered without clobbering each other's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_odoo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_odoo_requirements: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_from_odoo_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_addons_dirs_requirements: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_from_addons_dirs_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_addons_manifests_requirements: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_from_addons_manifests_requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_requirements_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_requirement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_commands: Option<Vec<ExtraCommand>>,
}

impl Preset {
    /// Rebuild this preset on top of the `common` base preset.
    ///
    /// Combination rules per field type:
    /// - `extra_commands` lists concatenate, common's entries first;
    /// - comma-joined package-name strings (the `ignore_from_*` fields and
    ///   `extra_requirement`) concatenate as `"common,preset"` when both
    ///   sides are non-empty;
    /// - every other field is replaced outright by this preset's value when
    ///   present, falling back to common's;
    /// - common's `description` is never inherited.
    pub fn layered_over_common(&self, common: &Preset) -> Preset {
        Preset {
            description: self.description.clone(),
            install_odoo: self.install_odoo.or(common.install_odoo),
            install_odoo_requirements: self
                .install_odoo_requirements
                .or(common.install_odoo_requirements),
            ignore_from_odoo_requirements: join_csv(
                common.ignore_from_odoo_requirements.as_deref(),
                self.ignore_from_odoo_requirements.as_deref(),
            ),
            install_addons_dirs_requirements: self
                .install_addons_dirs_requirements
                .or(common.install_addons_dirs_requirements),
            ignore_from_addons_dirs_requirements: join_csv(
                common.ignore_from_addons_dirs_requirements.as_deref(),
                self.ignore_from_addons_dirs_requirements.as_deref(),
            ),
            install_addons_manifests_requirements: self
                .install_addons_manifests_requirements
                .or(common.install_addons_manifests_requirements),
            ignore_from_addons_manifests_requirements: join_csv(
                common.ignore_from_addons_manifests_requirements.as_deref(),
                self.ignore_from_addons_manifests_requirements.as_deref(),
            ),
            extra_requirements_file: self
                .extra_requirements_file
                .clone()
                .or_else(|| common.extra_requirements_file.clone()),
            extra_requirement: join_csv(
                common.extra_requirement.as_deref(),
                self.extra_requirement.as_deref(),
            ),
            extra_commands: concat_commands(
                common.extra_commands.as_deref(),
                self.extra_commands.as_deref(),
            ),
        }
    }
}

/// Concatenate comma-joined text, base first, when both sides are
/// non-empty; otherwise whichever side is set.
fn join_csv(base: Option<&str>, own: Option<&str>) -> Option<String> {
    match (
        base.filter(|s| !s.trim().is_empty()),
        own.filter(|s| !s.trim().is_empty()),
    ) {
        (Some(base), Some(own)) => Some(format!("{base},{own}")),
        (Some(base), None) => Some(base.to_string()),
        (None, Some(own)) => Some(own.to_string()),
        (None, None) => None,
    }
}

fn concat_commands(
    base: Option<&[ExtraCommand]>,
    own: Option<&[ExtraCommand]>,
) -> Option<Vec<ExtraCommand>> {
    match (base, own) {
        (Some(base), Some(own)) => Some(base.iter().chain(own.iter()).cloned().collect()),
        (Some(base), None) => Some(base.to_vec()),
        (None, Some(own)) => Some(own.to_vec()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn command(label: &str) -> ExtraCommand {
        ExtraCommand {
            command: Some(toml::Value::Array(vec![
                toml::Value::String("echo".into()),
                toml::Value::String(label.into()),
            ])),
            when: None,
            stage: None,
            env: None,
        }
    }

    #[test]
    fn test_extra_commands_concatenate_common_first() {
        let common = Preset {
            install_odoo_requirements: Some(true),
            extra_commands: Some(vec![command("from-common")]),
            ..Default::default()
        };
        let preset = Preset {
            extra_commands: Some(vec![command("from-preset")]),
            ..Default::default()
        };

        let merged = preset.layered_over_common(&common);
        assert_eq!(merged.install_odoo_requirements, Some(true));
        assert_eq!(
            merged.extra_commands,
            Some(vec![command("from-common"), command("from-preset")])
        );
    }

    #[test]
    fn test_ignore_strings_concatenate_as_csv() {
        let common = Preset {
            ignore_from_odoo_requirements: Some("foo".into()),
            ..Default::default()
        };
        let preset = Preset {
            ignore_from_odoo_requirements: Some("bar".into()),
            ..Default::default()
        };
        let merged = preset.layered_over_common(&common);
        assert_eq!(
            merged.ignore_from_odoo_requirements,
            Some("foo,bar".into())
        );
    }

    #[test]
    fn test_scalar_fields_replaced_outright() {
        let common = Preset {
            install_odoo: Some(true),
            extra_requirements_file: Some("/common/extra.txt".into()),
            ..Default::default()
        };
        let preset = Preset {
            install_odoo: Some(false),
            extra_requirements_file: Some("/preset/extra.txt".into()),
            ..Default::default()
        };
        let merged = preset.layered_over_common(&common);
        assert_eq!(merged.install_odoo, Some(false));
        assert_eq!(
            merged.extra_requirements_file,
            Some("/preset/extra.txt".into())
        );
    }

    #[test]
    fn test_common_description_not_inherited() {
        let common = Preset {
            description: Some("shared options".into()),
            ..Default::default()
        };
        let preset = Preset::default();
        let merged = preset.layered_over_common(&common);
        assert_eq!(merged.description, None);
    }

    #[test]
    fn test_empty_side_does_not_produce_dangling_comma() {
        let common = Preset {
            ignore_from_odoo_requirements: Some("foo".into()),
            ..Default::default()
        };
        let merged = Preset::default().layered_over_common(&common);
        assert_eq!(merged.ignore_from_odoo_requirements, Some("foo".into()));

        assert_eq!(join_csv(Some("  "), Some("bar")), Some("bar".to_string()));
    }

    #[test]
    fn test_argv_requires_string_list() {
        assert_eq!(
            command("x").argv(),
            Some(vec!["echo".to_string(), "x".to_string()])
        );

        let missing = ExtraCommand {
            command: None,
            when: None,
            stage: None,
            env: None,
        };
        assert_eq!(missing.argv(), None);

        let not_a_list = ExtraCommand {
            command: Some(toml::Value::String("echo x".into())),
            ..missing.clone()
        };
        assert_eq!(not_a_list.argv(), None);

        let mixed = ExtraCommand {
            command: Some(toml::Value::Array(vec![
                toml::Value::String("echo".into()),
                toml::Value::Integer(3),
            ])),
            ..missing
        };
        assert_eq!(mixed.argv(), None);
    }

    #[test]
    fn test_env_values_converted_to_text() {
        let mut env = BTreeMap::new();
        env.insert("RETRIES".to_string(), toml::Value::Integer(3));
        env.insert(
            "MODE".to_string(),
            toml::Value::String("fast".to_string()),
        );
        let cmd = ExtraCommand {
            command: None,
            when: None,
            stage: None,
            env: Some(env),
        };
        let strings = cmd.env_strings();
        assert_eq!(strings["RETRIES"], "3");
        assert_eq!(strings["MODE"], "fast");
    }
}
