//! Preset store tests over a temporary root directory

use std::fs;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use ovenv_presets::PresetStore;

fn store_with_overlay(overlay: &str) -> (TempDir, PresetStore) {
    let dir = TempDir::new().unwrap();
    let store = PresetStore::new(dir.path());
    fs::write(store.user_presets_path(), overlay).unwrap();
    (dir, store)
}

#[test]
fn common_section_layers_beneath_every_preset() {
    let (_dir, store) = store_with_overlay(
        r#"
[common]
install_odoo_requirements = true
ignore_from_odoo_requirements = "foo"

[[common.extra_commands]]
command = ["echo", "common"]

[preset_x]
description = "preset x"
ignore_from_odoo_requirements = "bar"

[[preset_x.extra_commands]]
command = ["echo", "x"]
"#,
    );

    let presets = store.load().unwrap();
    let preset_x = &presets["preset_x"];

    assert_eq!(preset_x.install_odoo_requirements, Some(true));
    assert_eq!(
        preset_x.ignore_from_odoo_requirements.as_deref(),
        Some("foo,bar")
    );

    let commands = preset_x.extra_commands.as_ref().unwrap();
    assert_eq!(commands.len(), 2);
    assert_eq!(
        commands[0].argv(),
        Some(vec!["echo".to_string(), "common".to_string()])
    );
    assert_eq!(
        commands[1].argv(),
        Some(vec!["echo".to_string(), "x".to_string()])
    );
}

#[test]
fn common_itself_is_not_rebuilt() {
    let (_dir, store) = store_with_overlay(
        r#"
[common]
description = "shared"
ignore_from_odoo_requirements = "foo"

[other]
description = "other"
"#,
    );

    let presets = store.load().unwrap();
    assert_eq!(
        presets["common"].ignore_from_odoo_requirements.as_deref(),
        Some("foo")
    );
    assert_eq!(presets["common"].description.as_deref(), Some("shared"));
    // description never flows from common into other presets
    assert_eq!(presets["other"].description.as_deref(), Some("other"));
    assert_eq!(
        presets["other"].ignore_from_odoo_requirements.as_deref(),
        Some("foo")
    );
}

#[test]
fn shipped_legacy_preset_carries_staged_command() {
    let dir = TempDir::new().unwrap();
    let store = PresetStore::new(dir.path());
    let presets = store.load().unwrap();

    let legacy = &presets["legacy"];
    let commands = legacy.extra_commands.as_ref().unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].stage.as_deref(), Some("after_requirements"));
    assert_eq!(commands[0].when.as_deref(), Some("odoo_version <= '13.0'"));
    assert!(commands[0].argv().unwrap().starts_with(&["uv".to_string()]));
}

#[test]
fn loaded_fresh_on_every_invocation() {
    let dir = TempDir::new().unwrap();
    let store = PresetStore::new(dir.path());

    let before = store.load().unwrap();
    assert!(before["oca"].extra_requirement.is_none());

    fs::write(
        store.user_presets_path(),
        "[oca]\nextra_requirement = \"ipython\"\n",
    )
    .unwrap();

    let after = store.load().unwrap();
    assert_eq!(after["oca"].extra_requirement.as_deref(), Some("ipython"));
}
