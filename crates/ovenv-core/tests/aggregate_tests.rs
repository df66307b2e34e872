//! End-to-end aggregation tests over real files on disk

use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use ovenv_core::{IgnoreList, RequirementSources, TargetEnv, aggregate};

fn env_for(odoo_version: &str, python_version: &str) -> TargetEnv {
    let mut env = TargetEnv::new();
    env.set("odoo_version", odoo_version);
    env.set("python_version", python_version);
    env
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn aggregates_all_sources_in_fixed_order() {
    let dir = TempDir::new().unwrap();
    let core = write(
        &dir,
        "odoo/requirements.txt",
        "# Odoo core\nBabel==2.9.1\nlxml>=4.5 ; python_version >= '3.8'\n",
    );
    let addons = write(&dir, "addons/requirements.txt", "requests>=2.20\n");
    let extra = write(&dir, "extra.txt", "pytest\n");
    let manifest = write(
        &dir,
        "addons/crm_ldap/__manifest__.py",
        "{'name': 'crm_ldap', 'external_dependencies': {'python': ['python-ldap']}}",
    );

    let sources = RequirementSources {
        core_file: Some(core),
        addons_files: vec![addons],
        inline_extras: vec!["ipython".to_string()],
        extra_file: Some(extra),
        manifest_files: vec![manifest],
    };

    let env = env_for("17.0", "3.10");
    let ignore = IgnoreList::build(&[], &env);
    let mut out = Vec::new();
    let count = aggregate(&sources, &ignore, &env, &mut out).unwrap();

    assert_eq!(count, 6);
    // Order: core file, addons files, inline extras, extra file, manifests.
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Babel==2.9.1\nlxml>=4.5\nrequests>=2.20\nipython\npytest\npython-ldap\n"
    );
}

#[test]
fn ignore_list_filters_across_sources() {
    let dir = TempDir::new().unwrap();
    let core = write(&dir, "requirements.txt", "gevent==21.8.0\ngreenlet==1.1.2\n");

    let env = env_for("17.0", "3.10");
    let ignore = IgnoreList::build(&["gevent>=21.0".to_string()], &env);
    let sources = RequirementSources {
        core_file: Some(core),
        ..Default::default()
    };

    let mut out = Vec::new();
    let count = aggregate(&sources, &ignore, &env, &mut out).unwrap();
    assert_eq!(count, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "greenlet==1.1.2\n");
}

#[test]
fn markers_select_per_target_environment() {
    let dir = TempDir::new().unwrap();
    let core = write(
        &dir,
        "requirements.txt",
        "old-compat ; odoo_version < '14.0'\nnew-shim ; odoo_version >= '14.0'\n",
    );
    let sources = RequirementSources {
        core_file: Some(core),
        ..Default::default()
    };

    let old_env = env_for("13.0", "3.7");
    let ignore = IgnoreList::build(&[], &old_env);
    let mut out = Vec::new();
    aggregate(&sources, &ignore, &old_env, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "old-compat\n");

    let new_env = env_for("17.0", "3.10");
    let mut out = Vec::new();
    aggregate(&sources, &ignore, &new_env, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "new-shim\n");
}

#[test]
fn manifest_dependency_falls_back_to_name_ignore() {
    let dir = TempDir::new().unwrap();
    // "ldap" alone is valid requirement syntax, so use a string that is not.
    let manifest = write(
        &dir,
        "__manifest__.py",
        "{'external_dependencies': {'python': ['ldap (unversioned build)', 'vobject']}}",
    );
    let sources = RequirementSources {
        manifest_files: vec![manifest],
        ..Default::default()
    };

    let env = env_for("17.0", "3.10");
    let ignore = IgnoreList::build(&["ldap".to_string()], &env);
    let mut out = Vec::new();
    let count = aggregate(&sources, &ignore, &env, &mut out).unwrap();
    assert_eq!(count, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "vobject\n");
}

#[test]
fn unreadable_manifest_is_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let bad = write(&dir, "__manifest__.py", "{'name': import_something()}");
    let good = write(
        &dir,
        "good/__manifest__.py",
        "{'external_dependencies': {'python': ['requests']}}",
    );
    let sources = RequirementSources {
        manifest_files: vec![bad, good],
        ..Default::default()
    };

    let env = env_for("17.0", "3.10");
    let ignore = IgnoreList::build(&[], &env);
    let mut out = Vec::new();
    let count = aggregate(&sources, &ignore, &env, &mut out).unwrap();
    assert_eq!(count, 1);
    assert_eq!(String::from_utf8(out).unwrap(), "requests\n");
}

#[test]
fn zero_matching_lines_yields_zero_count() {
    let dir = TempDir::new().unwrap();
    let core = write(&dir, "requirements.txt", "# only comments\n\n");
    let sources = RequirementSources {
        core_file: Some(core),
        ..Default::default()
    };

    let env = env_for("17.0", "3.10");
    let ignore = IgnoreList::build(&[], &env);
    let mut out = Vec::new();
    let count = aggregate(&sources, &ignore, &env, &mut out).unwrap();
    assert_eq!(count, 0);
    assert!(out.is_empty());
}
