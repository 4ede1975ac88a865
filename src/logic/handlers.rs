//! Module-specific state handlers.
//!
//! Each handler receives the mapped attribute set of one module and returns
//! its state buckets. Handlers are pure; anything they cannot make sense of
//! is reported as a build failure for the module.

use super::builder::{StateBuckets, default_buckets};
use crate::error::ConvertError;
use crate::registry::ModuleSchema;
use crate::types::{PackageManager, ResourceType, SshKeyType};
use crate::value::{Addin, Value};

/// Superuser account used when a path has no explicit owner
pub const DEFAULT_OWNER: &str = "root";

/// Shell assigned to accounts that must not log in
pub const NOLOGIN_SHELL: &str = "/sbin/nologin";

const GEM_SOURCE_SHELL: &str = "/bin/bash";

// ============================================================================
// Packages
// ============================================================================

/// How a version pin is written into a package list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinStyle {
    /// Kept as a `{name: version}` entry
    Pair,
    /// Joined into a single `name<sep>version` entry
    Joined(&'static str),
}

fn push_entry(buckets: &mut StateBuckets, state: &str, key: &str, entry: Value) {
    let bucket = buckets.entry(state.to_string()).or_default();
    match bucket.get_mut(key) {
        Some(Value::List(list)) => list.push(entry),
        _ => {
            bucket.insert(key.to_string(), Value::List(vec![entry]));
        }
    }
}

/// Route each package entry to the bucket of its target state.
///
/// Bare names go to the default state, as do scalar entries and pairs whose
/// value is empty. A `{name: value}` entry goes to the
/// bucket of `value` when it is a valid state; otherwise `value` is a version
/// pin and the pinned entry stays in the default bucket. Attributes other than
/// the package list are carried into every bucket.
fn bucket_packages(
    schema: &ModuleSchema,
    mut addin: Addin,
    key: &str,
    pin: PinStyle,
) -> Result<StateBuckets, ConvertError> {
    let default = schema.default_state();
    let entries = match addin.remove(key) {
        Some(Value::List(entries)) => entries,
        Some(Value::Str(name)) => vec![Value::Str(name)],
        Some(other) => {
            return Err(ConvertError::build_failure(
                &schema.id,
                format!("'{}' must be a package list, got {}", key, other),
            ));
        }
        None => {
            return Err(ConvertError::build_failure(
                &schema.id,
                format!("no packages given in '{}'", key),
            ));
        }
    };

    let mut buckets = StateBuckets::new();
    for entry in entries {
        match entry {
            Value::Map(pairs) => {
                for (name, target) in pairs {
                    if !target.is_truthy() {
                        push_entry(&mut buckets, default, key, Value::Str(name));
                        continue;
                    }
                    let Some(target) = target.to_text() else {
                        return Err(ConvertError::build_failure(
                            &schema.id,
                            format!("package '{}' has a non-scalar state or version: {}", name, target),
                        ));
                    };
                    if schema.has_state(&target) {
                        push_entry(&mut buckets, &target, key, Value::Str(name));
                    } else {
                        let pinned = match pin {
                            PinStyle::Pair => Value::pair(name, target),
                            PinStyle::Joined(sep) => Value::Str(format!("{}{}{}", name, sep, target)),
                        };
                        push_entry(&mut buckets, default, key, pinned);
                    }
                }
            }
            other => {
                let Some(name) = other.to_text() else {
                    return Err(ConvertError::build_failure(
                        &schema.id,
                        format!("invalid entry in '{}': {}", key, other),
                    ));
                };
                push_entry(&mut buckets, default, key, Value::Str(name));
            }
        }
    }

    for bucket in buckets.values_mut() {
        for (attr, value) in &addin {
            bucket.insert(attr.clone(), value.clone());
        }
    }
    Ok(buckets)
}

/// apt/yum packages: pins stay `{name: version}`
pub fn system_packages(schema: &ModuleSchema, addin: Addin) -> Result<StateBuckets, ConvertError> {
    bucket_packages(schema, addin, "pkgs", PinStyle::Pair)
}

/// npm packages: pins become `name@version`
pub fn npm_packages(schema: &ModuleSchema, addin: Addin) -> Result<StateBuckets, ConvertError> {
    bucket_packages(schema, addin, "names", PinStyle::Joined("@"))
}

/// pip and gem packages: pins become `name==version`
pub fn pinned_packages(schema: &ModuleSchema, addin: Addin) -> Result<StateBuckets, ConvertError> {
    bucket_packages(schema, addin, "names", PinStyle::Joined("=="))
}

// ============================================================================
// Source control, repositories
// ============================================================================

/// git/svn/hg checkouts
pub fn source_control(
    schema: &ModuleSchema,
    mut addin: Addin,
) -> Result<StateBuckets, ConvertError> {
    if let Some(Value::Str(target)) = addin.get_mut("target") {
        let trimmed = target.trim_end_matches('/');
        if !trimmed.is_empty() && trimmed.len() != target.len() {
            *target = trimmed.to_string();
        }
    }

    // git and hg take branches as revisions; svn encodes them in the url
    if let Some(branch) = addin.remove("branch") {
        if matches!(schema.resource_type, ResourceType::Git | ResourceType::Hg) {
            addin.insert("rev".to_string(), branch);
        }
    }

    if schema.resource_type == ResourceType::Git
        && addin.get("force").is_some_and(Value::is_truthy)
    {
        addin.insert("force_checkout".to_string(), Value::Bool(true));
    }

    Ok(default_buckets(schema, addin))
}

/// apt/yum repository definition files
pub fn repo_file(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    let (dir, extension) = match schema.package_manager {
        Some(PackageManager::Apt) => ("/etc/apt/sources.list.d/", ".list"),
        Some(PackageManager::Yum) => ("/etc/yum.repos.d/", ".repo"),
        None => {
            return Err(ConvertError::build_failure(
                &schema.id,
                "repository module is not bound to a package manager",
            ));
        }
    };

    if let Some(name) = addin.get("name").and_then(Value::as_str) {
        let mut filename = name.to_string();
        if !filename.ends_with(extension) {
            filename.push_str(extension);
        }
        if !filename.starts_with(dir) {
            filename.insert_str(0, dir);
        }
        addin.insert("name".to_string(), Value::Str(filename));
    }

    Ok(default_buckets(schema, addin))
}

/// Gem sources are added through a root shell command
pub fn gem_source(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    let url = addin
        .get("name")
        .and_then(Value::to_text)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ConvertError::build_failure(&schema.id, "gem source url is missing"))?;

    addin.insert("name".to_string(), Value::Str(format!("gem source --add {}", url)));
    addin.insert("shell".to_string(), Value::from(GEM_SOURCE_SHELL));
    addin.insert("user".to_string(), Value::from(DEFAULT_OWNER));
    addin.insert("group".to_string(), Value::from(DEFAULT_OWNER));

    Ok(default_buckets(schema, addin))
}

// ============================================================================
// SSH
// ============================================================================

/// Authorized keys and known hosts
pub fn ssh_key(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    if let Some(enc) = addin.get("enc") {
        let algorithm = SshKeyType::normalize(enc.as_str().unwrap_or_default());
        addin.insert("enc".to_string(), Value::Str(algorithm.to_string()));
    }

    if schema.resource_type == ResourceType::SshAuth {
        if let Some(content) = addin.get("content").and_then(Value::as_str) {
            let keys: Vec<String> = content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect();
            addin.insert("names".to_string(), Value::strings(keys));
            addin.remove("name");
        }
    }

    Ok(default_buckets(schema, addin))
}

// ============================================================================
// Paths
// ============================================================================

fn path_buckets(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    if addin.remove("absent").is_some_and(|v| v.is_truthy()) {
        let name = addin
            .remove("name")
            .ok_or_else(|| ConvertError::build_failure(&schema.id, "absent path has no name"))?;
        let mut absent = Addin::new();
        absent.insert("name".to_string(), name);

        let mut buckets = StateBuckets::new();
        buckets.insert("absent".to_string(), absent);
        return Ok(buckets);
    }

    if let Some(mode) = addin.get("mode").filter(|m| m.is_truthy()) {
        let mode = mode.to_int().ok_or_else(|| {
            ConvertError::build_failure(&schema.id, format!("invalid mode {}", mode))
        })?;
        addin.insert("mode".to_string(), Value::Int(mode));
    }

    if addin.get("recurse").is_some_and(Value::is_truthy) {
        let recurse: Vec<&str> = ["user", "group", "mode"]
            .into_iter()
            .filter(|attr| addin.get(*attr).is_some_and(Value::is_truthy))
            .collect();
        addin.insert("recurse".to_string(), Value::strings(recurse));
    } else {
        addin.remove("recurse");
    }

    addin
        .entry("user".to_string())
        .or_insert_with(|| Value::from(DEFAULT_OWNER));

    Ok(default_buckets(schema, addin))
}

/// Directories are always created with their parents
pub fn directory(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    addin.insert("makedirs".to_string(), Value::Bool(true));
    path_buckets(schema, addin)
}

/// Files and symlinks
pub fn path_entry(schema: &ModuleSchema, addin: Addin) -> Result<StateBuckets, ConvertError> {
    path_buckets(schema, addin)
}

// ============================================================================
// System
// ============================================================================

fn coerce_int(schema: &ModuleSchema, addin: &mut Addin, key: &str) -> Result<(), ConvertError> {
    if let Some(value) = addin.get(key).filter(|v| v.is_truthy()) {
        let int = value.to_int().ok_or_else(|| {
            ConvertError::build_failure(&schema.id, format!("'{}' is not a number: {}", key, value))
        })?;
        addin.insert(key.to_string(), Value::Int(int));
    }
    Ok(())
}

/// Shell commands
pub fn command(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    for guard in ["onlyif", "unless"] {
        if let Some(path) = addin.get(guard).and_then(Value::to_text) {
            addin.insert(guard.to_string(), Value::Str(format!("[ -e {} ]", path)));
        }
    }
    coerce_int(schema, &mut addin, "timeout")?;

    Ok(default_buckets(schema, addin))
}

/// Users and groups
pub fn account(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    coerce_int(schema, &mut addin, "uid")?;
    coerce_int(schema, &mut addin, "gid")?;

    if addin.remove("nologin").is_some_and(|v| v.is_truthy()) {
        addin.insert("shell".to_string(), Value::from(NOLOGIN_SHELL));
    }

    Ok(default_buckets(schema, addin))
}

/// fstab entries; unparsable dump/pass numbers become zero
pub fn mount(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    for key in ["dump", "pass_num"] {
        if let Some(value) = addin.get(key) {
            let int = value.to_int().unwrap_or(0);
            addin.insert(key.to_string(), Value::Int(int));
        }
    }

    Ok(default_buckets(schema, addin))
}

/// Volume groups and logical volumes take comma separated device lists
pub fn lvm_volume(schema: &ModuleSchema, mut addin: Addin) -> Result<StateBuckets, ConvertError> {
    for key in ["devices", "pv"] {
        if let Some(Value::List(items)) = addin.get(key) {
            let joined = items
                .iter()
                .filter_map(Value::to_text)
                .collect::<Vec<_>>()
                .join(",");
            addin.insert(key.to_string(), Value::Str(joined));
        }
    }

    Ok(default_buckets(schema, addin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn schema(id: &str) -> ModuleSchema {
        Registry::with_builtin_modules()
            .get(id)
            .cloned()
            .unwrap_or_else(|| panic!("missing builtin {}", id))
    }

    fn addin(entries: &[(&str, Value)]) -> Addin {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // =========================================================================
    // Packages
    // =========================================================================

    #[test]
    fn test_system_packages_route_states() {
        let buckets = system_packages(
            &schema("linux.apt.package"),
            addin(&[(
                "pkgs",
                Value::List(vec![Value::pair("htop", "removed"), Value::from("nginx")]),
            )]),
        )
        .unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets["installed"]["pkgs"], Value::strings(["nginx"]));
        assert_eq!(buckets["removed"]["pkgs"], Value::strings(["htop"]));
    }

    #[test]
    fn test_system_packages_keep_version_pairs() {
        let buckets = system_packages(
            &schema("linux.yum.package"),
            addin(&[
                ("pkgs", Value::List(vec![Value::pair("curl", "7.29.0")])),
                ("fromrepo", Value::from("epel")),
            ]),
        )
        .unwrap();

        let installed = &buckets["installed"];
        assert_eq!(installed["pkgs"], Value::List(vec![Value::pair("curl", "7.29.0")]));
        assert_eq!(installed["fromrepo"], Value::from("epel"));
    }

    #[test]
    fn test_default_state_value_is_bare_name() {
        let buckets = system_packages(
            &schema("linux.apt.package"),
            addin(&[("pkgs", Value::List(vec![Value::pair("git", "installed")]))]),
        )
        .unwrap();
        assert_eq!(buckets["installed"]["pkgs"], Value::strings(["git"]));
    }

    #[test]
    fn test_language_package_pins() {
        let pip = pinned_packages(
            &schema("common.pip.package"),
            addin(&[(
                "names",
                Value::List(vec![Value::pair("requests", "2.1.0"), Value::from("six")]),
            )]),
        )
        .unwrap();
        assert_eq!(
            pip["installed"]["names"],
            Value::strings(["requests==2.1.0", "six"])
        );

        let npm = npm_packages(
            &schema("common.npm.package"),
            addin(&[(
                "names",
                Value::List(vec![Value::pair("express", "4.0.0"), Value::pair("grunt", "bootstrap")]),
            )]),
        )
        .unwrap();
        assert_eq!(npm["installed"]["names"], Value::strings(["express@4.0.0"]));
        assert_eq!(npm["bootstrap"]["names"], Value::strings(["grunt"]));
    }

    #[test]
    fn test_packages_without_list_fail() {
        let result = system_packages(
            &schema("linux.apt.package"),
            addin(&[("fromrepo", Value::from("main"))]),
        );
        assert!(matches!(result, Err(ConvertError::BuildFailure { .. })));
    }

    #[test]
    fn test_empty_pairs_and_scalar_entries_are_bare_names() {
        let buckets = system_packages(
            &schema("linux.apt.package"),
            addin(&[(
                "pkgs",
                Value::List(vec![
                    Value::pair("vim", Value::Null),
                    Value::pair("tmux", ""),
                    Value::from(7i64),
                ]),
            )]),
        )
        .unwrap();
        assert_eq!(buckets["installed"]["pkgs"], Value::strings(["vim", "tmux", "7"]));
    }

    #[test]
    fn test_nested_package_entries_fail() {
        let nested_pair = system_packages(
            &schema("linux.apt.package"),
            addin(&[("pkgs", Value::List(vec![Value::pair("vim", Value::strings(["8.0"]))]))]),
        );
        match nested_pair {
            Err(ConvertError::BuildFailure { reason, .. }) => assert!(reason.contains("vim")),
            other => panic!("expected a build failure, got {:?}", other),
        }

        let nested_entry = pinned_packages(
            &schema("common.pip.package"),
            addin(&[("names", Value::List(vec![Value::strings(["six"])]))]),
        );
        assert!(matches!(nested_entry, Err(ConvertError::BuildFailure { .. })));
    }

    // =========================================================================
    // Source control, repositories
    // =========================================================================

    #[test]
    fn test_git_branch_and_force() {
        let buckets = source_control(
            &schema("common.git"),
            addin(&[
                ("name", Value::from("https://example.com/app.git")),
                ("target", Value::from("/srv/app/")),
                ("branch", Value::from("develop")),
                ("force", Value::Bool(true)),
            ]),
        )
        .unwrap();

        let latest = &buckets["latest"];
        assert_eq!(latest["target"], Value::from("/srv/app"));
        assert_eq!(latest["rev"], Value::from("develop"));
        assert!(!latest.contains_key("branch"));
        assert_eq!(latest["force_checkout"], Value::Bool(true));
    }

    #[test]
    fn test_svn_drops_branch() {
        let buckets = source_control(
            &schema("common.svn"),
            addin(&[
                ("name", Value::from("svn://example.com/repo")),
                ("branch", Value::from("stable")),
                ("force", Value::Bool(true)),
            ]),
        )
        .unwrap();

        let latest = &buckets["latest"];
        assert!(!latest.contains_key("branch"));
        assert!(!latest.contains_key("rev"));
        assert!(!latest.contains_key("force_checkout"));
    }

    #[test]
    fn test_root_target_is_kept() {
        let buckets = source_control(
            &schema("common.hg"),
            addin(&[("target", Value::from("/"))]),
        )
        .unwrap();
        assert_eq!(buckets["latest"]["target"], Value::from("/"));
    }

    #[test]
    fn test_repo_file_names() {
        let apt = repo_file(
            &schema("linux.apt.repo"),
            addin(&[("name", Value::from("nginx"))]),
        )
        .unwrap();
        assert_eq!(
            apt["managed"]["name"],
            Value::from("/etc/apt/sources.list.d/nginx.list")
        );

        let yum = repo_file(
            &schema("linux.yum.repo"),
            addin(&[("name", Value::from("epel.repo"))]),
        )
        .unwrap();
        assert_eq!(yum["managed"]["name"], Value::from("/etc/yum.repos.d/epel.repo"));
    }

    #[test]
    fn test_gem_source_command() {
        let buckets = gem_source(
            &schema("common.gem.source"),
            addin(&[("name", Value::from("https://rubygems.org"))]),
        )
        .unwrap();
        let run = &buckets["run"];
        assert_eq!(run["name"], Value::from("gem source --add https://rubygems.org"));
        assert_eq!(run["shell"], Value::from("/bin/bash"));
        assert_eq!(run["user"], Value::from("root"));
        assert_eq!(run["group"], Value::from("root"));
    }

    // =========================================================================
    // SSH
    // =========================================================================

    #[test]
    fn test_ssh_auth_splits_keys() {
        let buckets = ssh_key(
            &schema("common.ssh.auth"),
            addin(&[
                ("name", Value::from("deploy")),
                ("content", Value::from("ssh-rsa AAA one\n\n  \nssh-rsa BBB two\n")),
                ("enc", Value::from("ssh-ed448")),
            ]),
        )
        .unwrap();

        let present = &buckets["present"];
        assert_eq!(
            present["names"],
            Value::strings(["ssh-rsa AAA one", "ssh-rsa BBB two"])
        );
        assert!(!present.contains_key("name"));
        assert_eq!(present["enc"], Value::from("ssh-rsa"));
    }

    #[test]
    fn test_known_host_keeps_name() {
        let buckets = ssh_key(
            &schema("common.ssh.known_host"),
            addin(&[("name", Value::from("github.com")), ("enc", Value::from("ecdsa"))]),
        )
        .unwrap();
        let present = &buckets["present"];
        assert_eq!(present["name"], Value::from("github.com"));
        assert_eq!(present["enc"], Value::from("ecdsa"));
    }

    // =========================================================================
    // Paths
    // =========================================================================

    #[test]
    fn test_absent_path_collapses() {
        let buckets = path_entry(
            &schema("linux.file"),
            addin(&[
                ("name", Value::from("/etc/motd")),
                ("absent", Value::Bool(true)),
                ("mode", Value::from("0644")),
            ]),
        )
        .unwrap();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets["absent"], addin(&[("name", Value::from("/etc/motd"))]));
    }

    #[test]
    fn test_directory_recurse_and_defaults() {
        let buckets = directory(
            &schema("linux.dir"),
            addin(&[
                ("name", Value::from("/srv/www")),
                ("group", Value::from("www-data")),
                ("mode", Value::from("0755")),
                ("recurse", Value::Bool(true)),
                ("absent", Value::Bool(false)),
            ]),
        )
        .unwrap();

        let dir = &buckets["directory"];
        assert_eq!(dir["mode"], Value::Int(755));
        assert_eq!(dir["recurse"], Value::strings(["group", "mode"]));
        assert_eq!(dir["user"], Value::from("root"));
        assert_eq!(dir["makedirs"], Value::Bool(true));
        assert!(!dir.contains_key("absent"));
    }

    #[test]
    fn test_invalid_mode_fails() {
        let result = path_entry(
            &schema("linux.file"),
            addin(&[("name", Value::from("/tmp/x")), ("mode", Value::from("rwx"))]),
        );
        assert!(matches!(result, Err(ConvertError::BuildFailure { .. })));
    }

    // =========================================================================
    // System
    // =========================================================================

    #[test]
    fn test_command_guards_and_timeout() {
        let buckets = command(
            &schema("linux.cmd"),
            addin(&[
                ("name", Value::from("make install")),
                ("onlyif", Value::from("/opt/src")),
                ("unless", Value::from("/opt/app")),
                ("timeout", Value::from("30")),
            ]),
        )
        .unwrap();

        let run = &buckets["run"];
        assert_eq!(run["onlyif"], Value::from("[ -e /opt/src ]"));
        assert_eq!(run["unless"], Value::from("[ -e /opt/app ]"));
        assert_eq!(run["timeout"], Value::Int(30));
    }

    #[test]
    fn test_account_nologin() {
        let buckets = account(
            &schema("linux.user"),
            addin(&[
                ("name", Value::from("svc")),
                ("uid", Value::from("1001")),
                ("shell", Value::from("/bin/bash")),
                ("nologin", Value::Bool(true)),
            ]),
        )
        .unwrap();

        let present = &buckets["present"];
        assert_eq!(present["uid"], Value::Int(1001));
        assert_eq!(present["shell"], Value::from("/sbin/nologin"));
        assert!(!present.contains_key("nologin"));
    }

    #[test]
    fn test_mount_numbers_default_to_zero() {
        let buckets = mount(
            &schema("linux.mount"),
            addin(&[
                ("name", Value::from("/data")),
                ("dump", Value::from("x")),
                ("pass_num", Value::from("2")),
            ]),
        )
        .unwrap();

        let mounted = &buckets["mounted"];
        assert_eq!(mounted["dump"], Value::Int(0));
        assert_eq!(mounted["pass_num"], Value::Int(2));
    }

    #[test]
    fn test_lvm_joins_devices() {
        let buckets = lvm_volume(
            &schema("linux.lvm.vg"),
            addin(&[
                ("name", Value::from("vg0")),
                ("devices", Value::strings(["/dev/sdb", "/dev/sdc"])),
            ]),
        )
        .unwrap();
        assert_eq!(buckets["vg_present"]["devices"], Value::from("/dev/sdb,/dev/sdc"));
    }
}
