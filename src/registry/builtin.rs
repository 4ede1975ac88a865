//! Built-in module table.
//!
//! | Group   | Modules |
//! |---------|---------|
//! | package | `linux.apt.package`, `linux.yum.package`, `common.{gem,npm,pip}.package` |
//! | repo    | `linux.apt.repo`, `linux.yum.repo`, `common.gem.source` |
//! | scm     | `common.git`, `common.svn`, `common.hg` |
//! | path    | `linux.dir`, `linux.file`, `linux.symlink` |
//! | service | `linux.supervisord`, `linux.service` |
//! | system  | `linux.cmd`, `linux.cron`, `linux.user`, `linux.group`, `linux.mount`, `linux.selinux`, `common.timezone` |
//! | lvm     | `linux.lvm.pv`, `linux.lvm.vg`, `linux.lvm.lv` |
//! | misc    | `common.virtualenv`, `common.ssh.auth`, `common.ssh.known_host` |

use super::{ModuleSchema, SchemaBuilder};
use crate::types::{PackageManager, ResourceType};
use crate::value::Value;

const APT: &str = "linux.apt.package";
const YUM: &str = "linux.yum.package";
const PIP: &str = "common.pip.package";

/// Require a system package on whichever package manager the platform uses
fn require_system_package(builder: SchemaBuilder, package: &str) -> SchemaBuilder {
    builder
        .require(APT, "name", Value::strings([package]))
        .require(YUM, "name", Value::strings([package]))
}

fn build(builder: SchemaBuilder) -> ModuleSchema {
    builder.build().expect("Built-in schema should be valid") // Safe: hardcoded valid table
}

pub(super) fn schemas() -> Vec<ModuleSchema> {
    vec![
        // ---------------------------------------------------------------- package
        build(
            ModuleSchema::builder(APT, ResourceType::Pkg)
                .attribute("name", "pkgs")
                .attribute("repo", "fromrepo")
                .attribute("deb conf file", "debconf")
                .attribute("verify gpg", "verify_gpg")
                .states(&["installed", "latest", "removed", "purged"])
                .package_manager(PackageManager::Apt),
        ),
        build(
            ModuleSchema::builder(YUM, ResourceType::Pkg)
                .attribute("name", "pkgs")
                .attribute("repo", "fromrepo")
                .attribute("verify gpg", "verify_gpg")
                .states(&["installed", "latest", "removed", "purged"])
                .package_manager(PackageManager::Yum),
        ),
        build(require_system_package(
            ModuleSchema::builder("common.gem.package", ResourceType::Gem)
                .attribute("name", "names")
                .states(&["installed", "removed"]),
            "rubygems",
        )),
        build(require_system_package(
            ModuleSchema::builder("common.npm.package", ResourceType::Npm)
                .attribute("name", "names")
                .states(&["installed", "removed", "bootstrap"]),
            "npm",
        )),
        build(require_system_package(
            ModuleSchema::builder(PIP, ResourceType::Pip)
                .attribute("name", "names")
                .states(&["installed", "removed"]),
            "python-pip",
        )),
        // ------------------------------------------------------------------- repo
        build(
            ModuleSchema::builder("linux.apt.repo", ResourceType::File)
                .attribute("name", "name")
                .attribute("content", "contents")
                .states(&["managed"])
                .package_manager(PackageManager::Apt),
        ),
        build(
            ModuleSchema::builder("linux.yum.repo", ResourceType::File)
                .attribute("name", "name")
                .attribute("content", "contents")
                .states(&["managed"])
                .package_manager(PackageManager::Yum)
                .require_in("linux.cmd", "yum-config-manager --enable $name", "name"),
        ),
        build(
            ModuleSchema::builder("common.gem.source", ResourceType::Cmd)
                .attribute("url", "name")
                .states(&["run"]),
        ),
        // -------------------------------------------------------------------- scm
        build(require_system_package(
            ModuleSchema::builder("common.git", ResourceType::Git)
                .attribute("path", "target")
                .attribute("repo", "name")
                .attribute("branch", "branch")
                .attribute("revision", "rev")
                .attribute("ssh key", "identity")
                .attribute("force", "force")
                .states(&["latest", "present"]),
            "git",
        )),
        build(require_system_package(
            ModuleSchema::builder("common.svn", ResourceType::Svn)
                .attribute("path", "target")
                .attribute("repo", "name")
                .attribute("branch", "branch")
                .attribute("revision", "rev")
                .attribute("username", "username")
                .attribute("password", "password")
                .attribute("force", "force")
                .states(&["latest", "export"]),
            "subversion",
        )),
        build(require_system_package(
            ModuleSchema::builder("common.hg", ResourceType::Hg)
                .attribute("path", "target")
                .attribute("repo", "name")
                .attribute("branch", "branch")
                .attribute("revision", "rev")
                .attribute("force", "force")
                .states(&["latest"]),
            "mercurial",
        )),
        // ------------------------------------------------------------------- path
        build(
            ModuleSchema::builder("linux.dir", ResourceType::File)
                .attribute("path", "name")
                .attribute("user", "user")
                .attribute("group", "group")
                .attribute("mode", "mode")
                .attribute("recursive", "recurse")
                .attribute("absent", "absent")
                .states(&["directory", "absent"]),
        ),
        build(
            ModuleSchema::builder("linux.file", ResourceType::File)
                .attribute("path", "name")
                .attribute("user", "user")
                .attribute("group", "group")
                .attribute("mode", "mode")
                .attribute("content", "contents")
                .attribute("absent", "absent")
                .states(&["managed", "absent"]),
        ),
        build(
            ModuleSchema::builder("linux.symlink", ResourceType::File)
                .attribute("source", "name")
                .attribute("target", "target")
                .attribute("user", "user")
                .attribute("group", "group")
                .attribute("mode", "mode")
                .attribute("absent", "absent")
                .states(&["symlink", "absent"]),
        ),
        // ---------------------------------------------------------------- service
        build(
            ModuleSchema::builder("linux.supervisord", ResourceType::Supervisord)
                .attribute("name", "name")
                .attribute("config", "conf_file")
                .states(&["running"])
                .require(PIP, "name", Value::pair("supervisor", "")),
        ),
        build(
            ModuleSchema::builder("linux.service", ResourceType::Service)
                .attribute("name", "names")
                .states(&["running"]),
        ),
        // ----------------------------------------------------------------- system
        build(
            ModuleSchema::builder("linux.cmd", ResourceType::Cmd)
                .attribute("bin", "shell")
                .attribute("cmd", "name")
                .attribute("cwd", "cwd")
                .attribute("user", "user")
                .attribute("group", "group")
                .attribute("timeout", "timeout")
                .attribute("env", "env")
                .attribute("if path present", "onlyif")
                .attribute("if path absent", "unless")
                .states(&["run", "call", "wait", "script"]),
        ),
        build(
            ModuleSchema::builder("linux.cron", ResourceType::Cron)
                .attribute("minute", "minute")
                .attribute("hour", "hour")
                .attribute("day of month", "daymonth")
                .attribute("month", "month")
                .attribute("day of week", "dayweek")
                .attribute("user", "user")
                .attribute("cmd", "name")
                .states(&["present", "absent"]),
        ),
        build(
            ModuleSchema::builder("linux.user", ResourceType::User)
                .attribute("username", "name")
                .attribute("password", "password")
                .attribute("fullname", "fullname")
                .attribute("uid", "uid")
                .attribute("gid", "gid")
                .attribute("shell", "shell")
                .attribute("home", "home")
                .attribute("nologin", "nologin")
                .attribute("groups", "groups")
                .states(&["present", "absent"]),
        ),
        build(
            ModuleSchema::builder("linux.group", ResourceType::Group)
                .attribute("groupname", "name")
                .attribute("gid", "gid")
                .attribute("system", "system")
                .states(&["present", "absent"]),
        ),
        build(
            ModuleSchema::builder("linux.mount", ResourceType::Mount)
                .attribute("path", "name")
                .attribute("device", "device")
                .attribute("filesystem", "fstype")
                .attribute("dump", "dump")
                .attribute("passno", "pass_num")
                .attribute("opts", "opts")
                .states(&["mounted", "unmounted"]),
        ),
        build(
            ModuleSchema::builder("linux.selinux", ResourceType::Selinux)
                .attribute("name", "name")
                .attribute("value", "value")
                .attribute("persist", "persist")
                .states(&["boolean", "mode"])
                .require(
                    YUM,
                    "name",
                    Value::strings(["libsemanage", "setools-console", "policycoreutils-python"]),
                ),
        ),
        build(
            ModuleSchema::builder("common.timezone", ResourceType::Timezone)
                .attribute("name", "name")
                .attribute("use utc", "utc")
                .states(&["system"]),
        ),
        // -------------------------------------------------------------------- lvm
        build(
            ModuleSchema::builder("linux.lvm.pv", ResourceType::Lvm)
                .attribute("path", "names")
                .attribute("force", "force")
                .attribute("uuid", "uuid")
                .attribute("zero", "zero")
                .attribute("data alignment", "dataalignment")
                .attribute("data alignment offset", "dataalignmentoffset")
                .attribute("metadata size", "metadatasize")
                .attribute("metadata type", "metadatatype")
                .attribute("metadata copies", "metadatacopies")
                .attribute("metadata ignore", "metadataignore")
                .attribute("restorefile", "restorefile")
                .attribute("norestorefile", "norestorefile")
                .attribute("label sector", "labelsector")
                .attribute("PV size", "setphysicalvolumesize")
                .states(&["pv_present"]),
        ),
        build(
            ModuleSchema::builder("linux.lvm.vg", ResourceType::Lvm)
                .attribute("name", "name")
                .attribute("path", "devices")
                .attribute("clustered", "clustered")
                .attribute("max LV number", "maxlogicalvolumes")
                .attribute("max PV number", "maxphysicalvolumes")
                .attribute("metadata type", "metadatatype")
                .attribute("metadata copies", "metadatacopies")
                .attribute("PE size", "physicalextentsize")
                .attribute("autobackup", "autobackup")
                .attribute("tag", "addtag")
                .attribute("allocation policy", "alloc")
                .states(&["vg_present", "vg_absent"]),
        ),
        build(
            ModuleSchema::builder("linux.lvm.lv", ResourceType::Lvm)
                .attribute("name", "name")
                .attribute("VG name", "vgname")
                .attribute("path", "pv")
                .attribute("chunk size", "chunksize")
                .attribute("contiguous", "contiguous")
                .attribute("stripe number", "stripes")
                .attribute("stripe size", "stripesize")
                .attribute("LE number", "extents")
                .attribute("LV size", "size")
                .attribute("minor number", "minor")
                .attribute("persistent", "persistent")
                .attribute("mirror number", "mirrors")
                .attribute("no udev sync", "noudevsync")
                .attribute("monitor", "monitor")
                .attribute("ignore monitoring", "ignoremonitoring")
                .attribute("permission", "permission")
                .attribute("region size", "regionsize")
                .attribute("readahead", "readahead")
                .attribute("type", "type")
                .attribute("virtual size", "virtualsize")
                .attribute("zero", "zero")
                .attribute("available", "available")
                .attribute("snapshot", "snapshot")
                .attribute("autobackup", "autobackup")
                .attribute("tag", "addtag")
                .attribute("allocation policy", "alloc")
                .states(&["lv_present", "lv_absent"]),
        ),
        // ------------------------------------------------------------------- misc
        build(
            ModuleSchema::builder("common.virtualenv", ResourceType::Virtualenv)
                .attribute("path", "name")
                .attribute("python", "python")
                .attribute("system site packages", "system_site_packages")
                .attribute("extra search dir", "extra-search-dir")
                .attribute("requirements", "requirements")
                .states(&["managed"])
                .require(PIP, "name", Value::pair("virtualenv", "")),
        ),
        build(
            ModuleSchema::builder("common.ssh.auth", ResourceType::SshAuth)
                .attribute("authname", "name")
                .attribute("username", "user")
                .attribute("filename", "config")
                .attribute("content", "content")
                .attribute("encrypt_algorithm", "enc")
                .states(&["present", "absent"]),
        ),
        build(
            ModuleSchema::builder("common.ssh.known_host", ResourceType::SshKnownHosts)
                .attribute("hostname", "name")
                .attribute("username", "user")
                .attribute("filename", "config")
                .attribute("fingerprint", "fingerprint")
                .attribute("encrypt_algorithm", "enc")
                .states(&["present", "absent"]),
        ),
    ]
}
