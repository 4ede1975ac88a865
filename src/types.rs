//! Type-safe vocabulary for the state adaptor
//!
//! Platforms, package managers and backend resource types are closed sets, so
//! they are modelled as enums rather than strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Supported operating-system families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Centos,
    Redhat,
    Debian,
    Ubuntu,
    Amazon,
}

impl Platform {
    /// The package manager shipped with this platform family
    pub fn package_manager(self) -> PackageManager {
        match self {
            Self::Debian | Self::Ubuntu => PackageManager::Apt,
            Self::Centos | Self::Redhat | Self::Amazon => PackageManager::Yum,
        }
    }
}

/// System package managers the adaptor can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Yum,
}

impl PackageManager {
    /// Module id of this package manager's package module
    pub const fn package_module(self) -> &'static str {
        match self {
            Self::Apt => "linux.apt.package",
            Self::Yum => "linux.yum.package",
        }
    }

    /// Returns the package manager owning a package module id, if any
    pub fn for_package_module(module: &str) -> Option<Self> {
        match module {
            "linux.apt.package" => Some(Self::Apt),
            "linux.yum.package" => Some(Self::Yum),
            _ => None,
        }
    }
}

/// Backend resource type keyword emitted as a document's type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Pkg,
    Gem,
    Npm,
    Pip,
    File,
    Cmd,
    Git,
    Svn,
    Hg,
    Supervisord,
    Service,
    Cron,
    User,
    Group,
    Mount,
    Selinux,
    Timezone,
    Lvm,
    Virtualenv,
    SshAuth,
    SshKnownHosts,
}

impl ResourceType {
    /// Version-aware language packages whose pinned entries are split into
    /// their own documents by the expander
    pub fn is_version_aware(self) -> bool {
        matches!(self, Self::Gem | Self::Pip)
    }

    /// Whether a pinned entry is handed to the backend as separate
    /// `name`/`version` attributes instead of a single pinned name
    pub fn splits_version(self) -> bool {
        matches!(self, Self::Gem)
    }
}

/// SSH key algorithms accepted by the ssh modules.
///
/// The first variant is the fallback for unrecognized values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
pub enum SshKeyType {
    #[default]
    #[strum(serialize = "ssh-rsa")]
    Rsa,
    #[strum(serialize = "ecdsa")]
    Ecdsa,
    #[strum(serialize = "ssh-dss")]
    Dss,
}

impl SshKeyType {
    /// Parse an algorithm name, falling back to the default on anything unknown
    pub fn normalize(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}
