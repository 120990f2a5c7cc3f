#![forbid(unsafe_code)]

use std::fmt;
use std::io::{Read, Write};

use tracing::warn;

use crate::nv::error::{NvError, NvResult};
use crate::nv::group::{GroupKind, NvGroup};
use crate::nv::gwsettings::GwSettings;
use crate::nv::io::read_exact;
use crate::nv::permdyn::PermDyn;
use crate::nv::profile::Profile;
use crate::nv::schema::SchemaCatalog;
use crate::nv::val::NvVal;

/// Caller-supplied container-type hint. `Auto` relies on sniffing alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Auto,
    Perm,
    Dyn,
    GwSettings,
}

pub struct ReadOptions<'a> {
    pub hint: TypeHint,
    pub profile: Option<&'static Profile>,
    pub key: Option<[u8; 32]>,
    pub strict: bool,
    pub catalog: &'a SchemaCatalog,
}

impl<'a> ReadOptions<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Self {
            hint: TypeHint::Auto,
            profile: None,
            key: None,
            strict: false,
            catalog,
        }
    }
}

/// A decoded settings container of either family.
#[derive(Debug)]
pub enum Container {
    PermDyn(PermDyn),
    GwSettings(GwSettings),
}

impl Container {
    /// Sniffs the first 16 bytes of `r` and hands off to the right codec.
    ///
    /// An all-`0xFF` start means permnv/dynnv, but only a caller hint says
    /// which; without one the file is treated as gwsettings (and will fail
    /// its integrity checks, which are advisory).
    pub fn read(r: &mut dyn Read, opts: &ReadOptions) -> NvResult<Self> {
        let start = read_exact::<16>(r)?;

        if start == [0xFF; 16] {
            match opts.hint {
                TypeHint::Perm => {
                    return PermDyn::read(r, GroupKind::Perm, opts.catalog, opts.strict)
                        .map(Container::PermDyn);
                }
                TypeHint::Dyn => {
                    return PermDyn::read(r, GroupKind::Dyn, opts.catalog, opts.strict)
                        .map(Container::PermDyn);
                }
                _ => {
                    warn!("file looks like a permnv/dynnv file, but no type was specified");
                }
            }
        }

        // for a gwsettings file the sniffed bytes are the MD5 checksum
        GwSettings::read(start, r, opts.profile, opts.key, opts.catalog, opts.strict)
            .map(Container::GwSettings)
    }

    pub fn write(&self, w: &mut dyn Write) -> NvResult<()> {
        match self {
            Container::PermDyn(c) => c.write(w),
            Container::GwSettings(c) => c.write(w),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Container::PermDyn(_) => "permdyn",
            Container::GwSettings(_) => "gwsettings",
        }
    }

    pub fn groups(&self) -> &[NvGroup] {
        match self {
            Container::PermDyn(c) => &c.groups,
            Container::GwSettings(c) => &c.groups,
        }
    }

    pub fn groups_mut(&mut self) -> &mut Vec<NvGroup> {
        match self {
            Container::PermDyn(c) => &mut c.groups,
            Container::GwSettings(c) => &mut c.groups,
        }
    }

    /// Resolves `group.child.child` against the group list.
    pub fn get(&self, path: &str) -> Option<&NvVal> {
        let (group_name, rest) = split_path(path);
        self.groups()
            .iter()
            .find(|g| g.name == group_name)
            .and_then(|g| g.find(rest))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut NvVal> {
        let (group_name, rest) = split_path(path);
        self.groups_mut()
            .iter_mut()
            .find(|g| g.name == group_name)
            .and_then(|g| g.find_mut(rest))
    }

    /// Parses `value` into the named slot.
    pub fn set(&mut self, path: &str, value: &str) -> NvResult<()> {
        match self.get_mut(path) {
            Some(val) => val.parse(value),
            None => Err(NvError::Parse(format!("no such value: '{path}'"))),
        }
    }

    pub fn header(&self) -> HeaderInfo {
        match self {
            Container::PermDyn(c) => HeaderInfo {
                type_name: "permdyn",
                profile: None,
                auto_profile: false,
                checksum: format!("{:08x}", c.checksum),
                checksum_valid: c.checksum_valid,
                size: c.size as usize,
                size_valid: true,
                encrypted: false,
                key: None,
            },
            Container::GwSettings(c) => HeaderInfo {
                type_name: "gwsettings",
                profile: c.profile.map(Profile::name),
                auto_profile: c.auto_profile,
                checksum: hex::encode(c.checksum),
                checksum_valid: c.checksum_valid,
                size: c.size as usize,
                size_valid: c.size_valid,
                encrypted: c.encrypted,
                key: c.key.map(hex::encode),
            },
        }
    }
}

/// Header-level summary of a container, printable even when the body could
/// not be decrypted.
#[derive(Debug)]
pub struct HeaderInfo {
    pub type_name: &'static str,
    pub profile: Option<&'static str>,
    pub auto_profile: bool,
    pub checksum: String,
    pub checksum_valid: bool,
    pub size: usize,
    pub size_valid: bool,
    pub encrypted: bool,
    pub key: Option<String>,
}

impl fmt::Display for HeaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "type    : {}", self.type_name)?;
        match self.profile {
            Some(name) if self.auto_profile => writeln!(f, "profile : {name}")?,
            Some(name) => writeln!(f, "profile : {name} (forced)")?,
            None => writeln!(f, "profile : (unknown)")?,
        }
        writeln!(
            f,
            "checksum: {}{}",
            self.checksum,
            if self.checksum_valid { "" } else { " (bad)" }
        )?;
        writeln!(
            f,
            "size    : {}{}",
            self.size,
            if self.size_valid { "" } else { " (bad)" }
        )?;
        if self.encrypted {
            match &self.key {
                Some(key) => writeln!(f, "key     : {key}")?,
                None => writeln!(f, "key     : (unknown)")?,
            }
        }
        Ok(())
    }
}

fn split_path(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((head, rest)) => (head, rest),
        None => (path, ""),
    }
}
