#![forbid(unsafe_code)]

use crate::nv::group::GroupKind;
use crate::nv::val::{Field, NvVal};

/// A declared field layout for one group magic. Schemas are data, not code:
/// the framing layer stays schema-agnostic and only asks the catalog for a
/// payload template to read into.
pub struct GroupSchema {
    pub magic: [u8; 4],
    pub name: &'static str,
    /// Container type the schema applies to; `None` matches any.
    pub kind: Option<GroupKind>,
    /// Builds the payload template for a given group version.
    pub template: fn(version: (u8, u8)) -> NvVal,
}

/// Ordered schema registry; lookup returns the first match, so earlier
/// registrations win.
pub struct SchemaCatalog {
    entries: Vec<GroupSchema>,
}

impl SchemaCatalog {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The builtin catalog. Most group payloads are device firmware specific
    /// and stay opaque; the user-interface group is known well enough to
    /// decode by default.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.register(GroupSchema {
            magic: *b"MLog",
            name: "userif",
            kind: Some(GroupKind::Cfg),
            template: userif_template,
        });
        catalog
    }

    pub fn register(&mut self, schema: GroupSchema) {
        self.entries.push(schema);
    }

    pub fn lookup(&self, magic: [u8; 4], kind: GroupKind) -> Option<&GroupSchema> {
        self.entries
            .iter()
            .find(|s| s.magic == magic && s.kind.map_or(true, |k| k == kind))
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn userif_template(_version: (u8, u8)) -> NvVal {
    NvVal::compound(vec![
        Field::new("http_user", NvVal::pstring(2)),
        Field::new("http_pass", NvVal::pstring(2)),
        Field::optional("http_admin_user", NvVal::pstring(2)),
        Field::optional("http_admin_pass", NvVal::pstring(2)),
    ])
}
