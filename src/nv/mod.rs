#![forbid(unsafe_code)]

mod container;
mod error;
mod group;
mod gwsettings;
mod io;
mod permdyn;
mod schema;
mod val;

pub mod crypto;
pub mod profile;

pub use container::{Container, HeaderInfo, ReadOptions, TypeHint};

pub use error::{NvError, NvResult};

pub use group::{read_group, read_stream, GroupKind, NvGroup, TERMINATOR};
pub use gwsettings::{GwSettings, MAGIC};
pub use permdyn::{PermDyn, MAGIC_LEN};
pub use schema::{GroupSchema, SchemaCatalog};
pub use val::{Field, NvVal};
