#![forbid(unsafe_code)]

use std::io::{Cursor, Read, Write};

use tracing::{debug, warn};

use crate::nv::error::{NvError, NvResult};
use crate::nv::io::{read_exact, read_vec, write_u16};
use crate::nv::schema::SchemaCatalog;
use crate::nv::val::NvVal;

/// Container family a group stream belongs to; schemas can be scoped to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Perm,
    Dyn,
    Cfg,
}

/// Stream terminator magic.
pub const TERMINATOR: [u8; 4] = [0xFF; 4];

/// One length-prefixed, magic-tagged, versioned sub-record of a container.
///
/// Framing: `u16 BE size | magic[4] | u16 BE version | (size - 8) payload`.
/// `size` counts the whole record including its own two bytes.
#[derive(Debug, Clone)]
pub struct NvGroup {
    pub magic: [u8; 4],
    pub version: (u8, u8),
    pub name: String,
    pub payload: NvVal,
    /// Payload bytes past what the schema consumed; re-emitted verbatim.
    trailing: Vec<u8>,
}

impl NvGroup {
    pub fn new(magic: [u8; 4], version: (u8, u8), name: &str, payload: NvVal) -> Self {
        Self {
            magic,
            version,
            name: name.to_string(),
            payload,
            trailing: Vec::new(),
        }
    }

    /// Total serialized size, header included. Always equals the declared
    /// size field after a successful read.
    pub fn bytes(&self) -> usize {
        8 + self.payload.bytes() + self.trailing.len()
    }

    /// The magic as display text: ASCII when printable, hex otherwise.
    pub fn magic_str(&self) -> String {
        if self.magic.iter().all(|b| b.is_ascii_graphic()) {
            String::from_utf8_lossy(&self.magic).into_owned()
        } else {
            hex::encode(self.magic)
        }
    }

    pub fn find(&self, path: &str) -> Option<&NvVal> {
        self.payload.find(path)
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut NvVal> {
        self.payload.find_mut(path)
    }

    pub fn to_pretty(&self) -> String {
        format!(
            "{} v{}.{} {}",
            self.magic_str(),
            self.version.0,
            self.version.1,
            self.payload.to_pretty()
        )
    }

    pub fn write(&self, w: &mut dyn Write) -> NvResult<()> {
        let total = self.bytes();
        if total > u16::MAX as usize {
            return Err(NvError::InvalidValue(format!(
                "group {} exceeds maximum size: {total}",
                self.name
            )));
        }
        write_u16(w, total as u16)?;
        w.write_all(&self.magic)?;
        w.write_all(&[self.version.0, self.version.1])?;
        self.payload.write(w)?;
        w.write_all(&self.trailing)?;
        Ok(())
    }
}

/// Reads one group record. Returns `Ok(None)` on clean end-of-input or on
/// the `FF FF FF FF` terminator magic.
pub fn read_group(
    r: &mut dyn Read,
    kind: GroupKind,
    catalog: &SchemaCatalog,
) -> NvResult<Option<NvGroup>> {
    let size = match try_read_u16(r)? {
        Some(size) => size as usize,
        None => return Ok(None),
    };

    let magic = read_exact::<4>(r)?;
    if magic == TERMINATOR {
        return Ok(None);
    }

    let ver = read_exact::<2>(r)?;
    let version = (ver[0], ver[1]);

    if size < 8 {
        return Err(NvError::GroupParse(
            hex::encode(magic),
            format!("declared size {size} is below the 8-byte header"),
        ));
    }

    let payload_len = size - 8;
    let raw = read_vec(r, payload_len).map_err(|e| {
        NvError::GroupParse(hex::encode(magic), format!("payload: {e}"))
    })?;

    let (name, payload, trailing) = match catalog.lookup(magic, kind) {
        Some(schema) => {
            let mut payload = (schema.template)(version);
            let mut cur = Cursor::new(&raw[..]);
            payload
                .read(&mut cur, payload_len)
                .map_err(|e| NvError::GroupParse(schema.name.to_string(), e.to_string()))?;
            let consumed = payload.bytes();
            (schema.name.to_string(), payload, raw[consumed..].to_vec())
        }
        None => {
            let mut payload = NvVal::data(payload_len);
            payload.read(&mut Cursor::new(&raw[..]), payload_len)?;
            let name = if magic.iter().all(|b| b.is_ascii_graphic()) {
                String::from_utf8_lossy(&magic).into_owned()
            } else {
                hex::encode(magic)
            };
            (name, payload, Vec::new())
        }
    };

    Ok(Some(NvGroup {
        magic,
        version,
        name,
        payload,
        trailing,
    }))
}

/// Reads groups until the byte budget is used up, the terminator appears, or
/// input ends. In permissive mode a bad group truncates the stream instead
/// of failing it; strict mode propagates the error.
pub fn read_stream(
    r: &mut dyn Read,
    mut remaining: usize,
    kind: GroupKind,
    catalog: &SchemaCatalog,
    strict: bool,
) -> NvResult<Vec<NvGroup>> {
    let mut groups: Vec<NvGroup> = Vec::new();

    while remaining > 0 {
        match read_group(r, kind, catalog) {
            Ok(Some(mut group)) => {
                let base = group.name.clone();
                if groups.iter().any(|g| g.name == base) {
                    let mut n = 2;
                    while groups.iter().any(|g| g.name == format!("{base}_{n}")) {
                        n += 1;
                    }
                    group.name = format!("{base}_{n}");
                    debug!(from = %base, to = %group.name, "renamed redefined group");
                }
                remaining = remaining.saturating_sub(group.bytes());
                groups.push(group);
            }
            Ok(None) => break,
            Err(e) => {
                if strict {
                    return Err(e);
                }
                warn!(error = %e, "failed to read group, truncating stream");
                break;
            }
        }
    }

    Ok(groups)
}

/// Reads a big-endian u16, distinguishing clean end-of-input (`None`) from a
/// mid-field truncation (`ShortRead`).
fn try_read_u16(r: &mut dyn Read) -> NvResult<Option<u16>> {
    let mut buf = [0u8; 2];
    let mut got = 0;
    while got < 2 {
        let n = r.read(&mut buf[got..])?;
        if n == 0 {
            break;
        }
        got += n;
    }
    match got {
        0 => Ok(None),
        2 => Ok(Some(u16::from_be_bytes(buf))),
        _ => Err(NvError::ShortRead),
    }
}
