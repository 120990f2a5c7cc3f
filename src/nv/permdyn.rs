#![forbid(unsafe_code)]

use std::io::{Cursor, Read, Write};

use tracing::{debug, warn};

use crate::nv::crypto::crc32;
use crate::nv::error::{NvError, NvResult};
use crate::nv::group::{read_stream, GroupKind, NvGroup};
use crate::nv::io::{read_all, read_u32, read_vec, write_u32};
use crate::nv::schema::SchemaCatalog;

/// Total `0xFF` framing bytes at the start of a permnv/dynnv image.
pub const MAGIC_LEN: usize = 0xCA;

/// `0xFF` framing bytes left after the dispatcher consumed the first 16.
const INNER_MAGIC_LEN: usize = 0xBA;

/// The permnv/dynnv container: `0xCA` bytes of `0xFF`, a big-endian size
/// (8 + body length), a big-endian CRC-32 of the body, then the group
/// stream. Cleartext only, never padded.
#[derive(Debug)]
pub struct PermDyn {
    pub kind: GroupKind,
    pub size: u32,
    pub checksum: u32,
    pub checksum_valid: bool,
    pub groups: Vec<NvGroup>,
}

impl PermDyn {
    /// Reads a permnv/dynnv image. The 16 leading `0xFF` bytes have already
    /// been consumed by the container dispatcher.
    pub fn read(
        r: &mut dyn Read,
        kind: GroupKind,
        catalog: &SchemaCatalog,
        strict: bool,
    ) -> NvResult<Self> {
        debug_assert!(kind == GroupKind::Perm || kind == GroupKind::Dyn);

        let pad = read_vec(r, INNER_MAGIC_LEN)?;
        if pad.iter().any(|&b| b != 0xFF) {
            return Err(NvError::BadMagic(
                "found non-0xff byte in permnv/dynnv magic".into(),
            ));
        }

        let size = read_u32(r)?;
        let checksum = read_u32(r)?;
        let rest = read_all(r)?;

        let span = rest.len().min(size as usize + 16);
        let computed = crc32(&rest[..span]);
        let checksum_valid = computed == checksum;
        if checksum_valid {
            debug!("checksum ok: {computed:08x}");
        } else {
            warn!("checksum mismatch: {computed:08x} / {checksum:08x}");
        }

        let remaining = (size as usize).saturating_sub(8);
        let mut cur = Cursor::new(&rest[..]);
        let groups = read_stream(&mut cur, remaining, kind, catalog, strict)?;

        Ok(Self {
            kind,
            size,
            checksum,
            checksum_valid,
            groups,
        })
    }

    pub fn write(&self, w: &mut dyn Write) -> NvResult<()> {
        let mut body = Vec::new();
        for group in &self.groups {
            group.write(&mut body)?;
        }

        w.write_all(&[0xFF; MAGIC_LEN])?;
        write_u32(w, 8 + body.len() as u32)?;
        write_u32(w, crc32(&body))?;
        w.write_all(&body)?;
        Ok(())
    }

    pub fn bytes(&self) -> usize {
        self.size as usize
    }

    pub fn data_bytes(&self) -> usize {
        self.bytes().saturating_sub(8)
    }
}
