#![forbid(unsafe_code)]

use std::io::{Cursor, Read, Write};

use tracing::{debug, warn};

use crate::nv::crypto::{aes256_ecb_decrypt, aes256_ecb_encrypt, md5_keyed};
use crate::nv::error::{NvError, NvResult};
use crate::nv::group::{read_stream, GroupKind, NvGroup};
use crate::nv::io::{read_all, read_exact, read_u32, write_u32};
use crate::nv::profile::{self, Profile};
use crate::nv::schema::SchemaCatalog;

/// The 74-byte ASCII magic that opens every cleartext gwsettings body.
pub const MAGIC: &[u8; 74] =
    b"6u9E9eWF0bt9Y8Rw690Le4669JYe4d-056T9p4ijm4EA6u9ee659jn9E-54e4j6rPj069K-670";

/// Bytes of header counted by the stored size field: the magic plus the
/// version and size fields. The 16-byte MD5 prefix is deliberately not
/// included; devices reject files with any other accounting.
const HEADER_LEN: usize = MAGIC.len() + 6;

/// The gwsettings container: a 16-byte keyed-MD5 checksum, the magic,
/// a version, a size, the group stream, and optionally AES-256-ECB
/// encryption of everything past the checksum.
#[derive(Debug)]
pub struct GwSettings {
    pub checksum: [u8; 16],
    pub version: (u8, u8),
    pub size: u32,
    pub groups: Vec<NvGroup>,
    pub key: Option<[u8; 32]>,
    pub padded: bool,
    pub profile: Option<&'static Profile>,
    pub magic_valid: bool,
    pub size_valid: bool,
    pub checksum_valid: bool,
    pub encrypted: bool,
    pub auto_profile: bool,
}

impl GwSettings {
    /// Reads a gwsettings image. `checksum` is the first 16 bytes of the
    /// file, already consumed by the container dispatcher.
    pub fn read(
        checksum: [u8; 16],
        r: &mut dyn Read,
        profile: Option<&'static Profile>,
        key: Option<[u8; 32]>,
        catalog: &SchemaCatalog,
        strict: bool,
    ) -> NvResult<Self> {
        let mut buf = read_all(r)?;

        let mut out = Self {
            checksum,
            version: (0, 0),
            size: 0,
            groups: Vec::new(),
            key,
            padded: false,
            profile,
            magic_valid: false,
            size_valid: false,
            checksum_valid: false,
            encrypted: false,
            auto_profile: false,
        };

        out.validate_checksum_and_detect_profile(&buf);

        out.magic_valid = buf.len() >= MAGIC.len() && buf[..MAGIC.len()] == MAGIC[..];
        if !out.magic_valid {
            match out.try_decrypt(&buf) {
                Some((decrypted, key)) => {
                    buf = decrypted;
                    out.key = Some(key);
                    out.magic_valid = true;
                }
                None => {
                    warn!("no profile or key decrypts this file");
                    out.encrypted = true;
                    return Ok(out);
                }
            }
        }

        let mut cur = Cursor::new(&buf[MAGIC.len()..]);
        let ver = read_exact::<2>(&mut cur)?;
        out.version = (ver[0], ver[1]);
        out.size = read_u32(&mut cur)?;

        out.size_valid = out.size as usize == buf.len();
        if !out.size_valid && out.size as usize + 16 == buf.len() {
            out.padded = true;
            out.size_valid = true;
        }
        if !out.size_valid {
            warn!(stored = out.size, actual = buf.len(), "size mismatch");
        }

        let remaining = (out.size as usize).saturating_sub(HEADER_LEN);
        out.groups = read_stream(&mut cur, remaining, GroupKind::Cfg, catalog, strict)?;
        Ok(out)
    }

    pub fn write(&self, w: &mut dyn Write) -> NvResult<()> {
        let profile = self.profile.ok_or(NvError::MissingProfile)?;

        let mut body = Vec::new();
        for group in &self.groups {
            group.write(&mut body)?;
        }

        let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(self.version.0);
        buf.push(self.version.1);
        write_u32(&mut buf, (HEADER_LEN + body.len()) as u32)?;
        buf.extend_from_slice(&body);

        if let Some(key) = &self.key {
            buf = aes256_ecb_encrypt(&buf, key, self.padded);
        }

        w.write_all(&md5_keyed(&buf, profile.md5_key()))?;
        w.write_all(&buf)?;
        if self.padded {
            w.write_all(&[0u8; 16])?;
        }
        Ok(())
    }

    pub fn bytes(&self) -> usize {
        self.size as usize
    }

    pub fn data_bytes(&self) -> usize {
        self.bytes().saturating_sub(HEADER_LEN)
    }

    fn validate_checksum_and_detect_profile(&mut self, buf: &[u8]) {
        if let Some(p) = self.profile {
            self.checksum_valid = md5_keyed(buf, p.md5_key()) == self.checksum;
            if !self.checksum_valid {
                warn!(profile = p.name(), "checksum mismatch");
            }
            return;
        }

        for p in profile::all() {
            if md5_keyed(buf, p.md5_key()) == self.checksum {
                debug!(profile = p.name(), "profile auto-detected via checksum");
                self.profile = Some(p);
                self.auto_profile = true;
                self.checksum_valid = true;
                return;
            }
        }
    }

    /// Trial decryption: the caller key if supplied, else the known
    /// profile's default keys, else every profile's keys in declaration
    /// order. Success means the plaintext opens with [`MAGIC`].
    fn try_decrypt(&self, buf: &[u8]) -> Option<(Vec<u8>, [u8; 32])> {
        if let Some(key) = self.key {
            return try_key(buf, &key);
        }
        if let Some(p) = self.profile {
            return try_profile_keys(buf, p);
        }
        for p in profile::all() {
            if let Some(hit) = try_profile_keys(buf, p) {
                return Some(hit);
            }
        }
        None
    }
}

fn try_profile_keys(buf: &[u8], p: &Profile) -> Option<(Vec<u8>, [u8; 32])> {
    for key in p.default_keys() {
        if let Some(hit) = try_key(buf, key) {
            debug!(profile = p.name(), "found working key");
            return Some(hit);
        }
    }
    None
}

fn try_key(buf: &[u8], key: &[u8; 32]) -> Option<(Vec<u8>, [u8; 32])> {
    let decrypted = aes256_ecb_decrypt(buf, key);
    if decrypted.len() >= MAGIC.len() && decrypted[..MAGIC.len()] == MAGIC[..] {
        Some((decrypted, *key))
    } else {
        None
    }
}
