#![forbid(unsafe_code)]

/// Immutable device-profile record, reduced to the fields the codec needs:
/// the MD5 suffix key of gwsettings checksums, the candidate AES-256 keys,
/// and an optional password-to-key derivation. Memory maps, UART parameters
/// and the like belong to the dumper/flasher, not here.
#[derive(Debug)]
pub struct Profile {
    name: &'static str,
    pretty: &'static str,
    md5_key: &'static [u8],
    default_keys: &'static [[u8; 32]],
    key_fn: Option<fn(&str) -> [u8; 32]>,
}

impl Profile {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pretty(&self) -> &'static str {
        self.pretty
    }

    pub fn md5_key(&self) -> &'static [u8] {
        self.md5_key
    }

    pub fn default_keys(&self) -> &'static [[u8; 32]] {
        self.default_keys
    }

    pub fn key_from_password(&self, password: &str) -> Option<[u8; 32]> {
        self.key_fn.map(|f| f(password))
    }
}

fn key_tc7200(password: &str) -> [u8; 32] {
    let mut key = [0u8; 32];
    for (i, b) in key.iter_mut().enumerate() {
        *b = i as u8;
    }
    let pw = password.as_bytes();
    let n = pw.len().min(32);
    key[..n].copy_from_slice(&pw[..n]);
    key
}

const KEY_TWG870: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x10, 0x11, 0x12, 0x13, 0x14,
    0x15, 0x16, 0x17, 0x18, 0x19, 0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, 0x29,
    0x30, 0x31,
];

const KEY_TC7200: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
    0x1e, 0x1f,
];

static PROFILES: &[Profile] = &[
    Profile {
        name: "generic",
        pretty: "Generic Profile",
        md5_key: b"",
        default_keys: &[],
        key_fn: None,
    },
    Profile {
        name: "cg3000",
        pretty: "Netgear CG3000",
        md5_key: b"2Pslc;u(egmd0-'x",
        default_keys: &[],
        key_fn: None,
    },
    Profile {
        name: "twg850",
        pretty: "Thomson TWG850-4",
        md5_key: b"TMM_TWG850-4\x00\x00\x00\x00",
        default_keys: &[],
        key_fn: None,
    },
    Profile {
        name: "tcw770",
        pretty: "Thomson TCW770",
        md5_key: b"TMM_TCW770\x00\x00\x00\x00\x00\x00",
        default_keys: &[],
        key_fn: None,
    },
    Profile {
        name: "twg870",
        pretty: "Thomson TWG870",
        md5_key: b"TMM_TWG870\x00\x00\x00\x00\x00\x00",
        default_keys: &[KEY_TWG870],
        key_fn: None,
    },
    Profile {
        name: "tc7200",
        pretty: "Technicolor TC7200",
        md5_key: b"TMM_TC7200\x00\x00\x00\x00\x00\x00",
        default_keys: &[KEY_TC7200],
        key_fn: Some(key_tc7200),
    },
];

/// All known profiles, in declaration order. Auto-detection iterates this
/// list and the first match wins, so the order is observable.
pub fn all() -> &'static [Profile] {
    PROFILES
}

pub fn find(name: &str) -> Option<&'static Profile> {
    PROFILES.iter().find(|p| p.name == name)
}
