//! End-to-end container scenarios: real-world shaped images built with the
//! same kernels the codec uses, decoded and re-encoded byte-identically.

use std::io::Cursor;

use bcmnv::nv::{
    crypto, profile, Container, NvError, ReadOptions, SchemaCatalog, TypeHint, MAGIC,
};

fn group(magic: &[u8; 4], version: (u8, u8), payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&((payload.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(magic);
    out.push(version.0);
    out.push(version.1);
    out.extend_from_slice(payload);
    out
}

fn pstring16(text: &str) -> Vec<u8> {
    let mut out = (text.len() as u16).to_be_bytes().to_vec();
    out.extend_from_slice(text.as_bytes());
    out
}

/// MAGIC + version + size + groups, sized the way devices expect: the
/// 16-byte checksum prefix is not counted.
fn gw_body(version: (u8, u8), groups: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.push(version.0);
    buf.push(version.1);
    buf.extend_from_slice(&((MAGIC.len() + 6 + groups.len()) as u32).to_be_bytes());
    buf.extend_from_slice(groups);
    buf
}

fn gw_image(buf: &[u8], md5_key: &[u8]) -> Vec<u8> {
    let mut out = crypto::md5_keyed(buf, md5_key).to_vec();
    out.extend_from_slice(buf);
    out
}

fn userif_group() -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&pstring16("admin"));
    payload.extend_from_slice(&pstring16("secret"));
    payload.extend_from_slice(&pstring16("root"));
    payload.extend_from_slice(&pstring16("hunter2"));
    group(b"MLog", (0, 1), &payload)
}

fn decode(input: &[u8], hint: TypeHint, catalog: &SchemaCatalog) -> Container {
    let mut opts = ReadOptions::new(catalog);
    opts.hint = hint;
    Container::read(&mut Cursor::new(input), &opts).unwrap()
}

fn encode(container: &Container) -> Vec<u8> {
    let mut out = Vec::new();
    container.write(&mut out).unwrap();
    out
}

#[test]
fn permnv_happy_path() {
    // terminator group followed by partition fill
    let mut remainder = vec![0x00, 0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00];
    remainder.extend_from_slice(&[0u8; 8]);

    let mut input = vec![0xFF; 0xCA];
    input.extend_from_slice(&0x00000010u32.to_be_bytes());
    input.extend_from_slice(&crypto::crc32(&remainder).to_be_bytes());
    input.extend_from_slice(&remainder);

    let catalog = SchemaCatalog::builtin();
    let container = decode(&input, TypeHint::Perm, &catalog);
    match &container {
        Container::PermDyn(c) => {
            assert!(c.checksum_valid);
            assert!(c.groups.is_empty());
            assert_eq!(c.size, 0x10);
        }
        Container::GwSettings(_) => panic!("expected permdyn"),
    }
}

#[test]
fn permdyn_round_trips_byte_identical() {
    let body = group(b"SNMP", (0, 2), &[0xCA, 0xFE, 0x00, 0x01]);

    let mut input = vec![0xFF; 0xCA];
    input.extend_from_slice(&(8 + body.len() as u32).to_be_bytes());
    input.extend_from_slice(&crypto::crc32(&body).to_be_bytes());
    input.extend_from_slice(&body);

    let catalog = SchemaCatalog::builtin();
    let container = decode(&input, TypeHint::Dyn, &catalog);
    assert_eq!(container.groups().len(), 1);
    assert_eq!(encode(&container), input);
}

#[test]
fn gwsettings_cleartext_auto_profile() {
    let tc7200 = profile::find("tc7200").unwrap();
    let input = gw_image(&gw_body((0, 1), &userif_group()), tc7200.md5_key());

    let catalog = SchemaCatalog::builtin();
    let container = decode(&input, TypeHint::Auto, &catalog);
    match &container {
        Container::GwSettings(c) => {
            assert!(c.auto_profile);
            assert!(c.checksum_valid);
            assert_eq!(c.profile.unwrap().name(), "tc7200");
            assert_eq!(c.version, (0, 1));
        }
        Container::PermDyn(_) => panic!("expected gwsettings"),
    }

    assert_eq!(
        container.get("userif.http_user").unwrap().to_pretty(),
        "\"admin\""
    );
    assert_eq!(
        container.get("userif.http_admin_pass").unwrap().to_pretty(),
        "\"hunter2\""
    );

    assert_eq!(encode(&container), input);
}

#[test]
fn gwsettings_encrypted_round_trip() {
    let tc7200 = profile::find("tc7200").unwrap();
    let key = tc7200.default_keys()[0];
    let plain = gw_body((0, 1), &userif_group());
    let input = gw_image(&crypto::aes256_ecb_encrypt(&plain, &key, false), tc7200.md5_key());

    let catalog = SchemaCatalog::builtin();
    let container = decode(&input, TypeHint::Auto, &catalog);
    match &container {
        Container::GwSettings(c) => {
            assert!(c.magic_valid);
            assert!(!c.encrypted);
            assert_eq!(c.key, Some(key));
            assert_eq!(c.groups.len(), 1);
        }
        Container::PermDyn(_) => panic!("expected gwsettings"),
    }

    assert_eq!(encode(&container), input);
}

#[test]
fn gwsettings_padded_round_trip() {
    let tc7200 = profile::find("tc7200").unwrap();
    let mut buf = gw_body((0, 1), &userif_group());
    buf.extend_from_slice(&[0u8; 16]);
    // the checksum a device writes covers the pre-pad bytes
    let mut input = crypto::md5_keyed(&buf[..buf.len() - 16], tc7200.md5_key()).to_vec();
    input.extend_from_slice(&buf);

    let catalog = SchemaCatalog::builtin();
    let mut opts = ReadOptions::new(&catalog);
    opts.profile = profile::find("tc7200");
    let container = Container::read(&mut Cursor::new(&input[..]), &opts).unwrap();
    match &container {
        Container::GwSettings(c) => {
            assert!(c.padded);
            assert!(c.size_valid);
        }
        Container::PermDyn(_) => panic!("expected gwsettings"),
    }

    assert_eq!(encode(&container), input);
}

#[test]
fn corrupted_checksum_still_parses() {
    let tc7200 = profile::find("tc7200").unwrap();
    let mut input = gw_image(&gw_body((0, 1), &userif_group()), tc7200.md5_key());
    input[3] ^= 0x40;

    let catalog = SchemaCatalog::builtin();
    let container = decode(&input, TypeHint::Auto, &catalog);
    match &container {
        Container::GwSettings(c) => {
            assert!(!c.checksum_valid);
            assert!(!c.auto_profile);
            assert!(c.profile.is_none());
            assert_eq!(c.groups.len(), 1);
        }
        Container::PermDyn(_) => panic!("expected gwsettings"),
    }
    assert_eq!(
        container.get("userif.http_user").unwrap().to_pretty(),
        "\"admin\""
    );
}

#[test]
fn truncated_group_permissive_and_strict() {
    let tc7200 = profile::find("tc7200").unwrap();

    let mut groups = userif_group();
    // second group claims 0x40 bytes but only 0x20 follow
    groups.extend_from_slice(&[0x00, 0x40]);
    groups.extend_from_slice(b"TRNC");
    groups.extend_from_slice(&[0x00, 0x01]);
    groups.extend_from_slice(&[0u8; 0x20 - 8]);
    let input = gw_image(&gw_body((0, 1), &groups), tc7200.md5_key());

    let catalog = SchemaCatalog::builtin();
    let container = decode(&input, TypeHint::Auto, &catalog);
    assert_eq!(container.groups().len(), 1);
    assert_eq!(container.groups()[0].name, "userif");

    let mut opts = ReadOptions::new(&catalog);
    opts.strict = true;
    let res = Container::read(&mut Cursor::new(&input[..]), &opts);
    assert!(matches!(res, Err(NvError::GroupParse(_, _))));
}

#[test]
fn decode_is_deterministic() {
    let tc7200 = profile::find("tc7200").unwrap();
    let input = gw_image(&gw_body((0, 1), &userif_group()), tc7200.md5_key());

    let catalog = SchemaCatalog::builtin();
    let a = decode(&input, TypeHint::Auto, &catalog);
    let b = decode(&input, TypeHint::Auto, &catalog);

    assert_eq!(a.header().to_string(), b.header().to_string());
    assert_eq!(a.groups().len(), b.groups().len());
    assert_eq!(encode(&a), encode(&b));
}

#[test]
fn single_md5_match_wins_regardless_of_position() {
    // tc7200 is declared last; a file checksummed with its key must still
    // resolve to it, not to any earlier profile
    let tc7200 = profile::find("tc7200").unwrap();
    let input = gw_image(&gw_body((0, 1), &userif_group()), tc7200.md5_key());

    let catalog = SchemaCatalog::builtin();
    let container = decode(&input, TypeHint::Auto, &catalog);
    match &container {
        Container::GwSettings(c) => assert_eq!(c.profile.unwrap().name(), "tc7200"),
        Container::PermDyn(_) => panic!("expected gwsettings"),
    }
}

#[test]
fn set_then_encode_reflects_the_change() {
    let tc7200 = profile::find("tc7200").unwrap();
    let input = gw_image(&gw_body((0, 1), &userif_group()), tc7200.md5_key());

    let catalog = SchemaCatalog::builtin();
    let mut container = decode(&input, TypeHint::Auto, &catalog);
    container.set("userif.http_user", "operator").unwrap();

    let out = encode(&container);
    assert_ne!(out, input);

    let reread = decode(&out, TypeHint::Auto, &catalog);
    assert_eq!(
        reread.get("userif.http_user").unwrap().to_pretty(),
        "\"operator\""
    );
    // re-encoded checksum and size are consistent again
    match &reread {
        Container::GwSettings(c) => {
            assert!(c.checksum_valid);
            assert!(c.size_valid);
        }
        Container::PermDyn(_) => panic!("expected gwsettings"),
    }
}

#[test]
fn header_summary_for_undecryptable_file() {
    let tc7200 = profile::find("tc7200").unwrap();
    let plain = gw_body((0, 1), &userif_group());
    let enc = crypto::aes256_ecb_encrypt(&plain, &[0x5A; 32], false);
    let input = gw_image(&enc, tc7200.md5_key());

    let catalog = SchemaCatalog::builtin();
    let container = decode(&input, TypeHint::Auto, &catalog);
    match &container {
        Container::GwSettings(c) => {
            assert!(c.encrypted);
            assert!(c.groups.is_empty());
        }
        Container::PermDyn(_) => panic!("expected gwsettings"),
    }

    let text = container.header().to_string();
    assert!(text.contains("type    : gwsettings"));
    assert!(text.contains("key     : (unknown)"));
}
