#![forbid(unsafe_code)]

use std::io::{Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::nv::error::{NvError, NvResult};
use crate::nv::io::{read_exact, read_u8, read_u16, read_vec};

/// A named child of a compound. Optional fields are skipped on read when the
/// remaining byte budget drops below their size; `present` records whether
/// the field occupies bytes in the serialized form.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub val: NvVal,
    pub optional: bool,
    pub present: bool,
}

impl Field {
    pub fn new(name: &str, val: NvVal) -> Self {
        Self {
            name: name.to_string(),
            val,
            optional: false,
            present: true,
        }
    }

    pub fn optional(name: &str, val: NvVal) -> Self {
        Self {
            name: name.to_string(),
            val,
            optional: true,
            present: true,
        }
    }
}

/// A typed nonvol value. Leaves are fixed- or self-sized; `Compound` holds an
/// ordered list of named children. Every variant knows its exact serialized
/// size via [`NvVal::bytes`].
#[derive(Debug, Clone)]
pub enum NvVal {
    U8(Option<u8>),
    U16(Option<u16>),
    U32 { val: Option<u32>, big_endian: bool },
    I8(Option<i8>),
    I16(Option<i16>),
    I32(Option<i32>),
    /// Two bytes, printed `major.minor`.
    Version(Option<(u8, u8)>),
    /// Fixed-length string, zero-padded on write.
    FString { size: usize, val: Option<Vec<u8>> },
    /// Length-prefixed string; prefix is 1 or 2 bytes, big-endian.
    PString { width: usize, val: Option<Vec<u8>> },
    /// Zero-terminated string.
    ZString(Option<Vec<u8>>),
    Ip4(Option<[u8; 4]>),
    Ip6(Option<[u8; 16]>),
    Mac(Option<[u8; 6]>),
    /// Fixed-count array of a single element shape.
    Array {
        elem: Box<NvVal>,
        count: usize,
        items: Vec<NvVal>,
    },
    /// Length-prefixed list; prefix is 1 or 2 bytes, big-endian.
    List {
        width: usize,
        elem: Box<NvVal>,
        items: Vec<NvVal>,
    },
    /// Integer interpreted as a set of named flags, bit 0 first.
    Bitmask {
        width: usize,
        flags: Vec<String>,
        val: Option<u64>,
    },
    /// Integer mapped to a label set.
    Enum {
        width: usize,
        labels: Vec<(u64, String)>,
        val: Option<u64>,
    },
    /// Ordered named children.
    Compound { fields: Vec<Field>, set: bool },
    /// Opaque bytes; unknown schemas fall back to this.
    Data { size: usize, val: Option<Vec<u8>> },
}

impl NvVal {
    pub fn u8() -> Self {
        NvVal::U8(None)
    }

    pub fn u16() -> Self {
        NvVal::U16(None)
    }

    pub fn u32() -> Self {
        NvVal::U32 {
            val: None,
            big_endian: true,
        }
    }

    pub fn u32_le() -> Self {
        NvVal::U32 {
            val: None,
            big_endian: false,
        }
    }

    pub fn i8() -> Self {
        NvVal::I8(None)
    }

    pub fn i16() -> Self {
        NvVal::I16(None)
    }

    pub fn i32() -> Self {
        NvVal::I32(None)
    }

    pub fn version() -> Self {
        NvVal::Version(None)
    }

    pub fn fstring(size: usize) -> Self {
        NvVal::FString { size, val: None }
    }

    pub fn pstring(width: usize) -> Self {
        debug_assert!(width == 1 || width == 2);
        NvVal::PString { width, val: None }
    }

    pub fn zstring() -> Self {
        NvVal::ZString(None)
    }

    pub fn ip4() -> Self {
        NvVal::Ip4(None)
    }

    pub fn ip6() -> Self {
        NvVal::Ip6(None)
    }

    pub fn mac() -> Self {
        NvVal::Mac(None)
    }

    pub fn array(elem: NvVal, count: usize) -> Self {
        NvVal::Array {
            elem: Box::new(elem),
            count,
            items: Vec::new(),
        }
    }

    pub fn list(width: usize, elem: NvVal) -> Self {
        debug_assert!(width == 1 || width == 2);
        NvVal::List {
            width,
            elem: Box::new(elem),
            items: Vec::new(),
        }
    }

    pub fn bitmask(width: usize, flags: &[&str]) -> Self {
        NvVal::Bitmask {
            width,
            flags: flags.iter().map(|s| s.to_string()).collect(),
            val: None,
        }
    }

    pub fn enumeration(width: usize, labels: &[(u64, &str)]) -> Self {
        NvVal::Enum {
            width,
            labels: labels.iter().map(|&(n, s)| (n, s.to_string())).collect(),
            val: None,
        }
    }

    pub fn compound(fields: Vec<Field>) -> Self {
        NvVal::Compound { fields, set: false }
    }

    pub fn data(size: usize) -> Self {
        NvVal::Data { size, val: None }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NvVal::U8(_) => "u8",
            NvVal::U16(_) => "u16",
            NvVal::U32 { .. } => "u32",
            NvVal::I8(_) => "i8",
            NvVal::I16(_) => "i16",
            NvVal::I32(_) => "i32",
            NvVal::Version(_) => "version",
            NvVal::FString { .. } => "fstring",
            NvVal::PString { .. } => "pstring",
            NvVal::ZString(_) => "zstring",
            NvVal::Ip4(_) => "ip4",
            NvVal::Ip6(_) => "ip6",
            NvVal::Mac(_) => "mac",
            NvVal::Array { .. } => "array",
            NvVal::List { .. } => "list",
            NvVal::Bitmask { .. } => "bitmask",
            NvVal::Enum { .. } => "enum",
            NvVal::Compound { .. } => "compound",
            NvVal::Data { .. } => "data",
        }
    }

    /// Serialized size in bytes. Constant for fixed-width variants; depends
    /// on current content for pstrings, zstrings and lists.
    pub fn bytes(&self) -> usize {
        match self {
            NvVal::U8(_) | NvVal::I8(_) => 1,
            NvVal::U16(_) | NvVal::I16(_) | NvVal::Version(_) => 2,
            NvVal::U32 { .. } | NvVal::I32(_) => 4,
            NvVal::FString { size, .. } => *size,
            NvVal::PString { width, val } => width + val.as_ref().map_or(0, Vec::len),
            NvVal::ZString(val) => val.as_ref().map_or(0, Vec::len) + 1,
            NvVal::Ip4(_) => 4,
            NvVal::Ip6(_) => 16,
            NvVal::Mac(_) => 6,
            NvVal::Array { elem, count, items } => {
                if items.is_empty() {
                    count * elem.bytes()
                } else {
                    items.iter().map(NvVal::bytes).sum()
                }
            }
            NvVal::List { width, items, .. } => {
                width + items.iter().map(NvVal::bytes).sum::<usize>()
            }
            NvVal::Bitmask { width, .. } | NvVal::Enum { width, .. } => *width,
            NvVal::Compound { fields, .. } => fields
                .iter()
                .filter(|f| f.present)
                .map(|f| f.val.bytes())
                .sum(),
            NvVal::Data { size, val } => val.as_ref().map_or(*size, Vec::len),
        }
    }

    pub fn is_set(&self) -> bool {
        match self {
            NvVal::U8(v) => v.is_some(),
            NvVal::U16(v) => v.is_some(),
            NvVal::U32 { val, .. } => val.is_some(),
            NvVal::I8(v) => v.is_some(),
            NvVal::I16(v) => v.is_some(),
            NvVal::I32(v) => v.is_some(),
            NvVal::Version(v) => v.is_some(),
            NvVal::FString { val, .. } | NvVal::PString { val, .. } => val.is_some(),
            NvVal::ZString(val) => val.is_some(),
            NvVal::Ip4(v) => v.is_some(),
            NvVal::Ip6(v) => v.is_some(),
            NvVal::Mac(v) => v.is_some(),
            NvVal::Array { items, .. } | NvVal::List { items, .. } => !items.is_empty(),
            NvVal::Bitmask { val, .. } | NvVal::Enum { val, .. } => val.is_some(),
            NvVal::Compound { set, .. } => *set,
            NvVal::Data { val, .. } => val.is_some(),
        }
    }

    /// Fills the value from `r`, consuming exactly the bytes it reports via
    /// [`NvVal::bytes`] afterwards. `budget` is the number of payload bytes
    /// still available; compounds use it to skip optional trailing fields.
    pub fn read(&mut self, r: &mut dyn Read, budget: usize) -> NvResult<()> {
        match self {
            NvVal::U8(v) => *v = Some(read_u8(r)?),
            NvVal::U16(v) => *v = Some(read_u16(r)?),
            NvVal::U32 { val, big_endian } => {
                let raw = read_exact::<4>(r)?;
                *val = Some(if *big_endian {
                    u32::from_be_bytes(raw)
                } else {
                    u32::from_le_bytes(raw)
                });
            }
            NvVal::I8(v) => *v = Some(read_u8(r)? as i8),
            NvVal::I16(v) => *v = Some(read_u16(r)? as i16),
            NvVal::I32(v) => *v = Some(u32::from_be_bytes(read_exact::<4>(r)?) as i32),
            NvVal::Version(v) => {
                let raw = read_exact::<2>(r)?;
                *v = Some((raw[0], raw[1]));
            }
            NvVal::FString { size, val } => *val = Some(read_vec(r, *size)?),
            NvVal::PString { width, val } => {
                let len = match *width {
                    1 => read_u8(r)? as usize,
                    _ => read_u16(r)? as usize,
                };
                *val = Some(read_vec(r, len)?);
            }
            NvVal::ZString(val) => {
                let mut buf = Vec::new();
                loop {
                    let b = read_u8(r)?;
                    if b == 0 {
                        break;
                    }
                    buf.push(b);
                }
                *val = Some(buf);
            }
            NvVal::Ip4(v) => *v = Some(read_exact::<4>(r)?),
            NvVal::Ip6(v) => *v = Some(read_exact::<16>(r)?),
            NvVal::Mac(v) => *v = Some(read_exact::<6>(r)?),
            NvVal::Array { elem, count, items } => {
                let mut remaining = budget;
                let mut out = Vec::with_capacity(*count);
                for _ in 0..*count {
                    let mut item = (**elem).clone();
                    item.read(r, remaining)?;
                    remaining = remaining.saturating_sub(item.bytes());
                    out.push(item);
                }
                *items = out;
            }
            NvVal::List { width, elem, items } => {
                let count = match *width {
                    1 => read_u8(r)? as usize,
                    _ => read_u16(r)? as usize,
                };
                let mut remaining = budget.saturating_sub(*width);
                let mut out = Vec::new();
                for _ in 0..count {
                    let mut item = (**elem).clone();
                    item.read(r, remaining)?;
                    remaining = remaining.saturating_sub(item.bytes());
                    out.push(item);
                }
                *items = out;
            }
            NvVal::Bitmask { width, val, .. } => *val = Some(read_uint(r, *width)?),
            NvVal::Enum { width, val, .. } => *val = Some(read_uint(r, *width)?),
            NvVal::Compound { fields, set } => {
                let mut remaining = budget;
                for f in fields.iter_mut() {
                    if f.optional && remaining < f.val.bytes() {
                        f.present = false;
                        continue;
                    }
                    f.val.read(r, remaining)?;
                    f.present = true;
                    remaining = remaining.saturating_sub(f.val.bytes());
                }
                *set = true;
            }
            NvVal::Data { size, val } => *val = Some(read_vec(r, *size)?),
        }
        Ok(())
    }

    /// Emits exactly [`NvVal::bytes`] bytes. Unset values emit their
    /// zeroed default encoding.
    pub fn write(&self, w: &mut dyn Write) -> NvResult<()> {
        match self {
            NvVal::U8(v) => w.write_all(&[v.unwrap_or(0)])?,
            NvVal::U16(v) => w.write_all(&v.unwrap_or(0).to_be_bytes())?,
            NvVal::U32 { val, big_endian } => {
                let v = val.unwrap_or(0);
                w.write_all(&if *big_endian {
                    v.to_be_bytes()
                } else {
                    v.to_le_bytes()
                })?;
            }
            NvVal::I8(v) => w.write_all(&[v.unwrap_or(0) as u8])?,
            NvVal::I16(v) => w.write_all(&v.unwrap_or(0).to_be_bytes())?,
            NvVal::I32(v) => w.write_all(&v.unwrap_or(0).to_be_bytes())?,
            NvVal::Version(v) => {
                let (maj, min) = v.unwrap_or((0, 0));
                w.write_all(&[maj, min])?;
            }
            NvVal::FString { size, val } => {
                let mut buf = val.clone().unwrap_or_default();
                buf.resize(*size, 0);
                w.write_all(&buf)?;
            }
            NvVal::PString { width, val } => {
                let data = val.as_deref().unwrap_or_default();
                match *width {
                    1 => w.write_all(&[data.len() as u8])?,
                    _ => w.write_all(&(data.len() as u16).to_be_bytes())?,
                }
                w.write_all(data)?;
            }
            NvVal::ZString(val) => {
                w.write_all(val.as_deref().unwrap_or_default())?;
                w.write_all(&[0])?;
            }
            NvVal::Ip4(v) => w.write_all(&v.unwrap_or_default())?,
            NvVal::Ip6(v) => w.write_all(&v.unwrap_or([0; 16]))?,
            NvVal::Mac(v) => w.write_all(&v.unwrap_or_default())?,
            NvVal::Array { elem, count, items } => {
                if items.is_empty() {
                    for _ in 0..*count {
                        elem.write(w)?;
                    }
                } else {
                    for item in items {
                        item.write(w)?;
                    }
                }
            }
            NvVal::List { width, items, .. } => {
                match *width {
                    1 => w.write_all(&[items.len() as u8])?,
                    _ => w.write_all(&(items.len() as u16).to_be_bytes())?,
                }
                for item in items {
                    item.write(w)?;
                }
            }
            NvVal::Bitmask { width, val, .. } | NvVal::Enum { width, val, .. } => {
                write_uint(w, val.unwrap_or(0), *width)?;
            }
            NvVal::Compound { fields, .. } => {
                for f in fields.iter().filter(|f| f.present) {
                    f.val.write(w)?;
                }
            }
            NvVal::Data { size, val } => match val {
                Some(data) => w.write_all(data)?,
                None => w.write_all(&vec![0u8; *size])?,
            },
        }
        Ok(())
    }

    /// Populates the value from its textual representation.
    pub fn parse(&mut self, text: &str) -> NvResult<()> {
        let text = text.trim();
        match self {
            NvVal::U8(v) => *v = Some(parse_uint(text, u8::MAX as u64)? as u8),
            NvVal::U16(v) => *v = Some(parse_uint(text, u16::MAX as u64)? as u16),
            NvVal::U32 { val, .. } => *val = Some(parse_uint(text, u32::MAX as u64)? as u32),
            NvVal::I8(v) => *v = Some(parse_int(text, i8::MIN as i64, i8::MAX as i64)? as i8),
            NvVal::I16(v) => *v = Some(parse_int(text, i16::MIN as i64, i16::MAX as i64)? as i16),
            NvVal::I32(v) => *v = Some(parse_int(text, i32::MIN as i64, i32::MAX as i64)? as i32),
            NvVal::Version(v) => {
                let (maj, min) = text
                    .split_once('.')
                    .ok_or_else(|| NvError::Parse(format!("expected major.minor: '{text}'")))?;
                *v = Some((
                    parse_uint(maj, u8::MAX as u64)? as u8,
                    parse_uint(min, u8::MAX as u64)? as u8,
                ));
            }
            NvVal::FString { size, val } => {
                if text.len() > *size {
                    return Err(NvError::Parse(format!(
                        "string longer than {size} bytes: '{text}'"
                    )));
                }
                *val = Some(text.as_bytes().to_vec());
            }
            NvVal::PString { width, val } => {
                let max = match *width {
                    1 => u8::MAX as usize,
                    _ => u16::MAX as usize,
                };
                if text.len() > max {
                    return Err(NvError::Parse(format!("string longer than {max} bytes")));
                }
                *val = Some(text.as_bytes().to_vec());
            }
            NvVal::ZString(val) => {
                if text.contains('\0') {
                    return Err(NvError::Parse("string contains a NUL byte".into()));
                }
                *val = Some(text.as_bytes().to_vec());
            }
            NvVal::Ip4(v) => {
                let addr: Ipv4Addr = text
                    .parse()
                    .map_err(|_| NvError::Parse(format!("bad IPv4 address: '{text}'")))?;
                *v = Some(addr.octets());
            }
            NvVal::Ip6(v) => {
                let addr: Ipv6Addr = text
                    .parse()
                    .map_err(|_| NvError::Parse(format!("bad IPv6 address: '{text}'")))?;
                *v = Some(addr.octets());
            }
            NvVal::Mac(v) => {
                let parts: Vec<&str> = text.split(':').collect();
                if parts.len() != 6 {
                    return Err(NvError::Parse(format!("bad MAC address: '{text}'")));
                }
                let mut mac = [0u8; 6];
                for (i, part) in parts.iter().enumerate() {
                    mac[i] = u8::from_str_radix(part, 16)
                        .map_err(|_| NvError::Parse(format!("bad MAC address: '{text}'")))?;
                }
                *v = Some(mac);
            }
            NvVal::Bitmask { width, flags, val } => {
                let mut bits = 0u64;
                if let Ok(n) = parse_uint(text, max_uint(*width)) {
                    bits = n;
                } else {
                    for name in text.split('|').map(str::trim).filter(|s| !s.is_empty()) {
                        let pos = flags
                            .iter()
                            .position(|f| f == name)
                            .ok_or_else(|| NvError::Parse(format!("unknown flag '{name}'")))?;
                        bits |= 1 << pos;
                    }
                }
                *val = Some(bits);
            }
            NvVal::Enum { width, labels, val } => {
                if let Some(&(n, _)) = labels.iter().find(|(_, l)| l == text) {
                    *val = Some(n);
                } else {
                    *val = Some(parse_uint(text, max_uint(*width))?);
                }
            }
            NvVal::Data { size, val } => {
                let data = hex::decode(text)
                    .map_err(|_| NvError::Parse(format!("bad hex string: '{text}'")))?;
                *size = data.len();
                *val = Some(data);
            }
            NvVal::Array { .. } | NvVal::List { .. } | NvVal::Compound { .. } => {
                return Err(NvError::Parse(format!(
                    "cannot parse a {} from text",
                    self.type_name()
                )));
            }
        }
        Ok(())
    }

    /// Canonical textual form.
    pub fn to_pretty(&self) -> String {
        self.pretty(0)
    }

    fn pretty(&self, indent: usize) -> String {
        match self {
            NvVal::U8(v) => opt_num(*v),
            NvVal::U16(v) => opt_num(*v),
            NvVal::U32 { val, .. } => opt_num(*val),
            NvVal::I8(v) => opt_num(*v),
            NvVal::I16(v) => opt_num(*v),
            NvVal::I32(v) => opt_num(*v),
            NvVal::Version(v) => match v {
                Some((maj, min)) => format!("{maj}.{min}"),
                None => "<unset>".into(),
            },
            NvVal::FString { val, .. } => pretty_string(val, true),
            NvVal::PString { val, .. } => pretty_string(val, false),
            NvVal::ZString(val) => pretty_string(val, false),
            NvVal::Ip4(v) => match v {
                Some(o) => Ipv4Addr::from(*o).to_string(),
                None => "<unset>".into(),
            },
            NvVal::Ip6(v) => match v {
                Some(o) => Ipv6Addr::from(*o).to_string(),
                None => "<unset>".into(),
            },
            NvVal::Mac(v) => match v {
                Some(m) => m
                    .iter()
                    .map(|b| format!("{b:02x}"))
                    .collect::<Vec<_>>()
                    .join(":"),
                None => "<unset>".into(),
            },
            NvVal::Array { items, .. } | NvVal::List { items, .. } => {
                let inner: Vec<String> = items.iter().map(|i| i.pretty(indent)).collect();
                format!("[{}]", inner.join(", "))
            }
            NvVal::Bitmask { flags, val, .. } => match val {
                Some(bits) => {
                    let active: Vec<&str> = flags
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| *bits & (1u64 << i) != 0)
                        .map(|(_, f)| f.as_str())
                        .collect();
                    if active.is_empty() {
                        format!("0x{bits:02x}")
                    } else {
                        format!("0x{bits:02x} ({})", active.join(" | "))
                    }
                }
                None => "<unset>".into(),
            },
            NvVal::Enum { labels, val, .. } => match val {
                Some(n) => labels
                    .iter()
                    .find(|(v, _)| v == n)
                    .map(|(_, l)| l.clone())
                    .unwrap_or_else(|| n.to_string()),
                None => "<unset>".into(),
            },
            NvVal::Compound { fields, .. } => {
                let pad = "  ".repeat(indent + 1);
                let mut out = String::from("{\n");
                for f in fields {
                    if !f.present {
                        continue;
                    }
                    out.push_str(&pad);
                    out.push_str(&f.name);
                    out.push_str(" = ");
                    out.push_str(&f.val.pretty(indent + 1));
                    out.push('\n');
                }
                out.push_str(&"  ".repeat(indent));
                out.push('}');
                out
            }
            NvVal::Data { val, .. } => match val {
                Some(data) => hex::encode(data),
                None => "<unset>".into(),
            },
        }
    }

    /// Resolves a dotted path (`a.b.c`) against this value. Compound
    /// segments match child names; array and list segments match indices.
    pub fn find(&self, path: &str) -> Option<&NvVal> {
        if path.is_empty() {
            return Some(self);
        }
        let (head, rest) = match path.split_once('.') {
            Some((h, r)) => (h, r),
            None => (path, ""),
        };
        match self {
            NvVal::Compound { fields, .. } => fields
                .iter()
                .find(|f| f.name == head)
                .and_then(|f| f.val.find(rest)),
            NvVal::Array { items, .. } | NvVal::List { items, .. } => head
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .and_then(|v| v.find(rest)),
            _ => None,
        }
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut NvVal> {
        if path.is_empty() {
            return Some(self);
        }
        let (head, rest) = match path.split_once('.') {
            Some((h, r)) => (h, r),
            None => (path, ""),
        };
        match self {
            NvVal::Compound { fields, .. } => fields
                .iter_mut()
                .find(|f| f.name == head)
                .and_then(|f| f.val.find_mut(rest)),
            NvVal::Array { items, .. } | NvVal::List { items, .. } => head
                .parse::<usize>()
                .ok()
                .and_then(move |i| items.get_mut(i))
                .and_then(|v| v.find_mut(rest)),
            _ => None,
        }
    }
}

fn read_uint(r: &mut dyn Read, width: usize) -> NvResult<u64> {
    Ok(match width {
        1 => read_u8(r)? as u64,
        2 => read_u16(r)? as u64,
        _ => u32::from_be_bytes(read_exact::<4>(r)?) as u64,
    })
}

fn write_uint(w: &mut dyn Write, v: u64, width: usize) -> NvResult<()> {
    match width {
        1 => w.write_all(&[v as u8])?,
        2 => w.write_all(&(v as u16).to_be_bytes())?,
        _ => w.write_all(&(v as u32).to_be_bytes())?,
    }
    Ok(())
}

fn max_uint(width: usize) -> u64 {
    match width {
        1 => u8::MAX as u64,
        2 => u16::MAX as u64,
        _ => u32::MAX as u64,
    }
}

fn parse_uint(text: &str, max: u64) -> NvResult<u64> {
    let n = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        text.parse::<u64>()
    }
    .map_err(|_| NvError::Parse(format!("bad number: '{text}'")))?;

    if n > max {
        return Err(NvError::Parse(format!("{n} exceeds maximum {max}")));
    }
    Ok(n)
}

fn parse_int(text: &str, min: i64, max: i64) -> NvResult<i64> {
    let n = text
        .parse::<i64>()
        .map_err(|_| NvError::Parse(format!("bad number: '{text}'")))?;
    if n < min || n > max {
        return Err(NvError::Parse(format!("{n} outside {min}..={max}")));
    }
    Ok(n)
}

fn opt_num<T: std::fmt::Display>(v: Option<T>) -> String {
    match v {
        Some(n) => n.to_string(),
        None => "<unset>".into(),
    }
}

fn pretty_string(val: &Option<Vec<u8>>, stop_at_nul: bool) -> String {
    match val {
        Some(data) => {
            let end = if stop_at_nul {
                data.iter().position(|&b| b == 0).unwrap_or(data.len())
            } else {
                data.len()
            };
            format!("\"{}\"", String::from_utf8_lossy(&data[..end]))
        }
        None => "<unset>".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn round_trip(val: &mut NvVal, input: &[u8]) -> Vec<u8> {
        let mut cur = Cursor::new(input);
        val.read(&mut cur, input.len()).unwrap();
        assert_eq!(val.bytes(), input.len());
        let mut out = Vec::new();
        val.write(&mut out).unwrap();
        out
    }

    #[test]
    fn u32_endianness() {
        let mut be = NvVal::u32();
        assert_eq!(round_trip(&mut be, &[0x01, 0x02, 0x03, 0x04]), [1, 2, 3, 4]);
        assert_eq!(be.to_pretty(), "16909060");

        let mut le = NvVal::u32_le();
        le.read(&mut Cursor::new(&[0x01, 0x02, 0x03, 0x04][..]), 4).unwrap();
        assert_eq!(le.to_pretty(), "67305985");
    }

    #[test]
    fn version_parse_and_pretty() {
        let mut v = NvVal::version();
        v.parse("2.16").unwrap();
        let mut out = Vec::new();
        v.write(&mut out).unwrap();
        assert_eq!(out, [2, 16]);
        assert_eq!(v.to_pretty(), "2.16");
    }

    #[test]
    fn fstring_pads_on_write() {
        let mut s = NvVal::fstring(8);
        s.parse("abc").unwrap();
        let mut out = Vec::new();
        s.write(&mut out).unwrap();
        assert_eq!(out, b"abc\0\0\0\0\0");
        assert_eq!(s.bytes(), 8);
        assert_eq!(s.to_pretty(), "\"abc\"");
    }

    #[test]
    fn pstring_size_tracks_content() {
        let mut s = NvVal::pstring(2);
        assert_eq!(s.bytes(), 2);
        assert_eq!(round_trip(&mut s, &[0x00, 0x03, b'f', b'o', b'o']).len(), 5);
        assert_eq!(s.bytes(), 5);
        assert_eq!(s.to_pretty(), "\"foo\"");
    }

    #[test]
    fn zstring_round_trip() {
        let mut s = NvVal::zstring();
        assert_eq!(round_trip(&mut s, b"hi\0"), b"hi\0");
        assert_eq!(s.bytes(), 3);
    }

    #[test]
    fn addresses() {
        let mut ip = NvVal::ip4();
        ip.parse("192.168.0.1").unwrap();
        assert_eq!(ip.to_pretty(), "192.168.0.1");
        assert_eq!(ip.bytes(), 4);

        let mut mac = NvVal::mac();
        mac.parse("00:26:5e:01:02:03").unwrap();
        assert_eq!(mac.to_pretty(), "00:26:5e:01:02:03");
        let mut out = Vec::new();
        mac.write(&mut out).unwrap();
        assert_eq!(out, [0x00, 0x26, 0x5e, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn array_is_count_times_elem() {
        let mut a = NvVal::array(NvVal::u16(), 3);
        assert_eq!(a.bytes(), 6);
        let out = round_trip(&mut a, &[0, 1, 0, 2, 0, 3]);
        assert_eq!(out, [0, 1, 0, 2, 0, 3]);
        assert_eq!(a.to_pretty(), "[1, 2, 3]");
    }

    #[test]
    fn list_prefix_counts_items() {
        let mut l = NvVal::list(1, NvVal::u8());
        let out = round_trip(&mut l, &[2, 0xAA, 0xBB]);
        assert_eq!(out, [2, 0xAA, 0xBB]);
        assert_eq!(l.bytes(), 3);
    }

    #[test]
    fn bitmask_flags() {
        let mut b = NvVal::bitmask(1, &["http", "telnet", "ssh"]);
        b.parse("http|ssh").unwrap();
        assert_eq!(b.to_pretty(), "0x05 (http | ssh)");
        b.parse("0x02").unwrap();
        assert_eq!(b.to_pretty(), "0x02 (telnet)");
    }

    #[test]
    fn enum_labels() {
        let mut e = NvVal::enumeration(1, &[(0, "disabled"), (1, "enabled")]);
        e.parse("enabled").unwrap();
        assert_eq!(e.to_pretty(), "enabled");
        let mut out = Vec::new();
        e.write(&mut out).unwrap();
        assert_eq!(out, [1]);
        e.parse("7").unwrap();
        assert_eq!(e.to_pretty(), "7");
    }

    #[test]
    fn compound_bytes_is_sum_of_children() {
        let mut c = NvVal::compound(vec![
            Field::new("a", NvVal::u16()),
            Field::new("b", NvVal::ip4()),
            Field::new("c", NvVal::u8()),
        ]);
        let input = [0x00, 0x05, 10, 0, 0, 1, 9];
        let out = round_trip(&mut c, &input);
        assert_eq!(out, input);
        assert_eq!(c.bytes(), 7);
        assert!(c.is_set());
    }

    #[test]
    fn optional_field_skipped_when_budget_short() {
        let mut c = NvVal::compound(vec![
            Field::new("a", NvVal::u16()),
            Field::optional("b", NvVal::u32()),
        ]);
        let input = [0x00, 0x07];
        let mut cur = Cursor::new(&input[..]);
        c.read(&mut cur, input.len()).unwrap();
        assert_eq!(c.bytes(), 2);
        assert_eq!(c.find("a").unwrap().to_pretty(), "7");
        // skipped field does not write either
        let mut out = Vec::new();
        c.write(&mut out).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn truncated_read_is_short_read() {
        let mut v = NvVal::u32();
        let mut cur = Cursor::new(&[0x01, 0x02][..]);
        assert!(matches!(v.read(&mut cur, 2), Err(NvError::ShortRead)));
    }

    #[test]
    fn dotted_path_resolution() {
        let mut c = NvVal::compound(vec![Field::new(
            "inner",
            NvVal::compound(vec![Field::new("port", NvVal::u16())]),
        )]);
        c.find_mut("inner.port").unwrap().parse("8080").unwrap();
        assert_eq!(c.find("inner.port").unwrap().to_pretty(), "8080");
        assert!(c.find("inner.nope").is_none());
    }

    #[test]
    fn data_round_trips_raw_bytes() {
        let mut d = NvVal::data(4);
        let out = round_trip(&mut d, &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(out, [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(d.to_pretty(), "deadbeef");
    }
}
