#![forbid(unsafe_code)]

use std::io::{Read, Write};

use crate::nv::error::{NvError, NvResult};

/// Inputs larger than any observed nonvol partition are rejected outright.
pub const MAX_INPUT: usize = 8 * 1024 * 1024;

pub fn read_exact<const N: usize>(r: &mut dyn Read) -> NvResult<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf).map_err(map_eof)?;
    Ok(buf)
}

pub fn read_u8(r: &mut dyn Read) -> NvResult<u8> {
    Ok(read_exact::<1>(r)?[0])
}

pub fn read_u16(r: &mut dyn Read) -> NvResult<u16> {
    Ok(u16::from_be_bytes(read_exact::<2>(r)?))
}

pub fn read_u32(r: &mut dyn Read) -> NvResult<u32> {
    Ok(u32::from_be_bytes(read_exact::<4>(r)?))
}

pub fn read_vec(r: &mut dyn Read, len: usize) -> NvResult<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf).map_err(map_eof)?;
    Ok(buf)
}

/// Reads the rest of the stream, refusing anything past [`MAX_INPUT`].
pub fn read_all(r: &mut dyn Read) -> NvResult<Vec<u8>> {
    let mut buf = Vec::new();
    r.take(MAX_INPUT as u64 + 1).read_to_end(&mut buf)?;
    if buf.len() > MAX_INPUT {
        return Err(NvError::Invalid(format!(
            "input exceeds maximum container size of {MAX_INPUT} bytes"
        )));
    }
    Ok(buf)
}

pub fn write_u16(w: &mut dyn Write, v: u16) -> NvResult<()> {
    w.write_all(&v.to_be_bytes())?;
    Ok(())
}

pub fn write_u32(w: &mut dyn Write, v: u32) -> NvResult<()> {
    w.write_all(&v.to_be_bytes())?;
    Ok(())
}

fn map_eof(e: std::io::Error) -> NvError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        NvError::ShortRead
    } else {
        NvError::Io(e)
    }
}
