#![forbid(unsafe_code)]

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use md5::{Digest, Md5};

/// CRC-32 as stored in permnv/dynnv headers: polynomial 0x04C11DB7, reflected
/// input and output, initial value and final xor 0xFFFFFFFF.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// CRC-16-CCITT, poly 0x1021, init 0xFFFF, MSB first, no final xor.
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in data {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// MD5 over `data || key`. The key is a device-profile secret suffix; an
/// empty key degenerates to plain MD5.
pub fn md5_keyed(data: &[u8], key: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    if !key.is_empty() {
        hasher.update(key);
    }
    hasher.finalize().into()
}

/// AES-256-ECB over whole 16-byte blocks. A trailing sub-block is copied
/// verbatim from input to output: the devices leave it cleartext, and a
/// round-trip must reproduce that exactly.
pub fn aes256_ecb_decrypt(data: &[u8], key: &[u8; 32]) -> Vec<u8> {
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut out = Vec::with_capacity(data.len());
    let mut chunks = data.chunks_exact(16);
    for chunk in &mut chunks {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        out.extend_from_slice(block.as_slice());
    }
    out.extend_from_slice(chunks.remainder());
    out
}

/// Encrypt counterpart of [`aes256_ecb_decrypt`]. With `pad`, 16 zero bytes
/// are appended to the plaintext first; this aligns the final block and
/// accounts for the 16-byte trailer of padded gwsettings files.
pub fn aes256_ecb_encrypt(data: &[u8], key: &[u8; 32], pad: bool) -> Vec<u8> {
    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut input = data.to_vec();
    if pad {
        input.extend_from_slice(&[0u8; 16]);
    }
    let mut out = Vec::with_capacity(input.len());
    let mut chunks = input.chunks_exact(16);
    for chunk in &mut chunks {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.encrypt_block(&mut block);
        out.extend_from_slice(block.as_slice());
    }
    out.extend_from_slice(chunks.remainder());
    out
}
