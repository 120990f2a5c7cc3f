#![forbid(unsafe_code)]

pub mod nv;
