use std::io::{Read, Write};

/// Every XDR item occupies a whole number of four-byte units.
pub const ALIGNMENT: usize = 4;

/// Consumes the zero padding that follows `src_len` payload bytes.
pub fn read_padding(src_len: usize, src: &mut impl Read) -> std::io::Result<()> {
    let mut padding = [0_u8; ALIGNMENT];
    src.read_exact(&mut padding[(src_len % ALIGNMENT)..])
}

/// Emits the zero padding that must follow `src_len` payload bytes.
pub fn write_padding(src_len: usize, dest: &mut impl Write) -> std::io::Result<()> {
    let padding = [0_u8; ALIGNMENT];
    dest.write_all(&padding[(src_len % ALIGNMENT)..])
}

pub fn invalid_data(m: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, m)
}
