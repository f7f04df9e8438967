//! Code table framing
//!
//! Layout: `[magic:4][symbol_count:u64 LE][record...][0x00]` where each
//! record is `[symbol_len:u8 1..=4][symbol utf-8][code_len:u8][code bits]`.
//! Code bits are packed MSB-first and zero-padded to a whole byte. A
//! symbol is never zero bytes long, so a zero where a record would start
//! marks the end of the table.

use crate::codes::{Code, CodeTable, DecodeTable};
use crate::error::CodecError;
use std::collections::HashSet;
use std::io::{ErrorKind, Read, Write};

pub const MAGIC: [u8; 4] = *b"HUF\x01";
pub const END_OF_TABLE: u8 = 0;
pub const MAX_CODE_LEN: usize = u8::MAX as usize;

/// A parsed header.
#[derive(Debug, Clone)]
pub struct Header {
    pub decode_table: DecodeTable,
    /// Number of symbols coded in the payload.
    pub symbol_count: u64,
    /// Bytes consumed by the header; the payload starts at this offset.
    pub len: u64,
}

/// Write the header for `codes` and return its length in bytes.
pub fn write_header<W: Write>(
    codes: &CodeTable,
    symbol_count: u64,
    mut writer: W,
) -> Result<u64, CodecError> {
    let mut out = Vec::with_capacity(13 + codes.len() * 4);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&symbol_count.to_le_bytes());

    for (symbol, code) in codes.iter() {
        if code.is_empty() || code.len() > MAX_CODE_LEN {
            return Err(CodecError::format(format!(
                "code for {:?} has unsupported length {}",
                symbol,
                code.len()
            )));
        }
        let mut utf8 = [0u8; 4];
        let encoded = symbol.encode_utf8(&mut utf8);
        out.push(encoded.len() as u8);
        out.extend_from_slice(encoded.as_bytes());
        out.push(code.len() as u8);
        pack_code(code, &mut out);
    }
    out.push(END_OF_TABLE);

    writer.write_all(&out)?;
    tracing::debug!(
        records = codes.len(),
        bytes = out.len(),
        "wrote code table header"
    );
    Ok(out.len() as u64)
}

fn pack_code(code: &Code, out: &mut Vec<u8>) {
    for chunk in code.bits().chunks(8) {
        let mut byte = 0u8;
        for (i, &bit) in chunk.iter().enumerate() {
            if bit {
                byte |= 0x80 >> i;
            }
        }
        out.push(byte);
    }
}

struct HeaderReader<R> {
    inner: R,
    consumed: u64,
}

impl<R: Read> HeaderReader<R> {
    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<(), CodecError> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.consumed += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(CodecError::format(format!(
                "end of input while reading {} (missing end-of-table marker)",
                what
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn read_u8(&mut self, what: &str) -> Result<u8, CodecError> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte, what)?;
        Ok(byte[0])
    }
}

/// Parse a header, consuming exactly its bytes from `reader`.
pub fn read_header<R: Read>(reader: R) -> Result<Header, CodecError> {
    let mut reader = HeaderReader {
        inner: reader,
        consumed: 0,
    };

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic, "magic")?;
    if magic[..3] != MAGIC[..3] {
        return Err(CodecError::format("not a huffpack stream (bad magic)"));
    }
    if magic[3] != MAGIC[3] {
        return Err(CodecError::format(format!(
            "unsupported format version {}",
            magic[3]
        )));
    }

    let mut count = [0u8; 8];
    reader.read_exact(&mut count, "symbol count")?;
    let symbol_count = u64::from_le_bytes(count);

    let mut decode_table = DecodeTable::default();
    let mut seen = HashSet::new();
    loop {
        let record = decode_table.len() + 1;
        let symbol_len = reader.read_u8("record")? as usize;
        if symbol_len == END_OF_TABLE as usize {
            break;
        }
        if symbol_len > 4 {
            return Err(CodecError::format(format!(
                "record {}: symbol length {} out of range",
                record, symbol_len
            )));
        }

        let mut utf8 = [0u8; 4];
        reader.read_exact(&mut utf8[..symbol_len], "symbol")?;
        let symbol = single_char(&utf8[..symbol_len]).ok_or_else(|| {
            CodecError::format(format!("record {}: symbol is not one character", record))
        })?;
        if !seen.insert(symbol) {
            return Err(CodecError::format(format!(
                "record {}: duplicate symbol {:?}",
                record, symbol
            )));
        }

        let code_len = reader.read_u8("code length")? as usize;
        if code_len == 0 {
            return Err(CodecError::format(format!("record {}: empty code", record)));
        }
        let mut packed = vec![0u8; (code_len + 7) / 8];
        reader.read_exact(&mut packed, "code")?;
        let code = unpack_code(&packed, code_len).ok_or_else(|| {
            CodecError::format(format!("record {}: non-zero code padding", record))
        })?;

        if decode_table.insert(code, symbol).is_some() {
            return Err(CodecError::format(format!(
                "record {}: duplicate code",
                record
            )));
        }
    }

    if !decode_table.is_prefix_free() {
        return Err(CodecError::format("code table is not prefix-free"));
    }
    if decode_table.is_empty() != (symbol_count == 0) {
        return Err(CodecError::format(format!(
            "{} records cannot code {} symbols",
            decode_table.len(),
            symbol_count
        )));
    }

    tracing::debug!(
        records = decode_table.len(),
        symbol_count,
        bytes = reader.consumed,
        "read code table header"
    );
    Ok(Header {
        decode_table,
        symbol_count,
        len: reader.consumed,
    })
}

fn single_char(bytes: &[u8]) -> Option<char> {
    let s = std::str::from_utf8(bytes).ok()?;
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn unpack_code(packed: &[u8], len: usize) -> Option<Code> {
    let mut code = Code::new();
    for i in 0..packed.len() * 8 {
        let bit = packed[i / 8] & (0x80 >> (i % 8)) != 0;
        if i < len {
            code.push(bit);
        } else if bit {
            return None;
        }
    }
    Some(code)
}
