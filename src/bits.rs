//! Bit packing of the coded payload
//!
//! Codes are concatenated MSB-first. A final partial byte is padded with
//! zero bits on the low end; the unpacker knows where the payload ends
//! from the symbol count stored in the header, never from the padding.

use crate::codes::{Code, CodeTable, DecodeTable};
use crate::error::CodecError;
use crate::frequency::SymbolReader;
use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use std::io::{self, BufRead, ErrorKind, Read, Write};

pub struct BitPacker<W: Write> {
    writer: BitWriter<W, BigEndian>,
    bits_written: u64,
}

impl<W: Write> BitPacker<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BitWriter::endian(writer, BigEndian),
            bits_written: 0,
        }
    }

    pub fn push(&mut self, code: &Code) -> io::Result<()> {
        for &bit in code.bits() {
            self.writer.write_bit(bit)?;
        }
        self.bits_written += code.len() as u64;
        Ok(())
    }

    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    /// Pad the last byte with zeros and hand back the writer.
    ///
    /// Returns the number of code bits written, padding excluded.
    pub fn finish(mut self) -> io::Result<(W, u64)> {
        self.writer.byte_align()?;
        let mut inner = self.writer.into_writer();
        inner.flush()?;
        Ok((inner, self.bits_written))
    }
}

/// Second compression pass: code every symbol of `reader` into `writer`.
///
/// Returns the writer, the number of symbols coded and the payload size
/// in bits.
pub fn encode_symbols<R: BufRead, W: Write>(
    reader: R,
    codes: &CodeTable,
    writer: W,
) -> Result<(W, u64, u64), CodecError> {
    let mut packer = BitPacker::new(writer);
    let mut symbols = 0u64;
    for symbol in SymbolReader::new(reader) {
        let symbol = symbol?;
        let code = codes.get(symbol).ok_or_else(|| {
            io::Error::new(
                ErrorKind::InvalidData,
                format!("symbol {:?} missing from code table, input changed", symbol),
            )
        })?;
        packer.push(code)?;
        symbols += 1;
    }
    let (writer, bits) = packer.finish()?;
    tracing::debug!(symbols, bits, "packed payload");
    Ok((writer, symbols, bits))
}

/// Greedy prefix matcher over a packed payload.
pub struct BitUnpacker<'t, R: Read> {
    reader: BitReader<R, BigEndian>,
    table: &'t DecodeTable,
    remaining: u64,
    candidate: Code,
    bits_read: u64,
}

impl<'t, R: Read> BitUnpacker<'t, R> {
    /// `reader` must be positioned at the first payload byte.
    pub fn new(reader: R, table: &'t DecodeTable, symbol_count: u64) -> Self {
        Self {
            reader: BitReader::endian(reader, BigEndian),
            table,
            remaining: symbol_count,
            candidate: Code::new(),
            bits_read: 0,
        }
    }

    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }

    /// Decode the next symbol, or `None` once every symbol is out.
    pub fn next_symbol(&mut self) -> Result<Option<char>, CodecError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        loop {
            let bit = match self.reader.read_bit() {
                Ok(bit) => bit,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Err(if self.candidate.is_empty() {
                        CodecError::corrupted(format!(
                            "payload ended with {} symbols still expected",
                            self.remaining
                        ))
                    } else {
                        CodecError::corrupted(format!(
                            "{} unmatched bits at end of payload",
                            self.candidate.len()
                        ))
                    });
                }
                Err(e) => return Err(e.into()),
            };
            self.bits_read += 1;
            self.candidate.push(bit);

            if let Some(symbol) = self.table.get(&self.candidate) {
                self.candidate.clear();
                self.remaining -= 1;
                return Ok(Some(symbol));
            }
            if self.candidate.len() >= self.table.max_code_len() {
                return Err(CodecError::corrupted(format!(
                    "bit sequence {} matches no code",
                    self.candidate
                )));
            }
        }
    }

    /// Check that only zero padding follows the last symbol.
    pub fn finish(mut self) -> Result<u64, CodecError> {
        if self.remaining > 0 {
            return Err(CodecError::corrupted(format!(
                "{} symbols left undecoded",
                self.remaining
            )));
        }
        while !self.reader.byte_aligned() {
            if self.reader.read_bit()? {
                return Err(CodecError::corrupted("non-zero padding in final byte"));
            }
        }
        match self.reader.read_bit() {
            Ok(_) => Err(CodecError::corrupted("trailing bytes after payload")),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(self.bits_read),
            Err(e) => Err(e.into()),
        }
    }
}

impl<'t, R: Read> Iterator for BitUnpacker<'t, R> {
    type Item = Result<char, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_symbol().transpose()
    }
}

/// Decode `symbol_count` symbols from `reader` into `writer` as UTF-8.
///
/// Returns the writer, the number of payload bits consumed and the number
/// of bytes written.
pub fn decode_symbols<R: Read, W: Write>(
    reader: R,
    table: &DecodeTable,
    symbol_count: u64,
    mut writer: W,
) -> Result<(W, u64, u64), CodecError> {
    let mut unpacker = BitUnpacker::new(reader, table, symbol_count);
    let mut utf8 = [0u8; 4];
    let mut written = 0u64;
    while let Some(symbol) = unpacker.next_symbol()? {
        let encoded = symbol.encode_utf8(&mut utf8);
        writer.write_all(encoded.as_bytes())?;
        written += encoded.len() as u64;
    }
    let bits = unpacker.finish()?;
    writer.flush()?;
    tracing::debug!(symbols = symbol_count, bits, bytes = written, "unpacked payload");
    Ok((writer, bits, written))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::generate_codes;
    use crate::frequency::FrequencyTable;
    use crate::tree::build_tree;

    fn codes_for(text: &str) -> CodeTable {
        let frequencies: FrequencyTable = text.chars().collect();
        generate_codes(&build_tree(&frequencies).unwrap())
    }

    fn code(s: &str) -> Code {
        s.parse().unwrap()
    }

    #[test]
    fn test_packer_msb_first_with_zero_padding() {
        let mut packer = BitPacker::new(Vec::new());
        packer.push(&code("101")).unwrap();
        packer.push(&code("11111")).unwrap();
        packer.push(&code("01")).unwrap();
        assert_eq!(packer.bits_written(), 10);
        let (bytes, bits) = packer.finish().unwrap();
        assert_eq!(bits, 10);
        assert_eq!(bytes, vec![0b1011_1111, 0b0100_0000]);
    }

    #[test]
    fn test_packer_exact_byte_has_no_padding_byte() {
        let mut packer = BitPacker::new(Vec::new());
        packer.push(&code("1010")).unwrap();
        packer.push(&code("0101")).unwrap();
        let (bytes, _) = packer.finish().unwrap();
        assert_eq!(bytes, vec![0b1010_0101]);
    }

    #[test]
    fn test_abracadabra_payload() {
        let text = "abracadabra";
        let codes = codes_for(text);
        let (payload, symbols, bits) =
            encode_symbols(text.as_bytes(), &codes, Vec::new()).unwrap();
        assert_eq!(symbols, 11);
        assert_eq!(bits, 23);
        assert_eq!(payload.len(), 3);

        let table = codes.to_decode_table();
        let (out, read, written) =
            decode_symbols(&payload[..], &table, symbols, Vec::new()).unwrap();
        assert_eq!(read, 23);
        assert_eq!(written, 11);
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn test_padding_never_decoded_as_symbols() {
        // "a" is code 0, so zero padding would look like extra 'a's
        let text = "ab";
        let codes = codes_for(text);
        let (payload, symbols, _) = encode_symbols(text.as_bytes(), &codes, Vec::new()).unwrap();
        assert_eq!(payload.len(), 1);

        let table = codes.to_decode_table();
        let mut unpacker = BitUnpacker::new(&payload[..], &table, symbols);
        let decoded: Result<String, _> = unpacker.by_ref().collect();
        assert_eq!(decoded.unwrap(), "ab");
        assert_eq!(unpacker.bits_read(), 2);
        assert_eq!(unpacker.finish().unwrap(), 2);
    }

    #[test]
    fn test_truncated_payload() {
        let text = "abracadabra";
        let codes = codes_for(text);
        let (payload, symbols, _) = encode_symbols(text.as_bytes(), &codes, Vec::new()).unwrap();
        let table = codes.to_decode_table();
        let err = decode_symbols(&payload[..2], &table, symbols, Vec::new()).unwrap_err();
        assert!(matches!(err, CodecError::CorruptedStream(_)));
    }

    #[test]
    fn test_residual_bits_reported() {
        let table = codes_for("abracadabra").to_decode_table();
        // two r's (111) then "11", a proper prefix of b and r
        let err = decode_symbols(&[0b1111_1111u8][..], &table, 3, Vec::new()).unwrap_err();
        match err {
            CodecError::CorruptedStream(msg) => assert!(msg.contains("unmatched")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let text = "abracadabra";
        let codes = codes_for(text);
        let (mut payload, symbols, _) =
            encode_symbols(text.as_bytes(), &codes, Vec::new()).unwrap();
        payload.push(0);
        let table = codes.to_decode_table();
        let err = decode_symbols(&payload[..], &table, symbols, Vec::new()).unwrap_err();
        assert!(matches!(err, CodecError::CorruptedStream(ref m) if m.contains("trailing")));
    }

    #[test]
    fn test_non_zero_padding_rejected() {
        let table = codes_for("ab").to_decode_table();
        // "ab" is 0 then 1, followed by a set padding bit
        let err = decode_symbols(&[0b0110_0000u8][..], &table, 2, Vec::new()).unwrap_err();
        assert!(matches!(err, CodecError::CorruptedStream(ref m) if m.contains("padding")));
    }

    #[test]
    fn test_unknown_code_rejected() {
        let mut table = DecodeTable::default();
        table.insert(code("00"), 'x');
        table.insert(code("01"), 'y');
        let err = decode_symbols(&[0b1000_0000u8][..], &table, 1, Vec::new()).unwrap_err();
        assert!(matches!(err, CodecError::CorruptedStream(ref m) if m.contains("matches no code")));
    }

    #[test]
    fn test_empty_payload() {
        let table = DecodeTable::default();
        let (out, bits, _) = decode_symbols(&b""[..], &table, 0, Vec::new()).unwrap();
        assert!(out.is_empty());
        assert_eq!(bits, 0);
    }
}
