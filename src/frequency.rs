//! Symbol decoding and frequency analysis
//!
//! Symbols are Unicode scalar values decoded from UTF-8, so a multi-byte
//! character is counted (and later coded) as one unit.

use crate::error::CodecError;
use std::collections::HashMap;
use std::io::{self, BufRead, ErrorKind};

/// Iterator over the Unicode scalar values of a UTF-8 byte stream.
///
/// Yields `CodecError::Decoding` with the offset of the offending sequence
/// and then stops.
pub struct SymbolReader<R> {
    inner: R,
    offset: u64,
    failed: bool,
}

impl<R: BufRead> SymbolReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            failed: false,
        }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(byte[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn decode(&mut self) -> Result<Option<char>, CodecError> {
        let start = self.offset;
        let lead = match self.next_byte()? {
            Some(b) => b,
            None => return Ok(None),
        };
        let width = match lead {
            0x00..=0x7F => return Ok(Some(lead as char)),
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return Err(CodecError::Decoding { offset: start }),
        };

        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            match self.next_byte()? {
                Some(b) if b & 0xC0 == 0x80 => *slot = b,
                _ => return Err(CodecError::Decoding { offset: start }),
            }
        }

        // from_utf8 rejects overlong forms, surrogates and values past U+10FFFF
        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .map(Some)
            .ok_or(CodecError::Decoding { offset: start })
    }
}

impl<R: BufRead> Iterator for SymbolReader<R> {
    type Item = Result<char, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.decode() {
            Ok(symbol) => symbol.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Occurrence count per symbol, remembering first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<(char, u64)>,
    index: HashMap<char, usize>,
    total: u64,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, symbol: char) {
        match self.index.get(&symbol) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(symbol, self.entries.len());
                self.entries.push((symbol, 1));
            }
        }
        self.total += 1;
    }

    pub fn get(&self, symbol: char) -> Option<u64> {
        self.index.get(&symbol).map(|&i| self.entries[i].1)
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of symbols counted.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Entries in the order their symbols were first recorded.
    pub fn iter(&self) -> impl Iterator<Item = (char, u64)> + '_ {
        self.entries.iter().copied()
    }

    /// Shannon entropy in bits per symbol.
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let total = self.total as f64;
        self.entries
            .iter()
            .map(|&(_, count)| {
                let p = count as f64 / total;
                -p * p.log2()
            })
            .sum()
    }
}

impl FromIterator<char> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        for symbol in iter {
            table.record(symbol);
        }
        table
    }
}

/// Count every symbol of `reader` in one pass.
pub fn count_symbols<R: BufRead>(reader: R) -> Result<FrequencyTable, CodecError> {
    let mut table = FrequencyTable::new();
    for symbol in SymbolReader::new(reader) {
        table.record(symbol?);
    }
    tracing::debug!(
        distinct = table.len(),
        total = table.total(),
        "counted symbol frequencies"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Result<Vec<char>, CodecError> {
        SymbolReader::new(bytes).collect()
    }

    #[test]
    fn test_abracadabra_counts() {
        let table = count_symbols(&b"abracadabra"[..]).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.total(), 11);
        assert_eq!(table.get('a'), Some(5));
        assert_eq!(table.get('b'), Some(2));
        assert_eq!(table.get('r'), Some(2));
        assert_eq!(table.get('c'), Some(1));
        assert_eq!(table.get('d'), Some(1));
        assert_eq!(table.get('z'), None);
    }

    #[test]
    fn test_first_seen_order() {
        let table = count_symbols(&b"abracadabra"[..]).unwrap();
        let order: Vec<char> = table.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec!['a', 'b', 'r', 'c', 'd']);
    }

    #[test]
    fn test_multibyte_symbols_are_atomic() {
        let text = "aé€😀é";
        let table = count_symbols(text.as_bytes()).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.total(), 5);
        assert_eq!(table.get('é'), Some(2));
        assert_eq!(table.get('😀'), Some(1));
    }

    #[test]
    fn test_empty_input() {
        let table = count_symbols(&b""[..]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.total(), 0);
        assert_eq!(table.entropy(), 0.0);
    }

    #[test]
    fn test_decoding_offsets() {
        // stray continuation byte
        assert!(matches!(
            decode_all(b"ab\x80c"),
            Err(CodecError::Decoding { offset: 2 })
        ));
        // overlong encoding of '/'
        assert!(matches!(
            decode_all(b"\xC0\xAF"),
            Err(CodecError::Decoding { offset: 0 })
        ));
        // UTF-16 surrogate
        assert!(matches!(
            decode_all(b"x\xED\xA0\x80"),
            Err(CodecError::Decoding { offset: 1 })
        ));
        // truncated by end of input
        assert!(matches!(
            decode_all(&"z€".as_bytes()[..3]),
            Err(CodecError::Decoding { offset: 1 })
        ));
        // above U+10FFFF
        assert!(matches!(
            decode_all(b"\xF4\x90\x80\x80"),
            Err(CodecError::Decoding { offset: 0 })
        ));
    }

    #[test]
    fn test_reader_stops_after_error() {
        let mut reader = SymbolReader::new(&b"\xFFabc"[..]);
        assert!(matches!(reader.next(), Some(Err(_))));
        assert!(reader.next().is_none());
        assert_eq!(reader.offset(), 1);
    }

    #[test]
    fn test_offset_counts_bytes_not_symbols() {
        let mut reader = SymbolReader::new("a€😀".as_bytes());
        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.next().unwrap().unwrap(), 'a');
        assert_eq!(reader.offset(), 1);
        assert_eq!(reader.next().unwrap().unwrap(), '€');
        assert_eq!(reader.offset(), 4);
        assert_eq!(reader.next().unwrap().unwrap(), '😀');
        assert_eq!(reader.offset(), 8);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_entropy() {
        let uniform: FrequencyTable = "aaaa".chars().collect();
        assert!(uniform.entropy().abs() < 1e-12);

        let two: FrequencyTable = "abab".chars().collect();
        assert!((two.entropy() - 1.0).abs() < 1e-12);
    }
}
