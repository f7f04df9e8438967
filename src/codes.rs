//! Prefix codes derived from a Huffman tree

use crate::frequency::FrequencyTable;
use crate::tree::Node;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// A variable-length bit string, first bit first.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Code(Vec<bool>);

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bit: bool) {
        self.0.push(bit);
    }

    pub fn pop(&mut self) -> Option<bool> {
        self.0.pop()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    pub fn is_prefix_of(&self, other: &Code) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl From<Vec<bool>> for Code {
    fn from(bits: Vec<bool>) -> Self {
        Code(bits)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.0 {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCodeError(char);

impl fmt::Display for ParseCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid bit character {:?}", self.0)
    }
}

impl std::error::Error for ParseCodeError {}

impl FromStr for Code {
    type Err = ParseCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(ParseCodeError(other)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Code)
    }
}

/// Whether no code in `codes` is a prefix of another (or equal to it).
pub(crate) fn prefix_free<'a>(codes: impl Iterator<Item = &'a Code>) -> bool {
    let mut sorted: Vec<&Code> = codes.collect();
    sorted.sort();
    // in lexicographic order a prefix sorts directly before some extension of it
    sorted.windows(2).all(|pair| !pair[0].is_prefix_of(pair[1]))
}

/// Symbol to code mapping, iterated in symbol order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    codes: BTreeMap<char, Code>,
}

impl CodeTable {
    pub fn get(&self, symbol: char) -> Option<&Code> {
        self.codes.get(&symbol)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &Code)> + '_ {
        self.codes.iter().map(|(&symbol, code)| (symbol, code))
    }

    pub fn max_code_len(&self) -> usize {
        self.codes.values().map(Code::len).max().unwrap_or(0)
    }

    /// Payload size in bits when coding a text with these frequencies.
    pub fn encoded_bits(&self, frequencies: &FrequencyTable) -> u64 {
        frequencies
            .iter()
            .filter_map(|(symbol, count)| self.get(symbol).map(|code| code.len() as u64 * count))
            .sum()
    }

    pub fn is_prefix_free(&self) -> bool {
        prefix_free(self.codes.values())
    }

    pub fn to_decode_table(&self) -> DecodeTable {
        let mut table = DecodeTable::default();
        for (symbol, code) in self.iter() {
            table.insert(code.clone(), symbol);
        }
        table
    }
}

/// Code to symbol mapping used while unpacking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeTable {
    symbols: HashMap<Code, char>,
    max_code_len: usize,
}

impl DecodeTable {
    /// Insert a mapping, returning the symbol previously bound to `code`.
    pub fn insert(&mut self, code: Code, symbol: char) -> Option<char> {
        self.max_code_len = self.max_code_len.max(code.len());
        self.symbols.insert(code, symbol)
    }

    pub fn get(&self, code: &Code) -> Option<char> {
        self.symbols.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn max_code_len(&self) -> usize {
        self.max_code_len
    }

    pub fn is_prefix_free(&self) -> bool {
        prefix_free(self.symbols.keys())
    }
}

/// Assign each leaf the path to it: `0` for left, `1` for right.
///
/// A lone leaf at the root gets the one-bit code `0`.
pub fn generate_codes(root: &Node) -> CodeTable {
    let mut table = CodeTable::default();
    let mut path = Code::new();
    walk(root, &mut path, &mut table);
    tracing::debug!(
        symbols = table.len(),
        max_len = table.max_code_len(),
        "generated prefix codes"
    );
    table
}

fn walk(node: &Node, path: &mut Code, table: &mut CodeTable) {
    match node {
        Node::Leaf { symbol, .. } => {
            let code = if path.is_empty() {
                Code::from(vec![false])
            } else {
                path.clone()
            };
            tracing::trace!(symbol = ?symbol, code = %code, "assigned code");
            table.codes.insert(*symbol, code);
        }
        Node::Internal { left, right, .. } => {
            path.push(false);
            walk(left, path, table);
            path.pop();
            path.push(true);
            walk(right, path, table);
            path.pop();
        }
    }
}
