//! huffpack: per-file adaptive Huffman compression.
//!
//! The input is decoded as UTF-8 and every Unicode scalar value is one
//! symbol. Compression makes two passes over the input:
//! - count symbol frequencies and build a Huffman tree from them
//! - write the code table header, then the packed codes of every symbol
//!
//! Decompression reads the code table back from the header and greedily
//! matches payload bits against it. No tree is rebuilt.

pub mod bits;
pub mod codes;
pub mod config;
pub mod error;
pub mod frequency;
pub mod paths;
pub mod table;
pub mod tree;

use crate::config::CodecConfig;
use crate::error::CodecError;
use std::io::{self, BufReader, BufWriter, Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Figures gathered while compressing or decompressing one stream
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CompressionStats {
    pub symbol_count: u64,
    pub distinct_symbols: usize,
    /// Bytes read from the source stream.
    pub input_bytes: u64,
    /// Bytes written to the destination stream.
    pub output_bytes: u64,
    pub header_bytes: u64,
    /// Payload size in bits, padding excluded.
    pub payload_bits: u64,
    /// Shannon entropy of the text in bits per symbol, known only when
    /// compressing.
    pub entropy_bits: Option<f64>,
    /// Compressed size over uncompressed size.
    pub ratio: f64,
}

fn ratio(compressed: u64, uncompressed: u64) -> f64 {
    if uncompressed == 0 {
        1.0
    } else {
        compressed as f64 / uncompressed as f64
    }
}

/// The codec engine
#[derive(Debug, Clone, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Compress `input` into `output`.
    ///
    /// `input` is read twice and rewound in between, so it must be seekable.
    pub fn compress<R, W>(
        &self,
        mut input: R,
        mut output: W,
    ) -> Result<CompressionStats, CodecError>
    where
        R: Read + Seek,
        W: Write,
    {
        let input_bytes = input.seek(SeekFrom::End(0))?;
        if input_bytes > self.config.max_input_size {
            return Err(CodecError::InputTooLarge {
                size: input_bytes,
                limit: self.config.max_input_size,
            });
        }
        input.rewind()?;

        let buffer_size = self.config.io_buffer_size;
        let frequencies =
            frequency::count_symbols(BufReader::with_capacity(buffer_size, &mut input))?;
        let codes = tree::build_tree(&frequencies)
            .map(|root| codes::generate_codes(&root))
            .unwrap_or_default();
        debug_assert!(codes.is_prefix_free());

        input.rewind()?;
        let header_bytes = table::write_header(&codes, frequencies.total(), &mut output)?;
        let (_, symbols, payload_bits) = bits::encode_symbols(
            BufReader::with_capacity(buffer_size, &mut input),
            &codes,
            &mut output,
        )?;
        if symbols != frequencies.total() {
            return Err(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "input changed between passes: counted {} symbols, coded {}",
                    frequencies.total(),
                    symbols
                ),
            )
            .into());
        }

        let output_bytes = header_bytes + (payload_bits + 7) / 8;
        let stats = CompressionStats {
            symbol_count: symbols,
            distinct_symbols: frequencies.len(),
            input_bytes,
            output_bytes,
            header_bytes,
            payload_bits,
            entropy_bits: Some(frequencies.entropy()),
            ratio: ratio(output_bytes, input_bytes),
        };
        tracing::debug!(?stats, "compressed stream");
        Ok(stats)
    }

    /// Decompress `input` into `output`.
    pub fn decompress<R, W>(
        &self,
        input: R,
        mut output: W,
    ) -> Result<CompressionStats, CodecError>
    where
        R: Read,
        W: Write,
    {
        let mut input = BufReader::with_capacity(self.config.io_buffer_size, input);
        let header = table::read_header(&mut input)?;
        let (_, payload_bits, output_bytes) = bits::decode_symbols(
            &mut input,
            &header.decode_table,
            header.symbol_count,
            &mut output,
        )?;

        let input_bytes = header.len + (payload_bits + 7) / 8;
        let stats = CompressionStats {
            symbol_count: header.symbol_count,
            distinct_symbols: header.decode_table.len(),
            input_bytes,
            output_bytes,
            header_bytes: header.len,
            payload_bits,
            entropy_bits: None,
            ratio: ratio(input_bytes, output_bytes),
        };
        tracing::debug!(?stats, "decompressed stream");
        Ok(stats)
    }

    pub fn compress_bytes(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut output = Vec::new();
        self.compress(Cursor::new(data), &mut output)?;
        Ok(output)
    }

    pub fn decompress_bytes(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut output = Vec::new();
        self.decompress(data, &mut output)?;
        Ok(output)
    }

    /// Compress `path` into its derived sibling, returning the new path.
    pub fn compress_file(&self, path: &Path) -> Result<(PathBuf, CompressionStats), CodecError> {
        let target = paths::derive_compressed_path(path, &self.config)?;
        let stats = self.compress_file_to(path, &target)?;
        Ok((target, stats))
    }

    /// Decompress `path` into its derived sibling, returning the new path.
    pub fn decompress_file(&self, path: &Path) -> Result<(PathBuf, CompressionStats), CodecError> {
        let target = paths::derive_decompressed_path(path, &self.config)?;
        let stats = self.decompress_file_to(path, &target)?;
        Ok((target, stats))
    }

    pub fn compress_file_to(
        &self,
        source: &Path,
        target: &Path,
    ) -> Result<CompressionStats, CodecError> {
        paths::ensure_distinct(source, target)?;
        let input = paths::open_for_read(source)?;
        let output = paths::create_for_write(target)?;
        let result =
            self.compress(input, BufWriter::with_capacity(self.config.io_buffer_size, output));
        log_outcome("compressed", source, target, &result);
        result
    }

    pub fn decompress_file_to(
        &self,
        source: &Path,
        target: &Path,
    ) -> Result<CompressionStats, CodecError> {
        paths::ensure_distinct(source, target)?;
        let input = paths::open_for_read(source)?;
        let output = paths::create_for_write(target)?;
        let result =
            self.decompress(input, BufWriter::with_capacity(self.config.io_buffer_size, output));
        log_outcome("decompressed", source, target, &result);
        result
    }
}

fn log_outcome(
    action: &str,
    source: &Path,
    target: &Path,
    result: &Result<CompressionStats, CodecError>,
) {
    match result {
        Ok(stats) => tracing::info!(
            "{} {} -> {} ({} -> {} bytes, ratio {:.3})",
            action,
            source.display(),
            target.display(),
            stats.input_bytes,
            stats.output_bytes,
            stats.ratio
        ),
        Err(_) => tracing::warn!("partial output left at {}", target.display()),
    }
}
