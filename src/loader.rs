use crate::errors::LoadError;
use crate::memory::{Rom, Word, ROM_SIZE};
use std::fs::File;
use std::io;
use std::path::Path;

/// The two program image encodings we understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// raw little-endian 16 bit words
    Binary,
    /// one `0`/`1` string of 16 characters per line, MSB first
    Text,
}

impl Format {
    /// pick the format from the file extension
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "bin" => Some(Format::Binary),
            "hack" => Some(Format::Text),
            _ => None,
        }
    }
}

/// Read a program image from disk into a fresh instruction store. Nothing
/// that is already loaded is touched; the caller swaps the result in.
pub fn load_file(path: impl AsRef<Path>) -> Result<Rom, LoadError> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let rom = File::open(path)
        .and_then(|mut f| load(&mut f, format))
        .map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    log::debug!(
        "loaded {} instructions from {}",
        rom.program_len(),
        path.display()
    );
    Ok(rom)
}

/// read unknown len of data and decode it
pub fn load(reader: &mut impl io::Read, format: Format) -> Result<Rom, io::Error> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(match format {
        Format::Binary => parse_binary(&buf),
        Format::Text => parse_text(&buf),
    })
}

/// Little-endian words. Anything past the store's capacity is ignored, as is
/// a dangling odd byte.
pub fn parse_binary(bytes: &[u8]) -> Rom {
    if bytes.len() > ROM_SIZE * 2 {
        log::warn!(
            "program image has {} words, ignoring everything past {ROM_SIZE}",
            bytes.len() / 2
        );
    }
    let words: Vec<Word> = bytes
        .chunks_exact(2)
        .take(ROM_SIZE)
        .map(|pair| Word::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Rom::from_words(&words)
}

/// One instruction per line. Lines that aren't exactly 16 binary digits are
/// skipped; a trailing `\r` is tolerated.
pub fn parse_text(text: &[u8]) -> Rom {
    let mut words = Vec::new();
    for (lineno, line) in text.split(|&b| b == b'\n').enumerate() {
        if words.len() == ROM_SIZE {
            log::warn!("instruction store full, ignoring input from line {}", lineno + 1);
            break;
        }
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        match parse_line(line) {
            Some(word) => words.push(word),
            None if line.is_empty() => {}
            None => log::warn!("skipping malformed line {}", lineno + 1),
        }
    }
    Rom::from_words(&words)
}

fn parse_line(line: &[u8]) -> Option<Word> {
    if line.len() != 16 {
        return None;
    }
    line.iter().try_fold(0u16, |acc, &b| match b {
        b'0' => Some(acc << 1),
        b'1' => Some(acc << 1 | 1),
        _ => None,
    })
    .map(|bits| bits as Word)
}
