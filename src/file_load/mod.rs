pub mod download;
pub mod source;

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::warn;

use crate::error::ImportError;

// Bytes read from the start of a file when sniffing its format
const SNIFF_LEN: usize = 8192;

// Enum that represents the file formats the loader understands
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FileType {
    Csv,
    Parquet,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Csv => write!(f, "CSV"),
            FileType::Parquet => write!(f, "Parquet"),
        }
    }
}

// Check a user supplied file before anything is read from it
pub fn validate_file(path: &Path) -> Result<(), ImportError> {
    if !path.exists() {
        return Err(ImportError::NotFound(path.to_path_buf()));
    }

    if !has_parquet_extension(path) {
        warn!("File {} doesn't have .parquet extension", path.display());
    }
    Ok(())
}

// Case sensitive, so `data.PARQUET` still draws the warning
fn has_parquet_extension(path: &Path) -> bool {
    path.extension().map(|ext| ext == "parquet").unwrap_or(false)
}

// Determine the file type based on the magic numbers, falling back to the content
pub fn determine_file_type(path: &Path) -> Result<FileType, ImportError> {
    let mut file = File::open(path)?;
    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut header)?;

    if let Some(file_type) = match_magic_numbers(&header) {
        return Ok(file_type);
    }

    // Only judge whole lines when the sniff buffer cut the file short
    let complete = if header.len() == SNIFF_LEN {
        match header.iter().rposition(|&b| b == b'\n') {
            Some(end) => &header[..end],
            None => &header[..],
        }
    } else {
        &header[..]
    };

    detect_content_based_type(complete).ok_or_else(|| ImportError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason: "expected a Parquet or CSV file".to_string(),
    })
}

fn match_magic_numbers(buffer: &[u8]) -> Option<FileType> {
    match buffer {
        // Parquet
        [0x50, 0x41, 0x52, 0x31, ..] => Some(FileType::Parquet),
        _ => None,
    }
}

fn detect_content_based_type(buffer: &[u8]) -> Option<FileType> {
    let text = std::str::from_utf8(buffer).ok()?;
    if is_valid_csv(text) {
        Some(FileType::Csv)
    } else {
        None
    }
}

fn is_valid_csv(content: &str) -> bool {
    let lines: Vec<&str> = content.lines().take(5).collect();

    if lines.len() < 2 {
        return false;
    }

    let first_line_fields = lines[0].split(',').count();
    // Require at least 2 columns and check for consistency
    first_line_fields >= 2
        && lines[1..].iter().all(|line| {
            let fields = line.split(',').count();
            fields == first_line_fields
                && line.chars().all(|c| c.is_ascii() || c.is_whitespace())
        })
}
