use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use reqwest::blocking::Client;
use reqwest::Url;

use crate::error::ImportError;

pub const DEFAULT_FILENAME: &str = "downloaded_data.parquet";
const CHUNK_SIZE: usize = 8192;

// Last segment of the URL path, or the default name when the path has none
pub fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Stream `url` into `dir`, creating the directory if needed, and return the
/// path of the written file. With `verbose` set a percentage indicator is
/// printed whenever the server declared a content length.
pub fn download_file(url: &str, dir: &Path, verbose: bool) -> Result<PathBuf, ImportError> {
    let parsed = Url::parse(url).map_err(|e| ImportError::download(url, e))?;
    let file_path = dir.join(filename_from_url(&parsed));

    fs::create_dir_all(dir)?;

    debug!("Downloading from: {}", url);
    debug!("Saving to: {}", file_path.display());

    let mut response = Client::new()
        .get(parsed)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(|e| ImportError::download(url, e))?;

    let total_size = response.content_length().unwrap_or(0);
    let mut downloaded_size: u64 = 0;
    let mut out = File::create(&file_path)?;
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let n = response
            .read(&mut buffer)
            .map_err(|e| ImportError::download(url, e))?;
        if n == 0 {
            break;
        }
        out.write_all(&buffer[..n])?;
        downloaded_size += n as u64;

        if verbose && total_size > 0 {
            let progress = downloaded_size as f64 / total_size as f64 * 100.0;
            print!("\rDownload progress: {:.1}%", progress);
            io::stdout().flush()?;
        }
    }
    out.flush()?;

    if verbose && total_size > 0 {
        println!();
    }
    debug!(
        "Download completed: {} ({} bytes)",
        file_path.display(),
        downloaded_size
    );

    Ok(file_path)
}
