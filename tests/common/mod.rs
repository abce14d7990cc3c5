#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use parquet_pg_import::config::{ConnectionParams, Config, IfExists, Source};

pub const TRIPS_CSV: &str = "\
VendorID,TPEP Pickup Datetime,tpep_dropoff_datetime,Passenger Count,Trip Distance
1,2025-01-01 00:18:38,2025-01-01 00:26:59,1,1.60
1,2025-01-01 00:32:40,2025-01-01 00:35:13,1,0.50
2,2025-01-01 00:44:04,2025-01-01 00:46:01,2,0.60
";

// Serve a single HTTP response on a random local port and return its base URL
pub fn serve_once(status: &str, body: Vec<u8>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();

    let handle = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();

        let mut buf = Vec::with_capacity(4096);
        loop {
            let mut tmp = [0_u8; 1024];
            let n = socket.read(&mut tmp).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);
            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }

        let head = format!(
            concat!(
                "HTTP/1.1 {}\r\n",
                "Content-Type: application/octet-stream\r\n",
                "Content-Length: {}\r\n",
                "Connection: close\r\n\r\n"
            ),
            status,
            body.len()
        );
        socket.write_all(head.as_bytes()).unwrap();
        socket.write_all(&body).unwrap();
        socket.flush().unwrap();
    });

    (format!("http://{}", addr), handle)
}

pub fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn config(source: Source, download_dir: &Path) -> Config {
    Config {
        connection: ConnectionParams {
            user: "root".to_string(),
            password: "root".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            database: "ny_taxi".to_string(),
        },
        table: "trips".to_string(),
        source,
        download_dir: download_dir.to_path_buf(),
        chunksize: NonZeroUsize::new(2).unwrap(),
        if_exists: IfExists::Replace,
        dry_run: false,
        verbose: false,
    }
}

pub fn count_rows(db_path: &Path, table: &str) -> i64 {
    let conn = duckdb::Connection::open(db_path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| row.get(0))
        .unwrap()
}
