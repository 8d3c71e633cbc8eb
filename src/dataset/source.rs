//! Where the raw dataset comes from: a local file or an HTTP(S) URL,
//! optionally gzip-compressed.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;

use bytes::Bytes;
use flate2::read::GzDecoder;
use tracing::{debug, info};

use super::{DatasetTable, load_from_bytes};
use crate::error::DatasetError;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Url(String),
}

impl DatasetSource {
    /// Anything starting with `http://` or `https://` is fetched, everything
    /// else is read from disk.
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            DatasetSource::Url(source.to_string())
        } else {
            DatasetSource::File(PathBuf::from(source))
        }
    }

    fn looks_gzipped(&self) -> bool {
        let name = match self {
            DatasetSource::File(path) => path.to_string_lossy().into_owned(),
            DatasetSource::Url(url) => url.split(['?', '#']).next().unwrap_or("").to_string(),
        };
        name.ends_with(".gz")
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::File(path) => write!(f, "{}", path.display()),
            DatasetSource::Url(url) => f.write_str(url),
        }
    }
}

/// Reads the raw bytes of `source`, using `client` for URLs.
pub async fn read_source<C: HttpClient>(
    client: &C,
    source: &DatasetSource,
) -> Result<Bytes, DatasetError> {
    match source {
        DatasetSource::File(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|source| DatasetError::Source {
                path: path.clone(),
                source,
            }),
        DatasetSource::Url(url) => {
            fetch_bytes(client, url)
                .await
                .map_err(|e| DatasetError::Fetch {
                    url: url.clone(),
                    source: e.into(),
                })
        }
    }
}

/// Inflates gzip payloads, detected by file extension or magic bytes.
pub fn decompress(source: &DatasetSource, raw: Bytes) -> Result<Bytes, DatasetError> {
    if !source.looks_gzipped() && !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw);
    }

    let mut decoder = GzDecoder::new(raw.as_ref());
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(DatasetError::Decompress)?;
    debug!(compressed = raw.len(), inflated = out.len(), "Inflated gzip dataset");
    Ok(Bytes::from(out))
}

/// Reads, decompresses and parses `source` into a [`DatasetTable`].
///
/// CSV parsing runs on the blocking pool so a large dataset does not stall
/// the runtime.
#[tracing::instrument(skip(source), fields(source = %source))]
pub async fn load(source: &DatasetSource) -> Result<DatasetTable, DatasetError> {
    let client = BasicClient::new();
    load_with(&client, source).await
}

pub async fn load_with<C: HttpClient>(
    client: &C,
    source: &DatasetSource,
) -> Result<DatasetTable, DatasetError> {
    let raw = read_source(client, source).await?;
    info!(bytes = raw.len(), "Dataset source read");

    let source = source.clone();
    let handle = tokio::task::spawn_blocking(move || {
        let csv = decompress(&source, raw)?;
        load_from_bytes(&csv)
    });

    handle.await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RELEVANT_COLUMNS;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::env;
    use std::fs;
    use std::io::Write;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_csv() -> String {
        format!(
            "{}\n2021-09-29T10:00:00Z,A,,,1,1,0,,,,,,,measured,,,,,,\n",
            RELEVANT_COLUMNS.join(",")
        )
    }

    #[test]
    fn test_parse_source() {
        assert_eq!(
            DatasetSource::parse("https://example.org/data.csv"),
            DatasetSource::Url("https://example.org/data.csv".to_string())
        );
        assert_eq!(
            DatasetSource::parse("data/Gesamtdatensatz.csv"),
            DatasetSource::File(PathBuf::from("data/Gesamtdatensatz.csv"))
        );
    }

    #[test]
    fn test_gz_detection_ignores_query_string() {
        assert!(DatasetSource::parse("https://example.org/d.csv.gz?v=2").looks_gzipped());
        assert!(!DatasetSource::parse("https://example.org/d.csv?f=x.gz").looks_gzipped());
    }

    #[test]
    fn test_decompress_passthrough_for_plain_csv() {
        let source = DatasetSource::parse("plain.csv");
        let raw = Bytes::from(sample_csv());
        let out = decompress(&source, raw.clone()).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn test_decompress_by_magic_bytes() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(sample_csv().as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let source = DatasetSource::parse("no_extension");
        let out = decompress(&source, Bytes::from(compressed)).unwrap();
        assert_eq!(out, Bytes::from(sample_csv()));
    }

    #[test]
    fn test_corrupt_gzip_is_error() {
        let source = DatasetSource::parse("broken.csv.gz");
        let err = decompress(&source, Bytes::from_static(b"not gzip")).unwrap_err();
        assert!(matches!(err, DatasetError::Decompress(_)));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_source_error() {
        let source = DatasetSource::File(temp_path("ped_counts_does_not_exist.csv"));
        let err = load(&source).await.unwrap_err();
        assert!(matches!(err, DatasetError::Source { .. }));
    }

    #[tokio::test]
    async fn test_load_gzipped_file() {
        let path = temp_path("ped_counts_test_load.csv.gz");
        let _ = fs::remove_file(&path);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(sample_csv().as_bytes()).unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let table = load(&DatasetSource::File(path.clone())).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].location_name, "A");

        fs::remove_file(&path).unwrap();
    }
}
