//! Incremental record spool with chronological finalization.
//!
//! Pages arrive newest first, but dumps are written oldest first. Instead of
//! holding every record in memory until the walk ends, [`RecordSpool`] appends
//! each record to two `.partial` files as soon as it is built and keeps only
//! an index of byte spans. [`RecordSpool::finish`] then copies the spans into
//! the final files in reverse order and removes the spool.
//!
//! The channel archiver flushes the spool after every page, so if the process
//! dies mid-walk the `.partial` files stay on disk with every record of the
//! completed pages (newest first), in step with each other.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::record::{ArchiveRecord, CSV_HEADER, render_csv_line};

/// Suffix appended to the final file names while spooling.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Final output locations of one channel dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpPaths {
    pub text: PathBuf,
    pub csv: PathBuf,
}

impl DumpPaths {
    /// `{dir}/{stem}_DUMP.txt` and `{dir}/{stem}_DUMP.csv`.
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            text: dir.join(format!("{}_DUMP.txt", stem)),
            csv: dir.join(format!("{}_DUMP.csv", stem)),
        }
    }

    /// Paths of the spool files backing these outputs.
    pub fn partial(&self) -> Self {
        Self {
            text: with_suffix(&self.text, PARTIAL_SUFFIX),
            csv: with_suffix(&self.csv, PARTIAL_SUFFIX),
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Header block of a channel text dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpHeader {
    pub channel_name: String,
    pub channel_id: String,
    pub topic: Option<String>,
}

impl DumpHeader {
    /// `#name - id`, the topic when set, then a blank line.
    pub fn render(&self) -> String {
        let mut header = format!("#{} - {}\n", self.channel_name, self.channel_id);
        if let Some(topic) = self.topic.as_deref().filter(|t| !t.is_empty()) {
            header.push_str(topic);
            header.push('\n');
        }
        header.push('\n');
        header
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    offset: u64,
    len: usize,
}

#[derive(Debug, Clone, Copy)]
struct SpoolEntry {
    text: Span,
    csv: Span,
}

struct SpoolFile {
    writer: BufWriter<File>,
    path: PathBuf,
    len: u64,
}

impl SpoolFile {
    fn create(path: PathBuf) -> Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(&path)?),
            path,
            len: 0,
        })
    }

    fn append(&mut self, bytes: &[u8]) -> Result<Span> {
        self.writer.write_all(bytes)?;
        let span = Span {
            offset: self.len,
            len: bytes.len(),
        };
        self.len += bytes.len() as u64;
        Ok(span)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn into_reader(mut self) -> Result<(File, PathBuf)> {
        self.writer.flush()?;
        drop(self.writer);
        Ok((File::open(&self.path)?, self.path))
    }
}

/// Append-as-you-go store for the records of one channel.
pub struct RecordSpool {
    text: SpoolFile,
    csv: SpoolFile,
    entries: Vec<SpoolEntry>,
}

impl RecordSpool {
    /// Creates (or truncates) the spool files for `paths`.
    pub fn create(paths: &DumpPaths) -> Result<Self> {
        let partial = paths.partial();
        Ok(Self {
            text: SpoolFile::create(partial.text)?,
            csv: SpoolFile::create(partial.csv)?,
            entries: Vec::new(),
        })
    }

    /// Appends one record to both spool files.
    pub fn append(&mut self, record: &ArchiveRecord) -> Result<()> {
        let csv_line = record.csv_line()?;
        let text = self.text.append(record.text.as_bytes())?;
        let csv = self.csv.append(&csv_line)?;
        self.entries.push(SpoolEntry { text, csv });
        Ok(())
    }

    /// Pushes every appended record to disk, keeping both spool files at the
    /// same record count.
    pub fn flush(&mut self) -> Result<()> {
        self.text.flush()?;
        self.csv.flush()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the final dumps in chronological order and removes the spool.
    ///
    /// Returns the number of records written to each file.
    pub fn finish(self, header: &DumpHeader, paths: &DumpPaths) -> Result<usize> {
        let (mut text_in, text_spool) = self.text.into_reader()?;
        let (mut csv_in, csv_spool) = self.csv.into_reader()?;

        let mut text_out = BufWriter::new(File::create(&paths.text)?);
        let mut csv_out = BufWriter::new(File::create(&paths.csv)?);

        text_out.write_all(header.render().as_bytes())?;
        csv_out.write_all(&render_csv_line(CSV_HEADER)?)?;

        let mut buf = Vec::new();
        for entry in self.entries.iter().rev() {
            copy_span(&mut text_in, entry.text, &mut buf, &mut text_out)?;
            copy_span(&mut csv_in, entry.csv, &mut buf, &mut csv_out)?;
        }

        text_out.flush()?;
        csv_out.flush()?;
        drop((text_in, csv_in));

        fs::remove_file(text_spool)?;
        fs::remove_file(csv_spool)?;
        Ok(self.entries.len())
    }
}

fn copy_span(
    input: &mut File,
    span: Span,
    buf: &mut Vec<u8>,
    output: &mut impl Write,
) -> Result<()> {
    buf.resize(span.len, 0);
    input.seek(SeekFrom::Start(span.offset))?;
    input.read_exact(buf)?;
    output.write_all(buf)?;
    Ok(())
}
