//! Model persistence.
//!
//! A [`Model`] is the serializable shadow of a [`Network`](crate::Network):
//! the learning rate plus the ordered weight matrices, without per-run
//! transient state.
//!
//! Three interchangeable on-disk forms, selected by an explicit [`Format`]
//! tag (mapped from the file extension at the I/O boundary only):
//!
//! - `rwm` — raw: fixed-width native-endian fields, no header, no checksum.
//! - `ftm` — text: the same fields whitespace-separated. Floats are printed
//!   with Rust's shortest-round-trip formatting, so the text form is exact.
//! - `json` — pretty-printed JSON (feature: `serde`).
//!
//! Every load path validates the reconstructed record before handing it out.

use crate::{Error, Matrix, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Learning rate plus weight matrices; the unit exchanged with storage.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub learning_rate: f64,
    pub weights: Vec<Matrix>,
}

/// Persisted representation of a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Fixed-width native-endian binary (`rwm`).
    Raw,
    /// Whitespace-separated decimal text (`ftm`).
    Text,
    /// Pretty-printed JSON (`json`).
    #[cfg(feature = "serde")]
    Json,
}

impl Format {
    /// Maps a path extension to a format tag.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "rwm" => Ok(Format::Raw),
            "ftm" => Ok(Format::Text),
            #[cfg(feature = "serde")]
            "json" => Ok(Format::Json),
            _ => Err(Error::UnsupportedFormat(format!(
                "no model format for {}",
                path.display()
            ))),
        }
    }
}

impl Model {
    /// Checks that the record can back a usable network: at least one weight
    /// matrix, consistent storage, and shapes that chain layer to layer.
    pub fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            return Err(Error::InvalidTopology(
                "model must have at least one weight matrix".to_owned(),
            ));
        }

        for (i, weight) in self.weights.iter().enumerate() {
            if weight.rows() == 0 || weight.cols() == 0 {
                return Err(Error::InvalidTopology(format!(
                    "weight matrix {i} has zero dimension {}x{}",
                    weight.rows(),
                    weight.cols()
                )));
            }
            if weight.as_slice().len() != weight.rows() * weight.cols() {
                return Err(Error::InvalidTopology(format!(
                    "weight matrix {i} storage length {} does not match shape {}x{}",
                    weight.as_slice().len(),
                    weight.rows(),
                    weight.cols()
                )));
            }
            if i > 0 {
                let prev_rows = self.weights[i - 1].rows();
                if weight.cols() != prev_rows {
                    return Err(Error::InvalidTopology(format!(
                        "weight matrix {i} cols {} does not match previous rows {prev_rows}",
                        weight.cols()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Saves the record to `path`, dispatching on the path's extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.save_as(Format::from_path(path)?, path)
    }

    /// Saves the record to `path` in an explicitly chosen format.
    pub fn save_as<P: AsRef<Path>>(&self, format: Format, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| Error::Io(format!("failed to create {}: {e}", path.display())))?;
        let mut writer = BufWriter::new(file);

        match format {
            Format::Raw => self.write_raw(&mut writer)?,
            Format::Text => self.write_text(&mut writer)?,
            #[cfg(feature = "serde")]
            Format::Json => self.write_json(&mut writer)?,
        }

        writer
            .flush()
            .map_err(|e| Error::Io(format!("failed to write {}: {e}", path.display())))
    }

    /// Loads a record from `path`, dispatching on the path's extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::load_as(Format::from_path(path)?, path)
    }

    /// Loads a record from `path` in an explicitly chosen format.
    pub fn load_as<P: AsRef<Path>>(format: Format, path: P) -> Result<Self> {
        let path = path.as_ref();

        let model = match format {
            Format::Raw => {
                let file = File::open(path)
                    .map_err(|e| Error::Io(format!("failed to open {}: {e}", path.display())))?;
                Self::read_raw(&mut BufReader::new(file))?
            }
            Format::Text => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
                Self::parse_text(&text)?
            }
            #[cfg(feature = "serde")]
            Format::Json => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
                Self::from_json_str(&text)?
            }
        };

        model.validate()?;
        Ok(model)
    }

    /// Field order: learning rate (f64), weight count (u32), then per matrix
    /// rows (u32), cols (u32) and the row-major f64 elements. Native endian.
    fn write_raw<W: Write>(&self, writer: &mut W) -> Result<()> {
        let io_err = |e: std::io::Error| Error::Io(format!("write failed: {e}"));

        writer
            .write_all(&self.learning_rate.to_ne_bytes())
            .map_err(io_err)?;
        writer
            .write_all(&(self.weights.len() as u32).to_ne_bytes())
            .map_err(io_err)?;

        for weight in &self.weights {
            writer
                .write_all(&(weight.rows() as u32).to_ne_bytes())
                .map_err(io_err)?;
            writer
                .write_all(&(weight.cols() as u32).to_ne_bytes())
                .map_err(io_err)?;
            for &v in weight.as_slice() {
                writer.write_all(&v.to_ne_bytes()).map_err(io_err)?;
            }
        }
        Ok(())
    }

    fn read_raw<R: Read>(reader: &mut R) -> Result<Self> {
        let learning_rate = read_f64(reader)?;
        let count = read_u32(reader)? as usize;

        let mut weights = Vec::with_capacity(count);
        for i in 0..count {
            let rows = read_u32(reader)? as usize;
            let cols = read_u32(reader)? as usize;
            let len = rows.checked_mul(cols).ok_or_else(|| {
                Error::InvalidTopology(format!("weight matrix {i} shape {rows}x{cols} overflows"))
            })?;
            if len == 0 {
                return Err(Error::InvalidTopology(format!(
                    "weight matrix {i} has zero dimension {rows}x{cols}"
                )));
            }

            let mut data = Vec::with_capacity(len);
            for _ in 0..len {
                data.push(read_f64(reader)?);
            }
            weights.push(Matrix::from_flat(rows, cols, data)?);
        }

        Ok(Self {
            learning_rate,
            weights,
        })
    }

    /// Same field order as the raw form; one matrix row per line for
    /// readability. Any whitespace separator loads back correctly.
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<()> {
        let io_err = |e: std::io::Error| Error::Io(format!("write failed: {e}"));

        writeln!(writer, "{} {}", self.learning_rate, self.weights.len()).map_err(io_err)?;
        for weight in &self.weights {
            writeln!(writer, "{} {}", weight.rows(), weight.cols()).map_err(io_err)?;
            for r in 0..weight.rows() {
                let row = &weight.as_slice()[r * weight.cols()..(r + 1) * weight.cols()];
                for v in row {
                    write!(writer, "{v} ").map_err(io_err)?;
                }
                writeln!(writer).map_err(io_err)?;
            }
        }
        Ok(())
    }

    fn parse_text(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();

        let learning_rate = next_f64(&mut tokens, "learning rate")?;
        let count = next_usize(&mut tokens, "weight count")?;

        let mut weights = Vec::with_capacity(count);
        for i in 0..count {
            let rows = next_usize(&mut tokens, "rows")?;
            let cols = next_usize(&mut tokens, "cols")?;
            let len = rows.checked_mul(cols).ok_or_else(|| {
                Error::InvalidTopology(format!("weight matrix {i} shape {rows}x{cols} overflows"))
            })?;
            if len == 0 {
                return Err(Error::InvalidTopology(format!(
                    "weight matrix {i} has zero dimension {rows}x{cols}"
                )));
            }

            let mut data = Vec::with_capacity(len);
            for _ in 0..len {
                data.push(next_f64(&mut tokens, "weight element")?);
            }
            weights.push(Matrix::from_flat(rows, cols, data)?);
        }

        Ok(Self {
            learning_rate,
            weights,
        })
    }
}

#[cfg(feature = "serde")]
impl Model {
    /// Serializes the record to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Io(format!("failed to serialize model: {e}")))
    }

    /// Parses a record from a JSON string and validates it.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let model: Model = serde_json::from_str(s)
            .map_err(|e| Error::Io(format!("failed to parse model json: {e}")))?;
        model.validate()?;
        Ok(model)
    }

    fn write_json<W: Write>(&self, writer: &mut W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| Error::Io(format!("failed to serialize model: {e}")))
    }
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    reader
        .read_exact(&mut buf)
        .map_err(|e| Error::Io(format!("read failed: {e}")))?;
    Ok(f64::from_ne_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| Error::Io(format!("read failed: {e}")))?;
    Ok(u32::from_ne_bytes(buf))
}

fn next_f64<'a, I: Iterator<Item = &'a str>>(tokens: &mut I, what: &str) -> Result<f64> {
    let tok = tokens
        .next()
        .ok_or_else(|| Error::Io(format!("model file truncated while reading {what}")))?;
    tok.parse()
        .map_err(|_| Error::Io(format!("invalid {what} token {tok:?}")))
}

fn next_usize<'a, I: Iterator<Item = &'a str>>(tokens: &mut I, what: &str) -> Result<usize> {
    let tok = tokens
        .next()
        .ok_or_else(|| Error::Io(format!("model file truncated while reading {what}")))?;
    tok.parse()
        .map_err(|_| Error::Io(format!("invalid {what} token {tok:?}")))
}
