//! PCD (Point Cloud Data v0.7) files.
//!
//! Files are memory mapped and decoded into a [`RawFrame`], so file-backed
//! clouds go through the same ingestion path as frames from a sensor. ASCII
//! and binary bodies are supported; `binary_compressed` is rejected.

use crate::{Error, Result};
use memmap2::Mmap;
use scenegrasp_core::{FieldType, FrameHeader, Point, PointField, PointSet, RawFrame};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without reading the whole file
/// up front.
pub struct MappedFileReader {
    mmap: Option<Mmap>,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // Zero-length files cannot be mapped on every platform.
        let mmap = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
            // This is the standard safety contract for memory mapping.
            #[allow(unsafe_code)]
            let mmap = unsafe { Mmap::map(&file)? };
            Some(mmap)
        };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Body encoding of a PCD file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFormat {
    Ascii,
    #[default]
    Binary,
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Ascii => write!(f, "ascii"),
            DataFormat::Binary => write!(f, "binary"),
        }
    }
}

/// Parsed PCD header.
#[derive(Debug, Clone, PartialEq)]
pub struct PcdHeader {
    pub version: String,
    pub fields: Vec<PointField>,
    pub width: u32,
    pub height: u32,
    pub points: usize,
    pub format: DataFormat,
    /// Bytes per record in the binary layout.
    pub point_step: u32,
}

impl PcdHeader {
    #[must_use]
    pub fn has_color(&self) -> bool {
        self.fields.iter().any(|f| f.name == "rgb" || f.name == "rgba")
    }
}

fn field_type(kind: &str, size: usize) -> Option<FieldType> {
    match (kind, size) {
        ("I", 1) => Some(FieldType::Int8),
        ("U", 1) => Some(FieldType::Uint8),
        ("I", 2) => Some(FieldType::Int16),
        ("U", 2) => Some(FieldType::Uint16),
        ("I", 4) => Some(FieldType::Int32),
        ("U", 4) => Some(FieldType::Uint32),
        ("F", 4) => Some(FieldType::Float32),
        ("F", 8) => Some(FieldType::Float64),
        _ => None,
    }
}

fn type_letter(datatype: FieldType) -> &'static str {
    match datatype {
        FieldType::Int8 | FieldType::Int16 | FieldType::Int32 => "I",
        FieldType::Uint8 | FieldType::Uint16 | FieldType::Uint32 => "U",
        FieldType::Float32 | FieldType::Float64 => "F",
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::format(format!("invalid {key} value '{value}'")))
}

/// Splits `bytes` into the parsed header and the offset where the body starts.
fn parse_header(bytes: &[u8]) -> Result<(PcdHeader, usize)> {
    let mut version = String::from("0.7");
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut kinds: Vec<String> = Vec::new();
    let mut counts: Vec<u32> = Vec::new();
    let mut width: Option<u32> = None;
    let mut height: u32 = 1;
    let mut points: Option<usize> = None;

    let mut cursor = 0;
    while cursor < bytes.len() {
        let line_end = bytes[cursor..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| cursor + p);
        let line = std::str::from_utf8(&bytes[cursor..line_end])
            .map_err(|_| Error::format("header is not valid UTF-8"))?
            .trim();
        cursor = (line_end + 1).min(bytes.len());

        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default().to_ascii_uppercase();
        let values: Vec<&str> = tokens.collect();

        match key.as_str() {
            "VERSION" => version = values.first().copied().unwrap_or("0.7").to_string(),
            "FIELDS" => names = values.iter().map(|s| (*s).to_string()).collect(),
            "SIZE" => {
                sizes = values
                    .iter()
                    .map(|v| parse_number("SIZE", v))
                    .collect::<Result<_>>()?;
            }
            "TYPE" => kinds = values.iter().map(|s| s.to_ascii_uppercase()).collect(),
            "COUNT" => {
                counts = values
                    .iter()
                    .map(|v| parse_number("COUNT", v))
                    .collect::<Result<_>>()?;
            }
            "WIDTH" => width = Some(parse_number("WIDTH", values.first().unwrap_or(&""))?),
            "HEIGHT" => height = parse_number("HEIGHT", values.first().unwrap_or(&""))?,
            "POINTS" => points = Some(parse_number("POINTS", values.first().unwrap_or(&""))?),
            "VIEWPOINT" => {}
            "DATA" => {
                let format = match values.first().map(|s| s.to_ascii_lowercase()).as_deref() {
                    Some("ascii") => DataFormat::Ascii,
                    Some("binary") => DataFormat::Binary,
                    Some(other) => {
                        return Err(Error::format(format!("unsupported DATA encoding '{other}'")))
                    }
                    None => return Err(Error::format("DATA line without encoding")),
                };
                let header = build_header(
                    version, &names, &sizes, &kinds, &counts, width, height, points, format,
                )?;
                return Ok((header, cursor));
            }
            other => return Err(Error::format(format!("unknown header key '{other}'"))),
        }
    }
    Err(Error::format("missing DATA line"))
}

#[allow(clippy::too_many_arguments)]
fn build_header(
    version: String,
    names: &[String],
    sizes: &[usize],
    kinds: &[String],
    counts: &[u32],
    width: Option<u32>,
    height: u32,
    points: Option<usize>,
    format: DataFormat,
) -> Result<PcdHeader> {
    if names.is_empty() {
        return Err(Error::format("missing FIELDS"));
    }
    if sizes.len() != names.len() || kinds.len() != names.len() {
        return Err(Error::format("FIELDS, SIZE and TYPE lengths differ"));
    }
    if !counts.is_empty() && counts.len() != names.len() {
        return Err(Error::format("COUNT length differs from FIELDS"));
    }

    let mut fields = Vec::with_capacity(names.len());
    let mut offset: u32 = 0;
    for (i, name) in names.iter().enumerate() {
        let datatype = field_type(&kinds[i], sizes[i]).ok_or_else(|| {
            Error::format(format!(
                "unsupported type {}{} for field '{name}'",
                kinds[i], sizes[i]
            ))
        })?;
        let count = counts.get(i).copied().unwrap_or(1).max(1);
        let field = PointField {
            name: name.clone(),
            offset,
            datatype,
            count,
        };
        offset = u32::try_from(field.end()).map_err(|_| Error::format("record too large"))?;
        fields.push(field);
    }

    let width = width.ok_or_else(|| Error::format("missing WIDTH"))?;
    let declared = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| Error::format(format!("WIDTH {width} x HEIGHT {height} overflows")))?;
    let points = points.unwrap_or(declared);
    if points != declared {
        return Err(Error::format(format!(
            "POINTS {points} does not match WIDTH x HEIGHT {declared}"
        )));
    }
    body_size(points, offset)?;

    Ok(PcdHeader {
        version,
        fields,
        width,
        height,
        points,
        format,
        point_step: offset,
    })
}

/// Bytes occupied by `points` records of `point_step` bytes each.
fn body_size(points: usize, point_step: u32) -> Result<usize> {
    points.checked_mul(point_step as usize).ok_or_else(|| {
        Error::format(format!(
            "{points} points of {point_step} bytes exceed the addressable size"
        ))
    })
}

/// Encodes one ASCII token as `datatype` in little-endian order.
fn encode_token(token: &str, datatype: FieldType, out: &mut Vec<u8>) -> Result<()> {
    let bad = || Error::format(format!("invalid {datatype:?} value '{token}'"));
    match datatype {
        FieldType::Int8 => out.extend_from_slice(&token.parse::<i8>().map_err(|_| bad())?.to_le_bytes()),
        FieldType::Uint8 => out.extend_from_slice(&token.parse::<u8>().map_err(|_| bad())?.to_le_bytes()),
        FieldType::Int16 => out.extend_from_slice(&token.parse::<i16>().map_err(|_| bad())?.to_le_bytes()),
        FieldType::Uint16 => out.extend_from_slice(&token.parse::<u16>().map_err(|_| bad())?.to_le_bytes()),
        FieldType::Int32 => out.extend_from_slice(&token.parse::<i32>().map_err(|_| bad())?.to_le_bytes()),
        FieldType::Uint32 => out.extend_from_slice(&token.parse::<u32>().map_err(|_| bad())?.to_le_bytes()),
        FieldType::Float32 => out.extend_from_slice(&token.parse::<f32>().map_err(|_| bad())?.to_le_bytes()),
        FieldType::Float64 => out.extend_from_slice(&token.parse::<f64>().map_err(|_| bad())?.to_le_bytes()),
    }
    Ok(())
}

fn decode_ascii(header: &PcdHeader, body: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(body).map_err(|_| Error::format("ASCII body is not UTF-8"))?;
    // An ASCII record is never shorter than its binary encoding.
    let capacity = body_size(header.points, header.point_step)?.min(body.len());
    let mut data = Vec::with_capacity(capacity);
    let mut records = 0usize;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if records == header.points {
            break;
        }
        let mut tokens = line.split_whitespace();
        for field in &header.fields {
            for _ in 0..field.count {
                let token = tokens.next().ok_or_else(|| {
                    Error::format(format!("record {records} is missing field '{}'", field.name))
                })?;
                encode_token(token, field.datatype, &mut data)?;
            }
        }
        records += 1;
    }

    if records != header.points {
        return Err(Error::format(format!(
            "expected {} records, found {records}",
            header.points
        )));
    }
    Ok(data)
}

/// Reader for PCD files.
pub struct PcdReader {
    reader: MappedFileReader,
    header: PcdHeader,
    body_offset: usize,
}

impl PcdReader {
    /// Opens a PCD file and parses its header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or the header is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        let (header, body_offset) = parse_header(reader.as_bytes())?;
        Ok(Self {
            reader,
            header,
            body_offset,
        })
    }

    #[must_use]
    pub fn header(&self) -> &PcdHeader {
        &self.header
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.reader.path()
    }

    /// Decodes the body into a little-endian raw frame.
    ///
    /// # Errors
    /// Returns an error if the body is shorter than the header declares or an
    /// ASCII value cannot be parsed.
    pub fn read_frame(&self, header: FrameHeader) -> Result<RawFrame> {
        let body = &self.reader.as_bytes()[self.body_offset..];
        let data = match self.header.format {
            DataFormat::Binary => {
                let expected = body_size(self.header.points, self.header.point_step)?;
                if body.len() < expected {
                    return Err(Error::format(format!(
                        "binary body has {} bytes, expected {expected}",
                        body.len()
                    )));
                }
                body[..expected].to_vec()
            }
            DataFormat::Ascii => decode_ascii(&self.header, body)?,
        };

        Ok(RawFrame {
            header,
            width: self.header.width,
            height: self.header.height,
            fields: self.header.fields.clone(),
            is_bigendian: false,
            point_step: self.header.point_step,
            row_step: self.header.point_step.saturating_mul(self.header.width),
            data,
            is_dense: false,
        })
    }
}

/// Reads a PCD file straight into a point set.
///
/// # Errors
/// Returns an error if the file cannot be read or its layout lacks `x y z`.
pub fn read_pcd<P: AsRef<Path>>(path: P) -> Result<PointSet> {
    let reader = PcdReader::open(path)?;
    let frame = reader.read_frame(FrameHeader::default())?;
    Ok(crate::ingest::ingest_frame(&frame)?.points)
}

/// Writer for PCD files.
///
/// Writes `x y z` as float32 and, when any point carries a color, a packed
/// `rgb` channel as uint32.
pub struct PcdWriter {
    writer: BufWriter<File>,
    format: DataFormat,
}

impl PcdWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            format: DataFormat::Binary,
        })
    }

    #[must_use]
    pub fn with_format(mut self, format: DataFormat) -> Self {
        self.format = format;
        self
    }

    /// Writes `points` as a complete unorganized cloud and flushes.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_points(&mut self, points: &PointSet) -> Result<()> {
        let color = points.iter().any(|p| p.color.is_some());
        let n = points.len();

        writeln!(self.writer, "# .PCD v0.7 - Point Cloud Data file format")?;
        writeln!(self.writer, "VERSION 0.7")?;
        if color {
            writeln!(self.writer, "FIELDS x y z rgb")?;
            writeln!(self.writer, "SIZE 4 4 4 4")?;
            writeln!(self.writer, "TYPE F F F U")?;
            writeln!(self.writer, "COUNT 1 1 1 1")?;
        } else {
            writeln!(self.writer, "FIELDS x y z")?;
            writeln!(self.writer, "SIZE 4 4 4")?;
            writeln!(self.writer, "TYPE F F F")?;
            writeln!(self.writer, "COUNT 1 1 1")?;
        }
        writeln!(self.writer, "WIDTH {n}")?;
        writeln!(self.writer, "HEIGHT 1")?;
        writeln!(self.writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
        writeln!(self.writer, "POINTS {n}")?;
        writeln!(self.writer, "DATA {}", self.format)?;

        for p in points {
            let rgb = p.color.map_or(0, |c| c.packed());
            match self.format {
                DataFormat::Ascii => {
                    if color {
                        writeln!(self.writer, "{} {} {} {rgb}", p.x, p.y, p.z)?;
                    } else {
                        writeln!(self.writer, "{} {} {}", p.x, p.y, p.z)?;
                    }
                }
                DataFormat::Binary => {
                    self.writer.write_all(&p.x.to_le_bytes())?;
                    self.writer.write_all(&p.y.to_le_bytes())?;
                    self.writer.write_all(&p.z.to_le_bytes())?;
                    if color {
                        self.writer.write_all(&rgb.to_le_bytes())?;
                    }
                }
            }
        }

        self.writer.flush()?;
        Ok(())
    }
}

/// Writes `points` to `path` in the given format.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_pcd<P: AsRef<Path>>(path: P, points: &PointSet, format: DataFormat) -> Result<()> {
    PcdWriter::create(path)?.with_format(format).write_points(points)
}

/// Short description of a PCD header, one `name:type` per field.
#[must_use]
pub fn describe_fields(header: &PcdHeader) -> String {
    header
        .fields
        .iter()
        .map(|f| {
            let size = f.datatype.size();
            if f.count > 1 {
                format!("{}:{}{}x{}", f.name, type_letter(f.datatype), size, f.count)
            } else {
                format!("{}:{}{}", f.name, type_letter(f.datatype), size)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
