//! Raw frame decoding.
//!
//! Converts a [`RawFrame`] into a dense [`PointSet`], validating the record
//! layout first and dropping samples with non-finite coordinates.

use scenegrasp_core::{FieldType, IngestError, Point, PointField, PointSet, RawFrame, Rgb};

/// Counters reported for one ingested frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records declared by the frame dimensions.
    pub declared: usize,
    /// Points kept.
    pub kept: usize,
    /// Records dropped for a non-finite coordinate.
    pub invalid: usize,
}

/// A decoded frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestedCloud {
    pub points: PointSet,
    pub stats: IngestStats,
}

/// Where one scalar channel lives inside a record.
#[derive(Debug, Clone, Copy)]
struct Channel {
    offset: usize,
    datatype: FieldType,
}

impl Channel {
    fn read_f32(self, record: &[u8], big_endian: bool) -> f32 {
        let at = self.offset;
        match self.datatype {
            FieldType::Float64 => {
                let bytes = take::<8>(record, at);
                #[allow(clippy::cast_possible_truncation)]
                let value = if big_endian {
                    f64::from_be_bytes(bytes)
                } else {
                    f64::from_le_bytes(bytes)
                } as f32;
                value
            }
            _ => {
                let bytes = take::<4>(record, at);
                if big_endian {
                    f32::from_be_bytes(bytes)
                } else {
                    f32::from_le_bytes(bytes)
                }
            }
        }
    }

    fn read_u32(self, record: &[u8], big_endian: bool) -> u32 {
        let bytes = take::<4>(record, self.offset);
        if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        }
    }
}

/// Copies `N` bytes at `at`. Callers have checked the field bounds.
fn take<const N: usize>(record: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&record[at..at + N]);
    out
}

/// Decoded record layout of one frame.
#[derive(Debug, Clone, Copy)]
struct Layout {
    x: Channel,
    y: Channel,
    z: Channel,
    rgb: Option<Channel>,
}

/// Decodes raw sensor frames into point sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudIngestor {
    skip_color: bool,
}

impl CloudIngestor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores any color channel present in the frame.
    #[must_use]
    pub fn with_skip_color(mut self, skip: bool) -> Self {
        self.skip_color = skip;
        self
    }

    /// Decodes `frame`, removing every record with a non-finite coordinate.
    ///
    /// # Errors
    /// Returns an [`IngestError`] if the layout is malformed: a missing or
    /// mistyped coordinate field, a field past the end of the record, or a
    /// data buffer shorter than the declared dimensions.
    pub fn ingest(&self, frame: &RawFrame) -> Result<IngestedCloud, IngestError> {
        let layout = self.layout(frame)?;
        let declared = frame.point_count();
        let mut stats = IngestStats {
            declared,
            ..IngestStats::default()
        };
        if declared == 0 {
            return Ok(IngestedCloud {
                points: PointSet::new(),
                stats,
            });
        }

        let point_step = frame.point_step as usize;
        let row_step = frame.row_step as usize;
        let width = frame.width as usize;
        let big_endian = frame.is_bigendian;

        let mut points = PointSet::with_capacity(declared);
        for row in 0..frame.height as usize {
            let row_start = row * row_step;
            for col in 0..width {
                let start = row_start + col * point_step;
                let record = &frame.data[start..start + point_step];

                let x = layout.x.read_f32(record, big_endian);
                let y = layout.y.read_f32(record, big_endian);
                let z = layout.z.read_f32(record, big_endian);
                if !(x.is_finite() && y.is_finite() && z.is_finite()) {
                    stats.invalid += 1;
                    continue;
                }

                let point = match layout.rgb {
                    Some(channel) => {
                        let packed = channel.read_u32(record, big_endian);
                        Point::with_color(x, y, z, Rgb::from_packed(packed))
                    }
                    None => Point::new(x, y, z),
                };
                points.push(point);
            }
        }

        stats.kept = points.len();
        if stats.invalid > 0 {
            log::debug!(
                "frame {}: dropped {} of {} points with non-finite coordinates",
                frame.header.seq,
                stats.invalid,
                declared
            );
        }
        Ok(IngestedCloud { points, stats })
    }

    fn layout(&self, frame: &RawFrame) -> Result<Layout, IngestError> {
        let point_step = frame.point_step;
        let coordinate = |name: &'static str| -> Result<Channel, IngestError> {
            let field = frame.field(name).ok_or(IngestError::MissingField(name))?;
            if !matches!(field.datatype, FieldType::Float32 | FieldType::Float64) {
                return Err(unsupported(field));
            }
            check_bounds(field, point_step)?;
            Ok(Channel {
                offset: field.offset as usize,
                datatype: field.datatype,
            })
        };

        let x = coordinate("x")?;
        let y = coordinate("y")?;
        let z = coordinate("z")?;

        let rgb = if self.skip_color {
            None
        } else {
            match frame.field("rgb").or_else(|| frame.field("rgba")) {
                Some(field) => {
                    if !matches!(
                        field.datatype,
                        FieldType::Float32 | FieldType::Uint32 | FieldType::Int32
                    ) {
                        return Err(unsupported(field));
                    }
                    check_bounds(field, point_step)?;
                    Some(Channel {
                        offset: field.offset as usize,
                        datatype: field.datatype,
                    })
                }
                None => None,
            }
        };

        check_dimensions(frame)?;
        Ok(Layout { x, y, z, rgb })
    }
}

fn unsupported(field: &PointField) -> IngestError {
    IngestError::UnsupportedFieldType {
        name: field.name.clone(),
        datatype: field.datatype.code(),
    }
}

fn check_bounds(field: &PointField, point_step: u32) -> Result<(), IngestError> {
    if field.end() > point_step as usize {
        return Err(IngestError::FieldOutOfBounds {
            name: field.name.clone(),
            offset: field.offset,
            point_step,
        });
    }
    Ok(())
}

fn check_dimensions(frame: &RawFrame) -> Result<(), IngestError> {
    if frame.point_count() == 0 {
        return Ok(());
    }
    let point_step = frame.point_step as usize;
    let row_step = frame.row_step as usize;
    let width = frame.width as usize;
    let height = frame.height as usize;

    let min_row = width
        .checked_mul(point_step)
        .ok_or_else(|| IngestError::InvalidDimensions("row size overflows".into()))?;
    if row_step < min_row {
        return Err(IngestError::InvalidDimensions(format!(
            "row step {row_step} is smaller than width {width} x point step {point_step}"
        )));
    }

    let expected = row_step
        .checked_mul(height)
        .ok_or_else(|| IngestError::InvalidDimensions("frame size overflows".into()))?;
    if frame.data.len() < expected {
        return Err(IngestError::DataLength {
            expected,
            actual: frame.data.len(),
        });
    }
    Ok(())
}

/// Decodes `frame` with the default ingestor.
///
/// # Errors
/// See [`CloudIngestor::ingest`].
pub fn ingest_frame(frame: &RawFrame) -> Result<IngestedCloud, IngestError> {
    CloudIngestor::new().ingest(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenegrasp_core::FrameHeader;

    fn header() -> FrameHeader {
        FrameHeader::new(7, "camera")
    }

    #[test]
    fn test_roundtrip_packed_frame() {
        let input = vec![
            Point::with_color(0.1, 0.2, 0.3, Rgb::new(255, 0, 10)),
            Point::with_color(1.0, -1.0, 2.5, Rgb::new(1, 2, 3)),
        ];
        let frame = RawFrame::from_points(header(), &input);
        let cloud = ingest_frame(&frame).unwrap();

        assert_eq!(cloud.points.as_slice(), input.as_slice());
        assert_eq!(cloud.stats.declared, 2);
        assert_eq!(cloud.stats.kept, 2);
        assert_eq!(cloud.stats.invalid, 0);
    }

    #[test]
    fn test_drops_non_finite() {
        let input = vec![
            Point::new(0.0, 0.0, 1.0),
            Point::new(f32::NAN, 0.0, 1.0),
            Point::new(0.0, f32::INFINITY, 1.0),
            Point::new(0.5, 0.5, 0.5),
        ];
        let frame = RawFrame::from_points(header(), &input);
        let cloud = CloudIngestor::new().with_skip_color(true).ingest(&frame).unwrap();

        assert_eq!(cloud.points.len(), 2);
        assert_eq!(cloud.stats.invalid, 2);
        assert!(cloud.points.is_dense());
        assert!(cloud.points.iter().all(|p| p.color.is_none()));
    }

    #[test]
    fn test_all_invalid_is_empty() {
        let input = vec![Point::new(f32::NAN, f32::NAN, f32::NAN); 5];
        let cloud = ingest_frame(&RawFrame::from_points(header(), &input)).unwrap();
        assert!(cloud.points.is_empty());
        assert_eq!(cloud.stats.invalid, 5);
    }

    #[test]
    fn test_big_endian_float64() {
        let mut data = Vec::new();
        for v in [1.5_f64, -2.0, 0.25] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        let frame = RawFrame {
            header: header(),
            width: 1,
            height: 1,
            fields: vec![
                PointField::new("x", 0, FieldType::Float64),
                PointField::new("y", 8, FieldType::Float64),
                PointField::new("z", 16, FieldType::Float64),
            ],
            is_bigendian: true,
            point_step: 24,
            row_step: 24,
            data,
            is_dense: true,
        };
        let cloud = ingest_frame(&frame).unwrap();
        assert_eq!(cloud.points.as_slice(), &[Point::new(1.5, -2.0, 0.25)]);
    }

    #[test]
    fn test_organized_frame_with_row_padding() {
        let mut frame = RawFrame::from_points(
            header(),
            &[Point::new(0.0, 0.0, 1.0), Point::new(1.0, 0.0, 1.0)],
        );
        // Two rows of one point, each padded to 20 bytes.
        let mut data = Vec::new();
        data.extend_from_slice(&frame.data[0..16]);
        data.extend_from_slice(&[0; 4]);
        data.extend_from_slice(&frame.data[16..32]);
        data.extend_from_slice(&[0; 4]);
        frame.data = data;
        frame.width = 1;
        frame.height = 2;
        frame.row_step = 20;

        let cloud = ingest_frame(&frame).unwrap();
        assert_eq!(cloud.points.len(), 2);
        assert!((cloud.points[1].x - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_field() {
        let mut frame = RawFrame::from_points(header(), &[Point::new(0.0, 0.0, 1.0)]);
        frame.fields.retain(|f| f.name != "z");
        assert_eq!(ingest_frame(&frame), Err(IngestError::MissingField("z")));
    }

    #[test]
    fn test_integer_coordinate_rejected() {
        let mut frame = RawFrame::from_points(header(), &[Point::new(0.0, 0.0, 1.0)]);
        frame.fields[0].datatype = FieldType::Int32;
        assert!(matches!(
            ingest_frame(&frame),
            Err(IngestError::UnsupportedFieldType { .. })
        ));
    }

    #[test]
    fn test_field_past_point_step() {
        let mut frame = RawFrame::from_points(header(), &[Point::new(0.0, 0.0, 1.0)]);
        frame.fields[2].offset = 14;
        assert!(matches!(
            ingest_frame(&frame),
            Err(IngestError::FieldOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_short_data() {
        let mut frame = RawFrame::from_points(
            header(),
            &[Point::new(0.0, 0.0, 1.0), Point::new(0.0, 0.0, 1.0)],
        );
        frame.data.truncate(20);
        assert_eq!(
            ingest_frame(&frame),
            Err(IngestError::DataLength {
                expected: 32,
                actual: 20
            })
        );
    }
}
