//! Raw sensor frames and the ingress trait.
//!
//! A [`RawFrame`] is a self-describing binary point record buffer laid out the
//! way depth cameras publish clouds: a list of named fields at byte offsets
//! inside a fixed-size point record.

use crate::error::Result;
use crate::point::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Scalar type of a point field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl FieldType {
    /// Size of one element in bytes.
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            FieldType::Int8 | FieldType::Uint8 => 1,
            FieldType::Int16 | FieldType::Uint16 => 2,
            FieldType::Int32 | FieldType::Uint32 | FieldType::Float32 => 4,
            FieldType::Float64 => 8,
        }
    }

    /// Wire code (1..=8) used by `PointCloud2` messages.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            FieldType::Int8 => 1,
            FieldType::Uint8 => 2,
            FieldType::Int16 => 3,
            FieldType::Uint16 => 4,
            FieldType::Int32 => 5,
            FieldType::Uint32 => 6,
            FieldType::Float32 => 7,
            FieldType::Float64 => 8,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(FieldType::Int8),
            2 => Some(FieldType::Uint8),
            3 => Some(FieldType::Int16),
            4 => Some(FieldType::Uint16),
            5 => Some(FieldType::Int32),
            6 => Some(FieldType::Uint32),
            7 => Some(FieldType::Float32),
            8 => Some(FieldType::Float64),
            _ => None,
        }
    }
}

/// A named channel inside a point record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointField {
    pub name: String,
    /// Byte offset from the start of the record.
    pub offset: u32,
    pub datatype: FieldType,
    /// Number of elements.
    pub count: u32,
}

impl PointField {
    #[must_use]
    pub fn new(name: impl Into<String>, offset: u32, datatype: FieldType) -> Self {
        Self {
            name: name.into(),
            offset,
            datatype,
            count: 1,
        }
    }

    /// Byte offset one past the field's last element.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset as usize + self.datatype.size() * self.count.max(1) as usize
    }
}

/// Frame metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameHeader {
    /// Monotonic sequence number assigned by the source.
    pub seq: u64,
    /// Acquisition time in nanoseconds.
    pub stamp_ns: u64,
    /// Coordinate frame the points are expressed in.
    pub frame_id: String,
}

impl FrameHeader {
    #[must_use]
    pub fn new(seq: u64, frame_id: impl Into<String>) -> Self {
        Self {
            seq,
            stamp_ns: 0,
            frame_id: frame_id.into(),
        }
    }
}

/// Undecoded point cloud frame as delivered by a sensor transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawFrame {
    pub header: FrameHeader,
    /// Points per row (or total points for unorganized clouds).
    pub width: u32,
    /// Number of rows; 1 for unorganized clouds.
    pub height: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    /// Bytes per point record.
    pub point_step: u32,
    /// Bytes per row.
    pub row_step: u32,
    pub data: Vec<u8>,
    /// Declared by the sender; ingestion removes invalid samples regardless.
    pub is_dense: bool,
}

/// Record layout used by [`RawFrame::from_points`].
const PACKED_POINT_STEP: u32 = 16;

impl RawFrame {
    /// Encodes points as an unorganized little-endian `x y z rgb` float32 cloud.
    ///
    /// Uncolored points are encoded with a zero color word.
    #[must_use]
    pub fn from_points(header: FrameHeader, points: &[Point]) -> Self {
        let mut data = Vec::with_capacity(points.len() * PACKED_POINT_STEP as usize);
        for p in points {
            data.extend_from_slice(&p.x.to_le_bytes());
            data.extend_from_slice(&p.y.to_le_bytes());
            data.extend_from_slice(&p.z.to_le_bytes());
            let rgb = p.color.map_or(0, super::point::Rgb::packed);
            data.extend_from_slice(&f32::from_bits(rgb).to_le_bytes());
        }
        let width = u32::try_from(points.len()).unwrap_or(u32::MAX);
        Self {
            header,
            width,
            height: 1,
            fields: vec![
                PointField::new("x", 0, FieldType::Float32),
                PointField::new("y", 4, FieldType::Float32),
                PointField::new("z", 8, FieldType::Float32),
                PointField::new("rgb", 12, FieldType::Float32),
            ],
            is_bigendian: false,
            point_step: PACKED_POINT_STEP,
            row_step: PACKED_POINT_STEP.saturating_mul(width),
            data,
            is_dense: points.iter().all(Point::is_finite),
        }
    }

    /// Number of point records declared by the dimensions.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&PointField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Delivers raw frames from a named source.
///
/// Implementations wrap whatever transport carries sensor data; the pipeline
/// only pulls frames and never blocks on anything else.
pub trait FrameSource: Send {
    /// Name of the source, as given by configuration.
    fn topic(&self) -> &str;

    /// Returns the next frame, or `None` once the source is exhausted.
    ///
    /// # Errors
    /// Returns [`crate::Error::Source`] if the transport fails.
    fn next_frame(&mut self) -> Result<Option<RawFrame>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Rgb;

    #[test]
    fn test_field_type_codes() {
        for code in 1..=8 {
            let t = FieldType::from_code(code).unwrap();
            assert_eq!(t.code(), code);
        }
        assert!(FieldType::from_code(0).is_none());
        assert!(FieldType::from_code(9).is_none());
        assert_eq!(FieldType::Float64.size(), 8);
    }

    #[test]
    fn test_from_points_layout() {
        let points = [
            Point::new(1.0, 2.0, 3.0),
            Point::with_color(4.0, 5.0, 6.0, Rgb::new(255, 0, 0)),
        ];
        let frame = RawFrame::from_points(FrameHeader::new(7, "camera"), &points);

        assert_eq!(frame.point_count(), 2);
        assert_eq!(frame.data.len(), 32);
        assert_eq!(frame.row_step, 32);
        assert_eq!(frame.field("z").unwrap().offset, 8);
        assert_eq!(frame.field("rgb").unwrap().end(), 16);
        assert!(frame.field("intensity").is_none());
        assert!(frame.is_dense);
        assert_eq!(&frame.data[16..20], &4.0f32.to_le_bytes());
    }
}
