//! Geometry composer.
//!
//! Labels are translated to [`Operation`] and [`Shape`] at the boundary; after
//! that every code is a table lookup.
//!
//! ```text
//! two shapes  <prefix><codeA><params A>C<codeB><params B>C<op><T-code A>R<T-code B>=
//! one shape   <prefix><codeA><params A>C<op><T-code A>=
//! ```
//!
//! Shape parameters are comma-separated groups, one coordinate or
//! coefficient per item. Each item goes through the encoder on its own.

use super::{ComposeError, or_zero};
use crate::{Encoder, FramingTable};
use std::fmt;
use std::str::FromStr;

const DEFAULT_PREFIX: &str = "wj";
const FRAME_KEY: &str = "default";

/// What to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Intersection,
    Distance,
    Area,
    Volume,
    LineEquation,
}

impl Operation {
    pub const ALL: [Operation; 5] =
        [Operation::Intersection, Operation::Distance, Operation::Area, Operation::Volume, Operation::LineEquation];

    pub fn code(self) -> &'static str {
        match self {
            Operation::Intersection => "qT2",
            Operation::Distance => "qT3",
            Operation::Area => "qT4",
            Operation::Volume => "qT5",
            Operation::LineEquation => "qT6",
        }
    }

    pub fn requires_secondary(self) -> bool {
        matches!(self, Operation::Intersection | Operation::Distance)
    }

    fn labels(self) -> &'static [&'static str] {
        match self {
            Operation::Intersection => &["intersection", "giao điểm", "tìm giao điểm"],
            Operation::Distance => &["distance", "khoảng cách", "tính khoảng cách"],
            Operation::Area => &["area", "diện tích", "tính diện tích"],
            Operation::Volume => &["volume", "thể tích", "tính thể tích"],
            Operation::LineEquation => &["line-equation", "line_equation", "line equation", "phương trình đường thẳng"],
        }
    }

    /// T-code override for group A, if this operation has one for `shape`.
    fn t_code_override(self, shape: Shape) -> Option<&'static str> {
        match (self, shape) {
            (Operation::Area, Shape::Circle) => Some("Tc"),
            (Operation::Area, Shape::Sphere) => Some("Tv"),
            (Operation::Volume, Shape::Sphere) => Some("Tb"),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.labels()[0])
    }
}

impl FromStr for Operation {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Operation::ALL
            .into_iter()
            .find(|op| op.labels().contains(&wanted.as_str()))
            .ok_or_else(|| ComposeError::UnknownOperation(s.to_string()))
    }
}

/// Geometric object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Point,
    Line,
    Plane,
    Circle,
    Sphere,
}

impl Shape {
    pub const ALL: [Shape; 5] = [Shape::Point, Shape::Line, Shape::Plane, Shape::Circle, Shape::Sphere];

    /// Entry code when the shape is the first operand.
    pub fn code_a(self, dimension: u8) -> &'static str {
        match (self, dimension) {
            (Shape::Point, 2) => "112",
            (Shape::Point, _) => "113",
            (Shape::Line, _) => "21",
            (Shape::Plane, _) => "31",
            (Shape::Circle, _) => "41",
            (Shape::Sphere, _) => "51",
        }
    }

    /// Entry code when the shape is the second operand.
    pub fn code_b(self, dimension: u8) -> &'static str {
        match (self, dimension) {
            (Shape::Point, 2) => "qT11T122",
            (Shape::Point, _) => "qT11T123",
            (Shape::Line, _) => "qT12T12",
            (Shape::Plane, _) => "qT13T12",
            (Shape::Circle, _) => "qT14T12",
            (Shape::Sphere, _) => "qT15T12",
        }
    }

    fn default_t_codes(self) -> (&'static str, &'static str) {
        match self {
            Shape::Point => ("T1", "T2"),
            Shape::Line => ("T4", "T5"),
            Shape::Plane => ("T7", "T8"),
            Shape::Circle => ("Tz", "Tx"),
            Shape::Sphere => ("Tj", "Tk"),
        }
    }

    fn labels(self) -> &'static [&'static str] {
        match self {
            Shape::Point => &["point", "điểm"],
            Shape::Line => &["line", "đường thẳng"],
            Shape::Plane => &["plane", "mặt phẳng"],
            Shape::Circle => &["circle", "đường tròn"],
            Shape::Sphere => &["sphere", "mặt cầu"],
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.labels()[0])
    }
}

impl FromStr for Shape {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Shape::ALL
            .into_iter()
            .find(|shape| shape.labels().contains(&wanted.as_str()))
            .ok_or_else(|| ComposeError::UnknownShape(s.to_string()))
    }
}

fn t_code_a(operation: Operation, shape: Shape) -> &'static str {
    operation.t_code_override(shape).unwrap_or(shape.default_t_codes().0)
}

fn t_code_b(shape: Shape) -> &'static str {
    shape.default_t_codes().1
}

/// One operand as it arrives from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeInput {
    /// Shape label, English or Vietnamese.
    pub label: String,
    /// Comma-separated parameter groups. Lines take two (point, direction).
    pub params: Vec<String>,
    /// 2 or 3.
    pub dimension: u8,
}

impl ShapeInput {
    pub fn new(label: impl Into<String>, params: &[&str], dimension: u8) -> Self {
        ShapeInput { label: label.into(), params: params.iter().map(|p| p.to_string()).collect(), dimension }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryRequest {
    pub operation: String,
    pub primary: ShapeInput,
    pub secondary: Option<ShapeInput>,
    /// Calculator version; `None` uses the default prefix.
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryKeylog {
    pub keylog: String,
    pub operation: Operation,
    pub primary: Shape,
    /// The second operand, when the two-shape assembly was used.
    pub secondary: Option<Shape>,
}

#[derive(Debug, Clone, Copy)]
pub struct GeometryComposer<'a> {
    encoder: &'a Encoder,
    framing: &'a FramingTable,
}

impl<'a> GeometryComposer<'a> {
    pub fn new(encoder: &'a Encoder, framing: &'a FramingTable) -> Self {
        GeometryComposer { encoder, framing }
    }

    pub fn encode(&self, request: &GeometryRequest) -> Result<GeometryKeylog, ComposeError> {
        let operation: Operation = request.operation.parse()?;
        let primary: Shape = request.primary.label.parse()?;
        let params_a = self.encode_params(primary, &request.primary)?;
        let prefix = self.prefix(request.version.as_deref());

        let secondary = match &request.secondary {
            Some(input) if operation.requires_secondary() || operation == Operation::LineEquation => Some(input),
            Some(_) => {
                log::debug!("{operation} takes one shape, ignoring the second");
                None
            }
            None if operation.requires_secondary() => return Err(ComposeError::MissingSecondaryShape(operation)),
            None => None,
        };

        let code_a = primary.code_a(request.primary.dimension);
        let (keylog, secondary) = match secondary {
            Some(input) => {
                let shape: Shape = input.label.parse()?;
                let params_b = self.encode_params(shape, input)?;
                let keylog = format!(
                    "{prefix}{code_a}{params_a}C{}{params_b}C{}{}R{}=",
                    shape.code_b(input.dimension),
                    operation.code(),
                    t_code_a(operation, primary),
                    t_code_b(shape),
                );
                (keylog, Some(shape))
            }
            None => {
                let keylog = format!("{prefix}{code_a}{params_a}C{}{}=", operation.code(), t_code_a(operation, primary));
                (keylog, None)
            }
        };

        Ok(GeometryKeylog { keylog, operation, primary, secondary })
    }

    fn prefix(&self, version: Option<&str>) -> &str {
        version
            .and_then(|v| self.framing.frame(v, FRAME_KEY))
            .map(|frame| frame.prefix.as_str())
            .filter(|prefix| !prefix.is_empty())
            .unwrap_or(DEFAULT_PREFIX)
    }

    fn encode_params(&self, shape: Shape, input: &ShapeInput) -> Result<String, ComposeError> {
        let dimension = input.dimension;
        if !(2..=3).contains(&dimension) {
            return Err(ComposeError::UnsupportedDimension(dimension));
        }
        if input.params.is_empty() {
            let expected = if shape == Shape::Line { 2 } else { 1 };
            return Err(ComposeError::ShapeParameters { shape, expected, actual: 0 });
        }

        let encoded = match shape {
            Shape::Point => {
                let coordinates = self.encode_values(&input.params, usize::from(dimension));
                format!("{}=", coordinates.join("="))
            }
            Shape::Line => {
                if input.params.len() != 2 {
                    return Err(ComposeError::ShapeParameters { shape, expected: 2, actual: input.params.len() });
                }
                let point = self.encode_values(&input.params[..1], 3);
                let direction = self.encode_values(&input.params[1..], 3);
                let interleaved: Vec<&str> =
                    point.iter().zip(&direction).flat_map(|(p, d)| [p.as_str(), d.as_str()]).collect();
                interleaved.join("=")
            }
            Shape::Plane | Shape::Sphere => self.encode_values(&input.params, 4).join("="),
            Shape::Circle => self.encode_values(&input.params, usize::from(dimension) + 1).join("="),
        };
        Ok(encoded)
    }

    /// Split every group on commas, pad with zeros or cut to `count`, encode each.
    fn encode_values(&self, groups: &[String], count: usize) -> Vec<String> {
        let values = groups.iter().flat_map(|group| group.split(',')).map(str::trim);
        values
            .chain(std::iter::repeat("0"))
            .take(count)
            .map(|value| self.encoder.encode(or_zero(value)))
            .collect()
    }
}
