/// Tolerant line-oriented parser for Wavefront-style geometry text
///
/// Every line is classified independently into a [`Record`], a skip (blank or
/// comment), or a [`LineError`]. Bad lines are reported and dropped; the rest
/// of the stream is still parsed.
use std::io::BufRead;

use nalgebra::{Point3, Vector2, Vector3};
use nom::{
    bytes::complete::{take_till1, take_while, take_while1},
    character::complete::{char as symbol, u32 as index},
    combinator::{all_consuming, opt},
    multi::separated_list0,
    number::complete::float,
    sequence::{delimited, preceded},
    IResult,
};

use crate::error::{LineError, ObjResult};

/// One vertex reference inside a face, all indices 1-based as in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceVertex {
    pub position: u32,
    pub tex_coord: Option<u32>,
    pub normal: Option<u32>,
}

impl FaceVertex {
    pub fn new(position: u32) -> Self {
        Self {
            position,
            tex_coord: None,
            normal: None,
        }
    }
}

/// A classified input line
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Position(Point3<f32>),
    Normal(Vector3<f32>),
    TexCoord(Vector2<f32>),
    Face([FaceVertex; 3]),
}

/// A triangle as declared in the source stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub vertices: [FaceVertex; 3],
    /// 1-based source line
    pub line: usize,
    /// Number of positions declared before this face
    pub declared_positions: usize,
}

/// A discarded line and the reason it was discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub error: LineError,
}

/// Attribute and face sequences in declaration order
#[derive(Debug, Clone, Default)]
pub struct ParsedObj {
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub tex_coords: Vec<Vector2<f32>>,
    pub faces: Vec<Face>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedObj {
    /// Classify one line and fold the result into the sequences
    pub fn feed_line(&mut self, line_number: usize, line: &str) {
        match parse_line(line) {
            Ok(Some(record)) => self.push(record, line_number),
            Ok(None) => {}
            Err(error) => {
                log::warn!("line {}: {} (skipped)", line_number, error);
                self.diagnostics.push(Diagnostic {
                    line: line_number,
                    error,
                });
            }
        }
    }

    fn push(&mut self, record: Record, line: usize) {
        match record {
            Record::Position(p) => self.positions.push(p),
            Record::Normal(n) => self.normals.push(n),
            Record::TexCoord(t) => self.tex_coords.push(t),
            Record::Face(vertices) => self.faces.push(Face {
                vertices,
                line,
                declared_positions: self.positions.len(),
            }),
        }
    }
}

/// Parse an in-memory geometry description
pub fn parse_str(input: &str) -> ParsedObj {
    let mut parsed = ParsedObj::default();
    for (i, line) in input.lines().enumerate() {
        parsed.feed_line(i + 1, line);
    }
    parsed
}

/// Parse a geometry stream. Only I/O failures abort the parse.
pub fn parse_reader<R: BufRead>(reader: R) -> ObjResult<ParsedObj> {
    let mut parsed = ParsedObj::default();
    for (i, line) in reader.lines().enumerate() {
        parsed.feed_line(i + 1, &line?);
    }
    Ok(parsed)
}

/// Classify a single line. `Ok(None)` means blank or comment.
pub fn parse_line(line: &str) -> Result<Option<Record>, LineError> {
    let tokens = tokenize(line);
    let Some((&keyword, values)) = tokens.split_first() else {
        return Ok(None);
    };
    if keyword.starts_with('#') {
        return Ok(None);
    }

    let record = match keyword {
        "v" => {
            let [x, y, z] = floats::<3>("v", values)?;
            Record::Position(Point3::new(x, y, z))
        }
        "vn" => {
            let [x, y, z] = floats::<3>("vn", values)?;
            Record::Normal(Vector3::new(x, y, z))
        }
        "vt" => {
            let [u, v] = floats::<2>("vt", values)?;
            Record::TexCoord(Vector2::new(u, v))
        }
        "f" => {
            check_arity("f", 3, values)?;
            Record::Face([
                parse_face_vertex(values[0])?,
                parse_face_vertex(values[1])?,
                parse_face_vertex(values[2])?,
            ])
        }
        other => return Err(LineError::UnknownKeyword(other.to_string())),
    };
    Ok(Some(record))
}

/// Split a line on runs of whitespace
pub fn tokenize(line: &str) -> Vec<&str> {
    match token_list(line) {
        Ok((_, tokens)) => tokens,
        Err(_) => Vec::new(),
    }
}

fn token_list(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(
        take_while(char::is_whitespace),
        separated_list0(
            take_while1(char::is_whitespace),
            take_till1(char::is_whitespace),
        ),
        take_while(char::is_whitespace),
    )(input)
}

fn check_arity(keyword: &'static str, expected: usize, values: &[&str]) -> Result<(), LineError> {
    if values.len() != expected {
        return Err(LineError::Arity {
            keyword,
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

fn floats<const N: usize>(keyword: &'static str, values: &[&str]) -> Result<[f32; N], LineError> {
    check_arity(keyword, N, values)?;
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(values) {
        *slot = parse_float(token)?;
    }
    Ok(out)
}

fn parse_float(token: &str) -> Result<f32, LineError> {
    let parsed: IResult<&str, f32> = all_consuming(float)(token);
    match parsed {
        Ok((_, value)) if value.is_finite() => Ok(value),
        _ => Err(LineError::InvalidNumber(token.to_string())),
    }
}

fn parse_face_vertex(token: &str) -> Result<FaceVertex, LineError> {
    match all_consuming(face_vertex)(token) {
        Ok((_, vertex)) => Ok(vertex),
        Err(_) => Err(LineError::InvalidIndex(token.to_string())),
    }
}

/// `p`, `p/t`, `p//n` or `p/t/n`
fn face_vertex(input: &str) -> IResult<&str, FaceVertex> {
    let (input, position) = index(input)?;
    let (input, tex_coord) = opt(preceded(symbol('/'), opt(index)))(input)?;
    let (input, normal) = match tex_coord {
        Some(_) => opt(preceded(symbol('/'), index))(input)?,
        None => (input, None),
    };
    Ok((
        input,
        FaceVertex {
            position,
            tex_coord: tex_coord.flatten(),
            normal,
        },
    ))
}
