//! `f` record syntaxes and index resolution.

use crate::mesh::FaceIndexGroup;

/// Index syntax of one face line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceSyntax {
    /// `i//n`
    PositionNormal,
    /// `i/t/n`
    PositionTexcoordNormal,
    /// `i`
    Position,
    /// `i/t`
    PositionTexcoord,
}

impl FaceSyntax {
    /// Matching order. The first variant that fits every group of the line wins.
    pub const PRIORITY: [FaceSyntax; 4] = [
        FaceSyntax::PositionNormal,
        FaceSyntax::PositionTexcoordNormal,
        FaceSyntax::Position,
        FaceSyntax::PositionTexcoord,
    ];

    fn match_group(self, group: &str) -> Option<Corner> {
        let mut parts = group.split('/');
        let position = parts.next().and_then(parse_index)?;
        let (t, n) = (parts.next(), parts.next());
        if parts.next().is_some() {
            return None;
        }

        let (texcoord, normal) = match (self, t, n) {
            (FaceSyntax::Position, None, None) => (0, 0),
            (FaceSyntax::PositionTexcoord, Some(t), None) => (parse_index(t)?, 0),
            (FaceSyntax::PositionNormal, Some(""), Some(n)) => (0, parse_index(n)?),
            (FaceSyntax::PositionTexcoordNormal, Some(t), Some(n)) => {
                (parse_index(t)?, parse_index(n)?)
            }
            _ => return None,
        };
        Some(Corner {
            position,
            texcoord,
            normal,
        })
    }
}

/// Number of records seen so far, for resolving negative (relative) indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexCounts {
    pub positions: usize,
    pub texcoords: usize,
    pub normals: usize,
}

#[derive(Clone, Copy, Debug)]
struct Corner {
    position: i64,
    texcoord: i64,
    normal: i64,
}

fn parse_index(s: &str) -> Option<i64> {
    let value: i64 = s.parse().ok()?;
    (value != 0).then_some(value)
}

/// Make a raw index absolute and 1-based. `0` stays "absent".
fn resolve(raw: i64, count: usize) -> Option<u32> {
    let absolute = if raw < 0 { count as i64 + raw + 1 } else { raw };
    match raw {
        0 => Some(0),
        _ if absolute >= 1 => u32::try_from(absolute).ok(),
        _ => None,
    }
}

/// Parse the text after an `f` keyword.
///
/// Exactly four groups make a quad; anything else is read as a triangle from
/// its first three groups. Returns `None` when no syntax fits or a relative
/// index points before the first record. The material is left unset.
pub fn parse_face(line: &str, counts: IndexCounts) -> Option<FaceIndexGroup> {
    let groups: Vec<&str> = line.split_whitespace().collect();
    let is_quad = groups.len() == 4;
    let arity = if is_quad { 4 } else { 3 };
    let groups = groups.get(..arity)?;

    let (syntax, corners) = FaceSyntax::PRIORITY.iter().find_map(|&syntax| {
        let corners: Option<Vec<Corner>> =
            groups.iter().map(|g| syntax.match_group(g)).collect();
        corners.map(|c| (syntax, c))
    })?;

    let mut face = FaceIndexGroup {
        positions: [0; 4],
        texcoords: [0; 4],
        normal: 0,
        is_quad,
        material: None,
        syntax,
    };
    for (slot, corner) in corners.iter().enumerate() {
        face.positions[slot] = resolve(corner.position, counts.positions)?;
        face.texcoords[slot] = resolve(corner.texcoord, counts.texcoords)?;
        // One normal per face: the last corner's index wins.
        face.normal = resolve(corner.normal, counts.normals)?;
    }
    Some(face)
}
