//! Custom-object placements named by §6's STG output and §3's data model
//! ADD section, grounded on `linked_objects.hxx`'s `Windsock`/`Beacon`/
//! `Sign` classes. Parsing these out of an airport descriptor row is out
//! of scope (§1 — that's the CLI/file-format layer); a caller builds
//! these directly and hands them to [`super::Tile::add_custom_object`].

use crate::geometry::Point2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Windsock {
    pub position: Point2,
    pub lit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beacon {
    pub position: Point2,
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sign {
    pub position: Point2,
    pub heading_deg: f64,
    pub size: i32,
    pub definition: String,
}

impl Sign {
    /// Builds a sign, sanitizing `definition` per §6/§7: malformed bytes in
    /// an optional description field are replaced with a space and
    /// construction proceeds rather than erroring.
    pub fn new(position: Point2, heading_deg: f64, size: i32, definition: impl AsRef<str>) -> Self {
        Self {
            position,
            heading_deg,
            size,
            definition: sanitize_ascii(definition.as_ref()),
        }
    }
}

/// Replaces every byte outside printable ASCII (32..=127) with a space,
/// per §6's input-sanitization rule for description/definition fields.
pub fn sanitize_ascii(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() && (' '..='\u{7f}').contains(&c) { c } else { ' ' })
        .collect()
}


/// One placement in the tile's STG output: position, heading, and an
/// asset key (out of scope to resolve further — the texture/model
/// catalogue lookup lives in the caller per §1's Non-goals).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomObject {
    Windsock(Windsock),
    Beacon(Beacon),
    Sign(Sign),
}

impl CustomObject {
    pub fn position(&self) -> Point2 {
        match self {
            CustomObject::Windsock(w) => w.position,
            CustomObject::Beacon(b) => b.position,
            CustomObject::Sign(s) => s.position,
        }
    }
}
