use std::fmt;
use std::str::FromStr;

use crate::error::{SchemaError, SchemaIssue};

/// A point in canvas units. The y axis points up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn offset(self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Key constraint carried by a field. At most one per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldTag {
    PrimaryKey,
    ForeignKey,
    Unique,
}

impl FieldTag {
    pub const ALL: [FieldTag; 3] = [FieldTag::PrimaryKey, FieldTag::ForeignKey, FieldTag::Unique];

    /// The marker as written in a field label, e.g. `(PK)`.
    pub fn marker(self) -> &'static str {
        match self {
            FieldTag::PrimaryKey => "(PK)",
            FieldTag::ForeignKey => "(FK)",
            FieldTag::Unique => "(UNIQUE)",
        }
    }
}

fn trailing_tag(label: &str) -> Option<FieldTag> {
    FieldTag::ALL
        .into_iter()
        .find(|tag| label.ends_with(tag.marker()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Display label, including the tag marker when tagged.
    pub label: String,
    pub tag: Option<FieldTag>,
}

impl Field {
    /// Parse a display label such as `"user_id (FK)"`.
    ///
    /// Markers only count at the end of the label. Returns `None` when the
    /// label ends in more than one marker.
    pub fn parse(label: &str) -> Option<Self> {
        let mut rest = label.trim_end();
        let mut tag = None;
        while let Some(found) = trailing_tag(rest) {
            if tag.is_some() {
                return None;
            }
            tag = Some(found);
            rest = rest[..rest.len() - found.marker().len()].trim_end();
        }
        Some(Self {
            label: label.to_string(),
            tag,
        })
    }

    pub fn plain(name: &str) -> Self {
        Self {
            label: name.to_string(),
            tag: None,
        }
    }

    pub fn tagged(name: &str, tag: FieldTag) -> Self {
        Self {
            label: format!("{} {}", name, tag.marker()),
            tag: Some(tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
    /// Corner the anchor formulas treat as `(x, y)`; the box extends right and up.
    pub position: Point,
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorSide {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl AnchorSide {
    pub fn is_horizontal(self) -> bool {
        matches!(self, AnchorSide::Left | AnchorSide::Right)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnchorSide::Left => "left",
            AnchorSide::Right => "right",
            AnchorSide::Top => "top",
            AnchorSide::Bottom => "bottom",
            AnchorSide::Center => "center",
        }
    }
}

impl FromStr for AnchorSide {
    type Err = SchemaIssue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(AnchorSide::Left),
            "right" => Ok(AnchorSide::Right),
            "top" => Ok(AnchorSide::Top),
            "bottom" => Ok(AnchorSide::Bottom),
            "center" => Ok(AnchorSide::Center),
            _ => Err(SchemaIssue::InvalidAnchorSide(s.to_string())),
        }
    }
}

impl fmt::Display for AnchorSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
}

impl Cardinality {
    pub fn short_label(self) -> &'static str {
        match self {
            Cardinality::OneToOne => "1:1",
            Cardinality::OneToMany => "1:N",
        }
    }
}

impl FromStr for Cardinality {
    type Err = SchemaIssue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "one_to_one" | "1:1" => Ok(Cardinality::OneToOne),
            "one_to_many" | "1:n" => Ok(Cardinality::OneToMany),
            _ => Err(SchemaIssue::UnknownCardinality(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    pub from_side: AnchorSide,
    pub to_side: AnchorSide,
    pub cardinality: Cardinality,
    /// May contain `\n` for multi-line labels.
    pub label: String,
    pub offset_y: f32,
    pub curved: bool,
}

impl Relationship {
    pub fn new(
        from: &str,
        from_side: AnchorSide,
        to: &str,
        to_side: AnchorSide,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            from_side,
            to_side,
            cardinality,
            label: cardinality.short_label().to_string(),
            offset_y: 0.0,
            curved: false,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_offset(mut self, offset_y: f32) -> Self {
        self.offset_y = offset_y;
        self
    }

    pub fn curved(mut self) -> Self {
        self.curved = true;
        self
    }
}

/// A compiled diagram description. Entities and relationships keep declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub title: String,
    pub subtitle: String,
    pub overview: Option<String>,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl Schema {
    pub fn new(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            overview: None,
            entities,
            relationships,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Check name uniqueness and that every relationship end exists.
    ///
    /// Every problem is reported, not just the first one.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid(issues))
        }
    }

    pub(crate) fn issues(&self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();

        for (idx, entity) in self.entities.iter().enumerate() {
            let seen_before = self.entities[..idx].iter().any(|e| e.name == entity.name);
            let reported = issues
                .iter()
                .any(|i| matches!(i, SchemaIssue::DuplicateEntity(n) if *n == entity.name));
            if seen_before && !reported {
                issues.push(SchemaIssue::DuplicateEntity(entity.name.clone()));
            }
        }

        for (index, rel) in self.relationships.iter().enumerate() {
            issues.extend(self.dangling_ends(index, &rel.from, &rel.to));
        }

        issues
    }

    /// One issue per end of `from -> to` that names no entity.
    pub(crate) fn dangling_ends(&self, index: usize, from: &str, to: &str) -> Vec<SchemaIssue> {
        [from, to]
            .into_iter()
            .filter(|name| self.entity(name).is_none())
            .map(|name| SchemaIssue::DanglingRelationship {
                index,
                from: from.to_string(),
                to: to.to_string(),
                missing: name.to_string(),
            })
            .collect()
    }
}
