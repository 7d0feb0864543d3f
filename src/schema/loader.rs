//! Schema documents: the serialized form of a [`Schema`].
//!
//! Documents are accepted as YAML, TOML or JSON and compiled into a validated
//! [`Schema`]. Every problem found during compilation is collected so a broken
//! document is reported in one go.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::types::{AnchorSide, Cardinality, Entity, Field, Point, Relationship, Schema};
use crate::error::{SchemaError, SchemaIssue};

const BUILTIN_SCHEMA: &str = include_str!("../../schemas/matching_app.yaml");

#[derive(Debug, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub overview: Option<String>,
    pub entities: Vec<EntityDocument>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDocument>,
}

#[derive(Debug, Deserialize)]
pub struct EntityDocument {
    pub name: String,
    pub position: (f32, f32),
    pub fields: Vec<String>,
    #[serde(default = "default_entity_color")]
    pub color: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct RelationshipDocument {
    pub from: String,
    pub to: String,
    #[serde(alias = "from_pos")]
    pub from_side: String,
    #[serde(alias = "to_pos")]
    pub to_side: String,
    #[serde(alias = "type")]
    pub cardinality: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub offset_y: f32,
    #[serde(default)]
    pub curved: bool,
}

fn default_entity_color() -> String {
    "#FFFFFF".to_string()
}

impl SchemaDocument {
    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(content)
            .map_err(|e| SchemaError::Parse(format!("YAML: {}", e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        toml::from_str(content).map_err(|e| SchemaError::Parse(format!("TOML: {}", e)))
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(content)
            .map_err(|e| SchemaError::Parse(format!("JSON: {}", e)))
    }

    /// Compile into a [`Schema`], reporting every issue at once.
    pub fn compile(self) -> Result<Schema, SchemaError> {
        let mut issues = Vec::new();

        let entities: Vec<Entity> = self
            .entities
            .into_iter()
            .map(|doc| {
                let fields = doc
                    .fields
                    .iter()
                    .map(|label| {
                        Field::parse(label).unwrap_or_else(|| {
                            issues.push(SchemaIssue::ConflictingFieldTags {
                                entity: doc.name.clone(),
                                field: label.clone(),
                            });
                            Field::plain(label)
                        })
                    })
                    .collect();
                Entity {
                    name: doc.name,
                    fields,
                    position: Point::new(doc.position.0, doc.position.1),
                    color: doc.color,
                    description: doc.description,
                }
            })
            .collect();

        let mut relationships = Vec::with_capacity(self.relationships.len());
        let mut rejected = Vec::new();
        for (index, doc) in self.relationships.into_iter().enumerate() {
            let from_side = doc.from_side.parse::<AnchorSide>();
            let to_side = doc.to_side.parse::<AnchorSide>();
            let cardinality = doc.cardinality.parse::<Cardinality>();

            match (from_side, to_side, cardinality) {
                (Ok(from_side), Ok(to_side), Ok(cardinality)) => {
                    let label = doc
                        .label
                        .unwrap_or_else(|| cardinality.short_label().to_string());
                    relationships.push(Relationship {
                        from: doc.from,
                        to: doc.to,
                        from_side,
                        to_side,
                        cardinality,
                        label,
                        offset_y: doc.offset_y,
                        curved: doc.curved,
                    });
                }
                (from_side, to_side, cardinality) => {
                    issues.extend(from_side.err());
                    issues.extend(to_side.err());
                    issues.extend(cardinality.err());
                    rejected.push((index, doc.from, doc.to));
                }
            }
        }

        let schema = Schema {
            title: self.title,
            subtitle: self.subtitle,
            overview: self.overview,
            entities,
            relationships,
        };
        issues.extend(schema.issues());
        for (index, from, to) in &rejected {
            issues.extend(schema.dangling_ends(*index, from, to));
        }

        if !issues.is_empty() {
            return Err(SchemaError::Invalid(issues));
        }

        debug!(
            entities = schema.entities.len(),
            relationships = schema.relationships.len(),
            "compiled schema"
        );
        Ok(schema)
    }
}

impl Schema {
    /// The schema of the matching application, embedded at build time.
    pub fn builtin() -> Result<Self, SchemaError> {
        SchemaDocument::from_yaml_str(BUILTIN_SCHEMA)?.compile()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        SchemaDocument::from_yaml_str(content)?.compile()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        SchemaDocument::from_toml_str(content)?.compile()
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        SchemaDocument::from_json_str(content)?.compile()
    }

    /// Parse a document whose format is chosen by `path`'s extension.
    ///
    /// Unknown extensions try TOML first, then YAML.
    pub fn from_path_and_str(path: &Path, content: &str) -> Result<Self, SchemaError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let document = match ext.as_deref() {
            Some("yaml") | Some("yml") => SchemaDocument::from_yaml_str(content)?,
            Some("toml") => SchemaDocument::from_toml_str(content)?,
            Some("json") => SchemaDocument::from_json_str(content)?,
            _ => SchemaDocument::from_toml_str(content)
                .or_else(|_| SchemaDocument::from_yaml_str(content))?,
        };
        document.compile()
    }
}
