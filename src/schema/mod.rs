mod loader;
mod types;

pub use loader::{EntityDocument, RelationshipDocument, SchemaDocument};
pub use types::{AnchorSide, Cardinality, Entity, Field, FieldTag, Point, Relationship, Schema};
