//! Entity box extents and anchor points.
//!
//! Box drawing and connector routing both go through [`box_size`]; if the two
//! ever disagreed, connectors would stop meeting box edges.

use crate::schema::{AnchorSide, Entity, Point};

pub const MIN_WIDTH: f32 = 3.0;
pub const WIDTH_PER_CHAR: f32 = 0.12;
pub const ROW_HEIGHT: f32 = 0.25;
pub const HEADER_HEIGHT: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSize {
    pub width: f32,
    pub height: f32,
}

/// Rendered width and height of an entity, from its field list only.
pub fn box_size(entity: &Entity) -> BoxSize {
    let longest = entity
        .fields
        .iter()
        .map(|f| f.label.chars().count())
        .max()
        .unwrap_or(0);

    BoxSize {
        width: MIN_WIDTH.max(longest as f32 * WIDTH_PER_CHAR),
        height: entity.fields.len() as f32 * ROW_HEIGHT + HEADER_HEIGHT,
    }
}

/// Axis-aligned box of an entity in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoxBounds {
    pub fn of(entity: &Entity) -> Self {
        let size = box_size(entity);
        Self {
            x: entity.position.x,
            y: entity.position.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Point on the perimeter of `entity`'s box where a connector attaches.
pub fn anchor_point(entity: &Entity, side: AnchorSide) -> Point {
    let b = BoxBounds::of(entity);
    let center = b.center();
    match side {
        AnchorSide::Left => Point::new(b.x, center.y),
        AnchorSide::Right => Point::new(b.right(), center.y),
        AnchorSide::Top => Point::new(center.x, b.top()),
        AnchorSide::Bottom => Point::new(center.x, b.y),
        AnchorSide::Center => center,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldTag};
    use proptest::prelude::*;

    fn entity_with(fields: &[&str], x: f32, y: f32) -> Entity {
        Entity {
            name: "t".to_string(),
            fields: fields.iter().map(|f| Field::plain(f)).collect(),
            position: Point::new(x, y),
            color: "#FFFFFF".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn short_fields_use_minimum_width() {
        let e = entity_with(&["id (PK)", "name"], 0.0, 0.0);
        let size = box_size(&e);
        assert_eq!(size.width, MIN_WIDTH);
        assert!((size.height - (2.0 * ROW_HEIGHT + HEADER_HEIGHT)).abs() < 1e-6);
    }

    #[test]
    fn long_field_widens_box() {
        // 30 characters * 0.12 = 3.6
        let e = entity_with(&["a_really_long_column_name_here"], 0.0, 0.0);
        assert!((box_size(&e).width - 3.6).abs() < 1e-5);
    }

    #[test]
    fn width_counts_characters_not_bytes() {
        let ascii = entity_with(&["x".repeat(40).as_str()], 0.0, 0.0);
        let wide = entity_with(&["ü".repeat(40).as_str()], 0.0, 0.0);
        assert_eq!(box_size(&ascii), box_size(&wide));
    }

    #[test]
    fn size_ignores_position_and_color() {
        let mut a = entity_with(&["id (PK)", "user_id (FK)"], 0.0, 0.0);
        let b = entity_with(&["id (PK)", "user_id (FK)"], 7.0, -2.0);
        a.color = "#000000".to_string();
        assert_eq!(box_size(&a), box_size(&b));
    }

    #[test]
    fn tagged_fields_count_their_marker() {
        let mut e = entity_with(&[], 0.0, 0.0);
        e.fields.push(Field::tagged("reset_password_token", FieldTag::Unique));
        // "reset_password_token (UNIQUE)" is 29 characters
        assert!((box_size(&e).width - 29.0 * WIDTH_PER_CHAR).abs() < 1e-5);
    }

    #[test]
    fn anchors_follow_box_edges() {
        let e = entity_with(&["id (PK)", "name", "email"], 2.0, 1.0);
        let size = box_size(&e);

        assert_eq!(anchor_point(&e, AnchorSide::Left), Point::new(2.0, 1.0 + size.height / 2.0));
        assert_eq!(
            anchor_point(&e, AnchorSide::Right),
            Point::new(2.0 + size.width, 1.0 + size.height / 2.0)
        );
        assert_eq!(
            anchor_point(&e, AnchorSide::Top),
            Point::new(2.0 + size.width / 2.0, 1.0 + size.height)
        );
        assert_eq!(anchor_point(&e, AnchorSide::Bottom), Point::new(2.0 + size.width / 2.0, 1.0));
        assert_eq!(anchor_point(&e, AnchorSide::Center), BoxBounds::of(&e).center());
    }

    fn arb_entity() -> impl Strategy<Value = Entity> {
        (
            prop::collection::vec("[a-z_]{1,40}", 0..15),
            -20.0f32..20.0,
            -20.0f32..20.0,
        )
            .prop_map(|(fields, x, y)| Entity {
                name: "e".to_string(),
                fields: fields.iter().map(|f| Field::plain(f)).collect(),
                position: Point::new(x, y),
                color: "#FFFFFF".to_string(),
                description: String::new(),
            })
    }

    proptest! {
        #[test]
        fn horizontal_anchors_are_level(e in arb_entity()) {
            let left = anchor_point(&e, AnchorSide::Left);
            let right = anchor_point(&e, AnchorSide::Right);
            prop_assert_eq!(left.y, right.y);
            prop_assert_eq!(left.y, e.position.y + box_size(&e).height / 2.0);
        }

        #[test]
        fn vertical_anchors_are_centered(e in arb_entity()) {
            let top = anchor_point(&e, AnchorSide::Top);
            let bottom = anchor_point(&e, AnchorSide::Bottom);
            prop_assert_eq!(top.x, bottom.x);
            prop_assert_eq!(top.x, e.position.x + box_size(&e).width / 2.0);
        }

        #[test]
        fn size_is_idempotent(e in arb_entity()) {
            prop_assert_eq!(box_size(&e), box_size(&e));
            prop_assert!(box_size(&e).width >= MIN_WIDTH);
        }
    }
}
