//! Connector routing between entity anchors.

use tracing::debug;

use super::geometry::anchor_point;
use crate::error::RouteError;
use crate::schema::{AnchorSide, Cardinality, Entity, Point, Relationship, Schema};
use crate::theme::{StrokeStyle, Theme};

/// Height of the Bezier control point above the higher endpoint.
pub const CURVE_RISE: f32 = 1.0;
pub const CURVE_SAMPLES: usize = 50;
const CURVE_LABEL_LIFT: f32 = 0.2;
const STRAIGHT_LABEL_OFFSET: f32 = 0.3;
const FALLBACK_LABEL_LIFT: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathShape {
    Straight,
    Orthogonal,
    Curve,
}

/// A routed connector: the polyline to draw and where its label goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub shape: PathShape,
    pub points: Vec<Point>,
    pub label_anchor: Point,
}

impl Route {
    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }
}

/// Route `rel` against the entities of `schema`.
pub fn route(schema: &Schema, rel: &Relationship) -> Result<Route, RouteError> {
    let lookup = |name: &str| {
        schema
            .entity(name)
            .ok_or_else(|| RouteError::DanglingRelationship {
                label: rel.label.replace('\n', " "),
                missing: name.to_string(),
            })
    };
    let source = lookup(&rel.from)?;
    let target = lookup(&rel.to)?;
    Ok(route_between(source, target, rel))
}

/// Route every relationship in declaration order.
pub fn route_all(schema: &Schema) -> Result<Vec<Route>, RouteError> {
    schema.relationships.iter().map(|rel| route(schema, rel)).collect()
}

pub fn route_between(source: &Entity, target: &Entity, rel: &Relationship) -> Route {
    let from = anchor_point(source, rel.from_side).offset(0.0, rel.offset_y);
    let to = anchor_point(target, rel.to_side).offset(0.0, rel.offset_y);

    let route = if rel.curved {
        curved(from, to)
    } else if rel.from_side.is_horizontal() && rel.to_side.is_horizontal() {
        Route {
            shape: PathShape::Straight,
            points: vec![from, to],
            label_anchor: offset_along_normal(from, to, STRAIGHT_LABEL_OFFSET),
        }
    } else if rel.from_side == AnchorSide::Bottom && rel.to_side == AnchorSide::Top {
        orthogonal(from, to)
    } else {
        Route {
            shape: PathShape::Straight,
            points: vec![from, to],
            label_anchor: from.midpoint(to).offset(0.0, FALLBACK_LABEL_LIFT),
        }
    };

    debug!(
        from = %rel.from,
        to = %rel.to,
        shape = ?route.shape,
        points = route.points.len(),
        "routed relationship"
    );
    route
}

fn curved(from: Point, to: Point) -> Route {
    let control = Point::new((from.x + to.x) / 2.0, from.y.max(to.y) + CURVE_RISE);
    let last = (CURVE_SAMPLES - 1) as f32;
    let points = (0..CURVE_SAMPLES)
        .map(|i| quadratic_bezier(from, control, to, i as f32 / last))
        .collect();

    Route {
        shape: PathShape::Curve,
        points,
        label_anchor: quadratic_bezier(from, control, to, 0.5).offset(0.0, CURVE_LABEL_LIFT),
    }
}

/// Down from the source, across at the vertical midpoint, down into the target.
fn orthogonal(from: Point, to: Point) -> Route {
    let mid_y = (from.y + to.y) / 2.0;
    let bend_a = Point::new(from.x, mid_y);
    let bend_b = Point::new(to.x, mid_y);
    Route {
        shape: PathShape::Orthogonal,
        points: vec![from, bend_a, bend_b, to],
        label_anchor: bend_a.midpoint(bend_b),
    }
}

pub fn quadratic_bezier(p0: Point, control: Point, p1: Point, t: f32) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * control.x + t * t * p1.x,
        u * u * p0.y + 2.0 * u * t * control.y + t * t * p1.y,
    )
}

/// Midpoint of the segment pushed `distance` along its upward-facing normal.
fn offset_along_normal(from: Point, to: Point, distance: f32) -> Point {
    let mid = from.midpoint(to);
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < f32::EPSILON {
        return mid.offset(0.0, distance);
    }
    let (mut nx, mut ny) = (-dy / len, dx / len);
    if ny < 0.0 {
        nx = -nx;
        ny = -ny;
    }
    mid.offset(nx * distance, ny * distance)
}

/// Stroke used for a connector of the given cardinality.
pub fn connector_stroke(theme: &Theme, cardinality: Cardinality) -> &StrokeStyle {
    match cardinality {
        Cardinality::OneToOne => &theme.connectors.one_to_one,
        Cardinality::OneToMany => &theme.connectors.one_to_many,
    }
}
