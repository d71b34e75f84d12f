use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The geometric capability evidence sources rely on.
///
/// Implementations must be safe to read concurrently. Evidence sources never mutate geometries.
pub trait Geometry {
    /// The scalar distance between two geometries.
    fn distance(&self, other: &Self) -> f64;

    /// The principal direction of the geometry in radians within `[0, π)`, or `None` if the geometry has no
    /// meaningful direction.
    fn orientation(&self) -> Option<f64>;
}

/// A feature from one of the datasets being matched: an identity and a geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature<G = Shape> {
    pub id: String,
    pub geometry: G,
}

impl<G> Feature<G> {
    pub fn new(id: impl Into<String>, geometry: G) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

/// A planar geometry, serialized the way GeoJSON geometries are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Shape {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
}

impl Shape {
    fn vertices(&self) -> &[[f64; 2]] {
        match self {
            Shape::Point(p) => std::slice::from_ref(p),
            Shape::LineString(points) => points,
        }
    }
}

fn point_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn point_segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let length_squared = dx * dx + dy * dy;
    if length_squared == 0.0 {
        return point_distance(p, a);
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / length_squared).clamp(0.0, 1.0);
    point_distance(p, [a[0] + t * dx, a[1] + t * dy])
}

fn segments_cross(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> bool {
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn segment_distance(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> f64 {
    if segments_cross(a, b, c, d) {
        return 0.0;
    }
    point_segment_distance(a, c, d)
        .min(point_segment_distance(b, c, d))
        .min(point_segment_distance(c, a, b))
        .min(point_segment_distance(d, a, b))
}

/// Splits a vertex list into segments, a single vertex becoming a degenerate segment.
fn segments(vertices: &[[f64; 2]]) -> Vec<([f64; 2], [f64; 2])> {
    match vertices {
        [] => vec![],
        [single] => vec![(*single, *single)],
        _ => vertices.windows(2).map(|w| (w[0], w[1])).collect(),
    }
}

impl Geometry for Shape {
    /// The minimum Euclidean distance between the two geometries, infinite if either has no vertices.
    fn distance(&self, other: &Self) -> f64 {
        let left = segments(self.vertices());
        let right = segments(other.vertices());
        left.iter()
            .flat_map(|(a, b)| right.iter().map(|(c, d)| segment_distance(*a, *b, *c, *d)))
            .fold(f64::INFINITY, f64::min)
    }

    /// The direction from the first to the last vertex of a line string.
    fn orientation(&self) -> Option<f64> {
        match self.vertices() {
            [first, .., last] if point_distance(*first, *last) > 0.0 => {
                Some((last[1] - first[1]).atan2(last[0] - first[0]).rem_euclid(PI))
            }
            _ => None,
        }
    }
}

/// The acute angle in degrees between two orientations expressed in radians within `[0, π)`.
pub fn orientation_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(PI);
    d.min(PI - d).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_to_point() {
        let a = Shape::Point([0.0, 0.0]);
        let b = Shape::Point([3.0, 4.0]);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_eq!(a.orientation(), None);
    }

    #[test]
    fn point_to_line() {
        let p = Shape::Point([5.0, 2.0]);
        let line = Shape::LineString(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]);
        assert_relative_eq!(p.distance(&line), 2.0);
        assert_relative_eq!(line.distance(&p), 2.0);
        let beyond = Shape::Point([-3.0, 4.0]);
        assert_relative_eq!(beyond.distance(&line), 5.0);
    }

    #[test]
    fn line_to_line() {
        let a = Shape::LineString(vec![[0.0, 0.0], [10.0, 0.0]]);
        let parallel = Shape::LineString(vec![[0.0, 3.0], [10.0, 3.0]]);
        let crossing = Shape::LineString(vec![[5.0, -5.0], [5.0, 5.0]]);
        assert_relative_eq!(a.distance(&parallel), 3.0);
        assert_relative_eq!(a.distance(&crossing), 0.0);
        assert_eq!(a.distance(&Shape::LineString(vec![])), f64::INFINITY);
    }

    #[test]
    fn orientation_of_lines() {
        let east = Shape::LineString(vec![[0.0, 0.0], [10.0, 0.0]]);
        let west = Shape::LineString(vec![[10.0, 0.0], [0.0, 0.0]]);
        let north_east = Shape::LineString(vec![[0.0, 0.0], [5.0, 5.0]]);
        let closed = Shape::LineString(vec![[0.0, 0.0], [5.0, 5.0], [0.0, 0.0]]);
        assert_relative_eq!(east.orientation().unwrap(), 0.0);
        assert_relative_eq!(west.orientation().unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(north_east.orientation().unwrap(), PI / 4.0, epsilon = 1e-12);
        assert_eq!(closed.orientation(), None);
    }

    #[test]
    fn orientation_difference_is_acute() {
        assert_relative_eq!(orientation_difference(0.0, PI / 2.0), 90.0, epsilon = 1e-9);
        assert_relative_eq!(orientation_difference(0.1, PI - 0.1), 0.2f64.to_degrees(), epsilon = 1e-9);
        assert_relative_eq!(orientation_difference(PI / 4.0, PI / 4.0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn deserialize_geojson_like() -> Result<(), serde_json::Error> {
        let feature: Feature = serde_json::from_str(
            r#"{"id": "road-1", "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}"#,
        )?;
        assert_eq!(feature.id, "road-1");
        assert_eq!(
            feature.geometry,
            Shape::LineString(vec![[0.0, 0.0], [1.0, 1.0]])
        );
        Ok(())
    }
}
