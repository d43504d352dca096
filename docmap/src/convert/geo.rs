use std::fmt::{Display, Formatter};

use crate::common::EARTH_MEAN_RADIUS;
use crate::convert::converter::unreadable;
use crate::convert::{ConverterRegistry, TypeConverter};
use crate::document::{Document, Value};
use crate::errors::{ErrorKind, MapperError, MapperResult};

/// A point on the earth's surface in degrees.
///
/// Coordinates are normalized on construction: the latitude is clamped to
/// `[-90, 90]` and the longitude wrapped into `[-180, 180]`. A NaN or
/// infinite coordinate is rejected. The default point is `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

fn normalize_longitude(lng: f64) -> f64 {
    if !lng.is_finite() {
        return f64::NAN;
    }
    let wrapped = lng % 360.0;
    if wrapped > 180.0 {
        -180.0 + (wrapped - 180.0)
    } else if wrapped < -180.0 {
        180.0 + (wrapped + 180.0)
    } else {
        wrapped
    }
}

fn normalize_latitude(lat: f64) -> f64 {
    if !lat.is_finite() {
        return f64::NAN;
    }
    lat.clamp(-90.0, 90.0)
}

fn normalize_bearing(bearing: f64) -> f64 {
    if !bearing.is_finite() {
        return f64::NAN;
    }
    let wrapped = bearing % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

fn not_a_point(reason: &str) -> MapperError {
    log::error!("Not a geo point: {}", reason);
    MapperError::new(&format!("Not a geo point: {}", reason), ErrorKind::ConversionError)
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> MapperResult<GeoPoint> {
        let lat = normalize_latitude(lat);
        let lng = normalize_longitude(lng);
        if lat.is_nan() || lng.is_nan() {
            return Err(not_a_point("coordinates must be finite numbers"));
        }
        Ok(GeoPoint { lat, lng })
    }

    pub fn latitude(&self) -> f64 {
        self.lat
    }

    pub fn longitude(&self) -> f64 {
        self.lng
    }

    /// Great-circle distance in meters, by the haversine formula.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (lat2 - lat1).abs();
        let d_lng = (other.lng - self.lng).to_radians().abs();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * a.sqrt().atan2((1.0 - a).sqrt()) * EARTH_MEAN_RADIUS
    }

    /// Initial bearing toward `other`, in degrees within `[0, 360)`.
    pub fn bearing_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let a = d_lng.sin() * lat2.cos();
        let b = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
        normalize_bearing(a.atan2(b).to_degrees())
    }

    /// The stored form, `{lng, lat}`.
    pub fn to_document(&self) -> Document {
        let document = Document::new();
        // keys are literal and non-empty
        let _ = document.put("lng", self.lng);
        let _ = document.put("lat", self.lat);
        document
    }

    /// Reads a `[lng, lat]` list or a document keyed `lng`/`lat`,
    /// `lon`/`lat` or `longitude`/`latitude`.
    ///
    /// Any other document fails, including two-key documents with
    /// unrecognized names.
    pub fn from_value(value: &Value) -> MapperResult<GeoPoint> {
        match value {
            Value::List(list) => {
                let lng = coordinate(&list.get_at(0)?)?;
                let lat = coordinate(&list.get_at(1)?)?;
                GeoPoint::new(lat, lng)
            }
            Value::Document(document) => {
                for (lng_key, lat_key) in [("lng", "lat"), ("lon", "lat"), ("longitude", "latitude")] {
                    if document.contains(lng_key)? && document.contains(lat_key)? {
                        let lng = coordinate(&document.get(lng_key)?)?;
                        let lat = coordinate(&document.get(lat_key)?)?;
                        return GeoPoint::new(lat, lng);
                    }
                }
                Err(not_a_point("no longitude/latitude keys"))
            }
            other => Err(unreadable::<GeoPoint>(other)),
        }
    }
}

fn coordinate(value: &Value) -> MapperResult<f64> {
    value
        .as_number()
        .ok_or_else(|| not_a_point(&format!("coordinate is a {}", value.kind_name())))
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ lat: {}, lng: {} }}", self.lat, self.lng)
    }
}

/// Stores a [`GeoPoint`] as a `{lng, lat}` document.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoPointConverter;

impl TypeConverter<GeoPoint> for GeoPointConverter {
    fn to_value(&self, value: &GeoPoint) -> MapperResult<Value> {
        Ok(Value::Document(value.to_document()))
    }

    fn from_value(&self, value: &Value) -> MapperResult<GeoPoint> {
        GeoPoint::from_value(value)
    }
}

pub(crate) fn register_all(registry: &mut ConverterRegistry) {
    registry.register::<GeoPoint, _>(GeoPointConverter);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_normalization() {
        let p = GeoPoint::new(95.0, 190.0).unwrap();
        assert_eq!(p.latitude(), 90.0);
        assert_eq!(p.longitude(), -170.0);

        let p = GeoPoint::new(-100.0, -200.0).unwrap();
        assert_eq!(p.latitude(), -90.0);
        assert_eq!(p.longitude(), 160.0);

        let p = GeoPoint::new(10.0, 540.0).unwrap();
        assert_eq!(p.longitude(), 180.0);
    }

    #[test]
    fn test_nan_rejected() {
        let err = GeoPoint::new(f64::NAN, 0.0).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConversionError);
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_stored_form() {
        let p = GeoPoint::new(1.5, 2.5).unwrap();
        let stored = GeoPointConverter.to_value(&p).unwrap();
        assert_eq!(stored, Value::Document(doc! { lng: 2.5, lat: 1.5 }));
        assert_eq!(GeoPointConverter.from_value(&stored).unwrap(), p);
    }

    #[test]
    fn test_reads_alternative_shapes() {
        let expected = GeoPoint::new(10.0, 20.0).unwrap();
        let shapes = vec![
            Value::List(vec![Value::F64(20.0), Value::I32(10)].into_iter().collect()),
            Value::Document(doc! { lon: 20, lat: 10 }),
            Value::Document(doc! { latitude: 10.0, longitude: 20.0 }),
        ];
        for shape in shapes {
            assert_eq!(GeoPoint::from_value(&shape).unwrap(), expected);
        }
    }

    #[test]
    fn test_two_unknown_keys_always_fail() {
        let err = GeoPoint::from_value(&Value::Document(doc! { x: 1.0, y: 2.0 })).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConversionError);
        assert!(GeoPoint::from_value(&Value::Document(doc! { a: 1 })).is_err());
    }

    #[test]
    fn test_distance_and_bearing() {
        let london = GeoPoint::new(51.5074, -0.1278).unwrap();
        let paris = GeoPoint::new(48.8566, 2.3522).unwrap();
        let km = london.distance_to(&paris) / 1000.0;
        assert!((km - 343.5).abs() < 2.0, "distance was {}", km);

        let bearing = london.bearing_to(&paris);
        assert!((bearing - 148.0).abs() < 2.0, "bearing was {}", bearing);

        let north = GeoPoint::new(10.0, 0.0).unwrap();
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        assert!((origin.bearing_to(&north) - 0.0).abs() < 1e-9);
        assert_eq!(origin.distance_to(&origin), 0.0);
    }
}
