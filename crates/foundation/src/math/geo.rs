/// WGS84 semi-major axis (meters), used as the sphere radius for
/// great-circle math. Sub-meter accuracy is not required here: geographic
/// positions only place markers on the globe.
pub const WGS84_A: f64 = 6_378_137.0;

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPosition {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl GeoPosition {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    pub fn is_finite(self) -> bool {
        self.lat_deg.is_finite() && self.lon_deg.is_finite()
    }
}

/// Great-circle distance between two geographic positions (meters), via the
/// haversine formula.
pub fn haversine_distance_m(a: GeoPosition, b: GeoPosition) -> f64 {
    let lat_a = a.lat_deg.to_radians();
    let lat_b = b.lat_deg.to_radians();
    let d_lat = (b.lat_deg - a.lat_deg).to_radians();
    let d_lon = (b.lon_deg - a.lon_deg).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * WGS84_A * h.sqrt().min(1.0).asin()
}

/// Midpoint of the great-circle arc between two geographic positions.
///
/// Placement only; callers must not attach survey meaning to the result.
pub fn great_circle_midpoint(a: GeoPosition, b: GeoPosition) -> GeoPosition {
    let lat_a = a.lat_deg.to_radians();
    let lat_b = b.lat_deg.to_radians();
    let lon_a = a.lon_deg.to_radians();
    let d_lon = (b.lon_deg - a.lon_deg).to_radians();

    let bx = lat_b.cos() * d_lon.cos();
    let by = lat_b.cos() * d_lon.sin();

    let lat = (lat_a.sin() + lat_b.sin())
        .atan2(((lat_a.cos() + bx).powi(2) + by * by).sqrt());
    let lon = lon_a + by.atan2(lat_a.cos() + bx);

    GeoPosition::new(lat.to_degrees(), normalize_lon_deg(lon.to_degrees()))
}

fn normalize_lon_deg(lon: f64) -> f64 {
    let mut lon = (lon + 180.0) % 360.0;
    if lon < 0.0 {
        lon += 360.0;
    }
    lon - 180.0
}
