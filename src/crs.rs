//! Coordinate reference systems used by the Berlin boundary datasets.
//!
//! Only the handful of systems the inputs actually come in are supported:
//! geographic WGS84/ETRS89 (EPSG:4326, EPSG:4258), UTM zones on ETRS89 or
//! WGS84 (EPSG:258zz, EPSG:326zz, EPSG:327zz) and ETRS89 Lambert Azimuthal
//! Equal Area (EPSG:3035). ETRS89 and WGS84 are treated as coincident datums.

use crate::error::PipelineError;
use geo::{Coord, MapCoords, MultiPolygon};
use std::fmt;
use std::str::FromStr;

const MAX_ITERATIONS: usize = 16;
const TOLERANCE: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    Etrs89,
    Wgs84,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    /// Longitude/latitude in degrees.
    Geographic,
    Utm { zone: u8, north: bool, datum: Datum },
    /// ETRS89-extended / LAEA Europe.
    Laea,
}

impl Crs {
    pub const WGS84: Crs = Crs::Geographic;
    pub const EQUAL_AREA: Crs = Crs::Laea;

    pub fn epsg(&self) -> u32 {
        match *self {
            Crs::Geographic => 4326,
            Crs::Laea => 3035,
            Crs::Utm { zone, datum: Datum::Etrs89, .. } => 25800 + zone as u32,
            Crs::Utm { zone, north: true, datum: Datum::Wgs84 } => 32600 + zone as u32,
            Crs::Utm { zone, north: false, datum: Datum::Wgs84 } => 32700 + zone as u32,
        }
    }

    pub fn from_epsg(code: u32) -> Result<Crs, PipelineError> {
        let utm = |base: u32, north: bool, datum: Datum| Crs::Utm {
            zone: (code - base) as u8,
            north,
            datum,
        };
        match code {
            4326 | 4258 => Ok(Crs::Geographic),
            3035 => Ok(Crs::Laea),
            25801..=25860 => Ok(utm(25800, true, Datum::Etrs89)),
            32601..=32660 => Ok(utm(32600, true, Datum::Wgs84)),
            32701..=32760 => Ok(utm(32700, false, Datum::Wgs84)),
            _ => Err(PipelineError::UnknownCrs(format!("EPSG:{code}"))),
        }
    }

    /// Detects the CRS described by the WKT of a Shapefile `.prj` sidecar.
    ///
    /// Both OGC WKT (with `AUTHORITY` codes) and the ESRI dialect (names only)
    /// are recognised.
    pub fn from_wkt(wkt: &str) -> Result<Crs, PipelineError> {
        let norm = wkt.to_uppercase().replace(' ', "_");

        // Only an authority directly inside the outermost node names the CRS
        // itself; nested ones belong to its base GEOGCS, DATUM or UNIT.
        if let Some(code) = top_level_authority(&norm) {
            return Crs::from_epsg(code);
        }

        if norm.contains("LAMBERT_AZIMUTHAL_EQUAL_AREA") || norm.contains("LAEA_EUROPE") {
            return Ok(Crs::Laea);
        }
        if let Some(pos) = norm.find("UTM_ZONE_") {
            let rest = &norm[pos + "UTM_ZONE_".len()..];
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            let zone: u8 = digits
                .parse()
                .ok()
                .filter(|z| (1..=60).contains(z))
                .ok_or_else(|| PipelineError::UnknownCrs(truncate(wkt)))?;
            let north = !rest[digits.len()..].starts_with('S');
            let datum = if norm.contains("ETRS") {
                Datum::Etrs89
            } else {
                Datum::Wgs84
            };
            return Ok(Crs::Utm { zone, north, datum });
        }
        if norm.starts_with("GEOGCS") || norm.starts_with("GEOGCRS") || norm.starts_with("GEODCRS") {
            return Ok(Crs::Geographic);
        }
        Err(PipelineError::UnknownCrs(truncate(wkt)))
    }

    fn projection(&self) -> Projection {
        match *self {
            Crs::Geographic => Projection::Identity,
            Crs::Laea => Projection::Laea(LambertAzimuthal::etrs89_europe()),
            Crs::Utm { zone, north, datum } => {
                Projection::TransverseMercator(TransverseMercator::utm(zone, north, datum))
            }
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = PipelineError;

    /// Accepts `EPSG:nnnn`, a bare code, or the URN forms found in GeoJSON `crs` members.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Crs::Geographic);
        }
        let code = upper.rsplit(':').next().unwrap_or_default();
        code.parse::<u32>()
            .map_err(|_| PipelineError::UnknownCrs(s.to_string()))
            .and_then(Crs::from_epsg)
    }
}

/// EPSG code of an `AUTHORITY["EPSG",..]` or `ID["EPSG",..]` node that is a
/// direct child of the outermost node.
fn top_level_authority(norm: &str) -> Option<u32> {
    let mut depth = 0usize;
    for (i, c) in norm.char_indices() {
        match c {
            '[' | '(' => {
                if depth == 1 {
                    let head = &norm[..i];
                    let keyword_start = head
                        .rfind(|c: char| !c.is_ascii_uppercase())
                        .map_or(0, |p| p + 1);
                    if matches!(&head[keyword_start..], "AUTHORITY" | "ID") {
                        if let Some(code) = epsg_code(&norm[i + 1..]) {
                            return Some(code);
                        }
                    }
                }
                depth += 1;
            }
            ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Reads `"EPSG","3035"` or `"EPSG",3035` at the start of an authority body.
fn epsg_code(body: &str) -> Option<u32> {
    let rest = body.trim_start_matches('_').strip_prefix("\"EPSG\",")?;
    let digits: String = rest
        .trim_start_matches(['"', '_'])
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn truncate(wkt: &str) -> String {
    wkt.chars().take(80).collect()
}

#[derive(Debug, Clone, Copy)]
struct Ellipsoid {
    a: f64,
    f: f64,
}

impl Ellipsoid {
    const GRS80: Ellipsoid = Ellipsoid { a: 6_378_137.0, f: 1.0 / 298.257_222_101 };
    const WGS84: Ellipsoid = Ellipsoid { a: 6_378_137.0, f: 1.0 / 298.257_223_563 };

    fn of(datum: Datum) -> Ellipsoid {
        match datum {
            Datum::Etrs89 => Ellipsoid::GRS80,
            Datum::Wgs84 => Ellipsoid::WGS84,
        }
    }

    fn e(&self) -> f64 {
        (self.f * (2.0 - self.f)).sqrt()
    }
}

enum Projection {
    Identity,
    TransverseMercator(TransverseMercator),
    Laea(LambertAzimuthal),
}

impl Projection {
    /// (lon, lat) in degrees to projected (x, y).
    fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Projection::Identity => c,
            Projection::TransverseMercator(tm) => tm.forward(c),
            Projection::Laea(laea) => laea.forward(c),
        }
    }

    fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        match self {
            Projection::Identity => c,
            Projection::TransverseMercator(tm) => tm.inverse(c),
            Projection::Laea(laea) => laea.inverse(c),
        }
    }
}

/// Transverse Mercator using the 6th order Krüger series.
struct TransverseMercator {
    e: f64,
    k0a: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl TransverseMercator {
    fn utm(zone: u8, north: bool, datum: Datum) -> Self {
        let ell = Ellipsoid::of(datum);
        let n = ell.f / (2.0 - ell.f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let big_a = ell.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);
        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0 - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1_983_433.0 * n6 / 1_935_360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15061.0 * n5 / 26880.0
                + 167_603.0 * n6 / 181_440.0,
            49561.0 * n4 / 161_280.0 - 179.0 * n5 / 168.0 + 6_601_661.0 * n6 / 7_257_600.0,
            34729.0 * n5 / 80640.0 - 3_418_889.0 * n6 / 1_995_840.0,
            212_378_941.0 * n6 / 319_334_400.0,
        ];
        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96199.0 * n6 / 604_800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1_118_711.0 * n6 / 3_870_720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
            4397.0 * n4 / 161_280.0 - 11.0 * n5 / 504.0 - 830_251.0 * n6 / 7_257_600.0,
            4583.0 * n5 / 161_280.0 - 108_847.0 * n6 / 3_991_680.0,
            20_648_693.0 * n6 / 638_668_800.0,
        ];

        TransverseMercator {
            e: ell.e(),
            k0a: 0.9996 * big_a,
            alpha,
            beta,
            lon0: zone as f64 * 6.0 - 183.0,
            false_easting: 500_000.0,
            false_northing: if north { 0.0 } else { 10_000_000.0 },
        }
    }

    fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let lam = (c.x - self.lon0).to_radians();
        let tau_p = conformal_tau(c.y.to_radians().tan(), self.e);
        let xi_p = tau_p.atan2(lam.cos());
        let eta_p = (lam.sin() / tau_p.hypot(lam.cos())).asinh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        Coord {
            x: self.false_easting + self.k0a * eta,
            y: self.false_northing + self.k0a * xi,
        }
    }

    fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        let xi = (c.y - self.false_northing) / self.k0a;
        let eta = (c.x - self.false_easting) / self.k0a;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let tau_p = xi_p.sin() / eta_p.sinh().hypot(xi_p.cos());
        let lam = eta_p.sinh().atan2(xi_p.cos());
        let tau = geodetic_tau(tau_p, self.e);

        Coord {
            x: self.lon0 + lam.to_degrees(),
            y: tau.atan().to_degrees(),
        }
    }
}

/// tan of the conformal latitude for tan of the geodetic latitude.
fn conformal_tau(tau: f64, e: f64) -> f64 {
    let sigma = (e * (e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
    tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt()
}

/// Inverse of [`conformal_tau`] by Newton iteration.
fn geodetic_tau(tau_p: f64, e: f64) -> f64 {
    let e2m = 1.0 - e * e;
    let mut tau = tau_p;
    for _ in 0..MAX_ITERATIONS {
        let tau_i = conformal_tau(tau, e);
        let dtau = (tau_p - tau_i) / (1.0 + tau_i * tau_i).sqrt() * (1.0 + e2m * tau * tau)
            / (e2m * (1.0 + tau * tau).sqrt());
        tau += dtau;
        if dtau.abs() <= TOLERANCE * tau.abs().max(1.0) {
            break;
        }
    }
    tau
}

/// Ellipsoidal Lambert Azimuthal Equal Area.
struct LambertAzimuthal {
    e: f64,
    e2: f64,
    qp: f64,
    rq: f64,
    d: f64,
    sin_beta0: f64,
    cos_beta0: f64,
    lat0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
}

impl LambertAzimuthal {
    fn etrs89_europe() -> Self {
        let ell = Ellipsoid::GRS80;
        let lat0: f64 = 52.0;
        let e = ell.e();
        let e2 = e * e;
        let qp = authalic_q(1.0, e);
        let phi0 = lat0.to_radians();
        let beta0 = (authalic_q(phi0.sin(), e) / qp).asin();
        let rq = ell.a * (qp / 2.0).sqrt();
        let m0 = phi0.cos() / (1.0 - e2 * phi0.sin().powi(2)).sqrt();
        let d = ell.a * m0 / (rq * beta0.cos());

        LambertAzimuthal {
            e,
            e2,
            qp,
            rq,
            d,
            sin_beta0: beta0.sin(),
            cos_beta0: beta0.cos(),
            lat0,
            lon0: 10.0,
            false_easting: 4_321_000.0,
            false_northing: 3_210_000.0,
        }
    }

    fn forward(&self, c: Coord<f64>) -> Coord<f64> {
        let lam = (c.x - self.lon0).to_radians();
        let q = authalic_q(c.y.to_radians().sin(), self.e);
        let beta = (q / self.qp).clamp(-1.0, 1.0).asin();
        let b = self.rq
            * (2.0 / (1.0 + self.sin_beta0 * beta.sin() + self.cos_beta0 * beta.cos() * lam.cos()))
                .sqrt();

        Coord {
            x: self.false_easting + b * self.d * beta.cos() * lam.sin(),
            y: self.false_northing
                + (b / self.d)
                    * (self.cos_beta0 * beta.sin() - self.sin_beta0 * beta.cos() * lam.cos()),
        }
    }

    fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        let dx = c.x - self.false_easting;
        let dy = c.y - self.false_northing;
        let rho = ((dx / self.d).powi(2) + (self.d * dy).powi(2)).sqrt();
        if rho < 1e-9 {
            return Coord { x: self.lon0, y: self.lat0 };
        }

        let ce = 2.0 * (rho / (2.0 * self.rq)).clamp(-1.0, 1.0).asin();
        let beta = (ce.cos() * self.sin_beta0 + self.d * dy * ce.sin() * self.cos_beta0 / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lam = (dx * ce.sin()).atan2(
            self.d * rho * self.cos_beta0 * ce.cos()
                - self.d * self.d * dy * self.sin_beta0 * ce.sin(),
        );

        Coord {
            x: self.lon0 + lam.to_degrees(),
            y: self.geodetic_latitude(self.qp * beta.sin()).to_degrees(),
        }
    }

    /// Latitude (radians) whose authalic `q` equals the given value.
    fn geodetic_latitude(&self, q: f64) -> f64 {
        let mut phi = (q / 2.0).clamp(-1.0, 1.0).asin();
        for _ in 0..MAX_ITERATIONS {
            let sin_phi = phi.sin();
            let cos_phi = phi.cos();
            if cos_phi.abs() < TOLERANCE {
                break;
            }
            let es = self.e * sin_phi;
            let one = 1.0 - es * es;
            let dphi = one * one / (2.0 * cos_phi)
                * (q / (1.0 - self.e2) - sin_phi / one
                    + (1.0 / (2.0 * self.e)) * ((1.0 - es) / (1.0 + es)).ln());
            phi += dphi;
            if dphi.abs() <= TOLERANCE {
                break;
            }
        }
        phi
    }
}

fn authalic_q(sin_phi: f64, e: f64) -> f64 {
    let es = e * sin_phi;
    (1.0 - e * e) * (sin_phi / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

/// Converts coordinates between two reference systems through geographic coordinates.
pub struct Transformer {
    from: Projection,
    to: Projection,
}

impl Transformer {
    pub fn new(from: Crs, to: Crs) -> Self {
        Transformer {
            from: from.projection(),
            to: to.projection(),
        }
    }

    pub fn convert(&self, c: Coord<f64>) -> Coord<f64> {
        self.to.forward(self.from.inverse(c))
    }
}

pub fn reproject(geometry: &MultiPolygon<f64>, from: Crs, to: Crs) -> MultiPolygon<f64> {
    if from == to {
        return geometry.clone();
    }
    let transformer = Transformer::new(from, to);
    geometry.map_coords(|c| transformer.convert(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    const UTM33: Crs = Crs::Utm {
        zone: 33,
        north: true,
        datum: Datum::Etrs89,
    };

    fn assert_close(actual: Coord<f64>, expected: Coord<f64>, tol: f64) {
        assert!(
            (actual.x - expected.x).abs() <= tol && (actual.y - expected.y).abs() <= tol,
            "{actual:?} != {expected:?} (tolerance {tol})"
        );
    }

    #[test]
    fn laea_natural_origin_maps_to_false_origin() {
        let t = Transformer::new(Crs::Geographic, Crs::Laea);
        let p = t.convert(Coord { x: 10.0, y: 52.0 });
        assert_close(p, Coord { x: 4_321_000.0, y: 3_210_000.0 }, 1e-6);
    }

    #[test]
    fn laea_matches_published_example() {
        let t = Transformer::new(Crs::Geographic, Crs::Laea);
        let p = t.convert(Coord { x: 5.0, y: 50.0 });
        assert_close(p, Coord { x: 3_962_799.45, y: 2_999_718.85 }, 0.01);
    }

    #[test]
    fn utm_central_meridian_on_equator() {
        let t = Transformer::new(Crs::Geographic, UTM33);
        let p = t.convert(Coord { x: 15.0, y: 0.0 });
        assert_close(p, Coord { x: 500_000.0, y: 0.0 }, 1e-6);
    }

    #[test]
    fn utm_is_symmetric_about_central_meridian() {
        let t = Transformer::new(Crs::Geographic, UTM33);
        let east = t.convert(Coord { x: 16.5, y: 52.5 });
        let west = t.convert(Coord { x: 13.5, y: 52.5 });
        assert!((east.x - 500_000.0 + (west.x - 500_000.0)).abs() < 1e-6);
        assert!((east.y - west.y).abs() < 1e-6);
        // Berlin sits roughly 390 km east, 5.8 Mm north in zone 33.
        assert!((350_000.0..420_000.0).contains(&west.x));
        assert!((5_800_000.0..5_830_000.0).contains(&west.y));
    }

    #[test]
    fn projection_round_trip_preserves_points() {
        for crs in [Crs::Laea, UTM33] {
            let there = Transformer::new(Crs::Geographic, crs);
            let back = Transformer::new(crs, Crs::Geographic);
            for lon in [12.9, 13.1, 13.4, 13.76, 15.0, 17.2] {
                for lat in [52.3, 52.5, 52.68, 48.0, 60.0] {
                    let start = Coord { x: lon, y: lat };
                    let end = back.convert(there.convert(start));
                    assert_close(end, start, 1e-9);
                }
            }
        }
    }

    #[test]
    fn reproject_between_projected_systems() {
        let square = polygon![
            (x: 13.3, y: 52.4), (x: 13.5, y: 52.4), (x: 13.5, y: 52.6), (x: 13.3, y: 52.6)
        ];
        let mp = MultiPolygon::new(vec![square]);
        let utm = reproject(&mp, Crs::Geographic, UTM33);
        let laea = reproject(&utm, UTM33, Crs::Laea);
        let back = reproject(&laea, Crs::Laea, Crs::Geographic);
        for (a, b) in mp.0[0].exterior().coords().zip(back.0[0].exterior().coords()) {
            assert_close(*a, *b, 1e-9);
        }
    }

    #[test]
    fn parses_epsg_strings() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::Geographic);
        assert_eq!("epsg:3035".parse::<Crs>().unwrap(), Crs::Laea);
        assert_eq!("urn:ogc:def:crs:EPSG::25833".parse::<Crs>().unwrap(), UTM33);
        assert_eq!("urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(), Crs::Geographic);
        assert!("EPSG:3068".parse::<Crs>().is_err());
        assert_eq!(UTM33.to_string(), "EPSG:25833");
    }

    #[test]
    fn detects_esri_prj() {
        let wkt = r#"PROJCS["ETRS_1989_UTM_Zone_33N",GEOGCS["GCS_ETRS_1989",DATUM["D_ETRS_1989",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",15.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;
        assert_eq!(Crs::from_wkt(wkt).unwrap(), UTM33);

        let geog = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(Crs::from_wkt(geog).unwrap(), Crs::Geographic);
    }

    #[test]
    fn detects_ogc_prj_by_authority() {
        let wkt = r#"PROJCS["ETRS89-extended / LAEA Europe",GEOGCS["ETRS89",AUTHORITY["EPSG","4258"]],PROJECTION["Lambert_Azimuthal_Equal_Area"],AUTHORITY["EPSG","3035"]]"#;
        assert_eq!(Crs::from_wkt(wkt).unwrap(), Crs::Laea);
        assert!(Crs::from_wkt("LOCAL_CS[\"Soldner Berlin\"]").is_err());
    }

    #[test]
    fn unsupported_projected_crs_is_not_mistaken_for_its_base() {
        let web_mercator = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["Easting",EAST],AXIS["Northing",NORTH],EXTENSION["PROJ4","+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs"],AUTHORITY["EPSG","3857"]]"#;
        let err = Crs::from_wkt(web_mercator).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownCrs(_)), "{err}");

        // No outer authority and no recognised projection name.
        let unnamed = r#"PROJCS["Soldner Berlin",GEOGCS["DHDN",AUTHORITY["EPSG","4314"]],PROJECTION["Cassini_Soldner"]]"#;
        assert!(Crs::from_wkt(unnamed).is_err());
        let esri_base = r#"PROJCS["Custom",GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"]]"#;
        assert!(Crs::from_wkt(esri_base).is_err());
    }

    #[test]
    fn wkt2_id_and_spaced_authority_are_read() {
        let wkt2 = r#"PROJCRS["ETRS89 / UTM zone 33N",BASEGEOGCRS["ETRS89",ID["EPSG",4258]],CONVERSION["UTM zone 33N",METHOD["Transverse Mercator"]],ID["EPSG",25833]]"#;
        assert_eq!(Crs::from_wkt(wkt2).unwrap(), UTM33);
        let spaced = r#"GEOGCS["ETRS89", AUTHORITY["EPSG", "4258"]]"#;
        assert_eq!(Crs::from_wkt(spaced).unwrap(), Crs::Geographic);
    }
}
