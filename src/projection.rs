//! Coordinate reference system descriptors and point transforms between them.
//!
//! Descriptors may be given as EPSG codes (`EPSG:3857`), proj4 strings
//! (`+proj=utm +zone=33 +datum=WGS84`) or WKT carrying an EPSG authority.
//! Codes are resolved through the `crs-definitions` registry and every
//! definition is handed to `proj4rs`, which does the actual projection math.

use proj4rs::Proj;
use regex::Regex;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

static AUTHORITY_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?<authority>[A-Z]+)\s*:\s*(?<code>\d+)$").expect("valid authority regex")
});

static WKT_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?i)(?<keyword>GEOGCS|GEOGCRS|GEODCRS|PROJCS|PROJCRS)\s*\[\s*"(?<name>[^"]*)""#)
        .expect("valid WKT head regex")
});

// The outermost authority is the last one before the closing bracket.
static WKT_AUTHORITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:AUTHORITY|ID)\s*\[\s*"EPSG"\s*,\s*"?(?<code>\d+)"?\s*\]\s*\]\s*$"#)
        .expect("valid WKT authority regex")
});

/// Errors that can occur when parsing or applying a projection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("projection descriptor is empty")]
    Empty,
    #[error("malformed projection descriptor: {0}")]
    Malformed(String),
    #[error("unknown authority code {authority}:{code}")]
    UnknownCode { authority: String, code: u32 },
    #[error("unsupported projection: {0}")]
    Unsupported(String),
    #[error("invalid proj4 definition '{definition}': {message}")]
    Definition { definition: String, message: String },
    #[error("cannot transform [{x}, {y}] from {from} to {to}: {message}")]
    Transform {
        x: f64,
        y: f64,
        from: ProjectionInfo,
        to: ProjectionInfo,
        message: String,
    },
    #[error("coordinate [{x}, {y}] is outside the domain of {projection}")]
    OutOfDomain {
        x: f64,
        y: f64,
        projection: ProjectionInfo,
    },
}

/// Descriptor of a coordinate reference system.
///
/// Two descriptors are equal when they name the same EPSG code, or, for
/// ad-hoc proj4 definitions, when their definitions match token for token.
/// Serializes as `EPSG:<code>` or as its proj4 string and deserializes from
/// any form accepted by [`ProjectionInfo::parse`].
#[derive(Clone, SerializeDisplay, DeserializeFromStr)]
pub struct ProjectionInfo {
    epsg: Option<u16>,
    proj4: String,
    proj: Arc<Proj>,
}

impl ProjectionInfo {
    /// Parses any of the supported textual descriptor forms.
    pub fn parse(text: &str) -> Result<Self, ProjectionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProjectionError::Empty);
        }

        if text.starts_with('+') {
            return Self::from_proj4(text);
        }

        if let Some(caps) = AUTHORITY_CODE.captures(text) {
            let authority = caps["authority"].to_ascii_uppercase();
            let code = caps["code"]
                .parse::<u32>()
                .map_err(|_| ProjectionError::Malformed(text.to_string()))?;
            return Self::from_code(&authority, code);
        }

        if WKT_HEAD.is_match(text) {
            return Self::from_wkt(text);
        }

        Err(ProjectionError::Malformed(text.to_string()))
    }

    /// Resolves an authority code. Only the EPSG registry is known.
    pub fn from_code(authority: &str, code: u32) -> Result<Self, ProjectionError> {
        let unknown = || ProjectionError::UnknownCode {
            authority: authority.to_string(),
            code,
        };

        if !authority.eq_ignore_ascii_case("EPSG") {
            return Err(unknown());
        }
        let code = u16::try_from(code).map_err(|_| unknown())?;
        Self::from_epsg(code).map_err(|err| match err {
            ProjectionError::UnknownCode { .. } => unknown(),
            other => other,
        })
    }

    pub fn from_epsg(code: u16) -> Result<Self, ProjectionError> {
        let definition = crs_definitions::from_code(code).ok_or(ProjectionError::UnknownCode {
            authority: "EPSG".to_string(),
            code: u32::from(code),
        })?;
        let proj4 = canonical_proj4(definition.proj4);
        Ok(Self {
            epsg: Some(code),
            proj: Arc::new(build(&proj4)?),
            proj4,
        })
    }

    fn from_proj4(text: &str) -> Result<Self, ProjectionError> {
        if text.split_whitespace().any(|token| !token.starts_with('+')) {
            return Err(ProjectionError::Malformed(text.to_string()));
        }
        let proj4 = canonical_proj4(text);
        Ok(Self {
            epsg: None,
            proj: Arc::new(build(&proj4)?),
            proj4,
        })
    }

    fn from_wkt(text: &str) -> Result<Self, ProjectionError> {
        if !brackets_balanced(text) {
            return Err(ProjectionError::Malformed("unbalanced brackets in WKT".to_string()));
        }

        match WKT_AUTHORITY.captures(text) {
            Some(caps) => {
                let code = caps["code"]
                    .parse::<u32>()
                    .map_err(|_| ProjectionError::Malformed(text.to_string()))?;
                Self::from_code("EPSG", code)
            }
            None => Err(ProjectionError::Unsupported(
                "WKT without an EPSG authority".to_string(),
            )),
        }
    }

    pub fn is_geographic(&self) -> bool {
        self.proj.is_latlong()
    }

    pub fn epsg(&self) -> Option<u16> {
        self.epsg
    }

    /// Registry name of an EPSG system, such as `WGS 84 / UTM zone 33N`.
    pub fn name(&self) -> Option<&'static str> {
        let definition = crs_definitions::from_code(self.epsg?)?;
        WKT_HEAD
            .captures(definition.wkt)
            .and_then(|caps| caps.name("name"))
            .map(|name| name.as_str())
    }

    pub fn to_proj4(&self) -> &str {
        &self.proj4
    }

    /// Moves a coordinate from this system into `target`.
    ///
    /// Geographic coordinates are longitude/latitude in degrees on both ends.
    pub fn transform(&self, target: &ProjectionInfo, coord: [f64; 2]) -> Result<[f64; 2], ProjectionError> {
        if self == target {
            return Ok(coord);
        }

        let [x, y] = coord;
        if !x.is_finite() || !y.is_finite() || (self.is_geographic() && y.abs() > 90.0) {
            return Err(self.out_of_domain(coord));
        }

        let mut point = if self.is_geographic() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };
        proj4rs::transform::transform(&self.proj, &target.proj, &mut point).map_err(|err| {
            ProjectionError::Transform {
                x,
                y,
                from: self.clone(),
                to: target.clone(),
                message: err.to_string(),
            }
        })?;

        let out = if target.is_geographic() {
            [point.0.to_degrees(), point.1.to_degrees()]
        } else {
            [point.0, point.1]
        };
        if !out[0].is_finite() || !out[1].is_finite() {
            return Err(target.out_of_domain(coord));
        }
        Ok(out)
    }

    fn out_of_domain(&self, coord: [f64; 2]) -> ProjectionError {
        ProjectionError::OutOfDomain {
            x: coord[0],
            y: coord[1],
            projection: self.clone(),
        }
    }
}

impl PartialEq for ProjectionInfo {
    fn eq(&self, other: &Self) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.proj4 == other.proj4,
            _ => false,
        }
    }
}

impl Eq for ProjectionInfo {}

impl Hash for ProjectionInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.epsg {
            Some(code) => code.hash(state),
            None => self.proj4.hash(state),
        }
    }
}

impl FromStr for ProjectionInfo {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ProjectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{code}"),
            None => f.write_str(&self.proj4),
        }
    }
}

impl fmt::Debug for ProjectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProjectionInfo").field(&self.to_string()).finish()
    }
}

fn build(proj4: &str) -> Result<Proj, ProjectionError> {
    Proj::from_proj_string(proj4).map_err(|err| ProjectionError::Definition {
        definition: proj4.to_string(),
        message: err.to_string(),
    })
}

/// Collapses runs of whitespace so equal definitions compare equal.
fn canonical_proj4(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn brackets_balanced(text: &str) -> bool {
    let mut depth = 0i32;
    let mut in_quotes = false;
    for c in text.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' | '(' if !in_quotes => depth += 1,
            ']' | ')' if !in_quotes => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !in_quotes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epsg(code: u16) -> ProjectionInfo {
        ProjectionInfo::from_epsg(code).unwrap()
    }

    fn assert_close(actual: [f64; 2], expected: [f64; 2], tolerance: f64) {
        assert!(
            (actual[0] - expected[0]).abs() < tolerance && (actual[1] - expected[1]).abs() < tolerance,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_parse_authority_codes() {
        assert_eq!("EPSG:4326".parse::<ProjectionInfo>().unwrap(), epsg(4326));
        assert_eq!("epsg:3857".parse::<ProjectionInfo>().unwrap(), epsg(3857));
        assert_eq!(ProjectionInfo::parse(" EPSG:32733 ").unwrap().epsg(), Some(32733));
        assert_eq!(
            ProjectionInfo::parse("ESRI:102100").unwrap_err(),
            ProjectionError::UnknownCode {
                authority: "ESRI".to_string(),
                code: 102100
            }
        );
        assert_eq!(
            ProjectionInfo::parse("EPSG:999999").unwrap_err(),
            ProjectionError::UnknownCode {
                authority: "EPSG".to_string(),
                code: 999999
            }
        );
    }

    #[test]
    fn test_parse_common_registry_codes() {
        // British National Grid, Lambert-93, NAD83.
        for code in [27700, 2154, 4269] {
            let projection = ProjectionInfo::parse(&format!("EPSG:{code}")).unwrap();
            assert_eq!(projection.epsg(), Some(code));
        }
        assert!(epsg(4269).is_geographic());
        assert!(!epsg(27700).is_geographic());
    }

    #[test]
    fn test_parse_proj4() {
        let geographic = ProjectionInfo::parse("+proj=longlat   +datum=WGS84 +no_defs").unwrap();
        assert!(geographic.is_geographic());
        assert_eq!(geographic.epsg(), None);
        assert_eq!(geographic.to_proj4(), "+proj=longlat +datum=WGS84 +no_defs");

        let lambert = ProjectionInfo::parse(
            "+proj=lcc +lat_1=49 +lat_2=44 +lat_0=46.5 +lon_0=3 +x_0=700000 +y_0=6600000 +ellps=GRS80 +units=m +no_defs",
        )
        .unwrap();
        assert!(!lambert.is_geographic());

        assert!(matches!(
            ProjectionInfo::parse("+proj=utm zone=32"),
            Err(ProjectionError::Malformed(_))
        ));
        assert!(matches!(
            ProjectionInfo::parse("+proj=nonexistent"),
            Err(ProjectionError::Definition { .. })
        ));
    }

    #[test]
    fn test_parse_wkt() {
        let geographic = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#;
        assert_eq!(ProjectionInfo::parse(geographic).unwrap(), epsg(4326));

        let mercator = r#"PROJCRS["WGS 84 / Pseudo-Mercator",BASEGEOGCRS["WGS 84"],ID["EPSG",3857]]"#;
        assert_eq!(ProjectionInfo::parse(mercator).unwrap(), epsg(3857));

        let esri = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert!(matches!(
            ProjectionInfo::parse(esri),
            Err(ProjectionError::Unsupported(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(ProjectionInfo::parse("   ").unwrap_err(), ProjectionError::Empty);
        assert!(matches!(
            ProjectionInfo::parse("not a projection"),
            Err(ProjectionError::Malformed(_))
        ));
        assert!(matches!(
            ProjectionInfo::parse(r#"GEOGCS["WGS 84",DATUM["WGS_1984""#),
            Err(ProjectionError::Malformed(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let custom = ProjectionInfo::parse("+proj=utm +zone=60 +south +datum=WGS84").unwrap();
        for projection in [epsg(4326), epsg(3857), epsg(32760), custom] {
            assert_eq!(projection.to_string().parse::<ProjectionInfo>().unwrap(), projection);
        }
        assert_eq!(epsg(32633).to_string(), "EPSG:32633");
    }

    #[test]
    fn test_registry_names() {
        assert_eq!(epsg(32633).name(), Some("WGS 84 / UTM zone 33N"));
        assert_eq!(ProjectionInfo::parse("+proj=longlat +datum=WGS84").unwrap().name(), None);
    }

    #[test]
    fn test_web_mercator_known_values() {
        let geo = epsg(4326);
        let merc = epsg(3857);

        assert_close(geo.transform(&merc, [0.0, 0.0]).unwrap(), [0.0, 0.0], 1e-6);
        assert_close(
            geo.transform(&merc, [90.0, 45.0]).unwrap(),
            [10_018_754.171_394_622, 5_621_521.486_192_066],
            1e-2,
        );
        assert_close(
            merc.transform(&geo, [-10_018_754.171_394_622, 0.0]).unwrap(),
            [-90.0, 0.0],
            1e-7,
        );
    }

    #[test]
    fn test_web_mercator_rejects_poles() {
        let err = epsg(4326).transform(&epsg(3857), [0.0, -90.0]).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::OutOfDomain { .. } | ProjectionError::Transform { .. }
        ));
    }

    #[test]
    fn test_utm_central_meridian() {
        assert_close(
            epsg(4326).transform(&epsg(32633), [15.0, 0.0]).unwrap(),
            [500_000.0, 0.0],
            1e-3,
        );
        assert_close(
            epsg(4326).transform(&epsg(32733), [15.0, 0.0]).unwrap(),
            [500_000.0, 10_000_000.0],
            1e-3,
        );
    }

    #[test]
    fn test_utm_round_trip() {
        let utm = epsg(32631);
        let geo = epsg(4326);
        for point in [[2.35, 48.85], [0.12, 52.2], [5.9, 10.0]] {
            let projected = geo.transform(&utm, point).unwrap();
            assert_close(utm.transform(&geo, projected).unwrap(), point, 1e-6);
        }
    }

    #[test]
    fn test_rejects_latitudes_beyond_the_poles() {
        let err = epsg(4326).transform(&epsg(32631), [3.0, 95.0]).unwrap_err();
        assert!(matches!(err, ProjectionError::OutOfDomain { .. }));
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let err = epsg(3857).transform(&epsg(4326), [f64::NAN, 0.0]).unwrap_err();
        assert!(matches!(err, ProjectionError::OutOfDomain { .. }));
    }
}
