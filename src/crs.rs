//! Coordinate reference systems used by the survey data.
//!
//! Observations are stored in WGS84 degrees. Bounding boxes, exports and
//! overlay datasets may use any system GDAL can resolve from an EPSG code;
//! both directions go through a GDAL coordinate transformation with
//! traditional GIS axis order, so geographic points are always (lon, lat).

use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use geo::Point;
use tracing::{debug, error};

use crate::error::{Error, Result};

pub const WGS84_EPSG: u32 = 4326;
pub const WEB_MERCATOR_EPSG: u32 = 3857;
pub const ETRS_TM35FIN_EPSG: u32 = 3067;

/// A coordinate reference system paired with its transforms to and from
/// WGS84.
#[derive(Debug)]
pub struct Crs {
    epsg: u32,
    from_wgs84: CoordTransform,
    to_wgs84: CoordTransform,
}

fn spatial_ref(epsg: u32) -> Result<SpatialRef> {
    let mut srs = SpatialRef::from_epsg(epsg).map_err(|e| {
        error!(epsg, error = %e, "GDAL could not resolve EPSG code");
        Error::UnsupportedCrs(epsg)
    })?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

impl Crs {
    pub fn from_epsg(epsg: u32) -> Result<Self> {
        let wgs84 = spatial_ref(WGS84_EPSG)?;
        let target = spatial_ref(epsg)?;
        Ok(Self {
            epsg,
            from_wgs84: CoordTransform::new(&wgs84, &target)?,
            to_wgs84: CoordTransform::new(&target, &wgs84)?,
        })
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Projects a WGS84 (lon, lat) point into this system.
    ///
    /// Points that are not finite or fall outside the domain of the
    /// projection come back as NaN.
    pub fn project(&self, point: Point<f64>) -> Point<f64> {
        self.transform(&self.from_wgs84, point)
    }

    /// Unprojects a point of this system into WGS84 (lon, lat).
    pub fn unproject(&self, point: Point<f64>) -> Point<f64> {
        self.transform(&self.to_wgs84, point)
    }

    fn transform(&self, transform: &CoordTransform, point: Point<f64>) -> Point<f64> {
        let nan = Point::new(f64::NAN, f64::NAN);
        if !point.x().is_finite() || !point.y().is_finite() {
            return nan;
        }
        let (mut x, mut y) = ([point.x()], [point.y()]);
        match transform.transform_coords(&mut x, &mut y, &mut []) {
            Ok(()) if x[0].is_finite() && y[0].is_finite() => Point::new(x[0], y[0]),
            Ok(()) => nan,
            Err(e) => {
                debug!(epsg = self.epsg, error = %e, "Point could not be transformed");
                nan
            }
        }
    }
}
