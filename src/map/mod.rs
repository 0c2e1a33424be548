//! Leaflet web map of the assembled observations.

pub mod extras;
pub mod popup;
pub mod style;

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::model::Observation;
use crate::schema::columns;

pub use extras::{resolve_extras_inputs, Overlay};
pub use popup::{add_local_stylesheet, observation_html, ImageCatalog};
pub use style::StyleKind;

const DEFAULT_ZOOM: u8 = 10;

/// Marker icon drawn with Leaflet.awesome-markers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Icon {
    pub name: String,
    pub prefix: String,
    pub color: String,
    pub extra_classes: String,
}

impl Icon {
    /// Arrow rotated clockwise from north by `angle` degrees.
    pub fn arrow(angle: f64, color: &str) -> Self {
        Self {
            name: "arrow-up".to_string(),
            prefix: "glyphicon".to_string(),
            color: color.to_string(),
            extra_classes: format!("fa-rotate-{}", angle.round() as i64),
        }
    }

    pub fn stop(color: &str) -> Self {
        Self {
            name: "stop".to_string(),
            prefix: "glyphicon".to_string(),
            color: color.to_string(),
            extra_classes: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// `[latitude, longitude]`
    pub location: [f64; 2],
    pub icon: Icon,
    pub popup: String,
    pub tooltip: String,
}

/// Map document under construction.
#[derive(Debug, Clone, Serialize)]
pub struct WebMap {
    center: [f64; 2],
    zoom: u8,
    markers: Vec<Marker>,
    overlays: Vec<Overlay>,
    locate_control: bool,
}

impl WebMap {
    /// Empty map centered on `(latitude, longitude)`.
    pub fn new(center: (f64, f64)) -> Self {
        Self {
            center: [center.0, center.1],
            zoom: DEFAULT_ZOOM,
            markers: Vec::new(),
            overlays: Vec::new(),
            locate_control: false,
        }
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn add_overlay(&mut self, overlay: Overlay) {
        self.overlays.push(overlay);
    }

    /// Adds the control that follows the user's own location.
    pub fn add_locate_control(&mut self) {
        self.locate_control = true;
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    /// Renders the self-contained HTML page.
    pub fn render_html(&self) -> Result<String> {
        let data = serde_json::to_string(self)?.replace("</", "<\\/");
        Ok(MAP_TEMPLATE.replace("{{MAP_DATA}}", &data))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let html = self.render_html()?;
        fs::write(path, html).map_err(|e| Error::io(path, e))?;
        info!(
            markers = self.markers.len(),
            overlays = self.overlays.len(),
            "Saved map to {:?}",
            path
        );
        Ok(())
    }
}

/// Mean location of the observations, skipping missing coordinates.
pub fn location_centroid(observations: &[Observation]) -> Result<(f64, f64)> {
    fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
        let (sum, count) = values
            .filter(|value| value.is_finite())
            .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    let latitude = mean(observations.iter().map(|o| o.latitude));
    let longitude = mean(observations.iter().map(|o| o.longitude));
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok((latitude, longitude)),
        _ => {
            error!(
                observations = observations.len(),
                "No valid locations to center the map on"
            );
            Err(Error::NoLocations)
        }
    }
}

/// Marker of one observation. Linear structures give a rotated arrow.
pub fn observation_marker(
    observation: &Observation,
    images: Option<&ImageCatalog>,
    rechecks: &BTreeSet<String>,
) -> Marker {
    let recheck = rechecks.contains(observation.obs_id.as_str());
    let icon = if observation.linears.is_empty() {
        Icon::stop(if recheck { "red" } else { "lightgray" })
    } else {
        let direction = observation
            .linears
            .value(0, columns::DIRECTION)
            .and_then(|value| value.as_f64())
            .unwrap_or_else(|| {
                error!(obs_id = %observation.obs_id, "Linear direction is not numeric, pointing north");
                0.0
            });
        Icon::arrow(direction, if recheck { "red" } else { "blue" })
    };

    Marker {
        location: [observation.latitude, observation.longitude],
        icon,
        popup: observation_html(observation, images),
        tooltip: observation.obs_id.to_string(),
    }
}

/// Adds one marker per observation in order, skipping repeated ids.
pub fn add_observations_to_map(
    observations: &[Observation],
    map: &mut WebMap,
    images: Option<&ImageCatalog>,
    rechecks: &BTreeSet<String>,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    for observation in observations {
        let obs_id = observation.obs_id.as_str();
        if !seen.insert(obs_id) {
            error!(obs_id, "Duplicate observation id, skipping marker");
            continue;
        }
        map.add_marker(observation_marker(observation, images, rechecks));
    }
    info!(markers = map.markers().len(), "Added observations to map");
}

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta http-equiv="content-type" content="text/html; charset=UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no" />
    <script src="https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.js"></script>
    <script src="https://code.jquery.com/jquery-3.7.1.min.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/bootstrap@5.2.2/dist/js/bootstrap.bundle.min.js"></script>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet-locatecontrol/0.79.0/L.Control.Locate.min.js"></script>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet@1.9.3/dist/leaflet.css"/>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.2.2/dist/css/bootstrap.min.css"/>
    <link rel="stylesheet" href="https://netdna.bootstrapcdn.com/bootstrap/3.0.0/css/bootstrap.min.css"/>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/@fortawesome/fontawesome-free@6.2.0/css/all.min.css"/>
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css"/>
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet-locatecontrol/0.79.0/L.Control.Locate.min.css"/>
    <style>html, body {width: 100%;height: 100%;margin: 0;padding: 0;}</style>
    <style>#map {position: absolute;top: 0;bottom: 0;right: 0;left: 0;}</style>
</head>
<body>
    <div id="map"></div>
</body>
<script>
    var mapData = {{MAP_DATA}};

    var map = L.map("map", {center: mapData.center, zoom: mapData.zoom});
    L.tileLayer("https://tile.openstreetmap.org/{z}/{x}/{y}.png", {
        maxZoom: 19,
        attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
    }).addTo(map);

    mapData.markers.forEach(function (marker) {
        var icon = L.AwesomeMarkers.icon({
            icon: marker.icon.name,
            prefix: marker.icon.prefix,
            markerColor: marker.icon.color,
            iconColor: "white",
            extraClasses: marker.icon.extra_classes
        });
        L.marker(marker.location, {icon: icon})
            .bindPopup(marker.popup, {maxWidth: 650})
            .bindTooltip(marker.tooltip, {sticky: true})
            .addTo(map);
    });

    var overlayLayers = {};
    mapData.overlays.forEach(function (overlay) {
        var layer = L.geoJSON(overlay.data, {
            style: function () { return overlay.style || {}; },
            onEachFeature: function (feature, featureLayer) {
                if (overlay.popup_field === null || !feature.properties) { return; }
                var value = feature.properties[overlay.popup_field];
                featureLayer.bindPopup("<b>" + overlay.popup_field + "</b>: " + value);
            }
        });
        layer.addTo(map);
        overlayLayers[overlay.name] = layer;
    });
    if (mapData.overlays.length > 0) {
        L.control.layers(null, overlayLayers).addTo(map);
    }

    if (mapData.locate_control) {
        L.control.locate({
            locateOptions: {enableHighAccuracy: true, watch: true, timeout: 100000}
        }).addTo(map);
    }
</script>
</html>
"#;
