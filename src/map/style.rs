use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Named styles available for overlay datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    Bedrock,
    Lineament,
}

impl StyleKind {
    pub const ALL: [StyleKind; 2] = [StyleKind::Bedrock, StyleKind::Lineament];

    pub fn as_str(self) -> &'static str {
        match self {
            StyleKind::Bedrock => "bedrock",
            StyleKind::Lineament => "lineament",
        }
    }

    /// Leaflet path options of this style.
    ///
    /// `color` replaces every option whose name contains "color".
    pub fn style(self, color: Option<&str>) -> Map<String, Value> {
        let base = match self {
            StyleKind::Lineament => json!({"color": "black", "weight": 1}),
            StyleKind::Bedrock => json!({"strokeColor": "blue", "fillOpacity": 0.0, "weight": 0.5}),
        };
        let Value::Object(mut style) = base else {
            return Map::new();
        };
        if let Some(color) = color {
            for (key, value) in style.iter_mut() {
                if key.to_lowercase().contains("color") {
                    *value = Value::from(color);
                }
            }
        }
        style
    }
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StyleKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown style function: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_override() {
        let style = StyleKind::Bedrock.style(Some("red"));
        assert_eq!(style["strokeColor"], "red");
        assert_eq!(style["fillOpacity"], 0.0);
        assert_eq!(style["weight"], 0.5);

        let style = StyleKind::Lineament.style(None);
        assert_eq!(style["color"], "black");
        assert_eq!(style["weight"], 1);
    }

    #[test]
    fn test_parse() {
        assert_eq!("LINEAMENT".parse::<StyleKind>(), Ok(StyleKind::Lineament));
        assert!("dotted".parse::<StyleKind>().is_err());
    }
}
