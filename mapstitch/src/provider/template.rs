//! Provider URL templates and tile URL construction.
//!
//! Templates use `{name}` placeholders. Available names:
//!
//! - `{x}`, `{y}`, `{z}`: tile column, row (after any provider inversion) and zoom
//! - `{style}`: the provider's code for the layer style
//! - `{fx}`, `{fy}`: shard directories (`x / 16`, `y / 16`)

use crate::coord::TileCoord;

use super::types::{LayerStyle, Provider};

/// Tiles per shard directory for Tencent satellite imagery.
const TENCENT_SHARD: u32 = 16;

/// URL template table, one entry per provider/style combination that differs.
///
/// Immutable once handed to a [`UrlFormatter`]; override entries through
/// configuration rather than by mutating shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplates {
    pub google: String,
    pub amap: String,
    pub tencent_satellite: String,
    pub tencent_map: String,
}

impl Default for UrlTemplates {
    fn default() -> Self {
        Self {
            google: "http://mt2.google.cn/vt/lyrs={style}&hl=zh-CN&gl=CN&src=app&x={x}&y={y}&z={z}"
                .to_string(),
            amap: "http://wprd02.is.autonavi.com/appmaptile?style={style}&x={x}&y={y}&z={z}"
                .to_string(),
            tencent_satellite: "http://p3.map.gtimg.com/sateTiles/{z}/{fx}/{fy}/{x}_{y}.jpg"
                .to_string(),
            tencent_map: "http://rt0.map.gtimg.com/tile?z={z}&x={x}&y={y}&styleid=3".to_string(),
        }
    }
}

/// Builds fetch URLs for tiles.
///
/// # Example
///
/// ```
/// use mapstitch::coord::{TileCoord, ZoomLevel};
/// use mapstitch::provider::{LayerStyle, Provider, UrlFormatter};
///
/// let formatter = UrlFormatter::default();
/// let tile = TileCoord::new(163, 395, ZoomLevel::new(10).unwrap()).unwrap();
/// let url = formatter.format(Provider::Amap, &tile, LayerStyle::Satellite);
/// assert!(url.ends_with("style=6&x=163&y=395&z=10"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct UrlFormatter {
    templates: UrlTemplates,
}

impl UrlFormatter {
    /// Creates a formatter over the given template table.
    pub fn new(templates: UrlTemplates) -> Self {
        Self { templates }
    }

    /// Returns the template table in use.
    pub fn templates(&self) -> &UrlTemplates {
        &self.templates
    }

    /// Builds the URL for one tile.
    pub fn format(&self, provider: Provider, tile: &TileCoord, style: LayerStyle) -> String {
        let z = tile.zoom.get().to_string();
        let x = tile.x;

        match provider {
            Provider::Google => {
                let code = match style {
                    LayerStyle::Satellite => "s",
                    LayerStyle::Map => "m",
                };
                fill(
                    &self.templates.google,
                    &[
                        ("style", code.to_string()),
                        ("x", x.to_string()),
                        ("y", tile.y.to_string()),
                        ("z", z),
                    ],
                )
            }
            Provider::Amap => {
                let code = match style {
                    LayerStyle::Satellite => "6",
                    LayerStyle::Map => "7",
                };
                fill(
                    &self.templates.amap,
                    &[
                        ("style", code.to_string()),
                        ("x", x.to_string()),
                        ("y", tile.y.to_string()),
                        ("z", z),
                    ],
                )
            }
            Provider::Tencent => {
                let y = tile.inverted_y();
                match style {
                    LayerStyle::Satellite => fill(
                        &self.templates.tencent_satellite,
                        &[
                            ("z", z),
                            ("fx", (x / TENCENT_SHARD).to_string()),
                            ("fy", (y / TENCENT_SHARD).to_string()),
                            ("x", x.to_string()),
                            ("y", y.to_string()),
                        ],
                    ),
                    LayerStyle::Map => fill(
                        &self.templates.tencent_map,
                        &[("z", z), ("x", x.to_string()), ("y", y.to_string())],
                    ),
                }
            }
        }
    }
}

/// Substitutes `{name}` placeholders in a template.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut url = template.to_string();
    for (name, value) in values {
        url = url.replace(&format!("{{{}}}", name), value);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::ZoomLevel;

    fn sf_tile() -> TileCoord {
        TileCoord::new(163, 395, ZoomLevel::new(10).unwrap()).unwrap()
    }

    #[test]
    fn test_google_urls() {
        let formatter = UrlFormatter::default();
        assert_eq!(
            formatter.format(Provider::Google, &sf_tile(), LayerStyle::Satellite),
            "http://mt2.google.cn/vt/lyrs=s&hl=zh-CN&gl=CN&src=app&x=163&y=395&z=10"
        );
        assert_eq!(
            formatter.format(Provider::Google, &sf_tile(), LayerStyle::Map),
            "http://mt2.google.cn/vt/lyrs=m&hl=zh-CN&gl=CN&src=app&x=163&y=395&z=10"
        );
    }

    #[test]
    fn test_amap_style_codes() {
        let formatter = UrlFormatter::default();
        assert_eq!(
            formatter.format(Provider::Amap, &sf_tile(), LayerStyle::Satellite),
            "http://wprd02.is.autonavi.com/appmaptile?style=6&x=163&y=395&z=10"
        );
        assert_eq!(
            formatter.format(Provider::Amap, &sf_tile(), LayerStyle::Map),
            "http://wprd02.is.autonavi.com/appmaptile?style=7&x=163&y=395&z=10"
        );
    }

    #[test]
    fn test_tencent_satellite_inverts_and_shards() {
        let formatter = UrlFormatter::default();
        // y' = 1023 - 395 = 628; shards 163/16 = 10, 628/16 = 39
        assert_eq!(
            formatter.format(Provider::Tencent, &sf_tile(), LayerStyle::Satellite),
            "http://p3.map.gtimg.com/sateTiles/10/10/39/163_628.jpg"
        );
    }

    #[test]
    fn test_tencent_map_inverts_without_sharding() {
        let formatter = UrlFormatter::default();
        assert_eq!(
            formatter.format(Provider::Tencent, &sf_tile(), LayerStyle::Map),
            "http://rt0.map.gtimg.com/tile?z=10&x=163&y=628&styleid=3"
        );
    }

    #[test]
    fn test_tencent_inversion_at_zoom_0() {
        let formatter = UrlFormatter::default();
        let tile = TileCoord::new(0, 0, ZoomLevel::new(0).unwrap()).unwrap();
        assert_eq!(
            formatter.format(Provider::Tencent, &tile, LayerStyle::Map),
            "http://rt0.map.gtimg.com/tile?z=0&x=0&y=0&styleid=3"
        );
    }

    #[test]
    fn test_custom_templates() {
        let templates = UrlTemplates {
            google: "http://localhost/{z}/{x}/{y}.png?l={style}".to_string(),
            ..UrlTemplates::default()
        };
        let formatter = UrlFormatter::new(templates);
        assert_eq!(
            formatter.format(Provider::Google, &sf_tile(), LayerStyle::Map),
            "http://localhost/10/163/395.png?l=m"
        );
    }
}
