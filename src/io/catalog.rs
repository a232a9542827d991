use crate::types::{Footprint, PipelineError, PipelineResult, Sensor};
use chrono::{DateTime, Utc};
use geo::{LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Copernicus Data Space endpoints and search window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub token_url: String,
    pub catalogue_url: String,
    pub download_url: String,
    pub client_id: String,
    /// Area of interest as WKT in EPSG:4326
    pub aoi_wkt: String,
    pub start: String,
    pub end: String,
    pub radar_product_type: String,
    pub optical_product_type: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            token_url: "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token".to_string(),
            catalogue_url: "https://catalogue.dataspace.copernicus.eu/odata/v1/Products".to_string(),
            download_url: "https://zipper.dataspace.copernicus.eu/odata/v1/Products".to_string(),
            client_id: "cdse-public".to_string(),
            aoi_wkt: "POLYGON((78.30 17.20, 78.30 17.60, 78.70 17.60, 78.70 17.20, 78.30 17.20))".to_string(),
            start: "2025-10-15T00:00:00Z".to_string(),
            end: "2025-10-27T00:00:00Z".to_string(),
            radar_product_type: "GRD".to_string(),
            optical_product_type: "S2MSI2A".to_string(),
            page_size: 100,
            timeout_secs: 300,
        }
    }
}

/// One OData product search
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub collection: String,
    pub product_type: String,
    pub aoi_wkt: String,
    pub start: String,
    pub end: String,
}

impl CatalogQuery {
    pub fn for_sensor(sensor: Sensor, config: &CatalogConfig) -> Self {
        let (collection, product_type) = match sensor {
            Sensor::Radar => ("SENTINEL-1", &config.radar_product_type),
            Sensor::Optical => ("SENTINEL-2", &config.optical_product_type),
        };
        Self {
            collection: collection.to_string(),
            product_type: product_type.clone(),
            aoi_wkt: config.aoi_wkt.clone(),
            start: config.start.clone(),
            end: config.end.clone(),
        }
    }

    /// OData `$filter` expression
    pub fn filter(&self) -> String {
        format!(
            "OData.CSC.Intersects(area=geography'SRID=4326;{}') and \
             Collection/Name eq '{}' and \
             ContentDate/Start ge {} and \
             ContentDate/Start le {} and \
             Attributes/OData.CSC.StringAttribute/any(att:att/Name eq 'productType' and \
             att/OData.CSC.StringAttribute/Value eq '{}')",
            self.aoi_wkt, self.collection, self.start, self.end, self.product_type
        )
    }
}

#[derive(Debug, Deserialize)]
struct ODataPage {
    value: Vec<ODataProduct>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ODataProduct {
    id: String,
    name: String,
    #[serde(default)]
    content_length: u64,
    content_date: Option<ContentDate>,
    geo_footprint: Option<GeoJsonGeometry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContentDate {
    start: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonGeometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

impl GeoJsonGeometry {
    fn into_multi_polygon(self) -> PipelineResult<MultiPolygon<f64>> {
        match self {
            GeoJsonGeometry::Polygon { coordinates } => {
                Ok(MultiPolygon::new(vec![polygon_from_rings(coordinates)?]))
            }
            GeoJsonGeometry::MultiPolygon { coordinates } => Ok(MultiPolygon::new(
                coordinates
                    .into_iter()
                    .map(polygon_from_rings)
                    .collect::<PipelineResult<Vec<_>>>()?,
            )),
        }
    }
}

fn polygon_from_rings(rings: Vec<Vec<Vec<f64>>>) -> PipelineResult<Polygon<f64>> {
    let mut rings = rings.into_iter().map(|ring| {
        ring.into_iter()
            .map(|pos| match pos.as_slice() {
                [x, y, ..] => Ok((*x, *y)),
                _ => Err(PipelineError::Catalog(format!(
                    "GeoJSON position needs two coordinates, got {}",
                    pos.len()
                ))),
            })
            .collect::<PipelineResult<Vec<(f64, f64)>>>()
            .map(LineString::from)
    });

    let exterior = rings
        .next()
        .ok_or_else(|| PipelineError::Catalog("polygon without exterior ring".to_string()))??;
    let interiors = rings.collect::<PipelineResult<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Parse one OData result page into footprints plus the next-page link.
///
/// Products without a footprint or start date are skipped with a warning.
pub fn parse_products(
    body: &str,
    product_type: &str,
) -> PipelineResult<(Vec<Footprint>, Option<String>)> {
    let page: ODataPage = serde_json::from_str(body)?;
    let mut footprints = Vec::with_capacity(page.value.len());

    for product in page.value {
        let (geometry, start) = match (product.geo_footprint, product.content_date) {
            (Some(g), Some(d)) => (g.into_multi_polygon()?, d.start),
            _ => {
                log::warn!("Skipping {}: missing footprint or acquisition date", product.name);
                continue;
            }
        };
        footprints.push(Footprint {
            product_id: product.id,
            name: product.name,
            product_type: product_type.to_string(),
            acquisition_time: start,
            content_length: product.content_length,
            geometry,
        });
    }

    Ok((footprints, page.next_link))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authenticated client for the Copernicus Data Space catalogue
pub struct CatalogClient {
    config: CatalogConfig,
    client: reqwest::blocking::Client,
    access_token: Option<String>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> PipelineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("sarveg/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client, access_token: None })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn http_client(&self) -> &reqwest::blocking::Client {
        &self.client
    }

    /// OpenID Connect password grant
    pub fn authenticate(&mut self, username: &str, password: &str) -> PipelineResult<()> {
        log::info!("Requesting access token from {}", self.config.token_url);
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ])
            .send()?;

        if !response.status().is_success() {
            return Err(PipelineError::Catalog(format!(
                "authentication failed: HTTP {}",
                response.status().as_u16()
            )));
        }

        let token: TokenResponse = serde_json::from_str(&response.text()?)?;
        self.access_token = Some(token.access_token);
        log::info!("Authentication successful");
        Ok(())
    }

    /// All products matching `query`, following result pages
    pub fn search(&self, query: &CatalogQuery) -> PipelineResult<Vec<Footprint>> {
        log::info!("Searching {} {} products", query.collection, query.product_type);

        let top = self.config.page_size.to_string();
        let mut request = self
            .client
            .get(&self.config.catalogue_url)
            .query(&[("$filter", query.filter()), ("$top", top)]);
        let mut footprints = Vec::new();

        loop {
            if let Some(token) = &self.access_token {
                request = request.bearer_auth(token);
            }
            let response = request.send()?;
            if !response.status().is_success() {
                return Err(PipelineError::Catalog(format!(
                    "search failed: HTTP {}",
                    response.status().as_u16()
                )));
            }

            let (page, next) = parse_products(&response.text()?, &query.product_type)?;
            footprints.extend(page);
            match next {
                Some(link) => request = self.client.get(link),
                None => break,
            }
        }

        log::info!("{} products found: {}", query.collection, footprints.len());
        Ok(footprints)
    }

    pub fn search_sensor(&self, sensor: Sensor) -> PipelineResult<Vec<Footprint>> {
        self.search(&CatalogQuery::for_sensor(sensor, &self.config))
    }
}
