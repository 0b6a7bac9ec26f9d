//! Google Earth Engine REST client.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::{
    config::EarthEngineConfig,
    error::SessionError,
    model::BandSample,
    platform::{
        ImageHandle, ImageQuery, ImageryPlatform, SampleRequest,
        auth::{ServiceAccount, TokenSource},
        least_cloudy,
    },
};

/// Parent of the public data catalog assets.
const PUBLIC_ASSETS: &str = "projects/earthengine-public/assets";
const PAGE_SIZE: &str = "1000";
const MAX_PAGES: usize = 50;

/// An authenticated Earth Engine session.
#[derive(Debug)]
pub struct EarthEngine {
    http: Client,
    api_base: String,
    project: String,
    tokens: TokenSource,
}

impl EarthEngine {
    /// Build a session without contacting the platform.
    pub fn new(config: &EarthEngineConfig, account: &ServiceAccount) -> Result<Self, SessionError> {
        let project = config
            .project
            .clone()
            .or_else(|| account.project_id.clone())
            .ok_or(SessionError::MissingProject)?;

        let http = Client::builder().timeout(config.timeout()).build()?;
        let tokens = TokenSource::new(account, config.token_uri.as_deref(), http.clone())?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            project,
            tokens,
        })
    }

    /// Build a session and prove the credentials by minting a token.
    pub async fn connect(
        config: &EarthEngineConfig,
        account: &ServiceAccount,
    ) -> Result<Self, SessionError> {
        let session = Self::new(config, account)?;
        session.tokens.bearer().await.map_err(SessionError::Token)?;

        tracing::info!(
            project = %session.project,
            client_email = %account.client_email,
            "Earth Engine session established"
        );

        Ok(session)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    async fn list_images_page(
        &self,
        query: &ImageQuery,
        page_token: Option<&str>,
    ) -> Result<ListImagesResponse> {
        let url = format!(
            "{}/{}/{}:listImages",
            self.api_base, PUBLIC_ASSETS, query.collection
        );

        let start = query.start.to_rfc3339();
        let end = query.end.to_rfc3339();
        let region = query.point.to_geojson().to_string();

        let mut params = vec![
            ("startTime", start.as_str()),
            ("endTime", end.as_str()),
            ("region", region.as_str()),
            ("pageSize", PAGE_SIZE),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        let body = self
            .send(self.http.get(&url).query(&params), "listImages")
            .await?;

        serde_json::from_str(&body).context("Failed to parse Earth Engine listImages JSON")
    }

    async fn compute_value(&self, expression: Value) -> Result<Value> {
        let url = format!("{}/projects/{}/value:compute", self.api_base, self.project);

        let body = self
            .send(
                self.http.post(&url).json(&json!({ "expression": expression })),
                "value:compute",
            )
            .await?;

        let parsed: ComputeValueResponse =
            serde_json::from_str(&body).context("Failed to parse Earth Engine value:compute JSON")?;

        Ok(parsed.result)
    }

    async fn send(&self, request: RequestBuilder, method: &str) -> Result<String> {
        let token = self.tokens.bearer().await?;

        let res = request
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Earth Engine ({method})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read Earth Engine {method} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Earth Engine {} request failed with status {}: {}",
                method,
                status,
                error_message(&body),
            ));
        }

        Ok(body)
    }
}

#[async_trait]
impl ImageryPlatform for EarthEngine {
    async fn least_cloudy_image(&self, query: &ImageQuery) -> Result<Option<ImageHandle>> {
        let mut images = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self.list_images_page(query, page_token.as_deref()).await?;
            images.extend(
                page.images
                    .into_iter()
                    .map(|image| image.into_handle(&query.cloud_property)),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(
            collection = %query.collection,
            candidates = images.len(),
            "listed candidate images"
        );

        Ok(least_cloudy(images))
    }

    async fn sample_bands(&self, request: &SampleRequest) -> Result<Option<BandSample>> {
        let result = self.compute_value(reduce_region_expression(request)).await?;
        parse_band_sample(&result, &request.nir_band, &request.red_band)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListImagesResponse {
    #[serde(default)]
    images: Vec<EeImage>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EeImage {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl EeImage {
    fn into_handle(self, cloud_property: &str) -> ImageHandle {
        let cloud_cover = self.properties.get(cloud_property).and_then(Value::as_f64);
        let from_name = self
            .name
            .strip_prefix(PUBLIC_ASSETS)
            .map(|s| s.trim_start_matches('/').to_string());
        let id = self.id.or(from_name).unwrap_or(self.name);

        ImageHandle { id, cloud_cover }
    }
}

#[derive(Debug, Deserialize)]
struct ComputeValueResponse {
    #[serde(default)]
    result: Value,
}

fn invoke(function: &str, arguments: Value) -> Value {
    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments,
        }
    })
}

fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

/// `Image.load(id).select([nir, red]).reduceRegion(first, point, scale, maxPixels)`
/// as an Earth Engine expression graph.
pub fn reduce_region_expression(request: &SampleRequest) -> Value {
    let image = invoke(
        "Image.select",
        json!({
            "input": invoke("Image.load", json!({ "id": constant(json!(request.image_id)) })),
            "bandSelectors": constant(json!([request.nir_band, request.red_band])),
        }),
    );

    let geometry = invoke(
        "GeometryConstructors.Point",
        json!({ "coordinates": constant(json!([request.point.lon, request.point.lat])) }),
    );

    json!({
        "result": "0",
        "values": {
            "0": invoke(
                "Image.reduceRegion",
                json!({
                    "image": image,
                    "reducer": invoke("Reducer.first", json!({})),
                    "geometry": geometry,
                    "scale": constant(json!(request.scale)),
                    "maxPixels": constant(json!(request.max_pixels)),
                }),
            ),
        },
    })
}

/// `Ok(None)` when the dictionary is null or either band is null/absent.
pub fn parse_band_sample(result: &Value, nir_band: &str, red_band: &str) -> Result<Option<BandSample>> {
    let dict = match result {
        Value::Null => return Ok(None),
        Value::Object(dict) => dict,
        other => bail!("Earth Engine returned a non-dictionary sample: {}", truncate_body(&other.to_string())),
    };

    let nir = band_value(dict, nir_band)?;
    let red = band_value(dict, red_band)?;

    Ok(nir.zip(red).map(|(nir, red)| BandSample { nir, red }))
}

fn band_value(dict: &Map<String, Value>, band: &str) -> Result<Option<f64>> {
    match dict.get(band) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => bail!("Earth Engine returned a non-numeric value for band {band}: {other}"),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// The `error.message` of a Google API error body, or the truncated body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| truncate_body(body))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;

    fn request() -> SampleRequest {
        SampleRequest {
            image_id: "COPERNICUS/S2_HARMONIZED/20240612T183919_20240612T184736_T10SEG".into(),
            nir_band: "B8".into(),
            red_band: "B4".into(),
            point: GeoPoint { lon: -122.42, lat: 37.77 },
            scale: 10.0,
            max_pixels: 1e9,
        }
    }

    #[test]
    fn expression_reduces_selected_bands_at_point() {
        let expr = reduce_region_expression(&request());
        let call = &expr["values"]["0"]["functionInvocationValue"];

        assert_eq!(expr["result"], "0");
        assert_eq!(call["functionName"], "Image.reduceRegion");

        let args = &call["arguments"];
        assert_eq!(
            args["reducer"]["functionInvocationValue"]["functionName"],
            "Reducer.first"
        );
        assert_eq!(args["scale"]["constantValue"], 10.0);
        assert_eq!(args["maxPixels"]["constantValue"], 1e9);
        assert_eq!(
            args["geometry"]["functionInvocationValue"]["arguments"]["coordinates"]["constantValue"],
            json!([-122.42, 37.77])
        );

        let select = &args["image"]["functionInvocationValue"];
        assert_eq!(select["functionName"], "Image.select");
        assert_eq!(select["arguments"]["bandSelectors"]["constantValue"], json!(["B8", "B4"]));
        assert_eq!(
            select["arguments"]["input"]["functionInvocationValue"]["arguments"]["id"]["constantValue"],
            "COPERNICUS/S2_HARMONIZED/20240612T183919_20240612T184736_T10SEG"
        );
    }

    #[test]
    fn parses_band_dictionary() {
        let sample = parse_band_sample(&json!({ "B8": 4500, "B4": 1200.5 }), "B8", "B4")
            .unwrap()
            .unwrap();
        assert_eq!(sample, BandSample { nir: 4500.0, red: 1200.5 });
    }

    #[test]
    fn masked_or_missing_bands_are_absent() {
        assert!(parse_band_sample(&json!({ "B8": null, "B4": null }), "B8", "B4").unwrap().is_none());
        assert!(parse_band_sample(&json!({ "B8": 10 }), "B8", "B4").unwrap().is_none());
        assert!(parse_band_sample(&json!({}), "B8", "B4").unwrap().is_none());
        assert!(parse_band_sample(&Value::Null, "B8", "B4").unwrap().is_none());
    }

    #[test]
    fn malformed_samples_are_errors() {
        assert!(parse_band_sample(&json!([1, 2]), "B8", "B4").is_err());
        assert!(parse_band_sample(&json!({ "B8": "x", "B4": 1 }), "B8", "B4").is_err());
    }

    #[test]
    fn image_id_falls_back_to_asset_name() {
        let image = EeImage {
            name: "projects/earthengine-public/assets/COPERNICUS/S2_HARMONIZED/X".into(),
            id: None,
            properties: Map::new(),
        };
        let handle = image.into_handle("CLOUDY_PIXEL_PERCENTAGE");
        assert_eq!(handle.id, "COPERNICUS/S2_HARMONIZED/X");
        assert_eq!(handle.cloud_cover, None);
    }

    #[test]
    fn google_error_bodies_are_summarized() {
        let body = r#"{"error":{"code":403,"message":"Permission denied.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "Permission denied.");

        let long = "x".repeat(300);
        assert_eq!(error_message(&long).len(), 203);
    }

    #[test]
    fn missing_project_is_reported() {
        let account = ServiceAccount {
            client_email: "svc@demo".into(),
            private_key: "irrelevant".into(),
            private_key_id: None,
            project_id: None,
            token_uri: None,
        };
        let err = EarthEngine::new(&EarthEngineConfig::default(), &account).unwrap_err();
        assert!(matches!(err, SessionError::MissingProject));
    }
}
