//! USDA FoodData Central client and the mapping from its nutrient schema.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use super::dto::{FoodItem, FoodSearchResult};
use crate::{config::UsdaConfig, nutrition::NutritionInfo};

/// The food database could not be reached or answered with an error.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait FoodLookup: Send + Sync {
    /// An empty `foods` list means "no matches", never "unavailable".
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<FoodSearchResult, UpstreamError>;
    /// `Ok(None)` when the id is unknown or the record cannot be mapped.
    async fn details(&self, fdc_id: &str) -> Result<Option<FoodItem>, UpstreamError>;
}

// ---- wire types ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    total_hits: u64,
    #[serde(default)]
    foods: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdaFood {
    pub fdc_id: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand_owner: Option<String>,
    /// A string in search results, an object with `description` in details.
    #[serde(default)]
    pub food_category: Option<serde_json::Value>,
    #[serde(default)]
    pub food_nutrients: Vec<UsdaNutrient>,
    #[serde(default)]
    pub food_portions: Vec<UsdaPortion>,
}

/// Detail records nest the id (`{nutrient: {id}, amount}`); search hits are
/// flat (`{nutrientId, value}`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdaNutrient {
    #[serde(default)]
    pub nutrient: Option<NutrientRef>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub nutrient_id: Option<u32>,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NutrientRef {
    #[serde(default)]
    pub id: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdaPortion {
    #[serde(default)]
    pub gram_weight: Option<f64>,
    #[serde(default)]
    pub portion_description: Option<String>,
}

// ---- mapping ----

const ENERGY_KCAL: u32 = 1008;
const PROTEIN: u32 = 1003;
const CARBOHYDRATE: u32 = 1005;
const TOTAL_FAT: u32 = 1004;
const FIBER: u32 = 1079;
const TOTAL_SUGARS: u32 = 2000;
const SODIUM: u32 = 1093;

pub const DEFAULT_SERVING_SIZE: f64 = 100.0;
pub const DEFAULT_SERVING_UNIT: &str = "g";

pub fn map_nutrients(nutrients: &[UsdaNutrient]) -> NutritionInfo {
    let mut info = NutritionInfo::default();
    for n in nutrients {
        let Some(id) = n.nutrient.as_ref().and_then(|r| r.id).or(n.nutrient_id) else {
            continue;
        };
        let amount = n.amount.or(n.value).unwrap_or(0.0);
        let slot = match id {
            ENERGY_KCAL => &mut info.calories,
            PROTEIN => &mut info.protein,
            CARBOHYDRATE => &mut info.carbs,
            TOTAL_FAT => &mut info.fat,
            FIBER => &mut info.fiber,
            TOTAL_SUGARS => &mut info.sugar,
            SODIUM => &mut info.sodium,
            _ => continue,
        };
        *slot = amount;
    }
    info
}

/// 100 g unless the first portion says otherwise.
fn serving(portions: &[UsdaPortion]) -> (f64, String) {
    let mut size = DEFAULT_SERVING_SIZE;
    let mut unit = DEFAULT_SERVING_UNIT.to_string();
    if let Some(first) = portions.first() {
        if let Some(grams) = first.gram_weight {
            size = grams;
        }
        if let Some(desc) = &first.portion_description {
            unit = desc.clone();
        }
    }
    (size, unit)
}

fn category(raw: Option<serde_json::Value>) -> Option<String> {
    match raw? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(map) => map
            .get("description")
            .and_then(|d| d.as_str())
            .map(str::to_string),
        _ => None,
    }
}

impl From<UsdaFood> for FoodItem {
    fn from(food: UsdaFood) -> Self {
        let nutrition = map_nutrients(&food.food_nutrients);
        let (serving_size, serving_unit) = serving(&food.food_portions);
        Self {
            fdc_id: food.fdc_id.to_string(),
            description: food.description,
            brand_owner: food.brand_owner,
            serving_size,
            serving_unit,
            nutrition,
            food_category: category(food.food_category),
        }
    }
}

/// Maps one raw record; records that do not fit the schema are skipped.
fn parse_food(raw: serde_json::Value) -> Option<FoodItem> {
    match serde_json::from_value::<UsdaFood>(raw) {
        Ok(food) => Some(food.into()),
        Err(e) => {
            warn!(error = %e, "skipping unparseable food record");
            None
        }
    }
}

pub fn total_pages(total_hits: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total_hits.div_ceil(page_size)
}

// ---- client ----

pub struct UsdaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl UsdaClient {
    pub fn new(cfg: &UsdaConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("calorie-tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build USDA http client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl FoodLookup for UsdaClient {
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<FoodSearchResult, UpstreamError> {
        let url = format!("{}/foods/search", self.base_url);
        debug!(%query, page, page_size, "usda search");

        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", query.to_string()),
                ("pageSize", page_size.to_string()),
                ("pageNumber", page.to_string()),
                ("api_key", self.api_key.clone()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        Ok(FoodSearchResult {
            foods: body.foods.into_iter().filter_map(parse_food).collect(),
            total_hits: body.total_hits,
            current_page: page,
            total_pages: total_pages(body.total_hits, page_size),
        })
    }

    async fn details(&self, fdc_id: &str) -> Result<Option<FoodItem>, UpstreamError> {
        let url = format!("{}/food/{}", self.base_url, fdc_id);
        debug!(%fdc_id, "usda details");

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => return Ok(None),
            s if !s.is_success() => return Err(UpstreamError::Status(s.as_u16())),
            _ => {}
        }

        let raw: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, %fdc_id, "usda details body unreadable");
                return Ok(None);
            }
        };
        Ok(parse_food(raw))
    }
}
