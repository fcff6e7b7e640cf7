//! # Profile Documents
//!
//! A profile is the schema-less JSON document hosted at a node's
//! `profile_url`. [`Profile`] keeps the raw body next to an insertion-ordered
//! object and exposes the normalization steps applied before the document is
//! written to the search index:
//!
//! 1. `profile_url` / `last_updated` stamped from the node
//! 2. geolocation folding (`"lat,lon"` strings and root `latitude`/`longitude`)
//! 3. country resolution (`country_iso_3166`, then `country_name` lookup)
//! 4. tag filtering and truncation
//! 5. `primary_url` canonicalization
//! 6. default `status` of `posted`
//!
//! [`Profile::document`] then projects the allowed index fields.

use crate::constants::ALLOWED_PROFILE_FIELDS;
use crate::error::{NodeIndexError, Result};
use crate::services::CountryResolver;
use crate::state_machine::NodeStatus;
use crate::utils::{canonicalize_primary_url, filter_tags};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

/// Limits applied to profile tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagLimits {
    pub array_size: usize,
    pub string_length: usize,
}

impl Default for TagLimits {
    fn default() -> Self {
        Self {
            array_size: 5,
            string_length: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    raw: String,
    json: Map<String, Value>,
}

impl Profile {
    /// Parse a raw profile body; anything but a JSON object is rejected
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(json) => Ok(Self { raw, json }),
            other => Err(NodeIndexError::Profile(format!(
                "profile must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.json.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.json
    }

    /// Run every normalization step in order
    pub async fn normalize(
        &mut self,
        profile_url: &str,
        last_updated: Option<i64>,
        tag_limits: TagLimits,
        countries: &dyn CountryResolver,
    ) -> Result<()> {
        self.json
            .insert("profile_url".to_string(), Value::String(profile_url.to_string()));
        self.json
            .insert("last_updated".to_string(), json!(last_updated));

        self.convert_geolocation()?;
        self.normalize_country(countries).await?;
        self.filter_tags(tag_limits);
        self.canonicalize_primary_url()?;
        self.set_default_status();

        Ok(())
    }

    /// Fold the supported geolocation spellings into `{lat, lon}`.
    ///
    /// No `geolocation` is created when neither coordinate is present.
    pub fn convert_geolocation(&mut self) -> Result<()> {
        match self.json.get("geolocation") {
            Some(Value::String(geo)) => {
                let (lat, lon) = parse_lat_lon(geo)?;
                self.json
                    .insert("geolocation".to_string(), json!({ "lat": lat, "lon": lon }));
            }
            Some(Value::Object(_)) => {}
            _ => {
                let mut geolocation = Map::new();
                if let Some(lat) = self.json.get("latitude").and_then(Value::as_f64) {
                    geolocation.insert("lat".to_string(), json!(lat));
                }
                if let Some(lon) = self.json.get("longitude").and_then(Value::as_f64) {
                    geolocation.insert("lon".to_string(), json!(lon));
                }
                if !geolocation.is_empty() {
                    self.json.remove("latitude");
                    self.json.remove("longitude");
                    self.json
                        .insert("geolocation".to_string(), Value::Object(geolocation));
                }
            }
        }
        Ok(())
    }

    /// Settle on a two-letter `country` code when one can be derived
    pub async fn normalize_country(&mut self, countries: &dyn CountryResolver) -> Result<()> {
        if let Some(code) = self.json.remove("country_iso_3166") {
            if !code.is_null() {
                self.json.insert("country".to_string(), code);
                return Ok(());
            }
        }

        let has_country = self.json.get("country").is_some_and(|c| !c.is_null());
        let Some(country_name) = self
            .json
            .get("country_name")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            return Ok(());
        };
        if has_country {
            return Ok(());
        }

        match countries.find_alpha2(&country_name).await? {
            Some(code) => {
                info!(
                    country = %country_name,
                    code = %code,
                    profile_url = ?self.json.get("profile_url"),
                    "Country code matched"
                );
                self.json.insert("country".to_string(), Value::String(code));
            }
            None => {
                info!(
                    country = %country_name,
                    profile_url = ?self.json.get("profile_url"),
                    "Country code not found"
                );
            }
        }
        Ok(())
    }

    pub fn filter_tags(&mut self, limits: TagLimits) {
        let Some(tags) = self.json.get("tags") else {
            return;
        };
        let filtered = filter_tags(tags, limits.array_size, limits.string_length);
        if filtered.is_empty() {
            self.json.remove("tags");
        } else {
            self.json.insert("tags".to_string(), json!(filtered));
        }
    }

    pub fn canonicalize_primary_url(&mut self) -> Result<()> {
        if let Some(Value::String(primary_url)) = self.json.get("primary_url") {
            let canonical = canonicalize_primary_url(primary_url)?;
            debug!(primary_url = %primary_url, canonical = %canonical, "Canonicalized primary_url");
            self.json
                .insert("primary_url".to_string(), Value::String(canonical));
        }
        Ok(())
    }

    pub fn set_default_status(&mut self) {
        self.json.insert(
            "status".to_string(),
            Value::String(NodeStatus::Posted.to_string()),
        );
    }

    /// The index document: allowed fields only, in profile order
    pub fn document(&self) -> Map<String, Value> {
        self.json
            .iter()
            .filter(|(key, _)| ALLOWED_PROFILE_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn parse_lat_lon(geo: &str) -> Result<(f64, f64)> {
    let invalid = |reason: &str| {
        NodeIndexError::Profile(format!("invalid geolocation '{geo}': {reason}"))
    };

    let (lat, lon) = geo.split_once(',').ok_or_else(|| invalid("expected \"lat,lon\""))?;
    if lon.contains(',') {
        return Err(invalid("expected \"lat,lon\""));
    }
    let lat = lat.trim().parse::<f64>().map_err(|_| invalid("bad latitude"))?;
    let lon = lon.trim().parse::<f64>().map_err(|_| invalid("bad longitude"))?;
    Ok((lat, lon))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedCountries;

    #[async_trait]
    impl CountryResolver for FixedCountries {
        async fn find_alpha2(&self, country_name: &str) -> Result<Option<String>> {
            Ok(match country_name.to_lowercase().as_str() {
                "germany" | "deutschland" => Some("DE".to_string()),
                _ => None,
            })
        }
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(Profile::parse("[1,2]").is_err());
        assert!(Profile::parse("not json").is_err());
        assert!(Profile::parse(r#"{"name":"x"}"#).is_ok());
    }

    #[test]
    fn test_geolocation_string() {
        let mut profile = Profile::parse(r#"{"geolocation":"48.86,2.35"}"#).unwrap();
        profile.convert_geolocation().unwrap();
        assert_eq!(profile.get("geolocation").unwrap(), &json!({"lat": 48.86, "lon": 2.35}));

        let mut bad = Profile::parse(r#"{"geolocation":"48.86"}"#).unwrap();
        assert!(bad.convert_geolocation().is_err());
    }

    #[test]
    fn test_geolocation_from_root_coordinates() {
        let mut profile = Profile::parse(r#"{"latitude":10.5,"longitude":-3.25}"#).unwrap();
        profile.convert_geolocation().unwrap();
        assert_eq!(profile.get("geolocation").unwrap(), &json!({"lat": 10.5, "lon": -3.25}));
        assert!(profile.get("latitude").is_none());

        let mut existing =
            Profile::parse(r#"{"geolocation":{"lat":1.0,"lon":2.0},"latitude":9.0}"#).unwrap();
        existing.convert_geolocation().unwrap();
        assert_eq!(existing.get("geolocation").unwrap(), &json!({"lat": 1.0, "lon": 2.0}));

        let mut none = Profile::parse(r#"{"name":"x"}"#).unwrap();
        none.convert_geolocation().unwrap();
        assert!(none.get("geolocation").is_none());
    }

    #[tokio::test]
    async fn test_country_resolution() {
        let mut iso =
            Profile::parse(r#"{"country_iso_3166":"FR","country_name":"Germany"}"#).unwrap();
        iso.normalize_country(&FixedCountries).await.unwrap();
        assert_eq!(iso.get("country").unwrap(), "FR");
        assert!(iso.get("country_iso_3166").is_none());

        let mut named = Profile::parse(r#"{"country_name":"Deutschland"}"#).unwrap();
        named.normalize_country(&FixedCountries).await.unwrap();
        assert_eq!(named.get("country").unwrap(), "DE");

        let mut kept = Profile::parse(r#"{"country":"NL","country_name":"Germany"}"#).unwrap();
        kept.normalize_country(&FixedCountries).await.unwrap();
        assert_eq!(kept.get("country").unwrap(), "NL");

        let mut unknown = Profile::parse(r#"{"country_name":"Atlantis"}"#).unwrap();
        unknown.normalize_country(&FixedCountries).await.unwrap();
        assert!(unknown.get("country").is_none());
    }

    #[tokio::test]
    async fn test_full_normalization_and_projection() {
        let raw = r#"{
            "linked_schemas": ["organizations_schema-v1.0.0"],
            "name": "IC3",
            "primary_url": "https://www.ic3.dev/",
            "latitude": 52.5,
            "longitude": 13.4,
            "country_name": "Germany",
            "tags": ["one", 2, "two"],
            "description": "not indexed",
            "status": "bogus"
        }"#;
        let mut profile = Profile::parse(raw).unwrap();
        profile
            .normalize(
                "https://ic3.dev/test.json",
                Some(1_700_000_000),
                TagLimits::default(),
                &FixedCountries,
            )
            .await
            .unwrap();

        let doc = profile.document();
        assert_eq!(doc["profile_url"], "https://ic3.dev/test.json");
        assert_eq!(doc["last_updated"], 1_700_000_000);
        assert_eq!(doc["primary_url"], "ic3.dev");
        assert_eq!(doc["country"], "DE");
        assert_eq!(doc["status"], "posted");
        assert_eq!(doc["tags"], json!(["one", "two"]));
        assert_eq!(doc["geolocation"], json!({"lat": 52.5, "lon": 13.4}));
        assert!(!doc.contains_key("description"));
        assert!(!doc.contains_key("country_name"));

        // insertion order of the source document is preserved
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys[0], "linked_schemas");
        assert_eq!(profile.raw(), raw);
    }
}
