// src/curate/brief.rs
//! `CuratedBrief` and its lenient JSON shape.
//!
//! Generator output is free-form model text repaired into JSON, so every field
//! deserializes leniently: null/missing arrays become empty, unknown enum
//! strings fall back to a neutral value, scores may be numbers or strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const MAX_BULLETS: usize = 8;
pub const MAX_TRENDING: usize = 6;
pub const DEFAULT_RELIABILITY: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl From<String> for Sentiment {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl From<String> for ImpactLevel {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => ImpactLevel::Low,
            "high" => ImpactLevel::High,
            _ => ImpactLevel::Medium,
        }
    }
}

impl ImpactLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Regions {
    #[serde(default, deserialize_with = "de_strings")]
    pub cities: Vec<String>,
    #[serde(default, deserialize_with = "de_strings")]
    pub countries: Vec<String>,
}

impl Regions {
    pub fn global() -> Self {
        Self {
            cities: vec!["Global".to_string()],
            countries: vec!["Worldwide".to_string()],
        }
    }

    /// Cities then countries.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.cities.iter().chain(self.countries.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefLink {
    #[serde(default, deserialize_with = "de_string")]
    pub title: String,
    #[serde(default, deserialize_with = "de_string")]
    pub url: String,
    #[serde(default, deserialize_with = "de_string")]
    pub source: String,
    #[serde(default = "default_score", deserialize_with = "de_score")]
    pub reliability: u8,
}

/// The single curated summary of a batch of feed items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedBrief {
    #[serde(default, deserialize_with = "de_string")]
    pub brief: String,
    #[serde(default, deserialize_with = "de_strings")]
    pub bullets: Vec<String>,
    #[serde(default, deserialize_with = "de_or_default")]
    pub regions: Regions,
    #[serde(default, deserialize_with = "de_string")]
    pub verdict: String,
    #[serde(default, deserialize_with = "de_lenient_enum")]
    pub sentiment: Sentiment,
    #[serde(default, deserialize_with = "de_strings")]
    pub trending_topics: Vec<String>,
    #[serde(default, deserialize_with = "de_lenient_enum")]
    pub impact_level: ImpactLevel,
    #[serde(default = "default_score", deserialize_with = "de_score")]
    pub credibility_score: u8,
    #[serde(default, deserialize_with = "de_links")]
    pub links: Vec<BriefLink>,
}

impl Default for CuratedBrief {
    fn default() -> Self {
        Self {
            brief: String::new(),
            bullets: Vec::new(),
            regions: Regions::default(),
            verdict: "neutral".to_string(),
            sentiment: Sentiment::Neutral,
            trending_topics: Vec::new(),
            impact_level: ImpactLevel::Medium,
            credibility_score: DEFAULT_RELIABILITY,
            links: Vec::new(),
        }
    }
}

impl CuratedBrief {
    /// Enforce list caps and de-duplicate regions (first seen wins).
    pub fn normalize(mut self) -> Self {
        self.brief = self.brief.trim().to_string();
        self.bullets.retain(|b| !b.trim().is_empty());
        self.bullets.truncate(MAX_BULLETS);
        self.trending_topics.retain(|t| !t.trim().is_empty());
        self.trending_topics.truncate(MAX_TRENDING);
        dedup_in_order(&mut self.regions.cities);
        dedup_in_order(&mut self.regions.countries);
        self.credibility_score = self.credibility_score.clamp(1, 10);
        self
    }

    /// High impact, or negative news from a highly credible mix.
    pub fn is_breaking(&self) -> bool {
        self.impact_level == ImpactLevel::High
            || (self.sentiment == Sentiment::Negative && self.credibility_score > 8)
    }
}

/// Per-source breakdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBrief {
    pub source: String,
    pub curated: CuratedBrief,
}

fn dedup_in_order(v: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    v.retain(|s| seen.insert(s.trim().to_ascii_lowercase()));
}

// ------------------------------------------------------------
// Lenient deserializers
// ------------------------------------------------------------

fn default_score() -> u8 {
    DEFAULT_RELIABILITY
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn de_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(value_to_string(&v).unwrap_or_default())
}

fn de_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Array(items) => items.iter().filter_map(value_to_string).collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn de_or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let v = Value::deserialize(d)?;
    Ok(T::deserialize(v).unwrap_or_default())
}

fn de_lenient_enum<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String> + Default,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::String(s) => T::from(s),
        _ => T::default(),
    })
}

fn de_score<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let v = Value::deserialize(d)?;
    let raw = match &v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(match raw {
        Some(x) if x.is_finite() => x.round().clamp(1.0, 10.0) as u8,
        _ => DEFAULT_RELIABILITY,
    })
}

fn de_links<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<BriefLink>, D::Error> {
    let v = Value::deserialize(d)?;
    let Value::Array(items) = v else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|it| serde_json::from_value::<BriefLink>(it).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_fields_never_break_arrays() {
        let b: CuratedBrief = serde_json::from_value(json!({
            "brief": "Hello",
            "bullets": null,
            "regions": null,
            "sentiment": "Mixed",
            "impact_level": 3,
            "credibility_score": "8.6",
            "links": [{"title": "t", "url": "u", "reliability": 42}, "junk"]
        }))
        .unwrap();
        assert!(b.bullets.is_empty());
        assert_eq!(b.regions, Regions::default());
        assert_eq!(b.sentiment, Sentiment::Neutral);
        assert_eq!(b.impact_level, ImpactLevel::Medium);
        assert_eq!(b.credibility_score, 9);
        assert_eq!(b.links.len(), 1);
        assert_eq!(b.links[0].reliability, 10);
    }

    #[test]
    fn serialized_names_match_the_schema() {
        let v = serde_json::to_value(CuratedBrief::default()).unwrap();
        for k in [
            "brief",
            "bullets",
            "regions",
            "verdict",
            "sentiment",
            "trending_topics",
            "impact_level",
            "credibility_score",
            "links",
        ] {
            assert!(v.get(k).is_some(), "missing {k}");
        }
        assert_eq!(v["sentiment"], "neutral");
        assert_eq!(v["impact_level"], "medium");
        assert!(v["bullets"].is_array() && v["links"].is_array());
    }

    #[test]
    fn normalize_caps_and_dedups() {
        let b = CuratedBrief {
            bullets: (0..12).map(|i| format!("b{i}")).collect(),
            trending_topics: (0..9).map(|i| format!("t{i}")).collect(),
            regions: Regions {
                cities: vec!["Paris".into(), "paris".into(), "Lyon".into()],
                countries: vec![],
            },
            credibility_score: 0,
            ..CuratedBrief::default()
        }
        .normalize();
        assert_eq!(b.bullets.len(), MAX_BULLETS);
        assert_eq!(b.trending_topics.len(), MAX_TRENDING);
        assert_eq!(b.regions.cities, vec!["Paris".to_string(), "Lyon".to_string()]);
        assert_eq!(b.credibility_score, 1);
    }

    #[test]
    fn breaking_detection() {
        let mut b = CuratedBrief::default();
        assert!(!b.is_breaking());
        b.impact_level = ImpactLevel::High;
        assert!(b.is_breaking());
        b.impact_level = ImpactLevel::Low;
        b.sentiment = Sentiment::Negative;
        b.credibility_score = 9;
        assert!(b.is_breaking());
        b.credibility_score = 8;
        assert!(!b.is_breaking());
    }
}
