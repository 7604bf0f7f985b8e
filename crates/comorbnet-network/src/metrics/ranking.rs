//! Descending rankings of per-node metric values.

use comorbnet_core::DiseaseCode;
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// One ranked entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub code: DiseaseCode,
    pub value: f64,
}

/// Node values sorted descending; equal values keep node insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranking(Vec<RankedNode>);

impl Ranking {
    /// Rank `values`, given in node insertion order.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = (DiseaseCode, f64)>) -> Self {
        let mut entries: Vec<_> = values
            .into_iter()
            .map(|(code, value)| RankedNode { code, value })
            .collect();
        // Stable sort keeps insertion order among ties.
        entries.sort_by(|a, b| b.value.total_cmp(&a.value));
        Self(entries)
    }

    #[must_use]
    pub fn entries(&self) -> &[RankedNode] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for `code`, if ranked.
    #[must_use]
    pub fn get(&self, code: DiseaseCode) -> Option<f64> {
        self.0.iter().find(|e| e.code == code).map(|e| e.value)
    }

    /// Codes from highest to lowest value.
    #[must_use]
    pub fn codes(&self) -> Vec<DiseaseCode> {
        self.0.iter().map(|e| e.code).collect()
    }

    /// Entries whose value reaches the `(1 - percent / 100)` quantile.
    ///
    /// The quantile interpolates linearly between order statistics. Ties at
    /// the threshold are all kept.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Malformed`] unless `0 < percent <= 100`.
    pub fn top_percent(&self, percent: f64) -> Result<Self, NetworkError> {
        if !(percent > 0.0 && percent <= 100.0) {
            return Err(NetworkError::Malformed {
                source_name: "top percent".to_string(),
                detail: format!("percent must be in (0, 100], got {percent}"),
            });
        }
        let Some(threshold) = self.quantile(1.0 - percent / 100.0) else {
            return Ok(Self::default());
        };
        Ok(Self(
            self.0
                .iter()
                .filter(|e| e.value >= threshold)
                .copied()
                .collect(),
        ))
    }

    fn quantile(&self, q: f64) -> Option<f64> {
        let mut sorted: Vec<f64> = self.0.iter().map(|e| e.value).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let pos = q * (sorted.len() - 1) as f64;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let lower = pos.floor() as usize;
        let upper = (lower + 1).min(sorted.len() - 1);
        let frac = pos - pos.floor();
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
    }
}

impl<'a> IntoIterator for &'a Ranking {
    type Item = &'a RankedNode;
    type IntoIter = std::slice::Iter<'a, RankedNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> DiseaseCode {
        DiseaseCode::parse(raw).expect("valid code")
    }

    fn ranking(values: &[(&str, f64)]) -> Ranking {
        Ranking::from_values(values.iter().map(|&(c, v)| (code(c), v)))
    }

    #[test]
    fn sorts_descending_with_stable_ties() {
        let r = ranking(&[("A00", 1.0), ("B01", 3.0), ("C02", 1.0), ("D03", 2.0)]);
        let names: Vec<_> = r.codes().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["B01", "D03", "A00", "C02"]);
    }

    #[test]
    fn top_percent_uses_interpolated_quantile() {
        let r = ranking(&[("A00", 1.0), ("B01", 2.0), ("C02", 3.0), ("D03", 4.0), ("E04", 5.0)]);
        // 0.6 quantile of 1..=5 is 3.4.
        let top = r.top_percent(40.0).expect("top");
        let names: Vec<_> = top.codes().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["E04", "D03"]);
        assert_eq!(r.top_percent(100.0).expect("all").len(), 5);
    }

    #[test]
    fn top_percent_keeps_ties_at_threshold() {
        let r = ranking(&[("A00", 2.0), ("B01", 2.0), ("C02", 1.0)]);
        assert_eq!(r.top_percent(10.0).expect("top").len(), 2);
    }

    #[test]
    fn top_percent_rejects_out_of_range() {
        let r = ranking(&[("A00", 1.0)]);
        assert!(r.top_percent(0.0).is_err());
        assert!(r.top_percent(100.5).is_err());
        assert!(r.top_percent(f64::NAN).is_err());
    }

    #[test]
    fn serializes_as_list() {
        let r = ranking(&[("A00", 0.5)]);
        let json = serde_json::to_value(&r).expect("json");
        assert_eq!(json, serde_json::json!([{"code": "A00", "value": 0.5}]));
    }
}
