use chrono::{Duration, Utc};

use crate::config::{
    IQR_FENCE_MULTIPLIER, MODEL_LOOKBACK_DAYS, MODEL_MAX_SAMPLES, MODEL_MIN_RAW_SAMPLES,
    MODEL_MIN_TRIMMED_SAMPLES,
};
use crate::db::Store;
use crate::error::Result;
use crate::types::MarketModel;

/// Derives the market model for a search from its recent price sightings.
pub struct PriceStats {
    store: Store,
}

impl PriceStats {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Market model for one search, or None while the category is cold.
    pub async fn model_for(&self, search_name: &str) -> Result<Option<MarketModel>> {
        let since = (Utc::now() - Duration::days(MODEL_LOOKBACK_DAYS)).timestamp();
        let prices = self
            .store
            .recent_prices(search_name, since, MODEL_MAX_SAMPLES)
            .await?;
        Ok(build_model(&prices))
    }
}

/// Build the trimmed model from raw price samples.
///
/// Quartiles of the raw sample set IQR fences; samples outside the fences
/// are dropped before the mean and deviation are taken, so one absurd
/// advert cannot drag the baseline. Returns None below the raw minimum or
/// when the trim leaves too few samples to be meaningful.
pub fn build_model(prices: &[i64]) -> Option<MarketModel> {
    if prices.len() < MODEL_MIN_RAW_SAMPLES {
        return None;
    }

    let mut sorted: Vec<f64> = prices.iter().map(|&p| p as f64).collect();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - IQR_FENCE_MULTIPLIER * iqr;
    let upper_fence = q3 + IQR_FENCE_MULTIPLIER * iqr;

    let trimmed: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|&p| p >= lower_fence && p <= upper_fence)
        .collect();
    if trimmed.len() < MODEL_MIN_TRIMMED_SAMPLES {
        return None;
    }

    let mean = trimmed.iter().sum::<f64>() / trimmed.len() as f64;
    let variance = trimmed.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / trimmed.len() as f64;

    Some(MarketModel {
        mean,
        std_dev: variance.sqrt(),
        sample_count: trimmed.len(),
        lower_quartile: q1,
    })
}

/// Quantile by linear interpolation between closest ranks.
/// `sorted` must be ascending and non-empty; `q` in [0, 1].
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store;
    use crate::types::ListingCandidate;

    #[test]
    fn quantile_interpolates_between_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&sorted, 0.25) - 1.75).abs() < 1e-9);
        assert!((quantile(&sorted, 0.75) - 3.25).abs() < 1e-9);
        assert!((quantile(&sorted, 0.0) - 1.0).abs() < 1e-9);
        assert!((quantile(&sorted, 1.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn below_raw_minimum_yields_no_model() {
        let prices: Vec<i64> = (0..19).map(|i| 100 + i).collect();
        assert!(build_model(&prices).is_none());
    }

    #[test]
    fn absurd_outliers_cannot_drag_the_baseline() {
        // Twenty adverts at 10 and two at 1000. The 1000s must fall outside
        // the fences and leave the mean untouched.
        let mut prices = vec![10i64; 10];
        prices.push(1000);
        let mut doubled = prices.clone();
        doubled.extend_from_slice(&prices);

        let model = build_model(&doubled).expect("22 raw samples is enough");
        assert_eq!(model.sample_count, 20);
        assert!((model.mean - 10.0).abs() < 1e-9);
        assert!(model.std_dev.abs() < 1e-9);
        assert!((model.lower_quartile - 10.0).abs() < 1e-9);
    }

    #[test]
    fn well_spread_sample_survives_untrimmed() {
        let prices: Vec<i64> = (100..120).collect();
        let model = build_model(&prices).unwrap();
        assert_eq!(model.sample_count, 20);
        assert!((model.mean - 109.5).abs() < 1e-9);
        assert!((model.lower_quartile - 104.75).abs() < 1e-9);
        assert!(model.std_dev > 5.0 && model.std_dev < 6.0);
    }

    #[test]
    fn flat_market_yields_degenerate_model() {
        let prices = vec![50i64; 20];
        let model = build_model(&prices).unwrap();
        assert!((model.mean - 50.0).abs() < 1e-9);
        assert_eq!(model.std_dev, 0.0);
        assert!((model.lower_quartile - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn model_for_reads_only_the_lookback_window() {
        let store = memory_store().await;
        store.upsert_search("a", "https://a", 0, 99_999).await.unwrap();

        let now = Utc::now().timestamp();
        let ancient = now - 40 * 86_400;
        for i in 0..20 {
            let candidate = ListingCandidate {
                link: format!("fresh-{i}"),
                title: "t".to_string(),
                price: 100,
                sold: false,
                location: "x".to_string(),
            };
            store.insert_listing(&candidate, "a", now).await.unwrap();
        }
        // Old absurd sightings must not reach the model at all.
        for i in 0..5 {
            let candidate = ListingCandidate {
                link: format!("old-{i}"),
                title: "t".to_string(),
                price: 100_000,
                sold: false,
                location: "x".to_string(),
            };
            store.insert_listing(&candidate, "a", ancient).await.unwrap();
        }

        let model = PriceStats::new(store)
            .model_for("a")
            .await
            .unwrap()
            .expect("20 fresh samples in window");
        assert_eq!(model.sample_count, 20);
        assert!((model.mean - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cold_search_has_no_model() {
        let store = memory_store().await;
        store.upsert_search("a", "https://a", 0, 99_999).await.unwrap();
        let model = PriceStats::new(store).model_for("a").await.unwrap();
        assert!(model.is_none());
    }
}
