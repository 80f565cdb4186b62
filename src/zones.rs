//! Zone aggregation
//!
//! Store-wide metrics plus a per-zone breakdown built in a single grouping
//! pass. Zone names are discovered from the data.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::stats::{mean, round_to};
use crate::store::RecordSet;
use crate::types::{GlobalMetrics, ZoneMetrics};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Accumulates the complete observations of one zone
#[derive(Default)]
struct ZoneAccumulator {
    count: usize,
    dwell_seconds: Vec<f64>,
    engagement: Vec<f64>,
}

impl ZoneAccumulator {
    fn into_metrics(self, config: &AnalysisConfig) -> ZoneMetrics {
        let mean_engagement = mean(&self.engagement);

        ZoneMetrics {
            count: self.count,
            mean_dwell_minutes: mean(&self.dwell_seconds).map(|s| round_to(s / 60.0, 1)),
            mean_engagement: mean_engagement.map(|e| round_to(e, 1)),
            derived_conversion: mean_engagement.map(|e| derived_conversion(e, config)),
        }
    }
}

/// `min(cap, mean_engagement × factor)` rounded to one decimal.
///
/// A capped linear proxy kept for dashboard compatibility; it is not a
/// measured conversion rate.
pub fn derived_conversion(mean_engagement: f64, config: &AnalysisConfig) -> f64 {
    round_to(
        (mean_engagement * config.conversion_factor).min(config.conversion_cap),
        1,
    )
}

/// Compute store-wide and per-zone metrics.
///
/// Every row counts toward footfall; only complete rows (dwell and engagement
/// present) feed the means.
#[instrument(skip_all, fields(rows = records.len()))]
pub fn aggregate(
    records: &RecordSet,
    config: &AnalysisConfig,
) -> Result<GlobalMetrics, AnalysisError> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let mut groups: BTreeMap<String, ZoneAccumulator> = BTreeMap::new();
    let mut all_dwell = Vec::with_capacity(records.len());
    let mut all_engagement = Vec::with_capacity(records.len());

    for (i, zone) in records.zones().iter().enumerate() {
        let group = groups.entry(zone.clone()).or_default();
        group.count += 1;

        if let (Some(dwell), Some(engagement)) =
            (records.dwell_seconds()[i], records.engagement()[i])
        {
            group.dwell_seconds.push(dwell);
            group.engagement.push(engagement);
            all_dwell.push(dwell);
            all_engagement.push(engagement);
        }
    }

    let confidence: Vec<f64> = records
        .complete_indices()
        .filter_map(|i| records.confidence()[i])
        .collect();

    debug!(
        zones = groups.len(),
        complete = all_dwell.len(),
        "grouped observations by zone"
    );

    let zones = groups
        .into_iter()
        .map(|(zone, group)| (zone, group.into_metrics(config)))
        .collect();

    Ok(GlobalMetrics {
        total_footfall: records.len(),
        avg_dwell_minutes: mean(&all_dwell).map(|s| round_to(s / 60.0, 1)),
        avg_engagement: mean(&all_engagement).map(|e| round_to(e, 1)),
        avg_confidence_pct: mean(&confidence).map(|c| round_to(c * 100.0, 1)),
        zones,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Observation;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn obs(zone: &str, dwell: f64, engagement: f64, confidence: f64) -> Observation {
        Observation {
            detection_id: format!("ANON-{zone}"),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            zone: zone.to_string(),
            dwell_time_seconds: Some(dwell),
            engagement_score: Some(engagement),
            detector_confidence: Some(confidence),
        }
    }

    fn sample_records() -> RecordSet {
        RecordSet::from_observations(vec![
            obs("Entrance", 30.0, 40.0, 0.8),
            obs("Entrance", 42.0, 44.0, 0.7),
            obs("Checkout", 120.0, 60.0, 0.9),
            obs("Checkout", 150.0, 70.0, 0.95),
            obs("Checkout", 90.0, 65.0, 0.9),
            obs("High-Conv", 600.0, 90.0, 0.98),
        ])
    }

    #[test]
    fn test_global_metrics() {
        let metrics = aggregate(&sample_records(), &AnalysisConfig::default()).unwrap();

        assert_eq!(metrics.total_footfall, 6);
        // 1032 s / 6 = 172 s = 2.8667 min
        assert_eq!(metrics.avg_dwell_minutes, Some(2.9));
        // 369 / 6 = 61.5
        assert_eq!(metrics.avg_engagement, Some(61.5));
        // 5.23 / 6 = 0.871666
        assert_eq!(metrics.avg_confidence_pct, Some(87.2));
    }

    #[test]
    fn test_zone_metrics() {
        let metrics = aggregate(&sample_records(), &AnalysisConfig::default()).unwrap();

        assert_eq!(metrics.zones.len(), 3);
        assert_eq!(
            metrics.zones["Entrance"],
            ZoneMetrics {
                count: 2,
                mean_dwell_minutes: Some(0.6),
                mean_engagement: Some(42.0),
                derived_conversion: Some(46.2),
            }
        );
        assert_eq!(
            metrics.zones["Checkout"],
            ZoneMetrics {
                count: 3,
                mean_dwell_minutes: Some(2.0),
                mean_engagement: Some(65.0),
                derived_conversion: Some(71.5),
            }
        );
        // 90 × 1.1 = 99 is capped
        assert_eq!(metrics.zones["High-Conv"].derived_conversion, Some(95.0));
    }

    #[test]
    fn test_unknown_zone_is_grouped() {
        let mut records = sample_records();
        records.push(obs("Fitting Rooms", 240.0, 55.0, 0.9));

        let metrics = aggregate(&records, &AnalysisConfig::default()).unwrap();
        assert_eq!(metrics.zones["Fitting Rooms"].count, 1);
        assert_eq!(metrics.zones["Fitting Rooms"].mean_dwell_minutes, Some(4.0));
    }

    #[test]
    fn test_incomplete_rows_count_but_skip_means() {
        let mut incomplete = obs("Entrance", 0.0, 0.0, 0.5);
        incomplete.dwell_time_seconds = None;

        let mut records = sample_records();
        records.push(incomplete);

        let metrics = aggregate(&records, &AnalysisConfig::default()).unwrap();
        assert_eq!(metrics.total_footfall, 7);
        assert_eq!(metrics.zones["Entrance"].count, 3);
        assert_eq!(metrics.zones["Entrance"].mean_engagement, Some(42.0));
        assert_eq!(metrics.avg_confidence_pct, Some(87.2));
    }

    #[test]
    fn test_zone_without_complete_rows() {
        let mut incomplete = obs("Staff Room", 10.0, 0.0, 0.5);
        incomplete.engagement_score = None;

        let records = RecordSet::from_observations(vec![incomplete]);
        let metrics = aggregate(&records, &AnalysisConfig::default()).unwrap();
        let zone = &metrics.zones["Staff Room"];
        assert_eq!(zone.count, 1);
        assert_eq!(zone.mean_dwell_minutes, None);
        assert_eq!(zone.derived_conversion, None);
        assert_eq!(metrics.avg_engagement, None);
    }

    #[test]
    fn test_empty_input() {
        let result = aggregate(&RecordSet::new(), &AnalysisConfig::default());
        assert_eq!(result, Err(AnalysisError::EmptyInput));
    }

    #[test]
    fn test_custom_conversion_config() {
        let config = AnalysisConfig {
            conversion_factor: 2.0,
            conversion_cap: 100.0,
            ..AnalysisConfig::default()
        };
        let metrics = aggregate(&sample_records(), &config).unwrap();
        assert_eq!(metrics.zones["Entrance"].derived_conversion, Some(84.0));
        assert_eq!(metrics.zones["Checkout"].derived_conversion, Some(100.0));
    }

    #[test]
    fn test_serialized_wire_names() {
        let metrics = aggregate(&sample_records(), &AnalysisConfig::default()).unwrap();
        let json = serde_json::to_value(&metrics).unwrap();

        assert_eq!(json["total_footfall"], 6);
        assert_eq!(json["avg_dwell_min"], 2.9);
        assert_eq!(json["ai_confidence"], 87.2);
        assert_eq!(json["zones"]["Checkout"]["footfall"], 3);
        assert_eq!(json["zones"]["Checkout"]["conversion"], 71.5);
    }

    fn zone_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Entrance".to_string()),
            Just("Checkout".to_string()),
            Just("High-Conv".to_string()),
            "[A-Z][a-z]{2,8}",
        ]
    }

    proptest! {
        #[test]
        fn prop_zone_counts_sum_to_total(
            rows in prop::collection::vec(
                (zone_name(), 0.0f64..20_000.0, 0.0f64..100.0, 0.0f64..1.0),
                1..200,
            )
        ) {
            let records = RecordSet::from_observations(
                rows.iter().map(|(zone, dwell, eng, conf)| obs(zone, *dwell, *eng, *conf)),
            );
            let metrics = aggregate(&records, &AnalysisConfig::default()).unwrap();

            prop_assert_eq!(metrics.total_footfall, records.len());
            prop_assert_eq!(metrics.zones.values().map(|z| z.count).sum::<usize>(), records.len());
        }

        #[test]
        fn prop_conversion_is_capped(
            rows in prop::collection::vec((zone_name(), 0.0f64..20_000.0, 0.0f64..200.0), 1..100)
        ) {
            let records = RecordSet::from_observations(
                rows.iter().map(|(zone, dwell, engagement)| obs(zone, *dwell, *engagement, 0.9)),
            );
            let config = AnalysisConfig::default();
            let metrics = aggregate(&records, &config).unwrap();

            for (zone, metrics) in &metrics.zones {
                let engagement: Vec<f64> = rows
                    .iter()
                    .filter(|(z, _, _)| z == zone)
                    .map(|(_, _, e)| *e)
                    .collect();
                let expected = round_to((mean(&engagement).unwrap() * 1.1).min(95.0), 1);

                prop_assert!(metrics.derived_conversion.unwrap() <= 95.0);
                prop_assert_eq!(metrics.derived_conversion, Some(expected));
            }
        }
    }
}
