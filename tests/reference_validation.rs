//! Reference validation tests for the sales indicators
//!
//! Run with: cargo test --test reference_validation
//!
//! Reference columns were produced by an independent floating point
//! implementation over the same 30 days of bread sales.

use approx::assert_relative_eq;
use bakery_insights::chart::{DATASET_EMA, DATASET_SMA};
use bakery_insights::{
    ema, linear_trend, normalize, overall_trend, rsi, scaled_rsi, sma, ChartBuilder, ChartOptions, Metric, PanelStatus,
    SalesObservation,
};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

/// Tolerance for floating point comparison
const EPSILON: f64 = 1e-6;

const NAN: f64 = f64::NAN;

/// Thirty days of bread units, closed days recorded as zero
const BREAD: [f64; 30] = [
    42.0, 38.0, 45.0, 51.0, 47.0, 0.0, 39.0, 44.0, 48.0, 53.0, 50.0, 46.0, 41.0, 0.0, 43.0, 49.0, 55.0, 52.0,
    47.0, 45.0, 0.0, 40.0, 46.0, 51.0, 57.0, 54.0, 49.0, 44.0, 0.0, 48.0,
];

const SMA_7: [f64; 30] = [
    NAN, NAN, NAN, NAN, NAN, NAN, 37.4285714286, 37.7142857143, 39.1428571429, 40.2857142857, 40.1428571429,
    40.0, 45.8571428571, 40.2857142857, 40.1428571429, 40.2857142857, 40.5714285714, 40.8571428571, 41.0,
    41.5714285714, 41.5714285714, 41.1428571429, 40.7142857143, 40.1428571429, 40.8571428571, 41.8571428571,
    42.4285714286, 48.7142857143, 43.0, 43.2857142857,
];

const EMA_14: [f64; 30] = [
    NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, 38.8571428571, 39.4095238095,
    40.6882539683, 42.5964867725, 43.8502885362, 44.2702500647, 44.367550056, 38.4518767152, 38.6582931532,
    39.6371873994, 41.1522290795, 43.2652652023, 44.6965631753, 45.2703547519, 45.1009741183, 39.0875109025,
    40.2758427822,
];

/// RSI(14) on the default 0..50 axis
const RSI_14_SCALED: [f64; 30] = [
    NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, NAN, 25.1152073733, 25.834767642,
    26.564546365, 26.1394847074, 25.4097200269, 25.1077675528, 19.4944772028, 24.8721757564, 25.5679273901,
    26.1603114499, 26.8845980209, 26.4518642113, 25.7091222451, 24.9545242341, 19.523776891, 25.7291572282,
];

const TREND_SLOPE: f64 = 0.009343715239154617;
const TREND_INTERCEPT: f64 = 40.66451612903226;

fn compare_vectors(name: &str, expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "{}: Length mismatch: expected {}, got {}",
        name,
        expected.len(),
        actual.len()
    );

    for (i, (exp, act)) in expected.iter().zip(actual.iter()).enumerate() {
        if exp.is_nan() {
            assert!(act.is_nan(), "{}: expected warm-up NaN at index {}, got {}", name, i, act);
        } else {
            assert!(
                (exp - act).abs() < epsilon,
                "{}: index {}: expected {}, got {}",
                name,
                i,
                exp,
                act
            );
        }
    }
}

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + Duration::days(offset)
}

// ============== Indicator Reference Tests ==============

#[test]
fn test_sma_reference() {
    compare_vectors("sma_7", &SMA_7, &sma(&BREAD, 7).unwrap(), EPSILON);
}

#[test]
fn test_ema_reference() {
    compare_vectors("ema_14", &EMA_14, &ema(&BREAD, 14).unwrap(), EPSILON);
}

#[test]
fn test_rsi_reference() {
    compare_vectors(
        "rsi_14_scaled",
        &RSI_14_SCALED,
        &scaled_rsi(&BREAD, 14, 50.0).unwrap(),
        EPSILON,
    );

    let unscaled = rsi(&BREAD, 14).unwrap();
    assert_relative_eq!(unscaled[14], RSI_14_SCALED[14] * 2.0, epsilon = EPSILON);
}

#[test]
fn test_trend_reference() {
    let trend = linear_trend(&BREAD);
    assert_relative_eq!(trend.slope, TREND_SLOPE, epsilon = 1e-9);
    assert_relative_eq!(trend.intercept, TREND_INTERCEPT, epsilon = 1e-9);
    assert_relative_eq!(trend.values[29], TREND_INTERCEPT + 29.0 * TREND_SLOPE, epsilon = 1e-9);
}

#[test]
fn test_overall_trend_reference() {
    // 42 -> 48
    assert_relative_eq!(overall_trend(&BREAD), 14.285714285714286, epsilon = EPSILON);
}

// ============== Pipeline Tests ==============

#[test]
fn test_chart_overlays_match_indicators() {
    let rows: Vec<SalesObservation> = BREAD
        .iter()
        .enumerate()
        .filter(|(_, units)| **units > 0.0)
        .map(|(i, units)| SalesObservation::new(day(i as i64), *units as u32, *units * 8_000.0))
        .collect();

    // Closed days are missing from the store and come back as zero
    let series = normalize(&rows);
    assert_eq!(series.len(), 30);
    assert_eq!(series.values(Metric::Bread), BREAD.to_vec());

    let options = ChartOptions {
        show_sma: true,
        show_ema: true,
        show_rsi: true,
        ..ChartOptions::default()
    };
    let chart = ChartBuilder::new(&series, &options).build().unwrap();

    let sma_data = &chart.dataset(DATASET_SMA).unwrap().data;
    compare_vectors("chart/sma", &SMA_7, sma_data, EPSILON);

    let ema_data = &chart.dataset(DATASET_EMA).unwrap().data;
    compare_vectors("chart/ema", &EMA_14, ema_data, EPSILON);

    compare_vectors("chart/rsi", &RSI_14_SCALED, &chart.oscillator.values, EPSILON);
    assert_eq!(chart.oscillator.status, PanelStatus::Available);
}

#[test]
fn test_recompute_is_identical() {
    let first = scaled_rsi(&BREAD, 14, 50.0).unwrap();
    let second = scaled_rsi(&BREAD, 14, 50.0).unwrap();
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

// ============== Property Tests ==============

fn sales_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..500.0, 0..80)
}

proptest! {
    #[test]
    fn prop_sma_is_window_mean(values in sales_values(), period in 1usize..15) {
        let result = sma(&values, period).unwrap();
        prop_assert_eq!(result.len(), values.len());
        for (i, v) in result.iter().enumerate() {
            if i + 1 < period {
                prop_assert!(v.is_nan());
            } else {
                let window = &values[i + 1 - period..=i];
                let mean = window.iter().sum::<f64>() / period as f64;
                prop_assert!((v - mean).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn prop_ema_seeded_with_sma(values in sales_values(), period in 1usize..15) {
        let e = ema(&values, period).unwrap();
        let s = sma(&values, period).unwrap();
        prop_assert_eq!(e.len(), values.len());
        if values.len() >= period {
            prop_assert!((e[period - 1] - s[period - 1]).abs() < 1e-9);
            prop_assert!(e[period - 1..].iter().all(|v| v.is_finite()));
        } else {
            prop_assert!(e.iter().all(|v| v.is_nan()));
        }
    }

    #[test]
    fn prop_scaled_rsi_within_bounds(values in sales_values(), period in 1usize..20, scale in 1.0f64..200.0) {
        let result = scaled_rsi(&values, period, scale).unwrap();
        prop_assert_eq!(result.len(), values.len());
        for v in result.iter().filter(|v| !v.is_nan()) {
            prop_assert!(*v >= 0.0 && *v <= scale + 1e-9);
        }
    }

    #[test]
    fn prop_flat_rsi_is_midpoint(level in 0.0f64..500.0, len in 16usize..60, scale in 1.0f64..200.0) {
        let values = vec![level; len];
        let result = scaled_rsi(&values, 14, scale).unwrap();
        for v in &result[14..] {
            prop_assert!((v - scale / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_trend_recovers_line(slope in -50.0f64..50.0, intercept in -100.0f64..100.0, len in 2usize..60) {
        let values: Vec<f64> = (0..len).map(|x| slope * x as f64 + intercept).collect();
        let trend = linear_trend(&values);
        prop_assert!((trend.slope - slope).abs() < 1e-6);
        prop_assert!((trend.intercept - intercept).abs() < 1e-6);
    }

    #[test]
    fn prop_normalize_fills_every_day(
        picks in prop::collection::btree_set(0i64..90, 1..40),
        units in 1u32..200,
    ) {
        let rows: Vec<SalesObservation> = picks
            .iter()
            .map(|offset| SalesObservation::new(day(*offset), units, units as f64 * 8_000.0))
            .collect();
        let series = normalize(&rows);

        let first = *picks.iter().next().unwrap();
        let last = *picks.iter().next_back().unwrap();
        prop_assert_eq!(series.len() as i64, last - first + 1);

        let dates = series.dates();
        for pair in dates.windows(2) {
            prop_assert_eq!(pair[1] - pair[0], Duration::days(1));
        }

        let cumulative = series.cumulative();
        for metric in Metric::ALL {
            let running = cumulative.values(metric);
            prop_assert!(running.windows(2).all(|w| w[1] >= w[0]));
        }
        prop_assert_eq!(series.stats().total_bread, units as u64 * picks.len() as u64);
    }
}
