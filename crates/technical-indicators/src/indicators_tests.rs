#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use super::super::set::{IndicatorParams, IndicatorSet};
    use chrono::NaiveDate;
    use pattern_core::{Bar, PriceSeries};

    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let day0 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: day0
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    .checked_add_signed(chrono::Duration::days(i as i64))
                    .unwrap(),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            })
            .collect()
    }

    fn sample_series() -> PriceSeries {
        PriceSeries::new("TEST", "1d", bars_from_closes(&sample_prices()))
    }

    #[test]
    fn sma_pads_head_with_nan() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), data.len());
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!((result[2] - 2.0).abs() < 1e-9);
        assert!((result[3] - 3.0).abs() < 1e-9);
        assert!((result[4] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn sma_insufficient_data_is_all_nan() {
        let data = vec![1.0, 2.0];
        let result = sma(&data, 5);

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_skips_windows_containing_nan() {
        let data = vec![f64::NAN, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert!(result[2].is_nan());
        assert!((result[3] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ema_seeds_with_sma_of_first_window() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), data.len());
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        let seed = (22.0 + 24.0 + 23.0) / 3.0;
        assert!((result[2] - seed).abs() < 1e-9);
    }

    #[test]
    fn ema_tracks_uptrend() {
        let data: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let result = ema(&data, 3);

        for i in 3..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn ema_starts_after_nan_head() {
        let mut data = nan_series(4);
        data.extend([10.0, 11.0, 12.0, 13.0]);
        let result = ema(&data, 3);

        assert!(result[5].is_nan());
        assert!((result[6] - 11.0).abs() < 1e-9);
        assert!(result[7].is_finite());
    }

    #[test]
    fn rsi_bounded_and_bar_aligned() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        assert_eq!(result.len(), prices.len());
        for v in &result[..14] {
            assert!(v.is_nan());
        }
        for v in &result[14..] {
            assert!(*v >= 0.0 && *v <= 100.0);
        }
    }

    #[test]
    fn rsi_insufficient_data_is_all_nan() {
        let result = rsi(&[1.0, 2.0, 3.0], 14);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_high_on_monotone_uptrend() {
        let data: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&data, 14);

        assert!(result.last().unwrap() > &70.0);
    }

    #[test]
    fn macd_alignment_and_definition_point() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let cols = macd(&prices, 12, 26, 9);

        assert_eq!(cols.macd.len(), prices.len());
        assert_eq!(cols.signal.len(), prices.len());
        assert_eq!(cols.histogram.len(), prices.len());

        // MACD line appears once the slow EMA is seeded, the signal line
        // `signal - 1` bars later.
        assert!(cols.macd[24].is_nan());
        assert!(cols.macd[25].is_finite());
        assert!(cols.signal[32].is_nan());
        assert!(cols.signal[33].is_finite());
        for i in 0..prices.len() {
            if cols.histogram[i].is_finite() {
                assert!((cols.histogram[i] - (cols.macd[i] - cols.signal[i])).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn macd_short_series_is_all_nan() {
        let prices = sample_prices();
        let cols = macd(&prices, 12, 26, 9);

        assert!(cols.macd.iter().all(|v| v.is_nan()));
        assert!(cols.signal.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn stochastic_bounded() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.5).sin() * 5.0).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let cols = stochastic(&highs, &lows, &closes, 14, 3, 3);

        assert_eq!(cols.k.len(), closes.len());
        for v in cols.k.iter().chain(cols.d.iter()) {
            if v.is_finite() {
                assert!(*v >= 0.0 && *v <= 100.0);
            }
        }
        // raw %K at 13, smoothed at 15, %D two bars later
        assert!(cols.k[14].is_nan());
        assert!(cols.k[15].is_finite());
        assert!(cols.d[16].is_nan());
        assert!(cols.d[17].is_finite());
    }

    #[test]
    fn stochastic_flat_window_reads_midscale() {
        let closes = vec![10.0; 20];
        let highs = vec![10.0; 20];
        let lows = vec![10.0; 20];
        let cols = stochastic(&highs, &lows, &closes, 14, 1, 3);

        assert!((cols.k[13] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn obv_accumulates_signed_volume() {
        let closes = vec![10.0, 11.0, 10.5, 10.5, 12.0];
        let volumes = vec![100.0, 200.0, 300.0, 400.0, 500.0];
        let result = obv(&closes, &volumes);

        assert_eq!(result, vec![100.0, 300.0, 0.0, 0.0, 500.0]);
    }

    #[test]
    fn atr_positive_and_defined_from_period() {
        let series = sample_series();
        let result = atr(&series.highs(), &series.lows(), &series.closes(), 14);

        assert_eq!(result.len(), series.len());
        for v in &result[..14] {
            assert!(v.is_nan());
        }
        for v in &result[14..] {
            assert!(*v > 0.0);
        }
    }

    #[test]
    fn atr_rises_with_wider_ranges() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 0.1).collect();
        let narrow_high: Vec<f64> = closes.iter().map(|c| c + 0.5).collect();
        let narrow_low: Vec<f64> = closes.iter().map(|c| c - 0.5).collect();
        let wide_high: Vec<f64> = closes.iter().map(|c| c + 5.0).collect();
        let wide_low: Vec<f64> = closes.iter().map(|c| c - 5.0).collect();

        let narrow = atr(&narrow_high, &narrow_low, &closes, 14);
        let wide = atr(&wide_high, &wide_low, &closes, 14);
        assert!(wide[20] > narrow[20]);
    }

    #[test]
    fn indicator_set_columns_match_series_length() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();
        let series = PriceSeries::new("TEST", "1d", bars_from_closes(&closes));
        let set = IndicatorSet::compute(&series, &IndicatorParams::default());

        for column in [
            &set.rsi_close,
            &set.rsi_high,
            &set.rsi_low,
            &set.macd,
            &set.macd_signal,
            &set.macd_hist,
            &set.stoch_k,
            &set.stoch_d,
            &set.obv,
            &set.atr,
        ] {
            assert_eq!(column.len(), series.len());
        }
    }

    #[test]
    fn indicator_set_on_empty_series() {
        let series = PriceSeries::new("TEST", "1d", vec![]);
        let set = IndicatorSet::compute(&series, &IndicatorParams::default());

        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
