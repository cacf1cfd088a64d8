mod common;

use approx::assert_relative_eq;
use common::*;
use equisim::adapters::diagnostics_adapter::CollectingSink;
use equisim::domain::config::{EngineConfig, RiskParams};
use equisim::domain::diagnostics::DiagnosticKind;
use equisim::domain::error::EquisimError;
use equisim::domain::indicator::IndicatorSet;
use equisim::domain::position::{ExitReason, Side};
use equisim::domain::result::SimulationResult;
use equisim::domain::strategy::StrategyMode;
use equisim::{CancelFlag, MarketData, Simulator, run_simulation, score_instrument};

fn run(
    provider: &MockProvider,
    names: &[&str],
    periods: i64,
    config: &EngineConfig,
) -> Result<SimulationResult, EquisimError> {
    let sink = CollectingSink::new();
    run_simulation(
        &instruments(names),
        day(0),
        day(periods - 1),
        100_000.0,
        config,
        MarketData::from_provider(provider),
        &sink,
    )
}

fn wavy_closes(n: usize, base: f64, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| base + 10.0 * (i as f64 * 0.3 + phase).sin() + 0.1 * i as f64)
        .collect()
}

mod exits {
    use super::*;

    #[test]
    fn stop_loss_closes_long_at_the_close() {
        let provider = bullish_provider("ACME", &[100.0, 97.0]);
        let result = run(&provider, &["ACME"], 2, &sentiment_driven_config()).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.side, Side::Long);
        assert_eq!(trade.quantity, 112);
        assert_eq!(trade.reason, ExitReason::StopLoss);
        assert_eq!(trade.entry_date, day(0));
        assert_eq!(trade.exit_date, day(1));
        assert_relative_eq!(trade.exit_price, 97.0);
        // -3% on the price plus both commissions
        assert_relative_eq!(trade.pnl, -336.0 - 11.2 - 10.864, epsilon = 1e-6);
        assert!(trade.return_fraction() < -0.03);

        let last = result.periods.last().unwrap();
        assert_eq!(last.open_positions, 0);
        assert_eq!(last.trades_closed, 1);
        assert_relative_eq!(result.final_equity, 100_000.0 + trade.pnl, epsilon = 1e-6);
    }

    #[test]
    fn take_profit_closes_long() {
        let provider = bullish_provider("ACME", &[100.0, 105.0]);
        let result = run(&provider, &["ACME"], 2, &sentiment_driven_config()).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.reason, ExitReason::TakeProfit);
        assert_relative_eq!(trade.pnl, 560.0 - 11.2 - 11.76, epsilon = 1e-6);
        assert_eq!(result.metrics.trades_won, 1);
        assert_eq!(result.metrics.profit_factor, None);
    }

    #[test]
    fn no_reentry_in_the_exit_period() {
        let provider = bullish_provider("ACME", &[100.0, 97.0, 97.0]);
        let result = run(&provider, &["ACME"], 3, &sentiment_driven_config()).unwrap();

        assert_eq!(result.periods[1].trades_opened, 0);
        assert_eq!(result.periods[1].open_positions, 0);
        // re-entered on the next period, liquidated at the end
        assert_eq!(result.periods[2].trades_opened, 1);
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[1].reason, ExitReason::EndOfSimulation);
        assert_eq!(result.trades[1].entry_date, day(2));
    }

    #[test]
    fn short_uses_escrow_accounting() {
        let provider = MockProvider::new()
            .with_bars(make_bars("ACME", &[100.0, 99.0, 98.0]))
            .with_fundamentals(neutral_fundamentals("ACME"))
            .with_sentiment(sentiment("ACME", day(0), -0.5));
        let result = run(&provider, &["ACME"], 3, &sentiment_driven_config()).unwrap();

        // 88,788.80 cash plus 112 × (2 × 100 − 99) held in escrow
        let p1 = &result.periods[1];
        assert_relative_eq!(p1.cash, 100_000.0 - 11_200.0 - 11.2, epsilon = 1e-6);
        assert_relative_eq!(p1.positions_value, 112.0 * 101.0, epsilon = 1e-6);
        assert_relative_eq!(p1.equity, 100_100.8, epsilon = 1e-6);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.side, Side::Short);
        assert_eq!(trade.reason, ExitReason::EndOfSimulation);
        assert_relative_eq!(trade.pnl, 224.0 - 11.2 - 10.976, epsilon = 1e-6);
    }

    #[test]
    fn slippage_is_priced_into_the_position_cap() {
        let mut config = sentiment_driven_config();
        config.risk.risk_per_trade = 1.0;
        config.risk.slippage_rate = 0.01;
        let cap = config.risk.max_position_size * 100_000.0;

        let provider = bullish_provider("ACME", &[100.0, 100.0]);
        let result = run(&provider, &["ACME"], 2, &config).unwrap();
        let trade = &result.trades[0];
        // 50,000 / 101 rather than 50,000 / 100
        assert_eq!(trade.quantity, 495);
        assert_relative_eq!(trade.entry_price, 101.0, epsilon = 1e-9);
        assert!(trade.quantity as f64 * trade.entry_price <= cap);

        let provider = MockProvider::new()
            .with_bars(make_bars("ACME", &[100.0, 100.0]))
            .with_fundamentals(neutral_fundamentals("ACME"))
            .with_sentiment(sentiment("ACME", day(0), -0.5));
        let result = run(&provider, &["ACME"], 2, &config).unwrap();
        let trade = &result.trades[0];
        assert_eq!(trade.side, Side::Short);
        assert_eq!(trade.quantity, 505);
        assert!(trade.quantity as f64 * trade.entry_price <= cap);
    }

    #[test]
    fn sell_signal_without_shorting_stays_flat() {
        let provider = MockProvider::new()
            .with_bars(make_bars("ACME", &[100.0, 99.0, 98.0]))
            .with_fundamentals(neutral_fundamentals("ACME"))
            .with_sentiment(sentiment("ACME", day(0), -0.5));
        let mut config = sentiment_driven_config();
        config.risk.allow_shorting = false;

        let result = run(&provider, &["ACME"], 3, &config).unwrap();
        assert!(result.trades.is_empty());
        assert_relative_eq!(result.final_equity, 100_000.0);
    }
}

mod accounting {
    use super::*;

    fn two_instrument_provider() -> MockProvider {
        MockProvider::new()
            .with_bars(make_bars("AAA", &wavy_closes(60, 100.0, 0.0)))
            .with_bars(make_bars("BBB", &wavy_closes(60, 50.0, 1.5)))
            .with_fundamentals(neutral_fundamentals("AAA"))
            .with_fundamentals(neutral_fundamentals("BBB"))
            .with_sentiment(sentiment("AAA", day(0), 0.5))
            .with_sentiment(sentiment("BBB", day(0), -0.5))
    }

    #[test]
    fn equity_identity_holds_every_period() {
        let provider = two_instrument_provider();
        let result = run(&provider, &["AAA", "BBB"], 60, &sentiment_driven_config()).unwrap();

        assert_eq!(result.periods.len(), 60);
        for p in &result.periods {
            assert_relative_eq!(p.equity, p.cash + p.positions_value, epsilon = 1e-6);
        }

        let total_pnl: f64 = result.trades.iter().map(|t| t.pnl).sum();
        assert_relative_eq!(result.final_equity, 100_000.0 + total_pnl, epsilon = 1e-6);
        assert_relative_eq!(result.metrics.total_pnl, total_pnl, epsilon = 1e-6);
        assert_eq!(result.periods.last().unwrap().open_positions, 0);
    }

    #[test]
    fn at_most_one_position_per_instrument() {
        let provider = two_instrument_provider();
        let result = run(&provider, &["AAA", "BBB"], 60, &sentiment_driven_config()).unwrap();

        assert!(result.trades.len() > 2);
        for p in &result.periods {
            assert!(p.open_positions <= 2);
        }
        for name in ["AAA", "BBB"] {
            let trades: Vec<_> = result
                .trades
                .iter()
                .filter(|t| t.instrument == name)
                .collect();
            for pair in trades.windows(2) {
                assert!(pair[1].entry_date > pair[0].exit_date);
            }
        }
    }

    #[test]
    fn identical_runs_give_identical_results() {
        let provider = two_instrument_provider();
        let config = sentiment_driven_config();
        let first = run(&provider, &["AAA", "BBB"], 60, &config).unwrap();
        let second = run(&provider, &["BBB", "AAA", "AAA"], 60, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn result_serializes_to_json() {
        let provider = bullish_provider("ACME", &[100.0, 105.0]);
        let result = run(&provider, &["ACME"], 2, &sentiment_driven_config()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["trades"].as_array().unwrap().len(), 1);
        assert_eq!(json["periods"].as_array().unwrap().len(), 2);
        assert!(json["metrics"]["profit_factor"].is_null());
        assert_eq!(json["strategy"]["kind"], "signal_triggered");
    }
}

mod missing_data {
    use super::*;

    #[test]
    fn unavailable_inputs_become_diagnostics() {
        let provider = bullish_provider("AAA", &[100.0, 100.0, 100.0])
            .with_bars(make_bars("BBB", &[50.0, 50.0, 50.0]))
            .with_fundamentals(neutral_fundamentals("BBB"))
            .with_bars(make_bars("CCC", &[20.0, 20.0, 20.0]))
            .with_error("CCC", "connection reset")
            .with_bars(make_bars("DDD", &[10.0, 10.0, 10.0]))
            .with_sentiment(sentiment("DDD", day(0), 0.5))
            .with_fundamentals_error("DDD", "feed offline");

        let sink = CollectingSink::new();
        let result = run_simulation(
            &instruments(&["AAA", "BBB", "CCC", "DDD"]),
            day(0),
            day(2),
            100_000.0,
            &sentiment_driven_config(),
            MarketData::from_provider(&provider),
            &sink,
        )
        .unwrap();

        let has = |instrument: &str, kind: DiagnosticKind| {
            result
                .diagnostics
                .iter()
                .any(|d| d.instrument == instrument && d.kind == kind)
        };
        assert!(has("BBB", DiagnosticKind::SentimentUnavailable));
        assert!(has("CCC", DiagnosticKind::DataUnavailable));
        assert!(has("DDD", DiagnosticKind::FundamentalsUnavailable));
        assert_eq!(sink.diagnostics(), result.diagnostics);

        assert!(result.trades.iter().all(|t| t.instrument == "AAA"));
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn empty_history_is_data_unavailable() {
        let provider = bullish_provider("AAA", &[100.0, 100.0]);
        let result = run(&provider, &["AAA", "ZZZ"], 2, &sentiment_driven_config()).unwrap();
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.instrument == "ZZZ" && d.kind == DiagnosticKind::DataUnavailable)
        );
    }

    #[test]
    fn gap_day_is_marked_at_last_close() {
        let provider = bullish_provider("AAA", &[100.0, 100.0, 100.0])
            .with_bars(vec![
                make_bar("BBB", day(0), 100.0),
                make_bar("BBB", day(2), 100.0),
            ])
            .with_fundamentals(neutral_fundamentals("BBB"))
            .with_sentiment(sentiment("BBB", day(0), 0.5));

        let result = run(&provider, &["AAA", "BBB"], 3, &sentiment_driven_config()).unwrap();

        let gap = result
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::PriceUnavailable)
            .unwrap();
        assert_eq!(gap.instrument, "BBB");
        assert_eq!(gap.date, day(1));

        let p1 = &result.periods[1];
        assert_eq!(p1.open_positions, 2);
        assert_relative_eq!(p1.equity, p1.cash + p1.positions_value, epsilon = 1e-6);
    }

    #[test]
    fn short_history_is_diagnosed_once() {
        let provider = bullish_provider("AAA", &[100.0; 5]);
        let result = run(&provider, &["AAA"], 5, &sentiment_driven_config()).unwrap();
        let count = result
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::InsufficientHistory)
            .count();
        assert_eq!(count, 1);
    }
}

mod failures {
    use super::*;

    #[test]
    fn non_positive_close_is_an_error() {
        let provider = bullish_provider("AAA", &[100.0, 0.0, 100.0]);
        let err = run(&provider, &["AAA"], 3, &sentiment_driven_config()).unwrap_err();
        match err {
            EquisimError::InvalidPrice {
                instrument, date, ..
            } => {
                assert_eq!(instrument, "AAA");
                assert_eq!(date, day(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cancelled_run_stops_at_first_period() {
        let provider = bullish_provider("AAA", &[100.0, 101.0, 102.0]);
        let sink = CollectingSink::new();
        let flag = CancelFlag::new();
        flag.cancel();

        let err = Simulator::with_market_data(MarketData::from_provider(&provider), &sink)
            .with_cancel_flag(flag)
            .run(
                &instruments(&["AAA"]),
                day(0),
                day(2),
                100_000.0,
                &sentiment_driven_config(),
            )
            .unwrap_err();
        assert!(matches!(err, EquisimError::Cancelled { date } if date == day(0)));
    }

    #[test]
    fn invalid_risk_config_is_rejected() {
        let provider = bullish_provider("AAA", &[100.0]);
        let config = EngineConfig {
            risk: RiskParams {
                max_position_size: 1.5,
                ..RiskParams::default()
            },
            ..EngineConfig::default()
        };
        let err = run(&provider, &["AAA"], 1, &config).unwrap_err();
        assert!(matches!(err, EquisimError::InvalidConfiguration { .. }));
    }

    #[test]
    fn out_of_range_lookback_is_rejected() {
        let provider = bullish_provider("AAA", &[100.0, 100.0]);
        let mut config = sentiment_driven_config();
        config.simulation.history_lookback_days = 10_000_000_000;

        let err = run(&provider, &["AAA"], 2, &config).unwrap_err();
        assert!(matches!(
            err,
            EquisimError::InvalidConfiguration { ref key, .. }
                if key == "simulation.history_lookback_days"
        ));

        let err = score_instrument(MarketData::from_provider(&provider), "AAA", day(1), &config)
            .unwrap_err();
        assert!(matches!(err, EquisimError::InvalidConfiguration { .. }));
    }

    #[test]
    fn start_after_end_is_rejected() {
        let provider = bullish_provider("AAA", &[100.0]);
        let sink = CollectingSink::new();
        let err = run_simulation(
            &instruments(&["AAA"]),
            day(3),
            day(1),
            100_000.0,
            &EngineConfig::default(),
            MarketData::from_provider(&provider),
            &sink,
        )
        .unwrap_err();
        assert!(matches!(err, EquisimError::InvalidConfiguration { .. }));
    }
}

mod rebalance {
    use super::*;

    fn rebalance_config() -> EngineConfig {
        let mut config = sentiment_driven_config();
        config.risk.stop_loss_pct = 0.0;
        config.risk.take_profit_pct = 0.0;
        config.simulation.strategy = StrategyMode::TargetWeightRebalance {
            interval: 5,
            drift_tolerance: 0.01,
        };
        config
    }

    #[test]
    fn holds_target_weight_and_flips_on_reversal() {
        let provider = bullish_provider("ACME", &[100.0; 15])
            .with_sentiment(sentiment("ACME", day(10), -0.5));
        let result = run(&provider, &["ACME"], 15, &rebalance_config()).unwrap();

        // target 0.5 × (1.0 / 1.2) of equity
        assert_eq!(result.periods[0].trades_opened, 1);
        assert_eq!(result.periods[5].trades_opened, 0);
        assert_eq!(result.periods[5].trades_closed, 0);
        assert_eq!(result.periods[10].trades_opened, 1);
        assert_eq!(result.periods[10].trades_closed, 1);

        assert_eq!(result.trades.len(), 2);
        let long = &result.trades[0];
        assert_eq!(long.side, Side::Long);
        assert_eq!(long.quantity, 416);
        assert_eq!(long.reason, ExitReason::Rebalance);
        assert_eq!(long.exit_date, day(10));

        let short = &result.trades[1];
        assert_eq!(short.side, Side::Short);
        assert_eq!(short.quantity, 416);
        assert_eq!(short.reason, ExitReason::EndOfSimulation);

        // flat prices: only commissions are lost
        assert_relative_eq!(result.final_equity, 100_000.0 - 4.0 * 41.6, epsilon = 1e-6);
    }

    #[test]
    fn target_quantity_uses_the_slipped_fill() {
        let mut config = rebalance_config();
        config.risk.slippage_rate = 0.01;
        let provider = bullish_provider("ACME", &[100.0; 3]);
        let result = run(&provider, &["ACME"], 3, &config).unwrap();

        // 41,666.67 of target notional at 101 per unit
        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.quantity, 412);
        assert!(trade.quantity as f64 * trade.entry_price <= 100_000.0 * 0.5 / 1.2);
    }

    #[test]
    fn no_trades_between_rebalance_periods() {
        let provider = bullish_provider("ACME", &[100.0; 8]);
        let result = run(&provider, &["ACME"], 8, &rebalance_config()).unwrap();
        for p in &result.periods[1..5] {
            assert_eq!(p.trades_opened, 0);
            assert_eq!(p.trades_closed, 0);
        }
    }
}

mod scoring {
    use super::*;

    fn uptrend(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + 0.5 * i as f64).collect()
    }

    #[test]
    fn long_uptrend_is_scored_bullish() {
        let provider = MockProvider::new().with_bars(make_bars("ACME", &uptrend(250)));
        let signal = score_instrument(
            MarketData::from_provider(&provider),
            "ACME",
            day(249),
            &EngineConfig::default(),
        )
        .unwrap()
        .unwrap();

        assert!(signal.has_tag("SUSTAINED_UPTREND"));
        assert!(signal.technical > 0.0);
        assert!(!signal.reduced_confidence);
        assert_eq!(signal.fundamental, 0.0);
        assert_eq!(signal.sentiment, 0.0);
    }

    #[test]
    fn uptrend_stays_bullish_once_the_long_average_fills() {
        let provider = MockProvider::new().with_bars(make_bars("ACME", &uptrend(250)));
        let config = EngineConfig::default();
        for i in 199..250 {
            let signal = score_instrument(MarketData::from_provider(&provider), "ACME", day(i), &config)
                .unwrap()
                .unwrap();
            assert!(signal.has_tag("SUSTAINED_UPTREND"), "day {}", i);
            assert!(signal.technical >= 0.0, "day {}: {}", i, signal.technical);
        }
    }

    #[test]
    fn short_uptrend_has_no_sustained_tag() {
        let provider = MockProvider::new().with_bars(make_bars("ACME", &uptrend(120)));
        let signal = score_instrument(
            MarketData::from_provider(&provider),
            "ACME",
            day(119),
            &EngineConfig::default(),
        )
        .unwrap()
        .unwrap();

        assert!(!signal.has_tag("SUSTAINED_UPTREND"));
        assert!(signal.reduced_confidence);
    }

    #[test]
    fn indicator_set_snapshot_matches_history() {
        let config = EngineConfig::default();
        let set = IndicatorSet::compute("ACME", make_bars("ACME", &uptrend(250)), &config.indicators);

        let snapshot = set.snapshot_at(day(249)).unwrap();
        assert_eq!(snapshot.bars_available, 250);
        assert!(snapshot.sma_full);
        assert_relative_eq!(snapshot.close, 224.5);
        assert_eq!(snapshot.prev_close, Some(224.0));
        assert!(set.snapshot_at(day(250)).is_none());
    }
}
