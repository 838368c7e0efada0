//! End-to-end tests over the library surface.
//!
//! Tests cover:
//! - Full backtest pipeline fed by a mock data port
//! - Hand-computed compounding over two trades
//! - Crossover entries and exits against the resolved series table
//! - Data and strategy errors surfacing from `run_backtest`
//! - Optimizer determinism, tie-breaking and cancellation

mod common;

use algoedge::domain::backtest::{BacktestConfig, RunParameters, run_backtest};
use algoedge::domain::error::AlgoedgeError;
use algoedge::domain::optimizer::{Optimizer, ParamSpace, generate_candidates};
use algoedge::domain::position::ExitReason;
use algoedge::domain::resolver::resolve;
use algoedge::domain::strategy::normalize;
use algoedge::ports::data_port::DataPort;
use approx::assert_relative_eq;
use chrono::{DateTime, Utc};
use common::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

mod full_backtest_pipeline {
    use super::*;

    #[test]
    fn always_in_with_default_risk_makes_one_trade() {
        // Rises 2.25% in total, short of the 4% take-profit.
        let closes = rising_closes(100.0, 0.25, 10);
        let port = MockDataPort::new().with_bars("BTC/USDT", "1h", bars_from_closes(&closes));
        let bars = port.fetch_bars(&RunParameters::default()).unwrap();

        let result =
            run_backtest(&always_in_strategy(), &bars, &BacktestConfig::default()).unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_time, hour(0));
        assert_eq!(trade.entry_price, 100.0);
        assert_eq!(trade.exit_time, hour(9));
        assert_eq!(trade.exit_price, 102.25);
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);

        // 1% of 10_000 at 100 is one unit.
        assert_relative_eq!(trade.quantity, 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.metrics.final_equity, 10_002.25, epsilon = 1e-9);
        assert_eq!(result.equity_curve.len(), 1);
        assert_eq!(result.metrics.num_trades, 1);
        assert_eq!(result.metrics.win_rate, 1.0);
    }

    #[test]
    fn take_profit_closes_then_reenters() {
        let closes = [100.0, 102.0, 105.0, 106.0, 107.0];
        let bars = bars_from_closes(&closes);

        let result =
            run_backtest(&always_in_strategy(), &bars, &BacktestConfig::default()).unwrap();

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
        assert_eq!(result.trades[0].exit_time, hour(2));
        assert_eq!(result.trades[1].entry_time, hour(3));
        assert_eq!(result.trades[1].exit_reason, ExitReason::EndOfData);
        assert!(result.trades[0].exit_time <= result.trades[1].entry_time);
    }

    #[test]
    fn roi_compounds_over_two_trades() {
        let strategy = parse_strategy(
            r#"{
                "name": "Half Size",
                "blocks": [
                    {"type": "entry", "logic": [{"op": "gt", "a": "close", "b": 0}]},
                    {"type": "risk", "params": {"stop_loss_pct": 0.02, "take_profit_pct": 0.04, "risk_per_trade_pct": 50.0}}
                ]
            }"#,
        );
        // Take-profit at 110, re-entry at 110, stop-loss at 99.
        let bars = bars_from_closes(&[100.0, 110.0, 110.0, 99.0]);

        let result = run_backtest(&strategy, &bars, &BacktestConfig::default()).unwrap();

        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
        assert_eq!(result.trades[1].exit_reason, ExitReason::StopLoss);

        // 50 units * +10 = +500; 10_500 * 0.5 / 110 units * -11 = -525.
        assert_relative_eq!(result.trades[0].pnl, 500.0, epsilon = 1e-9);
        assert_relative_eq!(result.trades[1].pnl, -525.0, epsilon = 1e-9);
        let final_equity = 10_000.0 + 500.0 - 525.0;
        assert_relative_eq!(result.metrics.final_equity, final_equity, epsilon = 1e-9);
        assert_relative_eq!(
            result.metrics.roi_pct,
            (final_equity / 10_000.0 - 1.0) * 100.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(result.metrics.profit_factor, 500.0 / 525.0, epsilon = 1e-12);
        assert_relative_eq!(result.metrics.win_rate, 0.5);
        assert!(result.metrics.max_drawdown < 0.0);

        let equities: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
        assert_relative_eq!(equities[0], 10_500.0, epsilon = 1e-9);
        assert_relative_eq!(equities[1], final_equity, epsilon = 1e-9);
    }

    #[test]
    fn entry_never_true_means_no_trades() {
        let strategy = parse_strategy(
            r#"{"blocks": [{"type": "entry", "logic": [{"op": "less_than", "a": "close", "b": 0}]}]}"#,
        );
        let bars = bars_from_closes(&rising_closes(100.0, 1.0, 20));

        let result = run_backtest(&strategy, &bars, &BacktestConfig::default()).unwrap();

        assert!(result.trades.is_empty());
        assert_eq!(result.equity_curve.len(), 1);
        assert_eq!(result.equity_curve[0].timestamp, hour(0));
        assert_eq!(result.metrics.final_equity, 10_000.0);
        assert_eq!(result.metrics.roi_pct, 0.0);
        assert_eq!(result.metrics.sharpe_ratio, 0.0);
        assert_eq!(result.metrics.profit_factor, 0.0);
    }
}

mod crossover_strategy {
    use super::*;

    #[test]
    fn trades_open_and_close_on_crossings() {
        let strategy = sma_cross_strategy();
        let bars = ranged_bars(&wave_closes(150));

        let result = run_backtest(&strategy, &bars, &BacktestConfig::default()).unwrap();
        assert!(result.trades.len() >= 2, "got {} trades", result.trades.len());

        let table = resolve(&normalize(strategy), &bars);
        let fast = table.get("fast").unwrap();
        let slow = table.get("slow").unwrap();
        let index_of = |ts: DateTime<Utc>| table.timestamps().iter().position(|t| *t == ts).unwrap();

        for (n, trade) in result.trades.iter().enumerate() {
            let i = index_of(trade.entry_time);
            assert!(i > 0);
            assert!(fast[i] > slow[i], "trade {n} entry at {i}");
            assert!(fast[i - 1] <= slow[i - 1], "trade {n} entry at {i}");

            match trade.exit_reason {
                ExitReason::Signal => {
                    let j = index_of(trade.exit_time);
                    assert!(fast[j] < slow[j], "trade {n} exit at {j}");
                    assert!(fast[j - 1] >= slow[j - 1], "trade {n} exit at {j}");
                }
                ExitReason::EndOfData => assert_eq!(n, result.trades.len() - 1),
                other => panic!("unexpected exit reason {other:?}"),
            }
        }
        for pair in result.trades.windows(2) {
            assert!(pair[0].exit_time <= pair[1].entry_time);
        }
    }

    #[test]
    fn indicator_outputs_land_in_the_table() {
        let strategy = parse_strategy(
            r#"{"blocks": [
                {"id": "m", "type": "indicator", "indicator": "MACD", "params": {"fast": 3, "slow": 6, "signal": 2}},
                {"id": "bb", "type": "indicator", "indicator": "bbands", "params": {"length": 5}},
                {"id": "v", "type": "indicator", "indicator": "VWAP"},
                {"id": "mystery", "type": "indicator", "indicator": "KAMA"},
                {"type": "entry", "logic": [{"op": "crosses_above", "a": "m_macd", "b": "m_signal"}]}
            ]}"#,
        );
        let bars = ranged_bars(&wave_closes(40));
        let table = resolve(&normalize(strategy.clone()), &bars);

        for name in [
            "m_macd",
            "m_signal",
            "m_histogram",
            "bb_upper",
            "bb_middle",
            "bb_lower",
            "v",
            "mystery",
            "m_macd_prev",
            "close_prev",
        ] {
            assert!(table.contains(name), "missing {name}");
        }
        assert!(table.get("mystery").unwrap().iter().all(|v| v.is_nan()));
        assert!(table.get("v").unwrap()[0].is_finite());

        // Unknown kinds degrade, they do not fail the run.
        assert!(run_backtest(&strategy, &bars, &BacktestConfig::default()).is_ok());
    }
}

mod error_paths {
    use super::*;

    #[test]
    fn empty_bars_is_empty_series() {
        let err = run_backtest(&always_in_strategy(), &[], &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, AlgoedgeError::EmptySeries));
        assert_eq!(ExitCode::from(&err), ExitCode::from(3));
    }

    #[test]
    fn repeated_timestamp_is_non_monotonic() {
        let mut bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        bars[2].timestamp = bars[1].timestamp;

        let err =
            run_backtest(&always_in_strategy(), &bars, &BacktestConfig::default()).unwrap_err();
        assert!(matches!(err, AlgoedgeError::NonMonotonic { index: 2 }));
    }

    #[test]
    fn crossover_with_literal_is_validation_error() {
        let strategy = parse_strategy(
            r#"{"blocks": [
                {"id": "go", "type": "entry", "logic": [{"op": "crosses_above", "a": "close", "b": 100}]}
            ]}"#,
        );
        let bars = bars_from_closes(&[100.0, 101.0]);

        let err = run_backtest(&strategy, &bars, &BacktestConfig::default()).unwrap_err();
        match &err {
            AlgoedgeError::Validation(v) => assert_eq!(v.block, "go"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(ExitCode::from(&err), ExitCode::from(4));
    }

    #[test]
    fn mock_port_reports_missing_data() {
        let port = MockDataPort::new().with_error("ETH/USDT", "1h", "exchange down");

        let params = RunParameters {
            symbol: "ETH/USDT".into(),
            ..RunParameters::default()
        };
        assert!(matches!(
            port.fetch_bars(&params),
            Err(AlgoedgeError::DataSource { .. })
        ));
        assert!(matches!(
            port.fetch_bars(&RunParameters::default()),
            Err(AlgoedgeError::NoData { .. })
        ));
    }
}

mod optimizer_search {
    use super::*;

    fn space() -> ParamSpace {
        ParamSpace::from_json(
            r#"{
                "fast": {"length": {"min": 2, "max": 6, "type": "int"}},
                "slow": {"length": [8, 12, 20]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn same_seed_same_outcome() {
        let bars = ranged_bars(&wave_closes(160));
        let strategy = sma_cross_strategy();
        let optimizer = Optimizer::new(&bars, BacktestConfig::default()).with_workers(2);

        let first = optimizer
            .search(&strategy, &space(), "roi_pct", 12, &mut StdRng::seed_from_u64(7))
            .unwrap();
        let second = optimizer
            .search(&strategy, &space(), "roi_pct", 12, &mut StdRng::seed_from_u64(7))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.evaluated, 12);
        assert_eq!(first.skipped, 0);
        assert!(first.best_metrics.is_some());

        let candidate = first.best_candidate.as_ref().unwrap();
        let fast = candidate["fast"]["length"].as_i64().unwrap();
        assert!((2..=6).contains(&fast));
        assert_eq!(first.best_strategy, strategy.with_overrides(candidate));
    }

    #[test]
    fn exact_ties_keep_first_candidate() {
        // Indicator params never reach the logic, so every candidate scores the same.
        let strategy = parse_strategy(
            r#"{"blocks": [
                {"id": "fast", "type": "indicator", "indicator": "SMA", "params": {"length": 3}},
                {"id": "slow", "type": "indicator", "indicator": "SMA", "params": {"length": 8}},
                {"type": "entry", "logic": [{"op": "greater_than", "a": "close", "b": 0}]}
            ]}"#,
        );
        let bars = bars_from_closes(&rising_closes(100.0, 0.5, 30));

        let outcome = Optimizer::new(&bars, BacktestConfig::default())
            .search(&strategy, &space(), "roi_pct", 10, &mut StdRng::seed_from_u64(99))
            .unwrap();
        let expected = generate_candidates(&space(), 10, &mut StdRng::seed_from_u64(99)).unwrap();

        assert_eq!(outcome.best_candidate.as_ref(), Some(&expected[0]));
    }

    #[test]
    fn cancelled_search_skips_everything() {
        let bars = bars_from_closes(&rising_closes(100.0, 0.5, 30));
        let strategy = sma_cross_strategy();
        let cancel = AtomicBool::new(true);

        let outcome = Optimizer::new(&bars, BacktestConfig::default())
            .with_cancel(&cancel)
            .search(&strategy, &space(), "sharpe_ratio", 8, &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_eq!(outcome.skipped, 8);
        assert_eq!(outcome.evaluated, 0);
        assert!(outcome.best_metrics.is_none());
        assert!(outcome.best_candidate.is_none());
        assert_eq!(outcome.best_strategy, strategy);
    }

    #[test]
    fn unknown_objective_is_rejected() {
        let bars = bars_from_closes(&[100.0, 101.0]);
        let err = Optimizer::new(&bars, BacktestConfig::default())
            .search(
                &always_in_strategy(),
                &space(),
                "calmar",
                4,
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap_err();
        assert!(matches!(err, AlgoedgeError::UnknownObjective { .. }));
        assert_eq!(ExitCode::from(&err), ExitCode::from(5));
    }
}
