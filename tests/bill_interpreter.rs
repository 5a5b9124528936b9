//! Bill interpreter tests
//!
//! Runs bill programs through the bundled grammar and checks totals, tax
//! arithmetic and menu/price validation.

use proptest::prelude::*;
use tally::domains::bill::{BillInterpreter, BillSummary, DRINK_TAX_RATE, FOOD_TAX_RATE};
use tally::engine::{Domain, EngineError, GrammarSource, execute_domain};

fn run(dsl: &str) -> Result<BillSummary, EngineError> {
    execute_domain(dsl, Domain::Bill, &GrammarSource::Bundled, &mut BillInterpreter::new())
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

#[test]
fn quantity_and_simple_items_are_taxed_per_bucket() {
    let summary = run("bill { burger: 2 * 5.0  soda: 2.5 }").expect("bill");

    assert_eq!(summary.net_food_cost, 10.0);
    assert_eq!(summary.net_drink_cost, 2.5);
    assert_eq!(summary.total_tax, 10.0 * FOOD_TAX_RATE + 2.5 * DRINK_TAX_RATE);
    assert_close(summary.total_tax, 1.175);
    assert_close(summary.final_bill, 13.675);
}

#[test]
fn multi_line_bills_with_separators_parse() {
    let summary = run("bill {\n  fries: 3.5,\n  Water: 2 * 1.5\n  # dessert later\n  shake: 4\n}").expect("bill");
    assert_eq!(summary.net_food_cost, 3.5);
    assert_eq!(summary.net_drink_cost, 7.0);
}

#[test]
fn unknown_items_are_rejected_by_name() {
    let err = run("bill { pizza: 9.0 }").unwrap_err();
    match err {
        EngineError::Validation(message) => assert!(message.contains("pizza"), "{message}"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn items_over_the_price_ceiling_are_rejected() {
    let err = run("bill { burger: 3 * 20.0 }").unwrap_err();
    match err {
        EngineError::Validation(message) => {
            assert!(message.contains("burger"));
            assert!(message.contains("60.00"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn overflowing_prices_are_rejected() {
    for dsl in ["bill { burger: 0 * 1e400 }", "bill { soda: 1e400 }"] {
        match run(dsl).unwrap_err() {
            EngineError::Validation(message) => {
                assert!(message.contains("invalid price"), "{message}");
            }
            other => panic!("expected validation error for {dsl}, got {other:?}"),
        }
    }
}

#[test]
fn empty_bill_is_zero() {
    let summary = run("bill { }").expect("bill");
    assert_eq!(summary.final_bill, 0.0);
    assert_eq!(summary.total_tax, 0.0);
}

#[test]
fn reused_interpreter_starts_from_zero() {
    let grammar = GrammarSource::Bundled.resolve(Domain::Bill).unwrap();
    let mut interpreter = BillInterpreter::new();
    tally::execute("bill { salad: 8 }", &grammar, &mut interpreter).unwrap();
    let second = tally::execute("bill { salad: 8 }", &grammar, &mut interpreter).unwrap();
    assert_eq!(second.net_food_cost, 8.0);
}

#[test]
fn malformed_bill_is_a_syntax_error() {
    let err = run("bill { burger: 2 * }").unwrap_err();
    assert!(matches!(err, EngineError::Syntax { .. }));
}

const MENU: [&str; 6] = ["burger", "fries", "salad", "soda", "shake", "water"];

proptest! {
    #[test]
    fn final_bill_is_nets_plus_taxes(
        items in prop::collection::vec((0usize..6, 1u32..=5, 0u32..=1000), 0..8)
    ) {
        let lines: Vec<String> = items
            .iter()
            .map(|(idx, qty, cents)| format!("{}: {} * {}.{:02}", MENU[*idx], qty, cents / 100, cents % 100))
            .collect();
        let dsl = format!("bill {{ {} }}", lines.join("\n"));

        let summary = run(&dsl).expect("valid bill");
        let food_tax = summary.net_food_cost * FOOD_TAX_RATE;
        let drink_tax = summary.net_drink_cost * DRINK_TAX_RATE;
        prop_assert_eq!(summary.total_tax, food_tax + drink_tax);
        prop_assert_eq!(
            summary.final_bill,
            summary.net_food_cost + summary.net_drink_cost + food_tax + drink_tax
        );
        prop_assert!(summary.net_food_cost >= 0.0 && summary.net_drink_cost >= 0.0);
    }
}
