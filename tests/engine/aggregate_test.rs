//! End-to-end aggregation tests over the in-memory row source.

mod fixtures;

use tally::engine::{AggregateQuery, Dataset, MemoryRowSource};
use tally::model::{AggregateFunction, Expr, Predicate, Value};
use tally::semantic::AggregateError;

#[test]
fn test_count_and_sum_grouped_by_to_one_attribute() {
    let catalog = fixtures::catalog();
    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query
        .add_group_by("region", Expr::reference("customer.region"))
        .unwrap();
    query
        .add_aggregate_attribute("orders", AggregateFunction::Count, Expr::attr("amount"))
        .unwrap();
    query
        .add_aggregate_attribute("total", AggregateFunction::Sum, Expr::attr("amount"))
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.size(), 2);

    // First-seen group order: order 10 roots at east.
    let east = list.get(0).unwrap();
    assert_eq!(east.get_string("region").unwrap(), "east");
    assert_eq!(east.get_int("orders").unwrap(), 3);
    assert_eq!(east.get_float("total").unwrap(), 650.0);

    // Order 14's null amount is elided from both count and sum.
    let west = list.get(1).unwrap();
    assert_eq!(west.get_string("region").unwrap(), "west");
    assert_eq!(west.get_int("orders").unwrap(), 1);
    assert_eq!(west.get_float("total").unwrap(), 75.0);
}

#[test]
fn test_fan_out_count_over_related_rows() {
    let catalog = fixtures::catalog();
    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query.add_group_by("status", Expr::attr("status")).unwrap();
    query
        .add_aggregate_attribute(
            "items_n",
            AggregateFunction::Count,
            Expr::reference("items.quantity"),
        )
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.size(), 2);

    let filled = list.get(0).unwrap();
    assert_eq!(filled.get_string("status").unwrap(), "filled");
    assert_eq!(filled.get_int("items_n").unwrap(), 4);

    let open = list.get(1).unwrap();
    assert_eq!(open.get_string("status").unwrap(), "open");
    assert_eq!(open.get_int("items_n").unwrap(), 2);
}

#[test]
fn test_independent_fan_outs_do_not_cross_multiply() {
    let catalog = fixtures::catalog();
    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query
        .add_aggregate_attribute(
            "items_n",
            AggregateFunction::Count,
            Expr::reference("items.quantity"),
        )
        .unwrap();
    query
        .add_aggregate_attribute(
            "shipments_n",
            AggregateFunction::Count,
            Expr::reference("shipments.weight"),
        )
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.size(), 1);

    // 6 items and 4 shipments overall; a cross-multiplied join would
    // overcount both.
    let row = list.get(0).unwrap();
    assert_eq!(row.get_int("items_n").unwrap(), 6);
    assert_eq!(row.get_int("shipments_n").unwrap(), 4);
}

#[test]
fn test_min_max_over_strings() {
    let catalog = fixtures::catalog();
    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query
        .add_aggregate_attribute("first_sku", AggregateFunction::Min, Expr::reference("items.sku"))
        .unwrap();
    query
        .add_aggregate_attribute("last_sku", AggregateFunction::Max, Expr::reference("items.sku"))
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    let row = list.get(0).unwrap();
    assert_eq!(row.get_string("first_sku").unwrap(), "A");
    assert_eq!(row.get_string("last_sku").unwrap(), "C");
}

#[test]
fn test_global_average() {
    let catalog = fixtures::catalog();
    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query
        .add_aggregate_attribute("avg_amount", AggregateFunction::Avg, Expr::attr("amount"))
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.size(), 1);
    // Four non-null amounts: (100 + 250 + 75 + 300) / 4.
    assert_eq!(list.get(0).unwrap().get_float("avg_amount").unwrap(), 181.25);
}

#[test]
fn test_sum_of_mapped_calculation() {
    let catalog = fixtures::catalog();
    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    let line_total = Expr::via(
        ["items"],
        Expr::attr("quantity").times(Expr::attr("price")),
    );
    query
        .add_aggregate_attribute("revenue", AggregateFunction::Sum, line_total)
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.get(0).unwrap().get_float("revenue").unwrap(), 410.0);
}

#[test]
fn test_group_by_extracted_month() {
    let catalog = fixtures::catalog();
    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query
        .add_group_by("month", Expr::attr("placed_on").month())
        .unwrap();
    query
        .add_aggregate_attribute("orders", AggregateFunction::Count, Expr::attr("status"))
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.size(), 3);
    assert_eq!(list.get(0).unwrap().get_int("month").unwrap(), 1);
    assert_eq!(list.get(0).unwrap().get_int("orders").unwrap(), 1);
    assert_eq!(list.get(1).unwrap().get_int("month").unwrap(), 2);
    assert_eq!(list.get(1).unwrap().get_int("orders").unwrap(), 2);
    assert_eq!(list.get(2).unwrap().get_int("month").unwrap(), 3);
    assert_eq!(list.get(2).unwrap().get_int("orders").unwrap(), 2);
}

#[test]
fn test_no_group_by_yields_one_row_even_without_matches() {
    let catalog = fixtures::catalog();
    let predicate = Predicate::eq(Expr::attr("status"), Value::String("cancelled".into()));
    let mut query = AggregateQuery::new(&catalog, "Order", predicate).unwrap();
    query
        .add_aggregate_attribute("n", AggregateFunction::Count, Expr::attr("amount"))
        .unwrap();
    query
        .add_aggregate_attribute("total", AggregateFunction::Sum, Expr::attr("amount"))
        .unwrap();
    query
        .add_aggregate_attribute("biggest", AggregateFunction::Max, Expr::attr("amount"))
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.size(), 1);
    let row = list.get(0).unwrap();
    assert_eq!(row.get_int("n").unwrap(), 0);
    assert_eq!(row.get_float("total").unwrap(), 0.0);
    assert!(row.is_null("biggest").unwrap());
}

#[test]
fn test_filter_and_aggregate_on_same_path() {
    // The quantity condition filters the fanned rows and drops orders with
    // no qualifying item, as a single filtered join would.
    let catalog = fixtures::catalog();
    let predicate = Predicate::gt(Expr::reference("items.quantity"), Value::Int(15));
    let mut query = AggregateQuery::new(&catalog, "Order", predicate).unwrap();
    query.add_group_by("status", Expr::attr("status")).unwrap();
    query
        .add_aggregate_attribute(
            "big_items",
            AggregateFunction::Count,
            Expr::reference("items.quantity"),
        )
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.size(), 2);
    assert_eq!(list.get(0).unwrap().get_string("status").unwrap(), "filled");
    assert_eq!(list.get(0).unwrap().get_int("big_items").unwrap(), 2);
    assert_eq!(list.get(1).unwrap().get_string("status").unwrap(), "open");
    assert_eq!(list.get(1).unwrap().get_int("big_items").unwrap(), 1);
}

#[test]
fn test_same_path_filter_drops_groups_without_qualifying_rows() {
    // Only order 14 carries an item above 40; the filled orders all have
    // items, but none qualifying, so no filled group appears.
    let catalog = fixtures::catalog();
    let predicate = Predicate::gt(Expr::reference("items.quantity"), Value::Int(40));
    let mut query = AggregateQuery::new(&catalog, "Order", predicate).unwrap();
    query.add_group_by("status", Expr::attr("status")).unwrap();
    query
        .add_aggregate_attribute(
            "big_items",
            AggregateFunction::Count,
            Expr::reference("items.quantity"),
        )
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    assert_eq!(list.size(), 1);
    assert_eq!(list.get(0).unwrap().get_string("status").unwrap(), "open");
    assert_eq!(list.get(0).unwrap().get_int("big_items").unwrap(), 1);
}

#[test]
fn test_group_by_over_to_many_path() {
    let catalog = fixtures::catalog();
    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query.add_group_by("sku", Expr::reference("items.sku")).unwrap();
    query
        .add_aggregate_attribute(
            "items_n",
            AggregateFunction::Count,
            Expr::reference("items.quantity"),
        )
        .unwrap();
    query
        .add_aggregate_attribute("orders", AggregateFunction::Count, Expr::attr("status"))
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    // Order 13 has no items and joins to nothing; no null group appears.
    assert_eq!(list.size(), 3);

    // Each item counts once, in its own sku's group.
    let a = list.get(0).unwrap();
    assert_eq!(a.get_string("sku").unwrap(), "A");
    assert_eq!(a.get_int("items_n").unwrap(), 2);
    assert_eq!(a.get_int("orders").unwrap(), 1);

    let b = list.get(1).unwrap();
    assert_eq!(b.get_string("sku").unwrap(), "B");
    assert_eq!(b.get_int("items_n").unwrap(), 2);
    // Orders 10 and 12 both carry a B item.
    assert_eq!(b.get_int("orders").unwrap(), 2);

    let c = list.get(2).unwrap();
    assert_eq!(c.get_string("sku").unwrap(), "C");
    assert_eq!(c.get_int("items_n").unwrap(), 2);
    assert_eq!(c.get_int("orders").unwrap(), 2);
}

#[test]
fn test_mixed_root_and_to_many_group_keys() {
    let catalog = fixtures::catalog();
    let mut data = Dataset::new();
    data.insert("Order", 40, [("status", Value::String("open".into()))]);
    data.insert("Order", 41, [("status", Value::String("open".into()))]);
    data.insert("OrderItem", 400, [("quantity", Value::Int(10))]);
    data.insert("OrderItem", 401, [("quantity", Value::Int(20))]);
    data.insert("OrderItem", 402, [("quantity", Value::Int(10))]);
    data.link("Order", "items", 40, 400);
    data.link("Order", "items", 40, 401);
    data.link("Order", "items", 41, 402);

    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query.add_group_by("status", Expr::attr("status")).unwrap();
    query
        .add_group_by("qty", Expr::reference("items.quantity"))
        .unwrap();
    query
        .add_aggregate_attribute(
            "n",
            AggregateFunction::Count,
            Expr::reference("items.quantity"),
        )
        .unwrap();

    let list = query
        .execute(&MemoryRowSource::new(fixtures::catalog(), data))
        .unwrap();
    // A fanned item contributes only to the group its own quantity keys:
    // both quantity-10 items land together, the quantity-20 item alone.
    assert_eq!(list.size(), 2);
    let first = list.get(0).unwrap();
    assert_eq!(first.get_string("status").unwrap(), "open");
    assert_eq!(first.get_int("qty").unwrap(), 10);
    assert_eq!(first.get_int("n").unwrap(), 2);
    let second = list.get(1).unwrap();
    assert_eq!(second.get_int("qty").unwrap(), 20);
    assert_eq!(second.get_int("n").unwrap(), 1);
}

#[test]
fn test_between_filters_base_rows() {
    let catalog = fixtures::catalog();
    let predicate = Predicate::between(
        Expr::attr("amount"),
        Value::Float(80.0),
        Value::Float(260.0),
    );
    let mut query = AggregateQuery::new(&catalog, "Order", predicate).unwrap();
    query
        .add_aggregate_attribute("n", AggregateFunction::Count, Expr::attr("amount"))
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    // Orders 10 (100) and 11 (250); bounds are inclusive.
    assert_eq!(list.get(0).unwrap().get_int("n").unwrap(), 2);
}

#[test]
fn test_negated_to_many_condition_keeps_rows_without_matches() {
    let catalog = fixtures::catalog();
    // Keep orders with no shipment heavier than 5.
    let predicate =
        Predicate::gt(Expr::reference("shipments.weight"), Value::Float(5.0)).not();
    let mut query = AggregateQuery::new(&catalog, "Order", predicate).unwrap();
    query
        .add_aggregate_attribute("n", AggregateFunction::Count, Expr::attr("status"))
        .unwrap();

    let list = query.execute(&fixtures::source()).unwrap();
    // Only order 13 carries a 10.0 shipment; orders without any shipment
    // count as having no match and are kept.
    assert_eq!(list.get(0).unwrap().get_int("n").unwrap(), 4);
}

#[test]
fn test_declaration_errors_are_fail_fast() {
    let catalog = fixtures::catalog();

    assert!(matches!(
        AggregateQuery::new(&catalog, "Invoice", Predicate::all()),
        Err(AggregateError::UnknownEntity(name)) if name == "Invoice"
    ));

    let mut query = AggregateQuery::new(&catalog, "Order", Predicate::all()).unwrap();
    query.add_group_by("status", Expr::attr("status")).unwrap();
    assert!(matches!(
        query.add_group_by("status", Expr::attr("status")),
        Err(AggregateError::DuplicateGroupByName(_))
    ));
    assert!(matches!(
        query.add_aggregate_attribute("status", AggregateFunction::Count, Expr::attr("amount")),
        Err(AggregateError::DuplicateAggregateName(_))
    ));
    assert!(matches!(
        query.add_aggregate_attribute("s", AggregateFunction::Sum, Expr::attr("status")),
        Err(AggregateError::NotNumeric(_))
    ));
}
