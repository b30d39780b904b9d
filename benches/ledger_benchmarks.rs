use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use po_ledger::{
    aggregate,
    models::{flatten_items, LineItem, Order, Platform},
    services::{
        export::{order_item_columns, to_rows},
        filtering::filter,
    },
    FilterCriteria, Paginator,
};
use rust_decimal::Decimal;
use std::time::Duration;

fn sample_orders(order_count: usize, lines_per_order: usize) -> Vec<Order> {
    (0..order_count)
        .map(|o| {
            let items = (0..lines_per_order)
                .map(|l| {
                    LineItem::new(
                        format!("SKU {o}-{l}"),
                        (l as u64 % 12) + 1,
                        Decimal::new(10_000 + (l as i64 * 37), 2),
                        Decimal::new(18, 0),
                    )
                })
                .collect();
            Order::new(format!("PO-{o:05}"))
                .with_platform(Platform::new((o % 5).to_string(), format!("Platform {}", o % 5)))
                .with_items(items)
        })
        .collect()
}

// Benchmark for order totals
fn aggregation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [10, 100, 1_000].iter() {
        let orders = sample_orders(1, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &orders[0].items, |b, items| {
            b.iter(|| black_box(aggregate(items)));
        });
    }

    group.finish();
}

// Benchmark for listing: filter then paginate
fn listing_benchmark(c: &mut Criterion) {
    let orders = sample_orders(200, 10);
    let views = flatten_items(&orders);
    let criteria = FilterCriteria::default()
        .with_term("sku 1")
        .with_counterparty("3");
    let paginator = Paginator::new(50).unwrap();

    c.bench_function("filter_and_paginate", |b| {
        b.iter(|| {
            let kept = filter(&views, black_box(&criteria));
            black_box(paginator.page(&kept, 1).len())
        });
    });
}

// Benchmark for sheet export
fn export_benchmark(c: &mut Criterion) {
    let orders = sample_orders(100, 10);
    let views = flatten_items(&orders);
    let columns = order_item_columns();

    c.bench_function("order_items_sheet", |b| {
        b.iter(|| black_box(to_rows(&views, &columns)));
    });
}

// Benchmark for reading a backend listing
fn json_deserialization_benchmark(c: &mut Criterion) {
    let payload = serde_json::json!([{
        "po_number": "BB-24-0042",
        "platform": {"id": 2, "pf_name": "BigBasket"},
        "order_date": "2024-03-05T00:00:00.000Z",
        "status": "Open",
        "orderItems": [
            {"item_name": "Paneer 200g", "quantity": "10", "basic_rate": "80", "gst_rate": "5"},
            {"item_name": "Curd 400g", "quantity": 6, "basic_rate": 40.5, "gst_rate": 5}
        ]
    }])
    .to_string();

    c.bench_function("orders_from_json", |b| {
        b.iter(|| black_box(po_ledger::orders_from_json(&payload).unwrap()));
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets =
        aggregation_benchmark,
        listing_benchmark,
        export_benchmark,
        json_deserialization_benchmark
}

criterion_main!(benches);
