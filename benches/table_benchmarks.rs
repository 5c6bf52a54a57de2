#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use votable::document::VOTABLE_NS_URI;
use votable::{
    assemble_document, build_field_node, build_param_node, build_resource_node, build_table_node,
    get_resource_param_attribute, serialize_to_string, Attribute, Column, Datatype, Document,
    Element, Serialization, Bindings, Path,
};

const ROWS: usize = 1_000;

fn sample_resource(times: &[f64], counts: &[i32], flags: &[bool]) -> Element {
    let fields = vec![
        build_field_node("time", Some("s"), Datatype::Double, None).unwrap(),
        build_field_node("count", None, Datatype::Int, None).unwrap(),
        build_field_node("ok", None, Datatype::Boolean, None).unwrap(),
    ];
    let table = build_table_node(
        Some("samples"),
        fields,
        Serialization::TableData,
        None,
        ROWS,
        &[
            Column::Double(times),
            Column::Int(counts),
            Column::Boolean(flags),
        ],
    )
    .unwrap();
    let param = build_param_node("Tspan", Some("s"), Datatype::Double, None, "3600").unwrap();
    build_resource_node("Run", "r1", vec![param, table]).unwrap()
}

fn columns() -> (Vec<f64>, Vec<i32>, Vec<bool>) {
    let times = (0..ROWS).map(|i| f64::from(u32::try_from(i).unwrap_or(0)) / 7.0).collect();
    let counts = (0..ROWS).map(|i| i32::try_from(i).unwrap_or(0)).collect();
    let flags = (0..ROWS).map(|i| i % 3 == 0).collect();
    (times, counts, flags)
}

fn bench_build_table(c: &mut Criterion) {
    let (times, counts, flags) = columns();

    c.bench_function("build_table_1000_rows", |b| {
        b.iter(|| sample_resource(black_box(&times), black_box(&counts), black_box(&flags)))
    });
}

fn bench_serialize(c: &mut Criterion) {
    let (times, counts, flags) = columns();

    c.bench_function("serialize_table_1000_rows", |b| {
        b.iter(|| serialize_to_string(sample_resource(&times, &counts, &flags)).unwrap())
    });
}

fn bench_parse_and_query(c: &mut Criterion) {
    let (times, counts, flags) = columns();
    let xml = serialize_to_string(sample_resource(&times, &counts, &flags)).unwrap();

    c.bench_function("parse_and_query", |b| {
        b.iter(|| {
            let doc = Document::parse(black_box(&xml)).unwrap();
            get_resource_param_attribute(&doc, "Run", "r1", "Tspan", Attribute::Value).unwrap()
        })
    });
}

fn bench_select_cells(c: &mut Criterion) {
    let (times, counts, flags) = columns();
    let doc = assemble_document(sample_resource(&times, &counts, &flags)).unwrap();
    let bindings = Bindings::new().bind("v", VOTABLE_NS_URI);
    let path = Path::parse("//v:TABLE/v:DATA/v:TABLEDATA/v:TR/v:TD").unwrap();

    c.bench_function("select_cells", |b| {
        b.iter(|| path.select(black_box(&doc), &bindings).unwrap().len())
    });
}

criterion_group!(
    benches,
    bench_build_table,
    bench_serialize,
    bench_parse_and_query,
    bench_select_cells
);
criterion_main!(benches);
