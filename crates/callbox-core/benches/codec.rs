use callbox_core::{Registry, TypeRegistry, Value};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Default, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
}

fn bench_decode(c: &mut Criterion) {
    let mut types = TypeRegistry::new();
    types.register::<User>("main.User");
    let codec = callbox_core::Codec::new(&types);

    let mut group = c.benchmark_group("decode");
    let inputs = [
        ("implicit", "integer", json!(42)),
        ("implicit", "float", json!(3.25)),
        ("explicit", "string_tag", json!("long:123")),
        ("explicit", "object_tag", json!({"type": "short", "value": 7})),
        ("explicit", "array_tag", json!({"type": "int[]", "value": [1, 2, 3, 4, 5, 6, 7, 8]})),
        ("composite", "user", json!({"type": "main.User", "value": {"id": 1, "name": "Ann"}})),
    ];
    for (form, name, input) in &inputs {
        group.bench_with_input(BenchmarkId::new(*form, *name), input, |b, input| {
            b.iter(|| codec.decode(black_box(input), None).unwrap());
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let types = TypeRegistry::new();
    let codec = callbox_core::Codec::new(&types);
    let array = Value::Array((0..64).map(Value::Int).collect());

    c.bench_function("encode_tagged_int_array", |b| {
        b.iter(|| codec.encode_tagged(black_box(&array)).unwrap());
    });
}

fn bench_invoke(c: &mut Criterion) {
    let mut registry = Registry::new();
    registry.register_function("add", |a: i32, b: i32| a + b);

    c.bench_function("invoke_add", |b| {
        b.iter(|| {
            registry
                .invoke("add", black_box(vec![Value::Long(1), Value::Long(2)]))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_decode, bench_encode, bench_invoke);
criterion_main!(benches);
