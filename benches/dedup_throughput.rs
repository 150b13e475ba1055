use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use manifest_dedup::{filter_stream, FilterConfig, Stream};

/// A stream of `count` deployments where every third one repeats an earlier
/// name.
fn manifest_stream(count: usize) -> String {
    let mut stream = String::new();
    for i in 0..count {
        let name = if i % 3 == 2 { i - 2 } else { i };
        stream.push_str(&format!(
            r#"---
# Source: chart/templates/deployment.yaml
apiVersion: apps/v1
kind: Deployment
metadata:
    name: web-{name}
    namespace: team-{team}
    labels:
        app.kubernetes.io/name: web-{name}
spec:
    replicas: 3
    template:
        spec:
            containers:
            -   name: web
                image: "registry.example.com/web:1.{name}"
                args: [--port, "8080"]
                command:
                - /bin/sh
                - -c
                - |
                    exec /app/server \
                      --verbose
"#,
            name = name,
            team = name % 7,
        ));
    }
    stream
}

fn bench_filter_stream(c: &mut Criterion) {
    let input = manifest_stream(500);

    let mut group = c.benchmark_group("filter_stream");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("reindent", |b| {
        b.iter(|| {
            let mut output = Vec::with_capacity(input.len());
            filter_stream(black_box(input.as_bytes()), &mut output, &FilterConfig::default())
                .unwrap();
            black_box(output)
        })
    });
    group.bench_function("preserve", |b| {
        b.iter(|| {
            let mut output = Vec::with_capacity(input.len());
            filter_stream(
                black_box(input.as_bytes()),
                &mut output,
                &FilterConfig::preserving(),
            )
            .unwrap();
            black_box(output)
        })
    });
    group.finish();
}

fn bench_parse_stream(c: &mut Criterion) {
    let input = manifest_stream(100);

    c.bench_function("parse_stream", |b| {
        b.iter(|| {
            let parsed = Stream::parse(black_box(&input));
            black_box(parsed.tree().documents().count())
        })
    });
}

/// One ConfigMap whose `data` holds `entries` keys, half of them nested
/// mappings, with four-space indentation so every line gets re-indented.
fn large_config_map(entries: usize) -> String {
    let mut document = String::from(
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n    name: large\ndata:\n",
    );
    for i in 0..entries {
        if i % 2 == 0 {
            document.push_str(&format!("    key-{}: value-{}\n", i, i));
        } else {
            document.push_str(&format!("    nested-{}:\n        a: [1, 2]\n        b: x\n", i));
        }
    }
    document
}

fn bench_large_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_document");
    for entries in [2_000, 20_000] {
        let input = large_config_map(entries);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_function(format!("reindent/{}", entries), |b| {
            b.iter(|| {
                let mut output = Vec::with_capacity(input.len());
                filter_stream(black_box(input.as_bytes()), &mut output, &FilterConfig::default())
                    .unwrap();
                black_box(output)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_filter_stream,
    bench_parse_stream,
    bench_large_document
);
criterion_main!(benches);
