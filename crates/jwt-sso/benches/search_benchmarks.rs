//! Benchmarks for attribute path search and token fingerprinting

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use jwt_sso::cache::{CacheKey, InMemoryCache, UserIdCache, token_fingerprint};
use jwt_sso::search::Expression;
use serde_json::{Value, json};
use tokio::runtime::Runtime;

const ROLE_PATH: &str = "contains(groups[*], 'admin') && 'Admin' || contains(groups[*], 'editor') && 'Editor' || 'Viewer'";

fn claims(group_count: usize) -> Value {
    let groups: Vec<String> = (0..group_count).map(|i| format!("group_{i}")).collect();
    json!({
        "sub": "user-1",
        "email": "user-1@example.com",
        "groups": groups,
        "realm_access": {"roles": ["offline_access", "editor"]},
    })
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for (name, path) in [
        ("identifier", "email"),
        ("nested", "realm_access.roles[0]"),
        ("role_mapping", ROLE_PATH),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| black_box(Expression::compile(black_box(path))));
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let role = Expression::compile(ROLE_PATH).unwrap();
    let filter = Expression::compile("groups[?starts_with(@, 'group_1')]").unwrap();

    for count in [1usize, 10, 100] {
        let document = claims(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("role_mapping", count), &document, |b, doc| {
            b.iter(|| black_box(role.search(doc)));
        });

        group.bench_with_input(BenchmarkId::new("filter", count), &document, |b, doc| {
            b.iter(|| black_box(filter.search(doc)));
        });
    }

    group.finish();
}

fn bench_search_bytes(c: &mut Criterion) {
    let input = serde_json::to_vec(&claims(10)).unwrap();

    c.bench_function("search_bytes_with_compile", |b| {
        b.iter(|| black_box(jwt_sso::search::search(ROLE_PATH, black_box(&input))));
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for size in [256usize, 1024, 4096] {
        let token = "x".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &token, |b, token| {
            b.iter(|| black_box(token_fingerprint(black_box(token))));
        });
    }

    group.finish();
}

fn bench_user_id_cache(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = UserIdCache::new(
        Arc::new(InMemoryCache::new()),
        std::time::Duration::from_secs(3600),
    );
    let key = CacheKey::auth_jwt_sync("bench-token");
    rt.block_on(async {
        cache.set_if_absent(&key, 42).await.unwrap();
    });

    c.bench_function("user_id_cache_hit", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(cache.get(&key).await);
        });
    });
}

criterion_group!(
    benches,
    bench_compile,
    bench_search,
    bench_search_bytes,
    bench_fingerprint,
    bench_user_id_cache,
);
criterion_main!(benches);
