use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use signalhub::signaling::{Contact, RelayCredentials, Session, TokenCodec};

fn contact() -> Contact {
    Contact {
        a: "alice@example.com".to_string(),
        b: "bob@example.com".to_string(),
    }
}

/// relay credential issuance benchmark
fn bench_relay(c: &mut Criterion) {
    let issuer = RelayCredentials::new(
        b"static-auth-secret".to_vec(),
        3600,
        vec!["turn:relay.example:3478".to_string()],
    );
    let session = Session::new("0123456789abcdef0123456789abcdef", "");

    let mut group = c.benchmark_group("Relay");
    group.throughput(Throughput::Elements(1));

    group.bench_function("issue", |b| {
        b.iter(|| black_box(issuer.issue_at(black_box(&session), 1_700_000_000)))
    });

    group.finish();
}

/// contact token benchmark
fn bench_token(c: &mut Criterion) {
    let codec = TokenCodec::new(b"session-secret", b"encryption-secret");
    let token = codec.encode("contact", &contact()).unwrap();

    let mut group = c.benchmark_group("ContactToken");
    group.throughput(Throughput::Elements(1));

    group.bench_function("encode", |b| {
        b.iter(|| black_box(codec.encode("contact", black_box(&contact())).unwrap()))
    });

    group.bench_function("decode", |b| {
        b.iter(|| {
            let decoded: Contact = codec.decode("contact", black_box(&token)).unwrap();
            black_box(decoded)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_relay, bench_token);
criterion_main!(benches);
