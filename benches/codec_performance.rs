use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ldifber::ber::{BerElement, BerSequence, BerStreamReader};
use ldifber::ldap::LdapMessage;
use ldifber::ldif::{LdifReader, LdifReaderOptions, ParallelLdifReader};

fn create_test_ldif(num_users: usize) -> String {
    let mut ldif = String::from(
        "version: 1\n\ndn: dc=example,dc=com\nobjectClass: top\nobjectClass: domain\ndc: example\n",
    );
    for i in 0..num_users {
        ldif.push_str(&format!(
            "\ndn: uid=user{i},ou=users,dc=example,dc=com\n\
             objectClass: top\nobjectClass: person\nobjectClass: inetOrgPerson\n\
             uid: user{i}\ncn: User {i}\nsn: Surname{i}\nmail: user{i}@example.com\n\
             userPassword:: c2VjcmV0e3tpfX0=\n"
        ));
    }
    ldif
}

fn benchmark_sequential_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("ldif_sequential");

    for size in [100, 1000, 10000].iter() {
        let ldif = create_test_ldif(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| LdifReader::new(black_box(ldif.as_bytes())).count());
        });
    }

    group.finish();
}

fn benchmark_parallel_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("ldif_parallel");
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ldif = create_test_ldif(10000);

    for threads in [1, 2, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(threads), threads, |b, threads| {
            b.iter(|| {
                runtime.block_on(async {
                    let options = LdifReaderOptions {
                        parse_threads: *threads,
                        ..LdifReaderOptions::default()
                    };
                    let mut reader =
                        ParallelLdifReader::spawn(std::io::Cursor::new(ldif.clone()), options);
                    let mut count = 0;
                    while let Ok(Some(_)) = reader.read_record().await {
                        count += 1;
                    }
                    count
                })
            });
        });
    }

    group.finish();
}

fn benchmark_ldap_encode(c: &mut Criterion) {
    let ldif = create_test_ldif(1000);
    let messages: Vec<LdapMessage> = LdifReader::new(ldif.as_bytes())
        .enumerate()
        .map(|(i, record)| LdapMessage::from_record(i as i32 + 1, record.unwrap()))
        .collect();

    c.bench_function("ldap_encode_1000", |b| {
        b.iter(|| {
            messages
                .iter()
                .map(|message| message.encode().len())
                .sum::<usize>()
        });
    });
}

fn benchmark_ber_decode(c: &mut Criterion) {
    let ldif = create_test_ldif(1000);
    let mut wire = Vec::new();
    for (i, record) in LdifReader::new(ldif.as_bytes()).enumerate() {
        wire.extend_from_slice(&LdapMessage::from_record(i as i32 + 1, record.unwrap()).encode());
    }

    c.bench_function("ber_stream_read_1000", |b| {
        b.iter(|| {
            let mut reader = BerStreamReader::new(black_box(&wire[..]));
            let mut count = 0;
            while let Ok(Some(_)) = reader.read_element() {
                count += 1;
            }
            count
        });
    });

    c.bench_function("ldap_decode_1000", |b| {
        b.iter(|| {
            let mut reader = BerStreamReader::new(black_box(&wire[..]));
            let mut count = 0;
            while let Ok(Some(element)) = reader.read_element() {
                if LdapMessage::decode(&element).is_ok() {
                    count += 1;
                }
            }
            count
        });
    });

    let sequence = BerSequence::new((0..100).map(BerElement::integer).collect());
    c.bench_function("sequence_cached_encode", |b| {
        b.iter(|| black_box(&sequence).encode().len());
    });
}

criterion_group!(
    benches,
    benchmark_sequential_reader,
    benchmark_parallel_reader,
    benchmark_ldap_encode,
    benchmark_ber_decode
);
criterion_main!(benches);
