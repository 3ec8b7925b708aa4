use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use bookshelf_core::{resolve, Book, ListQuery, NewBook};

fn make_shelf(n: u64) -> Vec<Book> {
    (1..=n)
        .map(|i| Book {
            id: i,
            title: format!("Title {i}"),
            author: format!("Author {}", i % 97),
            publication_year: 1900 + (i % 120) as i32,
            genre: if i % 3 == 0 { "Fiction" } else { "History" }.to_string(),
            isbn: format!("{:013}", i),
        })
        .collect()
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("Identity Resolution");
    let books = make_shelf(10_000);
    group.throughput(Throughput::Elements(books.len() as u64));

    // Worst case: no match, full scan
    let fresh = NewBook {
        title: "Unseen".into(),
        author: "Nobody".into(),
        publication_year: 2001,
        genre: "Fiction".into(),
        isbn: "9999999999999".into(),
    };
    group.bench_function("resolve_miss_10k", |b| {
        b.iter(|| black_box(resolve(black_box(&fresh), black_box(&books)).unwrap()))
    });

    let existing = NewBook {
        isbn: format!("{:013}", 5_000),
        ..fresh.clone()
    };
    group.bench_function("resolve_isbn_hit_10k", |b| {
        b.iter(|| black_box(resolve(black_box(&existing), black_box(&books)).unwrap()))
    });

    group.finish();
}

fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Listing");
    let books = make_shelf(10_000);

    let query = ListQuery {
        page: 3,
        limit: 50,
        sort_by: Some("title".into()),
        genre: Some("fiction".into()),
        author: None,
    };
    group.bench_function("filter_sort_page_10k", |b| {
        b.iter(|| black_box(query.apply(books.clone()).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_listing);
criterion_main!(benches);
