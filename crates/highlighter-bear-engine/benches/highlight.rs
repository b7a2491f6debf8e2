use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use highlighter_bear_engine::{
    Annotator, Document, Highlighter, MatchPattern, Rule, ScanOptions, resolve_overlaps,
};

fn generate_page(paragraphs: usize) -> String {
    let mut page = String::from("<html><body>");
    for i in 0..paragraphs {
        page.push_str(&format!(
            "<div><h2>Section {i}</h2><p>An important update from 2020 about the \
             critical report, filed under urgent, asap and later.</p>\
             <script>var important = {i};</script></div>"
        ));
    }
    page.push_str("</body></html>");
    page
}

fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "1",
            "Alerts",
            "",
            vec![MatchPattern::text("important"), MatchPattern::text("critical")],
        ),
        Rule::new(
            "2",
            "Reports",
            "",
            vec![
                MatchPattern::regex(r"\d{4}"),
                MatchPattern::text("0 about"),
                MatchPattern::list("urgent, asap, later"),
            ],
        ),
    ]
}

fn bench_matches_for(c: &mut Criterion) {
    let highlighter = Highlighter::from_rules(&rules());
    let text = "An important update from 2020 about the critical report, filed under urgent. "
        .repeat(20);

    c.bench_function("matches_for", |b| {
        b.iter(|| std::hint::black_box(highlighter.matches_for(std::hint::black_box(&text))));
    });
}

fn bench_resolve_overlaps(c: &mut Criterion) {
    let highlighter = Highlighter::from_rules(&rules());
    let text = "2020 about 2020 about important critical ".repeat(50);
    let candidates = highlighter.candidates(&text);

    c.bench_function("resolve_overlaps", |b| {
        b.iter(|| std::hint::black_box(resolve_overlaps(candidates.clone())));
    });
}

fn bench_highlight_subtree(c: &mut Criterion) {
    let mut group = c.benchmark_group("highlight_subtree");
    group.sample_size(10);

    let highlighter = Highlighter::from_rules(&rules());
    let options = ScanOptions::default();

    for size in [10, 100, 500] {
        let page = generate_page(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &page, |b, page| {
            b.iter(|| {
                let mut doc = Document::parse_xhtml(page).unwrap();
                let mut annotator = Annotator::default();
                let root = doc.root();
                let stats =
                    highlighter.highlight_subtree(&mut doc, root, &options, &mut annotator);
                std::hint::black_box(stats);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_matches_for,
    bench_resolve_overlaps,
    bench_highlight_subtree
);
criterion_main!(benches);
