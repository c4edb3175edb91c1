use criterion::{Criterion, black_box, criterion_group, criterion_main};

use readex::document::extract::extract;
use readex::document::markup::parse_blocks;
use readex::document::segment::segment;
use readex::document::{SourceDocument, aggregate};

/// A passage of `paragraphs` paragraphs followed by `questions` four-option
/// questions, roughly what a converted exam paper looks like.
fn make_document(paragraphs: usize, questions: usize) -> String {
    let mut markup = String::from("<h1>Reading Passage</h1>");
    for i in 0..paragraphs {
        markup.push_str(&format!(
            "<p>Paragraph {i} with <strong>bold</strong>, <em>italic</em> &amp; plain text.</p>"
        ));
    }
    for n in 1..=questions {
        markup.push_str(&format!("<p>{n}. What does paragraph {n} say?</p>"));
        for label in ['A', 'B', 'C', 'D'] {
            markup.push_str(&format!("<p>{label}. option {label} for {n}</p>"));
        }
    }
    markup
}

fn bench_parse(c: &mut Criterion) {
    let markup = make_document(40, 20);

    c.bench_function("parse_blocks (40 paragraphs, 20 questions)", |b| {
        b.iter(|| parse_blocks(black_box(&markup)))
    });
}

fn bench_segment_extract(c: &mut Criterion) {
    let markup = make_document(40, 20);
    let blocks = parse_blocks(&markup).unwrap();

    c.bench_function("segment + extract (20 questions)", |b| {
        b.iter(|| {
            let segments = segment(black_box(blocks.clone()));
            extract(&segments.question_blocks, 1)
        })
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let documents: Vec<SourceDocument> = (0..5)
        .map(|i| SourceDocument::new(format!("paper-{i}.docx"), make_document(30, 13)))
        .collect();

    c.bench_function("aggregate (5 documents)", |b| {
        b.iter(|| aggregate(black_box(&documents)))
    });
}

criterion_group!(benches, bench_parse, bench_segment_extract, bench_aggregate);
criterion_main!(benches);
