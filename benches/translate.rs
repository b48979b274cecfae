use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dify2openai::protocol::dify::decoder::classify_line;
use dify2openai::stream::{ChunkEmitter, LineDecoder, ResponseMode, Translation};
use std::collections::VecDeque;

fn sample_body(chunks: usize) -> Vec<u8> {
    let mut body = String::with_capacity(chunks * 96);
    for index in 0..chunks {
        body.push_str(&format!(
            "data: {{\"event\":\"message\",\"answer\":\"token {index} \",\"created_at\":1705395332}}\n\n"
        ));
    }
    body.push_str(
        "data: {\"event\":\"message_end\",\"metadata\":{\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":256,\"total_tokens\":266}}}\n\n",
    );
    body.into_bytes()
}

fn bench_decode_classify(c: &mut Criterion) {
    let body = sample_body(256);
    c.bench_function("line_decoder_classify_512b_chunks", |b| {
        b.iter(|| {
            let mut decoder = LineDecoder::new();
            let mut count = 0usize;
            for chunk in body.chunks(512) {
                for line in decoder.feed(black_box(chunk)) {
                    if let Ok(Some(event)) = classify_line(&line) {
                        black_box(event);
                        count += 1;
                    }
                }
            }
            black_box(count)
        });
    });
}

fn bench_streaming_translation(c: &mut Criterion) {
    let body = sample_body(256);
    c.bench_function("streaming_translate_emit", |b| {
        b.iter(|| {
            let mut decoder = LineDecoder::new();
            let mut translation = Translation::new(ResponseMode::Streaming, None);
            let mut emitter = ChunkEmitter::new("chatcmpl-bench".to_string(), "dify".to_string());
            let mut frames = VecDeque::new();
            for chunk in body.chunks(512) {
                for line in decoder.feed(chunk) {
                    if let Ok(Some(event)) = classify_line(&line) {
                        let created = event.created_at().unwrap_or(0);
                        emitter.emit(translation.apply(event), created, &mut frames);
                    }
                }
                frames.clear();
            }
            black_box(emitter.is_closed())
        });
    });
}

fn bench_buffered_translation(c: &mut Criterion) {
    let body = sample_body(256);
    c.bench_function("buffered_translate", |b| {
        b.iter(|| {
            let mut decoder = LineDecoder::new();
            let mut translation = Translation::new(ResponseMode::Buffered, None);
            for line in decoder.feed(black_box(&body)) {
                if let Ok(Some(event)) = classify_line(&line) {
                    translation.apply(event);
                }
            }
            black_box(translation.into_parts())
        });
    });
}

criterion_group!(
    benches,
    bench_decode_classify,
    bench_streaming_translation,
    bench_buffered_translation
);
criterion_main!(benches);
