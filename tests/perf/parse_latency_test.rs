use std::time::Instant;

use crate::command::Command;
use crate::web_search::{search_url, EngineOverrides};

fn p95_ms(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let last = samples.len().saturating_sub(1);
    let idx = ((last as f64) * 0.95).round() as usize;
    samples[idx.min(last)]
}

#[test]
fn long_line_parse_and_route_p95_under_2ms() {
    let mut line = "lorem ipsum dolor sit amet ".repeat(400);
    line.push_str("!d");
    let overrides = EngineOverrides::new();

    for _ in 0..30 {
        let _ = search_url(Command::parse(&line).engine, &line, &overrides);
    }

    let mut batch_p95 = Vec::with_capacity(5);
    for _ in 0..5 {
        let mut samples = Vec::with_capacity(80);
        for _ in 0..80 {
            let start = Instant::now();
            let command = Command::parse(&line);
            let _ = search_url(command.engine, &command.term, &overrides);
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
        }
        batch_p95.push(p95_ms(&mut samples));
    }

    batch_p95.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median_p95 = batch_p95[batch_p95.len() / 2];

    assert!(
        median_p95 <= 2.0,
        "median batch p95 too high: {median_p95:.3}ms (budget 2.0ms); batches={batch_p95:?}",
    );
}
