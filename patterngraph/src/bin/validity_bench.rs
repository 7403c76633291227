use patterngraph::{Graph, ObjectId, Vec2};
use std::time::Instant;

// One square piece per cell, each with a dart whose tip stops just short of
// the bottom edge so make_graph_valid has something to attach.
fn build_pieces(g: &mut Graph, pieces: usize) -> usize {
    let cols = (pieces as f32).sqrt().ceil().max(1.0) as usize;
    let mut darts = 0usize;
    for k in 0..pieces {
        let x0 = (k % cols) as f32 * 3.0;
        let y0 = (k / cols) as f32 * 3.0;
        let p = [
            Vec2::new(x0, y0),
            Vec2::new(x0 + 2.0, y0),
            Vec2::new(x0 + 2.0, y0 + 2.0),
            Vec2::new(x0, y0 + 2.0),
        ];
        let cs: Vec<ObjectId> = (0..4).filter_map(|i| g.add_curve(&[p[i], p[(i + 1) % 4]]).ok()).collect();
        if cs.len() == 4 && g.add_loop(&cs, false).is_ok() {
            let tip = Vec2::new(x0 + 1.0, y0 + 0.004);
            if g.add_curve(&[Vec2::new(x0 + 1.0, y0 + 0.8), tip]).is_ok() { darts += 1; }
        }
    }
    darts
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() { return 0.0; }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len()-1)]
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut pieces = 200usize;
    let mut picks = 5000usize;
    let mut tol = 0.05f32;
    let mut assert_ms: Option<f64> = None;
    for a in &args[1..] {
        if let Some(val)=a.strip_prefix("--pieces=") { if let Ok(v)=val.parse() { pieces=v; } }
        else if let Some(val)=a.strip_prefix("--picks=") { if let Ok(v)=val.parse() { picks=v; } }
        else if let Some(val)=a.strip_prefix("--tol=") { if let Ok(v)=val.parse() { tol=v; } }
        else if let Some(val)=a.strip_prefix("--assert-ms=") { if let Ok(v)=val.parse() { assert_ms=Some(v); } }
    }

    let mut g = Graph::new();
    let t0 = Instant::now();
    let darts = build_pieces(&mut g, pieces);
    let build_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let t0 = Instant::now();
    let report = match g.make_graph_valid() {
        Ok(r) => r,
        Err(e) => { eprintln!("make_graph_valid failed: {e}"); std::process::exit(1); }
    };
    let valid_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let t0 = Instant::now();
    let doc = g.to_json_string();
    let reloaded = Graph::from_json_str(&doc).map(|r| r.curve_count()).unwrap_or(0);
    let json_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let cols = (pieces as f32).sqrt().ceil().max(1.0) as usize;
    let mut times_ms: Vec<f64> = Vec::with_capacity(picks);
    let mut hits = 0usize;
    for k in 0..picks {
        let cell = k % pieces.max(1);
        let x = (cell % cols) as f32 * 3.0 + 0.5 + (k % 7) as f32 * 0.2;
        let y = (cell / cols) as f32 * 3.0 + 0.01;
        let t0 = Instant::now();
        if g.pick(Vec2::new(x, y), tol).is_some() { hits += 1; }
        times_ms.push(t0.elapsed().as_secs_f64() * 1000.0);
    }
    times_ms.sort_by(|a,b| a.total_cmp(b));
    let med = percentile(&times_ms, 0.5);
    let p90 = percentile(&times_ms, 0.9);
    let p99 = percentile(&times_ms, 0.99);
    println!("pieces={} darts={} fused={} failed={} curves={} reloaded={} build_ms={:.3} valid_ms={:.3} json_ms={:.3}",
        pieces, darts, report.fused_points, report.failed, g.curve_count(), reloaded, build_ms, valid_ms, json_ms);
    println!("picks={} tol={} hits={} median_ms={:.4} p90_ms={:.4} p99_ms={:.4}", picks, tol, hits, med, p90, p99);
    if let Some(th) = assert_ms { if valid_ms > th { eprintln!("FAIL: make_graph_valid {:.3} ms > threshold {:.3} ms", valid_ms, th); std::process::exit(1); } }
}
