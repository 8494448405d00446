//! Micro-benchmarks for RoutingTable operations: add, closest, broadcast_sample and remove
//! at varying table sizes. Reports nanoseconds-per-operation.
//!
//! Run: `cargo bench --bench routing_table`

use kadoverlay::routing::RoutingTable;
use kadoverlay::{Id, Peer, DEFAULT_K};
use std::net::SocketAddr;
use std::time::Instant;

fn main() {
    println!("routing_table\n");

    let addr: SocketAddr = ([127, 0, 0, 1], 6881).into();

    bench_add(addr);
    bench_closest(addr);
    bench_broadcast_sample(addr);
    bench_remove(addr);
}

fn filled(size: usize, addr: SocketAddr) -> RoutingTable {
    let mut table = RoutingTable::new(Id::random(), DEFAULT_K);
    for _ in 0..size {
        table.add(Peer::new(Id::random(), addr));
    }
    table
}

fn bench_add(addr: SocketAddr) {
    println!("add");

    for size in [0, 100, 400] {
        let mut table = filled(size, addr);

        // Pre-generate peers outside the timed section
        let fresh: Vec<_> = (0..1000).map(|_| Peer::new(Id::random(), addr)).collect();

        let start = Instant::now();
        for peer in fresh {
            table.add(peer);
        }
        let per_op = start.elapsed().as_nanos() / 1000;
        println!(
            "{size:>3} peers: {per_op}ns/op (final size: {}, buckets: {})",
            table.size(),
            table.buckets().len()
        );
    }

    println!();
}

fn bench_closest(addr: SocketAddr) {
    println!("closest");

    let targets: Vec<_> = (0..1000).map(|_| Id::random()).collect();

    for size in [50, 100, 200, 400] {
        let table = filled(size, addr);

        let start = Instant::now();
        for target in &targets {
            let _ = table.closest(target, None);
        }
        let per_op = start.elapsed().as_nanos() / targets.len() as u128;
        println!("{size:>3} peers: {per_op}ns/op");
    }

    println!();
}

fn bench_broadcast_sample(addr: SocketAddr) {
    println!("broadcast_sample");

    let table = filled(400, addr);
    let rounds = 1000;

    for left in [0, 2, 4] {
        let start = Instant::now();
        for _ in 0..rounds {
            let _ = table.broadcast_sample(left, 6);
        }
        let per_op = start.elapsed().as_nanos() / rounds as u128;
        println!("left bucket {left}: {per_op}ns/op");
    }

    println!();
}

fn bench_remove(addr: SocketAddr) {
    println!("remove");

    let mut table = RoutingTable::new(Id::random(), DEFAULT_K);

    let mut ids = Vec::new();
    for _ in 0..200 {
        let id = Id::random();
        ids.push(id);
        table.add(Peer::new(id, addr));
    }

    let n = ids.len();
    let start = Instant::now();
    for id in &ids {
        table.remove(id);
    }
    let per_op = start.elapsed().as_nanos() / n as u128;
    println!("{per_op}ns/op ({n} removals)");
    println!();
}
