//! CPU-bound submission: busy-loops on N threads (first argument, default 4)
//! until killed. Burns CPU time faster than wall time on a multi-core host.

use std::hint::black_box;
use std::thread;

fn main() {
    let threads: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(4);

    let workers: Vec<_> = (0..threads)
        .map(|_| {
            thread::spawn(|| {
                let mut counter: u64 = 0;
                loop {
                    counter = black_box(counter.wrapping_add(1));
                }
            })
        })
        .collect();

    for worker in workers {
        let _ = worker.join();
    }
}
