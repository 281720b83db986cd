//! Fixed-behaviour submission used to exercise every verdict.
//!
//! Reads one integer `x` from stdin:
//! - 1: sleeps five seconds and prints nothing
//! - 2: panics
//! - 3: prints `hi`
//! - 4: allocates 10 MB blocks until killed
//! - 5: prints a debug line, then `5`
//! - otherwise: prints `x`

use std::hint::black_box;
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

fn main() {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .expect("failed to read input");
    let x: i64 = line.trim().parse().expect("input must be an integer");

    match x {
        1 => thread::sleep(Duration::from_secs(5)),
        2 => panic!("probe failure requested"),
        3 => println!("hi"),
        4 => {
            let mut blocks: Vec<Vec<u8>> = Vec::new();
            loop {
                blocks.push(vec![1u8; 10_000_000]);
                black_box(&blocks);
            }
        }
        5 => {
            println!("# This should still work");
            println!("5");
        }
        _ => println!("{}", x),
    }
}
