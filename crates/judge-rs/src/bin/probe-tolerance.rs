//! Fixed-behaviour submission printing near-correct real numbers.
//!
//! For input `x` the exact answer is `x x-1`. Cases 2, 4 and 5 print values
//! off by varying amounts; case 1 prints a word.

use std::io::{self, BufRead};

fn main() {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .expect("failed to read input");
    let x: i64 = line.trim().parse().expect("input must be an integer");

    match x {
        1 => println!("hi"),
        2 => println!("2.001 1.0001"),
        3 => println!("3"),
        4 => {
            println!("# This should still work");
            println!("4.000000001234543 3.00001234543235");
        }
        5 => println!("5.01 6.02"),
        _ => println!("{} {}", x, x - 1),
    }
}
