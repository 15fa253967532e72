//! LoopBench command line entry point

fn main() {
    if let Err(e) = loopbench::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
