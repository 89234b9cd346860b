fn main() {
    if let Err(e) = sift_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
