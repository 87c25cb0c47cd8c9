fn main() {
    if let Err(e) = lattice_flow::start() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
