fn main() {
    if let Err(err) = arazzo_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
