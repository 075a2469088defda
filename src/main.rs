fn main() {
    if let Err(err) = csv_evalboard::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
