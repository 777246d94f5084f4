fn main() {
    if let Err(err) = csv_bulkload::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
