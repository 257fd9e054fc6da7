fn main() {
    if let Err(err) = tabload_lib::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
