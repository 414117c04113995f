fn main() {
    if let Err(e) = findoc_lib::run() {
        eprintln!("findoc: {e}");
        std::process::exit(1);
    }
}
